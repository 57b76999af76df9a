use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use prewire::binary::Artifact;
use prewire::config::Config;
use prewire::diagnostics::render_error;
use prewire::ir::{Annotation, Module, TypeDef, TypeKind};
use prewire::pipeline::{self, CompiledModule, PipelineOutcome};
use prewire::runtime::{Host, HostMode};
use prewire::weave::WeaveOutcome;

/// Log filter variable.
const LOG_ENV: &str = "PREWIRE_LOG";

#[derive(Parser)]
#[command(name = "prewire", version, about = "Ahead-of-time dependency injection weaver")]
struct Cli {
    /// Path to prewire.toml (defaults to the one next to the artifact, or the current dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post-compile step: weave a module artifact in place
    Weave {
        /// Module artifact path
        file: PathBuf,
        /// Module name (defaults to the name recorded in the artifact)
        #[arg(long)]
        name: Option<String>,
        /// The module is editor/tooling-only
        #[arg(long)]
        editor: bool,
        /// Referenced module (repeatable; defaults to the artifact's references)
        #[arg(long = "reference")]
        references: Vec<String>,
        /// Number of errors reported by the compilation
        #[arg(long, default_value_t = 0)]
        errors: usize,
    },
    /// Build a module artifact from a JSON IR description
    Assemble {
        /// JSON module description
        file: PathBuf,
        /// Output artifact path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the contents of a module artifact
    Inspect {
        /// Module artifact path
        file: PathBuf,
        /// Print the module as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load artifacts into a host and report the registrations
    Load {
        /// Module artifacts, loaded in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Run as an editor host (editor load hooks run too)
        #[arg(long)]
        editor: bool,
        /// Enable the introspection fallback
        #[arg(long)]
        fallback: bool,
        /// Static method to invoke after loading, as `Type::Method`
        #[arg(long)]
        run: Option<String>,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(1);
}

fn load_config(explicit: Option<&Path>, near: &Path) -> Config {
    let result = match explicit {
        Some(path) => Config::load(path)
            .and_then(|c| c.with_env_override(std::env::var(prewire::config::FALLBACK_ENV).ok().as_deref())),
        None => Config::discover(near),
    };
    match result {
        Ok(config) => config,
        Err(err) => {
            render_error("config", &err);
            std::process::exit(1);
        }
    }
}

fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn open_artifact(file: &Path) -> Artifact {
    Artifact::open(file).unwrap_or_else(|e| fail(format!("failed to read {}: {e}", file.display())))
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Weave { file, name, editor, references, errors } => {
            let config = load_config(cli.config.as_deref(), &parent_dir(&file));

            let (name, references) = match name {
                Some(name) if !references.is_empty() => (name, references),
                name => {
                    let module = open_artifact(&file).module;
                    let references = if references.is_empty() { module.references } else { references };
                    (name.unwrap_or(module.name), references)
                }
            };

            let unit = CompiledModule {
                name,
                output_path: file,
                editor_only: editor,
                references,
                error_count: errors,
            };
            match pipeline::post_compile(&unit, &config) {
                Ok(PipelineOutcome::Skipped(reason)) => println!("skipped {}: {reason}", unit.name),
                Ok(PipelineOutcome::Processed(WeaveOutcome::Woven(report))) => {
                    println!(
                        "wove {}: {} factory(ies), {} injector(s), registrar {}",
                        report.module,
                        report.factories.len(),
                        report.injectors.len(),
                        report.registrar
                    );
                }
                Ok(PipelineOutcome::Processed(WeaveOutcome::AlreadyWoven)) => {
                    println!("{}: already woven", unit.name);
                }
                Ok(PipelineOutcome::Processed(WeaveOutcome::NothingToWeave)) => {
                    println!("{}: nothing to weave", unit.name);
                }
                Err(err) => {
                    render_error(&unit.name, &err);
                    std::process::exit(1);
                }
            }
        }
        Commands::Assemble { file, output } => {
            let text = std::fs::read_to_string(&file)
                .unwrap_or_else(|e| fail(format!("failed to read {}: {e}", file.display())));
            let module: Module = serde_json::from_str(&text)
                .unwrap_or_else(|e| fail(format!("invalid module description {}: {e}", file.display())));
            let name = module.name.clone();
            if let Err(e) = Artifact::new(module).save(&output) {
                fail(format!("failed to write {}: {e}", output.display()));
            }
            println!("assembled {name} -> {}", output.display());
        }
        Commands::Inspect { file, json } => {
            let artifact = open_artifact(&file);
            if json {
                match serde_json::to_string_pretty(&artifact.module) {
                    Ok(text) => println!("{text}"),
                    Err(e) => fail(format!("failed to encode JSON: {e}")),
                }
            } else {
                print!("{}", describe(&artifact));
            }
        }
        Commands::Load { files, editor, fallback, run } => {
            let near = files.first().map(|f| parent_dir(f)).unwrap_or_else(|| PathBuf::from("."));
            let mut host_config = load_config(cli.config.as_deref(), &near).host_config();
            if editor {
                host_config.mode = HostMode::Editor;
            }
            host_config.introspection_fallback |= fallback;

            let host = Host::new(host_config);
            for file in &files {
                let artifact = open_artifact(file);
                match host.load_artifact(artifact) {
                    Ok(report) => println!(
                        "loaded {}: {} hook(s), {} factory(ies), {} injector(s)",
                        report.module, report.hooks_run, report.factories, report.injectors
                    ),
                    Err(e) => fail(e),
                }
            }
            for ty in host.registry().registered_factories() {
                println!("factory  {ty}");
            }
            for ty in host.registry().registered_injectors() {
                println!("injector {ty}");
            }

            if let Some(entry) = run {
                let Some((ty, method)) = entry.rsplit_once("::") else {
                    fail(format!("--run expects Type::Method, got '{entry}'"));
                };
                let result = host.invoke(ty, method, Vec::new());
                for line in host.take_output() {
                    println!("{line}");
                }
                if let Err(e) = result {
                    fail(e);
                }
            }
        }
    }
}

/// Human-readable summary of an artifact.
fn describe(artifact: &Artifact) -> String {
    let module = &artifact.module;
    let mut out = String::new();
    out.push_str(&format!("module {}\n", module.name));
    if !module.references.is_empty() {
        out.push_str(&format!("  references: {}\n", module.references.join(", ")));
    }
    match &module.stamp {
        Some(stamp) => out.push_str(&format!(
            "  woven by prewire {} ({} factories, {} injectors, source {})\n",
            stamp.tool_version,
            stamp.factories,
            stamp.injectors,
            stamp.source_hash.chars().take(12).collect::<String>()
        )),
        None => out.push_str("  not woven\n"),
    }
    out.push_str(&format!("  symbols: {}\n", artifact.symbols.entries.len()));
    for ty in &module.types {
        describe_type(ty, &mut out);
    }
    out
}

fn describe_type(ty: &TypeDef, out: &mut String) {
    let kind = match (ty.kind, ty.is_abstract) {
        (TypeKind::Interface, _) => "interface",
        (TypeKind::Class, true) => "abstract class",
        (TypeKind::Class, false) => "class",
    };
    out.push_str(&format!("  {} {kind} {}", format!("{:?}", ty.visibility).to_lowercase(), ty.name));
    if let Some(sup) = &ty.supertype {
        out.push_str(&format!(" : {sup}"));
    }
    out.push('\n');
    for field in &ty.fields {
        out.push_str(&format!("    field {} {}: {}{}\n",
            format!("{:?}", field.visibility).to_lowercase(), field.name, field.ty,
            annotations(&field.annotations)));
    }
    for method in ty.constructors.iter().chain(&ty.methods) {
        let params: Vec<String> = method.params.iter().map(|p| format!("{}: {}", p.name, p.ty)).collect();
        let ret = method.return_type.as_deref().map(|r| format!(" -> {r}")).unwrap_or_default();
        out.push_str(&format!("    {}{} {}({}){ret}{}\n",
            format!("{:?}", method.visibility).to_lowercase(),
            if method.is_static { " static" } else { "" },
            method.name, params.join(", "),
            annotations(&method.annotations)));
    }
}

fn annotations(list: &[Annotation]) -> String {
    if list.is_empty() {
        return String::new();
    }
    let names: Vec<String> = list.iter().map(|a| match a {
        Annotation::Custom(tag) => tag.clone(),
        other => format!("{other:?}"),
    }).collect();
    format!(" [{}]", names.join(", "))
}
