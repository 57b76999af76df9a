//! Post-compile entry point called by the host build pipeline once per module.

use std::fmt;
use std::path::PathBuf;

use crate::config::Config;
use crate::diagnostics::WeaveError;
use crate::weave::{self, WeaveOutcome};

/// What the build pipeline knows about a freshly compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    /// Short module name.
    pub name: String,
    /// Path of the artifact the compiler wrote.
    pub output_path: PathBuf,
    /// Editor/tooling-only module, as opposed to one deployed with the player.
    pub editor_only: bool,
    /// Transitive module references.
    pub references: Vec<String>,
    /// Errors reported by the compilation that produced this module.
    pub error_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The module is the injection runtime itself.
    SupportModule,
    CompilationErrors(usize),
    /// The module cannot use the container, so nothing would call its registrations.
    NoRuntimeReference,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SupportModule => write!(f, "injection runtime module"),
            SkipReason::CompilationErrors(n) => write!(f, "compilation reported {n} error(s)"),
            SkipReason::NoRuntimeReference => write!(f, "does not reference the injection runtime"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Skipped(SkipReason),
    Processed(WeaveOutcome),
}

/// Decide whether `unit` should be woven and, if so, weave its artifact.
pub fn post_compile(unit: &CompiledModule, config: &Config) -> Result<PipelineOutcome, WeaveError> {
    if let Some(reason) = skip_reason(unit, config) {
        tracing::info!(module = %unit.name, %reason, "skipping module");
        return Ok(PipelineOutcome::Skipped(reason));
    }

    let options = config.weave_options(unit.editor_only);
    let outcome = weave::weave_artifact(&unit.output_path, &options)?;
    Ok(PipelineOutcome::Processed(outcome))
}

fn skip_reason(unit: &CompiledModule, config: &Config) -> Option<SkipReason> {
    let runtime = config.weave.runtime_module.as_str();
    if unit.name == runtime {
        return Some(SkipReason::SupportModule);
    }
    if unit.error_count > 0 {
        return Some(SkipReason::CompilationErrors(unit.error_count));
    }
    if !unit.references.iter().any(|r| r == runtime) {
        return Some(SkipReason::NoRuntimeReference);
    }
    None
}
