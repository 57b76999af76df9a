//! Module rewriting: scan → synthesize → emit registrar.
//!
//! All three phases run against an in-memory copy of the module. The copy is
//! committed only when every phase succeeds, and an artifact on disk is
//! replaced in a single rename, so a failed weave never leaves a partially
//! rewritten module behind.

pub mod registrar;
pub mod scan;
pub mod synth;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::binary::Artifact;
use crate::config::DEFAULT_REGISTRAR_NAME;
use crate::content_hash;
use crate::diagnostics::WeaveError;
use crate::ir::{Module, WeaveStamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaveOptions {
    /// Module is editor/tooling-only; selects the editor load hook.
    pub editor_only: bool,
    /// Simple name of the registrar type.
    pub registrar_name: String,
}

impl Default for WeaveOptions {
    fn default() -> Self {
        Self { editor_only: false, registrar_name: DEFAULT_REGISTRAR_NAME.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeaveOutcome {
    Woven(WeaveReport),
    /// The module carries a weave stamp or its registrar already exists.
    AlreadyWoven,
    /// No constructor or field carries the injection marker.
    NothingToWeave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaveReport {
    pub module: String,
    pub registrar: String,
    /// Types that received a factory, in discovery order.
    pub factories: Vec<String>,
    /// Types that received an injector, in discovery order.
    pub injectors: Vec<String>,
}

/// Weave `module` in place. On error `module` is unchanged.
pub fn weave_module(module: &mut Module, options: &WeaveOptions) -> Result<WeaveOutcome, WeaveError> {
    let registrar = registrar::registrar_type_name(&module.name, &options.registrar_name);

    if module.stamp.is_some() || module.type_named(&registrar).is_some() {
        tracing::info!(module = %module.name, "module is already woven, skipping");
        return Ok(WeaveOutcome::AlreadyWoven);
    }

    let targets = scan::scan(module, &registrar);
    if targets.is_empty() {
        tracing::info!(module = %module.name, "no injection markers found");
        return Ok(WeaveOutcome::NothingToWeave);
    }

    let source_hash = content_hash::hash_module(module)?;
    let mut draft = module.clone();

    let factories = targets.constructable.iter()
        .map(|target| synth::synthesize_factory(&mut draft, target))
        .collect::<Result<Vec<_>, _>>()?;
    let injectors = targets.injectable.iter()
        .map(|target| synth::synthesize_injector(&mut draft, target))
        .collect::<Result<Vec<_>, _>>()?;

    registrar::emit_registrar(&mut draft, &registrar, &factories, &injectors, options.editor_only)?;

    draft.stamp = Some(WeaveStamp {
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        source_hash: content_hash::to_hex(&source_hash),
        factories: factories.len() as u32,
        injectors: injectors.len() as u32,
    });

    let report = WeaveReport {
        module: draft.name.clone(),
        registrar,
        factories: factories.into_iter().map(|s| s.ty).collect(),
        injectors: injectors.into_iter().map(|s| s.ty).collect(),
    };
    tracing::info!(
        module = %report.module,
        factories = report.factories.len(),
        injectors = report.injectors.len(),
        "wove module"
    );

    *module = draft;
    Ok(WeaveOutcome::Woven(report))
}

/// Weave the artifact at `path`, preserving its symbol table. The file is
/// rewritten only when the module was actually woven.
pub fn weave_artifact(path: &Path, options: &WeaveOptions) -> Result<WeaveOutcome, WeaveError> {
    let bytes = std::fs::read(path).map_err(|e| WeaveError::io(path, e))?;
    let mut artifact = Artifact::from_bytes(&bytes)?;

    let outcome = weave_module(&mut artifact.module, options)?;
    if matches!(outcome, WeaveOutcome::Woven(_)) {
        commit(path, &artifact.to_bytes()?)?;
    }
    Ok(outcome)
}

/// Write `bytes` next to `path` and rename over it.
fn commit(path: &Path, bytes: &[u8]) -> Result<(), WeaveError> {
    let staging = staging_path(path)?;
    std::fs::write(&staging, bytes).map_err(|e| WeaveError::io(&staging, e))?;
    if let Err(e) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(WeaveError::io(path, e));
    }
    Ok(())
}

fn staging_path(path: &Path) -> Result<PathBuf, WeaveError> {
    let Some(name) = path.file_name() else {
        return Err(WeaveError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "artifact path has no file name"),
        ));
    };
    let mut staged = OsString::from(name);
    staged.push(".weaving");
    Ok(path.with_file_name(staged))
}
