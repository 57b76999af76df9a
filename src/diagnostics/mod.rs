use std::path::PathBuf;

use thiserror::Error;

use crate::binary::ArtifactError;

/// A fault that aborts the rewrite of one module. The artifact on disk is
/// left untouched whenever one of these is returned.
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("IO error on '{}': {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Scanner and synthesizer disagree about the module's contents.
    #[error("Internal weaver error: {msg}")]
    Invariant { msg: String },

    #[error("Cannot synthesize '{member}' on '{ty}': a member with that name already exists")]
    NameCollision { ty: String, member: String },

    #[error("Config error: {msg}")]
    Config { msg: String, path: Option<PathBuf> },
}

impl WeaveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant { msg: msg.into() }
    }

    pub fn name_collision(ty: impl Into<String>, member: impl Into<String>) -> Self {
        Self::NameCollision { ty: ty.into(), member: member.into() }
    }

    pub fn config(msg: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config { msg: msg.into(), path }
    }
}

/// Print a weave error for terminal output.
pub fn render_error(module: &str, err: &WeaveError) {
    match err {
        WeaveError::Config { msg, path: Some(path) } => {
            eprintln!("error[config]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        WeaveError::Invariant { msg } => {
            eprintln!("error[weave {module}]: internal error: {msg}");
            eprintln!("  note: this is a bug in the weaver, the module was left unchanged");
        }
        other => eprintln!("error[weave {module}]: {other}"),
    }
}
