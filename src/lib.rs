//! Ahead-of-time dependency injection for compiled modules.
//!
//! The build side (`weave`, `pipeline`) rewrites a module artifact after
//! compilation: every constructor or field carrying the injection marker gets
//! a synthesized factory or injector, and a registrar type whose load hook
//! registers them. The runtime side (`runtime`) loads artifacts into a
//! [`runtime::Host`], which runs those hooks and serves [`runtime::Container`]s.

pub mod binary;
pub mod config;
pub mod content_hash;
pub mod diagnostics;
pub mod ir;
pub mod pipeline;
pub mod runtime;
pub mod visit;
pub mod weave;

pub use binary::Artifact;
pub use config::Config;
pub use diagnostics::WeaveError;
pub use runtime::{Container, Host, HostConfig, HostMode, RuntimeError, Value};
pub use weave::{WeaveOptions, WeaveOutcome, weave_artifact, weave_module};
