//! Content hashing for module IR. The weaver records the hash of the module
//! as it was before rewriting in the weave stamp.

use sha2::{Digest, Sha256};

use crate::binary::ArtifactError;
use crate::ir::Module;

/// A SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Hash the canonical bincode encoding of a module.
pub fn hash_module(module: &Module) -> Result<ContentHash, ArtifactError> {
    let bytes = bincode::serde::encode_to_vec(module, bincode::config::standard())
        .map_err(|e| ArtifactError::Encode(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub fn to_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
