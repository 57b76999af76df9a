//! Binary container format for module artifacts.
//!
//! Container layout (16-byte header + two length-prefixed sections):
//!
//! ```text
//! [4B magic "PWMD"] [4B schema version u32 LE] [4B symbols offset u32 LE] [4B IR offset u32 LE]
//! [Symbols section: 4B length u32 LE + bincode bytes]
//! [IR section: 4B length u32 LE + bincode bytes]
//! ```
//!
//! The symbol side table is opaque to weaving; it is read and written back
//! unchanged.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ir::Module;

/// Magic bytes identifying a module artifact.
const MAGIC: &[u8; 4] = b"PWMD";

/// Current schema version.
const SCHEMA_VERSION: u32 = 1;

/// Header size in bytes: magic (4) + version (4) + symbols_offset (4) + ir_offset (4).
const HEADER_SIZE: usize = 16;

/// Debug/symbol side table mapping members to source locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub entries: Vec<SymbolEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub member: Uuid,
    pub file: String,
    pub line: u32,
}

/// A decoded artifact: the module IR plus its symbol side table.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub module: Module,
    pub symbols: SymbolTable,
}

/// Errors that can occur during artifact serialization/deserialization.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("invalid magic number: expected PWMD")]
    InvalidMagic,
    #[error("unsupported schema version {0} (expected {SCHEMA_VERSION})")]
    UnsupportedVersion(u32),
    #[error("truncated file: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("bincode encode error: {0}")]
    Encode(String),
    #[error("bincode decode error: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Artifact {
    pub fn new(module: Module) -> Self {
        Self { module, symbols: SymbolTable::default() }
    }

    pub fn with_symbols(module: Module, symbols: SymbolTable) -> Self {
        Self { module, symbols }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        serialize_artifact(&self.module, &self.symbols)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ArtifactError> {
        let (module, symbols) = deserialize_artifact(data)?;
        Ok(Self { module, symbols })
    }

    /// Load from an artifact file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// Serialize a module and its symbol table into the container format.
pub fn serialize_artifact(module: &Module, symbols: &SymbolTable) -> Result<Vec<u8>, ArtifactError> {
    let config = bincode::config::standard();
    let symbol_bytes = bincode::serde::encode_to_vec(symbols, config)
        .map_err(|e| ArtifactError::Encode(e.to_string()))?;
    let ir_bytes = bincode::serde::encode_to_vec(module, config)
        .map_err(|e| ArtifactError::Encode(e.to_string()))?;

    let symbols_section_size = 4 + symbol_bytes.len();
    let ir_section_size = 4 + ir_bytes.len();

    let symbols_offset = HEADER_SIZE as u32;
    let ir_offset = (HEADER_SIZE + symbols_section_size) as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + symbols_section_size + ir_section_size);

    // Header
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    buf.extend_from_slice(&symbols_offset.to_le_bytes());
    buf.extend_from_slice(&ir_offset.to_le_bytes());

    // Symbols section
    buf.extend_from_slice(&(symbol_bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(&symbol_bytes);

    // IR section
    buf.extend_from_slice(&(ir_bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(&ir_bytes);

    Ok(buf)
}

/// Deserialize a container back into a module and its symbol table.
pub fn deserialize_artifact(data: &[u8]) -> Result<(Module, SymbolTable), ArtifactError> {
    validate_header(data)?;
    let symbols = decode_section(data, 8)?;
    let module = decode_section(data, 12)?;
    Ok((module, symbols))
}

/// Check whether a byte slice starts with the artifact magic number.
pub fn is_artifact(data: &[u8]) -> bool {
    data.len() >= 4 && &data[..4] == MAGIC
}

/// Read only the symbol table, without deserializing the IR.
pub fn read_symbols_only(data: &[u8]) -> Result<SymbolTable, ArtifactError> {
    validate_header(data)?;
    decode_section(data, 8)
}

// --- internal helpers ---

fn read_u32(data: &[u8], at: usize) -> Result<u32, ArtifactError> {
    let bytes: [u8; 4] = data
        .get(at..at + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(ArtifactError::Truncated { expected: at + 4, got: data.len() })?;
    Ok(u32::from_le_bytes(bytes))
}

fn validate_header(data: &[u8]) -> Result<(), ArtifactError> {
    if data.len() < HEADER_SIZE {
        return Err(ArtifactError::Truncated { expected: HEADER_SIZE, got: data.len() });
    }
    if &data[..4] != MAGIC {
        return Err(ArtifactError::InvalidMagic);
    }
    let version = read_u32(data, 4)?;
    if version != SCHEMA_VERSION {
        return Err(ArtifactError::UnsupportedVersion(version));
    }
    Ok(())
}

/// Decode the section whose offset is stored in the header at `header_slot`.
fn decode_section<T: serde::de::DeserializeOwned>(data: &[u8], header_slot: usize) -> Result<T, ArtifactError> {
    let offset = read_u32(data, header_slot)? as usize;
    let len = read_u32(data, offset)? as usize;

    let end = offset + 4 + len;
    if data.len() < end {
        return Err(ArtifactError::Truncated { expected: end, got: data.len() });
    }

    let config = bincode::config::standard();
    let (value, _bytes_read): (T, usize) = bincode::serde::decode_from_slice(&data[offset + 4..end], config)
        .map_err(|e| ArtifactError::Decode(e.to_string()))?;
    Ok(value)
}
