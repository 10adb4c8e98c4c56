//! File utility functions.

use crate::error::{PetlogError, Result};
use serde::Serialize;
use std::path::Path;

/// Text encoding of a chat log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatEncoding {
    #[default]
    Utf8,
    /// EUC-KR / CP949, as written by the Korean game client.
    EucKr,
}

/// Read a chat log with the given encoding.
pub fn read_chat_file(path: &Path, encoding: ChatEncoding) -> Result<String> {
    if !path.is_file() {
        return Err(PetlogError::NotFound(format!(
            "Chat log not found: {}",
            path.display()
        )));
    }
    match encoding {
        ChatEncoding::Utf8 => read_utf8_file(path),
        ChatEncoding::EucKr => read_euc_kr_file(path),
    }
}

/// Read file with EUC-KR encoding.
pub fn read_euc_kr_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let (text, _, had_errors) = encoding_rs::EUC_KR.decode(&bytes);
    if had_errors {
        return Err(PetlogError::Parse(format!(
            "Failed to decode EUC-KR text in {}",
            path.display()
        )));
    }
    Ok(text.into_owned())
}

/// Read file with UTF-8 encoding.
pub fn read_utf8_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Read and parse a JSON file.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value> {
    let text = read_utf8_file(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Render a value as 2-space indented JSON. Non-ASCII text is kept as-is.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write a value as pretty JSON, creating or overwriting the file.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = to_pretty_json(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
