//! Zip-level access to the `.docx` package, bounded by an expansion budget.

use crate::types::ConversionError;
use bytes::Bytes;
use std::io::{self, Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Ceiling on how far a package may inflate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionLimits {
    /// Largest single part, uncompressed.
    pub max_part_bytes: u64,
    /// All parts together, uncompressed.
    pub max_total_bytes: u64,
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        Self {
            max_part_bytes: 64 * 1024 * 1024,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

pub struct Package {
    archive: ZipArchive<Cursor<Bytes>>,
    limits: ExpansionLimits,
}

fn too_large(name: &str, limit: u64) -> ConversionError {
    ConversionError::Content(format!(
        "{} expands beyond {} bytes, refusing to read it",
        name, limit
    ))
}

impl Package {
    pub fn open(bytes: Bytes, limits: ExpansionLimits) -> Result<Self, ConversionError> {
        let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            ConversionError::Content(format!("Failed to read .docx archive: {}", e))
        })?;
        Ok(Self { archive, limits })
    }

    /// Inflate every entry into a sink and fail once a part or the whole package
    /// passes its limit. Header sizes are not trusted; only bytes actually produced count.
    pub fn check_expansion(&mut self) -> Result<u64, ConversionError> {
        let mut total: u64 = 0;
        for index in 0..self.archive.len() {
            let mut file = self.archive.by_index(index).map_err(|e| {
                ConversionError::Content(format!("Failed to read .docx entry {}: {}", index, e))
            })?;
            let name = file.name().to_string();
            if file.size() > self.limits.max_part_bytes {
                return Err(too_large(&name, self.limits.max_part_bytes));
            }

            let mut bounded = (&mut file).take(self.limits.max_part_bytes + 1);
            let produced = io::copy(&mut bounded, &mut io::sink()).map_err(|e| {
                ConversionError::Content(format!("Failed to inflate {}: {}", name, e))
            })?;
            if produced > self.limits.max_part_bytes {
                return Err(too_large(&name, self.limits.max_part_bytes));
            }

            total += produced;
            if total > self.limits.max_total_bytes {
                return Err(too_large("package", self.limits.max_total_bytes));
            }
        }
        Ok(total)
    }

    /// Bytes of part `name`, or `None` when the package has no such part.
    pub fn read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>, ConversionError> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(ConversionError::Content(format!(
                    "Failed to read {} from .docx: {}",
                    name, e
                )))
            }
        };
        if file.size() > self.limits.max_part_bytes {
            return Err(too_large(name, self.limits.max_part_bytes));
        }

        let mut buf = Vec::new();
        (&mut file)
            .take(self.limits.max_part_bytes + 1)
            .read_to_end(&mut buf)
            .map_err(|e| {
                ConversionError::Content(format!("Failed to read {} from .docx: {}", name, e))
            })?;
        if buf.len() as u64 > self.limits.max_part_bytes {
            return Err(too_large(name, self.limits.max_part_bytes));
        }
        Ok(Some(buf))
    }
}

/// Resolve a relationship target against the source part's directory.
pub fn resolve_part(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Relationship targets that point outside the package (`https://`, `mailto:`).
pub fn is_external_target(target: &str) -> bool {
    target.contains("://") || target.starts_with("mailto:")
}
