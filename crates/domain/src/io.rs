use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::DomainError, exercise::Catalog};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Yaml,
}

impl CatalogFormat {
    /// Picks the format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => CatalogFormat::Yaml,
            _ => CatalogFormat::Json,
        }
    }
}

pub fn parse_catalog(source: &str, format: CatalogFormat) -> Result<Catalog, DomainError> {
    match format {
        CatalogFormat::Json => serde_json::from_str(source)
            .map_err(|err| DomainError::Serialization(err.to_string())),
        CatalogFormat::Yaml => serde_yaml::from_str(source)
            .map_err(|err| DomainError::Serialization(err.to_string())),
    }
}

pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, DomainError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    parse_catalog(&source, CatalogFormat::from_path(path))
}

pub trait CatalogExporter {
    fn export(&self, catalog: &Catalog, format: CatalogFormat) -> Result<Vec<u8>, DomainError>;
}

/// Writes the valid part of a catalog back out; malformed entries are dropped.
pub struct NormalizingExporter;

impl CatalogExporter for NormalizingExporter {
    fn export(&self, catalog: &Catalog, format: CatalogFormat) -> Result<Vec<u8>, DomainError> {
        match format {
            CatalogFormat::Json => serde_json::to_vec_pretty(catalog)
                .map_err(|err| DomainError::Serialization(err.to_string())),
            CatalogFormat::Yaml => serde_yaml::to_string(catalog)
                .map(String::into_bytes)
                .map_err(|err| DomainError::Serialization(err.to_string())),
        }
    }
}
