use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::graph::TypeGraph;

#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct PathError {
    pub path: String,
    pub source: serde_json::Error,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| PathError {
        path: err.path().to_string(),
        source: err.into_inner(),
    })
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| PathError {
        path: err.path().to_string(),
        source: err.into_inner(),
    })
}

/// Read one serialized type graph.
pub fn read_graph(path: &Path) -> anyhow::Result<TypeGraph> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    from_slice_with_path(&bytes).with_context(|| format!("failed to parse type graph {}", path.display()))
}
