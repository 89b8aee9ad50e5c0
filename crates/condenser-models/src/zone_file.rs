//! Court zone polygon file.
//!
//! The zone file is produced by the zone authoring tool and stores one
//! polygon per serve-ready standing area, in original-resolution pixels:
//!
//! ```json
//! [[[120, 400], [300, 400], [300, 560], [120, 560]], ...]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult, Vertex};

/// Raw polygons as stored on disk, in authoring order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneFile(pub Vec<Vec<Vertex>>);

impl ZoneFile {
    /// Parse zone polygons from a JSON string.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a zone file.
    pub fn from_path(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Number of polygons in the file.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn polygons(&self) -> &[Vec<Vertex>] {
        &self.0
    }
}
