//! Level loading
//!
//! The cell grid plus metadata is the on-disk level format. Malformed data
//! is rejected here at the boundary; once a [`Map`] is handed to the
//! physics core it is assumed valid.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::sim::map::{Map, MapDefect};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse level file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("level grid is malformed: expected {expected} cells, found {actual}")]
    BadGrid { expected: usize, actual: usize },
    #[error("cell ({x}, {y}) has undefined flag bits {flags:#06x}")]
    BadFlags { x: i32, y: i32, flags: u16 },
}

/// Load and validate a level file
pub fn load_level(path: &Path) -> Result<Map, LevelError> {
    let text = fs::read_to_string(path)?;
    let map = parse_level(&text)?;
    log::info!(
        "loaded level '{}' from {}",
        map.name,
        path.display()
    );
    Ok(map)
}

/// Parse a level from its JSON text
pub fn parse_level(text: &str) -> Result<Map, LevelError> {
    let map: Map = serde_json::from_str(text)?;
    map.validate().map_err(|defect| match defect {
        MapDefect::BadShape { expected, actual } => LevelError::BadGrid { expected, actual },
        MapDefect::BadFlags { x, y, flags } => LevelError::BadFlags { x, y, flags },
    })?;
    Ok(map)
}
