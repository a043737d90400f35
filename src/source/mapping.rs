use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{SourceError, SourceResult};
use crate::resolver::TagFilterMapping;

/// Read a tag mapping file.
///
/// A missing file yields an empty mapping, so every quiz resolves to an
/// empty filter until one is provided.
pub async fn load_tag_mapping(path: &Path) -> SourceResult<TagFilterMapping> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Tag mapping file not found, using empty mapping");
            return Ok(TagFilterMapping::new());
        }
        Err(e) => {
            return Err(SourceError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    let raw: Value = serde_json::from_str(&text).map_err(|e| SourceError::InvalidJson {
        origin: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mapping = TagFilterMapping::from_value(&raw);
    info!(path = %path.display(), entries = mapping.len(), "Loaded tag mapping");
    Ok(mapping)
}
