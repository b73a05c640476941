use crate::error::{PaybatchError, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Matches the dashboard's hydration blocks: elements carrying a
/// `hydration-key` marker attribute whose text content is a JSON document.
/// The block may sit anywhere in the page; content runs up to the next tag.
static HYDRATION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"hydration-key="([^"]+)"\s+type="application/json"\s*>([^<]+)<"#)
        .expect("hydration block pattern is valid")
});

/// Locates the hydration block tagged with `key` in `document` and decodes
/// its content as JSON.
///
/// This is the only place in the crate that touches markup; everything
/// downstream deals in structured values.
pub fn extract_embedded(document: &str, key: &str) -> Result<Value> {
    let payload = HYDRATION_BLOCK
        .captures_iter(document)
        .find(|caps| &caps[1] == key)
        .map(|caps| caps[2].trim().to_string())
        .ok_or_else(|| PaybatchError::ExtractionNotFound {
            key: key.to_string(),
        })?;

    serde_json::from_str(&payload).map_err(|source| PaybatchError::ExtractionMalformed {
        key: key.to_string(),
        source,
    })
}
