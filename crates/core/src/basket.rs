use anyhow::Context;
use std::path::Path;

/// Loads the pre-fetched basket snapshot and returns its JSON verbatim.
///
/// The file is read fresh on every call — no caching, no schema checks
/// beyond the content being valid JSON. The snapshot is produced outside
/// this service and passed through unmodified.
pub fn load_snapshot(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read basket snapshot {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("basket snapshot {} is not valid JSON", path.display()))
}
