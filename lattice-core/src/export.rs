use crate::crawl::CrawlError;
use crate::data::Store;
use chrono::Utc;
use lattice_scanner::ConnectionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// The export/import document format: a timestamped snapshot of the whole
/// connection map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphExport {
    pub exported_at: String,
    pub total_users: usize,
    pub connections: HashMap<String, ConnectionRecord>,
}

pub fn export_graph(store: &Store) -> Result<GraphExport, CrawlError> {
    let connections = store.load_connections()?;
    Ok(GraphExport {
        exported_at: Utc::now().to_rfc3339(),
        total_users: connections.len(),
        connections,
    })
}

/// Parse and validate an export document, then replace the stored map with
/// its contents. Individually malformed records are dropped with a warning;
/// the import fails only when the document is unusable as a whole.
pub fn import_graph(store: &mut Store, doc: &str) -> Result<usize, CrawlError> {
    let value: Value = serde_json::from_str(doc)
        .map_err(|e| CrawlError::InvalidImport(format!("not valid JSON: {}", e)))?;

    let entries = value
        .get("connections")
        .and_then(Value::as_object)
        .ok_or_else(|| CrawlError::InvalidImport("missing `connections` object".to_string()))?;

    let mut valid: HashMap<String, ConnectionRecord> = HashMap::new();
    for (key, entry) in entries {
        match normalize_record(key, entry) {
            Some(record) => {
                valid.insert(record.id.clone(), record);
            }
            None => warn!("dropping invalid record under key {}", key),
        }
    }

    if valid.is_empty() {
        return Err(CrawlError::InvalidImport(
            "document yields zero valid records".to_string(),
        ));
    }

    let count = valid.len();
    store.replace_connections(&valid)?;
    Ok(count)
}

/// Normalize one exported record per the documented field defaults. Returns
/// `None` when the entry cannot be salvaged into a record with an id.
fn normalize_record(key: &str, entry: &Value) -> Option<ConnectionRecord> {
    if !entry.is_object() {
        return None;
    }

    let mut record: ConnectionRecord = serde_json::from_value(entry.clone()).ok()?;

    if record.id.is_empty() {
        record.id = key.to_string();
    }
    if record.id.is_empty() {
        return None;
    }
    if record.display_name.is_empty() {
        record.display_name = if record.tag.is_empty() {
            record.id.clone()
        } else {
            record.tag.clone()
        };
    }
    record.mutual_ids.retain(|id| !id.is_empty());

    Some(record)
}
