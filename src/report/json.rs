use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::path::Path;

use crate::core::pipeline::PipelineResult;
use crate::Result;

/// The info record for one run, as written to `info_jsons/`
pub fn info_json(result: &PipelineResult, alignment_file: Option<&Path>) -> Result<Value> {
    let mut value = serde_json::to_value(result)?;
    if let Value::Object(map) = &mut value {
        map.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        if let Some(path) = alignment_file {
            map.insert(
                "alignment_clustered_ldos_file".to_string(),
                Value::String(path.display().to_string()),
            );
        }
    }
    Ok(value)
}

pub fn write_info_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value)?;
    std::fs::write(path, contents)?;
    Ok(())
}
