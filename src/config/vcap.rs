//! Credentials from `VCAP_SERVICES`.
//!
//! The platform injects bound-service details as
//! `{"<label>": [{"name": ..., "credentials": {...}}, ...], ...}`. Only the
//! `credentials` objects matter here. They are flattened into one map with
//! upper-cased keys; scalar values are stringified and nested values ignored.
//! When two services provide the same key the first one wins.
//!
//! A `uri` credential is kept only when it names a SQLite database. Other
//! bound services (redis, log drains, a Postgres instance) carry their own
//! `uri`, and none of them is a freshness store.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::core::ConfigError;

#[derive(Debug, Deserialize)]
struct BoundService {
    #[serde(default)]
    credentials: serde_json::Map<String, Value>,
}

/// Flatten every bound service's credentials.
///
/// # Errors
///
/// Returns [`ConfigError::VcapServices`] if `raw` is not a label → services map.
pub(super) fn credentials(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let services: BTreeMap<String, Vec<BoundService>> =
        serde_json::from_str(raw).map_err(ConfigError::VcapServices)?;

    let mut flattened = HashMap::new();
    for service in services.into_values().flatten() {
        for (key, value) in service.credentials {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            let key = key.to_ascii_uppercase();
            if key == "URI" && !value.starts_with("sqlite:") {
                continue;
            }
            flattened.entry(key).or_insert(value);
        }
    }
    Ok(flattened)
}
