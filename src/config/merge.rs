//! Override-by-presence merging of the config file over the defaults.
//!
//! Mappings merge key by key; every other value present in the file replaces
//! the default wholesale. Sequences are never merged element-wise.

use serde_json::Value;

/// Merge `overlay` over `base`, with `overlay` taking precedence.
///
/// - Mappings are merged recursively: keys in overlay override keys in base
/// - Sequences, strings, numbers and booleans replace the base value
/// - A null overlay keeps the base value (`port:` with no value means "unset")
///
/// # Example
/// ```
/// use serde_json::json;
/// use emqx_exhook::config::deep_merge;
///
/// let defaults = json!({
///     "queue": { "batchSize": 100, "workers": 2 },
///     "bridgeRule": { "sourceTopics": ["/#"] }
/// });
/// let file = json!({
///     "queue": { "workers": 8 },
///     "bridgeRule": { "sourceTopics": ["sensors/+"] }
/// });
/// let merged = deep_merge(defaults, file);
/// assert_eq!(merged["queue"], json!({ "batchSize": 100, "workers": 8 }));
/// assert_eq!(merged["bridgeRule"]["sourceTopics"], json!(["sensors/+"]));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}
