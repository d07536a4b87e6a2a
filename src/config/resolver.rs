//! Configuration resolver.
//!
//! Resolution is one linear pass: register defaults, discover the config
//! file, parse and merge it over the defaults, decode the merged tree into
//! [`ServerConfig`], then check invariants. A missing file is fine; an
//! unreadable, unparsable, mistyped or invalid one is fatal.

use super::defaults::{DefaultSet, register_defaults};
use super::merge::deep_merge;
use super::search::{CONFIG_BASE_NAME, CONFIG_EXTENSION, SearchPaths, discover_config_path};
use super::types::{SendMethod, ServerConfig};
use crate::error::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolve the configuration from `search_dirs`.
///
/// The first directory holding `config.yaml` supplies the file; with no file
/// the defaults are returned.
pub fn resolve_config(search_dirs: &[PathBuf]) -> ConfigResult<ServerConfig> {
    let path = discover_config_path(search_dirs, CONFIG_BASE_NAME, CONFIG_EXTENSION);
    let (config, _) = resolve_from(path.as_deref())?;
    Ok(config)
}

fn resolve_from(path: Option<&Path>) -> ConfigResult<(ServerConfig, Value)> {
    let merged = load_and_merge(path, register_defaults())?;
    let config = decode(&merged)?;
    validate(&config)?;
    Ok((config, merged))
}

/// Merge the file at `path` over `defaults`.
///
/// With no path the defaults are returned unchanged.
pub fn load_and_merge(path: Option<&Path>, defaults: DefaultSet) -> ConfigResult<Value> {
    let Some(path) = path else {
        info!("No config file found, using defaults");
        return Ok(defaults.into_value());
    };

    info!(path = %path.display(), "Loading config file");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut file_value = parse_document(path, &content)?;
    rename_legacy_keys(&mut file_value);

    for key in unknown_keys(&file_value, &defaults) {
        warn!(key = %key, path = %path.display(), "Ignoring unknown config key");
    }

    Ok(deep_merge(defaults.into_value(), file_value))
}

/// Top-level keys of `file_value` that no default covers. Keys are matched
/// literally, so `queue.workers` at the top level is unknown.
fn unknown_keys<'a>(file_value: &'a Value, defaults: &DefaultSet) -> Vec<&'a str> {
    let Value::Object(file_map) = file_value else {
        return Vec::new();
    };
    file_map
        .keys()
        .filter(|key| defaults.as_value().get(key.as_str()).is_none())
        .map(String::as_str)
        .collect()
}

/// Older files name the bridge topic filters `bridgeRule.topics`.
fn rename_legacy_keys(file_value: &mut Value) {
    let Some(rule) = file_value.get_mut("bridgeRule").and_then(Value::as_object_mut) else {
        return;
    };
    if let Some(topics) = rule.remove("topics") {
        if rule.contains_key("sourceTopics") {
            warn!("Both bridgeRule.topics and bridgeRule.sourceTopics are set, using sourceTopics");
        } else {
            rule.insert("sourceTopics".to_string(), topics);
        }
    }
}

/// Parse a YAML document whose root must be a mapping. An empty document is
/// an empty mapping. Merge keys (`<<: *anchor`) are expanded before the
/// document is converted to the merge representation.
fn parse_document(path: &Path, content: &str) -> ConfigResult<Value> {
    if is_blank_document(content) {
        return Ok(Value::Object(Map::new()));
    }
    let mut document: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|err| ConfigError::parse(path, err.to_string()))?;
    document
        .apply_merge()
        .map_err(|err| ConfigError::parse(path, err.to_string()))?;
    let value =
        serde_json::to_value(document).map_err(|err| ConfigError::parse(path, err.to_string()))?;
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        other => Err(ConfigError::parse(
            path,
            format!("expected a mapping at the top level, found {}", type_name(&other)),
        )),
    }
}

/// Only whitespace, comments and document markers.
fn is_blank_document(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Decode the merged tree into the typed configuration.
///
/// Keys are decoded one at a time and the path inside each key is tracked, so
/// a type mismatch names the full field path (`queue.batchSize`). Keys
/// missing from `merged` take the type's default; unknown keys are ignored.
pub fn decode(merged: &Value) -> ConfigResult<ServerConfig> {
    let Value::Object(map) = merged else {
        return Err(ConfigError::decode(
            "<root>",
            format!("expected a mapping, found {}", type_name(merged)),
        ));
    };

    Ok(ServerConfig {
        app_name: decode_field(map, "appName")?,
        port: decode_field(map, "port")?,
        chan_buffer_size: decode_field(map, "chanBufferSize")?,
        bridge_rule: decode_field(map, "bridgeRule")?,
        mq_type: decode_field(map, "mqType")?,
        rocketmq_config: decode_field(map, "rocketmqConfig")?,
        rabbitmq_config: decode_field(map, "rabbitmqConfig")?,
        kafka_config: decode_field(map, "kafkaConfig")?,
        send_method: decode_field(map, "sendMethod")?,
        queue: decode_field(map, "queue")?,
    })
}

fn decode_field<T>(map: &Map<String, Value>, key: &str) -> ConfigResult<T>
where
    T: DeserializeOwned + Default,
{
    match map.get(key) {
        Some(value) => serde_path_to_error::deserialize(value).map_err(|err| {
            let field = match err.path().to_string().as_str() {
                "." => key.to_string(),
                inner => format!("{}.{}", key, inner),
            };
            ConfigError::decode(field, err.inner())
        }),
        None => {
            debug!(key = %key, "Config key missing, using type default");
            Ok(T::default())
        }
    }
}

/// Check the invariants decoding cannot express.
pub fn validate(config: &ServerConfig) -> ConfigResult<()> {
    let topics = &config.bridge_rule.source_topics;
    if topics.is_empty() {
        return Err(ConfigError::invariant(
            "bridgeRule.sourceTopics",
            "at least one topic filter is required",
        ));
    }
    if let Some(index) = topics.iter().position(|t| t.trim().is_empty()) {
        return Err(ConfigError::invariant(
            format!("bridgeRule.sourceTopics[{}]", index),
            "topic filter must not be blank",
        ));
    }

    let Some(broker) = config.broker() else {
        return Err(ConfigError::invariant(
            "mqType",
            format!(
                "unknown broker type `{}`, expected one of Rocketmq, Rabbitmq, Kafka",
                config.mq_type
            ),
        ));
    };
    let endpoints_field = format!("{}.{}", broker.config_key(), broker.endpoints_key());
    if broker.endpoints().is_empty() {
        return Err(ConfigError::invariant(
            endpoints_field,
            format!("at least one endpoint is required when mqType is {}", config.mq_type),
        ));
    }
    if let Some(index) = broker.endpoints().iter().position(|e| e.trim().is_empty()) {
        return Err(ConfigError::invariant(
            format!("{}[{}]", endpoints_field, index),
            "endpoint must not be blank",
        ));
    }

    if config.queue.batch_size == 0 {
        return Err(ConfigError::invariant("queue.batchSize", "must be at least 1"));
    }
    if config.queue.workers == 0 {
        return Err(ConfigError::invariant("queue.workers", "must be at least 1"));
    }
    if config.send_method == SendMethod::Direct {
        debug!("sendMethod is direct, queue settings are unused");
    }

    Ok(())
}

/// Configuration loader: discovery, merging and decoding in one place.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Directories that were searched
    pub paths: SearchPaths,
    /// Loaded configuration
    config: ServerConfig,
    /// Defaults merged with the file, before decoding
    merged: Value,
    /// Path to the config file that was used (if any)
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration along the standard search path.
    pub fn load() -> ConfigResult<Self> {
        Self::load_with_paths(SearchPaths::standard())
    }

    /// Load configuration along an explicit search path.
    pub fn load_with_paths(paths: SearchPaths) -> ConfigResult<Self> {
        let config_path = paths.find_config();
        let (config, merged) = resolve_from(config_path.as_deref())?;
        Ok(Self {
            paths,
            config,
            merged,
            config_path,
        })
    }

    /// Load a specific file, skipping discovery. The file must exist.
    pub fn load_file(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let (config, merged) = resolve_from(Some(path.as_path()))?;
        Ok(Self {
            paths: SearchPaths::with_dirs(Vec::new()),
            config,
            merged,
            config_path: Some(path),
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> ServerConfig {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// The merged tree the configuration was decoded from.
    pub fn merged(&self) -> &Value {
        &self.merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MqType, SendMethod};
    use crate::error::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_no_path_returns_defaults() {
        let merged = load_and_merge(None, register_defaults()).unwrap();
        assert_eq!(merged, register_defaults().into_value());
    }

    #[test]
    fn test_merge_overrides_present_keys_only() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            "port: 9999\nqueue:\n  workers: 8\nkafkaConfig:\n  addresses: [\"k1:9092\", \"k2:9092\"]\n",
        );

        let merged = load_and_merge(Some(path.as_path()), register_defaults()).unwrap();
        assert_eq!(merged["port"], json!(9999));
        assert_eq!(merged["queue"], json!({"batchSize": 100, "workers": 8, "lingerTime": 1}));
        assert_eq!(merged["kafkaConfig"]["addresses"], json!(["k1:9092", "k2:9092"]));
        assert_eq!(merged["kafkaConfig"]["topic"], json!("emqx_exhook"));
        assert_eq!(merged["appName"], json!("go-emqx-exhook"));
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "# nothing configured\n");
        let merged = load_and_merge(Some(path.as_path()), register_defaults()).unwrap();
        assert_eq!(merged, register_defaults().into_value());
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "port: [9999\nqueue: {\n");
        let err = load_and_merge(Some(path.as_path()), register_defaults()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn test_non_mapping_root_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "- port\n- 9999\n");
        let err = load_and_merge(Some(path.as_path()), register_defaults()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("found a sequence"));
    }

    #[test]
    fn test_legacy_topics_key_is_renamed() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "bridgeRule:\n  topics: [\"devices/#\"]\n");
        let merged = load_and_merge(Some(path.as_path()), register_defaults()).unwrap();
        assert_eq!(merged["bridgeRule"], json!({"sourceTopics": ["devices/#"]}));
        let config = decode(&merged).unwrap();
        assert_eq!(config.bridge_rule.source_topics, vec!["devices/#".to_string()]);
    }

    #[test]
    fn test_missing_explicit_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("config.yaml");
        let err = load_and_merge(Some(missing.as_path()), register_defaults()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_decode_type_mismatch_names_field() {
        let mut merged = register_defaults().into_value();
        merged["port"] = json!("not-a-port");
        let err = decode(&merged).unwrap_err();
        match err {
            ConfigError::Decode { field, message } => {
                assert_eq!(field, "port");
                assert!(message.contains("expected u16"), "{}", message);
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_nested_type_mismatch() {
        let mut merged = register_defaults().into_value();
        merged["queue"]["batchSize"] = json!("lots");
        let err = decode(&merged).unwrap_err();
        match err {
            ConfigError::Decode { field, message } => {
                assert_eq!(field, "queue.batchSize");
                assert!(message.contains("expected u32"), "{}", message);
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_deep_type_mismatch_names_path() {
        let mut merged = register_defaults().into_value();
        merged["kafkaConfig"]["sasl"]["enable"] = json!("maybe");
        let err = decode(&merged).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for `kafkaConfig.sasl.enable`: invalid type: string \"maybe\", expected a boolean"
        );

        let mut merged = register_defaults().into_value();
        merged["rabbitmqConfig"]["routingKeys"] = json!(["exhook", 7]);
        let err = decode(&merged).unwrap_err();
        assert!(
            err.to_string().contains("`rabbitmqConfig.routingKeys[1]`"),
            "{}",
            err
        );
    }

    #[test]
    fn test_merge_keys_are_expanded() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            "common: &queue\n  batchSize: 50\n  lingerTime: 3\nqueue:\n  <<: *queue\n  workers: 3\n",
        );

        let merged = load_and_merge(Some(path.as_path()), register_defaults()).unwrap();
        assert_eq!(merged["queue"], json!({"batchSize": 50, "workers": 3, "lingerTime": 3}));
        assert!(merged["queue"].get("<<").is_none());

        let config = decode(&merged).unwrap();
        assert_eq!(config.queue.batch_size, 50);
        assert_eq!(config.queue.workers, 3);
    }

    #[test]
    fn test_unknown_keys_match_literally() {
        let file_value = json!({"port": 1, "queue.workers": 9, "legacyOption": true});
        let mut unknown = unknown_keys(&file_value, &register_defaults());
        unknown.sort();
        assert_eq!(unknown, vec!["legacyOption", "queue.workers"]);
    }

    #[test]
    fn test_validate_accepts_unbuffered_channel() {
        let mut config = ServerConfig::default();
        config.chan_buffer_size = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_decode_negative_linger_is_rejected() {
        let mut merged = register_defaults().into_value();
        merged["queue"]["lingerTime"] = json!(-1);
        assert_eq!(decode(&merged).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_decode_unknown_mq_type_is_structural() {
        let mut merged = register_defaults().into_value();
        merged["mqType"] = json!("Pulsar");
        let config = decode(&merged).unwrap();
        assert_eq!(config.mq_type, MqType::Unknown("Pulsar".to_string()));

        let err = validate(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert!(err.to_string().contains("Pulsar"));
    }

    #[test]
    fn test_decode_defaults_equals_type_default() {
        let config = decode(register_defaults().as_value()).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_decode_missing_keys_take_type_defaults() {
        let config = decode(&json!({"port": 1883})).unwrap();
        assert_eq!(config.port, 1883);
        assert_eq!(config.queue, ServerConfig::default().queue);
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = ServerConfig::default();
        config.queue.batch_size = 0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvariantViolation { ref field, .. } if field == "queue.batchSize"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = ServerConfig::default();
        config.queue.workers = 0;
        assert_eq!(validate(&config).unwrap_err().kind(), ErrorKind::Invariant);
    }

    #[test]
    fn test_validate_rejects_empty_topics() {
        let mut config = ServerConfig::default();
        config.bridge_rule.source_topics.clear();
        assert!(validate(&config)
            .unwrap_err()
            .to_string()
            .contains("bridgeRule.sourceTopics"));

        config.bridge_rule.source_topics = vec!["a/#".to_string(), "  ".to_string()];
        assert!(validate(&config)
            .unwrap_err()
            .to_string()
            .contains("bridgeRule.sourceTopics[1]"));
    }

    #[test]
    fn test_validate_checks_only_active_broker_endpoints() {
        let mut config = ServerConfig::default();
        config.kafka_config.addresses.clear();
        assert!(validate(&config).is_ok());

        config.mq_type = MqType::Kafka;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("kafkaConfig.addresses"));
    }

    #[test]
    fn test_loader_reports_source_file() {
        let temp = TempDir::new().unwrap();
        let conf = temp.path().join("conf");
        write_config(&conf, "sendMethod: direct\nmqType: Rabbitmq\n");

        let paths = SearchPaths::with_dirs(vec![temp.path().join("missing"), conf.clone()]);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        assert_eq!(loader.config_path(), Some(conf.join("config.yaml").as_path()));
        assert_eq!(loader.config().send_method, SendMethod::Direct);
        assert_eq!(loader.merged()["mqType"], json!("Rabbitmq"));
        assert_eq!(loader.into_config().mq_type, MqType::Rabbitmq);
    }

    #[test]
    fn test_loader_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let paths = SearchPaths::with_dirs(vec![temp.path().to_path_buf()]);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        assert!(loader.config_path().is_none());
        assert_eq!(loader.config(), &ServerConfig::default());
    }

    #[test]
    fn test_load_file_requires_existing_file() {
        let temp = TempDir::new().unwrap();
        let err = ConfigLoader::load_file(temp.path().join("nope.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
