//! Configuration types and structures.
//!
//! Field names follow the on-disk YAML layout (`camelCase`). Every broker
//! block is always present in the file format; only the one selected by
//! `mqType` is active, see [`ServerConfig::broker`].

use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Root configuration value for the bridge service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Service name (default: go-emqx-exhook).
    pub app_name: String,

    /// gRPC port the exhook server listens on (default: 16565).
    pub port: u16,

    /// Capacity of the internal message channel (default: 10240).
    pub chan_buffer_size: usize,

    /// Which MQTT topics are bridged.
    pub bridge_rule: BridgeRule,

    /// Selected broker backend (default: Rocketmq).
    pub mq_type: MqType,

    pub rocketmq_config: RocketmqConfig,

    pub rabbitmq_config: RabbitmqConfig,

    pub kafka_config: KafkaConfig,

    /// How messages are handed to the broker (default: queue).
    pub send_method: SendMethod,

    /// Batching parameters, used when `send_method` is `queue`.
    pub queue: Queue,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            port: DEFAULT_PORT,
            chan_buffer_size: DEFAULT_CHAN_BUFFER_SIZE,
            bridge_rule: BridgeRule::default(),
            mq_type: MqType::default(),
            rocketmq_config: RocketmqConfig::default(),
            rabbitmq_config: RabbitmqConfig::default(),
            kafka_config: KafkaConfig::default(),
            send_method: SendMethod::default(),
            queue: Queue::default(),
        }
    }
}

impl ServerConfig {
    /// The configuration block of the backend selected by `mqType`.
    ///
    /// Returns `None` when the selector does not name a known backend.
    pub fn broker(&self) -> Option<Broker<'_>> {
        match self.mq_type {
            MqType::Rocketmq => Some(Broker::Rocketmq(&self.rocketmq_config)),
            MqType::Rabbitmq => Some(Broker::Rabbitmq(&self.rabbitmq_config)),
            MqType::Kafka => Some(Broker::Kafka(&self.kafka_config)),
            MqType::Unknown(_) => None,
        }
    }
}

/// Bridge rule: the MQTT topic filters whose messages are forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeRule {
    /// MQTT subscription filters (wildcards allowed).
    #[serde(alias = "topics")]
    pub source_topics: Vec<String>,
}

impl Default for BridgeRule {
    fn default() -> Self {
        Self {
            source_topics: strings(DEFAULT_SOURCE_TOPICS),
        }
    }
}

/// Broker backend selector.
///
/// Unrecognised names are kept as [`MqType::Unknown`] so that decoding stays
/// structural; validation rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MqType {
    #[default]
    Rocketmq,
    Rabbitmq,
    Kafka,
    Unknown(String),
}

impl MqType {
    pub fn as_str(&self) -> &str {
        match self {
            MqType::Rocketmq => "Rocketmq",
            MqType::Rabbitmq => "Rabbitmq",
            MqType::Kafka => "Kafka",
            MqType::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, MqType::Unknown(_))
    }
}

impl From<String> for MqType {
    fn from(name: String) -> Self {
        if name.eq_ignore_ascii_case("rocketmq") {
            MqType::Rocketmq
        } else if name.eq_ignore_ascii_case("rabbitmq") {
            MqType::Rabbitmq
        } else if name.eq_ignore_ascii_case("kafka") {
            MqType::Kafka
        } else {
            MqType::Unknown(name)
        }
    }
}

impl From<MqType> for String {
    fn from(mq_type: MqType) -> Self {
        match mq_type {
            MqType::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How bridged messages reach the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMethod {
    /// Buffer messages and flush them in batches (default).
    #[default]
    Queue,
    /// Send each message as it arrives.
    Direct,
}

impl fmt::Display for SendMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendMethod::Queue => write!(f, "queue"),
            SendMethod::Direct => write!(f, "direct"),
        }
    }
}

/// Bridge target: RocketMQ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RocketmqConfig {
    /// NameServer addresses (`host:port`).
    pub name_server: Vec<String>,
    pub topic: String,
    pub tag: String,
    pub group_name: String,
    /// Access key for Aliyun RocketMQ; empty when unused.
    pub access_key: String,
    /// Secret key for Aliyun RocketMQ; empty when unused.
    pub secret_key: String,
}

impl Default for RocketmqConfig {
    fn default() -> Self {
        Self {
            name_server: strings(DEFAULT_ROCKETMQ_NAME_SERVER),
            topic: DEFAULT_TOPIC.to_string(),
            tag: DEFAULT_ROCKETMQ_TAG.to_string(),
            group_name: DEFAULT_ROCKETMQ_GROUP_NAME.to_string(),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

/// Bridge target: RabbitMQ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RabbitmqConfig {
    /// AMQP URIs.
    pub addresses: Vec<String>,
    pub routing_keys: Vec<String>,
    pub exchange_name: String,
}

impl Default for RabbitmqConfig {
    fn default() -> Self {
        Self {
            addresses: strings(DEFAULT_RABBITMQ_ADDRESSES),
            routing_keys: strings(DEFAULT_RABBITMQ_ROUTING_KEYS),
            exchange_name: DEFAULT_RABBITMQ_EXCHANGE_NAME.to_string(),
        }
    }
}

/// Bridge target: Kafka.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KafkaConfig {
    /// Bootstrap brokers (`host:port`).
    pub addresses: Vec<String>,
    pub topic: String,
    pub sasl: KafkaSasl,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            addresses: strings(DEFAULT_KAFKA_ADDRESSES),
            topic: DEFAULT_TOPIC.to_string(),
            sasl: KafkaSasl::default(),
        }
    }
}

/// Kafka SASL and TLS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KafkaSasl {
    pub enable: bool,
    pub user: String,
    pub password: String,
    /// SASL mechanism: plain, sha256 or sha512.
    pub algorithm: String,
    #[serde(rename = "useTLS")]
    pub use_tls: bool,
    /// Skip server certificate verification.
    pub tls_skip_verify: bool,
    pub ca_file: String,
    pub cert_file: String,
    pub key_file: String,
}

impl Default for KafkaSasl {
    fn default() -> Self {
        Self {
            enable: false,
            user: DEFAULT_KAFKA_SASL_USER.to_string(),
            password: DEFAULT_KAFKA_SASL_PASSWORD.to_string(),
            algorithm: DEFAULT_KAFKA_SASL_ALGORITHM.to_string(),
            use_tls: false,
            tls_skip_verify: false,
            ca_file: DEFAULT_KAFKA_CA_FILE.to_string(),
            cert_file: DEFAULT_KAFKA_CERT_FILE.to_string(),
            key_file: DEFAULT_KAFKA_KEY_FILE.to_string(),
        }
    }
}

/// Batching parameters for `sendMethod: queue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Queue {
    /// Messages per flush (default: 100).
    pub batch_size: u32,
    /// Concurrent senders (default: 2).
    pub workers: u32,
    /// Seconds a partial batch may wait before it is flushed (default: 1).
    pub linger_time: u64,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_QUEUE_BATCH_SIZE,
            workers: DEFAULT_QUEUE_WORKERS,
            linger_time: DEFAULT_QUEUE_LINGER_SECS,
        }
    }
}

impl Queue {
    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_time)
    }
}

/// Borrowed view of the active broker block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broker<'a> {
    Rocketmq(&'a RocketmqConfig),
    Rabbitmq(&'a RabbitmqConfig),
    Kafka(&'a KafkaConfig),
}

impl<'a> Broker<'a> {
    /// Key of this backend's block in the config file.
    pub fn config_key(&self) -> &'static str {
        match self {
            Broker::Rocketmq(_) => "rocketmqConfig",
            Broker::Rabbitmq(_) => "rabbitmqConfig",
            Broker::Kafka(_) => "kafkaConfig",
        }
    }

    /// Key of the endpoint list inside the backend's block.
    pub fn endpoints_key(&self) -> &'static str {
        match self {
            Broker::Rocketmq(_) => "nameServer",
            Broker::Rabbitmq(_) | Broker::Kafka(_) => "addresses",
        }
    }

    /// Connection endpoints, in configured order.
    pub fn endpoints(&self) -> &'a [String] {
        match self {
            Broker::Rocketmq(c) => &c.name_server,
            Broker::Rabbitmq(c) => &c.addresses,
            Broker::Kafka(c) => &c.addresses,
        }
    }

    /// Where bridged messages are published: topic or exchange name.
    pub fn destination(&self) -> &'a str {
        match self {
            Broker::Rocketmq(c) => &c.topic,
            Broker::Rabbitmq(c) => &c.exchange_name,
            Broker::Kafka(c) => &c.topic,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
