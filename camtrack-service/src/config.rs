use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// `[mqtt]`: broker connection parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MqttSection {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_max_reconnect_delay_s")]
    pub max_reconnect_delay_s: u64,
    #[serde(default)]
    pub tls: TlsSection,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: default_client_id(),
            max_reconnect_delay_s: default_max_reconnect_delay_s(),
            tls: TlsSection::default(),
        }
    }
}

/// `[mqtt.tls]`: optional mutual-TLS material. Plaintext when all three
/// paths are unset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TlsSection {
    pub ca_cert_path: Option<PathBuf>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
    #[serde(default = "default_verify_server")]
    pub verify_server: bool,
}

/// `[tracker]`: pipeline cadence and resource limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerSection {
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: f64,
    #[serde(default = "default_max_lag_ms")]
    pub max_lag_ms: u64,
    #[serde(default = "default_worker_queue_capacity")]
    pub worker_queue_capacity: usize,
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    #[serde(default)]
    pub schema_validation: bool,
    #[serde(default)]
    pub healthcheck: HealthcheckSection,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            chunk_interval_ms: default_chunk_interval_ms(),
            max_lag_ms: default_max_lag_ms(),
            worker_queue_capacity: default_worker_queue_capacity(),
            drain_timeout_ms: default_drain_timeout_ms(),
            schema_validation: false,
            healthcheck: HealthcheckSection::default(),
        }
    }
}

/// `[tracker.healthcheck]`: the liveness/readiness/metrics HTTP surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthcheckSection {
    #[serde(default = "default_healthcheck_port")]
    pub port: u16,
}

impl Default for HealthcheckSection {
    fn default() -> Self {
        Self { port: default_healthcheck_port() }
    }
}

/// `[observability.logging]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilitySection {
    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[scene]`: the single scene this deployment tracks. Not in the closed
/// config table the wire payloads are validated against, but every
/// published scene-data message needs a scene id and name, so the service
/// has to get them from somewhere — this is that somewhere.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SceneSection {
    #[serde(default = "default_scene_id")]
    pub id: String,
    #[serde(default = "default_scene_name")]
    pub name: String,
}

impl Default for SceneSection {
    fn default() -> Self {
        Self { id: default_scene_id(), name: default_scene_name() }
    }
}

/// `[[cameras]]`: one entry per known camera and its pixel-to-world
/// homography. A camera absent from this list still gets tracked, just
/// with an identity projection and a warning logged once per message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CameraSection {
    pub id: String,
    #[serde(default = "default_homography")]
    pub homography: [[f64; 3]; 3],
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "camtrack".to_string()
}
fn default_max_reconnect_delay_s() -> u64 {
    30
}
fn default_verify_server() -> bool {
    true
}
fn default_chunk_interval_ms() -> f64 {
    66.667
}
fn default_max_lag_ms() -> u64 {
    1000
}
fn default_worker_queue_capacity() -> usize {
    2
}
fn default_drain_timeout_ms() -> u64 {
    2000
}
fn default_healthcheck_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_scene_id() -> String {
    "scene1".to_string()
}
fn default_scene_name() -> String {
    "Main scene".to_string()
}
fn default_homography() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

/// Top-level service configuration, loaded from a TOML file and then
/// overridden by `TRACKER_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub tracker: TrackerSection,
    #[serde(default)]
    pub observability: ObservabilitySection,
    #[serde(default)]
    pub scene: SceneSection,
    #[serde(default)]
    pub cameras: Vec<CameraSection>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttSection::default(),
            tracker: TrackerSection::default(),
            observability: ObservabilitySection::default(),
            scene: SceneSection::default(),
            cameras: Vec::new(),
        }
    }
}

const ENV_PREFIX: &str = "TRACKER_";

/// Loads `path` as TOML, applies `TRACKER_`-prefixed environment overrides,
/// then deserializes into [`ServiceConfig`]. An environment variable
/// `TRACKER_MQTT__HOST` overrides `mqtt.host`; the double underscore is the
/// nesting separator, chosen because single-segment keys (`client_id`)
/// already contain single underscores.
pub fn load(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let mut value: toml::Value = raw.parse().map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
    apply_env_overrides(&mut value, std::env::vars());
    value.try_into().map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
}

fn apply_env_overrides(value: &mut toml::Value, vars: impl Iterator<Item = (String, String)>) {
    for (key, raw) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else { continue };
        let path: Vec<String> = rest.to_lowercase().split("__").map(String::from).collect();
        set_nested(value, &path, raw);
    }
}

fn set_nested(value: &mut toml::Value, path: &[String], raw: String) {
    let Some((head, rest)) = path.split_first() else { return };
    if !matches!(value, toml::Value::Table(_)) {
        *value = toml::Value::Table(toml::value::Table::new());
    }
    let table = match value {
        toml::Value::Table(t) => t,
        _ => unreachable!(),
    };
    if rest.is_empty() {
        table.insert(head.clone(), parse_scalar(&raw));
    } else {
        let entry = table
            .entry(head.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        set_nested(entry, rest, raw);
    }
}

fn parse_scalar(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_document() {
        let value: toml::Value = "".parse().unwrap();
        let config: ServiceConfig = value.try_into().unwrap();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.scene.id, "scene1");
    }

    #[test]
    fn loads_and_parses_a_full_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.toml");
        std::fs::write(
            &path,
            r#"
            [mqtt]
            host = "broker.example.com"
            port = 8883

            [mqtt.tls]
            ca_cert_path = "/etc/camtrack/ca.pem"

            [tracker]
            chunk_interval_ms = 100.0
            schema_validation = true

            [scene]
            id = "lobby"
            name = "Front lobby"

            [[cameras]]
            id = "cam1"
            homography = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
            "#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.mqtt.host, "broker.example.com");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.tls.ca_cert_path, Some(PathBuf::from("/etc/camtrack/ca.pem")));
        assert!(config.tracker.schema_validation);
        assert_eq!(config.scene.id, "lobby");
        assert_eq!(config.cameras.len(), 1);
        assert_eq!(config.cameras[0].id, "cam1");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let value: Result<toml::Value, _> = "[mqtt]\nbogus = 1\n".parse();
        let value = value.unwrap();
        let result: Result<ServiceConfig, _> = value.try_into();
        assert!(result.is_err());
    }

    #[test]
    fn env_override_sets_nested_value() {
        let mut value: toml::Value = "[mqtt]\nhost = \"localhost\"\n".parse().unwrap();
        let vars = vec![
            ("TRACKER_MQTT__HOST".to_string(), "broker.example.com".to_string()),
            ("TRACKER_MQTT__PORT".to_string(), "8883".to_string()),
            ("UNRELATED_VAR".to_string(), "ignored".to_string()),
        ];
        apply_env_overrides(&mut value, vars.into_iter());
        let config: ServiceConfig = value.try_into().unwrap();
        assert_eq!(config.mqtt.host, "broker.example.com");
        assert_eq!(config.mqtt.port, 8883);
    }

    #[test]
    fn env_override_creates_missing_table() {
        let mut value: toml::Value = "".parse().unwrap();
        let vars = vec![("TRACKER_SCENE__ID".to_string(), "lobby".to_string())];
        apply_env_overrides(&mut value, vars.into_iter());
        let config: ServiceConfig = value.try_into().unwrap();
        assert_eq!(config.scene.id, "lobby");
    }
}
