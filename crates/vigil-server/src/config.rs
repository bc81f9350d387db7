use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub notification: NotificationSettings,
}

#[derive(Debug, Deserialize)]
pub struct QueueConfig {
    /// Number of ordered partitions. Parallelism of the processor.
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// Messages buffered per partition before `publish` blocks.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct NotificationSettings {
    /// "stub" logs notifications, "webhook" posts them to the tenant's URL.
    #[serde(default = "default_notifier_mode")]
    pub mode: String,
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_partitions() -> usize {
    8
}

fn default_buffer_size() -> usize {
    1024
}

fn default_notifier_mode() -> String {
    "stub".to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            queue: QueueConfig::default(),
            notification: NotificationSettings::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            mode: default_notifier_mode(),
            webhook_timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.queue.partitions, 8);
        assert_eq!(config.notification.mode, "stub");
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            http_port = 9000

            [queue]
            partitions = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.queue.partitions, 2);
        assert_eq!(config.queue.buffer_size, 1024);
    }
}
