use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_INSTANCE: &str = "simulator";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Yamcs telemetry bridge", version)]
#[serde(rename_all = "camelCase")]
pub struct YamcsConfig {
    #[clap(long, env = "YAMCS_HOST", help = "Hostname of the Yamcs server.")]
    pub host: Option<String>,

    #[clap(long, env = "YAMCS_PORT", help = "Port of the Yamcs server.")]
    pub port: Option<u16>,

    #[clap(long, env = "YAMCS_INSTANCE", help = "Yamcs instance name.")]
    pub instance: Option<String>,

    #[clap(long, env = "YAMCS_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "YAMCS_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "YAMCS_LOG_LEVEL", help = "Logging level (debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "YAMCS_RECONNECT_BASE_DELAY_MS", help = "Base delay in milliseconds for push-socket reconnect attempts.")]
    pub reconnect_base_delay_ms: Option<u64>,

    #[clap(long, env = "YAMCS_RECONNECT_MAX_DELAY_MS", help = "Maximum delay in milliseconds for push-socket reconnect attempts.")]
    pub reconnect_max_delay_ms: Option<u64>,
}

impl YamcsConfig {
    // Merge two configs, where 'other' overrides 'self' for Some values
    fn merge(self, other: YamcsConfig) -> YamcsConfig {
        YamcsConfig {
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            instance: other.instance.or(self.instance),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            reconnect_base_delay_ms: other.reconnect_base_delay_ms.or(self.reconnect_base_delay_ms),
            reconnect_max_delay_ms: other.reconnect_max_delay_ms.or(self.reconnect_max_delay_ms),
        }
    }

    /// A config pointing at an explicit endpoint, with defaults elsewhere.
    pub fn for_endpoint(host: impl Into<String>, port: u16, instance: impl Into<String>) -> Self {
        YamcsConfig {
            host: Some(host.into()),
            port: Some(port),
            instance: Some(instance.into()),
            ..Default::default()
        }
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn instance(&self) -> &str {
        self.instance.as_deref().unwrap_or(DEFAULT_INSTANCE)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn reconnect_base_delay_ms(&self) -> u64 {
        self.reconnect_base_delay_ms.unwrap_or(1000)
    }

    pub fn reconnect_max_delay_ms(&self) -> u64 {
        self.reconnect_max_delay_ms.unwrap_or(60000)
    }

    /// Base URL of the REST surface.
    pub fn http_base(&self) -> String {
        format!("http://{}:{}/", self.host(), self.port())
    }

    /// Endpoint of the push websocket.
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/{}/_websocket", self.host(), self.port(), self.instance())
    }
}

/// Layered load: defaults, then a JSON config file, then environment
/// variables and CLI arguments (clap handles the last two together).
pub fn load_config() -> YamcsConfig {
    let cli_args = YamcsConfig::parse();

    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("yamcs_bridge.conf"));

    let mut current = YamcsConfig::default();

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<YamcsConfig>(&config_str) {
                Ok(file_config) => current = current.merge(file_config),
                Err(e) => log::warn!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                ),
            },
            Err(e) => log::warn!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                config_file_path.display(),
                e
            ),
        }
    }

    current.merge(cli_args)
}
