use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// External conversion tools, resolved through `PATH` unless given as paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Headless office suite (default: "soffice")
    pub soffice: String,

    /// Outlook `.msg` to `.eml` converter (default: "msgconvert")
    pub msgconvert: String,

    /// RTF to text converter (default: "unrtf")
    pub unrtf: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            soffice: "soffice".to_string(),
            msgconvert: "msgconvert".to_string(),
            unrtf: "unrtf".to_string(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory for uploaded and converted files (default: "./tmp")
    pub temp_dir: PathBuf,

    /// Shared secret expected in `X-API-Key`. `None` disables the key gate.
    pub api_key: Option<String>,

    /// Maximum request body size in bytes (default: 256 MB)
    pub max_file_size: usize,

    /// Files older than this are removed by the retention sweep (default: 1 hour)
    pub retention: Duration,

    /// Pause between retention sweeps (default: 1 hour)
    pub sweep_interval: Duration,

    /// Upper bound for a single external tool run (default: unbounded)
    pub convert_timeout: Option<Duration>,

    pub tools: ToolConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("./tmp"),
            api_key: None,
            max_file_size: 256 * 1024 * 1024, // 256 MB
            retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(3600),
            convert_timeout: None,
            tools: ToolConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            temp_dir: env::var("TEMP_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.temp_dir),

            api_key: env::var("API_KEY").ok().filter(|v| !v.is_empty()),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            retention: env::var("RETENTION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.retention),

            sweep_interval: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(default.sweep_interval),

            convert_timeout: env::var("CONVERT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),

            tools: ToolConfig {
                soffice: env::var("SOFFICE_BIN").unwrap_or(default.tools.soffice),
                msgconvert: env::var("MSGCONVERT_BIN").unwrap_or(default.tools.msgconvert),
                unrtf: env::var("UNRTF_BIN").unwrap_or(default.tools.unrtf),
            },
        }
    }

    /// Create config for development (no key gate, short retention)
    pub fn development() -> Self {
        Self {
            temp_dir: PathBuf::from("./tmp"),
            api_key: None,
            max_file_size: 256 * 1024 * 1024,
            retention: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
            convert_timeout: Some(Duration::from_secs(120)),
            tools: ToolConfig::default(),
        }
    }

    pub fn auth_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}
