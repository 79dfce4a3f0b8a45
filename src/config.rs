//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub custody: CustodyConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Redis配置（仅用于支持币种列表缓存，未配置时直接访问托管方）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub asset_cache_ttl_secs: u64,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    #[serde(default)]
    pub skip_migrations: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 托管方（Fireblocks）配置
///
/// 私钥只能通过环境变量注入：`FIREBLOCKS_SECRET_KEY`（PEM 内容）
/// 或 `FIREBLOCKS_SECRET_KEY_PATH`（PEM 文件路径）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub secret_key_pem: Option<String>,
    #[serde(default)]
    pub secret_key_path: Option<String>,
    pub timeout_secs: u64,
}

/// Excel 导出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://postgres@localhost:5432/walletdesk".into()),
            max_connections: std::env::var("DB_MAX_CONNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            min_connections: std::env::var("DB_MIN_CONNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            acquire_timeout_secs: std::env::var("DB_ACQ_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            asset_cache_ttl_secs: std::env::var("ASSET_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| {
                "default-jwt-secret-please-change-in-production-min-32-chars".to_string()
            }),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8088".into()),
            skip_migrations: std::env::var("SKIP_MIGRATIONS")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            // 默认沙箱环境，生产环境通过 FIREBLOCKS_BASE_URL 切换
            base_url: std::env::var("FIREBLOCKS_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox-api.fireblocks.io".into()),
            api_key: std::env::var("FIREBLOCKS_API_KEY").unwrap_or_default(),
            secret_key_pem: std::env::var("FIREBLOCKS_SECRET_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            secret_key_path: std::env::var("FIREBLOCKS_SECRET_KEY_PATH").ok(),
            timeout_secs: std::env::var("FIREBLOCKS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: std::env::var("EXPORT_DIR").unwrap_or_else(|_| "./exports".into()),
        }
    }
}

impl CustodyConfig {
    /// 读取托管方 RSA 私钥（PEM）
    ///
    /// 环境变量中的 PEM 内容优先，其次读取文件路径
    pub fn load_secret_key(&self) -> Result<String> {
        if let Some(pem) = &self.secret_key_pem {
            return Ok(pem.clone());
        }
        let path = self
            .secret_key_path
            .as_ref()
            .context("FIREBLOCKS_SECRET_KEY or FIREBLOCKS_SECRET_KEY_PATH must be set")?;
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read custody secret key: {}", path))
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            jwt: JwtConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            custody: CustodyConfig::default(),
            export: ExportConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let mut config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        // 私钥不允许写在配置文件中，只从环境变量注入
        config.custody.secret_key_pem = std::env::var("FIREBLOCKS_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("postgres://")
            && !self.database.url.starts_with("postgresql://")
        {
            anyhow::bail!("DATABASE_URL must start with postgres:// or postgresql://");
        }

        if self.jwt.secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if !self.custody.base_url.starts_with("https://") {
            anyhow::bail!("FIREBLOCKS_BASE_URL must use https://");
        }

        if self.custody.timeout_secs == 0 {
            anyhow::bail!("FIREBLOCKS_TIMEOUT_SECS must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_config_from_env() {
        std::env::set_var(
            "JWT_SECRET",
            "test_secret_that_is_at_least_32_characters_long",
        );
        let config = Config::from_env().unwrap();
        assert_eq!(config.database.max_connections, 16);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8088");
        assert!(config.custody.base_url.starts_with("https://"));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "postgres://test@localhost/test"
max_connections = 20
min_connections = 5
acquire_timeout_secs = 30
idle_timeout_secs = 600

[jwt]
secret = "test_secret_that_is_at_least_32_characters_long"

[server]
bind_addr = "0.0.0.0:9090"

[logging]
level = "info"
format = "text"
enable_file_logging = false

[custody]
base_url = "https://api.fireblocks.io"
api_key = "test-api-key"
timeout_secs = 10

[export]
dir = "/tmp/walletdesk-exports"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.server.bind_addr, "0.0.0.0:9090");
        assert_eq!(config.custody.api_key, "test-api-key");
        assert_eq!(config.custody.timeout_secs, 10);
        assert_eq!(config.export.dir, "/tmp/walletdesk-exports");
        assert!(!config.server.skip_migrations);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::from_env().unwrap();
        config.jwt.secret = "test_secret_that_is_at_least_32_characters_long".into();
        config.database.url = "postgres://localhost/walletdesk".into();
        config.logging.level = "info".into();
        config.logging.format = "text".into();
        config.custody.base_url = "https://sandbox-api.fireblocks.io".into();
        config.custody.timeout_secs = 30;
        assert!(config.validate().is_ok());

        config.custody.base_url = "http://sandbox-api.fireblocks.io".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_key_prefers_inline_pem() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();

        let mut custody = CustodyConfig::default();
        custody.secret_key_pem = Some("inline-pem".into());
        custody.secret_key_path = Some(file.path().to_string_lossy().into_owned());
        assert_eq!(custody.load_secret_key().unwrap(), "inline-pem");

        custody.secret_key_pem = None;
        assert_eq!(custody.load_secret_key().unwrap().trim(), "from-file");

        custody.secret_key_path = None;
        assert!(custody.load_secret_key().is_err());
    }
}
