use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub midtrans: MidtransConfig,
    pub xendit: XenditConfig,
    pub biteship: BiteshipConfig,
    pub shipper: ShipperConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub commerce: CommerceConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidtransConfig {
    pub server_key: String,
    #[serde(default = "default_midtrans_snap_url")]
    pub snap_url: String,
    #[serde(default = "default_midtrans_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XenditConfig {
    pub secret_key: String,
    pub callback_token: String,
    #[serde(default = "default_xendit_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiteshipConfig {
    pub api_key: String,
    #[serde(default = "default_biteship_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub webhook_token: String,
}

/// 发货方信息，用于物流下单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperConfig {
    pub contact_name: String,
    pub contact_phone: String,
    pub address: String,
    pub postal_code: String,
    #[serde(default)]
    pub area_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root_dir: String,
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: "./uploads".to_string(),
            public_base_url: "http://localhost:8080/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommerceConfig {
    /// 佣金比例，单位为基点（1000 = 10%）
    pub commission_rate_bps: u32,
    pub min_withdrawal_amount: i64,
    pub frontend_url: String,
    pub shipment_retry_interval_secs: u64,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            commission_rate_bps: 1000,
            min_withdrawal_amount: 50_000,
            frontend_url: "http://localhost:3000".to_string(),
            shipment_retry_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

fn default_midtrans_snap_url() -> String {
    "https://app.sandbox.midtrans.com/snap/v1".to_string()
}

fn default_midtrans_api_url() -> String {
    "https://api.sandbox.midtrans.com/v2".to_string()
}

fn default_xendit_api_url() -> String {
    "https://api.xendit.co".to_string()
}

fn default_biteship_base_url() -> String {
    "https://api.biteship.com".to_string()
}

/// 加载配置的错误类型，可跨线程传递
pub type ConfigError = Box<dyn std::error::Error + Send + Sync>;

impl Config {
    pub fn from_toml() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults()?,
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("解析配置文件失败: {e}"))?;
        Ok(config)
    }

    fn from_env_defaults() -> Result<Self, ConfigError> {
        fn get_env(name: &str) -> Option<String> {
            env::var(name).ok()
        }
        fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
            env::var(name)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        // 数据库 URL 在无配置文件时必须提供
        let database_url = get_env("DATABASE_URL")
            .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

        let commerce_defaults = CommerceConfig::default();
        let storage_defaults = StorageConfig::default();

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET")
                    .unwrap_or_else(|| "change-me-in-production".to_string()),
                access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                refresh_token_expires_in: get_env_parse("JWT_REFRESH_EXPIRES_IN", 2_592_000i64),
            },
            midtrans: MidtransConfig {
                server_key: get_env("MIDTRANS_SERVER_KEY").unwrap_or_default(),
                snap_url: get_env("MIDTRANS_SNAP_URL").unwrap_or_else(default_midtrans_snap_url),
                api_url: get_env("MIDTRANS_API_URL").unwrap_or_else(default_midtrans_api_url),
            },
            xendit: XenditConfig {
                secret_key: get_env("XENDIT_SECRET_KEY").unwrap_or_default(),
                callback_token: get_env("XENDIT_CALLBACK_TOKEN").unwrap_or_default(),
                api_url: get_env("XENDIT_API_URL").unwrap_or_else(default_xendit_api_url),
            },
            biteship: BiteshipConfig {
                api_key: get_env("BITESHIP_API_KEY").unwrap_or_default(),
                base_url: get_env("BITESHIP_BASE_URL").unwrap_or_else(default_biteship_base_url),
                webhook_token: get_env("BITESHIP_WEBHOOK_TOKEN").unwrap_or_default(),
            },
            shipper: ShipperConfig {
                contact_name: get_env("SHIPPER_CONTACT_NAME").unwrap_or_default(),
                contact_phone: get_env("SHIPPER_CONTACT_PHONE").unwrap_or_default(),
                address: get_env("SHIPPER_ADDRESS").unwrap_or_default(),
                postal_code: get_env("SHIPPER_POSTAL_CODE").unwrap_or_default(),
                area_id: get_env("SHIPPER_AREA_ID"),
            },
            storage: StorageConfig {
                root_dir: get_env("STORAGE_ROOT_DIR").unwrap_or(storage_defaults.root_dir),
                public_base_url: get_env("STORAGE_PUBLIC_BASE_URL")
                    .unwrap_or(storage_defaults.public_base_url),
            },
            commerce: CommerceConfig {
                commission_rate_bps: get_env_parse(
                    "COMMISSION_RATE_BPS",
                    commerce_defaults.commission_rate_bps,
                ),
                min_withdrawal_amount: get_env_parse(
                    "MIN_WITHDRAWAL_AMOUNT",
                    commerce_defaults.min_withdrawal_amount,
                ),
                frontend_url: get_env("FRONTEND_URL").unwrap_or(commerce_defaults.frontend_url),
                shipment_retry_interval_secs: get_env_parse(
                    "SHIPMENT_RETRY_INTERVAL_SECS",
                    commerce_defaults.shipment_retry_interval_secs,
                ),
            },
            http: HttpConfig {
                timeout_secs: get_env_parse("HTTP_TIMEOUT_SECS", HttpConfig::default().timeout_secs),
            },
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("MIDTRANS_SERVER_KEY") {
            self.midtrans.server_key = v;
        }
        if let Ok(v) = env::var("MIDTRANS_SNAP_URL") {
            self.midtrans.snap_url = v;
        }
        if let Ok(v) = env::var("MIDTRANS_API_URL") {
            self.midtrans.api_url = v;
        }
        if let Ok(v) = env::var("XENDIT_SECRET_KEY") {
            self.xendit.secret_key = v;
        }
        if let Ok(v) = env::var("XENDIT_CALLBACK_TOKEN") {
            self.xendit.callback_token = v;
        }
        if let Ok(v) = env::var("XENDIT_API_URL") {
            self.xendit.api_url = v;
        }
        if let Ok(v) = env::var("BITESHIP_API_KEY") {
            self.biteship.api_key = v;
        }
        if let Ok(v) = env::var("BITESHIP_BASE_URL") {
            self.biteship.base_url = v;
        }
        if let Ok(v) = env::var("BITESHIP_WEBHOOK_TOKEN") {
            self.biteship.webhook_token = v;
        }
        if let Ok(v) = env::var("STORAGE_ROOT_DIR") {
            self.storage.root_dir = v;
        }
        if let Ok(v) = env::var("STORAGE_PUBLIC_BASE_URL") {
            self.storage.public_base_url = v;
        }
        if let Ok(v) = env::var("COMMISSION_RATE_BPS")
            && let Ok(n) = v.parse()
        {
            self.commerce.commission_rate_bps = n;
        }
        if let Ok(v) = env::var("MIN_WITHDRAWAL_AMOUNT")
            && let Ok(n) = v.parse()
        {
            self.commerce.min_withdrawal_amount = n;
        }
        if let Ok(v) = env::var("FRONTEND_URL") {
            self.commerce.frontend_url = v;
        }
        if let Ok(v) = env::var("SHIPMENT_RETRY_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.commerce.shipment_retry_interval_secs = n;
        }
        if let Ok(v) = env::var("HTTP_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            self.http.timeout_secs = n;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.commerce.commission_rate_bps > 10_000 {
            return Err("commission_rate_bps 不能超过 10000".into());
        }
        if self.commerce.min_withdrawal_amount < 0 {
            return Err("min_withdrawal_amount 不能为负数".into());
        }
        Ok(())
    }
}
