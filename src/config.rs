use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub payment: PaymentConfig,
    pub shop: ShopConfig,
    pub admin: AdminConfig,
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
pub struct TelegramConfig {
    pub bot_token: String,
    /// Chat that receives sale and redemption summaries.
    pub admin_chat_id: i64,
    /// Public URL registered via setWebhook at startup. Empty to skip registration.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Expected X-Telegram-Bot-Api-Secret-Token value on inbound updates.
    #[serde(default)]
    pub secret_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub base_url: String,
    pub shop_id: String,
    pub secret_key: String,
    /// Price of one gift in minor currency units.
    pub amount_minor: i64,
    pub currency: String,
    /// Where the gateway redirects the buyer after checkout.
    pub return_url: String,
    /// Fabricate payment intents instead of calling the gateway.
    #[serde(default)]
    pub stub: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Redemption front-end shown to buyers in the code message.
    pub frontend_url: String,
    #[serde(default = "default_reservation_ttl")]
    pub reservation_ttl_minutes: i64,
}

fn default_reservation_ttl() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Shared token expected in the X-Admin-Token header on /api/v1/admin routes.
    pub token: String,
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 与机器人令牌在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;
                let bot_token = get_env("TELEGRAM_BOT_TOKEN")
                    .ok_or("缺少 TELEGRAM_BOT_TOKEN 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    telegram: TelegramConfig {
                        bot_token,
                        admin_chat_id: get_env_parse("TELEGRAM_ADMIN_CHAT_ID", 0i64),
                        webhook_url: get_env("TELEGRAM_WEBHOOK_URL"),
                        secret_token: get_env("TELEGRAM_SECRET_TOKEN"),
                    },
                    payment: PaymentConfig {
                        base_url: get_env("PAYMENT_BASE_URL")
                            .unwrap_or_else(|| "https://api.yookassa.ru/v3".to_string()),
                        shop_id: get_env("PAYMENT_SHOP_ID").unwrap_or_default(),
                        secret_key: get_env("PAYMENT_SECRET_KEY").unwrap_or_default(),
                        amount_minor: get_env_parse("PAYMENT_AMOUNT_MINOR", 50000i64),
                        currency: get_env("PAYMENT_CURRENCY").unwrap_or_else(|| "RUB".to_string()),
                        return_url: get_env("PAYMENT_RETURN_URL").unwrap_or_default(),
                        stub: get_env_parse("PAYMENT_STUB", false),
                    },
                    shop: ShopConfig {
                        frontend_url: get_env("SHOP_FRONTEND_URL").unwrap_or_default(),
                        reservation_ttl_minutes: get_env_parse(
                            "SHOP_RESERVATION_TTL_MINUTES",
                            default_reservation_ttl(),
                        ),
                    },
                    admin: AdminConfig {
                        token: get_env("ADMIN_TOKEN").unwrap_or_default(),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            config.telegram.bot_token = v;
        }
        if let Ok(v) = env::var("TELEGRAM_ADMIN_CHAT_ID")
            && let Ok(id) = v.parse()
        {
            config.telegram.admin_chat_id = id;
        }
        if let Ok(v) = env::var("TELEGRAM_WEBHOOK_URL") {
            config.telegram.webhook_url = Some(v);
        }
        if let Ok(v) = env::var("TELEGRAM_SECRET_TOKEN") {
            config.telegram.secret_token = Some(v);
        }
        if let Ok(v) = env::var("PAYMENT_BASE_URL") {
            config.payment.base_url = v;
        }
        if let Ok(v) = env::var("PAYMENT_SHOP_ID") {
            config.payment.shop_id = v;
        }
        if let Ok(v) = env::var("PAYMENT_SECRET_KEY") {
            config.payment.secret_key = v;
        }
        if let Ok(v) = env::var("PAYMENT_AMOUNT_MINOR")
            && let Ok(n) = v.parse()
        {
            config.payment.amount_minor = n;
        }
        if let Ok(v) = env::var("PAYMENT_CURRENCY") {
            config.payment.currency = v;
        }
        if let Ok(v) = env::var("PAYMENT_RETURN_URL") {
            config.payment.return_url = v;
        }
        if let Ok(v) = env::var("PAYMENT_STUB")
            && let Ok(b) = v.parse()
        {
            config.payment.stub = b;
        }
        if let Ok(v) = env::var("SHOP_FRONTEND_URL") {
            config.shop.frontend_url = v;
        }
        if let Ok(v) = env::var("SHOP_RESERVATION_TTL_MINUTES")
            && let Ok(n) = v.parse()
        {
            config.shop.reservation_ttl_minutes = n;
        }
        if let Ok(v) = env::var("ADMIN_TOKEN") {
            config.admin.token = v;
        }

        Ok(config)
    }
}
