use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of session tokens.
    pub token_ttl_hours: i64,
    /// Lifetime of onboarding links handed out with temporary passwords.
    pub onboarding_ttl_minutes: i64,
    pub temp_password_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublicConfig {
    /// Base URL of the front end, used for status and onboarding links.
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveConfig {
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub app: PublicConfig,
    pub bootstrap: BootstrapConfig,
    pub live: LiveConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("auth.token_ttl_hours", 168)?
            .set_default("auth.onboarding_ttl_minutes", 60)?
            .set_default("auth.temp_password_length", 12)?
            .set_default("app.public_base_url", "http://localhost:3000")?
            .set_default("bootstrap.admin_email", "admin@example.com")?
            .set_default("bootstrap.admin_password", "password")?
            .set_default("live.retry_base_ms", 500)?
            .set_default("live.retry_max_ms", 30_000)?
            .set_default("live.keep_alive_secs", 15)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., REPAIRDESK__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("REPAIRDESK")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins"),
            )
            .build()?;

        s.try_deserialize()
    }
}
