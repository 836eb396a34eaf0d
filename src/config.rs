use anyhow::ensure;
use envconfig::Envconfig;

pub const MAX_JWT_EXPIRE_MINUTES: u64 = 60 * 24 * 366;
pub const MAX_CONTACT_WINDOW_DAYS: i64 = 3660;

#[derive(Envconfig, Clone)]
pub struct Config {
    /// Unset runs the service on the in-memory store.
    #[envconfig(from = "DATABASE_URL")]
    pub db_url: Option<String>,
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,

    /// Base64 encoded HS256 signing secret.
    #[envconfig(from = "JWT_SECRET")]
    pub jwt_secret: String,
    #[envconfig(from = "JWT_EXPIRE_MINUTES", default = "60")]
    pub jwt_expire_minutes: u64,
    #[envconfig(from = "API_KEY")]
    pub api_key: String,

    #[envconfig(from = "PUBLIC_URL", default = "http://localhost:8080")]
    pub public_url: String,
    #[envconfig(from = "ASSETS_DIR", default = "assets")]
    pub assets_dir: String,
    #[envconfig(from = "MAX_UPLOAD_BYTES", default = "5242880")]
    pub max_upload_bytes: usize,
    #[envconfig(from = "CORS_ORIGIN", default = "http://localhost:3000")]
    pub cors_origin: String,

    #[envconfig(from = "FRONTEND_REVALIDATE_URL")]
    pub revalidate_url: Option<String>,
    #[envconfig(from = "REVALIDATE_SECRET")]
    pub revalidate_secret: Option<String>,
    #[envconfig(from = "REVALIDATE_TIMEOUT_MS", default = "2000")]
    pub revalidate_timeout_ms: u64,

    #[envconfig(from = "WEEKLY_RATE_LIMIT", default = "60")]
    pub weekly_rate_limit: u32,
    #[envconfig(from = "CONTACT_RATE_LIMIT", default = "5")]
    pub contact_rate_limit: u32,
    #[envconfig(from = "RATE_LIMIT_WINDOW_SECS", default = "60")]
    pub rate_limit_window_secs: u64,
    /// Reverse proxies in front of the service that append to `X-Forwarded-For`.
    /// Zero keys rate limits on the peer address alone.
    #[envconfig(from = "TRUSTED_PROXY_HOPS", default = "0")]
    pub trusted_proxy_hops: usize,
    #[envconfig(from = "CONTACT_WINDOW_DAYS", default = "7")]
    pub contact_window_days: i64,

    #[envconfig(from = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,
    #[envconfig(from = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,
}

impl Config {
    /// Rejects values that would overflow once turned into durations.
    pub fn check_ranges(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_JWT_EXPIRE_MINUTES).contains(&self.jwt_expire_minutes),
            "JWT_EXPIRE_MINUTES must be between 1 and {MAX_JWT_EXPIRE_MINUTES}, got {}",
            self.jwt_expire_minutes
        );
        ensure!(
            (1..=MAX_CONTACT_WINDOW_DAYS).contains(&self.contact_window_days),
            "CONTACT_WINDOW_DAYS must be between 1 and {MAX_CONTACT_WINDOW_DAYS}, got {}",
            self.contact_window_days
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_fill_the_optional_settings() {
        let env = HashMap::from([
            ("JWT_SECRET".to_string(), "c2VjcmV0".to_string()),
            ("API_KEY".to_string(), "key".to_string()),
        ]);
        let config = Config::init_from_hashmap(&env).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_url, None);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.contact_window_days, 7);
        assert_eq!(config.revalidate_url, None);
    }

    fn config(extra: &[(&str, &str)]) -> Config {
        let mut env = HashMap::from([
            ("JWT_SECRET".to_string(), "c2VjcmV0".to_string()),
            ("API_KEY".to_string(), "key".to_string()),
        ]);
        for (key, value) in extra {
            env.insert(key.to_string(), value.to_string());
        }
        Config::init_from_hashmap(&env).unwrap()
    }

    #[test]
    fn defaults_are_in_range() {
        let config = config(&[]);
        assert_eq!(config.trusted_proxy_hops, 0);
        assert!(config.check_ranges().is_ok());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let err = config(&[("CONTACT_WINDOW_DAYS", "9223372036854775807")])
            .check_ranges()
            .unwrap_err();
        assert!(err.to_string().contains("CONTACT_WINDOW_DAYS"));

        let err = config(&[("JWT_EXPIRE_MINUTES", "18446744073709551615")])
            .check_ranges()
            .unwrap_err();
        assert!(err.to_string().contains("JWT_EXPIRE_MINUTES"));

        assert!(config(&[("CONTACT_WINDOW_DAYS", "0")]).check_ranges().is_err());
    }

    #[test]
    fn api_key_is_required() {
        let env = HashMap::from([("JWT_SECRET".to_string(), "c2VjcmV0".to_string())]);
        assert!(Config::init_from_hashmap(&env).is_err());
    }
}
