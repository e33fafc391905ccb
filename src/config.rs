// src/config.rs
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

/// Runtime settings, read once at startup from the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub app_base_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < 16 {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                value: "<shorter than 16 characters>".to_string(),
            });
        }

        let bootstrap_admin = match (lookup("BOOTSTRAP_ADMIN_EMAIL"), lookup("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        let token_ttl_hours: i64 = parse_or(&lookup, "TOKEN_TTL_HOURS", 8)?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&token_ttl_hours) {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_HOURS",
                value: token_ttl_hours.to_string(),
            });
        }

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: parse_or(&lookup, "HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret,
            token_ttl_hours,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            app_base_url: lookup("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cors_allowed_origins,
            bootstrap_admin,
        })
    }

    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_hours * 60 * 60
    }
}

/// Upper bound for `TOKEN_TTL_HOURS` (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/pricebook"),
            ("JWT_SECRET", "0123456789abcdef"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.token_ttl_hours, 8);
        assert_eq!(cfg.token_ttl_seconds(), 28_800);
        assert_eq!(cfg.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(cfg.cors_allowed_origins.is_empty());
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn token_ttl_must_be_within_a_year() {
        for raw in ["0", "-3", "8761", "9223372036854775807"] {
            let err = Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://localhost/pricebook"),
                ("JWT_SECRET", "0123456789abcdef"),
                ("TOKEN_TTL_HOURS", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "TOKEN_TTL_HOURS", .. }), "accepted {raw}");
        }

        let cfg = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/pricebook"),
            ("JWT_SECRET", "0123456789abcdef"),
            ("TOKEN_TTL_HOURS", "8760"),
        ]))
        .unwrap();
        assert_eq!(cfg.token_ttl_seconds(), 8760 * 3600);
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "0123456789abcdef")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn short_secret_and_bad_port_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JWT_SECRET", .. }));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "0123456789abcdef"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn cors_origins_and_bootstrap_admin_are_parsed() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "0123456789abcdef"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "changeme123"),
            ("APP_BASE_URL", "https://portal.example/"),
        ]))
        .unwrap();

        assert_eq!(cfg.cors_allowed_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.bootstrap_admin.unwrap().email, "root@example.com");
        assert_eq!(cfg.app_base_url, "https://portal.example");
    }
}
