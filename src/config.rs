use std::{net::SocketAddr, str::FromStr};

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Signing algorithms accepted for bearer tokens. Everything else fails startup.
pub const ALLOWED_ALGORITHMS: &[Algorithm] = &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("signing algorithm {0:?} is not allowed (expected one of HS256, HS384, HS512)")]
    DisallowedAlgorithm(String),
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_ttl_minutes: i64,
    pub verification_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub from_name: String,
    pub use_tls: bool,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub public_base_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let secret = env.required("JWT_SECRET")?;
        if secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        let jwt = JwtConfig {
            secret,
            algorithm: parse_algorithm(&env.or("JWT_ALGORITHM", "HS256"))?,
            access_ttl_minutes: env.parsed("JWT_ACCESS_TTL_MINUTES", 30)?,
            verification_ttl_minutes: env.parsed("JWT_VERIFICATION_TTL_MINUTES", 60 * 24)?,
        };

        // SMTP credentials are all or nothing.
        let credentials = (env.optional("MAIL_USERNAME"), env.optional("MAIL_PASSWORD"));
        let (username, password) = match credentials {
            (Some(_), None) => return Err(ConfigError::Missing("MAIL_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("MAIL_USERNAME")),
            pair => pair,
        };
        let mail = MailConfig {
            server: env.or("MAIL_SERVER", "localhost"),
            port: env.parsed("MAIL_PORT", 465)?,
            username,
            password,
            from: env.or("MAIL_FROM", "noreply@localhost"),
            from_name: env.or("MAIL_FROM_NAME", "Contactbook"),
            use_tls: env.parsed("MAIL_USE_TLS", true)?,
        };

        let endpoint = env.or("S3_ENDPOINT", "http://localhost:9000");
        let bucket = env.or("S3_BUCKET", "avatars");
        let public_url = env
            .optional("S3_PUBLIC_URL")
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let storage = StorageConfig {
            endpoint,
            bucket,
            access_key: env.or("S3_ACCESS_KEY", "minioadmin"),
            secret_key: env.or("S3_SECRET_KEY", "minioadmin"),
            region: env.or("S3_REGION", "us-east-1"),
            public_url,
        };

        let host = env.or("APP_HOST", "0.0.0.0");
        let port: u16 = env.parsed("APP_PORT", 8080)?;
        let listen_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid { name: "APP_HOST", value: host })?;

        Ok(Self {
            listen_addr,
            database_url: env.required("DATABASE_URL")?,
            public_base_url: env
                .or("PUBLIC_BASE_URL", "http://localhost:8080")
                .trim_end_matches('/')
                .to_string(),
            jwt,
            mail,
            storage,
        })
    }
}

pub fn parse_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    let alg = Algorithm::from_str(raw.trim())
        .map_err(|_| ConfigError::DisallowedAlgorithm(raw.to_string()))?;
    if !ALLOWED_ALGORITHMS.contains(&alg) {
        return Err(ConfigError::DisallowedAlgorithm(raw.to_string()));
    }
    Ok(alg)
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/contactbook"),
        ("JWT_SECRET", "dev-secret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let cfg = load(BASE).expect("config loads");
        assert_eq!(cfg.jwt.algorithm, Algorithm::HS256);
        assert_eq!(cfg.jwt.access_ttl_minutes, 30);
        assert_eq!(cfg.jwt.verification_ttl_minutes, 1440);
        assert_eq!(cfg.mail.port, 465);
        assert!(cfg.mail.use_tls);
        assert_eq!(cfg.storage.public_url, "http://localhost:9000/avatars");
        assert_eq!(cfg.public_base_url, "http://localhost:8080");
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert!(cfg.mail.username.is_none() && cfg.mail.password.is_none());
    }

    #[test]
    fn listen_address_comes_from_host_and_port() {
        let mut vars = BASE.to_vec();
        vars.extend([("APP_HOST", "127.0.0.1"), ("APP_PORT", "3000")]);
        assert_eq!(load(&vars).unwrap().listen_addr.to_string(), "127.0.0.1:3000");

        let mut vars = BASE.to_vec();
        vars.push(("APP_HOST", "not a host"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name: "APP_HOST", .. })));

        let mut vars = BASE.to_vec();
        vars.push(("APP_PORT", "http"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name: "APP_PORT", .. })));
    }

    #[test]
    fn mail_credentials_must_come_in_pairs() {
        let mut vars = BASE.to_vec();
        vars.push(("MAIL_USERNAME", "mailer"));
        assert!(matches!(load(&vars), Err(ConfigError::Missing("MAIL_PASSWORD"))));

        let mut vars = BASE.to_vec();
        vars.push(("MAIL_PASSWORD", "secret"));
        assert!(matches!(load(&vars), Err(ConfigError::Missing("MAIL_USERNAME"))));

        let mut vars = BASE.to_vec();
        vars.extend([("MAIL_USERNAME", "mailer"), ("MAIL_PASSWORD", "secret")]);
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.mail.username.as_deref(), Some("mailer"));
        assert_eq!(cfg.mail.password.as_deref(), Some("secret"));
    }

    #[test]
    fn accepts_allow_listed_algorithms() {
        for alg in ["HS256", "HS384", "HS512"] {
            assert!(parse_algorithm(alg).is_ok(), "{alg} should be allowed");
        }
    }

    #[test]
    fn rejects_weak_or_asymmetric_algorithms() {
        for alg in ["none", "None", "RS256", "ES256", "hs256", ""] {
            let err = parse_algorithm(alg).unwrap_err();
            assert!(matches!(err, ConfigError::DisallowedAlgorithm(_)), "{alg}");
        }
    }

    #[test]
    fn disallowed_algorithm_fails_config_load() {
        let mut vars = BASE.to_vec();
        vars.push(("JWT_ALGORITHM", "none"));
        assert!(matches!(load(&vars), Err(ConfigError::DisallowedAlgorithm(_))));
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = load(&[("DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        let err = load(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "   ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let mut vars = BASE.to_vec();
        vars.push(("MAIL_PORT", "567234"));
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAIL_PORT", .. }));
    }
}
