use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::{claims::Claims, services::AuthError};
use crate::config::JwtConfig;

/// Signs and validates bearer tokens. Immutable once built.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    verification_ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            access_ttl: Duration::from_secs((cfg.access_ttl_minutes.max(0) as u64) * 60),
            verification_ttl: Duration::from_secs(
                (cfg.verification_ttl_minutes.max(0) as u64) * 60,
            ),
        }
    }

    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(subject, ttl, OffsetDateTime::now_utc())
    }

    fn issue_at(
        &self,
        subject: &str,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("jwt encode: {e}")))?;
        debug!(exp = claims.exp, "jwt signed");
        Ok(token)
    }

    pub fn issue_access(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, self.access_ttl)
    }

    pub fn issue_verification(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, self.verification_ttl)
    }

    /// Returns the subject claim. Expiry is reported separately from every
    /// other failure so it can be logged; callers collapse both to 401.
    pub fn validate(&self, token: &str) -> Result<String, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            }
        })?;
        debug!("jwt verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
pub(crate) fn test_config(secret: &str, algorithm: Algorithm) -> JwtConfig {
    JwtConfig {
        secret: secret.into(),
        algorithm,
        access_ttl_minutes: 5,
        verification_ttl_minutes: 60,
    }
}
