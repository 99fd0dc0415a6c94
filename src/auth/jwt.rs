use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState};

/// Bad signature, malformed structure, wrong issuer/audience or expired.
#[derive(Debug, Error)]
#[error("invalid token: {0}")]
pub struct InvalidToken(#[from] jsonwebtoken::errors::Error);

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_days.max(0) as u64) * 24 * 60 * 60),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs a token for `user_id` expiring `ttl` from now.
    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, InvalidToken> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_days: 30,
        })
    }

    #[test]
    fn issue_and_verify() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("issue");
        assert_eq!(keys.verify(&token).expect("verify"), user_id);
    }

    #[test]
    fn ttl_is_thirty_days() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert_eq!(keys.ttl(), Duration::from_secs(30 * 24 * 60 * 60));
    }

    #[test]
    fn token_valid_until_thirty_days_elapse() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();

        let fresh_enough = OffsetDateTime::now_utc() - TimeDuration::days(29);
        let token = keys.issue_at(user_id, fresh_enough).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), user_id);

        let stale = OffsetDateTime::now_utc() - TimeDuration::days(31);
        let token = keys.issue_at(user_id, stale).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn token_fails_right_after_expiry() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();

        let just_expired = OffsetDateTime::now_utc() - TimeDuration::days(30) - TimeDuration::seconds(1);
        let token = keys.issue_at(user_id, just_expired).unwrap();
        assert!(keys.verify(&token).is_err());

        let almost = OffsetDateTime::now_utc() - TimeDuration::days(30) + TimeDuration::seconds(30);
        let token = keys.issue_at(user_id, almost).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn verify_rejects_other_secret() {
        let good = make_keys("secret-a", "iss", "aud");
        let bad = make_keys("secret-b", "iss", "aud");
        let token = good.issue(Uuid::new_v4()).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue(Uuid::new_v4()).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_malformed_and_tampered() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(keys.verify("").is_err());
        assert!(keys.verify("not.a.jwt").is_err());

        let token = keys.issue(Uuid::new_v4()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(keys.verify(&tampered).is_err());
    }
}
