//! Token options.

use std::time::Duration;

use blog_core::BlogConfigSnapshot;
use serde::{Deserialize, Serialize};

/// Role allowed through admin-only routes.
pub const ADMIN_ROLE: &str = "admin";

/// JWT signing algorithms
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

/// JWT configuration for access tokens.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Token audience (aud claim)
    pub audience: String,
    pub expires_in: Duration,
    /// Signing secret. Without one no token signs or verifies.
    pub secret: Option<String>,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: "blog-api".to_string(),
            audience: "blog-api".to_string(),
            expires_in: Duration::from_secs(3600),
            secret: None,
        }
    }
}

impl JwtOptions {
    /// Read `auth.*` keys, keeping defaults for anything missing.
    pub fn from_config(config: &BlogConfigSnapshot) -> Self {
        let mut opts = Self::default();
        if let Some(issuer) = config.get_string("auth.issuer") {
            opts.issuer = issuer;
        }
        if let Some(audience) = config.get_string("auth.audience") {
            opts.audience = audience;
        }
        if let Some(secs) = config.get_u64("auth.expiresIn").filter(|s| *s > 0) {
            opts.expires_in = Duration::from_secs(secs);
        }
        opts.secret = config
            .get_string("auth.secret")
            .filter(|s| !s.trim().is_empty());
        opts
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }
        if self.audience.is_empty() {
            return Err("JWT audience cannot be empty".to_string());
        }
        if self.secret.is_none() {
            return Err("HMAC algorithms require a secret".to_string());
        }
        if self.expires_in.as_secs() == 0 {
            return Err("Access token expiration must be greater than 0".to_string());
        }
        Ok(())
    }
}
