//! Access tokens and route guards.

use std::sync::Arc;

use anyhow::Result;
use blog_core::{BlogConfigSnapshot, BlogError};
use chrono::Utc;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::options::JwtOptions;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
use crate::options::JwtAlgorithm;

pub const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access.";
pub const NO_PERMISSION: &str = "You do not have permission to perform this action";

/// Claims carried by an access token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub sub: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// The caller behind a verified token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: String,
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

/// `Authorization: Bearer <token>`; anything else is no token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let v = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = v.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Forbidden unless `user` holds one of `roles`.
pub fn restrict_to(user: &AuthUser, roles: &[&str]) -> Result<()> {
    if roles.iter().any(|r| *r == user.role) {
        return Ok(());
    }
    tracing::debug!(user = %user.id, role = %user.role, "role not permitted");
    Err(BlogError::forbidden(NO_PERMISSION).into_anyhow())
}

pub trait JwtProvider: Send + Sync {
    fn sign(&self, jwt: &JwtOptions, claims: &AccessClaims) -> Result<String>;

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<AccessClaims>;
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
struct NoJwtProvider;

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtProvider for NoJwtProvider {
    fn sign(&self, _jwt: &JwtOptions, _claims: &AccessClaims) -> Result<String> {
        Err(anyhow::anyhow!(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)"
        ))
    }

    fn verify(&self, _jwt: &JwtOptions, _token: &str) -> Result<AccessClaims> {
        Err(BlogError::not_authenticated(NOT_LOGGED_IN).into_anyhow())
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
struct JsonwebtokenProvider;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JsonwebtokenProvider {
    fn algorithm(alg: JwtAlgorithm) -> jsonwebtoken::Algorithm {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtProvider for JsonwebtokenProvider {
    fn sign(&self, jwt: &JwtOptions, claims: &AccessClaims) -> Result<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let secret = jwt.secret.as_ref().ok_or_else(|| {
            BlogError::general_error("JWT secret is not configured").into_anyhow()
        })?;

        let header = Header::new(Self::algorithm(jwt.algorithm));
        encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|e| BlogError::general_error(e.to_string()).into_anyhow())
    }

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<AccessClaims> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let secret = jwt.secret.as_ref().ok_or_else(|| {
            BlogError::not_authenticated(NOT_LOGGED_IN)
                .with_source(anyhow::anyhow!("JWT secret is not configured"))
                .into_anyhow()
        })?;

        let mut validation = Validation::new(Self::algorithm(jwt.algorithm));
        validation.set_issuer(&[jwt.issuer.as_str()]);
        validation.set_audience(&[jwt.audience.as_str()]);

        let decoded = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            BlogError::not_authenticated(NOT_LOGGED_IN)
                .with_source(e.into())
                .into_anyhow()
        })?;

        Ok(decoded.claims)
    }
}

/// Issues and checks access tokens.
#[derive(Clone)]
pub struct BlogAuth {
    options: JwtOptions,
    jwt: Arc<dyn JwtProvider>,
}

impl BlogAuth {
    pub fn new(options: JwtOptions) -> Self {
        let jwt: Arc<dyn JwtProvider> = {
            #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
            {
                Arc::new(JsonwebtokenProvider)
            }
            #[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
            {
                Arc::new(NoJwtProvider)
            }
        };

        Self { options, jwt }
    }

    pub fn from_config(config: &BlogConfigSnapshot) -> Self {
        Self::new(JwtOptions::from_config(config))
    }

    pub fn options(&self) -> &JwtOptions {
        &self.options
    }

    pub fn create_access_token(&self, sub: &str, role: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let exp = now.saturating_add(i64::try_from(self.options.expires_in.as_secs()).unwrap_or(i64::MAX));

        let claims = AccessClaims {
            sub: sub.to_string(),
            role: role.to_string(),
            iss: self.options.issuer.clone(),
            aud: self.options.audience.clone(),
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        self.jwt.sign(&self.options, &claims)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        self.jwt.verify(&self.options, token)
    }

    /// Resolve the caller from request headers. Missing or bad tokens are
    /// `NotAuthenticated`.
    pub fn protect(&self, headers: &HeaderMap) -> Result<AuthUser> {
        let token = extract_bearer_token(headers)
            .ok_or_else(|| BlogError::not_authenticated(NOT_LOGGED_IN).into_anyhow())?;

        let claims = self.verify_access_token(token)?;
        Ok(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn restrict_to_checks_role() {
        let admin = AuthUser { id: "1".into(), role: "admin".into() };
        let user = AuthUser { id: "2".into(), role: "user".into() };

        assert!(restrict_to(&admin, &["admin"]).is_ok());

        let err = restrict_to(&user, &["admin"]).unwrap_err();
        let blog = BlogError::from_anyhow(&err).unwrap();
        assert_eq!(blog.code(), 403);
        assert_eq!(blog.message, NO_PERMISSION);
    }
}
