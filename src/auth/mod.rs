/*!
 * # Authorization gate
 *
 * Cart routes sit behind an opaque gate: a permission scope and a flag go in,
 * a yes/no comes out. The gate is an [`Authorizer`] trait object so the
 * router never depends on how callers are identified.
 *
 * [`JwtAuthorizer`] is the bundled implementation. It reads an HS256 bearer
 * token and applies these rules:
 *
 * - the `admin` role passes every gate
 * - a non-empty scope must be listed in the token's permissions
 * - an empty scope admits any authenticated caller when the flag is set,
 *   otherwise only admins
 */

use crate::{config::AppConfig, errors::ApiError};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const ADMIN_ROLE: &str = "admin";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    pub roles: Vec<String>,       // User's roles
    pub permissions: Vec<String>, // User's explicit permissions
    pub jti: String,              // JWT ID
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub nbf: i64,                 // Not valid before time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
}

/// Authenticated caller extracted from a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// Gate decision for this caller
    pub fn permits(&self, scope: &str, allow_authenticated: bool) -> bool {
        if self.is_admin() {
            return true;
        }
        if !scope.is_empty() {
            return self.has_permission(scope);
        }
        allow_authenticated
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles,
            permissions: claims.permissions,
            token_id: claims.jti,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No authentication token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_audience: String, jwt_issuer: String) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration: Duration::from_secs(30 * 60), // 30 minutes
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
        )
    }
}

/// Opaque permission gate consulted before protected handlers run
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, headers: &HeaderMap, scope: &str, allow_authenticated: bool)
        -> bool;
}

/// Bearer-token authorizer backed by HS256 JWTs
#[derive(Clone, Debug)]
pub struct JwtAuthorizer {
    config: AuthConfig,
}

impl JwtAuthorizer {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Mint an access token for `subject`
    pub fn issue(
        &self,
        subject: &str,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            roles,
            permissions,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Decode a token, checking signature, expiry, issuer and audience
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Identify the caller from the `Authorization: Bearer` header
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.validate_token(token).map(AuthUser::from)
    }
}

#[async_trait]
impl Authorizer for JwtAuthorizer {
    async fn authorize(
        &self,
        headers: &HeaderMap,
        scope: &str,
        allow_authenticated: bool,
    ) -> bool {
        match self.authenticate(headers) {
            Ok(user) => {
                let allowed = user.permits(scope, allow_authenticated);
                if !allowed {
                    debug!(user_id = %user.user_id, scope, "caller lacks required permission");
                }
                allowed
            }
            Err(e) => {
                debug!(error = %e, "authentication failed");
                false
            }
        }
    }
}

/// Gate parameters bound to a router
#[derive(Clone)]
pub struct Gate {
    authorizer: Arc<dyn Authorizer>,
    scope: String,
    allow_authenticated: bool,
}

/// Rejects the request with 401 unless the authorizer lets it through
pub async fn gate_middleware(State(gate): State<Gate>, request: Request, next: Next) -> Response {
    let allowed = gate
        .authorizer
        .authorize(request.headers(), &gate.scope, gate.allow_authenticated)
        .await;

    if allowed {
        next.run(request).await
    } else {
        ApiError::Unauthorized.into_response()
    }
}

/// Extension methods for Router to put routes behind the gate
pub trait GateRouterExt {
    fn with_gate(
        self,
        authorizer: Arc<dyn Authorizer>,
        scope: &str,
        allow_authenticated: bool,
    ) -> Self;
}

impl<S> GateRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_gate(
        self,
        authorizer: Arc<dyn Authorizer>,
        scope: &str,
        allow_authenticated: bool,
    ) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            Gate {
                authorizer,
                scope: scope.to_string(),
                allow_authenticated,
            },
            gate_middleware,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    const SECRET: &str = "test_secret_that_is_at_least_32_characters_long";

    fn authorizer() -> JwtAuthorizer {
        JwtAuthorizer::new(AuthConfig::new(
            SECRET.into(),
            "cart-api".into(),
            "cart-auth".into(),
        ))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        headers
    }

    fn user(roles: &[&str], permissions: &[&str]) -> AuthUser {
        AuthUser {
            user_id: "u1".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            token_id: "t1".into(),
        }
    }

    #[test]
    fn gate_rules() {
        let plain = user(&[], &[]);
        assert!(plain.permits("", true));
        assert!(!plain.permits("", false));
        assert!(!plain.permits("carts:write", true));

        let scoped = user(&[], &["carts:write"]);
        assert!(scoped.permits("carts:write", false));

        let admin = user(&[ADMIN_ROLE], &[]);
        assert!(admin.permits("", false));
        assert!(admin.permits("anything", false));
    }

    #[test]
    fn issued_token_round_trips() {
        let auth = authorizer();
        let token = auth
            .issue("user-1", vec![], vec!["carts:read".into()])
            .unwrap();

        let caller = auth.authenticate(&bearer(&token)).unwrap();
        assert_eq!(caller.user_id, "user-1");
        assert!(caller.has_permission("carts:read"));
    }

    #[test]
    fn rejects_missing_foreign_and_expired_tokens() {
        let auth = authorizer();
        assert_eq!(
            auth.authenticate(&HeaderMap::new()).unwrap_err(),
            AuthError::MissingToken
        );

        let other_audience = JwtAuthorizer::new(AuthConfig::new(
            SECRET.into(),
            "someone-else".into(),
            "cart-auth".into(),
        ));
        let token = other_audience.issue("user-1", vec![], vec![]).unwrap();
        assert_eq!(
            auth.authenticate(&bearer(&token)).unwrap_err(),
            AuthError::InvalidToken
        );

        let mut stale = AuthConfig::new(SECRET.into(), "cart-api".into(), "cart-auth".into());
        stale.access_token_expiration = Duration::from_secs(0);
        let issued = JwtAuthorizer::new(stale).issue("user-1", vec![], vec![]).unwrap();
        // Still inside the default leeway
        assert!(auth.authenticate(&bearer(&issued)).is_ok());

        let now = Utc::now().timestamp();
        let expired = Claims {
            sub: "user-1".into(),
            roles: vec![],
            permissions: vec![],
            jti: "j".into(),
            iat: now - 3600,
            exp: now - 1800,
            nbf: now - 3600,
            iss: "cart-auth".into(),
            aud: "cart-api".into(),
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            auth.authenticate(&bearer(&token)).unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn gated_router_returns_401_without_token() {
        let auth = Arc::new(authorizer());
        let token = auth.issue("user-1", vec![], vec![]).unwrap();
        let app: Router = Router::new()
            .route("/", get(|| async { "ok" }))
            .with_gate(auth, "", true);

        let denied = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}
