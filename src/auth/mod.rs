/*!
 * # Authentication and Authorization Module
 *
 * Teams authenticate with their team number and one of two passwords: the
 * member password yields a `member` token, the admin password a `teamAdmin`
 * token. A site-wide administrator logs in with a separately configured
 * password and receives an `admin` token that carries no team.
 *
 * Tokens are HS256 JWTs. Logout places the token id on an in-memory
 * blacklist until the token would have expired anyway.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

pub mod password;

pub use password::{hash_password, verify_password};

/// Roles carried in the `role` claim
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Role {
    /// Team member: can read team data and record manufacturing progress
    Member,
    /// Team administrator: full control over the team's robots, systems and machines
    TeamAdmin,
    /// Site administrator: dump/restore across all teams
    Admin,
}

impl Role {
    /// Whether a holder of `self` may use an endpoint gated on `required`.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Member => true,
            Role::TeamAdmin => matches!(self, Role::TeamAdmin | Role::Admin),
            Role::Admin => self == Role::Admin,
        }
    }
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,               // Subject (team number, or "admin")
    pub team_id: Option<Uuid>,     // Team the token is scoped to
    pub team_number: Option<i32>,  // FRC team number
    pub role: Role,                // Single role per token
    pub jti: String,               // JWT ID (unique identifier for this token)
    pub iat: i64,                  // Issued at time
    pub exp: i64,                  // Expiration time
    pub nbf: i64,                  // Not valid before time
    pub iss: String,               // Issuer
    pub aud: String,               // Audience
}

/// Authenticated caller extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub subject: String,
    pub team_id: Option<Uuid>,
    pub team_number: Option<i32>,
    pub role: Role,
    pub token_id: String,
    pub expires_at: i64,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.role.satisfies(role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the caller may touch rows owned by `team_id`.
    pub fn can_access_team(&self, team_id: Uuid) -> bool {
        self.is_admin() || self.team_id == Some(team_id)
    }

    /// The caller's team, for endpoints that only make sense with one.
    pub fn require_team(&self) -> Result<Uuid, ServiceError> {
        self.team_id
            .ok_or_else(|| ServiceError::Forbidden("a team token is required".to_string()))
    }

    pub fn require_role(&self, role: Role) -> Result<(), ServiceError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!("{} access required", role)))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
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
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

impl From<&crate::config::AppConfig> for AuthConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            cfg.jwt_ttl(),
        )
    }
}

/// Who a token is being issued for
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub team_id: Option<Uuid>,
    pub team_number: Option<i32>,
    pub role: Role,
}

impl TokenSubject {
    pub fn team(team_id: Uuid, team_number: i32, role: Role) -> Self {
        Self {
            team_id: Some(team_id),
            team_number: Some(team_number),
            role,
        }
    }

    pub fn site_admin() -> Self {
        Self {
            team_id: None,
            team_number: None,
            role: Role::Admin,
        }
    }
}

/// Token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    pub role: Role,
    pub team_number: Option<i32>,
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Generate a JWT access token
    pub fn issue_token(&self, subject: &TokenSubject) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: subject
                .team_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| subject.role.to_string()),
            team_id: subject.team_id,
            team_number: subject.team_number,
            role: subject.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        debug!(role = %subject.role, team_number = ?subject.team_number, "issued access token");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            role: subject.role,
            team_number: subject.team_number,
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Revoke a token id until its natural expiry
    pub async fn revoke_token(&self, token_id: &str, expires_at: i64) {
        let expiry = Utc
            .timestamp_opt(expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let mut blacklist = self.blacklisted_tokens.write().await;
        Self::clean_blacklist(&mut blacklist);
        blacklist.push(BlacklistedToken {
            jti: token_id.to_string(),
            expiry,
        });
    }

    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }

    fn clean_blacklist(blacklist: &mut Vec<BlacklistedToken>) {
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message) = self.parts();

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    if !user.has_role(required_role) {
        warn!(role = %user.role, required = %required_role, "role check failed");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates auth tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match extract_auth_from_headers(request.headers(), &auth_service).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract the bearer token from an Authorization header value
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingAuth)?;
    let claims = auth_service.validate_token(token).await?;

    Ok(AuthUser {
        subject: claims.sub,
        team_id: claims.team_id,
        team_number: claims.team_number,
        role: claims.role,
        token_id: claims.jti,
        expires_at: claims.exp,
    })
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::str::FromStr;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            crate::config::DEV_DEFAULT_JWT_SECRET.to_string(),
            "frcbom-api".to_string(),
            "frcbom-auth".to_string(),
            Duration::from_secs(3600),
        ))
    }

    #[test]
    fn role_names_match_wire_format() {
        assert_eq!(Role::TeamAdmin.to_string(), "teamAdmin");
        assert_eq!(Role::from_str("member").unwrap(), Role::Member);
        assert_eq!(
            serde_json::to_value(Role::Admin).unwrap(),
            serde_json::json!("admin")
        );
    }

    #[test]
    fn role_hierarchy() {
        assert!(Role::Admin.satisfies(Role::TeamAdmin));
        assert!(Role::TeamAdmin.satisfies(Role::Member));
        assert!(!Role::Member.satisfies(Role::TeamAdmin));
        assert!(!Role::TeamAdmin.satisfies(Role::Admin));
    }

    #[tokio::test]
    async fn issued_token_round_trips_claims() {
        let auth = service();
        let team_id = Uuid::new_v4();
        let token = auth
            .issue_token(&TokenSubject::team(team_id, 254, Role::TeamAdmin))
            .unwrap();

        let claims = auth.validate_token(&token.access_token).await.unwrap();
        assert_eq!(claims.team_id, Some(team_id));
        assert_eq!(claims.team_number, Some(254));
        assert_eq!(claims.role, Role::TeamAdmin);
        assert_eq!(claims.sub, "254");
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let auth = service();
        let token = auth.issue_token(&TokenSubject::site_admin()).unwrap();
        let claims = auth.validate_token(&token.access_token).await.unwrap();

        auth.revoke_token(&claims.jti, claims.exp).await;

        assert_matches!(
            auth.validate_token(&token.access_token).await,
            Err(AuthError::RevokedToken)
        );
    }

    #[tokio::test]
    async fn token_from_other_issuer_is_invalid() {
        let issuer = service();
        let token = issuer.issue_token(&TokenSubject::site_admin()).unwrap();

        let mut other_cfg = issuer.config.clone();
        other_cfg.jwt_issuer = "someone-else".to_string();
        let verifier = AuthService::new(other_cfg);

        assert_matches!(
            verifier.validate_token(&token.access_token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn team_access_rules() {
        let team = Uuid::new_v4();
        let member = AuthUser {
            subject: "254".into(),
            team_id: Some(team),
            team_number: Some(254),
            role: Role::Member,
            token_id: "t".into(),
            expires_at: 0,
        };
        assert!(member.can_access_team(team));
        assert!(!member.can_access_team(Uuid::new_v4()));
        assert!(member.require_role(Role::TeamAdmin).is_err());

        let admin = AuthUser {
            team_id: None,
            role: Role::Admin,
            ..member
        };
        assert!(admin.can_access_team(team));
        assert!(admin.require_team().is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
