//! Authentication middleware
//!
//! JWT authentication and role-based access control

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::models::StaffRole;
use uuid::Uuid;

use crate::error::{AppError, ErrorDetail, ErrorResponse};

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub establishment_id: Uuid,
    pub role: StaffRole,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = format!("{}:{}", resource, action);
        self.permissions.contains(&permission)
    }

    /// Check if user has any of the specified permissions
    pub fn has_any_permission(&self, perms: &[(&str, &str)]) -> bool {
        perms.iter().any(|(r, a)| self.has_permission(r, a))
    }
}

/// Permission guard for handlers
pub fn require_permission(user: &AuthUser, resource: &str, action: &str) -> Result<(), AppError> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            "Permission denied: requires {}:{}",
            resource,
            action
        );
        Err(AppError::InsufficientPermissions)
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub establishment_id: String,
    pub role: StaffRole,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    fn into_auth_user(self) -> Result<AuthUser, &'static str> {
        let user_id = Uuid::parse_str(&self.sub).map_err(|_| "Invalid user ID in token")?;
        let establishment_id = Uuid::parse_str(&self.establishment_id)
            .map_err(|_| "Invalid establishment ID in token")?;
        Ok(AuthUser {
            user_id,
            establishment_id,
            role: self.role,
            permissions: self.permissions,
        })
    }
}

/// Authentication middleware that validates JWT tokens.
///
/// The secret is read from the environment so the middleware can run
/// without router state.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let jwt_secret = std::env::var("DHUB__JWT__SECRET")
        .or_else(|_| std::env::var("DHUB_JWT_SECRET"))
        .unwrap_or_else(|_| "development-secret-key".to_string());

    let claims = match decode_jwt(&token, &jwt_secret) {
        Ok(claims) => claims,
        Err(msg) => return unauthorized_response(&msg),
    };

    let auth_user = match claims.into_auth_user() {
        Ok(user) => user,
        Err(msg) => return unauthorized_response(msg),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Token from the `Authorization: Bearer` header, or from the
/// `access_token` query parameter for EventSource clients that cannot set
/// headers.
fn bearer_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(String::from);

    from_header.or_else(|| {
        request.uri().query().and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "access_token")
                .map(|(_, value)| value.to_string())
        })
    })
}

/// Decode and validate a JWT
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail::new("UNAUTHORIZED", message),
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for the authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new("UNAUTHORIZED", "Authentication required"),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn user(role: StaffRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            establishment_id: Uuid::new_v4(),
            role,
            permissions: role.permissions(),
        }
    }

    #[test]
    fn test_require_permission() {
        let kitchen = user(StaffRole::Kitchen);
        assert!(require_permission(&kitchen, "orders", "status").is_ok());
        assert!(require_permission(&kitchen, "finance", "read").is_err());
        assert!(kitchen.has_any_permission(&[("finance", "read"), ("orders", "read")]));
    }

    #[test]
    fn test_decode_jwt_roundtrip_and_bad_secret() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            establishment_id: Uuid::new_v4().to_string(),
            role: StaffRole::Manager,
            permissions: StaffRole::Manager.permissions(),
            exp: now + 3600,
            iat: now,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap();

        let decoded = decode_jwt(&token, "secret").unwrap();
        assert_eq!(decoded.role, StaffRole::Manager);
        assert!(decoded.into_auth_user().is_ok());
        assert!(decode_jwt(&token, "other").is_err());
    }

    #[test]
    fn test_bearer_token_from_header_or_query() {
        let request = Request::builder()
            .uri("/api/v1/realtime/events")
            .header(AUTHORIZATION, "Bearer abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).as_deref(), Some("abc"));

        let request = Request::builder()
            .uri("/api/v1/realtime/events?foo=1&access_token=xyz")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).as_deref(), Some("xyz"));

        let request = Request::builder()
            .uri("/api/v1/realtime/events")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(bearer_token(&request).is_none());
    }
}
