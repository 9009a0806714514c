//! Authentication service for registration, login and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::models::{
    missing_default_categories, Establishment, StaffMember, StaffRole, Subscription,
    SubscriptionPlan, SubscriptionStatus,
};
use shared::validation::{slugify, validate_email, validate_password, validate_required, validate_slug};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Claims;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new establishment with its owner account
#[derive(Debug, Deserialize)]
pub struct RegisterEstablishmentInput {
    pub establishment_name: String,
    /// Derived from the name when absent
    pub slug: Option<String>,
    pub owner_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub establishment_id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// The signed-in user and their establishment
#[derive(Debug, Serialize)]
pub struct Me {
    pub user: StaffMember,
    pub establishment: Establishment,
    pub permissions: Vec<String>,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    establishment_id: Uuid,
    role: StaffRole,
    password_hash: String,
    is_active: bool,
}

/// Create the default categories that are missing. Existing names are kept.
pub(crate) async fn seed_default_categories(
    conn: &mut PgConnection,
    establishment_id: Uuid,
) -> AppResult<u64> {
    let existing = sqlx::query_scalar::<_, String>(
        "SELECT name FROM categories WHERE establishment_id = $1",
    )
    .bind(establishment_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut created = 0;
    for (name, position) in missing_default_categories(existing.iter().map(String::as_str)) {
        let result = sqlx::query(
            r#"
            INSERT INTO categories (establishment_id, name, position)
            VALUES ($1, $2, $3)
            ON CONFLICT (establishment_id, name) DO NOTHING
            "#,
        )
        .bind(establishment_id)
        .bind(name)
        .bind(position)
        .execute(&mut *conn)
        .await?;
        created += result.rows_affected();
    }
    Ok(created)
}

/// Hash a password with bcrypt
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    validate_password(password).map_err(|m| AppError::field("password", m))?;
    hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register an establishment, its owner, a trial subscription and the
    /// default categories in one transaction
    pub async fn register_establishment(&self, input: RegisterEstablishmentInput) -> AppResult<RegisterResponse> {
        validate_required(&input.establishment_name).map_err(|m| AppError::field("establishment_name", m))?;
        validate_required(&input.owner_name).map_err(|m| AppError::field("owner_name", m))?;
        validate_email(&input.email).map_err(|m| AppError::field("email", m))?;

        let slug = input
            .slug
            .clone()
            .unwrap_or_else(|| slugify(&input.establishment_name));
        validate_slug(&slug).map_err(|m| AppError::field("slug", m))?;

        let password_hash = hash_password(&input.password)?;
        let email = input.email.trim().to_lowercase();

        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM establishments WHERE slug = $1)")
            .bind(&slug)
            .fetch_one(&self.db)
            .await?;
        if taken {
            return Err(AppError::DuplicateEntry("slug".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let establishment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO establishments (name, slug, phone, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.establishment_name.trim())
        .bind(&slug)
        .bind(&input.phone)
        .bind(&email)
        .fetch_one(&mut *tx)
        .await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (establishment_id, name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, 'owner')
            RETURNING id
            "#,
        )
        .bind(establishment_id)
        .bind(input.owner_name.trim())
        .bind(&email)
        .bind(&input.phone)
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO subscriptions (establishment_id, plan, status, trial_ends_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(establishment_id)
        .bind(SubscriptionPlan::Starter)
        .bind(SubscriptionStatus::Trialing)
        .bind(Subscription::trial_end_from(now))
        .execute(&mut *tx)
        .await?;

        let seeded = seed_default_categories(&mut tx, establishment_id).await?;

        tx.commit().await?;

        tracing::info!(
            %establishment_id,
            %user_id,
            slug = %slug,
            categories = seeded,
            "Establishment registered"
        );

        let tokens = self.generate_tokens(user_id, establishment_id, StaffRole::Owner)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(RegisterResponse {
            establishment_id,
            user_id,
            tokens,
        })
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, establishment_id, role, password_hash, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(user.id, user.establishment_id, user.role)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair. The old refresh token
    /// is revoked.
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let (user_id, establishment_id, role) = sqlx::query_as::<_, (Uuid, Uuid, StaffRole)>(
            r#"
            SELECT u.id, u.establishment_id, u.role
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(user_id, establishment_id, role)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Profile of the signed-in user
    pub async fn me(&self, user_id: Uuid, establishment_id: Uuid) -> AppResult<Me> {
        let user = sqlx::query_as::<_, StaffMember>(
            r#"
            SELECT id, establishment_id, name, email, phone, role, is_active, last_login_at, created_at
            FROM users
            WHERE id = $1 AND establishment_id = $2
            "#,
        )
        .bind(user_id)
        .bind(establishment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let establishment = sqlx::query_as::<_, Establishment>("SELECT * FROM establishments WHERE id = $1")
            .bind(establishment_id)
            .fetch_one(&self.db)
            .await?;

        Ok(Me {
            permissions: user.role.permissions(),
            user,
            establishment,
        })
    }

    /// Build the access/refresh token pair
    fn generate_tokens(&self, user_id: Uuid, establishment_id: Uuid, role: StaffRole) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: user_id.to_string(),
            establishment_id: establishment_id.to_string(),
            role,
            permissions: role.permissions(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(Self::hash_token(token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Refresh tokens are stored as SHA-256 hex digests
    fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_jwt;

    fn service() -> AuthService {
        // A lazy pool never connects unless a query runs
        let db = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        AuthService {
            db,
            jwt_secret: "test-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = AuthService::hash_token("abc");
        assert_eq!(a.len(), 64);
        assert_eq!(a, AuthService::hash_token("abc"));
        assert_ne!(a, AuthService::hash_token("abd"));
        assert_eq!(
            a,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_generated_token_carries_role_permissions() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let establishment_id = Uuid::new_v4();
        let tokens = svc.generate_tokens(user_id, establishment_id, StaffRole::Kitchen).unwrap();

        assert_eq!(tokens.token_type, "Bearer");
        let claims = decode_jwt(&tokens.access_token, "test-secret").unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.establishment_id, establishment_id.to_string());
        assert_eq!(claims.permissions, StaffRole::Kitchen.permissions());
    }

    #[test]
    fn test_hash_password_rejects_short() {
        assert!(hash_password("short").is_err());
    }
}
