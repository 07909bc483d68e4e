use crate::{
    db::DbPool,
    entities::{user, UserRole},
    errors::ServiceError,
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Claim structure for session tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub username: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub is_logged_in: bool,
    pub username: String,
    pub role: UserRole,
}

/// Produces an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| ServiceError::InternalError(format!("salt generation failed: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(error = %err, "stored password hash is malformed");
            false
        }
    }
}

/// Password login and stateless HS256 session tokens.
#[derive(Clone)]
pub struct AuthService {
    db_pool: Arc<DbPool>,
    jwt_secret: String,
    jwt_expiration: usize,
}

impl AuthService {
    pub fn new(db_pool: Arc<DbPool>, jwt_secret: impl Into<String>, jwt_expiration: usize) -> Self {
        Self {
            db_pool,
            jwt_secret: jwt_secret.into(),
            jwt_expiration,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, ServiceError> {
        if username.trim().is_empty() {
            return Err(ServiceError::ValidationError("username is required".to_string()));
        }
        if password.is_empty() {
            return Err(ServiceError::ValidationError("password is required".to_string()));
        }

        let account = user::Entity::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(&*self.db_pool)
            .await?;
        let account = match account {
            Some(account) if verify_password(password, &account.password_hash) => account,
            _ => {
                warn!("login rejected");
                return Err(ServiceError::Unauthorized(
                    "invalid username or password".to_string(),
                ));
            }
        };

        let token = self.issue_token(&account)?;
        info!(user_id = account.id, "user logged in");
        Ok(LoginResult {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_expiration,
            username: account.username,
            role: account.role,
        })
    }

    pub fn issue_token(&self, account: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            role: account.role,
            iat: now,
            exp: now + self.jwt_expiration as i64,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token creation failed: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("session expired".to_string())
            }
            _ => ServiceError::Unauthorized("invalid session token".to_string()),
        })
    }

    /// Session details for an `Authorization` header value.
    pub fn session(&self, authorization: Option<&str>) -> Result<SessionInfo, ServiceError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("not logged in".to_string()))?;
        let claims = self.validate_token(token)?;
        Ok(SessionInfo {
            is_logged_in: true,
            username: claims.username,
            role: claims.role,
        })
    }

    /// Creates the user, or resets the password and role of an existing one.
    #[instrument(skip(self, password))]
    pub async fn create_or_reset_user(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        let username = username.trim();
        if username.is_empty() || password.len() < 4 {
            return Err(ServiceError::ValidationError(
                "username is required and passwords need at least 4 characters".to_string(),
            ));
        }
        let password_hash = hash_password(password)?;

        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db_pool)
            .await?;
        let account = match existing {
            Some(account) => {
                let mut active: user::ActiveModel = account.into();
                active.password_hash = Set(password_hash);
                active.role = Set(role);
                active.update(&*self.db_pool).await?
            }
            None => {
                user::ActiveModel {
                    username: Set(username.to_string()),
                    password_hash: Set(password_hash),
                    role: Set(role),
                    ..Default::default()
                }
                .insert(&*self.db_pool)
                .await?
            }
        };
        info!(user_id = account.id, "user saved");
        Ok(account)
    }
}
