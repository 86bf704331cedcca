//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, NewUser, User, UserClaims, UserRole},
    repository::SharedStore,
};

#[derive(Clone)]
pub struct AuthService {
    store: SharedStore,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: SharedStore, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Authenticate user by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .store
            .user_get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !verify_password(&user.password_hash, password)? {
            tracing::warn!(login, "Failed login attempt");
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Issue a token for an already authenticated user
    pub fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.store.user_get_by_id(id).await
    }

    /// Create a user with a hashed password
    pub async fn create_user(&self, data: CreateUser) -> AppResult<User> {
        data.validate()?;

        let user = self
            .store
            .user_create(&NewUser {
                login: data.login,
                password_hash: hash_password(&data.password)?,
                firstname: data.firstname,
                lastname: data.lastname,
                email: data.email,
                role: data.role.unwrap_or(UserRole::Customer),
            })
            .await?;

        tracing::info!(user_id = user.id, role = ?user.role, "User created");
        Ok(user)
    }

    /// Create the configured admin account if it does not exist yet.
    /// Returns the new user, or `None` when nothing was created.
    pub async fn ensure_admin(&self) -> AppResult<Option<User>> {
        let (Some(login), Some(password)) = (&self.config.admin_login, &self.config.admin_password)
        else {
            return Ok(None);
        };
        if self.store.user_get_by_login(login).await?.is_some() {
            return Ok(None);
        }

        let admin = self
            .create_user(CreateUser {
                login: login.clone(),
                password: password.clone(),
                firstname: None,
                lastname: None,
                email: None,
                role: Some(UserRole::Admin),
            })
            .await?;
        tracing::info!(login = %admin.login, "Bootstrap admin account created");
        Ok(Some(admin))
    }
}

/// Hash a password with Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    if hash.is_empty() {
        return Ok(false);
    }
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
