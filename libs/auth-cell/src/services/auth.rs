use chrono::Utc;
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::error::AppError;
use shared_utils::jwt::sign_token;

use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserRecord, VALID_ROLES};
use crate::services::password::{hash_password, verify_password};

pub struct AuthService {
    store: PostgrestClient,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_hours: config.token_ttl_hours,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        debug!("Registering new user: {}", request.email);

        if !VALID_ROLES.contains(&request.role.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Role must be one of: {}",
                VALID_ROLES.join(", ")
            )));
        }

        if request.password.is_empty() {
            return Err(AppError::BadRequest("Password must not be empty".to_string()));
        }

        let existing_path = format!(
            "/rest/v1/users?email=eq.{}&select=id",
            urlencoding::encode(&request.email)
        );
        let existing: Vec<serde_json::Value> = self.store.select(&existing_path).await?;
        if !existing.is_empty() {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user_data = json!({
            "name": request.name,
            "email": request.email,
            "password_hash": password_hash,
            "role": request.role,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<UserRecord> = self.store.insert("/rest/v1/users", user_data).await?;
        let user = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to create user".to_string()))?;

        debug!("User registered successfully with ID: {}", user.id);

        self.respond_with_token(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        debug!("Login attempt for: {}", request.email);

        let path = format!(
            "/rest/v1/users?email=eq.{}",
            urlencoding::encode(&request.email)
        );
        let result: Vec<UserRecord> = self.store.select(&path).await?;

        // Unknown email and wrong password produce the same error so login
        // probing cannot distinguish the two.
        let user = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

        let valid = verify_password(&request.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::Auth("Invalid email or password".to_string()));
        }

        debug!("Login successful for user: {}", user.id);

        self.respond_with_token(user)
    }

    fn respond_with_token(&self, user: UserRecord) -> Result<AuthResponse, AppError> {
        let token = sign_token(
            user.id,
            &user.email,
            &user.role,
            &self.jwt_secret,
            self.token_ttl_hours,
        )
        .map_err(AppError::Internal)?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }
}
