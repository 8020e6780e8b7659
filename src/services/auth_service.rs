use crate::{
    config::{AppConfig, JwtConfig},
    database::MongoDB,
    models::{User, UserResponse},
    utils::error::{AppError, AppResult},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

// Session claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (hex ObjectId)
    pub username: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<ObjectId> {
        ObjectId::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthenticated("Malformed session subject".to_string()))
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        let username = self.username.trim();
        if username.len() < 3 || username.len() > 32 {
            return Err("Username must be between 3 and 32 characters".to_string());
        }
        if username.chars().any(char::is_whitespace) {
            return Err("Username cannot contain spaces".to_string());
        }
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err(format!("Invalid email: {}", email));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct OAuthRequest {
    /// Google ID token obtained by the client
    pub token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

/// Fields of Google's tokeninfo response we rely on
#[derive(Debug, Deserialize)]
struct GoogleIdentity {
    aud: String,
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

// Generate session token
pub fn generate_jwt(jwt: &JwtConfig, user: &User) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id_hex(),
        username: user.username.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(jwt.ttl_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify session token
pub fn verify_token(jwt: &JwtConfig, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.clone()]);

    let mut issuers = HashSet::new();
    issuers.insert(jwt.issuer.clone());
    validation.iss = Some(issuers);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_ref()),
        &validation,
    )?;
    Ok(data.claims)
}

fn auth_response(config: &AppConfig, user: &User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        success: true,
        token: generate_jwt(&config.jwt, user)?,
        user: UserResponse::from(user),
    })
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) if we.code == 11000
    )
}

async fn insert_user(db: &MongoDB, mut user: User) -> AppResult<User> {
    let result = db.users().insert_one(&user).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict(format!("Username '{}' is already taken", user.username))
        } else {
            AppError::from(e)
        }
    })?;
    user.id = result.inserted_id.as_object_id();
    Ok(user)
}

// User registration
pub async fn register(
    db: &MongoDB,
    config: &AppConfig,
    request: &RegisterRequest,
) -> AppResult<AuthResponse> {
    request.validate().map_err(AppError::InvalidRequest)?;

    let username = request.username.trim().to_string();
    if db.users().find_one(doc! { "username": &username }).await?.is_some() {
        return Err(AppError::Conflict(format!("Username '{}' is already taken", username)));
    }

    let email = request
        .email
        .as_ref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let mut user = User::new(username, email);
    user.password = Some(hash(&request.password, DEFAULT_COST)?);

    let user = insert_user(db, user).await?;
    log::info!("✅ User registered: {} ({})", user.username, user.id_hex());

    auth_response(config, &user)
}

// User login
pub async fn login(
    db: &MongoDB,
    config: &AppConfig,
    request: &LoginRequest,
) -> AppResult<AuthResponse> {
    let user = db
        .users()
        .find_one(doc! { "username": request.username.trim() })
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid credentials".to_string()))?;

    let stored_password = user.password.as_ref().ok_or_else(|| {
        AppError::Unauthenticated("This account uses Google login. Please sign in with Google.".to_string())
    })?;

    if !verify(&request.password, stored_password)? {
        return Err(AppError::Unauthenticated("Invalid credentials".to_string()));
    }

    auth_response(config, &user)
}

async fn verify_google_token(config: &AppConfig, id_token: &str) -> AppResult<GoogleIdentity> {
    let client_id = config.google.client_id.as_deref().ok_or_else(|| {
        AppError::InvalidRequest("OAuth login is not configured".to_string())
    })?;

    let response = reqwest::Client::new()
        .get(GOOGLE_TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::Unauthenticated("Invalid Google token".to_string()));
    }

    let identity: GoogleIdentity = response.json().await?;
    if identity.aud != client_id {
        return Err(AppError::Unauthenticated("Google token was issued for another client".to_string()));
    }

    Ok(identity)
}

/// Username candidate derived from a display name or email local part.
fn username_base(identity_name: Option<&str>, email: Option<&str>) -> String {
    let source = identity_name
        .or_else(|| email.and_then(|e| e.split('@').next()))
        .unwrap_or("explorer");

    let cleaned: String = source
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .collect::<String>()
        .to_lowercase();

    if cleaned.len() < 3 {
        "explorer".to_string()
    } else {
        cleaned.chars().take(24).collect()
    }
}

async fn unique_username(db: &MongoDB, base: &str) -> AppResult<String> {
    let mut candidate = base.to_string();
    for _ in 0..5 {
        if db.users().find_one(doc! { "username": &candidate }).await?.is_none() {
            return Ok(candidate);
        }
        let suffix = Uuid::new_v4().simple().to_string();
        candidate = format!("{}{}", base, &suffix[..4]);
    }
    Err(AppError::Conflict("Could not allocate a unique username".to_string()))
}

// Google sign-in: find by google id, then by email, else create
pub async fn oauth_login(
    db: &MongoDB,
    config: &AppConfig,
    request: &OAuthRequest,
) -> AppResult<AuthResponse> {
    let identity = verify_google_token(config, &request.token).await?;
    let users = db.users();

    if let Some(user) = users.find_one(doc! { "googleId": &identity.sub }).await? {
        log::info!("✅ Found existing user by googleId: {}", user.id_hex());
        return auth_response(config, &user);
    }

    let email = identity.email.as_ref().map(|e| e.to_lowercase());

    if let Some(email) = &email {
        if let Some(mut user) = users.find_one(doc! { "email": email }).await? {
            log::info!("✅ Linking googleId to existing user: {}", user.id_hex());
            users
                .update_one(
                    doc! { "_id": user.id },
                    doc! { "$set": { "googleId": &identity.sub } },
                )
                .await?;
            user.google_id = Some(identity.sub.clone());
            return auth_response(config, &user);
        }
    }

    let base = username_base(identity.name.as_deref(), email.as_deref());
    let mut user = User::new(unique_username(db, &base).await?, email);
    user.google_id = Some(identity.sub.clone());

    let user = insert_user(db, user).await?;
    log::info!("✅ Created user {} from Google sign-in", user.username);

    auth_response(config, &user)
}

pub async fn find_user(db: &MongoDB, user_id: &ObjectId) -> AppResult<Option<User>> {
    Ok(db.users().find_one(doc! { "_id": user_id }).await?)
}

pub async fn get_user(db: &MongoDB, user_id: &ObjectId) -> AppResult<User> {
    find_user(db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user_id.to_hex())))
}

/// Removes the user record. Attractions they added stay in place.
pub async fn delete_user(db: &MongoDB, user_id: &ObjectId) -> AppResult<()> {
    let result = db.users().delete_one(doc! { "_id": user_id }).await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound(format!("User {}", user_id.to_hex())));
    }
    log::info!("🗑️ User {} deleted", user_id.to_hex());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn stored_user() -> User {
        let mut user = User::new("ada".into(), None);
        user.id = Some(ObjectId::new());
        user
    }

    #[test]
    fn test_token_roundtrip() {
        let config = test_config();
        let user = stored_user();
        let token = generate_jwt(&config.jwt, &user).unwrap();
        let claims = verify_token(&config.jwt, &token).unwrap();
        assert_eq!(claims.sub, user.id_hex());
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.user_id().unwrap(), user.id.unwrap());
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let config = test_config();
        let token = generate_jwt(&config.jwt, &stored_user()).unwrap();

        let mut other = config.jwt.clone();
        other.secret = "another-secret".into();
        assert!(matches!(verify_token(&other, &token), Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_token_rejected_for_other_audience() {
        let config = test_config();
        let token = generate_jwt(&config.jwt, &stored_user()).unwrap();

        let mut other = config.jwt.clone();
        other.audience = "someone-else".into();
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest { username: "ada".into(), email: None, password: "pw".into() };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest { username: "a".into(), email: None, password: "pw".into() };
        assert!(short.validate().is_err());

        let spaced = RegisterRequest { username: "ada l".into(), email: None, password: "pw".into() };
        assert!(spaced.validate().is_err());

        let bad_email = RegisterRequest {
            username: "ada".into(),
            email: Some("not-an-email".into()),
            password: "pw".into(),
        };
        assert!(bad_email.validate().is_err());

        let no_password = RegisterRequest { username: "ada".into(), email: None, password: String::new() };
        assert!(no_password.validate().is_err());
    }

    #[test]
    fn test_username_base() {
        assert_eq!(username_base(Some("Ada Lovelace"), None), "adalovelace");
        assert_eq!(username_base(None, Some("grace.hopper@navy.mil")), "grace.hopper");
        assert_eq!(username_base(Some("李"), None), "explorer");
        assert_eq!(username_base(None, None), "explorer");
    }

    #[test]
    fn test_password_hash_verifies() {
        let hashed = hash("hunter2", 4).unwrap();
        assert!(verify("hunter2", &hashed).unwrap());
        assert!(!verify("hunter3", &hashed).unwrap());
    }
}
