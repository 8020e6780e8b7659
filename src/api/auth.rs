use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::{
    config::AppConfig,
    database::MongoDB,
    middleware::{
        auth::{cleared_session_cookie, session_cookie},
        CurrentUser,
    },
    models::UserResponse,
    services::auth_service::{self, AuthResponse, LoginRequest, OAuthRequest, RegisterRequest},
    utils::error::AppError,
};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoggedInResponse {
    pub logged_in: bool,
    pub user: Option<UserResponse>,
}

fn with_session(mut builder: actix_web::HttpResponseBuilder, config: &AppConfig, response: AuthResponse) -> HttpResponse {
    builder
        .cookie(session_cookie(config, &response.token))
        .json(response)
}

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /register - username: {}", request.username);

    let response = auth_service::register(&db, &config, &request).await?;
    Ok(with_session(HttpResponse::Created(), &config, response))
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /login - username: {}", request.username);

    let response = auth_service::login(&db, &config, &request).await?;
    log::info!("✅ Login successful: {}", request.username);
    Ok(with_session(HttpResponse::Ok(), &config, response))
}

#[utoipa::path(
    post,
    path = "/api/oauth",
    tag = "Auth",
    request_body = OAuthRequest,
    responses(
        (status = 200, description = "Signed in with Google", body = AuthResponse),
        (status = 401, description = "Google token rejected")
    )
)]
pub async fn oauth(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    request: web::Json<OAuthRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /oauth");

    let response = auth_service::oauth_login(&db, &config, &request).await?;
    Ok(with_session(HttpResponse::Ok(), &config, response))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session cookie cleared"),
        (status = 401, description = "Not logged in")
    ),
    security(("session" = []))
)]
pub async fn logout(user: CurrentUser) -> HttpResponse {
    log::info!("👋 POST /logout - {}", user.claims.username);

    HttpResponse::Ok()
        .cookie(cleared_session_cookie())
        .json(serde_json::json!({ "success": true }))
}

#[utoipa::path(
    delete,
    path = "/api/deregister",
    tag = "Auth",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 401, description = "Not logged in")
    ),
    security(("session" = []))
)]
pub async fn deregister(
    user: CurrentUser,
    db: web::Data<MongoDB>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /deregister - {}", user.claims.username);

    auth_service::delete_user(&db, &user.id).await?;

    Ok(HttpResponse::Ok()
        .cookie(cleared_session_cookie())
        .json(serde_json::json!({
            "success": true,
            "message": "Account deleted successfully"
        })))
}

#[utoipa::path(
    get,
    path = "/api/user",
    tag = "Auth",
    responses(
        (status = 200, description = "The caller", body = UserEnvelope),
        (status = 401, description = "Not logged in")
    ),
    security(("session" = []))
)]
pub async fn get_user(
    user: CurrentUser,
    db: web::Data<MongoDB>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /user - {}", user.claims.username);

    let stored = auth_service::get_user(&db, &user.id).await?;
    Ok(HttpResponse::Ok().json(UserEnvelope {
        success: true,
        user: UserResponse::from(&stored),
    }))
}

#[utoipa::path(
    get,
    path = "/api/loggedin",
    tag = "Auth",
    responses((status = 200, description = "Whether the request carries a live session", body = LoggedInResponse))
)]
pub async fn logged_in(
    user: Option<CurrentUser>,
    db: web::Data<MongoDB>,
) -> Result<HttpResponse, AppError> {
    // A valid token for a deleted account reads as logged out
    let stored = match user {
        Some(user) => auth_service::find_user(&db, &user.id).await?,
        None => None,
    };

    Ok(HttpResponse::Ok().json(LoggedInResponse {
        logged_in: stored.is_some(),
        user: stored.as_ref().map(UserResponse::from),
    }))
}
