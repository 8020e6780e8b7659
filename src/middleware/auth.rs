use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;
use std::future::{ready, Ready};

use crate::{
    config::AppConfig,
    services::auth_service::{self, Claims},
    utils::error::AppError,
};

pub const SESSION_COOKIE: &str = "session";

/// Session token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()))
}

pub fn session_cookie(config: &AppConfig, token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(config.jwt.ttl_hours))
        .finish()
}

pub fn cleared_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Verifies the session token (when present) and stores its `Claims` in the request
/// extensions. Requests without a valid token pass through unauthenticated.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = match (req.app_data::<web::Data<AppConfig>>(), session_token(req.request())) {
            (Some(config), Some(token)) => match auth_service::verify_token(&config.jwt, &token) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    log::debug!("🔒 Rejected session token on {}: {}", req.path(), e);
                    None
                }
            },
            _ => None,
        };

        if let Some(claims) = claims {
            req.extensions_mut().insert(claims);
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

/// Authenticated caller. Extraction fails with 401 when the request carries no valid session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub claims: Claims,
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let result = match claims {
            Some(claims) => claims.user_id().map(|id| CurrentUser { id, claims }),
            None => Err(AppError::Unauthenticated("Login required".to_string())),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_config, models::User};
    use actix_web::{http::StatusCode, test as actix_test, App, HttpResponse};

    async fn whoami(user: CurrentUser) -> HttpResponse {
        HttpResponse::Ok().body(user.claims.username)
    }

    async fn maybe(user: Option<CurrentUser>) -> HttpResponse {
        HttpResponse::Ok().body(if user.is_some() { "yes" } else { "no" })
    }

    fn token_for(username: &str) -> String {
        let mut user = User::new(username.into(), None);
        user.id = Some(ObjectId::new());
        auth_service::generate_jwt(&test_config().jwt, &user).unwrap()
    }

    macro_rules! app {
        () => {
            actix_test::init_service(
                App::new()
                    .app_data(web::Data::new(test_config()))
                    .wrap(AuthMiddleware)
                    .route("/me", web::get().to(whoami))
                    .route("/maybe", web::get().to(maybe)),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_missing_session_is_unauthorized() {
        let app = app!();
        let req = actix_test::TestRequest::get().uri("/me").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_bearer_token_accepted() {
        let app = app!();
        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token_for("ada"))))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "ada");
    }

    #[actix_rt::test]
    async fn test_cookie_session_accepted() {
        let app = app!();
        let req = actix_test::TestRequest::get()
            .uri("/me")
            .cookie(Cookie::new(SESSION_COOKIE, token_for("grace")))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "grace");
    }

    #[actix_rt::test]
    async fn test_tampered_token_rejected() {
        let app = app!();
        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", "Bearer not.a.token"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_optional_user_never_fails() {
        let app = app!();
        let req = actix_test::TestRequest::get().uri("/maybe").to_request();
        assert_eq!(actix_test::call_and_read_body(&app, req).await, "no");

        let req = actix_test::TestRequest::get()
            .uri("/maybe")
            .insert_header(("Authorization", format!("Bearer {}", token_for("ada"))))
            .to_request();
        assert_eq!(actix_test::call_and_read_body(&app, req).await, "yes");
    }

    #[test]
    fn test_cleared_cookie_expires() {
        let cookie = cleared_session_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert!(cookie.max_age().is_some());
    }
}
