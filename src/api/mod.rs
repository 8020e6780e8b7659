pub mod attractions;
pub mod auth;
pub mod curation;
pub mod forms;
pub mod health;
pub mod reviews;
pub mod swagger;

use actix_web::web;
use mongodb::bson::oid::ObjectId;

use crate::utils::error::{AppError, AppResult};

/// Parses a path segment as an ObjectId; malformed ids are a 400.
pub fn parse_id(raw: &str, what: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidRequest(format!("Invalid {} id: {}", what, raw)))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Auth
            .route("/register", web::post().to(auth::register))
            .route("/login", web::post().to(auth::login))
            .route("/oauth", web::post().to(auth::oauth))
            .route("/logout", web::post().to(auth::logout))
            .route("/deregister", web::delete().to(auth::deregister))
            .route("/loggedin", web::get().to(auth::logged_in))
            // User lists
            .service(
                web::scope("/user")
                    .route("", web::get().to(auth::get_user))
                    .route("/beenthere", web::get().to(curation::been_there))
                    .route("/wanttovisit", web::get().to(curation::want_to_visit))
                    .route("/wanttovist", web::get().to(curation::want_to_visit))
                    .route("/list", web::get().to(curation::saved_list)),
            )
            // Attractions; fixed segments before /{id}
            .service(
                web::scope("/attractions")
                    .route("", web::get().to(attractions::list_attractions))
                    .route("", web::post().to(attractions::create_attraction))
                    .route("/all", web::get().to(attractions::all_attractions))
                    .route("/search", web::get().to(attractions::search_attractions))
                    .route("/count", web::get().to(attractions::count_attractions))
                    .route("/{id}", web::get().to(attractions::get_attraction))
                    .route("/{id}", web::put().to(attractions::update_attraction))
                    .route("/{id}", web::delete().to(attractions::delete_attraction))
                    .route("/{id}/reviews", web::post().to(reviews::add_review))
                    .route("/{id}/reviews/{review_id}", web::delete().to(reviews::delete_review))
                    .route("/{id}/beenthere", web::post().to(curation::mark_been_there))
                    .route("/{id}/wanttovisit", web::post().to(curation::mark_want_to_visit))
                    .route("/{id}/wanttovist", web::post().to(curation::mark_want_to_visit))
                    .route("/{id}/list", web::post().to(curation::add_to_list)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::test_config, middleware::AuthMiddleware};
    use actix_web::{http::StatusCode, test as actix_test, App};

    #[test]
    fn test_parse_id() {
        let id = ObjectId::new();
        assert_eq!(parse_id(&id.to_hex(), "attraction").unwrap(), id);
        assert!(matches!(parse_id("nope", "review"), Err(AppError::InvalidRequest(_))));
    }

    // Auth is checked before any handler touches MongoDB, so no database is needed here
    #[actix_rt::test]
    async fn test_write_routes_require_session() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .wrap(AuthMiddleware)
                .configure(routes),
        )
        .await;

        let id = ObjectId::new().to_hex();
        let requests = vec![
            actix_test::TestRequest::post().uri(&format!("/api/attractions/{}/beenthere", id)),
            actix_test::TestRequest::post().uri(&format!("/api/attractions/{}/wanttovist", id)),
            actix_test::TestRequest::delete().uri(&format!("/api/attractions/{}", id)),
            actix_test::TestRequest::post().uri("/api/logout"),
            actix_test::TestRequest::get().uri("/api/user/list"),
        ];

        for req in requests {
            let res = actix_test::call_service(&app, req.to_request()).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
