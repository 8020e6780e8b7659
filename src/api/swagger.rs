use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attractions Service API",
        version = "1.0.0",
        description = "Crowd-sourced directory of unusual attractions.\n\n**Authentication:** write endpoints need a session, sent either as the `session` cookie or as `Authorization: Bearer <token>`.\n\n**Uploads:** create and update take `multipart/form-data` with image files under `images`."
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::oauth,
        crate::api::auth::logout,
        crate::api::auth::deregister,
        crate::api::auth::get_user,
        crate::api::auth::logged_in,

        // Attractions
        crate::api::attractions::list_attractions,
        crate::api::attractions::all_attractions,
        crate::api::attractions::search_attractions,
        crate::api::attractions::count_attractions,
        crate::api::attractions::get_attraction,
        crate::api::attractions::create_attraction,
        crate::api::attractions::update_attraction,
        crate::api::attractions::delete_attraction,

        // Reviews
        crate::api::reviews::add_review,
        crate::api::reviews::delete_review,

        // Curation
        crate::api::curation::mark_been_there,
        crate::api::curation::mark_want_to_visit,
        crate::api::curation::add_to_list,
        crate::api::curation::been_there,
        crate::api::curation::want_to_visit,
        crate::api::curation::saved_list,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::OAuthRequest,
            crate::services::auth_service::AuthResponse,
            crate::api::auth::UserEnvelope,
            crate::api::auth::LoggedInResponse,
            crate::models::UserResponse,

            crate::models::AttractionResponse,
            crate::models::ReviewResponse,
            crate::models::CreateReviewRequest,
            crate::models::ReviewsResponse,
            crate::models::Image,
            crate::models::Geocode,
            crate::models::AuthorView,
            crate::api::attractions::AttractionEnvelope,
            crate::api::attractions::AttractionListResponse,
            crate::api::attractions::CountResponse,

            crate::models::CurationResponse,
            crate::models::AttractionCounters,
            crate::models::MarkOutcome,

            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login (password or Google ID token), logout and account removal."),
        (name = "Attractions", description = "Create, edit, delete, browse and search attractions."),
        (name = "Reviews", description = "Star-rated reviews on an attraction."),
        (name = "Curation", description = "Been-there, want-to-visit and saved lists with their attraction counters."),
        (name = "Health", description = "Liveness and database reachability."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    crate::middleware::auth::SESSION_COOKIE,
                    "Session JWT set by /api/login; also accepted as a Bearer token",
                ))),
            );
        }
    }
}
