use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{
    api::{forms::AttractionForm, parse_id},
    config::AppConfig,
    database::MongoDB,
    middleware::CurrentUser,
    models::AttractionResponse,
    services::{attraction_service, ExternalServices},
    utils::error::AppError,
};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Maximum number of attractions (defaults to the configured page size, capped at 100)
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the attraction name
    pub q: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttractionEnvelope {
    pub success: bool,
    pub attraction: Option<AttractionResponse>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttractionListResponse {
    pub success: bool,
    pub attractions: Vec<AttractionResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CountResponse {
    pub success: bool,
    pub count: u64,
}

fn list_response(attractions: Vec<AttractionResponse>) -> HttpResponse {
    HttpResponse::Ok().json(AttractionListResponse {
        success: true,
        total: attractions.len(),
        attractions,
    })
}

#[utoipa::path(
    get,
    path = "/api/attractions",
    tag = "Attractions",
    params(ListQuery),
    responses((status = 200, description = "First N attractions in store order", body = AttractionListResponse))
)]
pub async fn list_attractions(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let limit = attraction_service::effective_limit(query.limit, config.page_size);
    log::info!("📋 GET /attractions - limit {}", limit);

    let attractions = attraction_service::list(&db, limit).await?;
    Ok(list_response(attraction_service::present(&db, attractions).await?))
}

#[utoipa::path(
    get,
    path = "/api/attractions/all",
    tag = "Attractions",
    responses((status = 200, description = "Every attraction", body = AttractionListResponse))
)]
pub async fn all_attractions(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /attractions/all");

    let attractions = attraction_service::all(&db).await?;
    Ok(list_response(attraction_service::present(&db, attractions).await?))
}

#[utoipa::path(
    get,
    path = "/api/attractions/search",
    tag = "Attractions",
    params(SearchQuery),
    responses((status = 200, description = "Attractions whose name contains the query", body = AttractionListResponse))
)]
pub async fn search_attractions(
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let q = query.q.as_deref().unwrap_or_default();
    log::info!("🔍 GET /attractions/search - q: '{}'", q);

    let attractions = attraction_service::search(&db, q, config.search_empty_returns_all).await?;
    Ok(list_response(attraction_service::present(&db, attractions).await?))
}

#[utoipa::path(
    get,
    path = "/api/attractions/count",
    tag = "Attractions",
    responses((status = 200, description = "Number of attractions", body = CountResponse))
)]
pub async fn count_attractions(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let count = attraction_service::count(&db).await?;
    Ok(HttpResponse::Ok().json(CountResponse { success: true, count }))
}

#[utoipa::path(
    get,
    path = "/api/attractions/{id}",
    tag = "Attractions",
    params(("id" = String, Path, description = "Attraction id")),
    responses((status = 200, description = "The attraction, or null when it does not exist", body = AttractionEnvelope))
)]
pub async fn get_attraction(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔎 GET /attractions/{}", path);

    // Reads never 404: unknown or malformed ids come back as null
    let attraction = match ObjectId::parse_str(path.as_str()) {
        Ok(id) => attraction_service::find(&db, &id).await?,
        Err(_) => None,
    };

    let attraction = match attraction {
        Some(a) => Some(attraction_service::present_one(&db, a).await?),
        None => None,
    };

    Ok(HttpResponse::Ok().json(AttractionEnvelope { success: true, attraction }))
}

#[utoipa::path(
    post,
    path = "/api/attractions",
    tag = "Attractions",
    description = "multipart/form-data with `name`, `description`, `location` and image files under `images`.",
    responses(
        (status = 201, description = "Attraction created", body = AttractionEnvelope),
        (status = 400, description = "Missing fields or oversized file"),
        (status = 401, description = "Login required"),
        (status = 502, description = "Image store or geocoder failed")
    ),
    security(("session" = []))
)]
pub async fn create_attraction(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    external: web::Data<ExternalServices>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /attractions - by {}", user.claims.username);

    let input = AttractionForm::read(payload, config.max_upload_bytes)
        .await?
        .into_new_attraction()?;
    let attraction = attraction_service::create(&db, &external, user.id, input).await?;

    Ok(HttpResponse::Created().json(AttractionEnvelope {
        success: true,
        attraction: Some(attraction),
    }))
}

#[utoipa::path(
    put,
    path = "/api/attractions/{id}",
    tag = "Attractions",
    description = "multipart/form-data; any of `name`, `description`, `location`, new `images`, and `deleteImages` (JSON array of deletable ids).",
    params(("id" = String, Path, description = "Attraction id")),
    responses(
        (status = 200, description = "Attraction updated", body = AttractionEnvelope),
        (status = 403, description = "Caller does not own the attraction"),
        (status = 404, description = "Attraction not found")
    ),
    security(("session" = []))
)]
pub async fn update_attraction(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    config: web::Data<AppConfig>,
    external: web::Data<ExternalServices>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "attraction")?;
    log::info!("🔧 PUT /attractions/{} - by {}", path, user.claims.username);

    let input = AttractionForm::read(payload, config.max_upload_bytes)
        .await?
        .into_update()?;
    let attraction = attraction_service::update(&db, &external, &user.id, &id, input).await?;

    Ok(HttpResponse::Ok().json(AttractionEnvelope {
        success: true,
        attraction: Some(attraction),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/attractions/{id}",
    tag = "Attractions",
    params(("id" = String, Path, description = "Attraction id")),
    responses(
        (status = 200, description = "Attraction deleted"),
        (status = 403, description = "Caller does not own the attraction"),
        (status = 404, description = "Attraction not found")
    ),
    security(("session" = []))
)]
pub async fn delete_attraction(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    external: web::Data<ExternalServices>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "attraction")?;
    log::info!("🗑️  DELETE /attractions/{} - by {}", path, user.claims.username);

    attraction_service::delete(&db, &external, &user.id, &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "deleted": id.to_hex()
    })))
}
