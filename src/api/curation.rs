use actix_web::{web, HttpResponse};

use crate::{
    api::{attractions::AttractionListResponse, parse_id},
    database::MongoDB,
    middleware::CurrentUser,
    models::CurationResponse,
    services::curation_service::{self, CurationList},
    utils::error::AppError,
};

#[utoipa::path(
    post,
    path = "/api/attractions/{id}/beenthere",
    tag = "Curation",
    params(("id" = String, Path, description = "Attraction id")),
    responses(
        (status = 200, description = "Marked as visited (or already marked)", body = CurationResponse),
        (status = 404, description = "Attraction not found")
    ),
    security(("session" = []))
)]
pub async fn mark_been_there(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "attraction")?;
    log::info!("📍 POST /attractions/{}/beenthere - by {}", path, user.claims.username);

    let response = curation_service::mark_visited(&db, &user.id, &id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/attractions/{id}/wanttovisit",
    tag = "Curation",
    params(("id" = String, Path, description = "Attraction id")),
    responses(
        (status = 200, description = "Marked as want-to-visit (or already marked / already visited)", body = CurationResponse),
        (status = 404, description = "Attraction not found")
    ),
    security(("session" = []))
)]
pub async fn mark_want_to_visit(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "attraction")?;
    log::info!("📌 POST /attractions/{}/wanttovisit - by {}", path, user.claims.username);

    let response = curation_service::mark_want_to_visit(&db, &user.id, &id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/attractions/{id}/list",
    tag = "Curation",
    params(("id" = String, Path, description = "Attraction id")),
    responses(
        (status = 200, description = "Saved to the caller's list (or already saved)", body = CurationResponse),
        (status = 404, description = "Attraction not found")
    ),
    security(("session" = []))
)]
pub async fn add_to_list(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "attraction")?;
    log::info!("🔖 POST /attractions/{}/list - by {}", path, user.claims.username);

    let response = curation_service::add_to_list(&db, &user.id, &id).await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn list_response(user: &CurrentUser, db: &MongoDB, which: CurationList) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /user/{} - {}", which.label(), user.claims.username);

    let attractions = curation_service::list_attractions(db, &user.id, which).await?;
    Ok(HttpResponse::Ok().json(AttractionListResponse {
        success: true,
        total: attractions.len(),
        attractions,
    }))
}

#[utoipa::path(
    get,
    path = "/api/user/beenthere",
    tag = "Curation",
    responses((status = 200, description = "Attractions the caller has visited", body = AttractionListResponse)),
    security(("session" = []))
)]
pub async fn been_there(user: CurrentUser, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    list_response(&user, &db, CurationList::BeenThere).await
}

#[utoipa::path(
    get,
    path = "/api/user/wanttovisit",
    tag = "Curation",
    responses((status = 200, description = "Attractions the caller wants to visit", body = AttractionListResponse)),
    security(("session" = []))
)]
pub async fn want_to_visit(user: CurrentUser, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    list_response(&user, &db, CurationList::WantToVisit).await
}

#[utoipa::path(
    get,
    path = "/api/user/list",
    tag = "Curation",
    responses((status = 200, description = "Attractions on the caller's saved list", body = AttractionListResponse)),
    security(("session" = []))
)]
pub async fn saved_list(user: CurrentUser, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    list_response(&user, &db, CurationList::Saved).await
}
