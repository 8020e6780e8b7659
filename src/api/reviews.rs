use actix_web::{web, HttpResponse};

use crate::{
    api::parse_id,
    database::MongoDB,
    middleware::CurrentUser,
    models::{CreateReviewRequest, ReviewsResponse},
    services::review_service,
    utils::error::AppError,
};

#[utoipa::path(
    post,
    path = "/api/attractions/{id}/reviews",
    tag = "Reviews",
    params(("id" = String, Path, description = "Attraction id")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review added; full review list returned", body = ReviewsResponse),
        (status = 400, description = "Blank content or stars outside 1..=5"),
        (status = 404, description = "Attraction not found")
    ),
    security(("session" = []))
)]
pub async fn add_review(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let attraction_id = parse_id(&path, "attraction")?;
    log::info!("⭐ POST /attractions/{}/reviews - by {}", path, user.claims.username);

    let response = review_service::add_review(&db, &attraction_id, user.id, &request).await?;
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    delete,
    path = "/api/attractions/{id}/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("id" = String, Path, description = "Attraction id"),
        ("review_id" = String, Path, description = "Review id")
    ),
    responses(
        (status = 200, description = "`removed` tells whether the caller's review was deleted", body = ReviewsResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Attraction not found")
    ),
    security(("session" = []))
)]
pub async fn delete_review(
    user: CurrentUser,
    db: web::Data<MongoDB>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (attraction, review) = path.into_inner();
    let attraction_id = parse_id(&attraction, "attraction")?;
    let review_id = parse_id(&review, "review")?;
    log::info!("🗑️  DELETE /attractions/{}/reviews/{} - by {}", attraction, review, user.claims.username);

    let response = review_service::remove_review(&db, &attraction_id, &review_id, &user.id).await?;
    Ok(HttpResponse::Ok().json(response))
}
