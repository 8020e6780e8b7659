use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use std::collections::HashMap;

use crate::{
    database::{MongoDB, USERS},
    models::{AuthorView, CreateReviewRequest, Review, ReviewResponse, ReviewsResponse, UserSummary},
    services::{attraction_service, curation},
    utils::error::{AppError, AppResult},
};

/// Looks up display data for every distinct author in `reviews`.
pub async fn resolve_authors<'a, I>(db: &MongoDB, reviews: I) -> AppResult<HashMap<ObjectId, AuthorView>>
where
    I: IntoIterator<Item = &'a Review>,
{
    let mut ids: Vec<ObjectId> = reviews.into_iter().map(|r| r.author).collect();
    ids.sort();
    ids.dedup();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let summaries: Vec<UserSummary> = db
        .collection::<UserSummary>(USERS)
        .find(doc! { "_id": { "$in": ids } })
        .projection(doc! { "username": 1 })
        .await?
        .try_collect()
        .await?;

    Ok(summaries
        .into_iter()
        .map(|s| (s.id, AuthorView::from(s)))
        .collect())
}

async fn present(db: &MongoDB, reviews: &[Review]) -> AppResult<Vec<ReviewResponse>> {
    let authors = resolve_authors(db, reviews).await?;
    Ok(reviews
        .iter()
        .map(|r| ReviewResponse::resolve(r, &authors))
        .collect())
}

/// Appends a review. Repeated calls by the same author add more reviews.
pub async fn add_review(
    db: &MongoDB,
    attraction_id: &ObjectId,
    author: ObjectId,
    request: &CreateReviewRequest,
) -> AppResult<ReviewsResponse> {
    request.validate().map_err(AppError::InvalidRequest)?;

    let review = curation::new_review(author, &request.content, request.stars);
    let result = db
        .attractions()
        .update_one(
            doc! { "_id": attraction_id },
            doc! { "$push": { "reviews": to_bson(&review)? } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound(format!("Attraction {}", attraction_id.to_hex())));
    }

    log::info!("⭐ Review {} added to {}", review.id.to_hex(), attraction_id.to_hex());

    let attraction = attraction_service::get_required(db, attraction_id).await?;
    Ok(ReviewsResponse {
        success: true,
        removed: None,
        reviews: present(db, &attraction.reviews).await?,
    })
}

/// Removes the review only if `caller` wrote it; otherwise the list comes back unchanged.
pub async fn remove_review(
    db: &MongoDB,
    attraction_id: &ObjectId,
    review_id: &ObjectId,
    caller: &ObjectId,
) -> AppResult<ReviewsResponse> {
    let mut attraction = attraction_service::get_required(db, attraction_id).await?;

    let removed = curation::remove_review(&mut attraction.reviews, review_id, caller);
    if removed {
        db.attractions()
            .update_one(
                doc! { "_id": attraction_id },
                doc! { "$pull": { "reviews": { "_id": review_id, "author": caller } } },
            )
            .await?;
        log::info!("🗑️ Review {} removed from {}", review_id.to_hex(), attraction_id.to_hex());
    } else {
        log::info!(
            "ℹ️  Review {} kept on {} (not authored by {})",
            review_id.to_hex(),
            attraction_id.to_hex(),
            caller.to_hex()
        );
    }

    Ok(ReviewsResponse {
        success: true,
        removed: Some(removed),
        reviews: present(db, &attraction.reviews).await?,
    })
}
