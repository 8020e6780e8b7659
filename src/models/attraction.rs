use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::user::AuthorView;

/// Hosted image: durable URL plus the token needed to delete it from the image store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    pub deletable_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Geocode {
    pub lat: f64,
    pub lng: f64,
}

/// Review sub-document embedded in an attraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub content: String,
    pub stars: u8,
    pub author: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
}

/// Attraction document in the "attractions" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attraction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub added_by: ObjectId,
    pub name: String,
    pub description: String,
    /// Free-text address as typed by the user
    pub location: String,
    /// Address as normalised by the geocoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocode: Option<Geocode>,
    #[serde(default)]
    pub images: Vec<Image>,
    /// Single-image records written before multi-image upload existed
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub visited: i64,
    #[serde(default)]
    pub want_to_visit_count: i64,
}

impl Attraction {
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn is_owned_by(&self, user_id: &ObjectId) -> bool {
        &self.added_by == user_id
    }

    pub fn deletable_ids(&self) -> Vec<String> {
        self.images.iter().map(|img| img.deletable_id.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub content: String,
    pub stars: u8,
    /// None when the author account no longer exists
    pub author: Option<AuthorView>,
}

impl ReviewResponse {
    pub fn resolve(review: &Review, authors: &HashMap<ObjectId, AuthorView>) -> Self {
        ReviewResponse {
            id: review.id.to_hex(),
            content: review.content.clone(),
            stars: review.stars,
            author: authors.get(&review.author).cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttractionResponse {
    pub id: String,
    pub added_by: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub address: Option<String>,
    pub geocode: Option<Geocode>,
    pub images: Vec<Image>,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub reviews: Vec<ReviewResponse>,
    pub visited: i64,
    pub want_to_visit_count: i64,
}

impl AttractionResponse {
    /// Builds the response with review authors resolved from `authors`.
    pub fn with_authors(attraction: Attraction, authors: &HashMap<ObjectId, AuthorView>) -> Self {
        let reviews = attraction
            .reviews
            .iter()
            .map(|r| ReviewResponse::resolve(r, authors))
            .collect();

        AttractionResponse {
            id: attraction.id_hex(),
            added_by: attraction.added_by.to_hex(),
            name: attraction.name,
            description: attraction.description,
            location: attraction.location,
            address: attraction.address,
            geocode: attraction.geocode,
            images: attraction.images,
            image_url: attraction.image_url,
            reviews,
            visited: attraction.visited,
            want_to_visit_count: attraction.want_to_visit_count,
        }
    }
}

impl From<Attraction> for AttractionResponse {
    fn from(attraction: Attraction) -> Self {
        AttractionResponse::with_authors(attraction, &HashMap::new())
    }
}

/// Body of POST /attractions/{id}/reviews
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateReviewRequest {
    pub content: String,
    pub stars: u8,
}

impl CreateReviewRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("Review content is required".to_string());
        }
        if !(1..=5).contains(&self.stars) {
            return Err(format!("Stars must be between 1 and 5, got {}", self.stars));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReviewsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    pub reviews: Vec<ReviewResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, from_document};

    #[test]
    fn test_legacy_single_image_record() {
        let owner = ObjectId::new();
        let attraction: Attraction = from_document(doc! {
            "_id": ObjectId::new(),
            "addedBy": owner,
            "name": "Crossness Pumping Station",
            "description": "Victorian sewage works",
            "location": "Belvedere Road, London",
            "imageURL": "http://res.cloudinary.com/demo/crossness.jpg",
        })
        .unwrap();

        assert!(attraction.images.is_empty());
        assert!(attraction.reviews.is_empty());
        assert_eq!(attraction.visited, 0);
        assert_eq!(attraction.want_to_visit_count, 0);
        assert!(attraction.is_owned_by(&owner));

        let json = serde_json::to_value(AttractionResponse::from(attraction)).unwrap();
        assert_eq!(json["imageURL"], "http://res.cloudinary.com/demo/crossness.jpg");
        assert_eq!(json["addedBy"], owner.to_hex());
    }

    #[test]
    fn test_review_author_resolution() {
        let author = ObjectId::new();
        let ghost = ObjectId::new();
        let review = |by| Review {
            id: ObjectId::new(),
            content: "worth the trip".into(),
            stars: 4,
            author: by,
            created_at: None,
        };
        let authors = HashMap::from([(
            author,
            AuthorView { id: author.to_hex(), username: "ada".into() },
        )]);

        let resolved = ReviewResponse::resolve(&review(author), &authors);
        assert_eq!(resolved.author.unwrap().username, "ada");
        assert!(ReviewResponse::resolve(&review(ghost), &authors).author.is_none());
    }

    #[test]
    fn test_review_request_validation() {
        let ok = CreateReviewRequest { content: "x".into(), stars: 5 };
        assert!(ok.validate().is_ok());
        let blank = CreateReviewRequest { content: "  ".into(), stars: 3 };
        assert!(blank.validate().is_err());
        let zero = CreateReviewRequest { content: "x".into(), stars: 0 };
        assert!(zero.validate().is_err());
        let six = CreateReviewRequest { content: "x".into(), stars: 6 };
        assert!(six.validate().is_err());
    }
}
