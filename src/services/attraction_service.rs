use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};

use crate::{
    database::MongoDB,
    models::{Attraction, AttractionResponse, Image},
    services::{
        curation,
        image_store::{self, UploadFile},
        review_service, ExternalServices,
    },
    utils::error::{AppError, AppResult},
};

const MAX_PAGE_SIZE: i64 = 100;

/// Validated input for creating an attraction
#[derive(Debug)]
pub struct NewAttraction {
    pub name: String,
    pub description: String,
    pub location: String,
    pub files: Vec<UploadFile>,
}

/// Validated input for updating an attraction; `None` leaves a field as is
#[derive(Debug, Default)]
pub struct AttractionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub delete_images: Vec<String>,
    pub files: Vec<UploadFile>,
}

pub async fn find(db: &MongoDB, id: &ObjectId) -> AppResult<Option<Attraction>> {
    Ok(db.attractions().find_one(doc! { "_id": id }).await?)
}

pub async fn get_required(db: &MongoDB, id: &ObjectId) -> AppResult<Attraction> {
    find(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attraction {}", id.to_hex())))
}

/// Converts records to responses, resolving review authors with one lookup.
pub async fn present(db: &MongoDB, attractions: Vec<Attraction>) -> AppResult<Vec<AttractionResponse>> {
    let authors =
        review_service::resolve_authors(db, attractions.iter().flat_map(|a| a.reviews.iter())).await?;
    Ok(attractions
        .into_iter()
        .map(|a| AttractionResponse::with_authors(a, &authors))
        .collect())
}

pub async fn present_one(db: &MongoDB, attraction: Attraction) -> AppResult<AttractionResponse> {
    let authors = review_service::resolve_authors(db, attraction.reviews.iter()).await?;
    Ok(AttractionResponse::with_authors(attraction, &authors))
}

fn ensure_owner(attraction: &Attraction, caller: &ObjectId) -> AppResult<()> {
    if attraction.is_owned_by(caller) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the owner can modify attraction {}",
            attraction.id_hex()
        )))
    }
}

/// Drops the listed images and puts `new_images` in front of the ones that remain.
/// Returns the deletable ids that were actually on the attraction, for the caller to
/// delete from the store once the change is saved.
pub fn replace_images(attraction: &mut Attraction, new_images: Vec<Image>, remove: &[String]) -> Vec<String> {
    let doomed: Vec<String> = attraction
        .images
        .iter()
        .filter(|img| remove.contains(&img.deletable_id))
        .map(|img| img.deletable_id.clone())
        .collect();

    let existing = std::mem::take(&mut attraction.images);
    attraction.images = curation::merge_images(existing, new_images, remove);

    doomed
}

fn deletable_ids(images: &[Image]) -> Vec<String> {
    images.iter().map(|img| img.deletable_id.clone()).collect()
}

async fn insert_new(
    db: &MongoDB,
    external: &ExternalServices,
    owner: ObjectId,
    input: NewAttraction,
    images: Vec<Image>,
) -> AppResult<(ObjectId, Attraction)> {
    let geocoded = external.geocoder.geocode(&input.location).await?;

    let mut attraction = Attraction {
        id: None,
        added_by: owner,
        name: input.name,
        description: input.description,
        location: input.location,
        address: geocoded.formatted_address,
        geocode: Some(geocoded.geocode),
        images,
        image_url: None,
        reviews: Vec::new(),
        visited: 0,
        want_to_visit_count: 0,
    };

    let result = db.attractions().insert_one(&attraction).await?;
    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::DatabaseError("Inserted attraction has no ObjectId".to_string()))?;
    attraction.id = Some(id);
    Ok((id, attraction))
}

/// Uploads, geocodes and inserts. Uploaded images are discarded if the record is never stored.
pub async fn create(
    db: &MongoDB,
    external: &ExternalServices,
    owner: ObjectId,
    mut input: NewAttraction,
) -> AppResult<AttractionResponse> {
    let files = std::mem::take(&mut input.files);
    let images = image_store::upload_all(external.images.as_ref(), files).await?;
    let uploaded = deletable_ids(&images);

    let (id, attraction) = match insert_new(db, external, owner, input, images).await {
        Ok(inserted) => inserted,
        Err(e) => {
            image_store::schedule_image_deletion(external.images.clone(), uploaded);
            return Err(e);
        }
    };

    db.users()
        .update_one(doc! { "_id": owner }, doc! { "$push": { "addedAttractions": id } })
        .await?;

    log::info!("✅ Attraction {} created by {}", id.to_hex(), owner.to_hex());

    Ok(AttractionResponse::from(attraction))
}

/// Applies the edit in memory and stores it. Returns the ids of images it replaced.
async fn save_revision(
    db: &MongoDB,
    external: &ExternalServices,
    attraction: &mut Attraction,
    input: AttractionUpdate,
    new_images: Vec<Image>,
) -> AppResult<Vec<String>> {
    // Geocode before touching the record so a lookup failure leaves it as it was
    let relocated = match input.location {
        Some(location) if location != attraction.location => {
            let geocoded = external.geocoder.geocode(&location).await?;
            Some((location, geocoded))
        }
        _ => None,
    };

    if let Some(name) = input.name {
        attraction.name = name;
    }
    if let Some(description) = input.description {
        attraction.description = description;
    }
    if let Some((location, geocoded)) = relocated {
        attraction.location = location;
        attraction.geocode = Some(geocoded.geocode);
        attraction.address = geocoded.formatted_address;
    }
    let replaced = replace_images(attraction, new_images, &input.delete_images);

    let update = doc! {
        "$set": {
            "name": &attraction.name,
            "description": &attraction.description,
            "location": &attraction.location,
            "address": to_bson(&attraction.address)?,
            "geocode": to_bson(&attraction.geocode)?,
            "images": to_bson(&attraction.images)?,
        }
    };
    let id = attraction.id.ok_or_else(|| AppError::Internal("Attraction has no id".to_string()))?;
    db.attractions().update_one(doc! { "_id": id }, update).await?;

    Ok(replaced)
}

/// Uploads new images, then saves the edit. Replaced images are deleted from the store
/// only after the save succeeds; on failure the fresh uploads are deleted instead.
pub async fn revise(
    db: &MongoDB,
    external: &ExternalServices,
    attraction: &mut Attraction,
    mut input: AttractionUpdate,
) -> AppResult<()> {
    let files = std::mem::take(&mut input.files);
    let new_images = image_store::upload_all(external.images.as_ref(), files).await?;
    let uploaded = deletable_ids(&new_images);

    match save_revision(db, external, attraction, input, new_images).await {
        Ok(replaced) => {
            image_store::schedule_image_deletion(external.images.clone(), replaced);
            Ok(())
        }
        Err(e) => {
            image_store::schedule_image_deletion(external.images.clone(), uploaded);
            Err(e)
        }
    }
}

pub async fn update(
    db: &MongoDB,
    external: &ExternalServices,
    caller: &ObjectId,
    id: &ObjectId,
    input: AttractionUpdate,
) -> AppResult<AttractionResponse> {
    let mut attraction = get_required(db, id).await?;
    ensure_owner(&attraction, caller)?;

    revise(db, external, &mut attraction, input).await?;

    log::info!("✅ Attraction {} updated ({} images)", id.to_hex(), attraction.images.len());

    present_one(db, attraction).await
}

/// Deletes the attraction and its hosted images. Ids left in users' lists are not cleaned up.
pub async fn delete(
    db: &MongoDB,
    external: &ExternalServices,
    caller: &ObjectId,
    id: &ObjectId,
) -> AppResult<()> {
    let attraction = get_required(db, id).await?;
    ensure_owner(&attraction, caller)?;

    db.attractions().delete_one(doc! { "_id": id }).await?;
    image_store::schedule_image_deletion(external.images.clone(), attraction.deletable_ids());

    log::info!("🗑️ Attraction {} deleted", id.to_hex());
    Ok(())
}

pub fn effective_limit(requested: Option<i64>, default: i64) -> i64 {
    match requested {
        Some(n) if n > 0 => n.min(MAX_PAGE_SIZE),
        _ => default,
    }
}

/// First `limit` attractions in store order.
pub async fn list(db: &MongoDB, limit: i64) -> AppResult<Vec<Attraction>> {
    Ok(db
        .attractions()
        .find(doc! {})
        .limit(limit)
        .await?
        .try_collect()
        .await?)
}

pub async fn all(db: &MongoDB) -> AppResult<Vec<Attraction>> {
    Ok(db.attractions().find(doc! {}).await?.try_collect().await?)
}

/// Filter for a name search, or `None` when the query should match nothing.
pub fn search_filter(query: &str, empty_returns_all: bool) -> Option<Document> {
    let query = query.trim();
    if query.is_empty() {
        return empty_returns_all.then(Document::new);
    }
    Some(doc! {
        "name": { "$regex": regex::escape(query), "$options": "i" }
    })
}

pub async fn search(db: &MongoDB, query: &str, empty_returns_all: bool) -> AppResult<Vec<Attraction>> {
    match search_filter(query, empty_returns_all) {
        Some(filter) => Ok(db.attractions().find(filter).await?.try_collect().await?),
        None => Ok(Vec::new()),
    }
}

pub async fn count(db: &MongoDB) -> AppResult<u64> {
    Ok(db.attractions().count_documents(doc! {}).await?)
}

/// Attractions for the given ids, in the order of `ids`. Missing ids are skipped.
pub async fn find_in_order(db: &MongoDB, ids: &[ObjectId]) -> AppResult<Vec<Attraction>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let found: Vec<Attraction> = db
        .attractions()
        .find(doc! { "_id": { "$in": ids.to_vec() } })
        .await?
        .try_collect()
        .await?;

    Ok(order_by_ids(found, ids))
}

fn order_by_ids(mut found: Vec<Attraction>, ids: &[ObjectId]) -> Vec<Attraction> {
    let mut ordered = Vec::with_capacity(found.len());
    for id in ids {
        if let Some(pos) = found.iter().position(|a| a.id.as_ref() == Some(id)) {
            ordered.push(found.swap_remove(pos));
        }
    }
    ordered
}
