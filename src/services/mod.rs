pub mod attraction_service;
pub mod auth_service;
pub mod curation;
pub mod curation_service;
pub mod geocoding;
pub mod image_store;
pub mod review_service;

use std::sync::Arc;

use crate::config::AppConfig;
use geocoding::{Geocoder, GoogleGeocoder};
use image_store::{CloudinaryStore, ImageStore};

/// Clients for the two SaaS collaborators, shared across workers
#[derive(Clone)]
pub struct ExternalServices {
    pub images: Arc<dyn ImageStore>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl ExternalServices {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            images: Arc::new(CloudinaryStore::new(config.cloudinary.clone())),
            geocoder: Arc::new(GoogleGeocoder::new(&config.google)),
        }
    }
}
