use actix_multipart::{Field, Multipart, MultipartError};
use futures::stream::StreamExt;
use std::collections::HashMap;

use crate::{
    services::{
        attraction_service::{AttractionUpdate, NewAttraction},
        image_store::UploadFile,
    },
    utils::error::{AppError, AppResult},
};

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;
const IMAGE_FIELDS: [&str; 3] = ["images", "images[]", "image"];

/// Multipart body split into text fields and uploaded image files
#[derive(Debug, Default)]
pub struct AttractionForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadFile>,
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::InvalidRequest(format!("Malformed multipart body: {}", e))
}

async fn read_field(field: &mut Field, limit: usize, name: &str) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if data.len() + chunk.len() > limit {
            return Err(AppError::InvalidRequest(format!(
                "Field '{}' exceeds the {} byte limit",
                name, limit
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

impl AttractionForm {
    pub async fn read(mut payload: Multipart, max_file_bytes: usize) -> AppResult<Self> {
        let mut form = AttractionForm::default();

        while let Some(item) = payload.next().await {
            let mut field = item.map_err(multipart_error)?;
            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|m| m.to_string());

            match filename {
                Some(filename) if IMAGE_FIELDS.contains(&name.as_str()) => {
                    let bytes = read_field(&mut field, max_file_bytes, &name).await?;
                    if bytes.is_empty() {
                        continue;
                    }
                    form.files.push(UploadFile {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                Some(_) => {
                    log::debug!("Ignoring unexpected file field '{}'", name);
                    read_field(&mut field, max_file_bytes, &name).await?;
                }
                None => {
                    let bytes = read_field(&mut field, MAX_TEXT_FIELD_BYTES, &name).await?;
                    let text = String::from_utf8(bytes).map_err(|_| {
                        AppError::InvalidRequest(format!("Field '{}' is not valid UTF-8", name))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> AppResult<String> {
        self.text(key)
            .ok_or_else(|| AppError::InvalidRequest(format!("'{}' is required", key)))
    }

    pub fn into_new_attraction(self) -> AppResult<NewAttraction> {
        Ok(NewAttraction {
            name: self.required("name")?,
            description: self.required("description")?,
            location: self.required("location")?,
            files: self.files,
        })
    }

    /// `deleteImages` carries a JSON array of deletable ids.
    pub fn into_update(self) -> AppResult<AttractionUpdate> {
        let delete_images = match self.text("deleteImages") {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
                AppError::InvalidRequest(format!("deleteImages must be a JSON array of ids: {}", e))
            })?,
            None => Vec::new(),
        };

        Ok(AttractionUpdate {
            name: self.text("name"),
            description: self.text("description"),
            location: self.text("location"),
            delete_images,
            files: self.files,
        })
    }
}
