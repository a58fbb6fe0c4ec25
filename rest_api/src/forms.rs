// rest_api/src/forms.rs

use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use lib::uploads::{ImageUpload, MAX_IMAGE_BYTES};
use models::ClinicError;

use crate::error::RestApiError;

/// Name of the multipart part carrying the profile image.
pub const IMAGE_FIELD: &str = "image";

/// Body of the staff creation routes: either JSON, or `multipart/form-data`
/// whose text parts become the fields and whose `image` part is the upload.
/// A repeated text part turns into an array.
pub struct StaffForm<T> {
    pub fields: T,
    pub image: Option<ImageUpload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

fn insert_field(fields: &mut Map<String, Value>, name: String, value: String) {
    match fields.get_mut(&name) {
        None => {
            fields.insert(name, Value::String(value));
        }
        Some(Value::Array(items)) => items.push(Value::String(value)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
    }
}

fn check_image(image: &ImageUpload) -> Result<(), RestApiError> {
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(RestApiError::PayloadTooLarge("Image must be 5MB or smaller".to_string()));
    }
    if !image.content_type.starts_with("image/") {
        return Err(ClinicError::validation("image must be an image file").into());
    }
    Ok(())
}

#[async_trait]
impl<S, T> FromRequest<S> for StaffForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = RestApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(fields) = Json::<T>::from_request(req, state).await?;
            return Ok(StaffForm { fields, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| RestApiError::InvalidBody(rejection.body_text()))?;

        let mut fields = Map::new();
        let mut image = None;
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == IMAGE_FIELD {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                let upload = ImageUpload { bytes: bytes.to_vec(), filename, content_type };
                check_image(&upload)?;
                debug!("Received image {} ({} bytes)", upload.filename, upload.bytes.len());
                image = Some(upload);
            } else {
                let text = field.text().await?;
                insert_field(&mut fields, name, text);
            }
        }

        let fields = serde_json::from_value(Value::Object(fields))
            .map_err(|e| RestApiError::InvalidBody(e.to_string()))?;
        Ok(StaffForm { fields, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repeated_parts_become_arrays() {
        let mut fields = Map::new();
        insert_field(&mut fields, "department_ids".into(), "d1".into());
        insert_field(&mut fields, "name".into(), "Dana".into());
        insert_field(&mut fields, "department_ids".into(), "d2".into());
        insert_field(&mut fields, "department_ids".into(), "d3".into());
        assert_eq!(Value::Object(fields), json!({"department_ids": ["d1", "d2", "d3"], "name": "Dana"}));
    }

    #[test]
    fn images_are_limited_in_size_and_type() {
        let image = |len: usize, content_type: &str| ImageUpload {
            bytes: vec![0; len],
            filename: "a".into(),
            content_type: content_type.into(),
        };
        assert!(check_image(&image(10, "image/png")).is_ok());
        assert!(matches!(check_image(&image(MAX_IMAGE_BYTES + 1, "image/png")), Err(RestApiError::PayloadTooLarge(_))));
        assert!(matches!(check_image(&image(10, "text/plain")), Err(RestApiError::Clinic(ClinicError::Validation(_)))));
    }
}
