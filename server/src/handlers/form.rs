use axum::async_trait;
use axum::extract::multipart::MultipartError;
use axum::extract::{Form, FromRequest, Json, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde_json::{Map, Value};

use crate::models::EventFields;
use crate::utils::error::AppError;

/// Multipart field carrying the optional upload.
const IMAGE_FIELD: &str = "image";

/// Event fields from a multipart, urlencoded or JSON body.
///
/// Only multipart bodies can carry the image; the file contents are skipped
/// and only its original filename is kept. A request without a content type
/// yields no fields.
#[derive(Debug)]
pub struct EventForm(pub EventFields);

#[async_trait]
impl<S> FromRequest<S> for EventForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase);

        let fields = match content_type.as_deref() {
            None => EventFields::new(),
            Some(ct) if ct.starts_with("multipart/form-data") => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| AppError::invalid(e.body_text()))?;
                from_multipart(multipart).await?
            }
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                    .await
                    .map_err(|e| AppError::invalid(e.body_text()))?;
                let mut fields = EventFields::new();
                for (key, value) in pairs {
                    fields.insert(key, value);
                }
                fields
            }
            Some(ct) if ct.starts_with("application/json") => {
                let Json(object) = Json::<Map<String, Value>>::from_request(req, state)
                    .await
                    .map_err(|e| AppError::invalid(e.body_text()))?;
                from_json(object)?
            }
            Some(other) => {
                return Err(AppError::invalid(format!(
                    "Unsupported content type: {}",
                    other
                )))
            }
        };

        Ok(EventForm(fields))
    }
}

async fn from_multipart(mut multipart: Multipart) -> Result<EventFields, AppError> {
    let mut fields = EventFields::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                if name != IMAGE_FIELD {
                    return Err(AppError::invalid(format!("Unexpected file field: {}", name)));
                }
                // Browsers send an empty filename when no file was picked.
                if !file_name.is_empty() {
                    fields.set_image(file_name);
                }
            }
            // A text part named "image" is kept as a plain field, where the
            // schema check rejects it like any other non-upload image.
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                fields.insert(name, value);
            }
        }
    }

    Ok(fields)
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::invalid(e.body_text())
}

fn from_json(object: Map<String, Value>) -> Result<EventFields, AppError> {
    let mut fields = EventFields::new();

    for (key, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(AppError::invalid(format!(
                    "Field '{}' must be a scalar value",
                    key
                )))
            }
        };
        fields.insert(key, text);
    }

    Ok(fields)
}
