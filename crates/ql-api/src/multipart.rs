//! Reads the new/edit post form from a `multipart/form-data` body.

use actix_multipart::Multipart;
use futures_util::StreamExt;
use ql_core::forms::{PostForm, Upload};

use crate::error::ApiError;

/// Uploads above this size are refused before validation.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Buffers every field. Unknown fields are drained and ignored; a file input
/// left empty by the browser yields no upload.
pub async fn read_post_form(mut payload: Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();
    let mut total_bytes: usize = 0;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let name = field.name().to_string();
        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            total_bytes += bytes.len();
            if total_bytes > MAX_UPLOAD_BYTES {
                return Err(ApiError::PayloadTooLarge(MAX_UPLOAD_BYTES));
            }
            data.extend_from_slice(&bytes);
        }

        match name.as_str() {
            "text" => form.text = String::from_utf8_lossy(&data).into_owned(),
            "group" => form.group = String::from_utf8_lossy(&data).trim().to_string(),
            "image" => match filename {
                Some(filename) if !(filename.is_empty() && data.is_empty()) => {
                    form.image = Some(Upload { filename, data });
                }
                _ => {}
            },
            "image-clear" => form.clear_image = true,
            other => log::debug!("ignoring form field {other:?}"),
        }
    }

    Ok(form)
}
