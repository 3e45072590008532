//! Reading the multipart post form.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use tracing::warn;

use crate::application::{
    authoring::{ImageUpload, PostSubmission},
    error::HttpError,
};

const SOURCE: &str = "infra::http::forms::read_post_submission";

/// Collect the `text`, `group` and `image` fields. Unknown fields are skipped.
///
/// A file input left empty by the browser arrives as a part with no file
/// name and no bytes; that counts as no image.
pub(super) async fn read_post_submission(
    multipart: &mut Multipart,
) -> Result<PostSubmission, HttpError> {
    let mut submission = PostSubmission::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                warn!(
                    target = SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                return Err(invalid_form(err));
            }
        };

        match field.name() {
            Some("text") => submission.text = field.text().await.map_err(invalid_form)?,
            Some("group") => submission.group = field.text().await.map_err(invalid_form)?,
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string();
                let bytes = field.bytes().await.map_err(invalid_form)?;
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                let filename = if filename.is_empty() {
                    "upload".to_string()
                } else {
                    filename
                };
                submission.image = Some(ImageUpload { filename, bytes });
            }
            _ => continue,
        }
    }

    Ok(submission)
}

fn invalid_form(err: axum_extra::extract::multipart::MultipartError) -> HttpError {
    let status = err.status();
    let public_message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "Upload is too large"
    } else {
        "Form data was invalid"
    };
    HttpError::new(SOURCE, status, public_message, err.to_string())
}
