use crate::api::error::AppError;
use crate::services::multipart::MultipartBody;
use crate::services::upload::Uploader;
use crate::utils::validation::validate_multipart_content_type;
use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Accepts the files of a multipart request and hands the outcome to the next
/// handler as an `Extension<Uploads>`.
///
/// The request body is consumed; the next handler sees an empty body.
pub async fn upload_middleware(
    State(uploader): State<Arc<Uploader>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    validate_multipart_content_type(content_type).map_err(|e| {
        tracing::warn!(content_type = ?content_type, "Rejected upload: {}", e);
        AppError::UnprocessableEntity(e.message)
    })?;

    let (mut parts, body) = req.into_parts();

    // Multipart needs the headers (boundary) and extensions (body limit) of the original request
    let mut form_request = Request::new(body);
    *form_request.headers_mut() = parts.headers.clone();
    *form_request.extensions_mut() = parts.extensions.clone();

    let multipart = Multipart::from_request(form_request, &())
        .await
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let uploads = uploader
        .accept(MultipartBody::new(multipart, uploader.temp_dir()))
        .await?;

    tracing::info!(
        accepted = uploads.files.len(),
        rejected = uploads.errors.as_ref().map_or(0, Vec::len),
        skipped = uploads.skipped.len(),
        "Upload processed"
    );

    parts.extensions.insert(uploads);
    Ok(next.run(Request::from_parts(parts, Body::empty())).await)
}
