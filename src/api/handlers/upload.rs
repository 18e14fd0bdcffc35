use crate::models::Uploads;
use axum::{Extension, Json};

#[utoipa::path(
    post,
    path = "/upload",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "One or more file parts"
    ),
    responses(
        (status = 200, description = "Files accepted, rejected and skipped by the upload policy", body = Uploads),
        (status = 400, description = "Malformed multipart body"),
        (status = 409, description = "A stored file with the same name already exists"),
        (status = 413, description = "Request body exceeds the configured limit"),
        (status = 422, description = "Not a multipart/form-data request, or no files submitted")
    ),
    tag = "uploads"
)]
pub async fn upload_files(Extension(uploads): Extension<Uploads>) -> Json<Uploads> {
    Json(uploads)
}
