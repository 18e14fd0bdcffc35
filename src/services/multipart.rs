use crate::api::error::AppError;
use crate::models::UploadedPart;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use futures::TryStreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// Source of the file parts submitted with a request.
#[async_trait::async_trait]
pub trait FormDataSource: Send {
    /// Materialize every file part. Parts without a filename are form fields,
    /// not files, and are not returned.
    async fn read_files(self) -> Result<Vec<UploadedPart>, AppError>;
}

/// Reads an axum multipart body, spooling each file part to a temporary file.
pub struct MultipartBody {
    multipart: Multipart,
    temp_dir: PathBuf,
}

impl MultipartBody {
    pub fn new(multipart: Multipart, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            multipart,
            temp_dir: temp_dir.into(),
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.body_text();
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE || err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(format!("Invalid multipart data: {}", err_msg))
    }
}

#[async_trait::async_trait]
impl FormDataSource for MultipartBody {
    async fn read_files(mut self) -> Result<Vec<UploadedPart>, AppError> {
        std::fs::create_dir_all(&self.temp_dir)?;

        let mut parts = Vec::new();
        while let Some(field) = self.multipart.next_field().await.map_err(multipart_error)? {
            let field_name = field.name().unwrap_or_default().to_string();
            let original_name = match field.file_name() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    tracing::debug!(field = %field_name, "Skipping non-file form field");
                    continue;
                }
            };

            let (file, temp_path) = tempfile::Builder::new()
                .prefix("upload-")
                .tempfile_in(&self.temp_dir)?
                .into_parts();
            let mut file = tokio::fs::File::from_std(file);

            let body_with_io_error = field.map_err(std::io::Error::other);
            let mut reader = StreamReader::new(body_with_io_error);

            let written = tokio::io::copy(&mut reader, &mut file)
                .await
                .map_err(|e| {
                    // Body errors surface as io::Error wrapping the multipart error
                    if e.get_ref().is_some_and(|inner| inner.is::<MultipartError>()) {
                        match e.into_inner().map(|inner| inner.downcast::<MultipartError>()) {
                            Some(Ok(multipart_err)) => multipart_error(*multipart_err),
                            _ => AppError::BadRequest("Failed to read file part".to_string()),
                        }
                    } else {
                        AppError::Io(e)
                    }
                })?;
            file.flush().await?;

            tracing::debug!(
                field = %field_name,
                filename = ?original_name,
                bytes = written,
                temp = ?temp_path,
                "Spooled file part"
            );

            parts.push(UploadedPart::new(original_name, field_name, temp_path));
        }

        Ok(parts)
    }
}

/// Parts that are already on disk, e.g. produced by another decoder.
pub struct StagedParts(pub Vec<UploadedPart>);

#[async_trait::async_trait]
impl FormDataSource for StagedParts {
    async fn read_files(self) -> Result<Vec<UploadedPart>, AppError> {
        Ok(self.0)
    }
}
