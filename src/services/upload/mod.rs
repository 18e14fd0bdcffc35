pub mod filters;
pub mod processor;

use crate::api::error::AppError;
use crate::config::{FilterOptions, UploadConfig, UploadOptions};
use crate::models::{SkipReason, SkippedFile, UploadedPart, Uploads};
use crate::services::multipart::FormDataSource;
use filters::{filter_by_extension, filter_by_field, limit_count};
use processor::{Processed, process_part};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Accepts uploaded files according to a fixed policy.
///
/// One instance is built at startup and shared by every request; it holds no
/// mutable state.
#[derive(Debug, Clone)]
pub struct Uploader {
    upload_dir: PathBuf,
    upload_path: String,
    temp_dir: PathBuf,
    options: FilterOptions,
}

impl Uploader {
    /// Files are stored in `root_dir/upload_path` and exposed under the
    /// public path `upload_path`.
    pub fn new(
        root_dir: impl AsRef<Path>,
        upload_path: &str,
        options: &UploadOptions,
    ) -> Result<Self, AppError> {
        options.validate()?;

        let upload_path = upload_path.trim_matches('/').to_string();
        let upload_dir = std::path::absolute(root_dir.as_ref())?.join(&upload_path);

        Ok(Self {
            upload_dir,
            upload_path,
            temp_dir: std::env::temp_dir(),
            options: options.merged(),
        })
    }

    pub fn from_config(config: &UploadConfig) -> Result<Self, AppError> {
        Ok(Self::new(&config.root_dir, &config.upload_path, &config.options)?
            .with_temp_dir(&config.temp_dir))
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn upload_path(&self) -> &str {
        &self.upload_path
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Creates the upload directory if it does not exist yet.
    pub fn ensure_upload_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)
    }

    /// Runs the whole acceptance pipeline for one request.
    pub async fn accept<S: FormDataSource>(&self, source: S) -> Result<Uploads, AppError> {
        let parts = source.read_files().await?;
        if parts.is_empty() {
            return Err(AppError::UnprocessableEntity(
                "No files were uploaded in this request".to_string(),
            ));
        }

        self.ensure_upload_dir()?;

        let received = parts.len();
        let mut skipped = Vec::new();
        let selected = self.select(parts, &mut skipped);

        tracing::debug!(
            received,
            selected = selected.len(),
            skipped = skipped.len(),
            "Upload selection complete"
        );

        let mut files = Vec::new();
        let mut errors = Vec::new();
        for part in selected {
            match process_part(part, &self.options, &self.upload_dir, &self.upload_path).await? {
                Processed::Accepted(file) => files.push(file),
                Processed::Rejected(error) => errors.push(error),
            }
        }

        Ok(Uploads {
            files,
            errors: if errors.is_empty() { None } else { Some(errors) },
            skipped,
        })
    }

    fn select(&self, parts: Vec<UploadedPart>, skipped: &mut Vec<SkippedFile>) -> Vec<UploadedPart> {
        let by_field = filter_by_field(self.options.fields.as_deref(), parts);
        record_skipped(skipped, by_field.dropped, SkipReason::FieldNotAllowed);

        let by_ext = filter_by_extension(self.options.extensions.as_deref(), by_field.kept);
        record_skipped(skipped, by_ext.dropped, SkipReason::ExtensionNotAllowed);

        let by_count = limit_count(self.options.max_files, by_ext.kept);
        record_skipped(skipped, by_count.dropped, SkipReason::FileLimitReached);

        by_count.kept
    }
}

fn record_skipped(skipped: &mut Vec<SkippedFile>, dropped: Vec<UploadedPart>, reason: SkipReason) {
    for part in dropped {
        tracing::debug!(
            filename = ?part.original_name,
            field = %part.field_name,
            ?reason,
            "File not selected"
        );
        skipped.push(SkippedFile {
            file: part.original_name,
            field: part.field_name,
            reason,
        });
    }
}
