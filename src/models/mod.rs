use serde::Serialize;
use std::path::PathBuf;
use tempfile::TempPath;
use utoipa::ToSchema;

/// A file part decoded from a multipart body.
///
/// The part owns its spooled temporary file: dropping a part that was never
/// moved into the upload directory removes the file.
#[derive(Debug)]
pub struct UploadedPart {
    /// Filename supplied by the client
    pub original_name: String,
    /// Form field the file was submitted under
    pub field_name: String,
    pub temp_path: TempPath,
}

impl UploadedPart {
    pub fn new(
        original_name: impl Into<String>,
        field_name: impl Into<String>,
        temp_path: TempPath,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            field_name: field_name.into(),
            temp_path,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedFile {
    pub original_name: String,
    /// Stored base name, including the random prefix when enabled
    pub name: String,
    /// Lowercased extension, empty when the file has none
    pub ext: String,
    pub file_name: String,
    /// Size in megabytes
    pub size: f64,
    #[schema(value_type = String)]
    pub temp_path: PathBuf,
    #[schema(value_type = String)]
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileError {
    pub file: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    FieldNotAllowed,
    ExtensionNotAllowed,
    FileLimitReached,
}

/// A part removed by one of the selection filters. Not an error.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkippedFile {
    pub file: String,
    pub field: String,
    pub reason: SkipReason,
}

/// Outcome of the upload middleware, handed to the next handler through the
/// request extensions.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct Uploads {
    pub files: Vec<AcceptedFile>,
    /// `None` unless at least one file failed validation
    pub errors: Option<Vec<FileError>>,
    pub skipped: Vec<SkippedFile>,
}
