use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use validator::Validate;

/// Default per-file size limit: 5 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default public path (and directory under the root) for stored files
pub const DEFAULT_UPLOAD_PATH: &str = "uploads";

/// Caller-supplied upload policy. Every field is optional; anything left out
/// falls back to the defaults in [`FilterOptions`].
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadOptions {
    /// Maximum bytes per file. `0` disables the check.
    pub max_file_size: Option<u64>,

    /// Prefix stored names with a random UUID
    pub random_name: Option<bool>,

    /// Maximum number of files accepted per request. `0` means unlimited.
    #[serde(rename = "maxFile")]
    pub max_files: Option<usize>,

    /// Accepted form field names, in priority order
    #[validate(length(min = 1, message = "Field allow-list must not be empty"))]
    pub files: Option<Vec<String>>,

    /// Accepted extensions without the leading dot, in priority order
    #[validate(length(min = 1, message = "Extension allow-list must not be empty"))]
    pub exts: Option<Vec<String>>,
}

/// Fully resolved upload policy, immutable for the lifetime of an uploader.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub max_file_size: Option<u64>,
    pub random_name: bool,
    pub max_files: Option<usize>,
    pub fields: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
            random_name: true,
            max_files: None,
            fields: None,
            extensions: None,
        }
    }
}

impl UploadOptions {
    /// Overlay the supplied fields onto the defaults.
    pub fn merged(&self) -> FilterOptions {
        let default = FilterOptions::default();

        FilterOptions {
            max_file_size: match self.max_file_size {
                Some(0) => None,
                Some(size) => Some(size),
                None => default.max_file_size,
            },
            random_name: self.random_name.unwrap_or(default.random_name),
            max_files: self.max_files.filter(|&n| n > 0).or(default.max_files),
            fields: self.files.clone().or(default.fields),
            extensions: self
                .exts
                .as_ref()
                .map(|exts| exts.iter().map(|e| normalize_extension(e)).collect())
                .or(default.extensions),
        }
    }
}

/// `".PNG "` -> `"png"`
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Server-level configuration for the upload service
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Base directory that `upload_path` is resolved against (default: ".")
    pub root_dir: PathBuf,

    /// Upload directory relative to `root_dir`, also the public URL prefix (default: "uploads")
    pub upload_path: String,

    /// Where multipart file parts are spooled before being moved (default: OS temp dir)
    pub temp_dir: PathBuf,

    /// Upload policy
    pub options: UploadOptions,

    /// Maximum request body size in bytes (default: 64 MB)
    pub body_limit: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            temp_dir: env::temp_dir(),
            options: UploadOptions::default(),
            body_limit: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            root_dir: var("UPLOAD_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.root_dir),

            upload_path: var("UPLOAD_PATH")
                .map(|v| v.trim_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default.upload_path),

            temp_dir: var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.temp_dir),

            options: UploadOptions {
                max_file_size: var("MAX_FILE_SIZE").and_then(|v| v.parse().ok()),
                random_name: var("RANDOM_NAME").map(|v| v.to_lowercase() != "false" && v != "0"),
                max_files: var("MAX_FILES").and_then(|v| v.parse().ok()),
                files: var("UPLOAD_FIELDS").and_then(|v| split_list(&v)),
                exts: var("UPLOAD_EXTS").and_then(|v| split_list(&v)),
            },

            body_limit: var("BODY_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.body_limit),
        }
    }
}

fn split_list(value: &str) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() { None } else { Some(items) }
}
