use std::path::Path;

/// Longest stored filename, in bytes
const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Checks that a request carries `multipart/form-data` with a boundary and
/// returns the boundary.
pub fn validate_multipart_content_type(content_type: Option<&str>) -> Result<String, ValidationError> {
    let invalid = || ValidationError {
        code: "INVALID_CONTENT_TYPE",
        message: "Invalid request type, content-type must be multipart/form-data".to_string(),
    };

    let mime: mime::Mime = content_type
        .ok_or_else(invalid)?
        .parse()
        .map_err(|_| invalid())?;

    if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
        return Err(invalid());
    }

    match mime.get_param(mime::BOUNDARY) {
        Some(boundary) if !boundary.as_str().is_empty() => Ok(boundary.as_str().to_string()),
        _ => Err(invalid()),
    }
}

/// Validates file size against maximum limit
pub fn validate_file_size(size: u64, max_size: u64) -> Result<(), ValidationError> {
    if size > max_size {
        return Err(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "File size {} bytes exceeds the maximum allowed {} bytes",
                size, max_size
            ),
        });
    }
    Ok(())
}

/// Reduces a client filename to a safe final path component.
///
/// Directory parts are dropped (both separators), control and reserved
/// characters become `_`, and the result is capped at 255 bytes.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if name.len() != filename.len() {
        tracing::warn!("Path components stripped from uploaded filename: {:?}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';') {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > MAX_FILENAME_LEN {
        let mut end = MAX_FILENAME_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

/// Splits a filename into base name and extension on the last dot.
///
/// Names without a dot, with a trailing dot, or whose only dot is the
/// leading one (`.env`) have no extension.
pub fn split_file_name(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => (base, Some(ext)),
        Some((base, "")) if !base.is_empty() => (base, None),
        _ => (file_name, None),
    }
}

/// Extension of a client filename, as used by the extension filter
pub fn extension_of(filename: &str) -> Option<String> {
    let sanitized = sanitize_filename(filename);
    split_file_name(&sanitized).1.map(|ext| ext.to_lowercase())
}
