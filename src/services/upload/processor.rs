use crate::api::error::AppError;
use crate::config::FilterOptions;
use crate::models::{AcceptedFile, FileError, UploadedPart};
use crate::utils::validation::{sanitize_filename, split_file_name, validate_file_size};
use std::io::ErrorKind;
use std::path::Path;
use tempfile::TempPath;
use tokio::fs;
use uuid::Uuid;

const BYTES_PER_MB: f64 = 1_048_576.0;

pub enum Processed {
    Accepted(AcceptedFile),
    Rejected(FileError),
}

/// Base name and lowercased extension under which a file will be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredName {
    pub name: String,
    pub ext: String,
}

impl StoredName {
    pub fn derive(original_name: &str, random_name: bool) -> Self {
        let sanitized = sanitize_filename(original_name);
        let (base, ext) = split_file_name(&sanitized);

        let name = if random_name {
            format!("{}-{}", Uuid::new_v4(), base)
        } else {
            base.to_string()
        };

        Self {
            name,
            ext: ext.map(str::to_lowercase).unwrap_or_default(),
        }
    }

    pub fn file_name(&self) -> String {
        if self.ext.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.ext)
        }
    }
}

/// Validates one part and, if it passes, moves it into `upload_dir`.
pub async fn process_part(
    part: UploadedPart,
    options: &FilterOptions,
    upload_dir: &Path,
    upload_path: &str,
) -> Result<Processed, AppError> {
    let size = fs::metadata(&part.temp_path).await?.len();

    if let Some(max) = options.max_file_size
        && let Err(e) = validate_file_size(size, max)
    {
        tracing::info!(filename = ?part.original_name, size, max, "Rejected oversized file");
        return Ok(Processed::Rejected(FileError {
            file: part.original_name,
            code: e.code.to_string(),
            message: e.message,
        }));
    }

    let stored = StoredName::derive(&part.original_name, options.random_name);
    let file_name = stored.file_name();
    let path = upload_dir.join(&file_name);
    let url = public_url(upload_path, &file_name);

    let UploadedPart {
        original_name,
        temp_path,
        ..
    } = part;
    let source = temp_path.to_path_buf();

    move_into_place(temp_path, &path).await?;

    tracing::info!(
        filename = ?original_name,
        stored = %file_name,
        size,
        "File stored"
    );

    Ok(Processed::Accepted(AcceptedFile {
        original_name,
        name: stored.name,
        ext: stored.ext,
        file_name,
        size: size as f64 / BYTES_PER_MB,
        temp_path: source,
        path,
        url,
    }))
}

/// `uploads` + `a.txt` -> `uploads/a.txt`, independent of the host path separator
pub fn public_url(upload_path: &str, file_name: &str) -> String {
    let prefix = upload_path.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

/// Moves a spooled file to `dest`, refusing to replace an existing file.
///
/// Links the spooled file into place, which fails atomically when `dest`
/// exists, and falls back to an exclusive copy across devices.
pub async fn move_into_place(temp_path: TempPath, dest: &Path) -> Result<(), AppError> {
    match fs::hard_link(&temp_path, dest).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(conflict(dest)),
        Err(e) if matches!(e.kind(), ErrorKind::CrossesDevices | ErrorKind::Unsupported) => {
            tracing::debug!(dest = ?dest, "Cannot link into place, copying instead");
            copy_exclusive(&temp_path, dest).await?;
        }
        Err(e) => return Err(e.into()),
    }

    temp_path.close()?;
    Ok(())
}

async fn copy_exclusive(src: &Path, dest: &Path) -> Result<(), AppError> {
    let mut src = fs::File::open(src).await?;
    let mut dst = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => conflict(dest),
            _ => AppError::Io(e),
        })?;

    let copied = async {
        tokio::io::copy(&mut src, &mut dst).await?;
        dst.sync_all().await
    }
    .await;

    if let Err(e) = copied {
        // A partial file would block this name for every later upload
        drop(dst);
        if let Err(cleanup) = fs::remove_file(dest).await {
            tracing::warn!(dest = ?dest, "Failed to remove partial copy: {}", cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

fn conflict(dest: &Path) -> AppError {
    AppError::Conflict(format!(
        "Destination already exists: {}",
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn spooled(dir: &Path, content: &[u8]) -> TempPath {
        let mut file = tempfile::NamedTempFile::new_in(dir).unwrap();
        file.write_all(content).unwrap();
        file.into_temp_path()
    }

    fn options(random_name: bool, max_file_size: Option<u64>) -> FilterOptions {
        FilterOptions {
            random_name,
            max_file_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_stored_name_lowercases_extension() {
        let stored = StoredName::derive("Photo.JPG", false);
        assert_eq!(stored.name, "Photo");
        assert_eq!(stored.ext, "jpg");
        assert_eq!(stored.file_name(), "Photo.jpg");
        assert_eq!(stored.file_name(), format!("{}.{}", stored.name, stored.ext));
    }

    #[test]
    fn test_stored_name_multi_dot_and_no_extension() {
        let stored = StoredName::derive("backup.tar.GZ", false);
        assert_eq!(stored.name, "backup.tar");
        assert_eq!(stored.ext, "gz");

        let stored = StoredName::derive("LICENSE", false);
        assert_eq!(stored.ext, "");
        assert_eq!(stored.file_name(), "LICENSE");
    }

    #[test]
    fn test_stored_name_strips_directories() {
        let stored = StoredName::derive("../../etc/passwd.txt", false);
        assert_eq!(stored.file_name(), "passwd.txt");
    }

    #[test]
    fn test_random_name_always_differs_from_base() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            let stored = StoredName::derive("report.pdf", true);
            assert_ne!(stored.name, "report");
            assert!(stored.name.ends_with("-report"));
            assert_eq!(stored.ext, "pdf");
            assert!(seen.insert(stored.name));
        }
    }

    #[test]
    fn test_public_url() {
        assert_eq!(public_url("uploads", "a.txt"), "uploads/a.txt");
        assert_eq!(public_url("static/files/", "a.txt"), "static/files/a.txt");
        assert_eq!(public_url("", "a.txt"), "a.txt");
    }

    #[tokio::test]
    async fn test_process_part_accepts_file_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let part = UploadedPart::new("A.TXT", "file", spooled(dir.path(), b"12345"));

        let processed = process_part(part, &options(false, Some(5)), dir.path(), "uploads")
            .await
            .unwrap();

        let Processed::Accepted(file) = processed else {
            panic!("expected file to be accepted");
        };
        assert_eq!(file.original_name, "A.TXT");
        assert_eq!(file.file_name, "A.txt");
        assert_eq!(file.ext, "txt");
        assert_eq!(file.url, "uploads/A.txt");
        assert_eq!(file.path, dir.path().join("A.txt"));
        assert!((file.size - 5.0 / 1_048_576.0).abs() < f64::EPSILON);
        assert!(!file.temp_path.exists());
        assert_eq!(std::fs::read(&file.path).unwrap(), b"12345");
    }

    #[tokio::test]
    async fn test_process_part_rejects_file_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let temp = spooled(dir.path(), b"123456");
        let temp_file = temp.to_path_buf();
        let part = UploadedPart::new("big.txt", "file", temp);

        let processed = process_part(part, &options(false, Some(5)), dir.path(), "uploads")
            .await
            .unwrap();

        let Processed::Rejected(error) = processed else {
            panic!("expected file to be rejected");
        };
        assert_eq!(error.file, "big.txt");
        assert_eq!(error.code, "FILE_TOO_LARGE");
        assert!(!dir.path().join("big.txt").exists());
        assert!(!temp_file.exists());
    }

    #[tokio::test]
    async fn test_process_part_missing_temp_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let temp = spooled(dir.path(), b"x");
        std::fs::remove_file(&temp).unwrap();
        let part = UploadedPart::new("gone.txt", "file", temp);

        let result = process_part(part, &options(false, None), dir.path(), "uploads").await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_move_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("taken.txt");
        std::fs::write(&dest, b"original").unwrap();

        let temp = spooled(dir.path(), b"replacement");
        let result = move_into_place(temp, &dest).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_moves_store_exactly_one_file() {
        const WRITERS: usize = 8;

        for round in 0..50 {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("same.txt");
            let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(WRITERS));

            let mut handles = Vec::new();
            for writer in 0..WRITERS {
                let temp = spooled(dir.path(), format!("writer-{}", writer).as_bytes());
                let dest = dest.clone();
                let barrier = barrier.clone();
                handles.push(tokio::spawn(async move {
                    barrier.wait().await;
                    (writer, move_into_place(temp, &dest).await)
                }));
            }

            let mut winners = Vec::new();
            for handle in handles {
                match handle.await.unwrap() {
                    (writer, Ok(())) => winners.push(writer),
                    (_, Err(AppError::Conflict(_))) => {}
                    (_, Err(e)) => panic!("unexpected error: {}", e),
                }
            }

            assert_eq!(winners.len(), 1, "round {}", round);
            let stored = std::fs::read_to_string(&dest).unwrap();
            assert_eq!(stored, format!("writer-{}", winners[0]));
            // Only the stored file is left, every spooled file is gone
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        }
    }

    #[tokio::test]
    async fn test_exclusive_copy_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("taken.txt");
        std::fs::write(&dest, b"original").unwrap();
        let src = dir.path().join("incoming.txt");
        std::fs::write(&src, b"replacement").unwrap();

        let result = copy_exclusive(&src, &dest).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("partial.txt");
        // Opening a directory succeeds on Unix but reading it fails
        let src = dir.path().join("not-a-file");
        std::fs::create_dir(&src).unwrap();

        let result = copy_exclusive(&src, &dest).await;

        assert!(matches!(result, Err(AppError::Io(_))));
        assert!(!dest.exists());
    }
}
