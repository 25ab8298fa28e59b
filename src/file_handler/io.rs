//! File I/O for Markdown sources
//!
//! Provides:
//! - UTF-8 reads that strip a leading byte-order mark
//! - BOM-less atomic writes (temp file + rename)
//! - File size limits

use crate::config::MAX_FILE_SIZE;
use crate::error::{FileError, FileResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// UTF-8 byte-order mark
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Result of reading a file
#[derive(Debug, Clone)]
pub struct FileReadResult {
    /// The file content, BOM removed
    pub content: String,
    /// Whether the file started with a BOM
    pub had_bom: bool,
    /// Original file size in bytes
    pub size_bytes: u64,
}

/// Decode raw bytes as UTF-8, dropping a leading BOM
fn decode_utf8(bytes: Vec<u8>, path: &Path) -> FileResult<(String, bool)> {
    let had_bom = bytes.starts_with(UTF8_BOM);
    let bytes = if had_bom {
        bytes[UTF8_BOM.len()..].to_vec()
    } else {
        bytes
    };
    String::from_utf8(bytes)
        .map(|s| (s, had_bom))
        .map_err(|_| FileError::EncodingError {
            path: path.to_path_buf(),
        })
}

fn check_size(path: &Path, size_bytes: u64, max_size: u64) -> FileResult<()> {
    if size_bytes > max_size {
        return Err(FileError::FileTooLarge {
            path: path.to_path_buf(),
            size: size_bytes,
            max_size,
        });
    }
    Ok(())
}

/// Read a Markdown file
pub async fn read_file(path: impl AsRef<Path>, max_size: u64) -> FileResult<FileReadResult> {
    let path = path.as_ref();
    let path_buf = path.to_path_buf();

    if !path.exists() {
        return Err(FileError::NotFound(path_buf));
    }

    let metadata = tokio::fs::metadata(path).await.map_err(|e| FileError::ReadError {
        path: path_buf.clone(),
        source: e,
    })?;
    let size_bytes = metadata.len();
    check_size(path, size_bytes, max_size)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| FileError::ReadError {
        path: path_buf,
        source: e,
    })?;
    let (content, had_bom) = decode_utf8(bytes, path)?;

    Ok(FileReadResult {
        content,
        had_bom,
        size_bytes,
    })
}

/// Read a Markdown file synchronously, with the default size limit
pub fn read_file_sync(path: impl AsRef<Path>) -> FileResult<FileReadResult> {
    let path = path.as_ref();
    let path_buf = path.to_path_buf();

    if !path.exists() {
        return Err(FileError::NotFound(path_buf));
    }

    let metadata = std::fs::metadata(path).map_err(|e| FileError::ReadError {
        path: path_buf.clone(),
        source: e,
    })?;
    let size_bytes = metadata.len();
    check_size(path, size_bytes, MAX_FILE_SIZE)?;

    let bytes = std::fs::read(path).map_err(|e| FileError::ReadError {
        path: path_buf,
        source: e,
    })?;
    let (content, had_bom) = decode_utf8(bytes, path)?;

    Ok(FileReadResult {
        content,
        had_bom,
        size_bytes,
    })
}

/// Temp file next to `path` used for atomic replacement
fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    parent.join(format!(".{}.{}.tmp", filename, timestamp))
}

/// Write content to a file atomically, UTF-8 without BOM
pub async fn write_file_atomic(path: impl AsRef<Path>, content: &str) -> FileResult<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    let write_result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, content.as_bytes()).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        file.sync_all().await?;
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = write_result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(FileError::WriteError {
            path: path.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

/// Write content to a file atomically (synchronous)
pub fn write_file_atomic_sync(path: impl AsRef<Path>, content: &str) -> FileResult<()> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    let write_result = (|| {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)
    })();

    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(FileError::WriteError {
            path: path.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}
