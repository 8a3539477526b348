//! Input resolution: turn a path, URL, or byte buffer into a local PDF file.
//!
//! pdfium opens documents by path, so every input ends up on disk. Downloads
//! and in-memory buffers go to temporary storage owned by [`ResolvedInput`];
//! dropping it removes the file. The `%PDF` magic is checked up front so a
//! mis-uploaded image or spreadsheet fails with [`Pdf2XlsxError::NotAPdf`]
//! instead of an opaque pdfium error.

use crate::error::Pdf2XlsxError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF that pdfium can open by path.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the body lives in `_dir` until drop.
    Downloaded { path: PathBuf, _dir: TempDir },
    /// Input was a byte buffer spilled to a temp file.
    Buffered(NamedTempFile),
}

impl ResolvedInput {
    /// Path to the PDF, regardless of origin.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Buffered(tmp) => tmp.path(),
        }
    }
}

/// `true` for `http://` and `https://` inputs.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to a local PDF.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2XlsxError> {
    if input.trim().is_empty() {
        return Err(Pdf2XlsxError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

/// Spill an in-memory PDF to a temp file.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, Pdf2XlsxError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("pdf2xlsx-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Pdf2XlsxError::Internal(format!("tempfile: {e}")))?;
    check_magic(tmp.path(), bytes)?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| Pdf2XlsxError::Internal(format!("tempfile write: {e}")))?;
    debug!("Buffered {} PDF bytes at {}", bytes.len(), tmp.path().display());
    Ok(ResolvedInput::Buffered(tmp))
}

fn resolve_local(path: &Path) -> Result<ResolvedInput, Pdf2XlsxError> {
    let path = path.to_path_buf();
    if !path.exists() {
        return Err(Pdf2XlsxError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2XlsxError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2XlsxError::FileNotFound { path }),
    };

    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    Read::by_ref(&mut file)
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .map_err(|e| Pdf2XlsxError::Internal(format!("read {}: {e}", path.display())))?;
    check_magic(&path, &head)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Reject buffers that do not start with `%PDF`. Buffers shorter than the
/// magic are left for pdfium to report as corrupt.
fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2XlsxError> {
    if bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2XlsxError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2XlsxError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| Pdf2XlsxError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2XlsxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_failed(e.to_string()))?;

    let dir = TempDir::new().map_err(|e| Pdf2XlsxError::Internal(e.to_string()))?;
    let path = dir.path().join(file_name_from_url(url));
    check_magic(&path, &bytes)?;

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| Pdf2XlsxError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to {}", bytes.len(), path.display());
    Ok(ResolvedInput::Downloaded { path, _dir: dir })
}

/// Last path segment of the URL when it looks like a file name.
fn file_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "download.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/roll.pdf"));
        assert!(is_url("http://example.com/roll.pdf"));
        assert!(!is_url("/tmp/roll.pdf"));
        assert!(!is_url("roll.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn file_name_from_url_falls_back() {
        assert_eq!(file_name_from_url("https://x.org/a/ward-3.pdf"), "ward-3.pdf");
        assert_eq!(file_name_from_url("https://x.org/a/"), "download.pdf");
        assert_eq!(file_name_from_url("https://x.org/download"), "download.pdf");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, Pdf2XlsxError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_file_is_rejected() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"PK\x03\x04 not a pdf").unwrap();
        let err = resolve_local(tmp.path()).unwrap_err();
        match err {
            Pdf2XlsxError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pdf_bytes_are_buffered() {
        let resolved = resolve_bytes(b"%PDF-1.7\n%fake body").unwrap();
        let on_disk = std::fs::read(resolved.path()).unwrap();
        assert!(on_disk.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_input_is_invalid() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt.block_on(resolve_input("   ", 5)).unwrap_err();
        assert!(matches!(err, Pdf2XlsxError::InvalidInput { .. }));
    }
}
