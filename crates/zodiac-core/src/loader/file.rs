//! `file://` loader.
//!
//! A missing file yields a placeholder document instead of an error so
//! the caller's normal rendering path shows it. Every other filesystem
//! failure is returned as [`ZodiacError::Filesystem`].

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::cancel::CancelToken;
use crate::error::{Result, ZodiacError};
use crate::gemini::GEMINI_MIME;
use crate::url::Url;

use super::{FetchResult, Loader};

/// Reads local files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }

    /// Map a `file` URL to a filesystem path.
    ///
    /// `file:///a/b` and `file://localhost/a/b` are absolute. Any other
    /// host is taken as the first component of a relative path, so
    /// `file://docs/index.gmi` reads `docs/index.gmi`.
    pub fn path_for(url: &Url) -> PathBuf {
        if url.host.is_empty() || url.host.eq_ignore_ascii_case("localhost") {
            PathBuf::from(&url.path)
        } else {
            PathBuf::from(format!("{}{}", url.host, url.path))
        }
    }

    pub fn load(&self, url: &Url) -> Result<FetchResult> {
        let path = Self::path_for(url);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("file not found: {}", path.display());
                return Ok(not_found_page(&path));
            },
            Err(source) => return Err(ZodiacError::Filesystem { path, source }),
        };

        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        Ok(FetchResult {
            mimetype: mime_for_extension(url.extension()).to_string(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

impl Loader for FileLoader {
    fn scheme(&self) -> &str {
        "file"
    }

    fn fetch(&self, url: &Url, cancel: &CancelToken) -> Result<FetchResult> {
        if cancel.is_cancelled() {
            return Err(ZodiacError::Cancelled);
        }
        self.load(url)
    }
}

/// MIME type from a file extension; empty when unknown.
fn mime_for_extension(ext: Option<&str>) -> &'static str {
    match ext.map(str::to_ascii_lowercase).as_deref() {
        Some("gmi" | "gemini") => GEMINI_MIME,
        Some("txt") => "text/plain",
        Some("md" | "markdown") => "text/markdown",
        Some("html" | "htm") => "text/html",
        _ => "",
    }
}

/// Placeholder document naming the missing path.
fn not_found_page(path: &std::path::Path) -> FetchResult {
    let content = format!(
        "# Error\n\nCould not find file:\n\n```\n{}\n```\n",
        path.display()
    );
    FetchResult::new(GEMINI_MIME, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(url: &str) -> Result<FetchResult> {
        FileLoader::new().fetch(&Url::parse(url).unwrap(), &CancelToken::new())
    }

    #[test]
    fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.gmi");
        std::fs::write(&path, "# Home\n=> gemini://example.com/ Example\n").unwrap();

        let result = load(&format!("file://{}", path.display())).unwrap();
        assert_eq!(result.mimetype, "text/gemini");
        assert_eq!(result.content, "# Home\n=> gemini://example.com/ Example\n");
    }

    #[test]
    fn unknown_extension_leaves_mimetype_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xyz");
        std::fs::write(&path, "notes").unwrap();

        let result = load(&format!("file://{}", path.display())).unwrap();
        assert_eq!(result.mimetype, "");
        assert_eq!(result.content, "notes");
    }

    #[test]
    fn missing_file_is_placeholder_not_error() {
        let result = load("file:///no/such/path").unwrap();
        assert_eq!(result.mimetype, "text/gemini");
        assert!(result.content.starts_with("# Error"));
        assert!(result.content.contains("Could not find file"));
        assert!(result.content.contains("/no/such/path"));
    }

    #[test]
    fn directory_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&format!("file://{}", dir.path().display())).unwrap_err();
        assert!(matches!(err, ZodiacError::Filesystem { .. }));
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.txt");
        std::fs::write(&path, b"ok \xff end").unwrap();

        let result = load(&format!("file://{}", path.display())).unwrap();
        assert_eq!(result.content, "ok \u{fffd} end");
    }

    #[test]
    fn cancelled_fetch_does_not_read() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let url = Url::parse("file:///no/such/path").unwrap();
        let err = FileLoader::new().fetch(&url, &cancel).unwrap_err();
        assert!(matches!(err, ZodiacError::Cancelled));
    }

    #[test]
    fn path_mapping() {
        let abs = Url::parse("file:///etc/hosts").unwrap();
        assert_eq!(FileLoader::path_for(&abs), PathBuf::from("/etc/hosts"));
        let local = Url::parse("file://localhost/etc/hosts").unwrap();
        assert_eq!(FileLoader::path_for(&local), PathBuf::from("/etc/hosts"));
        let relative = Url::parse("file://docs/index.gmi").unwrap();
        assert_eq!(FileLoader::path_for(&relative), PathBuf::from("docs/index.gmi"));
    }
}
