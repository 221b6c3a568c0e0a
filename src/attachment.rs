use crate::conversation::{FileKind, FileMeta};
use crate::error::InputError;
use std::fmt;
use std::fs;
use std::path::Path;

/// A document picked for the next request. The bytes live only until the request is sent.
#[derive(Clone)]
pub struct Attachment {
    pub meta: FileMeta,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("meta", &self.meta)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    /// Read and classify a document from disk
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| InputError::UnsupportedFile(path.display().to_string()))?;

        // Reject on extension before touching the file
        classify(&filename, None).ok_or_else(|| InputError::UnsupportedFile(filename.clone()))?;

        let bytes = fs::read(path).map_err(|err| InputError::Unreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        Self::from_bytes(filename, None, bytes)
    }

    pub fn from_bytes(
        filename: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, InputError> {
        let filename = filename.into();
        let kind = classify(&filename, mime)
            .ok_or_else(|| InputError::UnsupportedFile(filename.clone()))?;

        Ok(Self {
            meta: FileMeta {
                filename,
                size: bytes.len() as u64,
                kind,
            },
            bytes,
        })
    }
}

/// Accept a document when either its MIME type or its extension is known
pub fn classify(filename: &str, mime: Option<&str>) -> Option<FileKind> {
    mime.and_then(FileKind::from_mime).or_else(|| {
        let (_, extension) = filename.rsplit_once('.')?;
        FileKind::from_extension(extension)
    })
}

/// Human-readable size, base 1024, at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1234567), "1.18 MB");
    }

    #[test]
    fn classify_prefers_mime_then_extension() {
        assert_eq!(classify("report.bin", Some("application/pdf")), Some(FileKind::Pdf));
        assert_eq!(classify("Notes.TXT", None), Some(FileKind::Txt));
        assert_eq!(classify("archive.zip", Some("application/zip")), None);
        assert_eq!(classify("no_extension", None), None);
    }

    #[test]
    fn from_path_reads_supported_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brief.txt");
        fs::write(&path, "hello world").unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.meta.filename, "brief.txt");
        assert_eq!(attachment.meta.size, 11);
        assert_eq!(attachment.meta.kind, FileKind::Txt);
        assert_eq!(attachment.bytes, b"hello world");
    }

    #[test]
    fn from_path_rejects_unsupported_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("photo.png");
        fs::write(&image, [0u8; 4]).unwrap();

        assert_eq!(
            Attachment::from_path(&image).unwrap_err(),
            InputError::UnsupportedFile("photo.png".to_string())
        );

        let missing = dir.path().join("missing.pdf");
        assert!(matches!(
            Attachment::from_path(&missing),
            Err(InputError::Unreadable { .. })
        ));
    }
}
