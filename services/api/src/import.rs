//! services/api/src/import.rs
//!
//! Turns uploaded files and pasted links into `SourceItem`s. Plain text and
//! markdown are read as UTF-8, PDFs go through `pdf-extract`; anything else is
//! rejected before the source library is touched.

use bytes::Bytes;
use study_assistant_core::domain::{SourceItem, SourceType};
use study_assistant_core::{StudyError, StudyResult};
use tracing::info;
use uuid::Uuid;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Resolves the effective content type: the declared one unless it is missing
/// or generic, in which case the file extension decides.
fn effective_content_type(file_name: &str, declared: Option<&str>) -> String {
    let declared = declared
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");
    if let Some(ct) = declared {
        return ct;
    }
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => MIME_PDF,
        "txt" => MIME_TEXT,
        "md" | "markdown" => MIME_MARKDOWN,
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Runs [`import_document`] on the blocking pool, since PDF extraction is
/// CPU-bound. A document that crashes the extractor counts as unreadable.
pub async fn import_upload(
    file_name: String,
    content_type: Option<String>,
    bytes: Bytes,
) -> StudyResult<SourceItem> {
    let name = file_name.clone();
    tokio::task::spawn_blocking(move || {
        import_document(&file_name, content_type.as_deref(), &bytes)
    })
    .await
    .map_err(|e| StudyError::UnsupportedInput(format!("could not read '{}': {}", name, e)))?
}

/// Extracts the text of an uploaded document and wraps it in a selected source.
pub fn import_document(
    file_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> StudyResult<SourceItem> {
    let content_type = effective_content_type(file_name, content_type);
    let (source_type, text) = match content_type.as_str() {
        MIME_PDF => {
            let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                StudyError::UnsupportedInput(format!("could not read PDF '{}': {}", file_name, e))
            })?;
            (SourceType::Pdf, text)
        }
        MIME_TEXT | MIME_MARKDOWN => {
            let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                StudyError::UnsupportedInput(format!("'{}' is not valid UTF-8 text", file_name))
            })?;
            (SourceType::Website, text)
        }
        other => {
            return Err(StudyError::UnsupportedInput(format!(
                "'{}' has an unsupported file type ({})",
                file_name, other
            )))
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(StudyError::UnsupportedInput(format!(
            "'{}' contains no readable text",
            file_name
        )));
    }

    info!(
        "Imported '{}' as {:?} ({} chars)",
        file_name,
        source_type,
        text.chars().count()
    );
    Ok(SourceItem {
        id: Uuid::new_v4(),
        source_type,
        title: file_name.to_string(),
        url: None,
        metadata: format!("{} · {} bytes", content_type, bytes.len()),
        is_selected: true,
        content: Some(text),
    })
}

/// Registers a link source. YouTube links are recognised by host; everything
/// else over http(s) is a website. Links carry no extracted content.
pub fn import_link(url: &str, title: Option<&str>) -> StudyResult<SourceItem> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| StudyError::UnsupportedInput(format!("'{}' is not an http(s) link", url)))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    if host.is_empty() {
        return Err(StudyError::Validation("the link has no host".to_string()));
    }

    let source_type = if host == "youtu.be" || host.ends_with("youtube.com") {
        SourceType::Youtube
    } else {
        SourceType::Website
    };
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| host.clone());

    Ok(SourceItem {
        id: Uuid::new_v4(),
        source_type,
        title,
        url: Some(url.to_string()),
        metadata: host,
        is_selected: true,
        content: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uploads_are_imported_off_the_async_thread() {
        let item = import_upload(
            "notes.txt".to_string(),
            Some("text/plain".to_string()),
            Bytes::from_static(b"Mitochondria make ATP."),
        )
        .await
        .unwrap();
        assert_eq!(item.content.as_deref(), Some("Mitochondria make ATP."));

        let err = import_upload(
            "broken.pdf".to_string(),
            Some("application/pdf".to_string()),
            Bytes::from_static(b"%PDF-1.4 not really"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StudyError::UnsupportedInput(_)));
    }

    #[test]
    fn markdown_is_imported_as_text() {
        let item = import_document("notes.md", None, b"# Cells\nThe unit of life.").unwrap();
        assert_eq!(item.title, "notes.md");
        assert!(item.is_selected);
        assert_eq!(item.content.as_deref(), Some("# Cells\nThe unit of life."));
    }

    #[test]
    fn unsupported_types_are_rejected() {
        let err = import_document("photo.png", Some("image/png"), &[0x89, 0x50]).unwrap_err();
        assert!(matches!(err, StudyError::UnsupportedInput(_)));

        let err = import_document("data.bin", None, b"\x00\x01").unwrap_err();
        assert!(matches!(err, StudyError::UnsupportedInput(_)));
    }

    #[test]
    fn invalid_utf8_and_empty_files_are_rejected() {
        assert!(import_document("a.txt", Some("text/plain; charset=utf-8"), &[0xff, 0xfe]).is_err());
        assert!(import_document("a.txt", None, b"   \n").is_err());
    }

    #[test]
    fn links_are_typed_by_host() {
        let video = import_link("https://www.youtube.com/watch?v=abc", None).unwrap();
        assert_eq!(video.source_type, SourceType::Youtube);
        assert_eq!(video.title, "www.youtube.com");

        let page = import_link("http://example.org/tides", Some("Tides")).unwrap();
        assert_eq!(page.source_type, SourceType::Website);
        assert_eq!(page.title, "Tides");
        assert!(page.content.is_none());

        assert!(import_link("ftp://example.org", None).is_err());
    }
}
