use crate::utils::error::{LoanError, Result};
use std::path::Path;

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "eml"];

/// Drops every non-ASCII character.
pub fn clean_text(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// Reads an application letter and returns its ASCII-cleaned text.
pub async fn read_document_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        if !TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return Err(LoanError::DocumentError {
                message: format!(
                    "unsupported document format '.{}' (expected one of: {})",
                    ext,
                    TEXT_EXTENSIONS.join(", ")
                ),
            });
        }
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| LoanError::DocumentError {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;

    let text = String::from_utf8_lossy(&bytes);
    let cleaned = clean_text(&text);
    if cleaned.trim().is_empty() {
        return Err(LoanError::DocumentError {
            message: format!("no text could be extracted from {}", path.display()),
        });
    }

    tracing::debug!("📄 Read {} characters from {}", cleaned.len(), path.display());
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_non_ascii() {
        assert_eq!(clean_text("Prêt immobilier – 120m²"), "Prt immobilier  120m");
        assert_eq!(clean_text("plain"), "plain");
    }

    #[tokio::test]
    async fn test_read_document_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.txt");
        std::fs::write(&path, "Je suis Alice, client-002. Surface: 100m²").unwrap();

        let text = read_document_text(&path).await.unwrap();
        assert_eq!(text, "Je suis Alice, client-002. Surface: 100m");
    }

    #[tokio::test]
    async fn test_read_document_rejects_bad_inputs() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "ééé").unwrap();
        assert!(matches!(
            read_document_text(&empty).await,
            Err(LoanError::DocumentError { .. })
        ));

        let pdf = dir.path().join("letter.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        assert!(read_document_text(&pdf).await.is_err());

        assert!(read_document_text(dir.path().join("missing.txt")).await.is_err());
    }
}
