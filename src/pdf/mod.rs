//! PDF toolchain (C4): MIME sniffing, structural repair, page-range
//! slicing, OCR (isolated child process), and per-page text extraction.

pub mod ocr;

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

pub use ocr::{run_ocr, OcrConfig};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to read file for MIME sniffing: {0}")]
    Sniff(#[from] std::io::Error),
    #[error("failed to parse PDF structure: {0}")]
    Parse(String),
    #[error("failed to save PDF: {0}")]
    Save(String),
    #[error("Ghostscript repair failed: {0}")]
    Repair(String),
    #[error("Ghostscript repair timed out")]
    RepairTimeout,
    #[error("OCR process failed: {0}")]
    Ocr(String),
    #[error("OCR process timed out")]
    OcrTimeout,
}

const REPAIR_TIMEOUT: Duration = Duration::from_secs(120);

/// Content-sniff a file's MIME type. Never trusted from the uploaded file
/// name or a client-supplied header, per SPEC_FULL 4.2 step 3.
pub fn sniff_mime(path: &Path) -> Result<String, PdfError> {
    let kind = infer::get_from_path(path)?;
    Ok(kind
        .map(|k| k.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string()))
}

/// Total page count of a PDF on disk.
pub fn page_count(path: &Path) -> Result<u32, PdfError> {
    let doc = lopdf::Document::load(path).map_err(|e| PdfError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Rewrite the PDF through Ghostscript. This is the only step that can
/// recover a damaged-but-openable PDF (SPEC_FULL 4.2 step 5): `pdfwrite`
/// rebuilds the object table and content streams from whatever it could
/// parse, which a pure in-process round-trip cannot do for most real-world
/// corruption.
pub async fn repair(input: &Path, output: &Path) -> Result<(), PdfError> {
    let mut command = Command::new("gs");
    command
        .arg("-dSAFER")
        .arg("-dNOPAUSE")
        .arg("-dBATCH")
        .arg("-sDEVICE=pdfwrite")
        .arg("-o")
        .arg(output)
        .arg(input)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = command.spawn().map_err(|e| PdfError::Repair(e.to_string()))?;

    let output_result = tokio::time::timeout(REPAIR_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| PdfError::RepairTimeout)?
        .map_err(|e| PdfError::Repair(e.to_string()))?;

    if !output_result.status.success() {
        return Err(PdfError::Repair(format!(
            "gs exited with {}: {}",
            output_result.status,
            String::from_utf8_lossy(&output_result.stderr)
        )));
    }

    Ok(())
}

/// Slice the PDF in place to the half-open window `[from_page, to_page)`
/// (1-indexed page numbers internally to match lopdf's numbering).
/// Deletion proceeds in descending order so earlier deletions never shift
/// the index of a page still queued for removal.
pub fn slice(input: &Path, output: &Path, from_page: u32, to_page: u32) -> Result<(), PdfError> {
    let mut doc = lopdf::Document::load(input).map_err(|e| PdfError::Parse(e.to_string()))?;
    let total = doc.get_pages().len() as u32;

    let mut to_delete: Vec<u32> = (1..=total)
        .filter(|&p| p <= from_page || p > to_page)
        .collect();
    to_delete.sort_unstable_by(|a, b| b.cmp(a));

    doc.delete_pages(&to_delete);
    doc.save(output).map_err(|e| PdfError::Save(e.to_string()))?;
    Ok(())
}

/// Extract text per page, in reading order, from the final optimized PDF.
/// NUL bytes are stripped from every page's text (SPEC_FULL 4.2 step 10).
pub fn extract_text_per_page(path: &Path) -> Result<Vec<String>, PdfError> {
    let doc = lopdf::Document::load(path).map_err(|e| PdfError::Parse(e.to_string()))?;
    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    Ok(page_numbers
        .into_iter()
        .map(|page| {
            doc.extract_text(&[page])
                .unwrap_or_default()
                .replace('\0', "")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    fn minimal_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! { "Font" => dictionary! { "F1" => font_id } });

        let mut page_ids = Vec::new();
        for i in 0..page_count {
            let content = Stream::new(
                dictionary! {},
                format!("BT /F1 12 Tf 100 700 Td (page {i}) Tj ET").into_bytes(),
            );
            let content_id = doc.add_object(content);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count as i64),
        });
        for page_id in &page_ids {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
                dict.set("Parent", pages_id);
            }
        }
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn page_count_matches_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.pdf");
        std::fs::write(&path, minimal_pdf(3)).unwrap();
        assert_eq!(page_count(&path).unwrap(), 3);
    }

    #[test]
    fn slice_keeps_only_requested_window() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");
        std::fs::write(&input, minimal_pdf(5)).unwrap();

        slice(&input, &output, 1, 3).unwrap();
        assert_eq!(page_count(&output).unwrap(), 2);
    }

    #[test]
    fn extract_text_returns_one_entry_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.pdf");
        std::fs::write(&path, minimal_pdf(2)).unwrap();

        let pages = extract_text_per_page(&path).unwrap();
        assert_eq!(pages.len(), 2);
    }
}
