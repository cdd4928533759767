pub mod chunker;
mod images;
mod pdf;

use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

pub use images::{decode_base64_image, encode_png_base64, extract_image_b64, image_data_uri, strip_embedded_images};
pub use pdf::{to_markdown_pages, MarkdownPage};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("Image decoding failed: {0}")]
    Image(String),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A processed page: markdown text plus the images that were embedded in it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// 1-based page number.
    pub page_number: usize,
    /// Page markdown with embedded image data URIs removed.
    pub content: String,
    /// Base64 payloads of the page's images, in order of appearance.
    pub images: Vec<String>,
}

/// Result of extracting a PDF.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename.
    pub filename: String,
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// Total character count across all pages.
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.content.chars().count()).sum()
    }

    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }
}

/// True when the bytes carry the `%PDF-` header.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

/// Extract a PDF upload. The filename must end in `.pdf` or the bytes must
/// carry a PDF header.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let ext = filename.rsplit_once('.').map(|(_, e)| e.to_lowercase()).unwrap_or_default();
    if ext != "pdf" && !looks_like_pdf(bytes) {
        let shown = if ext.is_empty() { "(none)".to_string() } else { ext };
        return Err(ExtractionError::UnsupportedType(shown));
    }

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        pages: extract_pdf_content(bytes)?,
    })
}

/// Convert a PDF to markdown page chunks and process every page on the
/// rayon pool. Output keeps page order.
pub fn extract_pdf_content(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let pages = to_markdown_pages(bytes)?;
    let processed: Vec<PageContent> = pages.par_iter().map(process_page).collect();
    info!("Extracted content from PDF file. {} pages", processed.len());
    Ok(processed)
}

/// Split one markdown page into its text and its embedded image payloads.
pub fn process_page(page: &MarkdownPage) -> PageContent {
    PageContent {
        page_number: page.page_number,
        content: strip_embedded_images(&page.markdown),
        images: extract_image_b64(&page.markdown),
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_pdf {
    //! Builds small PDFs in memory for extraction and pipeline tests.

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, ObjectId, Stream};

    /// One entry per page: the page's text and whether a 2x2 RGB image is attached.
    pub fn build_pdf(pages: &[(&str, bool)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids: Vec<Object> = Vec::new();
        for (text, with_image) in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ];
            let mut resources = dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            };
            if *with_image {
                let image_id = add_rgb_image(&mut doc);
                resources.set("XObject", dictionary! { "Im1" => image_id });
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![100.into(), 0.into(), 0.into(), 100.into(), 72.into(), 400.into()],
                ));
                operations.push(Operation::new("Do", vec!["Im1".into()]));
                operations.push(Operation::new("Q", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn add_rgb_image(doc: &mut Document) -> ObjectId {
        // red, green, blue, white
        let pixels: Vec<u8> = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            pixels,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_page_separates_text_and_images() {
        let page = MarkdownPage {
            page_number: 4,
            markdown: "Intro text.\n\n![image](data:image/png;base64,QUJD)\n\nMore text.".to_string(),
        };
        let processed = process_page(&page);
        assert_eq!(processed.page_number, 4);
        assert_eq!(processed.images, vec!["QUJD".to_string()]);
        assert!(processed.content.contains("Intro text."));
        assert!(processed.content.contains("More text."));
        assert!(!processed.content.contains("base64"));
    }

    #[test]
    fn rejects_non_pdf_upload() {
        let err = extract_text(b"just some notes", "notes.txt").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedType(ref t) if t == "txt"));
    }

    #[test]
    fn pdf_extension_with_garbage_bytes_fails_in_parser() {
        let err = extract_text(b"not really a pdf", "report.pdf").unwrap_err();
        assert!(matches!(err, ExtractionError::PdfError(_)));
    }

    #[test]
    fn pdf_header_detected_without_extension() {
        assert!(looks_like_pdf(b"%PDF-1.7\n%..."));
        assert!(!looks_like_pdf(b"PK\x03\x04"));
    }

    #[test]
    fn extracts_pages_in_order_with_images() {
        let bytes = test_pdf::build_pdf(&[("Alpha page", false), ("Bravo page", true), ("Charlie page", false)]);
        let doc = extract_text(&bytes, "upload").unwrap();

        assert_eq!(doc.pages.len(), 3);
        let numbers: Vec<usize> = doc.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(doc.pages[0].content.contains("Alpha"));
        assert!(doc.pages[1].content.contains("Bravo"));
        assert!(doc.pages[2].content.contains("Charlie"));
        assert!(doc.pages[0].images.is_empty());
        assert_eq!(doc.pages[1].images.len(), 1);
        assert_eq!(doc.image_count(), 1);

        let rgb = decode_base64_image(&doc.pages[1].images[0]).unwrap();
        assert_eq!(rgb.dimensions(), (2, 2));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn total_chars_counts_every_page() {
        let doc = ExtractedDocument {
            filename: "x.pdf".into(),
            pages: vec![
                PageContent { page_number: 1, content: "one".into(), images: vec![] },
                PageContent { page_number: 2, content: "two".into(), images: vec![] },
            ],
        };
        assert_eq!(doc.total_chars(), 6);
    }
}
