use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, ObjectId};
use tracing::{debug, warn};

use super::images::{encode_png_base64, image_data_uri};
use super::ExtractionError;

/// One PDF page rendered as markdown, images inlined as data URIs.
#[derive(Debug, Clone)]
pub struct MarkdownPage {
    /// 1-based page number.
    pub page_number: usize,
    pub markdown: String,
}

/// Convert a PDF into per-page markdown.
pub fn to_markdown_pages(bytes: &[u8]) -> Result<Vec<MarkdownPage>, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::PdfError(e.to_string()))?;
    let page_ids = doc.get_pages();
    if page_ids.is_empty() {
        return Err(ExtractionError::PdfError("document has no pages".to_string()));
    }

    let (texts, source) = page_texts(bytes, &doc, &page_ids);
    debug!("{} pages, text via {:?}", page_ids.len(), source);

    let pages = page_ids
        .iter()
        .map(|(&number, &page_id)| {
            let mut markdown = texts.get(&number).cloned().unwrap_or_default();
            for png in page_images(&doc, page_id, number) {
                if !markdown.is_empty() {
                    markdown.push_str("\n\n");
                }
                markdown.push_str(&image_data_uri(&png));
            }
            MarkdownPage {
                page_number: number as usize,
                markdown,
            }
        })
        .collect();

    Ok(pages)
}

/// Which extractor produced the page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextSource {
    PdfExtract,
    Lopdf,
}

/// Per-page text keyed by page number.
///
/// pdf-extract gives the better reading order. Its pages are used only when
/// they carry text and line up one to one with the page tree; otherwise
/// lopdf extracts each page.
pub(crate) fn page_texts(
    bytes: &[u8],
    doc: &Document,
    page_ids: &BTreeMap<u32, ObjectId>,
) -> (BTreeMap<u32, String>, TextSource) {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    let extracted = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem_by_pages(bytes)));
    let pages = match extracted {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            warn!("pdf-extract failed ({e}), using lopdf text extraction");
            Vec::new()
        }
        Err(_) => {
            warn!("pdf-extract panicked, using lopdf text extraction");
            Vec::new()
        }
    };

    let has_text = pages.iter().any(|p| !p.trim().is_empty());
    if has_text && pages.len() == page_ids.len() {
        let texts = page_ids
            .keys()
            .zip(pages)
            .map(|(&number, text)| (number, text.trim().to_string()))
            .collect();
        return (texts, TextSource::PdfExtract);
    }
    if has_text {
        debug!(
            "pdf-extract returned {} pages for a {}-page document, using lopdf text extraction",
            pages.len(),
            page_ids.len()
        );
    }

    let texts = page_ids
        .keys()
        .map(|&number| {
            let text = doc.extract_text(&[number]).unwrap_or_default();
            (number, text.trim().to_string())
        })
        .collect();
    (texts, TextSource::Lopdf)
}

/// The parts of an image XObject needed to rebuild a bitmap.
struct XObjectImage<'a> {
    id: ObjectId,
    width: i64,
    height: i64,
    color_space: Option<&'a str>,
    bits_per_component: Option<i64>,
    filters: &'a [String],
    content: &'a [u8],
}

/// PNG payloads (base64) of the images placed on a page.
fn page_images(doc: &Document, page_id: ObjectId, page_number: u32) -> Vec<String> {
    let images = match doc.get_page_images(page_id) {
        Ok(images) => images,
        Err(e) => {
            debug!("page {page_number}: no image resources ({e})");
            return Vec::new();
        }
    };

    images
        .iter()
        .filter_map(|img| {
            let xobject = XObjectImage {
                id: img.id,
                width: img.width,
                height: img.height,
                color_space: img.color_space.as_deref(),
                bits_per_component: img.bits_per_component,
                filters: img.filters.as_deref().unwrap_or_default(),
                content: img.content,
            };
            match decode_xobject(doc, &xobject).and_then(|decoded| encode_png_base64(&decoded)) {
                Ok(png) => Some(png),
                Err(e) => {
                    warn!("page {page_number}: skipping image {:?}: {e}", img.id);
                    None
                }
            }
        })
        .collect()
}

fn decode_xobject(doc: &Document, img: &XObjectImage<'_>) -> Result<DynamicImage, ExtractionError> {
    let filters = img.filters;

    if filters.iter().any(|f| f == "DCTDecode") {
        return image::load_from_memory_with_format(img.content, ImageFormat::Jpeg)
            .map_err(|e| ExtractionError::Image(e.to_string()));
    }

    if !filters.iter().all(|f| f == "FlateDecode") {
        return Err(ExtractionError::Image(format!("unsupported filter chain {filters:?}")));
    }

    let raw = if filters.is_empty() {
        img.content.to_vec()
    } else {
        doc.get_object(img.id)
            .and_then(|obj| obj.as_stream())
            .and_then(|stream| stream.decompressed_content())
            .map_err(|e| ExtractionError::Image(e.to_string()))?
    };

    let width = u32::try_from(img.width).map_err(|_| ExtractionError::Image(format!("bad width {}", img.width)))?;
    let height = u32::try_from(img.height).map_err(|_| ExtractionError::Image(format!("bad height {}", img.height)))?;

    match (img.color_space, img.bits_per_component) {
        (Some("DeviceRGB"), Some(8)) => RgbImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| ExtractionError::Image("RGB sample data shorter than width*height*3".to_string())),
        (Some("DeviceGray"), Some(8)) => GrayImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| ExtractionError::Image("gray sample data shorter than width*height".to_string())),
        (space, bits) => Err(ExtractionError::Image(format!(
            "unsupported color space {space:?} at {bits:?} bits per component"
        ))),
    }
}
