//! # PDF Serializer
//!
//! Takes the laid-out pages and writes a PDF 1.7 file.
//!
//! We write the raw bytes ourselves. The sheet only needs filled and
//! stroked rectangles, lines, text in the two standard Helvetica faces,
//! one logo image and link annotations, which is a small subset of PDF.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Output is deterministic: fonts are registered in sorted order and no
//! timestamps are written, so the same pages always give the same bytes.

use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::SheetError;
use crate::font::{FontContext, FontKey, FontSpec};
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::layout::{Border, DrawCommand, LayoutElement, LayoutPage};
use crate::style::Color;

/// Underline offset below the baseline, as a fraction of the font size.
const UNDERLINE_OFFSET: f64 = 0.12;
const UNDERLINE_WIDTH: f64 = 0.5;

/// Document Info dictionary entries.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

pub struct PdfWriter;

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Registered fonts in resource order: /F0, /F1, ...
    font_objects: Vec<(FontKey, usize)>,
    /// Image XObject ids per page, in element order.
    page_images: Vec<Vec<usize>>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        metadata: &Metadata,
        font_context: &FontContext,
    ) -> Result<Vec<u8>, SheetError> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            page_images: Vec::new(),
        };

        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(Vec::new());

        self.register_fonts(&mut builder, pages, font_context)?;
        self.register_images(&mut builder, pages);

        let mut page_obj_ids = Vec::with_capacity(pages.len());
        for (page_idx, page) in pages.iter().enumerate() {
            let content = self.build_content_stream(page, page_idx, &builder);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            let content_obj_id = builder.push(content_data);

            let annot_ids: Vec<usize> = self
                .link_annotations(page)
                .into_iter()
                .map(|annot| builder.push(annot.into_bytes()))
                .collect();

            let mut resources = format!(
                "/Font << {} >>",
                self.build_font_resource_dict(&builder.font_objects)
            );
            let xobjects = self.build_xobject_resource_dict(page_idx, &builder);
            if !xobjects.is_empty() {
                let _ = write!(resources, " /XObject << {} >>", xobjects);
            }
            let annots = if annot_ids.is_empty() {
                String::new()
            } else {
                format!(
                    " /Annots [{}]",
                    annot_ids
                        .iter()
                        .map(|id| format!("{} 0 R", id))
                        .collect::<Vec<_>>()
                        .join(" ")
                )
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >>{} >>",
                page.width, page.height, content_obj_id, resources, annots
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", Self::encode_text(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author ({}) ", Self::encode_text(author));
        }
        info.push_str("/Producer (rank-sheet) >>");
        let info_obj_id = builder.push(info.into_bytes());

        Ok(self.serialize(&builder, info_obj_id))
    }

    fn build_content_stream(&self, page: &LayoutPage, page_idx: usize, builder: &PdfBuilder) -> String {
        let mut stream = String::new();
        let mut image_counter = 0;
        for element in &page.elements {
            self.write_element(
                &mut stream,
                element,
                page.height,
                builder,
                page_idx,
                &mut image_counter,
            );
        }
        stream
    }

    /// Write a single layout element as PDF operators.
    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        builder: &PdfBuilder,
        page_idx: usize,
        image_counter: &mut usize,
    ) {
        match &element.draw {
            DrawCommand::Rect { background, border } => {
                let x = element.x;
                let y = page_height - element.y - element.height;
                let (w, h) = (element.width, element.height);

                if let Some(bg) = background {
                    let _ = write!(
                        stream,
                        "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                        bg.r, bg.g, bg.b, x, y, w, h
                    );
                }
                if let Some(Border { color, width }) = border {
                    if *width > 0.0 {
                        let _ = write!(
                            stream,
                            "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                            color.r, color.g, color.b, width, x, y, w, h
                        );
                    }
                }
            }

            DrawCommand::Text {
                text,
                font,
                color,
                underline,
                ..
            } => {
                let baseline = page_height - element.y;
                let _ = write!(
                    stream,
                    "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
                    color.r,
                    color.g,
                    color.b,
                    self.font_index(font, &builder.font_objects),
                    font.size,
                    element.x,
                    baseline,
                    Self::encode_text(text)
                );
                if *underline {
                    let y = baseline - font.size * UNDERLINE_OFFSET;
                    self.write_line(
                        stream,
                        *color,
                        UNDERLINE_WIDTH,
                        (element.x, y),
                        (element.x + element.width, y),
                    );
                }
            }

            DrawCommand::Line { color, width } => {
                self.write_line(
                    stream,
                    *color,
                    *width,
                    (element.x, page_height - element.y),
                    (
                        element.x + element.width,
                        page_height - element.y - element.height,
                    ),
                );
            }

            DrawCommand::Image { .. } => {
                let index = *image_counter;
                *image_counter += 1;
                let x = element.x;
                let y = page_height - element.y - element.height;
                if builder
                    .page_images
                    .get(page_idx)
                    .is_some_and(|ids| index < ids.len())
                {
                    let _ = write!(
                        stream,
                        "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                        element.width, element.height, x, y, index
                    );
                }
            }
        }
    }

    fn write_line(
        &self,
        stream: &mut String,
        color: Color,
        width: f64,
        (x1, y1): (f64, f64),
        (x2, y2): (f64, f64),
    ) {
        let _ = write!(
            stream,
            "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
            color.r, color.g, color.b, width, x1, y1, x2, y2
        );
    }

    /// Link annotation dictionaries for every text run with an href.
    fn link_annotations(&self, page: &LayoutPage) -> Vec<String> {
        page.elements
            .iter()
            .filter_map(|element| match &element.draw {
                DrawCommand::Text {
                    href: Some(href),
                    font,
                    ..
                } => {
                    let baseline = page.height - element.y;
                    Some(format!(
                        "<< /Type /Annot /Subtype /Link /Rect [{:.2} {:.2} {:.2} {:.2}] \
                         /Border [0 0 0] /A << /Type /Action /S /URI /URI ({}) >> >>",
                        element.x,
                        baseline - font.size * 0.25,
                        element.x + element.width,
                        baseline + font.size * 0.85,
                        Self::escape_pdf_string(href)
                    ))
                }
                _ => None,
            })
            .collect()
    }

    /// Register every font used across all pages. Standard fonts need no
    /// embedding, only a Type1 font dictionary.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[LayoutPage],
        font_context: &FontContext,
    ) -> Result<(), SheetError> {
        let mut keys: Vec<(FontKey, FontSpec)> = Vec::new();
        for page in pages {
            for element in &page.elements {
                if let DrawCommand::Text { font, .. } = &element.draw {
                    keys.push((font.key(), *font));
                }
            }
        }

        // Sort for deterministic ordering, then dedup
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        keys.dedup_by(|a, b| a.0 == b.0);

        if keys.is_empty() {
            let regular = FontSpec::regular(12.0);
            keys.push((regular.key(), regular));
        }

        for (key, spec) in keys {
            let font = font_context.resolve(&spec)?;
            let font_dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            let obj_id = builder.push(font_dict.into_bytes());
            builder.font_objects.push((key, obj_id));
        }
        Ok(())
    }

    fn register_images(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        for page in pages {
            let mut ids = Vec::new();
            for element in &page.elements {
                if let DrawCommand::Image { image } = &element.draw {
                    ids.push(Self::write_image_xobject(builder, image));
                }
            }
            builder.page_images.push(ids);
        }
    }

    /// Write one image as an XObject, plus a soft mask when it has alpha.
    /// Returns the main XObject id.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                let mut obj: Vec<u8> = Vec::new();
                let _ = write!(
                    obj,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    color_space,
                    data.len()
                );
                obj.extend_from_slice(data);
                obj.extend_from_slice(b"\nendstream");
                builder.push(obj)
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                let smask_id = alpha.as_ref().map(|alpha| {
                    let compressed = compress_to_vec_zlib(alpha, 6);
                    let mut obj: Vec<u8> = Vec::new();
                    let _ = write!(
                        obj,
                        "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceGray /BitsPerComponent 8 \
                         /Filter /FlateDecode /Length {} >>\nstream\n",
                        image.width_px,
                        image.height_px,
                        compressed.len()
                    );
                    obj.extend_from_slice(&compressed);
                    obj.extend_from_slice(b"\nendstream");
                    builder.push(obj)
                });

                let compressed = compress_to_vec_zlib(rgb, 6);
                let smask = smask_id
                    .map(|id| format!(" /SMask {} 0 R", id))
                    .unwrap_or_default();
                let mut obj: Vec<u8> = Vec::new();
                let _ = write!(
                    obj,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8 \
                     /Filter /FlateDecode /Length {}{} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    compressed.len(),
                    smask
                );
                obj.extend_from_slice(&compressed);
                obj.extend_from_slice(b"\nendstream");
                builder.push(obj)
            }
        }
    }

    fn build_xobject_resource_dict(&self, page_idx: usize, builder: &PdfBuilder) -> String {
        builder
            .page_images
            .get(page_idx)
            .map(|ids| {
                ids.iter()
                    .enumerate()
                    .map(|(i, id)| format!("/Im{} {} 0 R", i, id))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    fn build_font_resource_dict(&self, font_objects: &[(FontKey, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resource index (/F0, /F1, ...) of a font. Every text run's font was
    /// registered, so the fallback to /F0 is never hit in practice.
    fn font_index(&self, font: &FontSpec, font_objects: &[(FontKey, usize)]) -> usize {
        let key = font.key();
        font_objects
            .iter()
            .position(|(k, _)| *k == key)
            .unwrap_or(0)
    }

    /// Escape special characters in a PDF string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Encode text as a WinAnsi literal string body. Characters outside
    /// WinAnsi become `?`.
    fn encode_text(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match Self::unicode_to_winansi(ch).unwrap_or(b'?') {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                b @ 0x20..=0x7E => out.push(b as char),
                b => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Codepoints in 0x20..=0x7E
    /// and 0xA0..=0xFF map directly; 0x80..=0x9F holds smart quotes,
    /// bullets and dashes.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82), // Single low-9 quotation mark
            0x0192 => Some(0x83), // Latin small letter f with hook
            0x201E => Some(0x84), // Double low-9 quotation mark
            0x2026 => Some(0x85), // Horizontal ellipsis
            0x2020 => Some(0x86), // Dagger
            0x2021 => Some(0x87), // Double dagger
            0x02C6 => Some(0x88), // Modifier letter circumflex accent
            0x2030 => Some(0x89), // Per mille sign
            0x0160 => Some(0x8A), // Latin capital letter S with caron
            0x2039 => Some(0x8B), // Single left-pointing angle quotation
            0x0152 => Some(0x8C), // Latin capital ligature OE
            0x017D => Some(0x8E), // Latin capital letter Z with caron
            0x2018 => Some(0x91), // Left single quotation mark
            0x2019 => Some(0x92), // Right single quotation mark
            0x201C => Some(0x93), // Left double quotation mark
            0x201D => Some(0x94), // Right double quotation mark
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98), // Small tilde
            0x2122 => Some(0x99), // Trade mark sign
            0x0161 => Some(0x9A), // Latin small letter s with caron
            0x203A => Some(0x9B), // Single right-pointing angle quotation
            0x0153 => Some(0x9C), // Latin small ligature oe
            0x017E => Some(0x9E), // Latin small letter z with caron
            0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(elements: Vec<LayoutElement>) -> Vec<LayoutPage> {
        vec![LayoutPage {
            width: 792.0,
            height: 612.0,
            elements,
        }]
    }

    fn text(text: &str, font: FontSpec, href: Option<&str>) -> LayoutElement {
        LayoutElement {
            x: 24.0,
            y: 40.0,
            width: 30.0,
            height: font.size,
            draw: DrawCommand::Text {
                text: text.to_string(),
                font,
                color: Color::BLACK,
                underline: href.is_some(),
                href: href.map(str::to_string),
            },
        }
    }

    fn write(pages: &[LayoutPage], metadata: &Metadata) -> Vec<u8> {
        PdfWriter::new()
            .write(pages, metadata, &FontContext::new())
            .unwrap()
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(
            PdfWriter::escape_pdf_string("Hello (World)"),
            "Hello \\(World\\)"
        );
        assert_eq!(
            PdfWriter::escape_pdf_string("back\\slash"),
            "back\\\\slash"
        );
    }

    #[test]
    fn test_encode_text_winansi() {
        assert_eq!(PdfWriter::encode_text("Kata (1)"), "Kata \\(1\\)");
        assert_eq!(PdfWriter::encode_text("Kiai – Ki"), "Kiai \\226 Ki");
        assert_eq!(PdfWriter::encode_text("café"), "caf\\351");
        assert_eq!(PdfWriter::encode_text("空手"), "??");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let bytes = write(&page(vec![]), &Metadata::default());
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
        assert!(bytes.windows(4).any(|w| w == b"xref"));
        assert!(bytes.windows(7).any(|w| w == b"trailer"));
    }

    #[test]
    fn test_metadata_in_pdf() {
        let metadata = Metadata {
            title: Some("Kenpo - Yellow Belt".to_string()),
            author: Some("Tiger Dojo".to_string()),
        };
        let bytes = write(&page(vec![]), &metadata);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Kenpo - Yellow Belt)"));
        assert!(text.contains("/Author (Tiger Dojo)"));
        assert!(!text.contains("CreationDate"));
    }

    #[test]
    fn test_bold_font_registered_separately() {
        let bytes = write(
            &page(vec![
                text("A", FontSpec::regular(8.0), None),
                text("B", FontSpec::bold(8.0), None),
                text("C", FontSpec::regular(12.0), None),
            ]),
            &Metadata::default(),
        );
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
        assert_eq!(text.matches("/Subtype /Type1").count(), 2);
    }

    #[test]
    fn test_unknown_font_is_an_error() {
        let font = FontSpec {
            family: "Comic Sans",
            ..FontSpec::regular(8.0)
        };
        let result = PdfWriter::new().write(
            &page(vec![text("x", font, None)]),
            &Metadata::default(),
            &FontContext::new(),
        );
        assert!(matches!(result, Err(SheetError::Font(_))));
    }

    #[test]
    fn test_link_becomes_annotation() {
        let bytes = write(
            &page(vec![text(
                "Link",
                FontSpec::regular(8.0),
                Some("https://example.com/a(b)"),
            )]),
            &Metadata::default(),
        );
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Link"));
        assert!(text.contains("/URI (https://example.com/a\\(b\\))"));
        assert!(text.contains("/Annots ["));
    }

    #[test]
    fn test_image_xobject_with_soft_mask() {
        let logo = LoadedImage {
            pixel_data: ImagePixelData::Decoded {
                rgb: vec![255, 0, 0],
                alpha: Some(vec![128]),
            },
            width_px: 1,
            height_px: 1,
        };
        let bytes = write(
            &page(vec![LayoutElement {
                x: 24.0,
                y: 24.0,
                width: 50.0,
                height: 50.0,
                draw: DrawCommand::Image { image: logo },
            }]),
            &Metadata::default(),
        );
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/XObject << /Im0"));
        assert!(text.contains("/SMask"));
        assert!(text.contains("/ColorSpace /DeviceGray"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let pages = page(vec![
            text("Front kick", FontSpec::bold(8.0), None),
            text("Link", FontSpec::regular(8.0), Some("https://example.com")),
        ]);
        let metadata = Metadata {
            title: Some("t".to_string()),
            author: None,
        };
        assert_eq!(write(&pages, &metadata), write(&pages, &metadata));
    }
}
