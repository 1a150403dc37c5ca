//! Builds a new PDF that carries nothing but the redacted text.
//!
//! Text flows over as many pages as it needs, up to `PageGeometry::max_pages`.
//! Lines longer than the printable width are hard-wrapped. Each line is its
//! own text object, so extracting the rebuilt document gives the lines back.

use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::{PageGeometry, SanitizedDocument};
use crate::errors::{VeilError, VeilResult};

const TAB_WIDTH: usize = 4;
const FONT_RESOURCE: &str = "F1";

#[derive(Debug, Clone)]
pub struct DocumentRebuilder {
    geometry: PageGeometry,
}

impl DocumentRebuilder {
    pub fn new(geometry: PageGeometry) -> VeilResult<Self> {
        geometry.validate().map_err(VeilError::Rebuild)?;
        Ok(Self { geometry })
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Splits text into display lines: tabs expanded, control characters
    /// blanked, long lines wrapped at the column limit.
    pub fn layout_lines(&self, text: &str) -> Vec<String> {
        let columns = self.geometry.columns();
        let mut lines = Vec::new();

        for raw in text.trim_end_matches(['\n', '\r']).split('\n') {
            let mut expanded: Vec<char> = Vec::with_capacity(raw.len());
            for c in raw.trim_end_matches('\r').chars() {
                match c {
                    '\t' => {
                        let pad = TAB_WIDTH - expanded.len() % TAB_WIDTH;
                        expanded.extend(std::iter::repeat(' ').take(pad));
                    }
                    c if c.is_control() => expanded.push(' '),
                    c => expanded.push(c),
                }
            }

            if expanded.is_empty() {
                lines.push(String::new());
                continue;
            }
            for chunk in expanded.chunks(columns) {
                lines.push(chunk.iter().collect());
            }
        }
        lines
    }

    /// Builds the document. Fails with [`VeilError::Rebuild`] when the text
    /// would need more than `max_pages` pages.
    pub fn rebuild(&self, text: &str) -> VeilResult<SanitizedDocument> {
        let lines = self.layout_lines(text);
        let per_page = self.geometry.lines_per_page();
        let page_count = lines.len().div_ceil(per_page).max(1);

        if page_count > self.geometry.max_pages {
            return Err(VeilError::Rebuild(format!(
                "text needs {} pages, limit is {}",
                page_count, self.geometry.max_pages
            )));
        }

        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { FONT_RESOURCE => font_id },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(page_count);
        let mut chunks: Vec<&[String]> = lines.chunks(per_page).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }

        for page_lines in chunks {
            let content = Content { operations: self.page_operations(page_lines) };
            let encoded = content
                .encode()
                .map_err(|e| VeilError::Rebuild(format!("failed to encode page content: {}", e)))?;
            let content_id = document.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count as i64),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(self.geometry.width as i64),
                Object::Integer(self.geometry.height as i64),
            ],
        };
        document.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        debug!("Rebuilt document: {} line(s) over {} page(s)", lines.len(), page_count);
        Ok(SanitizedDocument::new(document, text.to_string(), page_count))
    }

    fn page_operations(&self, lines: &[String]) -> Vec<Operation> {
        let g = &self.geometry;
        let top = (g.height - g.margin) as i64;
        let mut operations = Vec::with_capacity(lines.len() * 5);

        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let baseline = top - (index as i64) * g.leading as i64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![FONT_RESOURCE.into(), Object::Integer(g.font_size as i64)],
            ));
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(g.margin as i64), Object::Integer(baseline)],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(win_ansi_bytes(line), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        operations
    }
}

/// Latin-1 range maps straight onto WinAnsi for the characters we emit;
/// anything else is written as `?`.
fn win_ansi_bytes(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
