//! Units and coordinate conversion between the contents page's CSS layout
//! and PDF user space.
//!
//! Contents rows are measured in CSS pixels (96 per inch) with the origin at
//! the top-left corner of the document. Link annotations are placed in PDF
//! points (72 per inch) with the origin at the bottom-left corner of a page.

use serde::{Deserialize, Serialize};

pub const CSS_PX_PER_INCH: f64 = 96.0;
pub const PDF_PT_PER_INCH: f64 = 72.0;

/// A length in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Px(pub f64);

/// A length in PDF points
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Pt(pub f64);

impl Px {
    pub fn to_pt(self) -> Pt {
        Pt(self.0 * PDF_PT_PER_INCH / CSS_PX_PER_INCH)
    }
}

/// Size of one printed page in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub width: Px,
    pub height: Px,
}

impl PageBox {
    /// A4 (210 x 297 mm) at 96 px per inch
    pub const A4: PageBox = PageBox {
        width: Px(794.0),
        height: Px(1123.0),
    };

    /// Page size in centimetres, as the print command expects it
    pub fn size_cm(&self) -> (f64, f64) {
        let to_cm = |px: Px| px.0 / CSS_PX_PER_INCH * 2.54;
        (to_cm(self.width), to_cm(self.height))
    }
}

/// Rectangle in CSS pixels, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CssRect {
    pub left: Px,
    pub top: Px,
    pub right: Px,
    pub bottom: Px,
}

/// Rectangle in PDF points, bottom-left origin, `[x1 y1 x2 y2]` order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PdfRect {
    pub x1: Pt,
    pub y1: Pt,
    pub x2: Pt,
    pub y2: Pt,
}

impl PdfRect {
    pub fn as_array(&self) -> [f64; 4] {
        [self.x1.0, self.y1.0, self.x2.0, self.y2.0]
    }
}

/// Splits a rectangle measured against the whole scrolled document into the
/// printed page it starts on and its position relative to that page.
///
/// Rows are laid out continuously, so one can straddle a page break; its
/// bottom is clipped to the page it starts on.
pub fn split_into_page(document_rect: CssRect, page: PageBox) -> (usize, CssRect) {
    let index = (document_rect.top.0 / page.height.0).floor().max(0.0);
    let offset = index * page.height.0;
    let rect = CssRect {
        left: document_rect.left,
        top: Px(document_rect.top.0 - offset),
        right: document_rect.right,
        bottom: Px((document_rect.bottom.0 - offset).min(page.height.0)),
    };
    (index as usize, rect)
}

/// Converts a page-relative CSS rectangle into PDF user space.
pub fn css_to_pdf(rect: CssRect, page: PageBox) -> PdfRect {
    PdfRect {
        x1: rect.left.to_pt(),
        y1: Px(page.height.0 - rect.bottom.0).to_pt(),
        x2: rect.right.to_pt(),
        y2: Px(page.height.0 - rect.top.0).to_pt(),
    }
}
