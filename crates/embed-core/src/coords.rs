//! Coordinate transformation between designer space and PDF page space
//!
//! Designer space: millimetres, top-left origin, y grows downward.
//! Page space: points, bottom-left origin, y grows upward.

use crate::layout::FittedBox;
use crate::schema::Position;

/// Points per millimetre
pub const MM_TO_PT: f64 = 2.8346;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

pub fn pt_to_mm(pt: f64) -> f64 {
    pt / MM_TO_PT
}

/// Draw geometry on an output page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise degrees about (x, y)
    pub rotate: f64,
    pub opacity: f64,
}

/// Map a designer box onto a page `page_height` points tall
pub fn to_output_space(
    fitted: &FittedBox,
    rotate: Option<f64>,
    opacity: f64,
    page_height: f64,
) -> OutputBox {
    let width = mm_to_pt(fitted.width);
    let height = mm_to_pt(fitted.height);
    OutputBox {
        x: mm_to_pt(fitted.position.x),
        y: page_height - mm_to_pt(fitted.position.y) - height,
        width,
        height,
        rotate: rotate.unwrap_or(0.0),
        opacity,
    }
}

/// Inverse of [`to_output_space`] for the same page height
pub fn from_output_space(output: &OutputBox, page_height: f64) -> FittedBox {
    FittedBox {
        position: Position {
            x: pt_to_mm(output.x),
            y: pt_to_mm(page_height - output.y - output.height),
        },
        width: pt_to_mm(output.width),
        height: pt_to_mm(output.height),
    }
}
