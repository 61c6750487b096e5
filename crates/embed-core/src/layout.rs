//! Aspect-fit layout
//!
//! Scales an object into a schema's box without distortion and centres it
//! along the axis that has slack.

use crate::error::EmbedError;
use crate::schema::Position;

/// Millimetres per CSS pixel at 96 DPI
pub const PX_TO_MM: f64 = 0.26458333333333;

pub fn px_to_mm(px: f64) -> f64 {
    px * PX_TO_MM
}

/// A box in schema space (millimetres, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedBox {
    pub position: Position,
    pub width: f64,
    pub height: f64,
}

impl FittedBox {
    pub fn center(&self) -> (f64, f64) {
        (
            self.position.x + self.width / 2.0,
            self.position.y + self.height / 2.0,
        )
    }
}

/// Intrinsic size of the object being placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaturalSize {
    pub width: f64,
    pub height: f64,
}

impl NaturalSize {
    /// Raster images are measured in pixels
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self {
            width: px_to_mm(width as f64),
            height: px_to_mm(height as f64),
        }
    }

    /// PDF pages keep their own units; only the ratio matters to the fit
    pub fn from_points(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

fn check_dimension(name: &str, value: f64) -> Result<(), EmbedError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EmbedError::DegenerateGeometry(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

/// Fit `natural` inside the box, returning the scaled box and its shifted
/// origin. A ratio tie takes the height-bound branch.
pub fn fit(
    box_width: f64,
    box_height: f64,
    natural: NaturalSize,
    position: Position,
) -> Result<FittedBox, EmbedError> {
    check_dimension("box width", box_width)?;
    check_dimension("box height", box_height)?;
    check_dimension("natural width", natural.width)?;
    check_dimension("natural height", natural.height)?;

    let image_ratio = natural.width / natural.height;
    let box_ratio = box_width / box_height;
    let mut position = position;

    if image_ratio > box_ratio {
        let height = box_width / image_ratio;
        position.y += (box_height - height) / 2.0;
        Ok(FittedBox {
            position,
            width: box_width,
            height,
        })
    } else {
        let width = box_height * image_ratio;
        position.x += (box_width - width) / 2.0;
        Ok(FittedBox {
            position,
            width,
            height: box_height,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        0.5f64..2000.0
    }

    fn coordinate() -> impl Strategy<Value = f64> {
        -500.0f64..500.0
    }

    proptest! {
        /// Property: the bound axis matches the box, the other axis fits inside it
        #[test]
        fn fitted_box_stays_inside(
            bw in dimension(), bh in dimension(),
            nw in dimension(), nh in dimension(),
        ) {
            let natural = NaturalSize::from_points(nw, nh);
            let fitted = fit(bw, bh, natural, Position::default()).unwrap();
            let tolerance = 1e-9 * bw.max(bh);

            if nw / nh > bw / bh {
                prop_assert_eq!(fitted.width, bw);
                prop_assert!(fitted.height <= bh + tolerance);
            } else {
                prop_assert_eq!(fitted.height, bh);
                prop_assert!(fitted.width <= bw + tolerance);
            }
        }

        /// Property: the fitted box shares the original box's centre
        #[test]
        fn fitted_box_is_centered(
            bw in dimension(), bh in dimension(),
            nw in dimension(), nh in dimension(),
            x in coordinate(), y in coordinate(),
        ) {
            let position = Position { x, y };
            let fitted = fit(bw, bh, NaturalSize::from_points(nw, nh), position).unwrap();
            let (cx, cy) = fitted.center();
            let tolerance = 1e-6;
            let (ex, ey) = (x + bw / 2.0, y + bh / 2.0);
            prop_assert!((cx - ex).abs() < tolerance, "x centre {} vs {}", cx, ex);
            prop_assert!((cy - ey).abs() < tolerance, "y centre {} vs {}", cy, ey);
        }

        /// Property: the aspect ratio of the object is preserved
        #[test]
        fn fitted_box_keeps_ratio(
            bw in dimension(), bh in dimension(),
            nw in dimension(), nh in dimension(),
        ) {
            let natural = NaturalSize::from_points(nw, nh);
            let fitted = fit(bw, bh, natural, Position::default()).unwrap();
            let expected = nw / nh;
            let actual = fitted.width / fitted.height;
            prop_assert!((actual - expected).abs() <= 1e-9 * expected.max(1.0));
        }
    }
}
