// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Viewport struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0
//! (the image) and a window onto the complex plane, described by a
//! zoom factor and a pan offset rather than by two corners.
use num::Complex;

use crate::errors::Error;

/// Describes the x, y of a pixel in the image.  Column first, then
/// row, with row 0 at the top.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Position(pub usize, pub usize);

/// The immutable description of what is being rendered.  Every stage
/// of the pipeline takes one of these by reference; there is no other
/// source of the image dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Magnification; 1.0 shows the whole set.
    pub zoom: f64,
    /// Real part of the point at the centre of the image.
    pub move_x: f64,
    /// Imaginary part of the point at the centre of the image.
    pub move_y: f64,
    /// Per-pixel iteration limit.
    pub max_iterations: usize,
}

impl Viewport {
    /// Constructor.  Rejects shapes that cannot be mapped: empty
    /// images, non-positive or non-finite zoom, and a zero iteration
    /// limit.
    pub fn new(
        width: usize,
        height: usize,
        zoom: f64,
        move_x: f64,
        move_y: f64,
        max_iterations: usize,
    ) -> Result<Viewport, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidViewport(format!(
                "the image must be at least 1x1, not {}x{}",
                width, height
            )));
        }

        if !(zoom > 0.0) || !zoom.is_finite() {
            return Err(Error::InvalidViewport(format!(
                "zoom must be a positive number, not {}",
                zoom
            )));
        }

        if !move_x.is_finite() || !move_y.is_finite() {
            return Err(Error::InvalidViewport(
                "the pan offsets must be finite".to_string(),
            ));
        }

        if max_iterations == 0 {
            return Err(Error::InvalidViewport(
                "the iteration limit must be at least 1".to_string(),
            ));
        }

        Ok(Viewport {
            width,
            height,
            zoom,
            move_x,
            move_y,
            max_iterations,
        })
    }

    /// The total number of pixels in the image.  Used to calculate
    /// memory needs.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// A validated viewport is never empty; this exists for symmetry
    /// with `len`.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Given a pixel on the integral plane, map it to its starting
    /// point on the complex plane.  The 1.5 on the real axis widens
    /// the classic Julia viewing window and must stay exactly as is
    /// for output to match existing renders.
    pub fn pixel_to_point(&self, pixel: &Position) -> Complex<f64> {
        let width = self.width as f64;
        let height = self.height as f64;
        Complex::new(
            1.5 * ((pixel.0 as f64) - width / 2.0) / (0.5 * self.zoom * width) + self.move_x,
            ((pixel.1 as f64) - height / 2.0) / (0.5 * self.zoom * height) + self.move_y,
        )
    }
}
