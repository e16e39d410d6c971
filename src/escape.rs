// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time evaluator.  A point is iterated under `z = z² + c`
//! until it leaves the circle of radius 2 or the iteration budget
//! runs out; the number of iterations it survived is turned into a
//! colour with a fixed polynomial palette.

use num::Complex;

use crate::planes::{Position, Viewport};
use crate::raster::Rgb;

/// The member of the Julia family this crate renders.  Points near
/// the boundary of the Mandelbrot set give the more interesting
/// Julia sets; this one is the classic "dendrite with spirals."
pub const JULIA_C: Complex<f64> = Complex {
    re: -0.7,
    im: 0.27015,
};

/// Iterate `start` under `z = z² + c` while `|z|² <= 4` and fewer than
/// `limit` iterations have been done.  Returns the number of
/// iterations performed, which is `limit` for points that never
/// escape.
#[inline]
pub fn escape_time(start: Complex<f64>, c: Complex<f64>, limit: usize) -> usize {
    let mut z = start;
    let mut iterations = 0;
    while z.norm_sqr() <= 4.0 && iterations < limit {
        z = z * z + c;
        iterations += 1;
    }
    iterations
}

/// Truncate toward zero, then keep the low eight bits.  The palette
/// never leaves [0, 255] for ratios in [0, 1), but out-of-range
/// values wrap rather than saturate.
#[inline]
fn channel(value: f64) -> u8 {
    value as i64 as u8
}

/// Map an iteration count to a colour.  Points that used the entire
/// budget are black, the same value as an unrendered cell.
pub fn colorize(iterations: usize, limit: usize) -> Rgb {
    if iterations >= limit {
        return Rgb::BLACK;
    }

    let ratio = iterations as f64 / limit as f64;
    let inverse = 1.0 - ratio;
    Rgb {
        r: channel(9.0 * inverse * ratio * ratio * ratio * 255.0),
        g: channel(15.0 * inverse * inverse * ratio * ratio * 255.0),
        b: channel(8.5 * inverse * inverse * inverse * ratio * 255.0),
    }
}

/// Mapper plus evaluator: the colour of one pixel of the viewport.
#[inline]
pub fn julia_pixel(viewport: &Viewport, pixel: &Position) -> Rgb {
    let start = viewport.pixel_to_point(pixel);
    colorize(
        escape_time(start, JULIA_C, viewport.max_iterations),
        viewport.max_iterations,
    )
}
