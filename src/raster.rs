// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pixels and the full-size, row-major image buffer every rank
//! renders into.

use std::ops::{BitOr, BitOrAssign};

use crate::errors::Error;
use crate::planes::Viewport;

/// One 24-bit colour.  All-zero doubles as "never written."
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// The unset sentinel, and the colour of points that never escape.
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
}

impl BitOr for Rgb {
    type Output = Rgb;

    fn bitor(self, other: Rgb) -> Rgb {
        Rgb {
            r: self.r | other.r,
            g: self.g | other.g,
            b: self.b | other.b,
        }
    }
}

impl BitOrAssign for Rgb {
    fn bitor_assign(&mut self, other: Rgb) {
        *self = *self | other;
    }
}

/// A `width × height` image, stored row-major with row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    cells: Vec<Rgb>,
}

impl Raster {
    /// Allocate an all-black raster.  Allocation failure is reported
    /// rather than aborting the process, so that a rank can tell the
    /// rest of its group before it goes.
    pub fn try_new(width: usize, height: usize) -> Result<Raster, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidViewport(format!(
                "the image must be at least 1x1, not {}x{}",
                width, height
            )));
        }
        let len = width
            .checked_mul(height)
            .ok_or(Error::Allocation { width, height })?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { width, height })?;
        cells.resize(len, Rgb::BLACK);
        Ok(Raster {
            width,
            height,
            cells,
        })
    }

    /// A raster the size of the viewport.
    pub fn for_viewport(viewport: &Viewport) -> Result<Raster, Error> {
        Raster::try_new(viewport.width, viewport.height)
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Every cell, row-major.
    pub fn cells(&self) -> &[Rgb] {
        &self.cells
    }

    /// The pixel at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.cells[y * self.width + x]
    }

    /// Overwrite the pixel at column `x`, row `y`.
    pub fn set(&mut self, x: usize, y: usize, pixel: Rgb) {
        self.cells[y * self.width + x] = pixel;
    }

    /// One row of the image.
    pub fn row(&self, y: usize) -> &[Rgb] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    /// One row of the image, writable.
    pub fn row_mut(&mut self, y: usize) -> &mut [Rgb] {
        &mut self.cells[y * self.width..(y + 1) * self.width]
    }

    /// Every row, top to bottom, as disjoint writable slices.
    pub fn rows_mut(&mut self) -> std::slice::ChunksMut<'_, Rgb> {
        self.cells.chunks_mut(self.width)
    }

    /// True if every cell is still the unset sentinel.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|p| *p == Rgb::BLACK)
    }

    /// Channel-wise OR of another raster of the same shape into this
    /// one.  Associative and commutative, with the all-black raster as
    /// the identity.
    pub fn or_assign(&mut self, other: &Raster) {
        assert!(self.width == other.width && self.height == other.height);
        for (mine, theirs) in self.cells.iter_mut().zip(other.cells.iter()) {
            *mine |= *theirs;
        }
    }

    /// FNV-1a over the pixel bytes in r, g, b order.  Stable across
    /// builds and platforms, so it can be compared between runs.
    pub fn checksum(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        self.cells.iter().fold(OFFSET, |hash, p| {
            [p.r, p.g, p.b]
                .iter()
                .fold(hash, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
        })
    }

    /// The pixel bytes in r, g, b order, top row first.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.cells.len() * 3);
        for p in &self.cells {
            bytes.extend_from_slice(&[p.r, p.g, p.b]);
        }
        bytes
    }

    /// Copy into an `image` buffer, for the formats this crate does
    /// not encode itself.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width as u32, self.height as u32, self.to_rgb_bytes())
    }
}
