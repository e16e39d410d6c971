// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A minimal 24-bit bitmap writer: a 14-byte file header, a 40-byte
//! DIB header, then three bytes per pixel in blue, green, red order
//! with no row padding.
//!
//! Rows are written in the raster's own order, top row first, with a
//! positive height.  Most readers of this format expect the bottom
//! row first when the height is positive, so they will show the image
//! upside down.  Existing tools depend on this layout; it is kept.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::errors::Error;
use crate::raster::Raster;

/// "BM", little-endian.
pub const FILE_TYPE: u16 = 0x4D42;
/// Size of the file header plus the DIB header.
pub const HEADER_LEN: u32 = 54;
/// Size of the DIB (BITMAPINFOHEADER) header alone.
pub const DIB_HEADER_LEN: u32 = 40;
/// Bytes per pixel.
pub const BYTES_PER_PIXEL: u32 = 3;

/// The two headers, field by field.  Serialised explicitly in
/// little-endian order; the in-memory layout is irrelevant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitmapHeader {
    /// Magic number, always `FILE_TYPE`.
    pub file_type: u16,
    /// Total size of the file in bytes.
    pub file_size: u32,
    /// Reserved, zero.
    pub reserved1: u16,
    /// Reserved, zero.
    pub reserved2: u16,
    /// Offset of the pixel data from the start of the file.
    pub data_offset: u32,
    /// Size of the DIB header.
    pub dib_header_size: u32,
    /// Image width in pixels.
    pub width: i32,
    /// Image height in pixels.
    pub height: i32,
    /// Colour planes, always 1.
    pub planes: u16,
    /// Bits per pixel, always 24.
    pub bit_depth: u16,
    /// Compression scheme, 0 for none.
    pub compression: u32,
    /// Size of the pixel data in bytes.
    pub image_size: u32,
    /// Horizontal resolution, unspecified.
    pub x_pixels_per_meter: i32,
    /// Vertical resolution, unspecified.
    pub y_pixels_per_meter: i32,
    /// Palette size, unused.
    pub colors_used: u32,
    /// Important palette entries, unused.
    pub colors_important: u32,
}

impl BitmapHeader {
    /// The header for a `width × height` image.  Fails if the
    /// dimensions or the resulting file size do not fit the header's
    /// 32-bit fields.
    pub fn new(width: usize, height: usize) -> Result<BitmapHeader, Error> {
        let too_large = || Error::ImageTooLarge { width, height };
        let signed_width = i32_of(width).ok_or_else(too_large)?;
        let signed_height = i32_of(height).ok_or_else(too_large)?;
        let image_size = (width as u64) * (height as u64) * u64::from(BYTES_PER_PIXEL);
        let file_size = image_size + u64::from(HEADER_LEN);
        if file_size > u64::from(std::u32::MAX) {
            return Err(too_large());
        }

        Ok(BitmapHeader {
            file_type: FILE_TYPE,
            file_size: file_size as u32,
            reserved1: 0,
            reserved2: 0,
            data_offset: HEADER_LEN,
            dib_header_size: DIB_HEADER_LEN,
            width: signed_width,
            height: signed_height,
            planes: 1,
            bit_depth: 24,
            compression: 0,
            image_size: image_size as u32,
            x_pixels_per_meter: 0,
            y_pixels_per_meter: 0,
            colors_used: 0,
            colors_important: 0,
        })
    }

    /// The 54 header bytes, in file order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN as usize);
        bytes.extend_from_slice(&self.file_type.to_le_bytes());
        bytes.extend_from_slice(&self.file_size.to_le_bytes());
        bytes.extend_from_slice(&self.reserved1.to_le_bytes());
        bytes.extend_from_slice(&self.reserved2.to_le_bytes());
        bytes.extend_from_slice(&self.data_offset.to_le_bytes());
        bytes.extend_from_slice(&self.dib_header_size.to_le_bytes());
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.planes.to_le_bytes());
        bytes.extend_from_slice(&self.bit_depth.to_le_bytes());
        bytes.extend_from_slice(&self.compression.to_le_bytes());
        bytes.extend_from_slice(&self.image_size.to_le_bytes());
        bytes.extend_from_slice(&self.x_pixels_per_meter.to_le_bytes());
        bytes.extend_from_slice(&self.y_pixels_per_meter.to_le_bytes());
        bytes.extend_from_slice(&self.colors_used.to_le_bytes());
        bytes.extend_from_slice(&self.colors_important.to_le_bytes());
        debug_assert_eq!(bytes.len(), HEADER_LEN as usize);
        bytes
    }
}

fn i32_of(n: usize) -> Option<i32> {
    if n > std::i32::MAX as usize {
        None
    } else {
        Some(n as i32)
    }
}

/// Header and pixels, to any writer.  The I/O error, if any, is the
/// caller's to attribute.
pub fn encode<W: Write>(raster: &Raster, header: &BitmapHeader, mut out: W) -> io::Result<()> {
    out.write_all(&header.to_bytes())?;
    let mut row = Vec::with_capacity(raster.width() * BYTES_PER_PIXEL as usize);
    for y in 0..raster.height() {
        row.clear();
        for p in raster.row(y) {
            row.extend_from_slice(&[p.b, p.g, p.r]);
        }
        out.write_all(&row)?;
    }
    out.flush()
}

/// Create (or truncate) `path` and write the raster to it.
pub fn write_bitmap<P: AsRef<Path>>(path: P, raster: &Raster) -> Result<(), Error> {
    let path = path.as_ref();
    let header = BitmapHeader::new(raster.width(), raster.height())?;
    let failed = |cause| Error::OutputWrite {
        path: path.display().to_string(),
        cause,
    };
    let file = File::create(path).map_err(failed)?;
    encode(raster, &header, BufWriter::new(file)).map_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Rgb;
    use std::fs;

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn header_for_800_by_600() {
        let header = BitmapHeader::new(800, 600).unwrap();
        assert_eq!(header.file_size, 54 + 800 * 600 * 3);
        assert_eq!(header.image_size, 800 * 600 * 3);
        assert_eq!(header.width, 800);
        assert_eq!(header.height, 600);
        assert_eq!(header.bit_depth, 24);

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 54);
        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(u32_at(&bytes, 2), 54 + 800 * 600 * 3);
        assert_eq!(u32_at(&bytes, 6), 0);
        assert_eq!(u32_at(&bytes, 10), 54);
        assert_eq!(u32_at(&bytes, 14), 40);
        assert_eq!(u32_at(&bytes, 18), 800);
        assert_eq!(u32_at(&bytes, 22), 600);
        assert_eq!(u16_at(&bytes, 26), 1);
        assert_eq!(u16_at(&bytes, 28), 24);
        assert_eq!(u32_at(&bytes, 30), 0);
        assert_eq!(u32_at(&bytes, 34), 800 * 600 * 3);
        assert!(bytes[38..54].iter().all(|&b| b == 0));
    }

    #[test]
    fn oversized_images_are_refused() {
        assert!(BitmapHeader::new(1 << 31, 1).is_err());
        assert!(BitmapHeader::new(40_000, 40_000).is_err());
    }

    #[test]
    fn pixels_are_bgr_top_row_first_unpadded() {
        // Width 1 would need three bytes of padding per row in a
        // conventional bitmap; none are written here.
        let mut raster = Raster::try_new(1, 2).unwrap();
        raster.set(0, 0, Rgb { r: 1, g: 2, b: 3 });
        raster.set(0, 1, Rgb { r: 4, g: 5, b: 6 });
        let header = BitmapHeader::new(1, 2).unwrap();
        let mut out = Vec::new();
        encode(&raster, &header, &mut out).unwrap();
        assert_eq!(out.len(), 54 + 6);
        assert_eq!(&out[54..], &[3, 2, 1, 6, 5, 4]);
        assert_eq!(u32_at(&out, 2) as usize, out.len());
    }

    #[test]
    fn writes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fractal.bmp");
        let raster = Raster::try_new(5, 3).unwrap();
        write_bitmap(&path, &raster).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 54 + 5 * 3 * 3);

        // Overwrites rather than appends.
        write_bitmap(&path, &raster).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 54 + 45);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-directory").join("fractal.bmp");
        let raster = Raster::try_new(2, 2).unwrap();
        match write_bitmap(&path, &raster) {
            Err(Error::OutputWrite { path: reported, .. }) => {
                assert!(reported.ends_with("fractal.bmp"))
            }
            other => panic!("expected a write failure, got {:?}", other),
        }
    }
}
