// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Every way a render can fail.  None of these are recoverable; the
//! binary reports them and exits with status 1.

use failure::Fail;
use std::io;

/// The error type shared by every stage of the pipeline.
#[derive(Debug, Fail)]
pub enum Error {
    /// The viewport parameters are out of range.
    #[fail(display = "invalid viewport: {}", _0)]
    InvalidViewport(String),

    /// A rank could not allocate its full-size image buffer.
    #[fail(display = "unable to allocate a {}x{} image buffer", width, height)]
    Allocation {
        /// Requested width in pixels.
        width: usize,
        /// Requested height in pixels.
        height: usize,
    },

    /// The image does not fit the 32-bit fields of the bitmap header.
    #[fail(display = "a {}x{} image is too large for a bitmap file", width, height)]
    ImageTooLarge {
        /// Image width in pixels.
        width: usize,
        /// Image height in pixels.
        height: usize,
    },

    /// The output file could not be created or written.
    #[fail(display = "unable to write {}: {}", path, cause)]
    OutputWrite {
        /// The output path, as given.
        path: String,
        /// The underlying I/O failure.
        #[fail(cause)]
        cause: io::Error,
    },

    /// The image crate refused to encode the buffer.
    #[fail(display = "unable to encode {}: {}", path, message)]
    Encode {
        /// The output path, as given.
        path: String,
        /// The encoder's complaint.
        message: String,
    },

    /// Another rank gave up, so the collective cannot complete.
    #[fail(display = "rank {} aborted the render: {}", rank, reason)]
    Aborted {
        /// The rank that called abort.
        rank: usize,
        /// Why it did so.
        reason: String,
    },

    /// Two partial images both claim the same row.
    #[fail(display = "row {} is owned by more than one rank", row)]
    Overlap {
        /// The doubly-owned row.
        row: usize,
    },

    /// A worker thread or rank panicked.
    #[fail(display = "a render worker panicked")]
    WorkerPanic,
}

impl Error {
    /// True for the secondary failure a rank sees when some other rank
    /// brought the group down.
    pub fn is_abort(&self) -> bool {
        match self {
            Error::Aborted { .. } => true,
            _ => false,
        }
    }
}
