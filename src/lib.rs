#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Julia set renderer
//!
//! A Julia set is drawn by taking every pixel of the image, mapping it
//! to a starting point on the complex plane, and repeatedly squaring
//! that point and adding a fixed constant `c`.  Points that fly off to
//! infinity are coloured by how quickly they do so; points that never
//! leave are black.
//!
//! Every pixel is independent of every other, so the work parallelises
//! at two levels.  A group of ranks deals the image's rows out
//! round-robin, each rank rendering its rows into a private,
//! full-size raster in which every other row stays black.  Inside a
//! rank, threads share the rank's rows in segments.  At the end the
//! ranks' rasters are combined by a reduction that behaves as a
//! disjoint union, and the coordinating rank writes the bitmap.
//!
//! The image is the same, bit for bit, whatever the number of ranks,
//! the number of threads, or the way work was scheduled.

extern crate crossbeam;
extern crate failure;
#[macro_use]
extern crate log;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;

pub mod bitmap;
pub mod collective;
pub mod errors;
pub mod escape;
pub mod job;
pub mod merge;
pub mod partition;
pub mod planes;
pub mod raster;
pub mod render;

pub use collective::{Communicator, LocalGroup, Solo};
pub use errors::Error;
pub use job::{run, Job, Report};
pub use merge::{Merge, Partial};
pub use partition::{RowOwnership, Schedule};
pub use planes::{Position, Viewport};
pub use raster::{Raster, Rgb};
pub use render::Renderer;
