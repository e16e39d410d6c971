// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The local renderer: one rank's share of the image, drawn into a
//! full-size raster with as many threads as it was given.  Every cell
//! the rank does not own is left black.

use itertools::iproduct;
use std::sync::{Arc, Mutex};

use crate::errors::Error;
use crate::escape::julia_pixel;
use crate::partition::{static_blocks, RowOwnership, Schedule};
use crate::planes::{Position, Viewport};
use crate::raster::{Raster, Rgb};

/// The default length, in pixels, of one work item.
pub const DEFAULT_CHUNK: usize = 64;

/// A run of pixels within one row; the unit of work handed to a
/// thread.  Segments never overlap, so threads need no locks to write
/// them.
struct Segment<'a> {
    row: usize,
    column: usize,
    cells: &'a mut [Rgb],
}

type WorkQueue<'a> = Arc<Mutex<std::vec::IntoIter<Segment<'a>>>>;

/// Renders the rows a rank owns.
#[derive(Copy, Clone, Debug)]
pub struct Renderer {
    viewport: Viewport,
    ownership: RowOwnership,
}

impl Renderer {
    /// A renderer for `ownership`'s rows of `viewport`.
    pub fn new(viewport: &Viewport, ownership: RowOwnership) -> Self {
        Renderer {
            viewport: *viewport,
            ownership,
        }
    }

    /// The viewport being rendered.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The rows being rendered.
    pub fn ownership(&self) -> RowOwnership {
        self.ownership
    }

    fn check_shape(&self, raster: &Raster) {
        assert!(
            raster.width() == self.viewport.width && raster.height() == self.viewport.height,
            "a {}x{} raster cannot hold a {}x{} viewport",
            raster.width(),
            raster.height(),
            self.viewport.width,
            self.viewport.height
        );
    }

    /// The single-threaded renderer.  Mostly useful as the yardstick
    /// the threaded one is measured against.
    pub fn render_single(&self, raster: &mut Raster) {
        self.check_shape(raster);
        let owned = iproduct!(self.ownership.rows(self.viewport.height), 0..self.viewport.width);
        for (row, column) in owned {
            raster.set(column, row, julia_pixel(&self.viewport, &Position(column, row)));
        }
    }

    /// Cut the owned rows into segments of at most `chunk` pixels.
    fn segments<'a>(&self, raster: &'a mut Raster, chunk: usize) -> Vec<Segment<'a>> {
        let ownership = self.ownership;
        let chunk = chunk.max(1);
        raster
            .rows_mut()
            .enumerate()
            .filter(move |(row, _)| ownership.owns(*row))
            .flat_map(move |(row, cells)| {
                cells
                    .chunks_mut(chunk)
                    .enumerate()
                    .map(move |(i, cells)| Segment {
                        row,
                        column: i * chunk,
                        cells,
                    })
            })
            .collect()
    }

    fn paint(&self, segment: Segment) {
        let Segment { row, column, cells } = segment;
        for (offset, cell) in cells.iter_mut().enumerate() {
            *cell = julia_pixel(&self.viewport, &Position(column + offset, row));
        }
    }

    /// The multi-threaded renderer.  Forks `threads` workers, hands
    /// them segments of at most `chunk` pixels under `schedule`, and
    /// returns once they have all joined.
    pub fn render(
        &self,
        raster: &mut Raster,
        threads: usize,
        schedule: Schedule,
        chunk: usize,
    ) -> Result<(), Error> {
        self.check_shape(raster);
        let threads = threads.max(1);
        let schedule = schedule.resolve(self.ownership.ranks());
        let segments = self.segments(raster, chunk);
        debug!(
            "rank {}: {} rows as {} work items on {} threads, {} schedule",
            self.ownership.rank(),
            self.ownership.row_count(self.viewport.height),
            segments.len(),
            threads,
            schedule
        );

        match schedule {
            Schedule::Dynamic => self.render_dynamic(segments, threads),
            _ => self.render_static(segments, threads),
        }
    }

    fn render_static(&self, mut segments: Vec<Segment>, threads: usize) -> Result<(), Error> {
        let blocks = static_blocks(segments.len(), threads);
        crossbeam::scope(|spawner| {
            for len in blocks {
                let rest = segments.split_off(len);
                let block = std::mem::replace(&mut segments, rest);
                spawner.spawn(move |_| {
                    for segment in block {
                        self.paint(segment);
                    }
                });
            }
        })
        .map_err(|_| Error::WorkerPanic)
    }

    fn render_dynamic(&self, segments: Vec<Segment>, threads: usize) -> Result<(), Error> {
        let queue: WorkQueue = Arc::new(Mutex::new(segments.into_iter()));
        crossbeam::scope(|spawner| {
            for _ in 0..threads {
                let queue = queue.clone();
                spawner.spawn(move |_| loop {
                    let segment = match queue.lock() {
                        Ok(mut segments) => segments.next(),
                        Err(_) => None,
                    };
                    match segment {
                        Some(segment) => self.paint(segment),
                        None => break,
                    }
                });
            }
        })
        .map_err(|_| Error::WorkerPanic)
    }
}
