// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A whole run: every rank allocates, renders its rows, joins the
//! reduction, and the coordinator saves the result.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::bitmap::{write_bitmap, BitmapHeader};
use crate::collective::{Communicator, LocalGroup, Solo, COORDINATOR};
use crate::errors::Error;
use crate::merge::{Merge, Partial};
use crate::partition::Schedule;
use crate::planes::Viewport;
use crate::raster::Raster;
use crate::render::{Renderer, DEFAULT_CHUNK};

/// The file written when no other is named.
pub const DEFAULT_OUTPUT: &str = "fractal.bmp";

/// Everything a run needs to know.  Built once, then only read.
#[derive(Clone, Debug)]
pub struct Job {
    /// What to draw.
    pub viewport: Viewport,
    /// Threads per rank.
    pub threads: usize,
    /// Size of the rank group.
    pub ranks: usize,
    /// How threads share a rank's rows.
    pub schedule: Schedule,
    /// Work item length in pixels.
    pub chunk: usize,
    /// How partial images are combined.
    pub merge: Merge,
    /// Where the image goes.
    pub output: PathBuf,
}

impl Job {
    /// A job with the defaults: one rank, one thread per CPU.
    pub fn new(viewport: Viewport) -> Job {
        Job {
            viewport,
            threads: num_cpus::get(),
            ranks: 1,
            schedule: Schedule::Auto,
            chunk: DEFAULT_CHUNK,
            merge: Merge::BitOr,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

/// What the coordinator has to say after a successful run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Report {
    /// Rendering plus reduction, as seen by the coordinator.
    pub compute: Duration,
    /// Encoding and writing the file.
    pub save: Duration,
    /// Checksum of the merged image.
    pub checksum: u64,
}

fn is_bitmap(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(true, |e| e.eq_ignore_ascii_case("bmp"))
}

/// Write `raster` to `path`.  Bitmaps (and extensionless paths) go
/// through this crate's encoder; anything else is handed to the image
/// crate, which picks the format from the extension.
pub fn save(path: &Path, raster: &Raster) -> Result<(), Error> {
    if is_bitmap(path) {
        return write_bitmap(path, raster);
    }

    let encode_failed = |message: String| Error::Encode {
        path: path.display().to_string(),
        message,
    };
    let image = raster
        .to_rgb_image()
        .ok_or_else(|| encode_failed("buffer does not match its dimensions".to_string()))?;
    image.save(path).map_err(|e| encode_failed(e.to_string()))
}

/// One rank's part of the run.  The coordinator gets a report; every
/// other rank gets `None`.
pub fn run_rank<C: Communicator + ?Sized>(comm: &C, job: &Job) -> Result<Option<Report>, Error> {
    let ownership = comm.ownership();
    let mut raster = match Raster::for_viewport(&job.viewport) {
        Ok(raster) => raster,
        Err(err) => {
            error!("rank {}: {}", comm.rank(), err);
            comm.abort(&err.to_string());
            return Err(err);
        }
    };

    let started = Instant::now();
    info!(
        "rank {}/{}: rendering {} of {} rows",
        comm.rank(),
        comm.size(),
        ownership.row_count(job.viewport.height),
        job.viewport.height
    );
    Renderer::new(&job.viewport, ownership).render(
        &mut raster,
        job.threads,
        job.schedule,
        job.chunk,
    )?;
    let merged = comm.reduce(Partial::new(raster, ownership), job.merge)?;
    let compute = started.elapsed();

    let merged = match merged {
        Some(merged) => merged.into_raster(),
        None => return Ok(None),
    };
    let checksum = merged.checksum();
    debug!("merged image checksum {:016x}", checksum);

    let started = Instant::now();
    save(&job.output, &merged)?;
    let saved = started.elapsed();
    info!("wrote {}", job.output.display());

    Ok(Some(Report {
        compute,
        save: saved,
        checksum,
    }))
}

/// Run the job to completion.  A group of one runs on the calling
/// thread; larger groups run as a `LocalGroup`.  When several ranks
/// fail, the first failure that is not merely a reaction to another
/// rank's abort is the one reported.
pub fn run(job: &Job) -> Result<Report, Error> {
    // A bitmap that cannot be written is known before anything is allocated.
    if is_bitmap(&job.output) {
        BitmapHeader::new(job.viewport.width, job.viewport.height)?;
    }

    let mut outcomes = if job.ranks <= 1 {
        vec![run_rank(&Solo, job)]
    } else {
        LocalGroup::new(job.ranks).run(|endpoint| run_rank(endpoint, job))
    };

    let root_cause = outcomes
        .iter()
        .position(|outcome| outcome.as_ref().err().map_or(false, |err| !err.is_abort()));
    match outcomes.swap_remove(root_cause.unwrap_or(COORDINATOR)) {
        Ok(Some(report)) => Ok(report),
        Ok(None) => unreachable!("the coordinator always holds the merged image"),
        Err(err) => Err(err),
    }
}
