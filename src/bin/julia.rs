// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate juliaset;

use clap::{App, AppSettings, Arg, ArgMatches};
use juliaset::{Job, Merge, Schedule, Viewport};
use std::path::PathBuf;
use std::str::FromStr;

fn validate<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const WIDTH: &str = "WIDTH";
const HEIGHT: &str = "HEIGHT";
const ZOOM: &str = "ZOOM";
const MOVE_X: &str = "MOVE_X";
const MOVE_Y: &str = "MOVE_Y";
const MAX_ITER: &str = "MAX_ITER";
const THREADS: &str = "threads";
const RANKS: &str = "ranks";
const SCHEDULE: &str = "schedule";
const CHUNK: &str = "chunk";
const MERGE: &str = "merge";
const OUTPUT: &str = "output";

const MAX_THREADS: usize = 1024;
const MAX_RANKS: usize = 256;

fn args<'a>() -> ArgMatches<'a> {
    App::new("julia")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Julia set renderer")
        .setting(AppSettings::AllowNegativeNumbers)
        .arg(
            Arg::with_name(WIDTH)
                .required(true)
                .index(1)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        std::i32::MAX as usize,
                        "Could not parse image width",
                        "Image width must be at least 1",
                    )
                })
                .help("Width of the output image in pixels"),
        )
        .arg(
            Arg::with_name(HEIGHT)
                .required(true)
                .index(2)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        std::i32::MAX as usize,
                        "Could not parse image height",
                        "Image height must be at least 1",
                    )
                })
                .help("Height of the output image in pixels"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .required(true)
                .index(3)
                .validator(|s| validate::<f64>(&s, "Could not parse zoom"))
                .help("Magnification; 1 shows the whole set"),
        )
        .arg(
            Arg::with_name(MOVE_X)
                .required(true)
                .index(4)
                .validator(|s| validate::<f64>(&s, "Could not parse horizontal offset"))
                .help("Real part of the point at the centre of the image"),
        )
        .arg(
            Arg::with_name(MOVE_Y)
                .required(true)
                .index(5)
                .validator(|s| validate::<f64>(&s, "Could not parse vertical offset"))
                .help("Imaginary part of the point at the centre of the image"),
        )
        .arg(
            Arg::with_name(MAX_ITER)
                .required(true)
                .index(6)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse iteration count",
                        "Iteration count must be at least 1",
                    )
                })
                .help("Iterations per pixel before a point counts as inside the set"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Number of threads per rank [default: CPU count]"),
        )
        .arg(
            Arg::with_name(RANKS)
                .required(false)
                .long(RANKS)
                .short("r")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_RANKS,
                        "Could not parse rank count",
                        &format!("Rank count must be between 1 and {}", MAX_RANKS),
                    )
                })
                .help("Number of ranks sharing the image's rows"),
        )
        .arg(
            Arg::with_name(SCHEDULE)
                .required(false)
                .long(SCHEDULE)
                .short("s")
                .takes_value(true)
                .possible_values(&["auto", "static", "dynamic"])
                .default_value("auto")
                .help("How threads share a rank's rows"),
        )
        .arg(
            Arg::with_name(CHUNK)
                .required(false)
                .long(CHUNK)
                .short("c")
                .takes_value(true)
                .default_value("64")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse chunk size",
                        "Chunk size must be at least 1",
                    )
                })
                .help("Pixels per work item"),
        )
        .arg(
            Arg::with_name(MERGE)
                .required(false)
                .long(MERGE)
                .short("m")
                .takes_value(true)
                .possible_values(&["or", "select"])
                .default_value("or")
                .help("How the ranks' partial images are combined"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value(juliaset::job::DEFAULT_OUTPUT)
                .help("Output file; .bmp is written top row first, other extensions by format"),
        )
        .get_matches()
}

fn parsed<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, String> {
    matches
        .value_of(name)
        .and_then(|s| T::from_str(s).ok())
        .ok_or_else(|| format!("Could not parse {}", name))
}

fn configure(matches: &ArgMatches) -> Result<Job, String> {
    let viewport = Viewport::new(
        parsed(matches, WIDTH)?,
        parsed(matches, HEIGHT)?,
        parsed(matches, ZOOM)?,
        parsed(matches, MOVE_X)?,
        parsed(matches, MOVE_Y)?,
        parsed(matches, MAX_ITER)?,
    )
    .map_err(|e| e.to_string())?;

    let mut job = Job::new(viewport);
    if matches.is_present(THREADS) {
        job.threads = parsed(matches, THREADS)?;
    }
    job.ranks = parsed(matches, RANKS)?;
    job.schedule = parsed::<Schedule>(matches, SCHEDULE)?;
    job.chunk = parsed(matches, CHUNK)?;
    job.merge = parsed::<Merge>(matches, MERGE)?;
    job.output = PathBuf::from(matches.value_of(OUTPUT).unwrap_or(juliaset::job::DEFAULT_OUTPUT));
    Ok(job)
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();

    let matches = args();
    let job = match configure(&matches) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", matches.usage());
            std::process::exit(1);
        }
    };

    match juliaset::run(&job) {
        Err(e) => {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
        Ok(report) => {
            println!(
                "Compute: {:.6}s, Savefile: {:.6}",
                report.compute.as_secs_f64(),
                report.save.as_secs_f64()
            );
        }
    }
}
