// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Combining partial images.  Each rank contributes a full-size
//! raster in which only its own rows are drawn.  Because no two ranks
//! own the same row, a union of the partials is the whole image.
//!
//! Two union operators are offered.  `BitOr` is the classic one: OR
//! every channel of every pixel.  It only works because unowned cells
//! are black and owned cells of different ranks never coincide; OR is
//! not a blend.  `Select` carries explicit row tags alongside the
//! raster and copies whole rows, refusing to merge two partials that
//! claim the same row.

use std::fmt;
use std::str::FromStr;

use crate::errors::Error;
use crate::partition::RowOwnership;
use crate::raster::Raster;

/// A rank's contribution to the reduction: its raster, plus which
/// rows of it are authoritative.
#[derive(Clone, Debug, PartialEq)]
pub struct Partial {
    /// The full-size raster.
    pub raster: Raster,
    owned: Vec<bool>,
}

impl Partial {
    /// Wrap a rendered raster, tagging the rows `ownership` assigns.
    pub fn new(raster: Raster, ownership: RowOwnership) -> Partial {
        let owned = (0..raster.height()).map(|y| ownership.owns(y)).collect();
        Partial { raster, owned }
    }

    /// The identity of both operators: a blank raster owning nothing.
    pub fn empty(width: usize, height: usize) -> Result<Partial, Error> {
        Ok(Partial {
            raster: Raster::try_new(width, height)?,
            owned: vec![false; height],
        })
    }

    /// Is row `y` drawn in this partial?  Rows past the bottom of the
    /// image are never owned.
    pub fn owns(&self, y: usize) -> bool {
        self.owned.get(y).cloned().unwrap_or(false)
    }

    /// True once every row of the image is accounted for.
    pub fn is_complete(&self) -> bool {
        self.owned.iter().all(|&o| o)
    }

    /// Drop the tags.
    pub fn into_raster(self) -> Raster {
        self.raster
    }
}

/// The combine operator for the reduction.  Both are associative and
/// commutative over partials with disjoint rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Merge {
    /// Channel-wise bitwise OR of every pixel.
    BitOr,
    /// Copy the rows the incoming partial owns; overlapping owners
    /// are an error.
    Select,
}

impl Default for Merge {
    fn default() -> Merge {
        Merge::BitOr
    }
}

impl Merge {
    /// Fold `incoming` into `acc`.
    pub fn combine(self, acc: &mut Partial, incoming: &Partial) -> Result<(), Error> {
        assert!(
            acc.raster.width() == incoming.raster.width()
                && acc.raster.height() == incoming.raster.height(),
            "partials of different shapes cannot be merged"
        );
        match self {
            Merge::BitOr => acc.raster.or_assign(&incoming.raster),
            Merge::Select => {
                for y in 0..incoming.raster.height() {
                    if !incoming.owned[y] {
                        continue;
                    }
                    if acc.owned[y] {
                        return Err(Error::Overlap { row: y });
                    }
                    acc.raster.row_mut(y).copy_from_slice(incoming.raster.row(y));
                }
            }
        }
        for (mine, theirs) in acc.owned.iter_mut().zip(incoming.owned.iter()) {
            *mine |= *theirs;
        }
        Ok(())
    }

    /// Fold every partial, in order, into the first.
    pub fn reduce<I>(self, partials: I) -> Result<Option<Partial>, Error>
    where
        I: IntoIterator<Item = Partial>,
    {
        let mut partials = partials.into_iter();
        let mut acc = match partials.next() {
            Some(first) => first,
            None => return Ok(None),
        };
        for partial in partials {
            self.combine(&mut acc, &partial)?;
        }
        Ok(Some(acc))
    }
}

impl FromStr for Merge {
    type Err = String;

    fn from_str(s: &str) -> Result<Merge, String> {
        match s {
            "or" => Ok(Merge::BitOr),
            "select" => Ok(Merge::Select),
            _ => Err(format!("Unknown merge operator '{}'", s)),
        }
    }
}

impl fmt::Display for Merge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Merge::BitOr => write!(f, "or"),
            Merge::Select => write!(f, "select"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Schedule;
    use crate::planes::Viewport;
    use crate::raster::Rgb;
    use crate::render::Renderer;
    use rand::seq::SliceRandom;

    fn partials(vp: &Viewport, ranks: usize) -> Vec<Partial> {
        (0..ranks)
            .map(|rank| {
                let own = RowOwnership::new(rank, ranks);
                let mut raster = Raster::for_viewport(vp).unwrap();
                Renderer::new(vp, own).render(&mut raster, 2, Schedule::Auto, 16).unwrap();
                Partial::new(raster, own)
            })
            .collect()
    }

    fn whole(vp: &Viewport) -> Raster {
        let mut raster = Raster::for_viewport(vp).unwrap();
        Renderer::new(vp, RowOwnership::everything()).render_single(&mut raster);
        raster
    }

    #[test]
    fn both_operators_rebuild_the_single_rank_image() {
        let vp = Viewport::new(40, 33, 1.3, 0.1, -0.05, 150).unwrap();
        let expected = whole(&vp);
        for &merge in &[Merge::BitOr, Merge::Select] {
            for ranks in 2..7 {
                let merged = merge.reduce(partials(&vp, ranks)).unwrap().unwrap();
                assert!(merged.is_complete());
                assert_eq!(merged.into_raster(), expected, "{} over {} ranks", merge, ranks);
            }
        }
    }

    #[test]
    fn merge_order_does_not_matter() {
        let vp = Viewport::new(30, 25, 1.0, 0.0, 0.0, 100).unwrap();
        let expected = whole(&vp);
        let mut rng = rand::thread_rng();
        for &merge in &[Merge::BitOr, Merge::Select] {
            for _ in 0..5 {
                let mut parts = partials(&vp, 5);
                parts.shuffle(&mut rng);
                let merged = merge.reduce(parts).unwrap().unwrap();
                assert_eq!(merged.raster, expected);
            }
        }
    }

    #[test]
    fn empty_partial_is_the_identity() {
        let vp = Viewport::new(20, 10, 1.0, 0.0, 0.0, 80).unwrap();
        for &merge in &[Merge::BitOr, Merge::Select] {
            let original = Partial::new(whole(&vp), RowOwnership::everything());
            let mut acc = original.clone();
            merge.combine(&mut acc, &Partial::empty(20, 10).unwrap()).unwrap();
            assert_eq!(acc, original);

            let mut acc = Partial::empty(20, 10).unwrap();
            merge.combine(&mut acc, &original).unwrap();
            assert_eq!(acc, original);
        }
    }

    #[test]
    fn select_refuses_overlapping_rows() {
        let mut a = Partial::new(Raster::try_new(4, 4).unwrap(), RowOwnership::new(1, 2));
        let b = Partial::new(Raster::try_new(4, 4).unwrap(), RowOwnership::new(1, 3));
        match Merge::Select.combine(&mut a, &b) {
            Err(Error::Overlap { row }) => assert_eq!(row, 1),
            other => panic!("expected an overlap, got {:?}", other),
        }
    }

    #[test]
    fn or_corrupts_overlapping_colours() {
        // The reason OR needs the disjoint-rows invariant.
        let mut a = Partial::new(Raster::try_new(1, 1).unwrap(), RowOwnership::everything());
        let mut b = a.clone();
        a.raster.set(0, 0, Rgb { r: 0b01, g: 0, b: 0 });
        b.raster.set(0, 0, Rgb { r: 0b10, g: 0, b: 0 });
        Merge::BitOr.combine(&mut a, &b).unwrap();
        assert_eq!(a.raster.get(0, 0).r, 0b11);
    }

    #[test]
    fn row_tags_follow_ownership() {
        let part = Partial::new(Raster::try_new(2, 5).unwrap(), RowOwnership::new(1, 2));
        assert!(part.owns(1) && part.owns(3));
        assert!(!part.owns(0) && !part.owns(4));
        assert!(!part.owns(5));
        assert!(!part.owns(usize::max_value()));
    }

    #[test]
    fn reducing_nothing_yields_nothing() {
        assert_eq!(Merge::BitOr.reduce(Vec::new()).unwrap(), None);
    }

    #[test]
    fn operators_parse() {
        assert_eq!("or".parse::<Merge>(), Ok(Merge::BitOr));
        assert_eq!("select".parse::<Merge>(), Ok(Merge::Select));
        assert!("xor".parse::<Merge>().is_err());
    }
}
