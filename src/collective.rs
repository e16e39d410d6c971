// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The rank-level runtime.  A `Communicator` is everything a rank
//! knows about its group: who it is, how many of them there are, how
//! to take part in the one reduction of the run, and how to bring the
//! whole group down when it cannot continue.
//!
//! `Solo` is the group of one.  `LocalGroup` runs a group of ranks as
//! scoped threads that share no memory and talk only through
//! channels; a binding to a message-passing runtime would implement
//! the same trait.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::errors::Error;
use crate::merge::{Merge, Partial};
use crate::partition::RowOwnership;

/// The rank that receives the reduced image and writes it out.
pub const COORDINATOR: usize = 0;

/// One rank's view of its group.
pub trait Communicator {
    /// This rank, in `[0, size)`.
    fn rank(&self) -> usize;

    /// The number of ranks in the group.
    fn size(&self) -> usize;

    /// Is this the rank that ends up holding the merged image?
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// The rows this rank renders.
    fn ownership(&self) -> RowOwnership {
        RowOwnership::new(self.rank(), self.size())
    }

    /// Blocking collective: every rank contributes its partial, and
    /// the coordinator gets back the combination of all of them.
    /// Other ranks get `None`.
    fn reduce(&self, local: Partial, merge: Merge) -> Result<Option<Partial>, Error>;

    /// Tell every other rank to give up.  Ranks blocked in `reduce`
    /// return `Error::Aborted` instead of waiting forever.
    fn abort(&self, reason: &str);
}

/// A group of one.  The reduction is a no-op.
#[derive(Copy, Clone, Debug, Default)]
pub struct Solo;

impl Communicator for Solo {
    fn rank(&self) -> usize {
        COORDINATOR
    }

    fn size(&self) -> usize {
        1
    }

    fn reduce(&self, local: Partial, _merge: Merge) -> Result<Option<Partial>, Error> {
        Ok(Some(local))
    }

    fn abort(&self, reason: &str) {
        error!("aborting: {}", reason);
    }
}

enum Message {
    Partial { from: usize, partial: Partial },
    Abort { from: usize, reason: String },
}

/// One member of a `LocalGroup`.
pub struct Endpoint {
    rank: usize,
    inbox: Receiver<Message>,
    peers: Vec<Sender<Message>>,
}

impl Endpoint {
    /// Wait for the partial from `source`, setting aside any that
    /// arrive from other ranks first.
    fn receive_from(
        &self,
        source: usize,
        stash: &mut HashMap<usize, Partial>,
    ) -> Result<Partial, Error> {
        if let Some(partial) = stash.remove(&source) {
            return Ok(partial);
        }
        loop {
            match self.inbox.recv() {
                Ok(Message::Partial { from, partial }) => {
                    if from == source {
                        return Ok(partial);
                    }
                    stash.insert(from, partial);
                }
                Ok(Message::Abort { from, reason }) => {
                    return Err(Error::Aborted { rank: from, reason });
                }
                Err(_) => {
                    return Err(Error::Aborted {
                        rank: source,
                        reason: "the group went away".to_string(),
                    });
                }
            }
        }
    }
}

impl Communicator for Endpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    /// Binomial tree: at step `s` a rank divisible by `2s` absorbs the
    /// partial of rank `+ s`, and every other rank hands its
    /// accumulated partial to rank `- s` and is done.
    fn reduce(&self, local: Partial, merge: Merge) -> Result<Option<Partial>, Error> {
        let mut acc = local;
        let mut stash = HashMap::new();
        let mut step = 1;
        while step < self.size() {
            if self.rank % (2 * step) == 0 {
                let source = self.rank + step;
                if source < self.size() {
                    let incoming = self.receive_from(source, &mut stash)?;
                    merge.combine(&mut acc, &incoming)?;
                    debug!("rank {}: merged partial from rank {}", self.rank, source);
                }
            } else {
                let target = self.rank - step;
                let message = Message::Partial {
                    from: self.rank,
                    partial: acc,
                };
                self.peers[target]
                    .send(message)
                    .map_err(|_| Error::Aborted {
                        rank: target,
                        reason: "stopped listening".to_string(),
                    })?;
                return Ok(None);
            }
            step *= 2;
        }
        Ok(Some(acc))
    }

    fn abort(&self, reason: &str) {
        error!("rank {} aborting the group: {}", self.rank, reason);
        for (rank, peer) in self.peers.iter().enumerate() {
            if rank != self.rank {
                // A peer that already finished has nothing left to wake.
                let _ = peer.send(Message::Abort {
                    from: self.rank,
                    reason: reason.to_string(),
                });
            }
        }
    }
}

/// A group of ranks run as threads of this process.
pub struct LocalGroup {
    endpoints: Vec<Endpoint>,
}

impl LocalGroup {
    /// Wire up `size` ranks, each able to message every other.
    pub fn new(size: usize) -> LocalGroup {
        assert!(size >= 1, "a group needs at least one rank");
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        let endpoints = receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Endpoint {
                rank,
                inbox,
                peers: senders.clone(),
            })
            .collect();
        LocalGroup { endpoints }
    }

    /// The number of ranks.
    pub fn size(&self) -> usize {
        self.endpoints.len()
    }

    /// Run `body` once per rank, concurrently, and collect each
    /// rank's outcome in rank order.  A rank that fails or panics
    /// aborts the group on its way out.
    pub fn run<F, T>(self, body: F) -> Vec<Result<T, Error>>
    where
        F: Fn(&Endpoint) -> Result<T, Error> + Sync,
        T: Send,
    {
        let size = self.size();
        let body = &body;
        let outcome = crossbeam::scope(|spawner| {
            let handles: Vec<_> = self
                .endpoints
                .into_iter()
                .map(|endpoint| {
                    spawner.spawn(move |_| {
                        match panic::catch_unwind(AssertUnwindSafe(|| body(&endpoint))) {
                            Ok(Ok(value)) => Ok(value),
                            Ok(Err(err)) => {
                                if !err.is_abort() {
                                    endpoint.abort(&err.to_string());
                                }
                                Err(err)
                            }
                            Err(_) => {
                                endpoint.abort("panicked");
                                Err(Error::WorkerPanic)
                            }
                        }
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(Err(Error::WorkerPanic)))
                .collect::<Vec<_>>()
        });
        outcome.unwrap_or_else(|_| (0..size).map(|_| Err(Error::WorkerPanic)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::Viewport;
    use crate::raster::{Raster, Rgb};
    use crate::render::Renderer;

    fn reference(vp: &Viewport) -> Raster {
        let mut raster = Raster::for_viewport(vp).unwrap();
        Renderer::new(vp, RowOwnership::everything()).render_single(&mut raster);
        raster
    }

    fn render_and_reduce(
        comm: &dyn Communicator,
        vp: &Viewport,
        merge: Merge,
    ) -> Result<Option<Raster>, Error> {
        let own = comm.ownership();
        let mut raster = Raster::for_viewport(vp)?;
        Renderer::new(vp, own).render_single(&mut raster);
        Ok(comm.reduce(Partial::new(raster, own), merge)?.map(Partial::into_raster))
    }

    #[test]
    fn solo_reduction_is_a_no_op() {
        let vp = Viewport::new(12, 9, 1.0, 0.0, 0.0, 60).unwrap();
        let result = render_and_reduce(&Solo, &vp, Merge::BitOr).unwrap();
        assert_eq!(result, Some(reference(&vp)));
        assert!(Solo.is_coordinator());
    }

    #[test]
    fn group_reduction_lands_on_the_coordinator() {
        let vp = Viewport::new(33, 21, 1.0, 0.0, 0.0, 90).unwrap();
        let expected = reference(&vp);
        for size in 1..8 {
            for &merge in &[Merge::BitOr, Merge::Select] {
                let results = LocalGroup::new(size).run(|ep| render_and_reduce(ep, &vp, merge));
                assert_eq!(results.len(), size);
                for (rank, result) in results.into_iter().enumerate() {
                    let result = result.unwrap();
                    if rank == COORDINATOR {
                        assert_eq!(result.as_ref(), Some(&expected), "size={}", size);
                    } else {
                        assert!(result.is_none());
                    }
                }
            }
        }
    }

    #[test]
    fn endpoints_know_their_place() {
        let ranks = LocalGroup::new(3).run(|ep| Ok((ep.rank(), ep.size(), ep.is_coordinator())));
        let ranks: Vec<_> = ranks.into_iter().map(Result::unwrap).collect();
        assert_eq!(ranks, vec![(0, 3, true), (1, 3, false), (2, 3, false)]);
    }

    #[test]
    fn a_failing_rank_does_not_strand_the_others() {
        let results = LocalGroup::new(4).run(|ep| {
            if ep.rank() == 2 {
                return Err(Error::Allocation {
                    width: 1,
                    height: 1,
                });
            }
            let partial = Partial::empty(2, 4)?;
            ep.reduce(partial, Merge::BitOr).map(|_| ())
        });
        match &results[2] {
            Err(Error::Allocation { .. }) => (),
            other => panic!("rank 2 should report its own failure, got {:?}", other),
        }
        match &results[COORDINATOR] {
            Err(Error::Aborted { rank, .. }) => assert_eq!(*rank, 2),
            other => panic!("the coordinator should have been aborted, got {:?}", other),
        }
    }

    #[test]
    fn a_panicking_rank_aborts_the_group() {
        let results = LocalGroup::new(2).run(|ep| {
            if ep.rank() == 1 {
                panic!("boom");
            }
            ep.reduce(Partial::empty(1, 2)?, Merge::BitOr).map(|_| ())
        });
        assert!(results[0].as_ref().err().map_or(false, Error::is_abort));
        match results[1] {
            Err(Error::WorkerPanic) => (),
            ref other => panic!("expected a worker panic, got {:?}", other),
        }
    }

    #[test]
    fn out_of_order_arrivals_are_stashed() {
        // Rank 0 waits on rank 1 first, but rank 2 reports immediately.
        let results = LocalGroup::new(3).run(|ep| {
            let own = ep.ownership();
            let mut raster = Raster::try_new(1, 3)?;
            raster.set(0, ep.rank(), Rgb { r: 1 + ep.rank() as u8, g: 0, b: 0 });
            if ep.rank() == 1 {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            ep.reduce(Partial::new(raster, own), Merge::Select)
        });
        let merged = results.into_iter().next().unwrap().unwrap().unwrap();
        assert!(merged.is_complete());
        let reds: Vec<u8> = (0..3).map(|y| merged.raster.get(0, y).r).collect();
        assert_eq!(reds, vec![1, 2, 3]);
    }
}
