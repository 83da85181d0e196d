use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use itertools::Itertools;

use crate::map::GeoPoint;

/// Points per sealed chunk. Sealed chunks are immutable and shared by every
/// snapshot taken after they were sealed.
const CHUNK_LEN: usize = 256;

#[derive(Debug, Default)]
struct Chunks {
    sealed: Vec<Arc<[GeoPoint]>>,
    tail: Vec<GeoPoint>,
}

/// Append-only, chronologically ordered record of every position the vehicle
/// reported with a GPS fix.
///
/// Cloning yields another handle onto the same history. The link thread is the
/// only writer; render paths call [`TrackHistory::snapshot`] and iterate the
/// result without holding the lock. A snapshot copies at most one partially
/// filled chunk, the rest is shared.
#[derive(Debug, Clone, Default)]
pub struct TrackHistory {
    inner: Arc<RwLock<Chunks>>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, point: GeoPoint) {
        let mut chunks = self.write();
        chunks.tail.push(point);
        if chunks.tail.len() == CHUNK_LEN {
            let sealed: Arc<[GeoPoint]> = std::mem::take(&mut chunks.tail).into();
            chunks.sealed.push(sealed);
            chunks.tail.reserve(CHUNK_LEN);
        }
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        let chunks = self.read();
        TrackSnapshot {
            sealed: chunks.sealed.clone(),
            tail: chunks.tail.clone(),
        }
    }

    pub fn len(&self) -> usize {
        let chunks = self.read();
        chunks.sealed.len() * CHUNK_LEN + chunks.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<GeoPoint> {
        let chunks = self.read();
        chunks
            .tail
            .last()
            .or_else(|| chunks.sealed.last().and_then(|chunk| chunk.last()))
            .copied()
    }

    // a panicking writer can only leave a fully pushed point behind, so the data stays usable
    fn read(&self) -> RwLockReadGuard<'_, Chunks> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Chunks> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only view of a [`TrackHistory`] at the time it was taken
#[derive(Debug, Clone, Default)]
pub struct TrackSnapshot {
    sealed: Vec<Arc<[GeoPoint]>>,
    tail: Vec<GeoPoint>,
}

impl TrackSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &GeoPoint> {
        self.sealed
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    /// Consecutive pairs of points, in recording order
    pub fn segments(&self) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
        self.iter().copied().tuple_windows::<(GeoPoint, GeoPoint)>()
    }

    pub fn len(&self) -> usize {
        self.sealed.iter().map(|chunk| chunk.len()).sum::<usize>() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<GeoPoint> {
        self.tail
            .last()
            .or_else(|| self.sealed.last().and_then(|chunk| chunk.last()))
            .copied()
    }
}

impl From<Vec<GeoPoint>> for TrackSnapshot {
    fn from(points: Vec<GeoPoint>) -> Self {
        Self {
            sealed: Vec::new(),
            tail: points,
        }
    }
}
