use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::model::*;

use super::grid::{DayLoad, TimeGrid};

/// Aggregate root: exclusively owns the occupancy grid, the load counters,
/// both record lists and the random source used for week shuffles.
///
/// All operations are synchronous. Shared use goes through [`super::Engine`],
/// which serializes mutations behind one lock.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub(super) grid: TimeGrid,
    pub(super) load: DayLoad,
    pub(super) reservations: Vec<Reservation>,
    pub(super) entries: Vec<ScheduleEntry>,
    pub(super) rng: ChaCha8Rng,
}

impl Scheduler {
    /// Scheduler with an OS-seeded shuffle source.
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_os_rng())
    }

    /// Scheduler whose week shuffles are fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            grid: TimeGrid::new(),
            load: DayLoad::default(),
            reservations: Vec::new(),
            entries: Vec::new(),
            rng,
        }
    }

    /// Drop every reservation and schedule entry. The only removal path.
    /// The random source keeps its position.
    pub fn reset(&mut self) {
        self.grid.clear();
        self.load.clear();
        self.reservations.clear();
        self.entries.clear();
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn load(&self) -> &DayLoad {
        &self.load
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
