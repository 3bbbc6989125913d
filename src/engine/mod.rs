mod error;
mod feasibility;
mod grid;
mod mutations;
mod planner;
mod queries;
mod reservation;
mod scheduler;
mod validate;

pub use error::ScheduleError;
pub use feasibility::{can_place, free_in_all_weeks, within_business_hours, DAY_END_MINUTES};
pub use grid::{DayLoad, TimeGrid, HOURS_PER_SLOT, MEETING_HOURS_CAP};
pub use queries::ScheduleSnapshot;
pub use scheduler::Scheduler;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::*;
use crate::notify::NotifyHub;

/// Shared front of one [`Scheduler`].
///
/// Every mutation holds the write lock for its whole duration; snapshots take
/// the read lock. Reads therefore run alongside each other but never see a
/// half-applied mutation.
pub struct Engine {
    scheduler: RwLock<Scheduler>,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new(scheduler: Scheduler, notify: Arc<NotifyHub>) -> Self {
        Self {
            scheduler: RwLock::new(scheduler),
            notify,
        }
    }

    /// Engine with deterministic week shuffles when `seed` is set.
    pub fn with_seed(seed: Option<u64>, notify: Arc<NotifyHub>) -> Self {
        let scheduler = match seed {
            Some(seed) => Scheduler::with_seed(seed),
            None => Scheduler::new(),
        };
        Self::new(scheduler, notify)
    }

    /// Publish after the write lock is released.
    fn publish(&self, event: &Event) {
        if self.notify.receiver_count() > 0 {
            tracing::debug!(payload = %event.payload(), "schedule changed");
        }
        self.notify.send(event);
    }
}
