use crate::catalog;
use crate::export;
use crate::model::*;

use super::grid::{DayLoad, TimeGrid};
use super::{Engine, Scheduler};

/// Read-only copy of the scheduler state handed to renderers and exporters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSnapshot {
    pub entries: Vec<ScheduleEntry>,
    pub reservations: Vec<Reservation>,
    pub load: DayLoad,
    pub grid: TimeGrid,
}

impl ScheduleSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.reservations.is_empty()
    }

    /// Entries ordered by week, day, then start slot.
    pub fn schedule_rows(&self) -> Vec<ScheduleRow> {
        let mut entries: Vec<&ScheduleEntry> = self.entries.iter().collect();
        entries.sort_by_key(|e| (e.week, e.day, e.start));
        entries
            .into_iter()
            .map(|e| ScheduleRow {
                meeting_id: e.meeting_id,
                week: e.week,
                day: e.day,
                start_time: catalog::slot_time(e.start).unwrap_or_default(),
                end_time: export::end_time(e.start, e.duration),
                name: e.name.clone(),
                kind: e.kind.clone(),
                duration_minutes: e.duration as i64 * catalog::SLOT_MINUTES as i64,
                frequency: e.frequency,
            })
            .collect()
    }

    /// Reservations ordered by day, then start slot.
    pub fn reservation_rows(&self) -> Vec<ReservationRow> {
        let mut reservations: Vec<&Reservation> = self.reservations.iter().collect();
        reservations.sort_by_key(|r| (r.day, r.start));
        reservations
            .into_iter()
            .map(|r| ReservationRow {
                id: r.id,
                day: r.day,
                start_time: catalog::slot_time(r.start).unwrap_or_default(),
                end_time: export::end_time(r.start, r.duration),
                duration_minutes: r.duration as i64 * catalog::SLOT_MINUTES as i64,
            })
            .collect()
    }

    pub fn load_rows(&self) -> Vec<LoadRow> {
        Day::ALL
            .iter()
            .map(|&day| LoadRow {
                day,
                total_hours: self.load.total(day),
                meeting_hours: self.load.meetings(day),
            })
            .collect()
    }
}

impl Scheduler {
    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            entries: self.entries.clone(),
            reservations: self.reservations.clone(),
            load: self.load,
            grid: self.grid.clone(),
        }
    }

    /// Entries of one meeting request, in commit order.
    pub fn occurrences_of(&self, meeting_id: ulid::Ulid) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.meeting_id == meeting_id)
            .collect()
    }
}

impl Engine {
    /// Consistent copy of the current state. Waits for any in-flight mutation.
    pub async fn snapshot(&self) -> ScheduleSnapshot {
        self.scheduler.read().await.snapshot()
    }

    pub async fn schedule_rows(&self) -> Vec<ScheduleRow> {
        self.snapshot().await.schedule_rows()
    }

    pub async fn reservation_rows(&self) -> Vec<ReservationRow> {
        self.snapshot().await.reservation_rows()
    }

    pub async fn load_rows(&self) -> Vec<LoadRow> {
        self.snapshot().await.load_rows()
    }
}
