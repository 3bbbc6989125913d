use crate::model::*;

/// Hours credited per occupied slot.
pub const HOURS_PER_SLOT: f64 = 0.5;

/// Average weekly meeting hours above which a day takes no new meetings.
pub const MEETING_HOURS_CAP: f64 = 2.5;

/// Occupancy map over week × day × slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeGrid {
    blocked: [[[bool; SLOTS]; DAYS]; WEEKS],
}

impl TimeGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Out-of-range coordinates read as blocked.
    pub fn is_blocked(&self, week: Week, day: Day, slot: Slot) -> bool {
        self.blocked
            .get(week)
            .and_then(|w| w[day.index()].get(slot))
            .copied()
            .unwrap_or(true)
    }

    /// Mark `duration` consecutive slots from `start`. The caller has already
    /// checked the span is in range and free.
    pub fn block(&mut self, week: Week, day: Day, start: Slot, duration: u8) {
        for slot in start..start + duration as usize {
            debug_assert!(!self.blocked[week][day.index()][slot], "double booking");
            self.blocked[week][day.index()][slot] = true;
        }
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().flatten().flatten().filter(|b| **b).count()
    }

    pub fn is_clear(&self) -> bool {
        self.blocked_count() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Per-day load counters. `total_hours` includes reservations (counted for all
/// four weeks); `meeting_hours` counts committed meeting occurrences only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayLoad {
    total_hours: [f64; DAYS],
    meeting_hours: [f64; DAYS],
}

impl DayLoad {
    pub fn total(&self, day: Day) -> f64 {
        self.total_hours[day.index()]
    }

    pub fn meetings(&self, day: Day) -> f64 {
        self.meeting_hours[day.index()]
    }

    pub fn add_reservation(&mut self, day: Day, duration: u8) {
        self.total_hours[day.index()] += duration as f64 * HOURS_PER_SLOT * WEEKS as f64;
    }

    /// Credit one committed occurrence.
    pub fn add_occurrence(&mut self, day: Day, duration: u8) {
        let hours = duration as f64 * HOURS_PER_SLOT;
        self.total_hours[day.index()] += hours;
        self.meeting_hours[day.index()] += hours;
    }

    /// True when the day's average weekly meeting load is above the cap.
    /// Reservations do not count toward it.
    pub fn over_meeting_cap(&self, day: Day) -> bool {
        self.meetings(day) / WEEKS as f64 > MEETING_HOURS_CAP
    }

    /// Days from least to most loaded. Stable, so ties keep Monday-first order.
    pub fn day_order(&self) -> [Day; DAYS] {
        let mut order = Day::ALL;
        order.sort_by(|a, b| self.total(*a).total_cmp(&self.total(*b)));
        order
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
