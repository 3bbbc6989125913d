use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::catalog;

pub const WEEKS: usize = 4;
pub const DAYS: usize = 4;
pub const SLOTS: usize = 14;

/// Week ordinal, 0..4.
pub type Week = usize;

/// Index into the slot table, 0..14.
pub type Slot = usize;

/// The only week pairings a fortnightly meeting may occupy.
pub const FORTNIGHT_PAIRS: [[Week; 2]; 2] = [[0, 2], [1, 3]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
}

impl Day {
    pub const ALL: [Day; DAYS] = [Day::Monday, Day::Tuesday, Day::Wednesday, Day::Thursday];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Day> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        catalog::day_name(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    Fortnightly,
    /// Single occurrence; currently indistinguishable from `Monthly`.
    ThirdWeek,
    Monthly,
}

impl Frequency {
    /// Number of weeks a request of this frequency occupies in the grid.
    pub fn occurrences(self) -> usize {
        match self {
            Frequency::Weekly => 4,
            Frequency::Fortnightly => 2,
            Frequency::ThirdWeek | Frequency::Monthly => 1,
        }
    }

    pub fn name(self) -> &'static str {
        catalog::frequency_name(self)
    }
}

/// An external commitment that repeats identically in all four weeks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub day: Day,
    pub start: Slot,
    /// Length in 30-minute slots (1..=3).
    pub duration: u8,
}

/// A validated meeting request. Transient: only its committed
/// occurrences are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRequest {
    pub name: String,
    /// Free-form label such as "One-to-one" or "Design".
    pub kind: String,
    pub duration: u8,
    /// Start slots to try, in the order given.
    pub preferred: Vec<Slot>,
    pub fixed_day: Option<Day>,
    pub fixed_start: Option<Slot>,
    pub frequency: Frequency,
}

/// Raw meeting input as it arrives from a client, before validation.
/// Empty strings in the optional fields mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingForm {
    pub name: String,
    pub kind: String,
    pub duration_minutes: i64,
    pub preferred_times: Vec<String>,
    pub fixed_day: Option<String>,
    pub fixed_time: Option<String>,
    pub frequency: String,
}

/// One committed occurrence of a meeting in a specific week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Shared by every occurrence committed from the same request.
    pub meeting_id: Ulid,
    pub week: Week,
    pub day: Day,
    pub start: Slot,
    pub name: String,
    pub kind: String,
    pub duration: u8,
    pub frequency: Frequency,
}

impl ScheduleEntry {
    pub fn overlaps(&self, week: Week, day: Day, start: Slot, duration: u8) -> bool {
        self.week == week
            && self.day == day
            && self.start < start + duration as usize
            && start < self.start + self.duration as usize
    }
}

/// Outcome of a successful meeting placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub meeting_id: Ulid,
    pub day: Day,
    pub start: Slot,
    /// Weeks committed, in commit order.
    pub weeks: Vec<Week>,
}

/// Change notifications published after each successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationAdded {
        id: Ulid,
        day: Day,
        start: Slot,
        duration: u8,
    },
    MeetingScheduled {
        meeting_id: Ulid,
        name: String,
        day: Day,
        start: Slot,
        duration: u8,
        weeks: Vec<Week>,
    },
    ScheduleReset,
}

impl Event {
    /// JSON form used for notification payloads.
    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub meeting_id: Ulid,
    pub week: Week,
    pub day: Day,
    pub start_time: &'static str,
    pub end_time: String,
    pub name: String,
    pub kind: String,
    pub duration_minutes: i64,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRow {
    pub id: Ulid,
    pub day: Day,
    pub start_time: &'static str,
    pub end_time: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadRow {
    pub day: Day,
    pub total_hours: f64,
    pub meeting_hours: f64,
}
