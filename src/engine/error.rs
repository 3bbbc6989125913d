use ulid::Ulid;

use crate::model::{Day, Slot, Week};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    InvalidDay(String),
    InvalidTime(String),
    BreakTime(String),
    InvalidDuration(i64),
    InvalidFrequency(String),
    LimitExceeded(&'static str),
    OutsideBusinessHours {
        start: Slot,
        duration: u8,
    },
    Infeasible,
    /// A weekly-family commit ran out of weeks after committing some
    /// occurrences. Those occurrences stay in the schedule.
    PartialCommit {
        meeting_id: Ulid,
        day: Day,
        start: Slot,
        committed: Vec<Week>,
        required: usize,
    },
}

impl ScheduleError {
    /// True for input errors rejected before any grid lookup.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScheduleError::InvalidDay(_)
                | ScheduleError::InvalidTime(_)
                | ScheduleError::BreakTime(_)
                | ScheduleError::InvalidDuration(_)
                | ScheduleError::InvalidFrequency(_)
                | ScheduleError::LimitExceeded(_)
        )
    }
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::InvalidDay(d) => write!(f, "unknown day: {d:?}"),
            ScheduleError::InvalidTime(t) => write!(f, "unknown start time: {t:?}"),
            ScheduleError::BreakTime(t) => write!(f, "start time {t} falls in the lunch break"),
            ScheduleError::InvalidDuration(m) => {
                write!(f, "invalid duration: {m} minutes (expected 30, 60 or 90)")
            }
            ScheduleError::InvalidFrequency(s) => write!(f, "unknown frequency: {s:?}"),
            ScheduleError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            ScheduleError::OutsideBusinessHours { start, duration } => write!(
                f,
                "{duration} slot(s) from slot {start} fall outside business hours"
            ),
            ScheduleError::Infeasible => write!(f, "no free day/time satisfies the request"),
            ScheduleError::PartialCommit {
                meeting_id,
                committed,
                required,
                ..
            } => write!(
                f,
                "meeting {meeting_id} only placed {} of {required} occurrences (weeks {committed:?})",
                committed.len()
            ),
        }
    }
}

impl std::error::Error for ScheduleError {}
