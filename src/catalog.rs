//! Static reference tables for the four-week grid and the name↔index
//! mappings every other component goes through.

use crate::model::{Day, Frequency, Slot, DAYS, SLOTS};

pub const DAY_NAMES: [&str; DAYS] = ["Monday", "Tuesday", "Wednesday", "Thursday"];

/// Addressable start times. The 12:00–13:00 hour is not in the table, so
/// index 5 ends at 12:00 and index 6 begins at 13:00.
pub const TIME_SLOTS: [&str; SLOTS] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "13:00", "13:30", "14:00", "14:30",
    "15:00", "15:30", "16:00", "16:30",
];

/// Lunch-break timestamps. Only used to reject externally supplied times.
pub const BREAK_SLOTS: [&str; 2] = ["12:00", "12:30"];

pub const FREQUENCY_NAMES: [&str; 4] = ["weekly", "fortnightly", "third_week", "monthly"];

/// Accepted durations in minutes; index + 1 is the slot count.
pub const DURATION_MINUTES: [i64; 3] = [30, 60, 90];

pub const SLOT_MINUTES: u32 = 30;

/// First index after the lunch hour.
const AFTER_BREAK: Slot = 6;

pub fn day_from_name(name: &str) -> Option<Day> {
    DAY_NAMES
        .iter()
        .position(|d| *d == name)
        .and_then(Day::from_index)
}

pub fn day_name(day: Day) -> &'static str {
    DAY_NAMES[day.index()]
}

pub fn slot_from_time(time: &str) -> Option<Slot> {
    TIME_SLOTS.iter().position(|t| *t == time)
}

/// "HH:MM" for a slot index; `None` past the end of the table.
pub fn slot_time(slot: Slot) -> Option<&'static str> {
    TIME_SLOTS.get(slot).copied()
}

pub fn is_break_time(time: &str) -> bool {
    BREAK_SLOTS.contains(&time)
}

pub fn frequency_from_name(name: &str) -> Option<Frequency> {
    match name {
        "weekly" => Some(Frequency::Weekly),
        "fortnightly" => Some(Frequency::Fortnightly),
        "third_week" => Some(Frequency::ThirdWeek),
        "monthly" => Some(Frequency::Monthly),
        _ => None,
    }
}

pub fn frequency_name(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Weekly => FREQUENCY_NAMES[0],
        Frequency::Fortnightly => FREQUENCY_NAMES[1],
        Frequency::ThirdWeek => FREQUENCY_NAMES[2],
        Frequency::Monthly => FREQUENCY_NAMES[3],
    }
}

/// Minutes → slot count, for 30, 60 and 90 only.
pub fn duration_slots(minutes: i64) -> Option<u8> {
    DURATION_MINUTES
        .iter()
        .position(|m| *m == minutes)
        .map(|i| i as u8 + 1)
}

/// Wall-clock start of a slot as minutes since midnight, skipping the
/// lunch hour once the index reaches the afternoon block.
pub fn slot_start_minutes(slot: Slot) -> u32 {
    let mut hour = (slot / 2) as u32 + 9;
    if slot >= AFTER_BREAK {
        hour += 1;
    }
    hour * 60 + (slot % 2) as u32 * SLOT_MINUTES
}

/// Wall-clock end of a span that starts at `slot`, in minutes since midnight.
/// The span is measured from the start time, so a span crossing the break in
/// index space still ends 30 minutes per slot after it starts.
pub fn span_end_minutes(slot: Slot, duration: u8) -> u32 {
    slot_start_minutes(slot) + duration as u32 * SLOT_MINUTES
}

pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
