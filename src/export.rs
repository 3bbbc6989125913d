//! iCalendar rendering of a schedule snapshot.
//!
//! Week 0 is anchored on Monday 2025-04-14; an occurrence in week `w` on day
//! `d` lands `7 * w + d` days later. Times are floating local times.

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::catalog;
use crate::engine::ScheduleSnapshot;
use crate::model::{Day, Slot, Week};

const ANCHOR: (i32, u32, u32) = (2025, 4, 14);

const PRODID: &str = "-//slotgrid//EN";

const DTSTART_FORMAT: &str = "%Y%m%dT%H%M%S";

/// "HH:MM" at which a span of `duration` slots starting at `slot` ends.
pub fn end_time(slot: Slot, duration: u8) -> String {
    catalog::format_clock(catalog::span_end_minutes(slot, duration))
}

/// Calendar date and clock time of one occurrence.
pub fn occurrence_start(week: Week, day: Day, slot: Slot) -> Option<NaiveDateTime> {
    let (y, m, d) = ANCHOR;
    let offset = (week * 7 + day.index()) as u64;
    let minutes = catalog::slot_start_minutes(slot);
    NaiveDate::from_ymd_opt(y, m, d)?
        .checked_add_days(Days::new(offset))?
        .and_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Escape TEXT values per RFC 5545 §3.3.11.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Render the whole schedule as a VCALENDAR document with CRLF line endings.
///
/// One VEVENT per committed occurrence and one per reservation (dated in
/// week 0). Every event carries `RRULE:FREQ=WEEKLY`.
pub fn calendar_ics(snapshot: &ScheduleSnapshot) -> String {
    let mut ics = String::new();
    push_line(&mut ics, "BEGIN:VCALENDAR");
    push_line(&mut ics, &format!("PRODID:{PRODID}"));
    push_line(&mut ics, "VERSION:2.0");

    for entry in &snapshot.entries {
        let Some(start) = occurrence_start(entry.week, entry.day, entry.start) else {
            continue;
        };
        let minutes = entry.duration as u32 * catalog::SLOT_MINUTES;
        push_line(&mut ics, "BEGIN:VEVENT");
        push_line(&mut ics, &format!("UID:{}-w{}@slotgrid", entry.meeting_id, entry.week + 1));
        push_line(
            &mut ics,
            &format!("SUMMARY:{} ({})", escape_text(&entry.name), escape_text(&entry.kind)),
        );
        push_line(&mut ics, &format!("DTSTART:{}", start.format(DTSTART_FORMAT)));
        push_line(&mut ics, &format!("DURATION:PT{minutes}M"));
        push_line(&mut ics, "RRULE:FREQ=WEEKLY");
        push_line(
            &mut ics,
            &description_line(&format!(
                "Type: {}, Duration: {minutes} min, Frequency: {}",
                entry.kind,
                entry.frequency.name()
            )),
        );
        push_line(&mut ics, "END:VEVENT");
    }

    for reservation in &snapshot.reservations {
        let Some(start) = occurrence_start(0, reservation.day, reservation.start) else {
            continue;
        };
        let minutes = reservation.duration as u32 * catalog::SLOT_MINUTES;
        push_line(&mut ics, "BEGIN:VEVENT");
        push_line(&mut ics, &format!("UID:{}@slotgrid", reservation.id));
        push_line(&mut ics, "SUMMARY:Reserved (External)");
        push_line(&mut ics, &format!("DTSTART:{}", start.format(DTSTART_FORMAT)));
        push_line(&mut ics, &format!("DURATION:PT{minutes}M"));
        push_line(&mut ics, "RRULE:FREQ=WEEKLY");
        push_line(
            &mut ics,
            &description_line(&format!("External commitment, Duration: {minutes} min")),
        );
        push_line(&mut ics, "END:VEVENT");
    }

    push_line(&mut ics, "END:VCALENDAR");
    ics
}

fn description_line(text: &str) -> String {
    format!("DESCRIPTION:{}", escape_text(text))
}

/// Content lines longer than this many octets are folded.
const FOLD_OCTETS: usize = 75;

/// Append `line` terminated by CRLF, folding it onto continuation lines
/// (CRLF followed by one space) so no physical line exceeds
/// [`FOLD_OCTETS`]. Folds never split a UTF-8 sequence.
fn push_line(ics: &mut String, line: &str) {
    let mut limit = FOLD_OCTETS;
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > limit {
            ics.push_str("\r\n ");
            // The leading space counts against the continuation line.
            limit = FOLD_OCTETS - 1;
            width = 0;
        }
        ics.push(ch);
        width += len;
    }
    ics.push_str("\r\n");
}
