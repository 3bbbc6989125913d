use crate::catalog;
use crate::model::*;

use super::grid::TimeGrid;

/// Latest permitted end of any span, minutes since midnight (17:00).
pub const DAY_END_MINUTES: u32 = 17 * 60;

/// Week-independent part of the check: the span starts on a real slot, ends by
/// 17:00 and stays inside the slot table.
pub fn within_business_hours(start: Slot, duration: u8) -> bool {
    let Some(start_time) = catalog::slot_time(start) else {
        return false;
    };
    if catalog::is_break_time(start_time) {
        return false;
    }
    // Inclusive: a span ending exactly at 17:00 fits.
    if catalog::span_end_minutes(start, duration) > DAY_END_MINUTES {
        return false;
    }
    (start..start + duration as usize).all(|slot| {
        catalog::slot_time(slot).is_some_and(|t| !catalog::is_break_time(t))
    })
}

/// Whether `duration` slots from `start` can be placed on `day` of `week`.
/// Pure predicate over the grid.
pub fn can_place(grid: &TimeGrid, week: Week, day: Day, start: Slot, duration: u8) -> bool {
    within_business_hours(start, duration)
        && (start..start + duration as usize).all(|slot| !grid.is_blocked(week, day, slot))
}

/// Whether the span is free on `day` in every week.
pub fn free_in_all_weeks(grid: &TimeGrid, day: Day, start: Slot, duration: u8) -> bool {
    (0..WEEKS).all(|week| can_place(grid, week, day, start, duration))
}
