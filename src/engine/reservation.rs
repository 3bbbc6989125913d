use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::feasibility::{free_in_all_weeks, within_business_hours};
use super::validate::{parse_day, parse_duration, parse_start_time};
use super::{ScheduleError, Scheduler};

impl Scheduler {
    /// Block `day`/`start_time` for `duration_minutes` in all four weeks.
    ///
    /// All-or-nothing: every week is checked before any slot is marked, so a
    /// collision in a later week leaves the grid untouched.
    pub fn reserve(
        &mut self,
        day: &str,
        start_time: &str,
        duration_minutes: i64,
    ) -> Result<Reservation, ScheduleError> {
        let day = parse_day(day)?;
        let start = parse_start_time(start_time)?;
        let duration = parse_duration(duration_minutes)?;
        if self.reservations.len() >= MAX_RESERVATIONS {
            return Err(ScheduleError::LimitExceeded("too many reservations"));
        }
        if !within_business_hours(start, duration) {
            return Err(ScheduleError::OutsideBusinessHours { start, duration });
        }
        if !free_in_all_weeks(&self.grid, day, start, duration) {
            return Err(ScheduleError::Infeasible);
        }

        for week in 0..WEEKS {
            self.grid.block(week, day, start, duration);
        }
        let reservation = Reservation {
            id: Ulid::new(),
            day,
            start,
            duration,
        };
        self.reservations.push(reservation.clone());
        self.load.add_reservation(day, duration);
        Ok(reservation)
    }
}
