use tracing::{debug, info, warn};

use crate::model::*;
use crate::observability::{PARTIAL_COMMITS_TOTAL, PLACEMENTS_TOTAL};

use super::validate::validate_meeting;
use super::{Engine, ScheduleError};

impl Engine {
    pub async fn reserve(
        &self,
        day: &str,
        start_time: &str,
        duration_minutes: i64,
    ) -> Result<Reservation, ScheduleError> {
        let result = {
            let mut guard = self.scheduler.write().await;
            guard.reserve(day, start_time, duration_minutes)
        };
        match &result {
            Ok(r) => {
                info!(id = %r.id, day = r.day.name(), start = r.start, duration = r.duration, "reservation added");
                metrics::counter!(PLACEMENTS_TOTAL, "kind" => "reservation").increment(1);
                self.publish(&Event::ReservationAdded {
                    id: r.id,
                    day: r.day,
                    start: r.start,
                    duration: r.duration,
                });
            }
            Err(e) if e.is_validation() => {
                debug!("reservation {day} {start_time} {duration_minutes}min rejected: {e}")
            }
            Err(e) => info!("reservation {day} {start_time} {duration_minutes}min not placed: {e}"),
        }
        result
    }

    pub async fn schedule_meeting(&self, form: &MeetingForm) -> Result<Placement, ScheduleError> {
        let request = validate_meeting(form).inspect_err(|e| {
            debug!(name = %form.name, "meeting rejected: {e}");
        })?;
        let result = {
            let mut guard = self.scheduler.write().await;
            guard.schedule_meeting(&request)
        };
        self.report_meeting(&request, &result);
        result
    }

    /// Log, count and publish the outcome of a meeting placement.
    pub(super) fn report_meeting(
        &self,
        request: &MeetingRequest,
        result: &Result<Placement, ScheduleError>,
    ) {
        match result {
            Ok(p) => {
                info!(
                    meeting_id = %p.meeting_id,
                    name = %request.name,
                    day = p.day.name(),
                    start = p.start,
                    weeks = ?p.weeks,
                    "meeting scheduled"
                );
                metrics::counter!(PLACEMENTS_TOTAL, "kind" => request.frequency.name()).increment(1);
                self.publish(&Event::MeetingScheduled {
                    meeting_id: p.meeting_id,
                    name: request.name.clone(),
                    day: p.day,
                    start: p.start,
                    duration: request.duration,
                    weeks: p.weeks.clone(),
                });
            }
            Err(ScheduleError::PartialCommit {
                meeting_id,
                day,
                start,
                committed,
                required,
            }) => {
                warn!(
                    %meeting_id,
                    name = %request.name,
                    placed = committed.len(),
                    required,
                    "meeting only partially scheduled"
                );
                metrics::counter!(PARTIAL_COMMITS_TOTAL).increment(1);
                self.publish(&Event::MeetingScheduled {
                    meeting_id: *meeting_id,
                    name: request.name.clone(),
                    day: *day,
                    start: *start,
                    duration: request.duration,
                    weeks: committed.clone(),
                });
            }
            Err(e) => info!(name = %request.name, "meeting not placed: {e}"),
        }
    }

    /// Clear everything. Returns the number of schedule entries dropped.
    pub async fn reset(&self) -> usize {
        let cleared = {
            let mut guard = self.scheduler.write().await;
            let cleared = guard.entries().len();
            guard.reset();
            cleared
        };
        info!(cleared, "schedule reset");
        self.publish(&Event::ScheduleReset);
        cleared
    }
}
