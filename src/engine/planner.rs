use rand::seq::SliceRandom;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::feasibility::can_place;
use super::grid::{DayLoad, TimeGrid, HOURS_PER_SLOT};
use super::{ScheduleError, Scheduler};

// ── Candidate search ──────────────────────────────────────────────

/// Which weeks a candidate was evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WeekPool {
    /// Any `occurrences` of the four weeks.
    Any,
    /// Exactly this fortnight pair.
    Pair([Week; 2]),
}

const SINGLE_POOL: [WeekPool; 1] = [WeekPool::Any];
const FORTNIGHT_POOLS: [WeekPool; 2] = [
    WeekPool::Pair(FORTNIGHT_PAIRS[0]),
    WeekPool::Pair(FORTNIGHT_PAIRS[1]),
];

fn pools_for(frequency: Frequency) -> &'static [WeekPool] {
    match frequency {
        Frequency::Fortnightly => &FORTNIGHT_POOLS,
        _ => &SINGLE_POOL,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub day: Day,
    pub start: Slot,
    pub score: f64,
    /// The pool the candidate was found in. Fortnightly commits reuse it.
    pub pool: WeekPool,
}

/// Start slots to try: the fixed time, else the preferred list as given,
/// else the whole table in order.
fn time_candidates(request: &MeetingRequest) -> Vec<Slot> {
    if let Some(start) = request.fixed_start {
        vec![start]
    } else if !request.preferred.is_empty() {
        request.preferred.clone()
    } else {
        (0..SLOTS).collect()
    }
}

/// Number of weeks in `pool` where the span fits. A pair counts only when
/// both weeks fit; an open pool stops counting at `occurrences`.
fn feasible_weeks(
    grid: &TimeGrid,
    pool: WeekPool,
    day: Day,
    start: Slot,
    duration: u8,
    occurrences: usize,
) -> usize {
    match pool {
        WeekPool::Pair(weeks) => {
            if weeks.iter().all(|w| can_place(grid, *w, day, start, duration)) {
                weeks.len()
            } else {
                0
            }
        }
        WeekPool::Any => {
            let mut found = 0;
            for week in 0..WEEKS {
                if can_place(grid, week, day, start, duration) {
                    found += 1;
                    if found >= occurrences {
                        break;
                    }
                }
            }
            found
        }
    }
}

/// Greedy search for the least-loaded day/time that can hold every
/// occurrence. Scan order is pool, then day (least loaded first), then time;
/// on equal scores the earliest candidate wins.
///
/// The score only looks at the day's total load, so within a day every
/// feasible time ties and the first one is kept.
pub(crate) fn select_candidate(
    grid: &TimeGrid,
    load: &DayLoad,
    request: &MeetingRequest,
) -> Option<Candidate> {
    let occurrences = request.frequency.occurrences();
    let days = match request.fixed_day {
        Some(day) => vec![day],
        None => load.day_order().to_vec(),
    };
    let times = time_candidates(request);

    let mut best: Option<Candidate> = None;
    for &pool in pools_for(request.frequency) {
        for &day in &days {
            if load.over_meeting_cap(day) {
                continue;
            }
            for &start in &times {
                if feasible_weeks(grid, pool, day, start, request.duration, occurrences)
                    < occurrences
                {
                    continue;
                }
                let score = load.total(day) + request.duration as f64 * HOURS_PER_SLOT;
                if best.is_none_or(|b| score < b.score) {
                    best = Some(Candidate {
                        day,
                        start,
                        score,
                        pool,
                    });
                }
            }
        }
    }
    best
}

// ── Commit ────────────────────────────────────────────────────────

impl Scheduler {
    /// Place a recurring meeting and commit its occurrences.
    ///
    /// Fails without touching state when no candidate exists. A weekly-family
    /// request that runs out of weeks mid-commit keeps what it placed and
    /// reports [`ScheduleError::PartialCommit`].
    pub fn schedule_meeting(
        &mut self,
        request: &MeetingRequest,
    ) -> Result<Placement, ScheduleError> {
        let occurrences = request.frequency.occurrences();
        if self.entries.len() + occurrences > MAX_SCHEDULE_ENTRIES {
            return Err(ScheduleError::LimitExceeded("too many schedule entries"));
        }
        let candidate =
            select_candidate(&self.grid, &self.load, request).ok_or(ScheduleError::Infeasible)?;
        self.commit_candidate(candidate, request)
    }

    pub(super) fn commit_candidate(
        &mut self,
        candidate: Candidate,
        request: &MeetingRequest,
    ) -> Result<Placement, ScheduleError> {
        let meeting_id = Ulid::new();
        let weeks = match candidate.pool {
            WeekPool::Pair(pair) => {
                for week in pair {
                    self.commit_occurrence(meeting_id, week, &candidate, request);
                }
                pair.to_vec()
            }
            WeekPool::Any => self.commit_shuffled(meeting_id, &candidate, request)?,
        };
        Ok(Placement {
            meeting_id,
            day: candidate.day,
            start: candidate.start,
            weeks,
        })
    }

    /// Assign occurrences to weeks in a freshly shuffled order, skipping weeks
    /// already used by this call or no longer free.
    fn commit_shuffled(
        &mut self,
        meeting_id: Ulid,
        candidate: &Candidate,
        request: &MeetingRequest,
    ) -> Result<Vec<Week>, ScheduleError> {
        let required = request.frequency.occurrences();
        let mut order: [Week; WEEKS] = [0, 1, 2, 3];
        order.shuffle(&mut self.rng);

        let mut committed: Vec<Week> = Vec::with_capacity(required);
        for _ in 0..required {
            let next = order.iter().copied().find(|week| {
                !committed.contains(week)
                    && can_place(
                        &self.grid,
                        *week,
                        candidate.day,
                        candidate.start,
                        request.duration,
                    )
            });
            let Some(week) = next else {
                if committed.is_empty() {
                    return Err(ScheduleError::Infeasible);
                }
                return Err(ScheduleError::PartialCommit {
                    meeting_id,
                    day: candidate.day,
                    start: candidate.start,
                    committed,
                    required,
                });
            };
            self.commit_occurrence(meeting_id, week, candidate, request);
            committed.push(week);
        }
        Ok(committed)
    }

    fn commit_occurrence(
        &mut self,
        meeting_id: Ulid,
        week: Week,
        candidate: &Candidate,
        request: &MeetingRequest,
    ) {
        self.entries.push(ScheduleEntry {
            meeting_id,
            week,
            day: candidate.day,
            start: candidate.start,
            name: request.name.clone(),
            kind: request.kind.clone(),
            duration: request.duration,
            frequency: request.frequency,
        });
        self.grid
            .block(week, candidate.day, candidate.start, request.duration);
        self.load.add_occurrence(candidate.day, request.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(duration: u8, frequency: Frequency) -> MeetingRequest {
        MeetingRequest {
            name: "Sync".into(),
            kind: "Design".into(),
            duration,
            preferred: Vec::new(),
            fixed_day: None,
            fixed_start: None,
            frequency,
        }
    }

    #[test]
    fn time_candidates_precedence() {
        let mut req = request(1, Frequency::Weekly);
        assert_eq!(time_candidates(&req), (0..SLOTS).collect::<Vec<_>>());
        req.preferred = vec![7, 2];
        assert_eq!(time_candidates(&req), vec![7, 2]);
        req.fixed_start = Some(4);
        assert_eq!(time_candidates(&req), vec![4]);
    }

    #[test]
    fn pair_needs_both_weeks() {
        let mut grid = TimeGrid::new();
        assert_eq!(feasible_weeks(&grid, WeekPool::Pair([0, 2]), Day::Monday, 0, 1, 2), 2);
        grid.block(2, Day::Monday, 0, 1);
        assert_eq!(feasible_weeks(&grid, WeekPool::Pair([0, 2]), Day::Monday, 0, 1, 2), 0);
        assert_eq!(feasible_weeks(&grid, WeekPool::Pair([1, 3]), Day::Monday, 0, 1, 2), 2);
    }

    #[test]
    fn open_pool_stops_at_occurrences() {
        let mut grid = TimeGrid::new();
        assert_eq!(feasible_weeks(&grid, WeekPool::Any, Day::Monday, 0, 1, 1), 1);
        assert_eq!(feasible_weeks(&grid, WeekPool::Any, Day::Monday, 0, 1, 4), 4);
        grid.block(1, Day::Monday, 0, 1);
        assert_eq!(feasible_weeks(&grid, WeekPool::Any, Day::Monday, 0, 1, 4), 3);
    }

    #[test]
    fn empty_grid_picks_monday_first_slot() {
        let grid = TimeGrid::new();
        let load = DayLoad::default();
        let c = select_candidate(&grid, &load, &request(2, Frequency::Weekly)).unwrap();
        assert_eq!(c.day, Day::Monday);
        assert_eq!(c.start, 0);
        assert_eq!(c.score, 1.0);
        assert_eq!(c.pool, WeekPool::Any);
    }

    #[test]
    fn least_loaded_day_wins() {
        let grid = TimeGrid::new();
        let mut load = DayLoad::default();
        load.add_reservation(Day::Monday, 1);
        load.add_reservation(Day::Tuesday, 1);
        load.add_reservation(Day::Thursday, 1);
        let c = select_candidate(&grid, &load, &request(1, Frequency::Monthly)).unwrap();
        assert_eq!(c.day, Day::Wednesday);
    }

    #[test]
    fn fixed_day_restricts_search() {
        let grid = TimeGrid::new();
        let mut load = DayLoad::default();
        load.add_reservation(Day::Thursday, 3);
        let mut req = request(1, Frequency::Weekly);
        req.fixed_day = Some(Day::Thursday);
        let c = select_candidate(&grid, &load, &req).unwrap();
        assert_eq!(c.day, Day::Thursday);
    }

    #[test]
    fn capped_day_is_skipped_even_when_fixed() {
        let grid = TimeGrid::new();
        let mut load = DayLoad::default();
        for _ in 0..21 {
            load.add_occurrence(Day::Monday, 1);
        }
        let mut req = request(1, Frequency::Weekly);
        assert_ne!(select_candidate(&grid, &load, &req).unwrap().day, Day::Monday);
        req.fixed_day = Some(Day::Monday);
        assert_eq!(select_candidate(&grid, &load, &req), None);
    }

    #[test]
    fn preferred_times_in_supplied_order() {
        let grid = TimeGrid::new();
        let load = DayLoad::default();
        let mut req = request(1, Frequency::Weekly);
        req.preferred = vec![9, 3];
        let c = select_candidate(&grid, &load, &req).unwrap();
        assert_eq!((c.day, c.start), (Day::Monday, 9));
    }

    #[test]
    fn out_of_hours_fixed_time_has_no_candidate() {
        let grid = TimeGrid::new();
        let load = DayLoad::default();
        let mut req = request(3, Frequency::Weekly);
        req.fixed_start = Some(12);
        assert_eq!(select_candidate(&grid, &load, &req), None);
    }

    #[test]
    fn fortnightly_prefers_first_pair_on_ties() {
        let grid = TimeGrid::new();
        let load = DayLoad::default();
        let c = select_candidate(&grid, &load, &request(1, Frequency::Fortnightly)).unwrap();
        assert_eq!(c.pool, WeekPool::Pair([0, 2]));
    }

    #[test]
    fn fortnightly_falls_back_to_second_pair() {
        let mut grid = TimeGrid::new();
        let load = DayLoad::default();
        grid.block(0, Day::Monday, 0, 1);
        let mut req = request(1, Frequency::Fortnightly);
        req.fixed_day = Some(Day::Monday);
        req.fixed_start = Some(0);
        let c = select_candidate(&grid, &load, &req).unwrap();
        assert_eq!(c.pool, WeekPool::Pair([1, 3]));
    }

    #[test]
    fn score_ignores_which_weeks_fit() {
        // Monday has only one free week at 09:00, Tuesday all four; both
        // days carry equal load, so Monday still wins for a monthly request.
        let mut grid = TimeGrid::new();
        for week in 1..WEEKS {
            grid.block(week, Day::Monday, 0, 1);
        }
        let load = DayLoad::default();
        let mut req = request(1, Frequency::Monthly);
        req.fixed_start = Some(0);
        let c = select_candidate(&grid, &load, &req).unwrap();
        assert_eq!(c.day, Day::Monday);
    }

    #[test]
    fn selection_is_read_only() {
        let mut s = Scheduler::with_seed(3);
        s.reserve("Tuesday", "10:00", 60).unwrap();
        let before_grid = s.grid.clone();
        let before_load = s.load;
        let _ = select_candidate(&s.grid, &s.load, &request(2, Frequency::Weekly));
        assert_eq!(s.grid, before_grid);
        assert_eq!(s.load, before_load);
        assert!(s.entries.is_empty());
    }

    #[test]
    fn exhausted_weeks_surface_partial_commit() {
        let mut s = Scheduler::with_seed(9);
        for week in 1..WEEKS {
            s.grid.block(week, Day::Monday, 0, 1);
        }
        // Force a candidate the search itself would never return.
        let candidate = Candidate {
            day: Day::Monday,
            start: 0,
            score: 0.5,
            pool: WeekPool::Any,
        };
        let err = s
            .commit_candidate(candidate, &request(1, Frequency::Weekly))
            .unwrap_err();
        match err {
            ScheduleError::PartialCommit {
                day,
                start,
                committed,
                required,
                ..
            } => {
                assert_eq!((day, start), (Day::Monday, 0));
                assert_eq!(committed, vec![0]);
                assert_eq!(required, 4);
            }
            other => panic!("expected PartialCommit, got {other:?}"),
        }
        // The one placed occurrence stays committed.
        assert_eq!(s.entries.len(), 1);
        assert_eq!(s.entries[0].week, 0);
        assert!(s.grid.is_blocked(0, Day::Monday, 0));
        assert_eq!(s.load.meetings(Day::Monday), 0.5);
    }

    #[test]
    fn no_free_week_at_all_is_infeasible() {
        let mut s = Scheduler::with_seed(9);
        for week in 0..WEEKS {
            s.grid.block(week, Day::Monday, 0, 1);
        }
        let candidate = Candidate {
            day: Day::Monday,
            start: 0,
            score: 0.5,
            pool: WeekPool::Any,
        };
        assert_eq!(
            s.commit_candidate(candidate, &request(1, Frequency::Monthly)),
            Err(ScheduleError::Infeasible)
        );
        assert!(s.entries.is_empty());
    }
}
