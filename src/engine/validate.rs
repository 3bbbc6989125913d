use crate::catalog;
use crate::limits::*;
use crate::model::*;

use super::ScheduleError;

pub(crate) fn parse_day(name: &str) -> Result<Day, ScheduleError> {
    catalog::day_from_name(name.trim()).ok_or_else(|| ScheduleError::InvalidDay(name.to_string()))
}

/// Resolve an "HH:MM" start time to a slot. Break times get their own error
/// so callers can tell them apart from typos.
pub(crate) fn parse_start_time(time: &str) -> Result<Slot, ScheduleError> {
    let time = time.trim();
    if catalog::is_break_time(time) {
        return Err(ScheduleError::BreakTime(time.to_string()));
    }
    catalog::slot_from_time(time).ok_or_else(|| ScheduleError::InvalidTime(time.to_string()))
}

pub(crate) fn parse_duration(minutes: i64) -> Result<u8, ScheduleError> {
    catalog::duration_slots(minutes).ok_or(ScheduleError::InvalidDuration(minutes))
}

pub(crate) fn parse_frequency(name: &str) -> Result<Frequency, ScheduleError> {
    catalog::frequency_from_name(name.trim())
        .ok_or_else(|| ScheduleError::InvalidFrequency(name.to_string()))
}

fn check_label(label: &str, what: &'static str) -> Result<(), ScheduleError> {
    if label.len() > MAX_LABEL_LEN {
        return Err(ScheduleError::LimitExceeded(what));
    }
    Ok(())
}

/// Treat `None`, empty and whitespace-only as unset.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn validate_meeting(form: &MeetingForm) -> Result<MeetingRequest, ScheduleError> {
    check_label(&form.name, "meeting name too long")?;
    check_label(&form.kind, "meeting type too long")?;
    let duration = parse_duration(form.duration_minutes)?;
    let frequency = parse_frequency(&form.frequency)?;

    let preferred_times: Vec<&str> = form
        .preferred_times
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if preferred_times.len() > MAX_PREFERRED_TIMES {
        return Err(ScheduleError::LimitExceeded("too many preferred times"));
    }
    let preferred = preferred_times
        .into_iter()
        .map(parse_start_time)
        .collect::<Result<Vec<_>, _>>()?;

    let fixed_day = non_empty(&form.fixed_day).map(parse_day).transpose()?;
    let fixed_start = non_empty(&form.fixed_time)
        .map(parse_start_time)
        .transpose()?;

    Ok(MeetingRequest {
        name: form.name.clone(),
        kind: form.kind.clone(),
        duration,
        preferred,
        fixed_day,
        fixed_start,
        frequency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> MeetingForm {
        MeetingForm {
            name: "Team Sync".into(),
            kind: "Design".into(),
            duration_minutes: 60,
            frequency: "weekly".into(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_form() {
        let req = validate_meeting(&form()).unwrap();
        assert_eq!(req.duration, 2);
        assert_eq!(req.frequency, Frequency::Weekly);
        assert!(req.preferred.is_empty());
        assert_eq!(req.fixed_day, None);
        assert_eq!(req.fixed_start, None);
    }

    #[test]
    fn empty_optionals_are_unset() {
        let mut f = form();
        f.fixed_day = Some(String::new());
        f.fixed_time = Some("  ".into());
        f.preferred_times = vec!["".into()];
        let req = validate_meeting(&f).unwrap();
        assert_eq!(req.fixed_day, None);
        assert_eq!(req.fixed_start, None);
        assert!(req.preferred.is_empty());
    }

    #[test]
    fn preferred_order_is_kept() {
        let mut f = form();
        f.preferred_times = vec!["14:00".into(), "09:30".into(), " 10:00 ".into()];
        let req = validate_meeting(&f).unwrap();
        assert_eq!(req.preferred, vec![8, 1, 2]);
    }

    #[test]
    fn fixed_day_and_time() {
        let mut f = form();
        f.fixed_day = Some("Tuesday".into());
        f.fixed_time = Some("10:00".into());
        let req = validate_meeting(&f).unwrap();
        assert_eq!(req.fixed_day, Some(Day::Tuesday));
        assert_eq!(req.fixed_start, Some(2));
    }

    #[test]
    fn rejects_bad_inputs() {
        let mut f = form();
        f.duration_minutes = 45;
        assert_eq!(validate_meeting(&f), Err(ScheduleError::InvalidDuration(45)));

        let mut f = form();
        f.frequency = "daily".into();
        assert!(matches!(validate_meeting(&f), Err(ScheduleError::InvalidFrequency(_))));

        let mut f = form();
        f.fixed_day = Some("Friday".into());
        assert!(matches!(validate_meeting(&f), Err(ScheduleError::InvalidDay(_))));

        let mut f = form();
        f.fixed_time = Some("12:30".into());
        assert!(matches!(validate_meeting(&f), Err(ScheduleError::BreakTime(_))));

        let mut f = form();
        f.preferred_times = vec!["09:15".into()];
        assert!(matches!(validate_meeting(&f), Err(ScheduleError::InvalidTime(_))));

        let mut f = form();
        f.name = "x".repeat(MAX_LABEL_LEN + 1);
        assert!(matches!(validate_meeting(&f), Err(ScheduleError::LimitExceeded(_))));

        let mut f = form();
        f.preferred_times = vec!["09:00".into(); MAX_PREFERRED_TIMES + 1];
        assert!(matches!(validate_meeting(&f), Err(ScheduleError::LimitExceeded(_))));
    }

    #[test]
    fn all_validation_errors_are_flagged() {
        let mut f = form();
        f.duration_minutes = 0;
        assert!(validate_meeting(&f).unwrap_err().is_validation());
        assert!(parse_day("Sunday").unwrap_err().is_validation());
        assert!(!ScheduleError::Infeasible.is_validation());
    }
}
