use chrono::NaiveDateTime;

use crate::model::flag::Flag;
use crate::model::status::Status;
use crate::util::time::{calculate_span_seconds, format_iso, parse_timestamp, seconds_between};

/// Error type for flag timing operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlagError {
    #[error("flag is {0}; only active flags can be changed")]
    NotActive(Status),
    #[error("stop the flag before changing its times")]
    Running,
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("set a start and a later target time first")]
    NoSpan,
    #[error("flag is not running")]
    NotRunning,
    #[error("flag is not paused")]
    NotPaused,
}

/// What [`toggle_running`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Started,
    Paused,
    Resumed,
}

/// Elapsed/remaining time of a running time box, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub elapsed: u64,
    pub remaining: u64,
    pub percent: f64,
}

// ---------------------------------------------------------------------------
// Times
// ---------------------------------------------------------------------------

/// Set the start of the time box. `""` clears it.
pub fn set_start_time(flag: &mut Flag, input: &str) -> Result<(), FlagError> {
    let value = canonical_time(input)?;
    require_stopped(flag)?;
    flag.start_time = value;
    recompute_span(flag);
    Ok(())
}

/// Set the deadline. `""` clears it.
pub fn set_target_time(flag: &mut Flag, input: &str) -> Result<(), FlagError> {
    let value = canonical_time(input)?;
    require_stopped(flag)?;
    flag.target_time = value;
    recompute_span(flag);
    Ok(())
}

fn canonical_time(input: &str) -> Result<String, FlagError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(String::new());
    }
    parse_timestamp(input)
        .map(format_iso)
        .ok_or_else(|| FlagError::InvalidTime(input.to_string()))
}

fn recompute_span(flag: &mut Flag) {
    flag.span_seconds = calculate_span_seconds(&flag.start_time, &flag.target_time);
}

fn require_active(flag: &Flag) -> Result<(), FlagError> {
    match flag.status {
        Status::Active => Ok(()),
        other => Err(FlagError::NotActive(other)),
    }
}

fn require_stopped(flag: &Flag) -> Result<(), FlagError> {
    require_active(flag)?;
    if flag.running {
        return Err(FlagError::Running);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

pub fn start(flag: &mut Flag) -> Result<(), FlagError> {
    require_stopped(flag)?;
    if flag.start_time.is_empty() || flag.target_time.is_empty() || flag.span_seconds == 0 {
        return Err(FlagError::NoSpan);
    }
    flag.running = true;
    flag.paused = false;
    flag.pause_start_time = None;
    Ok(())
}

pub fn pause(flag: &mut Flag, now: NaiveDateTime) -> Result<(), FlagError> {
    require_active(flag)?;
    if !flag.running || flag.paused {
        return Err(FlagError::NotRunning);
    }
    flag.paused = true;
    flag.pause_start_time = Some(format_iso(now));
    Ok(())
}

pub fn resume(flag: &mut Flag, now: NaiveDateTime) -> Result<(), FlagError> {
    require_active(flag)?;
    if !flag.paused {
        return Err(FlagError::NotPaused);
    }
    flag.paused_duration = flag
        .paused_duration
        .saturating_add(open_pause_seconds(flag, now));
    flag.paused = false;
    flag.pause_start_time = None;
    Ok(())
}

/// Start a stopped flag, pause a running one, resume a paused one.
pub fn toggle_running(flag: &mut Flag, now: NaiveDateTime) -> Result<TimerAction, FlagError> {
    if !flag.running {
        start(flag).map(|_| TimerAction::Started)
    } else if flag.paused {
        resume(flag, now).map(|_| TimerAction::Resumed)
    } else {
        pause(flag, now).map(|_| TimerAction::Paused)
    }
}

fn open_pause_seconds(flag: &Flag, now: NaiveDateTime) -> u64 {
    flag.pause_start_time
        .as_deref()
        .and_then(|start| seconds_between(start, now))
        .map_or(0, |secs| secs.max(0) as u64)
}

/// Progress of the time box at `now`. Zero for a flag without a span or
/// with an unparseable start time.
pub fn progress(flag: &Flag, now: NaiveDateTime) -> Progress {
    let span = flag.span_seconds;
    if span == 0 {
        return Progress::default();
    }
    let Some(since_start) = seconds_between(&flag.start_time, now) else {
        return Progress::default();
    };

    // Stored counters are u64 and may exceed i64
    let span_secs = i64::try_from(span).unwrap_or(i64::MAX);
    let paused = i64::try_from(flag.paused_duration)
        .unwrap_or(i64::MAX)
        .saturating_add(i64::try_from(open_pause_seconds(flag, now)).unwrap_or(i64::MAX));
    let elapsed = since_start.saturating_sub(paused).clamp(0, span_secs) as u64;
    Progress {
        elapsed,
        remaining: span - elapsed,
        percent: elapsed as f64 / span as f64 * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn boxed_flag() -> Flag {
        let mut flag = Flag::new(0);
        set_start_time(&mut flag, "2025-05-01 09:00").unwrap();
        set_target_time(&mut flag, "2025-05-01T11:00").unwrap();
        flag
    }

    #[test]
    fn times_are_canonical_and_span_follows() {
        let flag = boxed_flag();
        assert_eq!(flag.start_time, "2025-05-01T09:00:00");
        assert_eq!(flag.target_time, "2025-05-01T11:00:00");
        assert_eq!(flag.span_seconds, 7200);
    }

    #[test]
    fn clearing_or_inverting_zeroes_span() {
        let mut flag = boxed_flag();
        set_target_time(&mut flag, "2025-05-01T08:00").unwrap();
        assert_eq!(flag.span_seconds, 0);
        set_target_time(&mut flag, "2025-05-01T10:00").unwrap();
        set_start_time(&mut flag, "").unwrap();
        assert_eq!(flag.start_time, "");
        assert_eq!(flag.span_seconds, 0);
    }

    #[test]
    fn invalid_time_is_rejected_untouched() {
        let mut flag = boxed_flag();
        assert_eq!(
            set_start_time(&mut flag, "tomorrow"),
            Err(FlagError::InvalidTime("tomorrow".into()))
        );
        assert_eq!(flag.start_time, "2025-05-01T09:00:00");
    }

    #[test]
    fn times_locked_while_running_or_resolved() {
        let mut flag = boxed_flag();
        start(&mut flag).unwrap();
        assert_eq!(set_target_time(&mut flag, "2025-05-02"), Err(FlagError::Running));

        let mut done = boxed_flag();
        done.status = Status::Completed;
        assert_eq!(
            set_start_time(&mut done, "2025-05-01"),
            Err(FlagError::NotActive(Status::Completed))
        );
    }

    #[test]
    fn start_needs_a_span() {
        let mut flag = Flag::new(1);
        assert_eq!(start(&mut flag), Err(FlagError::NoSpan));
        assert!(!flag.running);
    }

    #[test]
    fn toggle_cycles_start_pause_resume() {
        let mut flag = boxed_flag();
        let now = at("2025-05-01T09:30:00");
        assert_eq!(toggle_running(&mut flag, now), Ok(TimerAction::Started));
        assert_eq!(toggle_running(&mut flag, now), Ok(TimerAction::Paused));
        assert_eq!(flag.pause_start_time.as_deref(), Some("2025-05-01T09:30:00"));

        let later = at("2025-05-01T09:40:00");
        assert_eq!(toggle_running(&mut flag, later), Ok(TimerAction::Resumed));
        assert_eq!(flag.paused_duration, 600);
        assert!(flag.pause_start_time.is_none());
        assert!(flag.running);
    }

    #[test]
    fn pause_and_resume_need_the_right_state() {
        let mut flag = boxed_flag();
        let now = at("2025-05-01T09:30:00");
        assert_eq!(pause(&mut flag, now), Err(FlagError::NotRunning));
        assert_eq!(resume(&mut flag, now), Err(FlagError::NotPaused));
    }

    #[test]
    fn progress_discounts_pauses() {
        let mut flag = boxed_flag();
        flag.running = true;
        flag.paused_duration = 600;

        let p = progress(&flag, at("2025-05-01T10:10:00"));
        assert_eq!(p.elapsed, 3600);
        assert_eq!(p.remaining, 3600);
        assert!((p.percent - 50.0).abs() < f64::EPSILON);

        flag.paused = true;
        flag.pause_start_time = Some("2025-05-01T10:00:00".into());
        let p = progress(&flag, at("2025-05-01T10:10:00"));
        assert_eq!(p.elapsed, 3000);
    }

    #[test]
    fn progress_is_clamped() {
        let flag = boxed_flag();
        assert_eq!(progress(&flag, at("2025-05-01T08:00:00")).elapsed, 0);
        let late = progress(&flag, at("2025-05-02T00:00:00"));
        assert_eq!(late.elapsed, 7200);
        assert_eq!(late.remaining, 0);
        assert!((late.percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_without_span_is_zero() {
        assert_eq!(progress(&Flag::new(0), at("2025-05-01T10:00:00")), Progress::default());
        let mut bad = boxed_flag();
        bad.start_time = "garbage".into();
        assert_eq!(progress(&bad, at("2025-05-01T10:00:00")), Progress::default());
    }

    #[test]
    fn huge_stored_counters_saturate() {
        let mut flag = boxed_flag();
        flag.span_seconds = u64::MAX;
        flag.running = true;
        let p = progress(&flag, at("2025-05-01T10:00:00"));
        assert_eq!(p.elapsed, 3600);
        assert_eq!(p.remaining, u64::MAX - 3600);

        flag.paused_duration = u64::MAX;
        flag.paused = true;
        flag.pause_start_time = Some("2025-05-01T09:30:00".into());
        assert_eq!(progress(&flag, at("2025-05-01T10:00:00")).elapsed, 0);

        resume(&mut flag, at("2025-05-01T10:00:00")).unwrap();
        assert_eq!(flag.paused_duration, u64::MAX);
    }
}
