use crate::services::calendar::{first_day_of_month, months_back, saturdays_between};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttendancePeriod {
    #[default]
    CurrentMonth,
    TrailingMonths(u32),
}

pub fn period_start(as_of: NaiveDate, period: AttendancePeriod) -> NaiveDate {
    match period {
        AttendancePeriod::CurrentMonth => first_day_of_month(as_of),
        AttendancePeriod::TrailingMonths(months) => months_back(as_of, months),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttendanceSummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub attended_sessions: u32,
    pub total_session_days: u32,
    pub rate: u32,
}

/// Session days are the Saturdays in `[start, as_of]` plus any other day the
/// member actually played, so off-schedule matches are not discarded.
pub fn attendance_rate<I>(match_dates: I, start: NaiveDate, as_of: NaiveDate) -> AttendanceSummary
where
    I: IntoIterator<Item = NaiveDate>,
{
    let attended: BTreeSet<NaiveDate> = match_dates
        .into_iter()
        .filter(|date| *date >= start && *date <= as_of)
        .collect();

    let mut session_days: BTreeSet<NaiveDate> = saturdays_between(start, as_of).into_iter().collect();
    session_days.extend(attended.iter().copied());

    let attended_sessions = attended.len() as u32;
    let total_session_days = (session_days.len() as u32).max(1);
    let rate = (f64::from(attended_sessions) / f64::from(total_session_days) * 100.0)
        .round()
        .clamp(0.0, 100.0) as u32;

    AttendanceSummary {
        period_start: start,
        period_end: as_of,
        attended_sessions,
        total_session_days,
        rate,
    }
}
