use crate::models::matches::MemberMatchRow;
use crate::services::attendance::{AttendancePeriod, AttendanceSummary, attendance_rate, period_start};
use crate::services::outcome::{PerformanceSummary, resolve_outcome};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MemberStats {
    pub performance: PerformanceSummary,
    pub attendance: AttendanceSummary,
}

pub fn summarize(rows: &[MemberMatchRow], as_of: NaiveDate, period: AttendancePeriod) -> MemberStats {
    let performance = PerformanceSummary::from_outcomes(
        rows.iter()
            .map(|row| resolve_outcome(row.team, row.result().as_ref())),
    );
    let attendance = attendance_rate(
        rows.iter().map(|row| row.date),
        period_start(as_of, period),
        as_of,
    );

    MemberStats {
        performance,
        attendance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matches::Team;
    use uuid::Uuid;

    fn row(date: NaiveDate, team: Team, scores: Option<(i32, i32)>, winner: Option<Team>) -> MemberMatchRow {
        MemberMatchRow {
            match_id: Uuid::new_v4(),
            date,
            team,
            has_result: scores.is_some() || winner.is_some(),
            team1_score: scores.map(|s| s.0),
            team2_score: scores.map(|s| s.1),
            winner_team: winner,
        }
    }

    #[test]
    fn combines_outcomes_and_attendance() {
        let sat = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        let rows = vec![
            // Stored winner disagrees with the score; the score counts.
            row(sat(1), Team::Team1, Some((42, 37)), Some(Team::Team2)),
            row(sat(8), Team::Team2, None, Some(Team::Team1)),
            row(sat(8), Team::Team1, None, None),
        ];

        let stats = summarize(&rows, sat(15), AttendancePeriod::CurrentMonth);
        assert_eq!(stats.performance.wins, 1);
        assert_eq!(stats.performance.losses, 1);
        assert_eq!(stats.performance.undecided, 1);
        assert_eq!(stats.performance.win_rate, 50);
        assert_eq!(stats.attendance.attended_sessions, 2);
        assert_eq!(stats.attendance.total_session_days, 3);
        assert_eq!(stats.attendance.rate, 67);
    }
}
