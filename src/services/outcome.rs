//! Win/loss resolution. Scores are authoritative; the stored `winner_team`
//! is only consulted when a result has no scores.

use crate::models::matches::{MatchResult, Team};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Won,
    Lost,
    Drawn,
}

/// `None` while the match is undecided.
pub fn resolve_outcome(team: Team, result: Option<&MatchResult>) -> Option<MatchOutcome> {
    let result = result?;

    if let (Some(own), Some(opponent)) = (result.score_for(team), result.score_for(team.opponent())) {
        return Some(match own.cmp(&opponent) {
            Ordering::Greater => MatchOutcome::Won,
            Ordering::Less => MatchOutcome::Lost,
            Ordering::Equal => MatchOutcome::Drawn,
        });
    }

    result.winner_team.map(|winner| {
        if winner == team {
            MatchOutcome::Won
        } else {
            MatchOutcome::Lost
        }
    })
}

/// A draw is not a win.
pub fn did_win(team: Team, result: Option<&MatchResult>) -> Option<bool> {
    resolve_outcome(team, result).map(|outcome| outcome == MatchOutcome::Won)
}

/// Winner implied by a score line, if both scores are known and differ.
pub fn winner_from_scores(team1_score: Option<i32>, team2_score: Option<i32>) -> Option<Team> {
    match (team1_score?, team2_score?) {
        (a, b) if a > b => Some(Team::Team1),
        (a, b) if b > a => Some(Team::Team2),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PerformanceSummary {
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub undecided: u32,
    pub win_rate: u32,
}

impl PerformanceSummary {
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Option<MatchOutcome>>,
    {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                Some(MatchOutcome::Won) => summary.wins += 1,
                Some(MatchOutcome::Lost) => summary.losses += 1,
                Some(MatchOutcome::Drawn) => summary.draws += 1,
                None => summary.undecided += 1,
            }
        }
        summary.played = summary.wins + summary.losses + summary.draws;
        if summary.played > 0 {
            summary.win_rate =
                (f64::from(summary.wins) / f64::from(summary.played) * 100.0).round() as u32;
        }
        summary
    }
}
