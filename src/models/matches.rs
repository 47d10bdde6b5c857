use crate::database::connection::DbPool;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres, Type};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Match with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid match: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "team_side", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Team1,
    Team2,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Team1 => Team::Team2,
            Team::Team2 => Team::Team1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Match {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub shuttlecock_count: i32,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Participant {
    pub match_id: Uuid,
    pub member_id: Uuid,
    pub team: Team,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MatchResult {
    pub match_id: Uuid,
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    pub winner_team: Option<Team>,
}

impl MatchResult {
    pub fn score_for(&self, team: Team) -> Option<i32> {
        match team {
            Team::Team1 => self.team1_score,
            Team::Team2 => self.team2_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchDetail {
    #[serde(flatten)]
    pub game: Match,
    pub participants: Vec<Participant>,
    pub result: Option<MatchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
    pub member_id: Uuid,
    pub team: Team,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatch {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub shuttlecock_count: i32,
    pub participants: Vec<NewParticipant>,
}

impl CreateMatch {
    /// Singles or doubles, both teams filled, nobody listed twice.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.shuttlecock_count < 0 {
            return Err(MatchError::Validation(
                "shuttlecock_count must not be negative".to_string(),
            ));
        }

        let count = self.participants.len();
        if count != 2 && count != 4 {
            return Err(MatchError::Validation(format!(
                "a match needs 2 or 4 participants, got {}",
                count
            )));
        }

        let team1 = self
            .participants
            .iter()
            .filter(|p| p.team == Team::Team1)
            .count();
        if team1 * 2 != count {
            return Err(MatchError::Validation(
                "teams must have the same number of players".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if !self.participants.iter().all(|p| seen.insert(p.member_id)) {
            return Err(MatchError::Validation(
                "a member cannot play twice in one match".to_string(),
            ));
        }

        Ok(())
    }
}

/// One participation of a member, joined with the match result if any.
#[derive(Debug, Clone, FromRow)]
pub struct MemberMatchRow {
    pub match_id: Uuid,
    pub date: NaiveDate,
    pub team: Team,
    pub has_result: bool,
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    pub winner_team: Option<Team>,
}

impl MemberMatchRow {
    pub fn result(&self) -> Option<MatchResult> {
        self.has_result.then(|| MatchResult {
            match_id: self.match_id,
            team1_score: self.team1_score,
            team2_score: self.team2_score,
            winner_team: self.winner_team,
        })
    }
}

impl Match {
    pub async fn insert<'e, E>(executor: E, data: &CreateMatch) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let now = Utc::now();

        sqlx::query_as::<_, Match>(
            "INSERT INTO matches (id, date, time, shuttlecock_count, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, 'scheduled', $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.date)
        .bind(data.time)
        .bind(data.shuttlecock_count)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn insert_participant<'e, E>(
        executor: E,
        match_id: Uuid,
        participant: &NewParticipant,
        default_position: i32,
    ) -> Result<Participant, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Participant>(
            "INSERT INTO match_participants (match_id, member_id, team, position)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(match_id)
        .bind(participant.member_id)
        .bind(participant.team)
        .bind(participant.position.unwrap_or(default_position))
        .fetch_one(executor)
        .await
    }

    pub async fn upsert_result<'e, E>(
        executor: E,
        match_id: Uuid,
        team1_score: Option<i32>,
        team2_score: Option<i32>,
        winner_team: Option<Team>,
    ) -> Result<MatchResult, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, MatchResult>(
            "INSERT INTO match_results (match_id, team1_score, team2_score, winner_team)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (match_id) DO UPDATE
             SET team1_score = EXCLUDED.team1_score,
                 team2_score = EXCLUDED.team2_score,
                 winner_team = EXCLUDED.winner_team
             RETURNING *",
        )
        .bind(match_id)
        .bind(team1_score)
        .bind(team2_score)
        .bind(winner_team)
        .fetch_one(executor)
        .await
    }

    /// Marks the match completed. Cancelled matches are left untouched.
    pub async fn complete<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Match>(
            "UPDATE matches SET status = $2, updated_at = $3
             WHERE id = $1 AND status <> 'cancelled'
             RETURNING *",
        )
        .bind(id)
        .bind(MatchStatus::Completed)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, MatchError> {
        let game = sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(game)
    }

    pub async fn find_all(
        pool: &DbPool,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Self>, MatchError> {
        let matches = sqlx::query_as::<_, Match>(
            "SELECT * FROM matches
             WHERE ($1::date IS NULL OR date = $1)
             ORDER BY date DESC, time DESC NULLS LAST",
        )
        .bind(date)
        .fetch_all(pool)
        .await?;

        Ok(matches)
    }

    pub async fn participants_for(
        pool: &DbPool,
        match_ids: &[Uuid],
    ) -> Result<Vec<Participant>, MatchError> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT * FROM match_participants WHERE match_id = ANY($1) ORDER BY team, position",
        )
        .bind(match_ids)
        .fetch_all(pool)
        .await?;

        Ok(participants)
    }

    pub async fn results_for(
        pool: &DbPool,
        match_ids: &[Uuid],
    ) -> Result<Vec<MatchResult>, MatchError> {
        let results = sqlx::query_as::<_, MatchResult>(
            "SELECT * FROM match_results WHERE match_id = ANY($1)",
        )
        .bind(match_ids)
        .fetch_all(pool)
        .await?;

        Ok(results)
    }

    /// Attaches participants and results with two queries for the whole list.
    pub async fn with_details(
        pool: &DbPool,
        matches: Vec<Match>,
    ) -> Result<Vec<MatchDetail>, MatchError> {
        let ids: Vec<Uuid> = matches.iter().map(|m| m.id).collect();
        let mut participants: HashMap<Uuid, Vec<Participant>> = HashMap::new();
        for participant in Self::participants_for(pool, &ids).await? {
            participants
                .entry(participant.match_id)
                .or_default()
                .push(participant);
        }
        let mut results: HashMap<Uuid, MatchResult> = Self::results_for(pool, &ids)
            .await?
            .into_iter()
            .map(|result| (result.match_id, result))
            .collect();

        Ok(matches
            .into_iter()
            .map(|game| MatchDetail {
                participants: participants.remove(&game.id).unwrap_or_default(),
                result: results.remove(&game.id),
                game,
            })
            .collect())
    }

    pub async fn rows_for_member(
        pool: &DbPool,
        member_id: Uuid,
    ) -> Result<Vec<MemberMatchRow>, MatchError> {
        let rows = sqlx::query_as::<_, MemberMatchRow>(
            "SELECT p.match_id, m.date, p.team,
                    (r.match_id IS NOT NULL) AS has_result,
                    r.team1_score, r.team2_score, r.winner_team
             FROM match_participants p
             JOIN matches m ON m.id = p.match_id
             LEFT JOIN match_results r ON r.match_id = p.match_id
             WHERE p.member_id = $1 AND m.status <> 'cancelled'
             ORDER BY m.date",
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(team: Team) -> NewParticipant {
        NewParticipant {
            member_id: Uuid::new_v4(),
            team,
            position: None,
        }
    }

    fn create(participants: Vec<NewParticipant>) -> CreateMatch {
        CreateMatch {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            time: None,
            shuttlecock_count: 2,
            participants,
        }
    }

    #[test]
    fn accepts_singles_and_doubles() {
        assert!(create(vec![player(Team::Team1), player(Team::Team2)])
            .validate()
            .is_ok());
        assert!(create(vec![
            player(Team::Team1),
            player(Team::Team1),
            player(Team::Team2),
            player(Team::Team2),
        ])
        .validate()
        .is_ok());
    }

    #[test]
    fn rejects_uneven_or_repeated_players() {
        assert!(create(vec![player(Team::Team1)]).validate().is_err());
        assert!(create(vec![
            player(Team::Team1),
            player(Team::Team1),
            player(Team::Team1),
            player(Team::Team2),
        ])
        .validate()
        .is_err());

        let twice = player(Team::Team1);
        let again = NewParticipant {
            team: Team::Team2,
            ..twice.clone()
        };
        assert!(create(vec![twice, again]).validate().is_err());
    }

    #[test]
    fn result_score_lookup_by_team() {
        let result = MatchResult {
            match_id: Uuid::nil(),
            team1_score: Some(21),
            team2_score: Some(17),
            winner_team: None,
        };
        assert_eq!(result.score_for(Team::Team1), Some(21));
        assert_eq!(result.score_for(Team::Team2.opponent()), Some(21));
    }
}
