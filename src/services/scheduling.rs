use crate::config::BillingConfig;
use crate::database::connection::DbPool;
use crate::models::matches::{CreateMatch, Match, MatchDetail, MatchError, MatchStatus, Team};
use crate::models::member::{Member, MemberError, MembershipType};
use crate::models::payment::{CreatePayment, Payment, PaymentCategory, PaymentStatus, PaymentType};
use crate::services::billing::classifier::covers_session;
use crate::services::billing::shuttlecock_share;
use crate::services::outcome::winner_from_scores;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

impl From<MemberError> for MatchError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::Database(e) => MatchError::Database(e),
            other => MatchError::Validation(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordedMatch {
    #[serde(rename = "match")]
    pub detail: MatchDetail,
    pub payments: Vec<Payment>,
}

/// Inserts the match, its participants and their fees in one transaction.
pub async fn record_match(
    pool: &DbPool,
    data: CreateMatch,
    billing: &BillingConfig,
) -> Result<RecordedMatch, MatchError> {
    data.validate()?;

    let ids: Vec<Uuid> = data.participants.iter().map(|p| p.member_id).collect();
    let members: HashMap<Uuid, Member> = Member::find_by_ids(pool, &ids)
        .await?
        .into_iter()
        .map(|member| (member.id, member))
        .collect();

    for id in &ids {
        match members.get(id) {
            None => return Err(MatchError::Validation(format!("unknown member {}", id))),
            Some(member) if !member.is_active => {
                return Err(MatchError::Validation(format!(
                    "member {} is not active",
                    member.name
                )));
            }
            Some(_) => {}
        }
    }

    let share = shuttlecock_share(data.shuttlecock_count, billing.shuttlecock_price, ids.len());
    let mut tx = pool.begin().await?;

    let game = Match::insert(&mut *tx, &data).await?;
    let mut participants = Vec::with_capacity(data.participants.len());
    let mut team_positions: HashMap<Team, i32> = HashMap::new();
    for participant in &data.participants {
        let position = team_positions.entry(participant.team).or_insert(0);
        *position += 1;
        participants.push(Match::insert_participant(&mut *tx, game.id, participant, *position).await?);
    }

    let mut payments = Vec::new();
    for participant in &participants {
        if share > 0 {
            let fee = CreatePayment {
                member_id: participant.member_id,
                amount: share,
                payment_type: PaymentType::Shuttlecock,
                status: PaymentStatus::Pending,
                due_date: game.date,
                notes: Some(format!(
                    "Shuttlecock fee ({} shuttlecocks, {} players)",
                    game.shuttlecock_count,
                    participants.len()
                )),
                match_id: Some(game.id),
                category: Some(PaymentCategory::Shuttlecock),
            };
            payments.push(Payment::insert(&mut *tx, fee).await?);
        }

        let pays_per_session = members
            .get(&participant.member_id)
            .is_some_and(|member| member.membership_type == MembershipType::Daily);
        if !pays_per_session {
            continue;
        }
        // Legacy rows may lack a category, so the classifier decides what covers the day.
        let same_day = Payment::find_by_member_on(&mut *tx, participant.member_id, game.date).await?;
        if !covers_session(&same_day) {
            let fee = CreatePayment {
                member_id: participant.member_id,
                amount: billing.session_fee,
                payment_type: PaymentType::Daily,
                status: PaymentStatus::Pending,
                due_date: game.date,
                notes: Some("Session fee".to_string()),
                match_id: Some(game.id),
                category: Some(PaymentCategory::Session),
            };
            payments.push(Payment::insert(&mut *tx, fee).await?);
        }
    }

    tx.commit().await?;
    info!(
        "Recorded match {} on {} with {} players and {} fees",
        game.id,
        game.date,
        participants.len(),
        payments.len()
    );

    Ok(RecordedMatch {
        detail: MatchDetail {
            game,
            participants,
            result: None,
        },
        payments,
    })
}

/// Winner to persist: derived from the scores when both exist, otherwise the caller's pick.
pub fn resolve_winner(
    team1_score: Option<i32>,
    team2_score: Option<i32>,
    declared: Option<Team>,
) -> Option<Team> {
    match (team1_score, team2_score) {
        (Some(_), Some(_)) => winner_from_scores(team1_score, team2_score),
        _ => declared,
    }
}

pub fn ensure_recordable(game: &Match) -> Result<(), MatchError> {
    if game.status == MatchStatus::Cancelled {
        return Err(MatchError::Validation(format!(
            "match {} is cancelled",
            game.id
        )));
    }
    Ok(())
}

pub async fn record_result(
    pool: &DbPool,
    match_id: Uuid,
    team1_score: Option<i32>,
    team2_score: Option<i32>,
    declared_winner: Option<Team>,
) -> Result<MatchDetail, MatchError> {
    if team1_score.is_some_and(|s| s < 0) || team2_score.is_some_and(|s| s < 0) {
        return Err(MatchError::Validation("scores must not be negative".to_string()));
    }
    if team1_score.is_none() && team2_score.is_none() && declared_winner.is_none() {
        return Err(MatchError::Validation(
            "provide both scores or a winner".to_string(),
        ));
    }

    let existing = Match::find_by_id(pool, match_id)
        .await?
        .ok_or(MatchError::NotFound { id: match_id })?;
    ensure_recordable(&existing)?;

    let winner = resolve_winner(team1_score, team2_score, declared_winner);
    let mut tx = pool.begin().await?;

    // Cancelled between the check and the update.
    let game = match Match::complete(&mut *tx, match_id).await? {
        Some(game) => game,
        None => {
            return Err(MatchError::Validation(format!(
                "match {} is cancelled",
                match_id
            )));
        }
    };
    let result = Match::upsert_result(&mut *tx, match_id, team1_score, team2_score, winner).await?;

    tx.commit().await?;
    info!("Recorded result for match {}: {:?}", match_id, winner);

    let participants = Match::participants_for(pool, &[match_id]).await?;
    Ok(MatchDetail {
        game,
        participants,
        result: Some(result),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn game(status: MatchStatus) -> Match {
        Match {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            time: None,
            shuttlecock_count: 2,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cancelled_match_takes_no_result() {
        assert!(ensure_recordable(&game(MatchStatus::Scheduled)).is_ok());
        assert!(ensure_recordable(&game(MatchStatus::Completed)).is_ok());
        assert!(matches!(
            ensure_recordable(&game(MatchStatus::Cancelled)),
            Err(MatchError::Validation(_))
        ));
    }

    #[test]
    fn scores_override_declared_winner() {
        assert_eq!(
            resolve_winner(Some(42), Some(37), Some(Team::Team2)),
            Some(Team::Team1)
        );
        assert_eq!(resolve_winner(Some(21), Some(21), Some(Team::Team2)), None);
        assert_eq!(resolve_winner(None, Some(21), Some(Team::Team2)), Some(Team::Team2));
        assert_eq!(resolve_winner(None, None, None), None);
    }
}
