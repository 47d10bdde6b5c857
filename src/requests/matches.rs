use crate::models::matches::{NewParticipant, Team};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub shuttlecock_count: i32,
    pub participants: Vec<NewParticipant>,
}

#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    pub team1_score: Option<i32>,
    pub team2_score: Option<i32>,
    pub winner_team: Option<Team>,
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub date: Option<NaiveDate>,
}
