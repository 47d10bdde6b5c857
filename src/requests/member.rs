use crate::models::member::{MemberRole, MembershipType};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub email: String,
    pub role: Option<MemberRole>,
    pub membership_type: Option<MembershipType>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<MemberRole>,
    pub membership_type: Option<MembershipType>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub as_of: Option<chrono::NaiveDate>,
}
