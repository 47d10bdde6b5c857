use crate::models::member::{Member, MemberRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a Supabase access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub aud: String,
    pub exp: i64, // expiration time
    #[serde(default)]
    pub iat: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MemberInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
}

impl From<&Member> for MemberInfo {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            email: member.email.clone(),
            role: member.role,
        }
    }
}
