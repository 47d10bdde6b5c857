use crate::database::connection::DbPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MemberError {
    #[error("Member with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("No fields provided for update")]
    NoUpdateFields,
    #[error("Invalid member: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
}

impl FromStr for MemberRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "membership_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    #[default]
    Daily,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub membership_type: MembershipType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMember {
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub membership_type: MembershipType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMember {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<MemberRole>,
    pub membership_type: Option<MembershipType>,
    pub is_active: Option<bool>,
}

impl UpdateMember {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.membership_type.is_none()
            && self.is_active.is_none()
    }
}

/// Several member rows sharing one display name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DuplicateName {
    pub name: String,
    pub member_ids: Vec<Uuid>,
    pub count: i64,
}

fn validate_name(name: &str) -> Result<(), MemberError> {
    if name.trim().is_empty() {
        return Err(MemberError::Validation("name is required".to_string()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), MemberError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(MemberError::Validation(format!("invalid email: {}", email))),
    }
}

impl CreateMember {
    pub fn validate(&self) -> Result<(), MemberError> {
        validate_name(&self.name)?;
        validate_email(&self.email)
    }
}

impl Member {
    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Admin
    }

    pub async fn create(pool: &DbPool, member: CreateMember) -> Result<Self, MemberError> {
        member.validate()?;
        let now = Utc::now();

        let member = sqlx::query_as::<_, Member>(
            "INSERT INTO members (id, name, email, role, membership_type, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(member.name.trim())
        .bind(member.email.trim().to_lowercase())
        .bind(member.role)
        .bind(member.membership_type)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, MemberError> {
        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(member)
    }

    /// Oldest active row wins when the same email was registered twice.
    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<Self>, MemberError> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE lower(email) = lower($1)
             ORDER BY is_active DESC, created_at ASC
             LIMIT 1",
        )
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    pub async fn find_by_name(pool: &DbPool, name: &str) -> Result<Vec<Self>, MemberError> {
        let members = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE name = $1 ORDER BY created_at",
        )
        .bind(name)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn find_by_ids(pool: &DbPool, ids: &[Uuid]) -> Result<Vec<Self>, MemberError> {
        let members = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

        Ok(members)
    }

    pub async fn find_all(pool: &DbPool) -> Result<Vec<Self>, MemberError> {
        let members = sqlx::query_as::<_, Member>("SELECT * FROM members ORDER BY name, created_at")
            .fetch_all(pool)
            .await?;

        Ok(members)
    }

    pub async fn find_duplicate_names(pool: &DbPool) -> Result<Vec<DuplicateName>, MemberError> {
        let duplicates = sqlx::query_as::<_, DuplicateName>(
            "SELECT lower(trim(name)) AS name,
                    array_agg(id ORDER BY created_at) AS member_ids,
                    COUNT(*) AS count
             FROM members
             GROUP BY lower(trim(name))
             HAVING COUNT(*) > 1
             ORDER BY name",
        )
        .fetch_all(pool)
        .await?;

        Ok(duplicates)
    }

    pub async fn update(
        pool: &DbPool,
        id: Uuid,
        update_data: UpdateMember,
    ) -> Result<Self, MemberError> {
        if update_data.is_empty() {
            return Err(MemberError::NoUpdateFields);
        }
        if let Some(name) = &update_data.name {
            validate_name(name)?;
        }
        if let Some(email) = &update_data.email {
            validate_email(email)?;
        }

        let existing = match Self::find_by_id(pool, id).await? {
            Some(member) => member,
            None => return Err(MemberError::NotFound { id }),
        };

        let updated = sqlx::query_as::<_, Member>(
            "UPDATE members
             SET name = $2, email = $3, role = $4, membership_type = $5, is_active = $6, updated_at = $7
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(
            update_data
                .name
                .map(|name| name.trim().to_string())
                .unwrap_or(existing.name),
        )
        .bind(
            update_data
                .email
                .map(|email| email.trim().to_lowercase())
                .unwrap_or(existing.email),
        )
        .bind(update_data.role.unwrap_or(existing.role))
        .bind(update_data.membership_type.unwrap_or(existing.membership_type))
        .bind(update_data.is_active.unwrap_or(existing.is_active))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?;

        updated.ok_or(MemberError::NotFound { id })
    }

    pub async fn toggle_active(pool: &DbPool, id: Uuid) -> Result<Self, MemberError> {
        let member = sqlx::query_as::<_, Member>(
            "UPDATE members SET is_active = NOT is_active, updated_at = $2
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?;

        member.ok_or(MemberError::NotFound { id })
    }
}
