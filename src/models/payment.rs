use crate::database::connection::DbPool;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Postgres, Type};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("No fields provided for update")]
    NoUpdateFields,
    #[error("Invalid payment: {0}")]
    Validation(String),
    #[error("Payment {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Daily,
    Monthly,
    Shuttlecock,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Partial,
    Overdue,
}

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid | Partial | Overdue) | (Partial, Paid | Overdue) | (Overdue, Paid | Partial)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "partial" => Ok(PaymentStatus::Partial),
            "overdue" => Ok(PaymentStatus::Overdue),
            _ => Err(()),
        }
    }
}

/// What a payment is for. Stored on new rows; legacy rows are classified on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentCategory {
    Shuttlecock,
    Session,
    Membership,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub amount: i64,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub match_id: Option<Uuid>,
    pub category: Option<PaymentCategory>,
    pub converted_from_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub member_id: Uuid,
    pub amount: i64,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub match_id: Option<Uuid>,
    pub category: Option<PaymentCategory>,
}

impl CreatePayment {
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.amount < 0 {
            return Err(PaymentError::Validation(
                "amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Payment {
    pub async fn create(pool: &DbPool, payment: CreatePayment) -> Result<Self, PaymentError> {
        payment.validate()?;
        Ok(Self::insert(pool, payment).await?)
    }

    pub async fn insert<'e, E>(executor: E, payment: CreatePayment) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let now = Utc::now();

        sqlx::query_as::<_, Payment>(
            "INSERT INTO payments (id, member_id, amount, payment_type, status, due_date, notes, match_id, category, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(payment.member_id)
        .bind(payment.amount)
        .bind(payment.payment_type)
        .bind(payment.status)
        .bind(payment.due_date)
        .bind(payment.notes)
        .bind(payment.match_id)
        .bind(payment.category)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, PaymentError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(payment)
    }

    pub async fn find_by_member(pool: &DbPool, member_id: Uuid) -> Result<Vec<Self>, PaymentError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE member_id = $1 ORDER BY due_date DESC, created_at",
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    pub async fn find_by_members(
        pool: &DbPool,
        member_ids: &[Uuid],
    ) -> Result<Vec<Self>, PaymentError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE member_id = ANY($1) ORDER BY due_date DESC, created_at",
        )
        .bind(member_ids)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    pub async fn find_all(pool: &DbPool) -> Result<Vec<Self>, PaymentError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments ORDER BY due_date DESC, created_at",
        )
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    pub async fn find_uncategorized(pool: &DbPool) -> Result<Vec<Self>, PaymentError> {
        let payments =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE category IS NULL")
                .fetch_all(pool)
                .await?;

        Ok(payments)
    }

    pub async fn find_by_member_on<'e, E>(
        executor: E,
        member_id: Uuid,
        due_date: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE member_id = $1 AND due_date = $2 ORDER BY created_at",
        )
        .bind(member_id)
        .bind(due_date)
        .fetch_all(executor)
        .await
    }

    pub async fn update_status(
        pool: &DbPool,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Self, PaymentError> {
        let existing = match Self::find_by_id(pool, id).await? {
            Some(payment) => payment,
            None => return Err(PaymentError::NotFound { id }),
        };

        if !existing.status.can_transition_to(status) {
            return Err(PaymentError::InvalidTransition {
                id,
                from: existing.status,
                to: status,
            });
        }

        let updated = sqlx::query_as::<_, Payment>(
            "UPDATE payments
             SET status = $2, updated_at = $3
             WHERE id = $1 AND status = $4
             RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .bind(existing.status)
        .fetch_optional(pool)
        .await?;

        // A concurrent writer moved the status between our read and write.
        updated.ok_or(PaymentError::InvalidTransition {
            id,
            from: existing.status,
            to: status,
        })
    }

    /// Writes a conversion computed from `before` as a single guarded statement.
    /// Returns `None` when the row no longer matches `before`.
    pub async fn commit_conversion(
        pool: &DbPool,
        before: &Payment,
        after: &Payment,
    ) -> Result<Option<Self>, PaymentError> {
        let updated = sqlx::query_as::<_, Payment>(
            "UPDATE payments
             SET payment_type = $2, amount = $3, notes = $4, category = $5,
                 converted_from_amount = $6, updated_at = $7
             WHERE id = $1 AND payment_type = $8 AND amount = $9 AND status = 'pending'
             RETURNING *",
        )
        .bind(before.id)
        .bind(after.payment_type)
        .bind(after.amount)
        .bind(&after.notes)
        .bind(after.category)
        .bind(after.converted_from_amount)
        .bind(Utc::now())
        .bind(before.payment_type)
        .bind(before.amount)
        .fetch_optional(pool)
        .await?;

        Ok(updated)
    }

    pub async fn set_category<'e, E>(
        executor: E,
        id: Uuid,
        category: PaymentCategory,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE payments SET category = $2, updated_at = $3 WHERE id = $1 AND category IS NULL",
        )
        .bind(id)
        .bind(category)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &DbPool, id: Uuid) -> Result<(), PaymentError> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PaymentError::NotFound { id });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions() {
        use PaymentStatus::*;

        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Partial));
        assert!(Pending.can_transition_to(Overdue));
        assert!(Partial.can_transition_to(Paid));
        assert!(Overdue.can_transition_to(Partial));

        assert!(!Paid.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Overdue));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Partial.can_transition_to(Pending));
    }

    #[test]
    fn status_parses_lowercase_names() {
        assert_eq!("overdue".parse::<PaymentStatus>(), Ok(PaymentStatus::Overdue));
        assert!("Paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn negative_amount_is_rejected() {
        let payment = CreatePayment {
            member_id: Uuid::new_v4(),
            amount: -1,
            payment_type: PaymentType::Daily,
            status: PaymentStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            notes: None,
            match_id: None,
            category: None,
        };
        assert!(matches!(payment.validate(), Err(PaymentError::Validation(_))));
    }

    #[test]
    fn serializes_type_field_name() {
        let payment = Payment {
            id: Uuid::nil(),
            member_id: Uuid::nil(),
            amount: 18_000,
            payment_type: PaymentType::Daily,
            status: PaymentStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            notes: None,
            match_id: None,
            category: Some(PaymentCategory::Session),
            converted_from_amount: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["type"], "daily");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["category"], "session");
    }
}
