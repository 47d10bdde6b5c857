use crate::config::BillingConfig;
use crate::database::connection::DbPool;
use crate::models::payment::{Payment, PaymentCategory, PaymentError, PaymentStatus, PaymentType};
use crate::services::billing::classifier::{
    MIN_CONVERTIBLE_SESSION_AMOUNT, bills_as_membership, classify,
};
use crate::services::calendar::{month_name, saturdays_in_month};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Payment with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("Payment {payment_id} cannot be converted: {reason}")]
    InvalidState { payment_id: Uuid, reason: String },
    #[error("Payment {payment_id} does not belong to member {member_id}")]
    MemberMismatch { payment_id: Uuid, member_id: Uuid },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<PaymentError> for ConversionError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound { id } => ConversionError::NotFound { id },
            PaymentError::Database(e) => ConversionError::Database(e),
            PaymentError::InvalidTransition { id, .. } => ConversionError::InvalidState {
                payment_id: id,
                reason: err.to_string(),
            },
            PaymentError::NoUpdateFields | PaymentError::Validation(_) => {
                ConversionError::InvalidState {
                    payment_id: Uuid::nil(),
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn invalid(payment: &Payment, reason: impl Into<String>) -> ConversionError {
    ConversionError::InvalidState {
        payment_id: payment.id,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipConversion {
    pub payment: Payment,
    pub previous_amount: i64,
    pub membership_fee: i64,
    pub saturday_count: u32,
    pub month_name: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyConversion {
    pub payment: Payment,
    pub previous_amount: i64,
    pub restored_amount: i64,
}

/// Two-tier table: four-Saturday months are cheaper than five-Saturday months.
pub fn membership_fee(saturday_count: u32, billing: &BillingConfig) -> i64 {
    if saturday_count == 4 {
        billing.four_saturday_fee
    } else {
        billing.five_saturday_fee
    }
}

fn ensure_owner(payment: &Payment, member_id: Uuid) -> Result<(), ConversionError> {
    if payment.member_id != member_id {
        return Err(ConversionError::MemberMismatch {
            payment_id: payment.id,
            member_id,
        });
    }
    Ok(())
}

fn ensure_pending(payment: &Payment) -> Result<(), ConversionError> {
    if payment.status != PaymentStatus::Pending {
        return Err(invalid(
            payment,
            format!("payment not pending (status: {})", payment.status),
        ));
    }
    Ok(())
}

/// Membership for the calendar month containing `today`.
pub fn convert_session_to_membership(
    payment: &Payment,
    member_id: Uuid,
    today: NaiveDate,
    billing: &BillingConfig,
) -> Result<MembershipConversion, ConversionError> {
    ensure_owner(payment, member_id)?;
    if payment.payment_type == PaymentType::Monthly {
        return Err(invalid(payment, "payment already monthly"));
    }
    ensure_pending(payment)?;
    let category = classify(payment);
    if category != PaymentCategory::Session {
        return Err(invalid(
            payment,
            format!("payment is a {:?} fee, not a session fee", category).to_lowercase(),
        ));
    }
    if payment.amount < MIN_CONVERTIBLE_SESSION_AMOUNT {
        return Err(invalid(
            payment,
            format!(
                "amount {} is below the session fee of {}",
                payment.amount, MIN_CONVERTIBLE_SESSION_AMOUNT
            ),
        ));
    }

    let saturday_count = saturdays_in_month(today.year(), today.month());
    let fee = membership_fee(saturday_count, billing);
    let month = month_name(today.month());

    let mut updated = payment.clone();
    updated.payment_type = PaymentType::Monthly;
    updated.category = Some(PaymentCategory::Membership);
    updated.amount = fee;
    updated.converted_from_amount = Some(payment.amount);
    updated.notes = Some(format!(
        "Monthly membership for {} {} ({} Saturdays), replaces session fee",
        month,
        today.year(),
        saturday_count
    ));

    Ok(MembershipConversion {
        payment: updated,
        previous_amount: payment.amount,
        membership_fee: fee,
        saturday_count,
        month_name: month.to_string(),
        year: today.year(),
    })
}

/// Restores the amount replaced by the forward conversion, or the configured daily fee.
pub fn convert_membership_to_daily(
    payment: &Payment,
    member_id: Uuid,
    billing: &BillingConfig,
) -> Result<DailyConversion, ConversionError> {
    ensure_owner(payment, member_id)?;
    if payment.payment_type == PaymentType::Daily && classify(payment) == PaymentCategory::Session {
        return Err(invalid(payment, "payment already daily"));
    }
    ensure_pending(payment)?;
    if !bills_as_membership(payment) {
        return Err(invalid(
            payment,
            format!("payment is a {:?} fee, not a membership", classify(payment)).to_lowercase(),
        ));
    }

    let restored = payment
        .converted_from_amount
        .unwrap_or(billing.daily_reversal_fee);

    let mut updated = payment.clone();
    updated.payment_type = PaymentType::Daily;
    updated.category = Some(PaymentCategory::Session);
    updated.amount = restored;
    updated.converted_from_amount = None;
    updated.notes = Some(format!(
        "Session fee for {} (switched back to daily billing)",
        payment.due_date.format("%Y-%m-%d")
    ));

    Ok(DailyConversion {
        payment: updated,
        previous_amount: payment.amount,
        restored_amount: restored,
    })
}

async fn load(pool: &DbPool, payment_id: Uuid) -> Result<Payment, ConversionError> {
    Payment::find_by_id(pool, payment_id)
        .await?
        .ok_or(ConversionError::NotFound { id: payment_id })
}

async fn commit(pool: &DbPool, before: &Payment, after: &Payment) -> Result<Payment, ConversionError> {
    if let Some(updated) = Payment::commit_conversion(pool, before, after).await? {
        return Ok(updated);
    }

    warn!("Payment {} changed while being converted", before.id);
    match Payment::find_by_id(pool, before.id).await? {
        Some(_) => Err(invalid(before, "payment changed concurrently, reload and retry")),
        None => Err(ConversionError::NotFound { id: before.id }),
    }
}

pub async fn apply_membership_conversion(
    pool: &DbPool,
    payment_id: Uuid,
    member_id: Uuid,
    today: NaiveDate,
    billing: &BillingConfig,
) -> Result<MembershipConversion, ConversionError> {
    let before = load(pool, payment_id).await?;
    let mut conversion = convert_session_to_membership(&before, member_id, today, billing)?;
    conversion.payment = commit(pool, &before, &conversion.payment).await?;

    info!(
        "Converted payment {} to {} membership: {} -> {} ({} Saturdays)",
        payment_id,
        conversion.month_name,
        conversion.previous_amount,
        conversion.membership_fee,
        conversion.saturday_count
    );
    Ok(conversion)
}

pub async fn apply_daily_conversion(
    pool: &DbPool,
    payment_id: Uuid,
    member_id: Uuid,
    billing: &BillingConfig,
) -> Result<DailyConversion, ConversionError> {
    let before = load(pool, payment_id).await?;
    let mut conversion = convert_membership_to_daily(&before, member_id, billing)?;
    conversion.payment = commit(pool, &before, &conversion.payment).await?;

    info!(
        "Converted payment {} back to daily billing: {} -> {}",
        payment_id, conversion.previous_amount, conversion.restored_amount
    );
    Ok(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::billing::test_support::payment;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fee_follows_saturday_count() {
        let billing = BillingConfig::default();

        let february = convert_session_to_membership(
            &payment(18_000, PaymentType::Daily),
            Uuid::nil(),
            date(2025, 2, 10),
            &billing,
        )
        .unwrap();
        assert_eq!(february.saturday_count, 4);
        assert_eq!(february.membership_fee, 40_000);
        assert_eq!(february.month_name, "February");

        let march = convert_session_to_membership(
            &payment(18_000, PaymentType::Daily),
            Uuid::nil(),
            date(2025, 3, 10),
            &billing,
        )
        .unwrap();
        assert_eq!(march.saturday_count, 5);
        assert_eq!(march.membership_fee, 45_000);
    }

    #[test]
    fn forward_conversion_keeps_identity() {
        let original = payment(20_000, PaymentType::Daily);
        let conversion =
            convert_session_to_membership(&original, Uuid::nil(), date(2025, 3, 3), &BillingConfig::default())
                .unwrap();

        let updated = &conversion.payment;
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.due_date, original.due_date);
        assert_eq!(updated.payment_type, PaymentType::Monthly);
        assert_eq!(updated.category, Some(PaymentCategory::Membership));
        assert_eq!(updated.converted_from_amount, Some(20_000));
        assert_eq!(conversion.previous_amount, 20_000);
        assert_eq!(classify(updated), PaymentCategory::Membership);
    }

    #[test]
    fn round_trip_restores_amount_and_type() {
        let billing = BillingConfig::default();
        let original = payment(18_000, PaymentType::Daily);

        let forward =
            convert_session_to_membership(&original, Uuid::nil(), date(2025, 3, 3), &billing).unwrap();
        let back = convert_membership_to_daily(&forward.payment, Uuid::nil(), &billing).unwrap();

        assert_eq!(back.payment.id, original.id);
        assert_eq!(back.payment.due_date, original.due_date);
        assert_eq!(back.payment.amount, original.amount);
        assert_eq!(back.payment.payment_type, original.payment_type);
        assert_eq!(back.payment.converted_from_amount, None);
        assert_eq!(classify(&back.payment), PaymentCategory::Session);
    }

    #[test]
    fn reverse_without_history_uses_daily_fee() {
        let legacy = payment(45_000, PaymentType::Monthly);
        let back = convert_membership_to_daily(&legacy, Uuid::nil(), &BillingConfig::default()).unwrap();
        assert_eq!(back.restored_amount, 23_000);
        assert_eq!(back.payment.amount, 23_000);
    }

    #[test]
    fn monthly_row_with_session_notes_converts_back() {
        let mut legacy = payment(18_000, PaymentType::Monthly);
        legacy.notes = Some("Sesi sabtu".to_string());

        let back = convert_membership_to_daily(&legacy, Uuid::nil(), &BillingConfig::default()).unwrap();
        assert_eq!(back.payment.payment_type, PaymentType::Daily);
        assert_eq!(back.payment.category, Some(PaymentCategory::Session));
        assert_eq!(back.restored_amount, 23_000);
    }

    #[test]
    fn rejects_wrong_source_state() {
        let billing = BillingConfig::default();
        let today = date(2025, 3, 3);

        let monthly = payment(40_000, PaymentType::Monthly);
        match convert_session_to_membership(&monthly, Uuid::nil(), today, &billing) {
            Err(ConversionError::InvalidState { payment_id, reason }) => {
                assert_eq!(payment_id, monthly.id);
                assert_eq!(reason, "payment already monthly");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let mut paid = payment(18_000, PaymentType::Daily);
        paid.status = PaymentStatus::Paid;
        match convert_session_to_membership(&paid, Uuid::nil(), today, &billing) {
            Err(ConversionError::InvalidState { reason, .. }) => {
                assert!(reason.starts_with("payment not pending"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let shuttle = payment(3_000, PaymentType::Shuttlecock);
        assert!(matches!(
            convert_session_to_membership(&shuttle, Uuid::nil(), today, &billing),
            Err(ConversionError::InvalidState { .. })
        ));

        let session = payment(18_000, PaymentType::Daily);
        match convert_membership_to_daily(&session, Uuid::nil(), &billing) {
            Err(ConversionError::InvalidState { reason, .. }) => {
                assert_eq!(reason, "payment already daily");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn rejects_other_members_payment() {
        let p = payment(18_000, PaymentType::Daily);
        let stranger = Uuid::new_v4();
        assert!(matches!(
            convert_session_to_membership(&p, stranger, date(2025, 3, 3), &BillingConfig::default()),
            Err(ConversionError::MemberMismatch { .. })
        ));
        assert!(matches!(
            convert_membership_to_daily(&p, stranger, &BillingConfig::default()),
            Err(ConversionError::MemberMismatch { .. })
        ));
    }
}
