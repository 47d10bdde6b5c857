pub mod classifier;
pub mod conversion;
pub mod grouping;

use crate::database::connection::DbPool;
use crate::models::payment::{Payment, PaymentError};
use classifier::classify_legacy;
use tracing::info;

/// Each player's share of the shuttlecocks used, rounded up to whole units.
pub fn shuttlecock_share(shuttlecock_count: i32, shuttlecock_price: i64, participants: usize) -> i64 {
    if shuttlecock_count <= 0 || participants == 0 {
        return 0;
    }
    let total = i64::from(shuttlecock_count) * shuttlecock_price;
    let players = participants as i64;
    (total + players - 1) / players
}

/// Stores the heuristic category on every row that has none yet.
pub async fn backfill_categories(pool: &DbPool) -> Result<u64, PaymentError> {
    let legacy = Payment::find_uncategorized(pool).await?;
    let mut tx = pool.begin().await?;
    let mut updated = 0;

    for payment in &legacy {
        let category = classify_legacy(payment.amount, payment.notes.as_deref(), payment.payment_type);
        updated += Payment::set_category(&mut *tx, payment.id, category).await?;
    }

    tx.commit().await?;
    info!("Backfilled category on {} of {} legacy payments", updated, legacy.len());
    Ok(updated)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::payment::{Payment, PaymentStatus, PaymentType};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    /// Pending, uncategorised payment owned by the nil member, due 2025-03-01.
    pub fn payment(amount: i64, payment_type: PaymentType) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            member_id: Uuid::nil(),
            amount,
            payment_type,
            status: PaymentStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            notes: None,
            match_id: None,
            category: None,
            converted_from_amount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuttlecock_share_rounds_up() {
        assert_eq!(shuttlecock_share(1, 12_000, 4), 3_000);
        assert_eq!(shuttlecock_share(2, 12_000, 4), 6_000);
        assert_eq!(shuttlecock_share(1, 10_000, 3), 3_334);
        assert_eq!(shuttlecock_share(0, 12_000, 4), 0);
        assert_eq!(shuttlecock_share(3, 12_000, 0), 0);
    }
}
