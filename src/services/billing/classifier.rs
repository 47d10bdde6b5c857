use crate::models::payment::{Payment, PaymentCategory, PaymentStatus, PaymentType};
use std::ops::RangeInclusive;

pub const SHUTTLECOCK_AMOUNTS: RangeInclusive<i64> = 1..=5_000;
pub const SESSION_AMOUNTS: RangeInclusive<i64> = 18_000..=25_000;
pub const MIN_CONVERTIBLE_SESSION_AMOUNT: i64 = 18_000;

#[derive(Debug, Clone, Copy)]
enum Marker {
    /// Anywhere in the notes, so plurals and inflections still count.
    Contains(&'static str),
    /// A whole word only; "kok" would otherwise hit words like "kokoh".
    Word(&'static str),
}

const MEMBERSHIP_MARKERS: &[Marker] = &[
    Marker::Contains("membership"),
    Marker::Contains("monthly"),
    Marker::Contains("bulanan"),
];
const SHUTTLECOCK_MARKERS: &[Marker] = &[Marker::Contains("shuttlecock"), Marker::Word("kok")];
const SESSION_MARKERS: &[Marker] = &[Marker::Contains("session"), Marker::Contains("sesi")];

fn has_marker(notes: Option<&str>, markers: &[Marker]) -> bool {
    let Some(notes) = notes else {
        return false;
    };
    let notes = notes.to_lowercase();
    markers.iter().any(|marker| match marker {
        Marker::Contains(text) => notes.contains(text),
        Marker::Word(text) => notes
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == *text),
    })
}

/// Heuristic for rows without a stored category. First match wins.
pub fn classify_legacy(amount: i64, notes: Option<&str>, payment_type: PaymentType) -> PaymentCategory {
    if has_marker(notes, MEMBERSHIP_MARKERS) {
        return PaymentCategory::Membership;
    }
    if has_marker(notes, SHUTTLECOCK_MARKERS) || SHUTTLECOCK_AMOUNTS.contains(&amount) {
        return PaymentCategory::Shuttlecock;
    }
    if has_marker(notes, SESSION_MARKERS) || SESSION_AMOUNTS.contains(&amount) {
        return PaymentCategory::Session;
    }
    if payment_type == PaymentType::Monthly {
        return PaymentCategory::Membership;
    }
    PaymentCategory::Other
}

pub fn classify(payment: &Payment) -> PaymentCategory {
    payment.category.unwrap_or_else(|| {
        classify_legacy(payment.amount, payment.notes.as_deref(), payment.payment_type)
    })
}

pub fn can_convert_to_membership(payment: &Payment) -> bool {
    classify(payment) == PaymentCategory::Session
        && payment.payment_type != PaymentType::Monthly
        && payment.status == PaymentStatus::Pending
        && payment.amount >= MIN_CONVERTIBLE_SESSION_AMOUNT
}

/// A monthly-typed row bills as a membership even when its notes read like a session.
pub fn bills_as_membership(payment: &Payment) -> bool {
    payment.payment_type == PaymentType::Monthly || classify(payment) == PaymentCategory::Membership
}

/// Whether any of a member's payments for one day already covers the session.
pub fn covers_session(payments: &[Payment]) -> bool {
    payments
        .iter()
        .any(|p| bills_as_membership(p) || classify(p) == PaymentCategory::Session)
}

pub fn can_convert_to_daily(payment: &Payment) -> bool {
    bills_as_membership(payment) && payment.status == PaymentStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::billing::test_support::payment;
    use proptest::prelude::*;

    #[test]
    fn boundaries_are_inclusive() {
        use PaymentCategory::*;

        assert_eq!(classify_legacy(5_000, None, PaymentType::Daily), Shuttlecock);
        assert_eq!(classify_legacy(5_001, None, PaymentType::Daily), Other);
        assert_eq!(classify_legacy(0, None, PaymentType::Daily), Other);
        assert_eq!(classify_legacy(18_000, None, PaymentType::Daily), Session);
        assert_eq!(classify_legacy(25_000, None, PaymentType::Daily), Session);
        assert_eq!(classify_legacy(25_001, None, PaymentType::Daily), Other);
        assert_eq!(classify_legacy(17_999, None, PaymentType::Daily), Other);
    }

    #[test]
    fn notes_markers_override_amounts() {
        use PaymentCategory::*;

        assert_eq!(
            classify_legacy(40_000, Some("Shuttlecock fee"), PaymentType::Daily),
            Shuttlecock
        );
        assert_eq!(classify_legacy(3_000, Some("SESI sabtu"), PaymentType::Daily), Shuttlecock);
        assert_eq!(classify_legacy(60_000, Some("session fee"), PaymentType::Other), Session);
        assert_eq!(
            classify_legacy(2_000, Some("Monthly membership, replaces session fee"), PaymentType::Daily),
            Membership
        );
    }

    #[test]
    fn inflected_markers_still_match() {
        use PaymentCategory::*;

        assert_eq!(classify_legacy(3_000, Some("memberships March"), PaymentType::Daily), Membership);
        assert_eq!(classify_legacy(6_000, Some("2 shuttlecocks"), PaymentType::Daily), Shuttlecock);
        assert_eq!(
            classify_legacy(30_000, Some("Saturday sessions fee"), PaymentType::Daily),
            Session
        );
        assert_eq!(classify_legacy(60_000, Some("Iuran BULANAN"), PaymentType::Other), Membership);
    }

    #[test]
    fn short_kok_marker_needs_a_whole_word() {
        assert_eq!(
            classify_legacy(60_000, Some("lapangan kokoh"), PaymentType::Daily),
            PaymentCategory::Other
        );
        assert_eq!(
            classify_legacy(60_000, Some("beli kok"), PaymentType::Daily),
            PaymentCategory::Shuttlecock
        );
    }

    #[test]
    fn monthly_type_without_notes_is_membership() {
        assert_eq!(
            classify_legacy(45_000, None, PaymentType::Monthly),
            PaymentCategory::Membership
        );
    }

    #[test]
    fn stored_category_wins() {
        let mut p = payment(3_000, PaymentType::Daily);
        p.category = Some(PaymentCategory::Session);
        assert_eq!(classify(&p), PaymentCategory::Session);
    }

    #[test]
    fn convertibility() {
        let mut p = payment(18_000, PaymentType::Daily);
        assert!(can_convert_to_membership(&p));
        assert!(!can_convert_to_daily(&p));

        p.status = PaymentStatus::Paid;
        assert!(!can_convert_to_membership(&p));

        let mut m = payment(40_000, PaymentType::Monthly);
        assert!(can_convert_to_daily(&m));
        m.status = PaymentStatus::Overdue;
        assert!(!can_convert_to_daily(&m));

        let mut legacy = payment(18_000, PaymentType::Monthly);
        legacy.notes = Some("Session fee".to_string());
        assert_eq!(classify(&legacy), PaymentCategory::Session);
        assert!(can_convert_to_daily(&legacy));
        assert!(!can_convert_to_membership(&legacy));
    }

    #[test]
    fn legacy_rows_cover_the_session() {
        let shuttle = payment(3_000, PaymentType::Daily);
        assert!(!covers_session(&[]));
        assert!(!covers_session(&[shuttle.clone()]));

        // No stored category; the amount alone marks it as a session fee.
        let legacy_session = payment(18_000, PaymentType::Daily);
        assert!(covers_session(&[shuttle.clone(), legacy_session]));

        let membership = payment(45_000, PaymentType::Monthly);
        assert!(covers_session(&[shuttle, membership]));

        let mut tagged = payment(3_000, PaymentType::Daily);
        tagged.category = Some(PaymentCategory::Session);
        assert!(covers_session(&[tagged]));
    }

    proptest! {
        #[test]
        fn small_amounts_without_notes_are_shuttlecock(amount in 1i64..=5_000) {
            prop_assert_eq!(classify_legacy(amount, None, PaymentType::Daily), PaymentCategory::Shuttlecock);
        }

        #[test]
        fn session_amounts_without_notes_are_session(amount in 18_000i64..=25_000) {
            prop_assert_eq!(classify_legacy(amount, None, PaymentType::Daily), PaymentCategory::Session);
        }

        #[test]
        fn membership_marker_wins_for_any_amount(
            amount in 0i64..=1_000_000,
            prefix in "[a-z ]{0,12}",
            marker in prop::sample::select(vec!["membership", "Monthly", "BULANAN"]),
            suffix in "[a-z]{0,6}",
        ) {
            let notes = format!("{} {}{}", prefix, marker, suffix);
            prop_assert_eq!(
                classify_legacy(amount, Some(&notes), PaymentType::Daily),
                PaymentCategory::Membership
            );
        }
    }
}
