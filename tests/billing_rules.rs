use chrono::{NaiveDate, Utc};
use dlob::config::BillingConfig;
use dlob::models::matches::{MatchResult, Team};
use dlob::models::payment::{Payment, PaymentCategory, PaymentStatus, PaymentType};
use dlob::services::billing::classifier::{can_convert_to_daily, can_convert_to_membership, classify};
use dlob::services::billing::conversion::{
    ConversionError, convert_membership_to_daily, convert_session_to_membership,
};
use dlob::services::billing::grouping::{MemberDirectory, build_buckets};
use dlob::services::billing::shuttlecock_share;
use dlob::services::outcome::{MatchOutcome, did_win, resolve_outcome};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn payment(member_id: Uuid, amount: i64, notes: Option<&str>, due: NaiveDate) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        member_id,
        amount,
        payment_type: PaymentType::Daily,
        status: PaymentStatus::Pending,
        due_date: due,
        notes: notes.map(str::to_string),
        match_id: None,
        category: None,
        converted_from_amount: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn saturday_of_fees_lands_in_one_bucket() {
    let andi = Uuid::new_v4();
    let andi_again = Uuid::new_v4();
    let budi = Uuid::new_v4();
    let mut directory = MemberDirectory::default();
    directory.insert(andi, "Andi");
    directory.insert(andi_again, "Andi");
    directory.insert(budi, "Budi");

    let saturday = date(2025, 3, 1);
    let payments = vec![
        payment(andi, 18_000, None, saturday),
        payment(andi_again, 3_000, Some("Shuttlecock fee"), saturday),
        payment(andi, 3_000, None, saturday),
        payment(budi, 18_000, None, saturday),
        payment(andi, 18_000, None, date(2025, 3, 8)),
    ];

    let buckets = build_buckets(payments, &directory);
    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[0].key, "Andi_2025-03-08");
    assert_eq!(buckets[1].key, "Andi_2025-03-01");
    assert_eq!(buckets[2].key, "Budi_2025-03-01");

    let andi_first = &buckets[1];
    assert_eq!(andi_first.shuttlecock.len(), 2);
    assert!(andi_first.session.is_some());
    assert_eq!(andi_first.total_amount, 24_000);
    assert_eq!(andi_first.pending_amount, 24_000);
}

#[test]
fn session_fee_converts_to_membership_and_back() {
    let member = Uuid::new_v4();
    let billing = BillingConfig::default();
    let original = payment(member, 18_000, None, date(2025, 3, 1));
    assert!(can_convert_to_membership(&original));

    // March 2025 has five Saturdays.
    let forward = convert_session_to_membership(&original, member, date(2025, 3, 5), &billing).unwrap();
    assert_eq!(forward.membership_fee, 45_000);
    assert_eq!(forward.payment.id, original.id);
    assert_eq!(forward.payment.due_date, original.due_date);
    assert_eq!(classify(&forward.payment), PaymentCategory::Membership);
    assert!(can_convert_to_daily(&forward.payment));

    let back = convert_membership_to_daily(&forward.payment, member, &billing).unwrap();
    assert_eq!(back.restored_amount, 18_000);
    assert_eq!(back.payment.payment_type, PaymentType::Daily);
    assert_eq!(classify(&back.payment), PaymentCategory::Session);
}

#[test]
fn conversion_rejects_other_members_and_paid_rows() {
    let member = Uuid::new_v4();
    let billing = BillingConfig::default();
    let original = payment(member, 18_000, None, date(2025, 2, 1));

    assert!(matches!(
        convert_session_to_membership(&original, Uuid::new_v4(), date(2025, 2, 3), &billing),
        Err(ConversionError::MemberMismatch { .. })
    ));

    let mut paid = original.clone();
    paid.status = PaymentStatus::Paid;
    assert!(matches!(
        convert_session_to_membership(&paid, member, date(2025, 2, 3), &billing),
        Err(ConversionError::InvalidState { .. })
    ));
}

#[test]
fn shuttlecock_cost_is_split_between_players() {
    assert_eq!(shuttlecock_share(1, 12_000, 4), 3_000);
    assert_eq!(shuttlecock_share(1, 10_000, 3), 3_334);
    assert_eq!(shuttlecock_share(0, 12_000, 4), 0);
}

#[test]
fn scores_decide_the_outcome() {
    let result = MatchResult {
        match_id: Uuid::new_v4(),
        team1_score: Some(42),
        team2_score: Some(37),
        winner_team: Some(Team::Team2),
    };
    assert_eq!(resolve_outcome(Team::Team1, Some(&result)), Some(MatchOutcome::Won));
    assert_eq!(did_win(Team::Team2, Some(&result)), Some(false));
    assert_eq!(did_win(Team::Team1, None), None);
}
