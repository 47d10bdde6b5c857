//! Buckets are keyed by member *name*, not id. Some people exist as several
//! member rows, and their payments must still land in one bucket.

use crate::models::member::Member;
use crate::models::payment::{Payment, PaymentCategory, PaymentStatus};
use crate::services::billing::classifier::classify;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MemberDirectory {
    names: HashMap<Uuid, String>,
}

impl MemberDirectory {
    pub fn new(members: &[Member]) -> Self {
        Self {
            names: members
                .iter()
                .map(|member| (member.id, member.name.clone()))
                .collect(),
        }
    }

    pub fn insert(&mut self, id: Uuid, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Unknown ids resolve to their own string form so they never merge with a real name.
    pub fn name_of(&self, id: Uuid) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

pub fn group_key(payment: &Payment, directory: &MemberDirectory) -> String {
    format!(
        "{}_{}",
        directory.name_of(payment.member_id),
        payment.due_date.format("%Y-%m-%d")
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionBucket {
    pub key: String,
    pub member_name: String,
    pub due_date: NaiveDate,
    pub shuttlecock: Vec<Payment>,
    pub session: Option<Payment>,
    pub others: Vec<Payment>,
    pub total_amount: i64,
    pub pending_amount: i64,
}

impl SessionBucket {
    fn new(key: String, member_name: String, due_date: NaiveDate) -> Self {
        Self {
            key,
            member_name,
            due_date,
            shuttlecock: Vec::new(),
            session: None,
            others: Vec::new(),
            total_amount: 0,
            pending_amount: 0,
        }
    }

    fn push(&mut self, payment: Payment) {
        self.total_amount += payment.amount;
        if payment.status != PaymentStatus::Paid {
            self.pending_amount += payment.amount;
        }

        match classify(&payment) {
            PaymentCategory::Shuttlecock => self.shuttlecock.push(payment),
            PaymentCategory::Session | PaymentCategory::Membership if self.session.is_none() => {
                self.session = Some(payment);
            }
            PaymentCategory::Session | PaymentCategory::Membership => {
                warn!(
                    "Bucket {} already holds a session fee; payment {} listed with others",
                    self.key, payment.id
                );
                self.others.push(payment);
            }
            PaymentCategory::Other => self.others.push(payment),
        }
    }
}

/// Newest due date first, then by member name.
pub fn build_buckets(payments: Vec<Payment>, directory: &MemberDirectory) -> Vec<SessionBucket> {
    let mut buckets: HashMap<String, SessionBucket> = HashMap::new();

    for payment in payments {
        let key = group_key(&payment, directory);
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                SessionBucket::new(key, directory.name_of(payment.member_id), payment.due_date)
            })
            .push(payment);
    }

    let mut buckets: Vec<SessionBucket> = buckets.into_values().collect();
    buckets.sort_by(|a, b| {
        b.due_date
            .cmp(&a.due_date)
            .then_with(|| a.member_name.cmp(&b.member_name))
    });
    buckets
}
