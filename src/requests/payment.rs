use crate::models::payment::{PaymentCategory, PaymentStatus, PaymentType};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub member_id: Uuid,
    pub amount: i64,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub status: Option<PaymentStatus>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub match_id: Option<Uuid>,
    pub category: Option<PaymentCategory>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub member_id: Option<Uuid>,
}

/// `member_id` must match the payment's owner.
#[derive(Debug, Deserialize)]
pub struct ConversionRequest {
    pub member_id: Uuid,
}
