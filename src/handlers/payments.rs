use crate::{
    config::AppConfig,
    database::connection::DbPool,
    middleware::auth::AuthenticatedUser,
    models::{
        member::Member,
        payment::{CreatePayment, Payment, PaymentError, PaymentStatus},
    },
    requests::payment::{ConversionRequest, PaymentQuery, PaymentRequest, UpdateStatusRequest},
    services::billing::{
        backfill_categories,
        classifier::classify_legacy,
        conversion::{ConversionError, apply_daily_conversion, apply_membership_conversion},
        grouping::{MemberDirectory, build_buckets},
    },
    utils::helpers::{ApiResponse, forbidden, today},
};
use actix_web::{HttpResponse, Result, web};
use tracing::{error, info, warn};
use uuid::Uuid;

fn payment_error(e: PaymentError, action: &str) -> HttpResponse {
    match e {
        PaymentError::NotFound { id } => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error(format!("Payment {} not found", id))),
        PaymentError::Database(e) => {
            error!("Database error while trying to {}: {}", action, e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(format!("Failed to {}", action)))
        }
        PaymentError::InvalidTransition { .. } => {
            HttpResponse::Conflict().json(ApiResponse::<()>::error(e.to_string()))
        }
        e => HttpResponse::BadRequest().json(ApiResponse::<()>::error(e.to_string())),
    }
}

fn conversion_error(e: ConversionError) -> HttpResponse {
    match e {
        ConversionError::NotFound { id } => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error(format!("Payment {} not found", id))),
        ConversionError::InvalidState { .. } => {
            HttpResponse::Conflict().json(ApiResponse::<()>::error(e.to_string()))
        }
        ConversionError::MemberMismatch { .. } => {
            warn!("{}", e);
            forbidden()
        }
        ConversionError::Database(e) => {
            error!("Database error converting payment: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to convert payment".to_string()))
        }
    }
}

/// Members only ever see their own rows; admins may name anyone.
fn target_member(user: &AuthenticatedUser, requested: Option<Uuid>) -> Option<Uuid> {
    match requested {
        Some(id) if id != user.user_id && !user.is_admin() => None,
        Some(id) => Some(id),
        None => Some(user.user_id),
    }
}

pub async fn index(
    pool: web::Data<DbPool>,
    query: web::Query<PaymentQuery>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let payments = if user.is_admin() && query.member_id.is_none() {
        Payment::find_all(&pool).await
    } else {
        let Some(member_id) = target_member(&user, query.member_id) else {
            return Ok(forbidden());
        };
        Payment::find_by_member(&pool, member_id).await
    };

    match payments {
        Ok(payments) => Ok(HttpResponse::Ok().json(ApiResponse::success(payments))),
        Err(e) => Ok(payment_error(e, "fetch payments")),
    }
}

pub async fn create(
    pool: web::Data<DbPool>,
    request: web::Json<PaymentRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let request = request.into_inner();
    info!(
        "Creating {:?} payment of {} for member {} by {}",
        request.payment_type, request.amount, request.member_id, user.user_id
    );

    let category = request.category.unwrap_or_else(|| {
        classify_legacy(request.amount, request.notes.as_deref(), request.payment_type)
    });
    let payment = CreatePayment {
        member_id: request.member_id,
        amount: request.amount,
        payment_type: request.payment_type,
        status: request.status.unwrap_or(PaymentStatus::Pending),
        due_date: request.due_date,
        notes: request.notes,
        match_id: request.match_id,
        category: Some(category),
    };

    match Payment::create(&pool, payment).await {
        Ok(payment) => {
            info!("Created payment {}", payment.id);
            Ok(HttpResponse::Created().json(ApiResponse::success(payment)))
        }
        Err(e) => Ok(payment_error(e, "create payment")),
    }
}

pub async fn show(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let payment_id = path.into_inner();

    match Payment::find_by_id(&pool, payment_id).await {
        Ok(Some(payment)) if payment.member_id != user.user_id && !user.is_admin() => {
            Ok(forbidden())
        }
        Ok(Some(payment)) => Ok(HttpResponse::Ok().json(ApiResponse::success(payment))),
        Ok(None) => Ok(payment_error(PaymentError::NotFound { id: payment_id }, "fetch payment")),
        Err(e) => Ok(payment_error(e, "fetch payment")),
    }
}

pub async fn update_status(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    request: web::Json<UpdateStatusRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let payment_id = path.into_inner();
    info!(
        "Setting payment {} to {} by {}",
        payment_id, request.status, user.user_id
    );

    match Payment::update_status(&pool, payment_id, request.status).await {
        Ok(payment) => Ok(HttpResponse::Ok().json(ApiResponse::success(payment))),
        Err(e) => Ok(payment_error(e, "update payment status")),
    }
}

pub async fn delete(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let payment_id = path.into_inner();
    info!("Deleting payment {} by {}", payment_id, user.user_id);

    match Payment::delete(&pool, payment_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(payment_error(e, "delete payment")),
    }
}

/// Session buckets for a member, merging rows of every member record that
/// shares the same display name.
pub async fn buckets(
    pool: web::Data<DbPool>,
    query: web::Query<PaymentQuery>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let Some(member_id) = target_member(&user, query.member_id) else {
        return Ok(forbidden());
    };

    let member = match Member::find_by_id(&pool, member_id).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error(format!(
                "Member {} not found",
                member_id
            ))));
        }
        Err(e) => {
            error!("Failed to load member {}: {}", member_id, e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch payments".to_string())));
        }
    };

    let lookup = Member::find_by_name(&pool, &member.name).await;
    let namesakes = match lookup {
        Ok(members) if !members.is_empty() => members,
        Ok(_) => vec![member],
        Err(e) => {
            error!("Failed to load namesakes of {}: {}", member_id, e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch payments".to_string())));
        }
    };
    let ids: Vec<Uuid> = namesakes.iter().map(|m| m.id).collect();

    match Payment::find_by_members(&pool, &ids).await {
        Ok(payments) => {
            let directory = MemberDirectory::new(&namesakes);
            Ok(HttpResponse::Ok().json(ApiResponse::success(build_buckets(payments, &directory))))
        }
        Err(e) => Ok(payment_error(e, "fetch payments")),
    }
}

pub async fn backfill(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    match backfill_categories(&pool).await {
        Ok(updated) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            updated,
            format!("Categorised {} payments", updated),
        ))),
        Err(e) => Ok(payment_error(e, "backfill categories")),
    }
}

pub async fn convert_to_membership(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
    request: web::Json<ConversionRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let payment_id = path.into_inner();
    if request.member_id != user.user_id && !user.is_admin() {
        return Ok(forbidden());
    }

    match apply_membership_conversion(&pool, payment_id, request.member_id, today(), &config.billing)
        .await
    {
        Ok(conversion) => {
            let message = format!(
                "Converted to {} {} membership",
                conversion.month_name, conversion.year
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(conversion, message)))
        }
        Err(e) => Ok(conversion_error(e)),
    }
}

pub async fn convert_to_daily(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
    request: web::Json<ConversionRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let payment_id = path.into_inner();
    if request.member_id != user.user_id && !user.is_admin() {
        return Ok(forbidden());
    }

    match apply_daily_conversion(&pool, payment_id, request.member_id, &config.billing).await {
        Ok(conversion) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            conversion,
            "Converted back to a session fee".to_string(),
        ))),
        Err(e) => Ok(conversion_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::member::MemberRole;

    fn user(role: MemberRole) -> AuthenticatedUser {
        AuthenticatedUser {
            auth_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "sari@example.com".to_string(),
            name: "Sari".to_string(),
            user_role: role,
        }
    }

    #[test]
    fn members_are_limited_to_their_own_rows() {
        let member = user(MemberRole::Member);
        let other = Uuid::new_v4();
        assert_eq!(target_member(&member, None), Some(member.user_id));
        assert_eq!(target_member(&member, Some(member.user_id)), Some(member.user_id));
        assert_eq!(target_member(&member, Some(other)), None);

        let admin = user(MemberRole::Admin);
        assert_eq!(target_member(&admin, Some(other)), Some(other));
    }

    #[test]
    fn conversion_errors_map_to_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(
            conversion_error(ConversionError::NotFound { id }).status(),
            actix_web::http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            conversion_error(ConversionError::InvalidState {
                payment_id: id,
                reason: "payment already monthly".to_string()
            })
            .status(),
            actix_web::http::StatusCode::CONFLICT
        );
        assert_eq!(
            conversion_error(ConversionError::MemberMismatch {
                payment_id: id,
                member_id: id
            })
            .status(),
            actix_web::http::StatusCode::FORBIDDEN
        );
    }
}
