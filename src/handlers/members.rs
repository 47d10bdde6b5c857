use crate::{
    config::AppConfig,
    database::connection::DbPool,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::MemberInfo,
        matches::Match,
        member::{CreateMember, Member, MemberError, MemberRole, UpdateMember},
    },
    requests::member::{CreateMemberRequest, StatsQuery, UpdateMemberRequest},
    services::stats::summarize,
    utils::helpers::{ApiResponse, forbidden, today},
};
use actix_web::{HttpResponse, Result, web};
use tracing::{error, info};
use uuid::Uuid;

fn member_error(e: MemberError, action: &str) -> HttpResponse {
    match e {
        MemberError::NotFound { id } => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error(format!("Member {} not found", id))),
        MemberError::Database(e) => {
            error!("Database error while trying to {}: {}", action, e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(format!("Failed to {}", action)))
        }
        e => HttpResponse::BadRequest().json(ApiResponse::<()>::error(e.to_string())),
    }
}

pub async fn index(pool: web::Data<DbPool>, _user: AuthenticatedUser) -> Result<HttpResponse> {
    match Member::find_all(&pool).await {
        Ok(members) => Ok(HttpResponse::Ok().json(ApiResponse::success(members))),
        Err(e) => Ok(member_error(e, "fetch members")),
    }
}

pub async fn me(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    match Member::find_by_id(&pool, user.user_id).await {
        Ok(Some(member)) => Ok(HttpResponse::Ok().json(ApiResponse::success(MemberInfo::from(&member)))),
        Ok(None) => Ok(member_error(MemberError::NotFound { id: user.user_id }, "fetch profile")),
        Err(e) => Ok(member_error(e, "fetch profile")),
    }
}

pub async fn create(
    pool: web::Data<DbPool>,
    request: web::Json<CreateMemberRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let request = request.into_inner();
    info!("Creating member {} by {}", request.name, user.user_id);

    let member = CreateMember {
        name: request.name,
        email: request.email,
        role: request.role.unwrap_or(MemberRole::Member),
        membership_type: request.membership_type.unwrap_or_default(),
    };

    match Member::create(&pool, member).await {
        Ok(member) => {
            info!("Created member {} ({})", member.id, member.name);
            Ok(HttpResponse::Created().json(ApiResponse::success(member)))
        }
        Err(e) => Ok(member_error(e, "create member")),
    }
}

pub async fn duplicates(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    match Member::find_duplicate_names(&pool).await {
        Ok(duplicates) => Ok(HttpResponse::Ok().json(ApiResponse::success(duplicates))),
        Err(e) => Ok(member_error(e, "fetch duplicate names")),
    }
}

pub async fn show(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let member_id = path.into_inner();

    match Member::find_by_id(&pool, member_id).await {
        Ok(Some(member)) => Ok(HttpResponse::Ok().json(ApiResponse::success(member))),
        Ok(None) => Ok(member_error(MemberError::NotFound { id: member_id }, "fetch member")),
        Err(e) => Ok(member_error(e, "fetch member")),
    }
}

pub async fn update(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    request: web::Json<UpdateMemberRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let member_id = path.into_inner();
    let request = request.into_inner();
    info!("Updating member {} by {}", member_id, user.user_id);

    let update = UpdateMember {
        name: request.name,
        email: request.email,
        role: request.role,
        membership_type: request.membership_type,
        is_active: request.is_active,
    };

    match Member::update(&pool, member_id, update).await {
        Ok(member) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            member,
            "Member updated".to_string(),
        ))),
        Err(e) => Ok(member_error(e, "update member")),
    }
}

pub async fn toggle_active(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let member_id = path.into_inner();
    if member_id == user.user_id {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "You cannot deactivate your own account".to_string(),
        )));
    }

    match Member::toggle_active(&pool, member_id).await {
        Ok(member) => {
            info!(
                "Member {} active status toggled to {} by {}",
                member_id, member.is_active, user.user_id
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(member)))
        }
        Err(e) => Ok(member_error(e, "update member status")),
    }
}

pub async fn stats(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
    query: web::Query<StatsQuery>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let member_id = path.into_inner();

    match Member::find_by_id(&pool, member_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(member_error(MemberError::NotFound { id: member_id }, "fetch stats")),
        Err(e) => return Ok(member_error(e, "fetch stats")),
    }

    let rows = match Match::rows_for_member(&pool, member_id).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to load matches for member {}: {}", member_id, e);
            return Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch stats".to_string())));
        }
    };

    let as_of = query.as_of.unwrap_or_else(today);
    let stats = summarize(&rows, as_of, config.attendance.period());
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}
