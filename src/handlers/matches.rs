use crate::{
    config::AppConfig,
    database::connection::DbPool,
    middleware::auth::AuthenticatedUser,
    models::matches::{CreateMatch, Match, MatchError},
    requests::matches::{CreateMatchRequest, MatchQuery, RecordResultRequest},
    services::scheduling::{record_match, record_result},
    utils::helpers::{ApiResponse, forbidden},
};
use actix_web::{HttpResponse, Result, web};
use tracing::{error, info};
use uuid::Uuid;

fn match_error(e: MatchError, action: &str) -> HttpResponse {
    match e {
        MatchError::NotFound { id } => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error(format!("Match {} not found", id))),
        MatchError::Database(e) => {
            error!("Database error while trying to {}: {}", action, e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(format!("Failed to {}", action)))
        }
        MatchError::Validation(_) => {
            HttpResponse::BadRequest().json(ApiResponse::<()>::error(e.to_string()))
        }
    }
}

pub async fn index(
    pool: web::Data<DbPool>,
    query: web::Query<MatchQuery>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let matches = match Match::find_all(&pool, query.date).await {
        Ok(matches) => matches,
        Err(e) => return Ok(match_error(e, "fetch matches")),
    };

    match Match::with_details(&pool, matches).await {
        Ok(details) => Ok(HttpResponse::Ok().json(ApiResponse::success(details))),
        Err(e) => Ok(match_error(e, "fetch matches")),
    }
}

pub async fn show(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();

    let game = match Match::find_by_id(&pool, match_id).await {
        Ok(Some(game)) => game,
        Ok(None) => return Ok(match_error(MatchError::NotFound { id: match_id }, "fetch match")),
        Err(e) => return Ok(match_error(e, "fetch match")),
    };

    match Match::with_details(&pool, vec![game]).await {
        Ok(mut details) => match details.pop() {
            Some(detail) => Ok(HttpResponse::Ok().json(ApiResponse::success(detail))),
            None => Ok(match_error(MatchError::NotFound { id: match_id }, "fetch match")),
        },
        Err(e) => Ok(match_error(e, "fetch match")),
    }
}

pub async fn create(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    request: web::Json<CreateMatchRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let request = request.into_inner();
    info!(
        "Creating match on {} with {} players by {}",
        request.date,
        request.participants.len(),
        user.user_id
    );

    let data = CreateMatch {
        date: request.date,
        time: request.time,
        shuttlecock_count: request.shuttlecock_count,
        participants: request.participants,
    };

    match record_match(&pool, data, &config.billing).await {
        Ok(recorded) => Ok(HttpResponse::Created().json(ApiResponse::success(recorded))),
        Err(e) => Ok(match_error(e, "create match")),
    }
}

pub async fn result(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    request: web::Json<RecordResultRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden());
    }

    let match_id = path.into_inner();
    info!("Recording result for match {} by {}", match_id, user.user_id);

    match record_result(
        &pool,
        match_id,
        request.team1_score,
        request.team2_score,
        request.winner_team,
    )
    .await
    {
        Ok(detail) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            detail,
            "Result recorded".to_string(),
        ))),
        Err(e) => Ok(match_error(e, "record result")),
    }
}
