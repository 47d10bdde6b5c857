use crate::{
    middleware::auth::AuthenticatedUser,
    requests::chat::ChatRequest,
    services::chat::ChatService,
    utils::helpers::ApiResponse,
};
use actix_web::{HttpResponse, Result, web};
use tracing::info;

pub async fn reply(
    chat: web::Data<ChatService>,
    request: web::Json<ChatRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let message = request.message.trim();
    if message.is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("message is required".to_string())));
    }

    let reply = chat.reply(message).await;
    info!("Chat reply for {} from {:?}", user.user_id, reply.source);
    Ok(HttpResponse::Ok().json(ApiResponse::success(reply)))
}
