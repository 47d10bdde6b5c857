use actix_web::{HttpResponse, web};

use crate::handlers;

pub fn scoped_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/me").route(web::get().to(handlers::members::me)))
        .service(
            web::scope("/members")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::members::index))
                        .route(web::post().to(handlers::members::create))
                        .route(web::head().to(HttpResponse::MethodNotAllowed)),
                )
                .service(
                    web::resource("/duplicates").route(web::get().to(handlers::members::duplicates)),
                )
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(handlers::members::show))
                        .route(web::put().to(handlers::members::update)),
                )
                .service(
                    web::resource("/{id}/toggle-active")
                        .route(web::patch().to(handlers::members::toggle_active)),
                )
                .service(web::resource("/{id}/stats").route(web::get().to(handlers::members::stats))),
        )
        .service(
            web::scope("/matches")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::matches::index))
                        .route(web::post().to(handlers::matches::create)),
                )
                .service(web::resource("/{id}").route(web::get().to(handlers::matches::show)))
                .service(
                    web::resource("/{id}/result").route(web::put().to(handlers::matches::result)),
                ),
        )
        .service(
            web::scope("/payments")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::payments::index))
                        .route(web::post().to(handlers::payments::create)),
                )
                .service(web::resource("/buckets").route(web::get().to(handlers::payments::buckets)))
                .service(
                    web::resource("/backfill-categories")
                        .route(web::post().to(handlers::payments::backfill)),
                )
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(handlers::payments::show))
                        .route(web::delete().to(handlers::payments::delete)),
                )
                .service(
                    web::resource("/{id}/status")
                        .route(web::patch().to(handlers::payments::update_status)),
                )
                .service(
                    web::resource("/{id}/convert-to-membership")
                        .route(web::post().to(handlers::payments::convert_to_membership)),
                )
                .service(
                    web::resource("/{id}/convert-to-daily")
                        .route(web::post().to(handlers::payments::convert_to_daily)),
                ),
        )
        .service(web::resource("/chat").route(web::post().to(handlers::chat::reply)));
}
