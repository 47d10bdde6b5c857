use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, middleware::Logger, web};
use anyhow::Context;
use dlob::{
    AppConfig,
    database::connection::{create_pool, run_migrations},
    handlers,
    middleware::auth::TokenVerifier,
    routes::api::scoped_config,
    services::chat::ChatService,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let pool = create_pool(&config.database)
        .await
        .context("failed to connect to database")?;
    if config.database.run_migrations {
        run_migrations(&pool).await.context("failed to run migrations")?;
    }

    let verifier = web::Data::new(TokenVerifier::new(&config.auth));
    let chat = web::Data::new(ChatService::new(&config.ai));
    let pool = web::Data::new(pool);
    let bind = (config.server.host.clone(), config.server.port);
    let allowed_origin = config.server.allowed_origin.clone();
    let config = web::Data::new(config);

    info!("Starting server on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(allowed_origin.as_deref()))
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(verifier.clone())
            .app_data(chat.clone())
            .route("/health", web::get().to(handlers::health::check))
            .service(web::scope("/api").configure(scoped_config))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
