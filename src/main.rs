mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppConfig, services::ExternalServices};

fn cors(config: &AppConfig) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::CACHE_CONTROL,
        ])
        .expose_headers(vec![header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600);

    config
        .allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().expect("Invalid configuration");
    let bind_address = config.bind_address();

    log::info!("🚀 Starting Attractions Service...");
    log::info!("🔎 Empty search returns all: {}", config.search_empty_returns_all);

    let db = database::MongoDB::new(&config.database_url)
        .await
        .expect("Failed to connect to MongoDB");
    log::info!("✅ MongoDB connected successfully");

    let external = web::Data::new(ExternalServices::from_config(&config));
    let db_data = web::Data::new(db);
    let config_data = web::Data::new(config);
    let max_json_bytes = 64 * 1024;

    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);

    HttpServer::new(move || {
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(config_data.clone())
            .app_data(external.clone())
            .app_data(web::JsonConfig::default().limit(max_json_bytes))
            .wrap(cors(&config_data))
            .wrap(middleware::SecurityHeaders)
            .wrap(middleware::AuthMiddleware)
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .route("/health", web::get().to(api::health::health_check))
            .configure(api::routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
