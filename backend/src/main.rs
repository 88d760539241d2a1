mod config;
mod inference;
mod routes;
#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use config::AppConfig;
use inference::CompletionClient;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let client = CompletionClient::new(&config.upstream).map_err(|e| {
        log::error!("Invalid upstream endpoint: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    log::info!(
        "Forwarding analyses to {} using model {}",
        client.endpoint(),
        client.model()
    );

    match &config.static_dir {
        Some(dir) => log::info!("Serving front end from {}", dir.display()),
        None => log::info!("STATIC_DIR not set, serving the API only"),
    }

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    let static_dir = config.static_dir.clone();
    let max_payload_bytes = config.max_payload_bytes;

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(web::Data::new(client.clone()))
            .configure(|cfg| configure_routes(cfg, static_dir.clone(), max_payload_bytes))
    })
    .bind(&bind_address)?
    .run()
    .await
}
