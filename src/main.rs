use actix_web::{
    middleware,
    web::{self, Data},
    App, HttpServer,
};
use log::info;

use permission_slips::{config::Config, routes, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("FATAL: {}", e);
        e
    })?;
    info!("Loaded configuration: {:?}", config);

    let (host, port) = (config.host.clone(), config.port);
    let state = AppState::new(config).await.map_err(|e| {
        log::error!("FATAL: could not open database: {}", e);
        e
    })?;

    info!("Starting HTTP server on http://{}:{}/", host, port);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(Data::new(state.clone()))
            .configure(routes::configure)
            .default_service(web::to(routes::default_handler))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
