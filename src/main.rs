// src/main.rs
// Server bootstrap: two simulation endpoints plus the static frontend that
// animates the pendulum and displays the rainbow charts.

mod pendulum;
mod rainbow;
mod ui;

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use log::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("serving on http://{bind}");

    HttpServer::new(|| {
        App::new()
            .wrap(middleware::Logger::default())
            .route("/api/pendulum", web::post().to(ui::pendulum_handler))
            .route("/api/rainbow", web::post().to(ui::rainbow_handler))
            .service(Files::new("/", "./static").index_file("index.html"))
    })
    .bind(&bind)?
    .run()
    .await
}
