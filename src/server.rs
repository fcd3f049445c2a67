/// HTTP server: the dashboard page, its WebSocket and a couple of plain endpoints
use actix_web::{middleware, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;
use std::sync::Arc;

use crate::binder::chart_binding;
use crate::config::Config;
use crate::context::DashboardContext;
use crate::websocket::DashboardSocket;

/// The single-page client
static INDEX_HTML: &str = include_str!("../static/index.html");

/// Dashboard page
async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// WebSocket endpoint handler; every connection gets its own session
async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    ctx: web::Data<DashboardContext>,
) -> Result<HttpResponse, Error> {
    let resp = ws::start(DashboardSocket::new(ctx.into_inner()), &req, stream)?;
    Ok(resp)
}

/// Health check endpoint
async fn health_check(ctx: web::Data<DashboardContext>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "dataset": ctx.dataset.name(),
        "rows": ctx.dataset.len(),
    }))
}

/// Chart of the whole, unfiltered dataset
async fn chart_svg(ctx: web::Data<DashboardContext>) -> HttpResponse {
    let mut binding = chart_binding(ctx.into_inner());
    match &binding.emit(None).svg {
        Some(svg) => HttpResponse::Ok()
            .content_type("image/svg+xml")
            .body(svg.clone()),
        None => HttpResponse::InternalServerError().finish(),
    }
}

/// Start the HTTP server with WebSocket support
pub async fn run_server(config: &Config, ctx: Arc<DashboardContext>) -> std::io::Result<()> {
    let debug = config.debug;
    let ctx = web::Data::from(ctx);

    log::info!("GapDash dashboard: http://{}:{}/", config.host, config.port);
    log::info!("WebSocket: ws://{}:{}/ws", config.host, config.port);
    if debug {
        log::info!("Debug mode: permissive CORS, detailed client errors");
    }

    HttpServer::new(move || {
        App::new()
            .app_data(ctx.clone())
            .wrap(middleware::Logger::default())
            // CORS for development only
            .wrap(middleware::Condition::new(debug, actix_cors::Cors::permissive()))
            .route("/", web::get().to(index))
            .route("/ws", web::get().to(ws_index))
            .route("/health", web::get().to(health_check))
            .route("/chart.svg", web::get().to(chart_svg))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
