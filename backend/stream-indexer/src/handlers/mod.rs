use actix_web::{web, HttpResponse};

use crate::metrics::serve_metrics;

/// Liveness only: answers while the process is up, whatever the pipeline is doing.
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(serve_metrics));
}
