//! The HTTP surface (§6): an axum router over the five payment endpoints.

pub mod error;
pub mod handlers;

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use handlers::SharedController;

pub fn router(controller: SharedController) -> Router {
    Router::new()
        .route("/payment/new", post(handlers::new_payment))
        .route("/payment/wait", post(handlers::wait_payment))
        .route("/payment/cancel", post(handlers::cancel_payment))
        .route("/payment/pay", post(handlers::pay))
        .route("/payment/status", post(handlers::status_payment))
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}
