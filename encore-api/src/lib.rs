use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod checkout;
pub mod error;
pub mod gateway;
pub mod orders;
pub mod state;
pub mod tickets;
pub mod webhook;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/v1/checkout/session", post(checkout::create_checkout_session))
        .route("/v1/checkout/free", post(checkout::free_checkout))
        .route("/v1/webhooks/checkout", post(webhook::handle_checkout_webhook))
        .route("/v1/tickets/validate", post(tickets::validate_ticket))
        .route("/v1/tickets", get(tickets::retrieve_tickets))
        .route("/v1/tickets/{code}/cancel", post(tickets::cancel_ticket))
        .route("/v1/orders/{id}", get(orders::get_order))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
