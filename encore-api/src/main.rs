use std::net::SocketAddr;
use std::sync::Arc;

use encore_api::{app, gateway::StripeGateway, AppState};
use encore_notify::SmtpMailer;
use encore_store::{DbClient, PgCatalogRepository, PgOrderRepository, PgTicketRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = encore_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Encore API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let catalog_repo = Arc::new(PgCatalogRepository::new(db.pool.clone()));
    let order_repo = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let ticket_repo = Arc::new(PgTicketRepository::new(db.pool.clone()));

    let gateway = Arc::new(StripeGateway::new(&config.gateway));
    let mailer = Arc::new(SmtpMailer::new(
        config.smtp.server.clone(),
        config.smtp.port,
        config.smtp.username.clone(),
        config.smtp.password.clone(),
        config.smtp.from_email.clone(),
        config.smtp.from_name.clone(),
        config.storefront.base_url.clone(),
    ));

    let app_state = AppState::new(
        catalog_repo,
        order_repo,
        ticket_repo,
        gateway,
        mailer,
        config.gateway.webhook_secret.clone(),
        config.gateway.currency.clone(),
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
