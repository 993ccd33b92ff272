use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use payments_recon::config::AppConfig;
use payments_recon::gateways::cashfree::CashfreeAdapter;
use payments_recon::gateways::manual::ManualAdapter;
use payments_recon::gateways::payu::PayuAdapter;
use payments_recon::repo::alerts_repo::AlertChannelsRepo;
use payments_recon::repo::intents_repo::IntentsRepo;
use payments_recon::repo::linked_objects_repo::LinkedObjectsRepo;
use payments_recon::repo::outbox_repo::OutboxRepo;
use payments_recon::service::alert_dispatcher::AlertDispatcher;
use payments_recon::service::coordinator::ReconciliationCoordinator;
use payments_recon::service::outbox_relay::OutboxRelay;
use payments_recon::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let intents_repo = IntentsRepo { pool: pool.clone() };
    let linked_objects_repo = LinkedObjectsRepo { pool: pool.clone() };
    let outbox_repo = OutboxRepo { pool: pool.clone() };
    let alert_channels_repo = AlertChannelsRepo { pool: pool.clone() };

    let dispatcher = AlertDispatcher {
        channels_repo: alert_channels_repo,
        client: reqwest::Client::new(),
    };

    let coordinator = ReconciliationCoordinator {
        store: Arc::new(intents_repo.clone()),
        effects: Arc::new(linked_objects_repo),
        outbox: Arc::new(outbox_repo.clone()),
        payu: Arc::new(PayuAdapter { config: cfg.payu.clone() }),
        cashfree: Arc::new(CashfreeAdapter {
            config: cfg.cashfree.clone(),
            client: reqwest::Client::new(),
        }),
        manual: Arc::new(ManualAdapter {
            secret: cfg.manual_confirm_secret.clone(),
        }),
        return_base_url: cfg.return_base_url.clone(),
    };

    let relay = OutboxRelay {
        outbox_repo,
        dispatcher,
    };
    tokio::spawn(relay.run());

    let state = AppState {
        coordinator,
        intents_repo,
    };

    let admin_key = cfg.internal_api_key.clone();
    let admin_routes = Router::new()
        .route(
            "/payments/:intent_id",
            get(payments_recon::http::handlers::payments::get_payment),
        )
        .route(
            "/payments/by-reference/:reference",
            get(payments_recon::http::handlers::payments::get_payment_by_reference),
        )
        .layer(from_fn_with_state(
            admin_key,
            payments_recon::http::middleware::admin_auth::require_internal_api_key,
        ));

    let app = Router::new()
        .route("/health", get(payments_recon::http::handlers::payments::health))
        .route(
            "/payments",
            post(payments_recon::http::handlers::payments::create_payment),
        )
        .route(
            "/payments/:intent_id/cancel",
            post(payments_recon::http::handlers::payments::cancel_payment),
        )
        .route(
            "/webhooks/:provider",
            post(payments_recon::http::handlers::webhooks::gateway_callback),
        )
        .route(
            "/payments/return/:provider",
            post(payments_recon::http::handlers::webhooks::payment_return_form)
                .get(payments_recon::http::handlers::webhooks::payment_return_query),
        )
        .merge(admin_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
