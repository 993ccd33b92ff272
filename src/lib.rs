pub mod config;
pub mod domain {
    pub mod intent;
}
pub mod errors;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod payments;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
}
pub mod repo {
    pub mod alerts_repo;
    pub mod intents_repo;
    pub mod linked_objects_repo;
    pub mod outbox_repo;
}
pub mod service {
    pub mod alert_dispatcher;
    pub mod coordinator;
    pub mod outbox_relay;
}
pub mod signing;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: service::coordinator::ReconciliationCoordinator,
    pub intents_repo: repo::intents_repo::IntentsRepo,
}
