use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        catalog::CatalogService,
        ip_lookup::{IpEcho, IpEchoClient},
        orders::OrderService,
        payments::PaymentService,
        products::ProductService,
        users::UserService,
    },
    storage::PhotoStorage,
};

pub mod albums;
pub mod checkout;
pub mod common;
pub mod courses;
pub mod health;
pub mod institutions;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

/// Aggregated service container shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    /// Wires the service graph for the given configuration, storage backend
    /// and IP source. `main` passes the real IP echo client; tests inject a
    /// fixed address.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        storage: Arc<dyn PhotoStorage>,
        ip_source: Arc<dyn IpEcho>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(
            db_pool.clone(),
            storage.clone(),
            event_sender.clone(),
        ));
        let products = Arc::new(ProductService::new(db_pool.clone()));
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            config.gateway.clone(),
            ip_source,
            event_sender.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            db_pool.clone(),
            storage,
            config.storage.clone(),
            event_sender,
        ));
        let users = Arc::new(UserService::new(db_pool));

        Self {
            catalog,
            products,
            orders,
            payments,
            users,
        }
    }

    /// Convenience constructor using the production IP echo client.
    pub fn with_ip_echo(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        storage: Arc<dyn PhotoStorage>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let ip_source = Arc::new(IpEchoClient::new(config.ip_echo_url.clone()));
        Self::new(db_pool, config, storage, ip_source, event_sender)
    }
}
