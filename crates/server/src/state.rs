//! Application state shared across handlers.

use std::sync::Arc;

use clementine_checkout::service::{CartService, OrderService};
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::PgStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and the checkout services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    store: PgStore,
    carts: CartService<PgStore>,
    orders: OrderService<PgStore>,
}

impl AppState {
    /// Create a new application state over a connection pool.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let store = PgStore::new(pool.clone());
        let carts = CartService::new(store.clone());
        let orders = OrderService::new(store.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                carts,
                orders,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Postgres store (for direct coupon CRUD).
    #[must_use]
    pub fn store(&self) -> &PgStore {
        &self.inner.store
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn carts(&self) -> &CartService<PgStore> {
        &self.inner.carts
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService<PgStore> {
        &self.inner.orders
    }
}
