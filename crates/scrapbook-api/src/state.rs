use std::sync::Arc;

use anyhow::anyhow;

use scrapbook_db::Database;

use crate::auth::IdentityClient;
use crate::catalog::CatalogClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub catalog: CatalogClient,
    pub identity: IdentityClient,
    pub jwt_secret: String,
    /// Where the auth callback sends the browser afterwards.
    pub public_origin: String,
}

impl AppStateInner {
    /// Run a blocking store call off the async runtime.
    pub async fn with_db<F, T>(self: &Arc<Self>, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
    }
}
