use std::sync::Arc;

use tracing::warn;

use crate::accounts::store::{AccountStore, MemoryAccountStore, PgAccountStore};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AccountStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn AccountStore> = match config.database_url.as_deref() {
            Some(url) => Arc::new(PgAccountStore::connect(url).await?),
            None => {
                warn!("DATABASE_URL not set; using in-memory account store (data is lost on restart)");
                Arc::new(MemoryAccountStore::new())
            }
        };

        Ok(Self { store, config })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::SessionConfig;

        let config = Arc::new(AppConfig {
            database_url: None,
            session: SessionConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self {
            store: Arc::new(MemoryAccountStore::new()),
            config,
        }
    }
}
