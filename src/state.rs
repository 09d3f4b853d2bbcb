use crate::auth::{AuthProvider, HttpAuthProvider, LocalAuthProvider};
use crate::coin::CoinContext;
use crate::config::ClientConfig;
use crate::db::initialize_pool_from_path;
use crate::error::AppError;
use crate::guard::SessionGuard;
use crate::market::binance::BinancePriceClient;
use crate::router::{HistoryRouter, Router};
use crate::storage::{ClientStorage, SqliteStorage};
use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

pub enum AuthBackend {
    Local(Arc<LocalAuthProvider>),
    Http(Arc<HttpAuthProvider>),
}

impl AuthBackend {
    fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let backend = match &config.auth_api_base_url {
            Some(base_url) => {
                let client = Client::builder().timeout(config.auth_api_timeout).build()?;
                Self::Http(Arc::new(HttpAuthProvider::new(client, base_url.clone())))
            }
            None => Self::Local(Arc::new(LocalAuthProvider::default())),
        };
        Ok(backend)
    }

    /// The in-process session publisher, regardless of backend.
    pub fn local(&self) -> &LocalAuthProvider {
        match self {
            Self::Local(provider) => provider,
            Self::Http(provider) => provider.local(),
        }
    }

    pub fn provider(&self) -> Arc<dyn AuthProvider> {
        match self {
            Self::Local(provider) => Arc::clone(provider) as Arc<dyn AuthProvider>,
            Self::Http(provider) => Arc::clone(provider) as Arc<dyn AuthProvider>,
        }
    }
}

pub struct ClientRuntime {
    pub started_at: Instant,
    pub db_pool: SqlitePool,
    pub auth: AuthBackend,
    pub router: Arc<HistoryRouter>,
    pub prices: Arc<BinancePriceClient>,
    pub coin: CoinContext,
    pub guard: SessionGuard,
}

impl ClientRuntime {
    pub async fn start(config: &ClientConfig) -> Result<Self, AppError> {
        let db_pool = initialize_pool_from_path(&config.db_path).await?;
        let runtime = Self::with_pool(config, db_pool)?;

        if let AuthBackend::Http(provider) = &runtime.auth {
            if let Err(error) = provider.refresh_session().await {
                tracing::warn!(%error, "initial session fetch failed, treating as signed out");
                provider.local().clear();
            }
        }

        Ok(runtime)
    }

    /// Wires the services over an already migrated pool. Must run inside a tokio runtime.
    pub fn with_pool(config: &ClientConfig, db_pool: SqlitePool) -> Result<Self, AppError> {
        let auth = AuthBackend::from_config(config)?;
        let router = Arc::new(HistoryRouter::default());
        let prices = Arc::new(BinancePriceClient::new(
            config.price_api_base_url.clone(),
            config.price_api_timeout,
        )?);
        let storage: Arc<dyn ClientStorage> = Arc::new(SqliteStorage::new(db_pool.clone()));

        let coin = CoinContext::spawn(auth.provider().session(), storage, prices.clone());
        let guard = SessionGuard::spawn(auth.provider(), router.clone() as Arc<dyn Router>);

        tracing::info!(
            price_api = %config.price_api_base_url,
            remote_auth = config.auth_api_base_url.is_some(),
            "client runtime started"
        );

        Ok(Self {
            started_at: Instant::now(),
            db_pool,
            auth,
            router,
            prices,
            coin,
            guard,
        })
    }

    pub async fn shutdown(self) {
        self.guard.shutdown().await;
        self.coin.shutdown().await;
        self.db_pool.close().await;
        tracing::info!("client runtime stopped");
    }
}
