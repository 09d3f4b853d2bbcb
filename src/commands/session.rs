use crate::auth::Session;
use crate::error::AppError;
use crate::guard::{is_guarded_route, GuardState};
use crate::router::Router;
use crate::state::ClientRuntime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NavigateArgs {
    pub path: Option<String>,
}

impl NavigateArgs {
    pub fn normalize(self) -> Result<String, AppError> {
        let path = self.path.unwrap_or_default().trim().to_string();
        if !path.starts_with('/') || path.chars().any(char::is_whitespace) {
            return Err(AppError::InvalidArgument(
                "path must be absolute and contain no whitespace".to_string(),
            ));
        }
        Ok(path)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub pathname: String,
    pub guarded: bool,
}

impl NavigationResponse {
    fn current(state: &ClientRuntime) -> Self {
        let pathname = state.router.pathname();
        Self {
            guarded: is_guarded_route(&pathname),
            pathname,
        }
    }
}

/// Publishes a session pushed by the UI's auth layer.
pub fn session_update(state: &ClientRuntime, session: Session) -> GuardState {
    state.auth.local().set_session(session);
    state.guard.state()
}

pub fn navigate(state: &ClientRuntime, args: NavigateArgs) -> Result<NavigationResponse, AppError> {
    let path = args.normalize()?;
    state.router.push(&path);
    Ok(NavigationResponse::current(state))
}

pub fn navigate_back(state: &ClientRuntime) -> NavigationResponse {
    state.router.back();
    NavigationResponse::current(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::coin::{coin_select, coin_selected, market_price};
    use crate::commands::health::health;
    use crate::config::ClientConfig;
    use crate::db::initialize_memory_pool;
    use crate::market::types::{Coin, SelectCoinArgs, SELECTED_COIN_STORAGE_KEY};
    use crate::router::ROOT_PATH;
    use crate::storage::{ClientStorage, SqliteStorage};
    use std::time::Duration;

    async fn runtime() -> ClientRuntime {
        let pool = initialize_memory_pool()
            .await
            .expect("in-memory sqlite should initialize");
        let config = ClientConfig {
            price_api_base_url: "http://127.0.0.1:1".to_string(),
            price_api_timeout: Duration::from_millis(500),
            ..ClientConfig::default()
        };
        ClientRuntime::with_pool(&config, pool).expect("runtime should start")
    }

    async fn stored_coin(state: &ClientRuntime) -> Option<String> {
        SqliteStorage::new(state.db_pool.clone())
            .get(SELECTED_COIN_STORAGE_KEY)
            .await
            .expect("storage read")
    }

    async fn wait_for_stored(state: &ClientRuntime, present: bool) -> bool {
        for _ in 0..200 {
            if stored_coin(state).await.is_some() == present {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn wait_until<F>(condition: F) -> bool
    where
        F: Fn() -> bool,
    {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    #[test]
    fn navigate_args_require_absolute_paths() {
        let valid = NavigateArgs {
            path: Some(" /trade ".to_string()),
        };
        assert_eq!(valid.normalize().expect("valid path"), "/trade");

        for raw in [None, Some("trade"), Some("/tr ade"), Some("")] {
            let args = NavigateArgs {
                path: raw.map(str::to_string),
            };
            assert!(args.normalize().is_err());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn logout_on_dashboard_resets_coin_and_returns_home() {
        let state = runtime().await;

        session_update(&state, Session::authenticated(Some("opaque".to_string()), None));
        let navigation = navigate(
            &state,
            NavigateArgs {
                path: Some("/trade".to_string()),
            },
        )
        .expect("navigation");
        assert!(navigation.guarded);
        assert!(wait_until(|| state.guard.state() == GuardState::AuthenticatedNoExpiry).await);

        let coin = coin_select(
            &state,
            SelectCoinArgs {
                symbol: Some("eth".to_string()),
            },
        )
        .expect("eth is valid");
        assert_eq!(coin_selected(&state), coin);
        assert!(wait_for_stored(&state, true).await);

        session_update(&state, Session::unauthenticated());

        assert!(wait_until(|| state.router.pathname() == ROOT_PATH).await);
        assert!(wait_until(|| coin_selected(&state) == Coin::default()).await);
        assert!(wait_for_stored(&state, false).await);
        assert_eq!(
            state
                .router
                .history()
                .iter()
                .filter(|path| path.as_str() == ROOT_PATH)
                .count(),
            2
        );

        state.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unreachable_price_api_leaves_price_empty() {
        let state = runtime().await;

        assert!(coin_select(&state, SelectCoinArgs::default()).is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let price = market_price(&state);
        assert_eq!(price.ticker, "BTCUSDT");
        assert_eq!(price.price, "");

        state.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn health_reports_session_and_guard() {
        let state = runtime().await;

        let response = health(&state).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.db, "ok");
        assert_eq!(response.session, "loading");
        assert_eq!(response.guard, GuardState::Unguarded);

        let back = navigate_back(&state);
        assert_eq!(back.pathname, ROOT_PATH);
        assert!(!back.guarded);

        state.shutdown().await;
    }
}
