pub mod auth;
pub mod coin;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod logging;
pub mod market;
pub mod router;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;

pub use auth::{AuthProvider, LocalAuthProvider, Session, SessionStatus, SignOutOptions};
pub use coin::CoinContext;
pub use config::ClientConfig;
pub use error::AppError;
pub use guard::{GuardState, SessionGuard};
pub use market::types::Coin;
pub use router::{HistoryRouter, Router};
pub use state::ClientRuntime;

/// Runs the client core headless until Ctrl-C, logging selection changes and price updates.
pub async fn run(config: ClientConfig) -> Result<(), AppError> {
    let info = commands::app_info::app_info();
    tracing::info!(
        product = %info.product_name,
        version = %info.version,
        platform = %info.platform,
        "starting"
    );

    let runtime = ClientRuntime::start(&config).await?;
    let mut prices = runtime.coin.subscribe_price();
    let mut selected = runtime.coin.subscribe_selected();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = selected.changed() => {
                if changed.is_err() {
                    break;
                }
                let coin = selected.borrow_and_update().clone();
                tracing::info!(coin = %coin.label, "coin selected");
            }
            changed = prices.changed() => {
                if changed.is_err() {
                    break;
                }
                let price = prices.borrow_and_update().clone();
                let coin = runtime.coin.selected();
                if price.is_empty() {
                    tracing::info!(coin = %coin.label, "price unavailable");
                } else {
                    tracing::info!(coin = %coin.label, %price, "price update");
                }
            }
        }
    }

    runtime.shutdown().await;
    Ok(())
}
