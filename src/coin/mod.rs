//! Tab-scoped selection of the trading instrument and its live price.
//!
//! The selection is synchronised with client storage on session status
//! changes: authenticated sessions restore the stored coin, unauthenticated
//! ones reset to the default and drop the record. A poll loop keeps the price
//! of the selected coin fresh and restarts whenever the selection changes.

use crate::auth::{Session, SessionStatus};
use crate::error::AppError;
use crate::market::types::{
    coin_from_storage, encode_persisted_coin, Coin, PRICE_POLL_INTERVAL_MS,
    SELECTED_COIN_STORAGE_KEY,
};
use crate::market::PriceSource;
use crate::storage::ClientStorage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Storage access for the selected coin. Reads travel through the same queue
/// as writes so a read never overtakes a pending save or remove.
enum PersistCommand {
    Save(Coin),
    Remove,
    Load(oneshot::Sender<Result<Option<String>, AppError>>),
}

struct CoinShared {
    selected: watch::Sender<Coin>,
    price: watch::Sender<String>,
    session_rx: watch::Receiver<Session>,
    persist_tx: mpsc::UnboundedSender<PersistCommand>,
    /// Bumped by every explicit selection; a storage read only applies if it is unchanged.
    selection_epoch: AtomicU64,
}

fn replace_if_changed(sender: &watch::Sender<Coin>, next: Coin) -> bool {
    sender.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    })
}

impl CoinShared {
    fn queue(&self, command: PersistCommand) {
        if self.persist_tx.send(command).is_err() {
            tracing::debug!("coin persistence writer stopped, dropping write");
        }
    }

    async fn sync_with_status(&self, status: SessionStatus, cancel_token: &CancellationToken) {
        match status {
            SessionStatus::Loading => {}
            SessionStatus::Unauthenticated => {
                replace_if_changed(&self.selected, Coin::default());
                self.queue(PersistCommand::Remove);
                tracing::debug!("session ended, coin selection reset to default");
            }
            SessionStatus::Authenticated => {
                let epoch = self.selection_epoch.load(Ordering::SeqCst);
                let (reply_tx, reply_rx) = oneshot::channel();
                self.queue(PersistCommand::Load(reply_tx));
                let stored = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => return,
                    reply = reply_rx => reply,
                };
                let stored = match stored {
                    Ok(Ok(stored)) => stored,
                    Ok(Err(error)) => {
                        tracing::warn!(%error, "failed to read stored coin, using default");
                        None
                    }
                    Err(_) => {
                        tracing::debug!("coin persistence stopped before the stored coin was read");
                        return;
                    }
                };

                if self.selection_epoch.load(Ordering::SeqCst) != epoch {
                    tracing::debug!("coin selected while restoring, keeping the user's choice");
                    return;
                }

                let coin = coin_from_storage(stored.as_deref());
                tracing::debug!(symbol = %coin.symbol, "coin selection restored");
                replace_if_changed(&self.selected, coin);
            }
        }
    }

    fn publish_price(&self, ticker: &str, result: Result<String, AppError>) {
        match result {
            Ok(price) => {
                self.price.send_replace(price);
            }
            Err(error) => {
                tracing::warn!(ticker, %error, "price fetch failed");
                self.price.send_replace(String::new());
            }
        }
    }
}

async fn run_session_sync(
    shared: Arc<CoinShared>,
    mut session_rx: watch::Receiver<Session>,
    cancel_token: CancellationToken,
) {
    let mut last_status = None;

    loop {
        let status = session_rx.borrow_and_update().status;
        if last_status != Some(status) {
            last_status = Some(status);
            shared.sync_with_status(status, &cancel_token).await;
        }

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

async fn run_price_poll(
    shared: Arc<CoinShared>,
    prices: Arc<dyn PriceSource>,
    mut selected_rx: watch::Receiver<Coin>,
    cancel_token: CancellationToken,
) {
    'instrument: loop {
        let ticker = selected_rx.borrow_and_update().ticker().to_string();
        let mut interval = tokio::time::interval(Duration::from_millis(PRICE_POLL_INTERVAL_MS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(%ticker, "price poll started");

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break 'instrument,
                changed = selected_rx.changed() => {
                    if changed.is_err() {
                        break 'instrument;
                    }
                    shared.price.send_replace(String::new());
                    continue 'instrument;
                }
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break 'instrument,
                changed = selected_rx.changed() => {
                    if changed.is_err() {
                        break 'instrument;
                    }
                    shared.price.send_replace(String::new());
                    continue 'instrument;
                }
                result = prices.fetch_price(&ticker) => shared.publish_price(&ticker, result),
            }
        }
    }
}

async fn run_persistence(
    storage: Arc<dyn ClientStorage>,
    mut persist_rx: mpsc::UnboundedReceiver<PersistCommand>,
    cancel_token: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            command = persist_rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        let result = match command {
            PersistCommand::Save(coin) => match encode_persisted_coin(&coin) {
                Ok(record) => storage.set(SELECTED_COIN_STORAGE_KEY, record).await,
                Err(error) => Err(error),
            },
            PersistCommand::Remove => storage.remove(SELECTED_COIN_STORAGE_KEY).await,
            PersistCommand::Load(reply) => {
                let stored = storage.get(SELECTED_COIN_STORAGE_KEY).await;
                if reply.send(stored).is_err() {
                    tracing::debug!("stored coin read no longer awaited");
                }
                continue;
            }
        };
        if let Err(error) = result {
            tracing::warn!(%error, "failed to persist coin selection");
        }
    }
}

/// Running coin context. Dropping it stops every task it owns.
pub struct CoinContext {
    shared: Arc<CoinShared>,
    cancel_token: CancellationToken,
    join_handles: Vec<JoinHandle<()>>,
}

impl CoinContext {
    pub fn spawn(
        session_rx: watch::Receiver<Session>,
        storage: Arc<dyn ClientStorage>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let (selected, selected_rx) = watch::channel(Coin::default());
        let (price, _) = watch::channel(String::new());
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(CoinShared {
            selected,
            price,
            session_rx: session_rx.clone(),
            persist_tx,
            selection_epoch: AtomicU64::new(0),
        });

        let join_handles = vec![
            tokio::spawn(run_persistence(storage, persist_rx, cancel_token.clone())),
            tokio::spawn(run_session_sync(
                Arc::clone(&shared),
                session_rx,
                cancel_token.clone(),
            )),
            tokio::spawn(run_price_poll(
                Arc::clone(&shared),
                prices,
                selected_rx,
                cancel_token.clone(),
            )),
        ];

        Self {
            shared,
            cancel_token,
            join_handles,
        }
    }

    pub fn selected(&self) -> Coin {
        self.shared.selected.borrow().clone()
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Coin> {
        self.shared.selected.subscribe()
    }

    /// Applies the selection immediately; persists it only for authenticated sessions.
    pub fn select(&self, coin: Coin) {
        self.shared.selection_epoch.fetch_add(1, Ordering::SeqCst);
        replace_if_changed(&self.shared.selected, coin.clone());

        if self.shared.session_rx.borrow().is_authenticated() {
            self.shared.queue(PersistCommand::Save(coin));
        } else {
            tracing::debug!(symbol = %coin.symbol, "not authenticated, selection kept in memory only");
        }
    }

    /// Last polled price of the selected coin; empty until available or after a failed poll.
    pub fn market_price(&self) -> String {
        self.shared.price.borrow().clone()
    }

    pub fn subscribe_price(&self) -> watch::Receiver<String> {
        self.shared.price.subscribe()
    }

    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        for join_handle in std::mem::take(&mut self.join_handles) {
            let _ = join_handle.await;
        }
    }
}

impl Drop for CoinContext {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
