//! Fakes for the collaborator traits, shared by unit tests.

use crate::auth::{AuthProvider, LocalAuthProvider, Session, SignOutOptions};
use crate::error::AppError;
use crate::market::PriceSource;
use crate::storage::{ClientStorage, MemoryStorage};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Lets every ready task run until it blocks again.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub struct RecordingAuthProvider {
    local: LocalAuthProvider,
    sign_out_calls: AtomicUsize,
    fail_sign_out: AtomicBool,
    hang_sign_out: AtomicBool,
}

impl RecordingAuthProvider {
    pub fn new(initial: Session) -> Self {
        Self {
            local: LocalAuthProvider::new(initial),
            sign_out_calls: AtomicUsize::new(0),
            fail_sign_out: AtomicBool::new(false),
            hang_sign_out: AtomicBool::new(false),
        }
    }

    pub fn signed_in(access_token: Option<String>) -> Self {
        Self::new(Session::authenticated(access_token, None))
    }

    pub fn local(&self) -> &LocalAuthProvider {
        &self.local
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// A failing sign-out leaves the session untouched.
    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Sign-out never completes, like an auth service that accepts the request and never answers.
    pub fn hang_sign_out(&self, hang: bool) {
        self.hang_sign_out.store(hang, Ordering::SeqCst);
    }
}

impl AuthProvider for RecordingAuthProvider {
    fn session(&self) -> watch::Receiver<Session> {
        self.local.session()
    }

    fn sign_out(&self, options: SignOutOptions) -> BoxFuture<'_, Result<(), AppError>> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_sign_out.load(Ordering::SeqCst) {
            return Box::pin(std::future::pending());
        }
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Box::pin(async { Err(AppError::SignOut("auth service unreachable".to_string())) });
        }
        self.local.sign_out(options)
    }
}

#[derive(Default)]
pub struct FakePriceSource {
    prices: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl FakePriceSource {
    pub fn with_price(ticker: &str, price: &str) -> Self {
        let source = Self::default();
        source.set_price(ticker, price);
        source
    }

    pub fn set_price(&self, ticker: &str, price: &str) {
        self.prices
            .lock()
            .insert(ticker.to_string(), price.to_string());
    }

    pub fn remove_price(&self, ticker: &str) {
        self.prices.lock().remove(ticker);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, ticker: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|requested| requested.as_str() == ticker)
            .count()
    }
}

impl PriceSource for FakePriceSource {
    fn fetch_price<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, Result<String, AppError>> {
        self.requests.lock().push(ticker.to_string());
        let price = self.prices.lock().get(ticker).cloned();
        Box::pin(async move {
            price.ok_or_else(|| AppError::InvalidArgument(format!("no price for {ticker}")))
        })
    }
}

/// Reads succeed, writes fail as if the storage quota were exhausted.
#[derive(Default)]
pub struct QuotaExceededStorage {
    inner: MemoryStorage,
}

impl QuotaExceededStorage {
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.peek(key)
    }
}

impl ClientStorage for QuotaExceededStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, AppError>> {
        self.inner.get(key)
    }

    fn set<'a>(&'a self, _key: &'a str, _value: String) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async {
            Err(AppError::Io(std::io::Error::other("storage quota exceeded")))
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), AppError>> {
        self.inner.remove(key)
    }
}

/// Writes land only after `delay`, like a storage backed by a slow disk. Reads are immediate.
pub struct SlowStorage {
    inner: MemoryStorage,
    delay: Duration,
}

impl SlowStorage {
    pub fn with_entry(key: &str, value: &str, delay: Duration) -> Self {
        Self {
            inner: MemoryStorage::with_entry(key, value),
            delay,
        }
    }

    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.peek(key)
    }
}

impl ClientStorage for SlowStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, AppError>> {
        self.inner.get(key)
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.set(key, value).await
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.inner.remove(key).await
        })
    }
}
