use parking_lot::Mutex;
use tokio::sync::watch;

pub const ROOT_PATH: &str = "/";

pub trait Router: Send + Sync + 'static {
    fn push(&self, path: &str);

    fn back(&self);

    fn pathname(&self) -> String;

    fn subscribe(&self) -> watch::Receiver<String>;
}

/// In-memory navigation history; the last entry is the current pathname.
#[derive(Debug)]
pub struct HistoryRouter {
    entries: Mutex<Vec<String>>,
    pathname: watch::Sender<String>,
}

impl Default for HistoryRouter {
    fn default() -> Self {
        Self::new(ROOT_PATH)
    }
}

impl HistoryRouter {
    pub fn new(initial: &str) -> Self {
        let (pathname, _) = watch::channel(initial.to_string());
        Self {
            entries: Mutex::new(vec![initial.to_string()]),
            pathname,
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Router for HistoryRouter {
    fn push(&self, path: &str) {
        let mut entries = self.entries.lock();
        entries.push(path.to_string());
        tracing::debug!(path, "navigate");
        self.pathname.send_replace(path.to_string());
    }

    fn back(&self) {
        let mut entries = self.entries.lock();
        if entries.len() <= 1 {
            return;
        }
        entries.pop();
        if let Some(previous) = entries.last() {
            self.pathname.send_replace(previous.clone());
        }
    }

    fn pathname(&self) -> String {
        self.pathname.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<String> {
        self.pathname.subscribe()
    }
}
