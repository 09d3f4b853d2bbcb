use crate::auth::{token::expiry_deadline_ms, AuthProvider, Session, SignOutOptions};
use crate::guard::{
    evaluate, is_guarded_route, GuardEffect, GuardFlags, GuardInputs, GuardState, TimerAction,
    SIGN_OUT_TIMEOUT_MS,
};
use crate::router::{Router, ROOT_PATH};
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;

fn now_unix_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis().min(i64::MAX as u128) as i64,
        Err(_) => 0,
    }
}

enum GuardEvent {
    InputsChanged,
    TimerElapsed,
    Shutdown,
}

struct GuardRuntime {
    auth: Arc<dyn AuthProvider>,
    router: Arc<dyn Router>,
    session_rx: watch::Receiver<Session>,
    route_rx: watch::Receiver<String>,
    flags: GuardFlags,
    armed_deadline_ms: Option<i64>,
    timer: Option<Pin<Box<Sleep>>>,
    state_tx: watch::Sender<GuardState>,
    cancel_token: CancellationToken,
}

async fn timer_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

impl GuardRuntime {
    async fn run(mut self) {
        self.reevaluate().await;

        loop {
            match self.next_event().await {
                GuardEvent::Shutdown => break,
                GuardEvent::InputsChanged => self.reevaluate().await,
                GuardEvent::TimerElapsed => {
                    self.timer = None;
                    self.armed_deadline_ms = None;
                    if self.flags.begin_forced_logout() {
                        self.forced_logout().await;
                    }
                }
            }
        }

        self.timer = None;
        tracing::debug!("session guard stopped");
    }

    /// Pending session and route changes win over an elapsed timer, so a refreshed
    /// token or a route exit seen in the same wake-up disarms it first.
    async fn next_event(&mut self) -> GuardEvent {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => GuardEvent::Shutdown,
            changed = self.session_rx.changed() => match changed {
                Ok(()) => GuardEvent::InputsChanged,
                Err(_) => GuardEvent::Shutdown,
            },
            changed = self.route_rx.changed() => match changed {
                Ok(()) => GuardEvent::InputsChanged,
                Err(_) => GuardEvent::Shutdown,
            },
            _ = timer_elapsed(&mut self.timer) => GuardEvent::TimerElapsed,
        }
    }

    fn current_inputs(&mut self) -> GuardInputs {
        let session = self.session_rx.borrow_and_update();
        let pathname = self.route_rx.borrow_and_update();
        GuardInputs {
            guarded: is_guarded_route(&pathname),
            status: session.status,
            expires_at_ms: expiry_deadline_ms(&session),
            now_ms: now_unix_ms(),
        }
    }

    async fn reevaluate(&mut self) {
        let inputs = self.current_inputs();
        let step = evaluate(self.armed_deadline_ms, self.flags, &inputs);

        match step.timer {
            TimerAction::None => {}
            TimerAction::Cancel => self.timer = None,
            TimerAction::CancelAndSchedule { delay_ms } => {
                self.timer = None;
                self.timer = Some(Box::pin(tokio::time::sleep(Duration::from_millis(
                    delay_ms,
                ))));
                tracing::debug!(delay_ms, "session expiry timer armed");
            }
        }
        self.armed_deadline_ms = step.armed_deadline_ms;
        self.flags = step.flags;

        let previous = self.state_tx.send_replace(step.state);
        if previous != step.state {
            tracing::debug!(?previous, next = ?step.state, "session guard transition");
        }

        match step.effect {
            GuardEffect::None => {}
            GuardEffect::ForcedLogout => self.forced_logout().await,
            GuardEffect::StatusLoss => {
                tracing::info!("session lost on guarded route, returning to root");
                self.router.push(ROOT_PATH);
            }
        }
    }

    async fn forced_logout(&mut self) {
        tracing::info!("session expired on guarded route, signing out");
        let sign_out = tokio::time::timeout(
            Duration::from_millis(SIGN_OUT_TIMEOUT_MS),
            self.auth.sign_out(SignOutOptions {
                redirect_immediately: false,
            }),
        );

        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return,
            result = sign_out => match result {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(%error, "local sign-out failed, redirecting anyway");
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = SIGN_OUT_TIMEOUT_MS,
                        "sign-out did not complete in time, redirecting anyway"
                    );
                }
            },
        }

        self.router.push(ROOT_PATH);
    }
}

/// Running guard. Dropping it stops the task; [`SessionGuard::shutdown`] also waits for it.
pub struct SessionGuard {
    cancel_token: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
    state_rx: watch::Receiver<GuardState>,
}

impl SessionGuard {
    pub fn spawn(auth: Arc<dyn AuthProvider>, router: Arc<dyn Router>) -> Self {
        let cancel_token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(GuardState::Unguarded);

        let runtime = GuardRuntime {
            session_rx: auth.session(),
            route_rx: router.subscribe(),
            auth,
            router,
            flags: GuardFlags::default(),
            armed_deadline_ms: None,
            timer: None,
            state_tx,
            cancel_token: cancel_token.clone(),
        };
        let join_handle = tokio::spawn(runtime.run());

        Self {
            cancel_token,
            join_handle: Some(join_handle),
            state_rx,
        }
    }

    pub fn state(&self) -> GuardState {
        *self.state_rx.borrow()
    }

    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
