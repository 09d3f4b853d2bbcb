//! Session guard for protected routes.
//!
//! [`evaluate`] is the whole decision procedure: given the deadline of the
//! currently armed timer (if any), the guard flags and the latest inputs, it
//! returns the new state, what to do with the timer and which side effect to
//! run. [`SessionGuard`] drives it from session and route changes and owns the
//! single timer.

mod service;

pub use service::SessionGuard;

use crate::auth::SessionStatus;
use serde::Serialize;

pub const PROTECTED_ROUTE_PREFIXES: [&str; 2] = ["/trade", "/assets"];

/// Upper bound on a forced sign-out; the redirect happens once it elapses.
pub const SIGN_OUT_TIMEOUT_MS: u64 = 5_000;

pub fn is_guarded_route(pathname: &str) -> bool {
    PROTECTED_ROUTE_PREFIXES
        .iter()
        .any(|prefix| pathname.starts_with(prefix))
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum GuardState {
    Unguarded,
    Loading,
    #[serde(rename_all = "camelCase")]
    Armed {
        deadline_ms: i64,
    },
    AuthenticatedNoExpiry,
    ExpiredAtEntry,
    Expelled,
    NeverAuthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardFlags {
    /// A forced logout already ran for the current loss of session.
    pub triggered: bool,
    /// This tab held a live session at some point.
    pub had_session: bool,
}

impl GuardFlags {
    /// Marks the forced logout as started; false when it already ran.
    pub fn begin_forced_logout(&mut self) -> bool {
        if self.triggered {
            return false;
        }
        self.triggered = true;
        self.had_session = false;
        true
    }

    fn mark_live_session(&mut self) {
        self.triggered = false;
        self.had_session = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardInputs {
    pub guarded: bool,
    pub status: SessionStatus,
    pub expires_at_ms: Option<i64>,
    pub now_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    None,
    Cancel,
    CancelAndSchedule { delay_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardEffect {
    None,
    /// Sign out locally, then navigate to root regardless of the outcome.
    ForcedLogout,
    /// Navigate to root; the provider already dropped the session.
    StatusLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardStep {
    pub state: GuardState,
    pub timer: TimerAction,
    pub armed_deadline_ms: Option<i64>,
    pub flags: GuardFlags,
    pub effect: GuardEffect,
}

pub fn evaluate(
    armed_deadline_ms: Option<i64>,
    mut flags: GuardFlags,
    inputs: &GuardInputs,
) -> GuardStep {
    let release_timer = if armed_deadline_ms.is_some() {
        TimerAction::Cancel
    } else {
        TimerAction::None
    };

    if !inputs.guarded {
        flags.triggered = false;
        match inputs.status {
            SessionStatus::Unauthenticated => flags.had_session = false,
            SessionStatus::Authenticated => flags.had_session = true,
            SessionStatus::Loading => {}
        }
        return GuardStep {
            state: GuardState::Unguarded,
            timer: release_timer,
            armed_deadline_ms: None,
            flags,
            effect: GuardEffect::None,
        };
    }

    let (state, effect) = match inputs.status {
        SessionStatus::Loading => (GuardState::Loading, GuardEffect::None),
        SessionStatus::Authenticated => match inputs.expires_at_ms {
            Some(deadline_ms) if deadline_ms > inputs.now_ms => {
                flags.mark_live_session();
                let delay_ms = (deadline_ms - inputs.now_ms) as u64;
                return GuardStep {
                    state: GuardState::Armed { deadline_ms },
                    timer: TimerAction::CancelAndSchedule { delay_ms },
                    armed_deadline_ms: Some(deadline_ms),
                    flags,
                    effect: GuardEffect::None,
                };
            }
            Some(_) => {
                let effect = if flags.begin_forced_logout() {
                    GuardEffect::ForcedLogout
                } else {
                    GuardEffect::None
                };
                (GuardState::ExpiredAtEntry, effect)
            }
            None => {
                flags.mark_live_session();
                (GuardState::AuthenticatedNoExpiry, GuardEffect::None)
            }
        },
        SessionStatus::Unauthenticated => {
            if flags.had_session && !flags.triggered {
                flags.triggered = true;
                flags.had_session = false;
                (GuardState::Expelled, GuardEffect::StatusLoss)
            } else {
                (GuardState::NeverAuthenticated, GuardEffect::None)
            }
        }
    };

    GuardStep {
        state,
        timer: release_timer,
        armed_deadline_ms: None,
        flags,
        effect,
    }
}
