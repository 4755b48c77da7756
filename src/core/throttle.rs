//! Leading-edge rate limiter with an explicit coalescing policy.
//!
//! The first call in a quiet period runs immediately. Calls that land inside
//! the window after it are either dropped or folded into a single trailing
//! run, depending on [`CoalescePolicy`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoalescePolicy {
    /// Calls inside the window are discarded.
    KeepFirst,
    /// The latest call inside the window runs once when the window closes.
    #[default]
    KeepLast,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleOutcome {
    Ran,
    Scheduled,
    Dropped,
}

type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

struct ThrottleState<T> {
    last_run: Option<Instant>,
    pending: Option<T>,
    trailing: Option<JoinHandle<()>>,
}

struct Inner<T> {
    window: Duration,
    policy: CoalescePolicy,
    callback: Callback<T>,
    state: Mutex<ThrottleState<T>>,
}

impl<T: Send + 'static> Inner<T> {
    fn fire_pending(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.trailing = None;
            let pending = state.pending.take();
            if pending.is_some() {
                state.last_run = Some(Instant::now());
            }
            pending
        };

        if let Some(arg) = pending {
            debug!("Throttle firing trailing call");
            (self.callback)(arg);
        }
    }
}


pub struct Throttle<T: Send + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Throttle<T> {
    
    pub fn new<F>(window: Duration, policy: CoalescePolicy, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                window,
                policy,
                callback: Box::new(callback),
                state: Mutex::new(ThrottleState {
                    last_run: None,
                    pending: None,
                    trailing: None,
                }),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn policy(&self) -> CoalescePolicy {
        self.inner.policy
    }

    
    pub fn call(&self, arg: T) -> ThrottleOutcome {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        let previous = state.last_run;
        let last_run = match previous {
            Some(last) if now.duration_since(last) < self.inner.window => last,
            _ => {
                state.last_run = Some(now);
                drop(state);
                (self.inner.callback)(arg);
                return ThrottleOutcome::Ran;
            }
        };

        match self.inner.policy {
            CoalescePolicy::KeepFirst => {
                debug!("Throttle dropped call inside {:?} window", self.inner.window);
                ThrottleOutcome::Dropped
            }
            CoalescePolicy::KeepLast => {
                if state.pending.replace(arg).is_some() {
                    debug!("Throttle replaced pending call");
                }

                if state.trailing.is_none() {
                    let handle = match tokio::runtime::Handle::try_current() {
                        Ok(handle) => handle,
                        Err(_) => {
                            warn!("Throttle has no async runtime for a trailing call, dropping it");
                            state.pending = None;
                            return ThrottleOutcome::Dropped;
                        }
                    };

                    let deadline = last_run + self.inner.window;
                    let inner = Arc::clone(&self.inner);
                    state.trailing = Some(handle.spawn(async move {
                        tokio::time::sleep_until(deadline).await;
                        inner.fire_pending();
                    }));
                }

                ThrottleOutcome::Scheduled
            }
        }
    }

    /// Runs a pending trailing call now instead of at window end.
    pub fn flush(&self) {
        if let Some(trailing) = self.inner.state.lock().trailing.take() {
            trailing.abort();
        }
        self.inner.fire_pending();
    }

    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        if let Some(trailing) = state.trailing.take() {
            trailing.abort();
        }
        state.pending = None;
        state.last_run = None;
    }

    pub fn has_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }
}

impl<T: Send + 'static> Drop for Throttle<T> {
    fn drop(&mut self) {
        if let Some(trailing) = self.inner.state.lock().trailing.take() {
            trailing.abort();
        }
    }
}
