//! Synchronous bridge over an owned single-threaded tokio runtime.
//!
//! Agent tools are plain blocking functions, while every ledger operation is
//! a future. The [`Bridge`] owns the one runtime those futures run on and
//! hands each caller its result synchronously:
//!
//! ```no_run
//! use aptos_agent::bridge::Bridge;
//!
//! let bridge = Bridge::new();
//! bridge.open().unwrap();
//! let answer = bridge.call(async { 40 + 2 }).unwrap();
//! assert_eq!(answer, 42);
//! bridge.close().unwrap();
//! ```
//!
//! Calls are serialized: the runtime sits behind a mutex that is held for
//! the whole of `call`, so two calls never overlap and concurrent callers
//! queue on the lock.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, warn};

use crate::error::AgentResult;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("bridge is not open")]
    NotOpen,

    #[error("bridge is already open")]
    AlreadyOpen,

    #[error("bridge closed")]
    Closed,

    #[error("bridge used from inside an async context")]
    Reentrant,

    #[error("operation panicked: {0}")]
    Panicked(String),

    #[error("failed to start runtime: {0}")]
    Runtime(String),
}

impl BridgeError {
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            BridgeError::NotOpen | BridgeError::AlreadyOpen | BridgeError::Closed | BridgeError::Reentrant
        )
    }
}

enum State {
    Idle,
    Open(Runtime),
    Closed,
}

impl State {
    fn label(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Open(_) => "open",
            State::Closed => "closed",
        }
    }
}

pub struct Bridge {
    state: Mutex<State>,
    shutdown_timeout: Duration,
}

impl Bridge {
    pub fn new() -> Self {
        Self::with_shutdown_timeout(Duration::from_secs(5))
    }

    /// How long `close` waits for spawned background work before dropping it.
    pub fn with_shutdown_timeout(shutdown_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(State::Idle),
            shutdown_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic is caught inside `call`, so a poisoned lock still guards a
        // consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_blocking_context() -> BridgeResult<()> {
        if Handle::try_current().is_ok() {
            return Err(BridgeError::Reentrant);
        }
        Ok(())
    }

    pub fn open(&self) -> BridgeResult<()> {
        Self::ensure_blocking_context()?;

        let mut state = self.lock();
        if let State::Open(_) = *state {
            return Err(BridgeError::AlreadyOpen);
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BridgeError::Runtime(e.to_string()))?;

        *state = State::Open(runtime);
        info!("Bridge opened");
        Ok(())
    }

    /// Never blocks. A call in progress holds the lock, and calls only run
    /// on an open bridge, so a held lock reads as open.
    pub fn is_open(&self) -> bool {
        matches!(self.peek_label(), "open" | "busy")
    }

    fn peek_label(&self) -> &'static str {
        match self.state.try_lock() {
            Ok(state) => state.label(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().label(),
            Err(TryLockError::WouldBlock) => "busy",
        }
    }

    /// Runs `operation` to completion on the owned runtime and returns its
    /// output. Blocks the calling thread for the duration of the call.
    pub fn call<F>(&self, operation: F) -> BridgeResult<F::Output>
    where
        F: Future,
    {
        Self::ensure_blocking_context()?;

        let state = self.lock();
        let runtime = match &*state {
            State::Open(runtime) => runtime,
            State::Idle => return Err(BridgeError::NotOpen),
            State::Closed => return Err(BridgeError::Closed),
        };

        let started = Instant::now();
        let outcome = runtime.block_on(AssertUnwindSafe(operation).catch_unwind());
        debug!("Bridge call finished in {:?}", started.elapsed());

        outcome.map_err(|payload| {
            let reason = panic_reason(payload.as_ref());
            warn!("Bridged operation panicked: {}", reason);
            BridgeError::Panicked(reason)
        })
    }

    /// `call` for operations that already report failure as an
    /// [`AgentResult`]; bridge errors are folded into the same error type.
    pub fn run<F, T>(&self, operation: F) -> AgentResult<T>
    where
        F: Future<Output = AgentResult<T>>,
    {
        self.call(operation)?
    }

    pub fn close(&self) -> BridgeResult<()> {
        Self::ensure_blocking_context()?;

        let mut state = self.lock();
        match std::mem::replace(&mut *state, State::Closed) {
            State::Open(runtime) => {
                runtime.shutdown_timeout(self.shutdown_timeout);
                info!("Bridge closed");
                Ok(())
            }
            State::Idle => {
                *state = State::Idle;
                Err(BridgeError::NotOpen)
            }
            State::Closed => Err(BridgeError::Closed),
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.peek_label())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let State::Open(runtime) = std::mem::replace(state, State::Closed) {
            debug!("Bridge dropped while open, shutting runtime down in background");
            runtime.shutdown_background();
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
