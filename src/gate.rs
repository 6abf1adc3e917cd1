//! Nurse view access gate.
//!
//! Neither mode is access control. The PIN gate is a UI toggle for demos;
//! the session gate only mirrors what the backend reports on `/session`.
//! Anything that must actually be protected belongs in the backend.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::models::SessionStatus;
use crate::store::{RemoteQueueStore, StoreError};

pub const WRONG_PIN_MESSAGE: &str = "Wrong PIN.";

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Wrong PIN.")]
    WrongPin,

    #[error("This gate is not unlocked with a PIN")]
    NotPinGate,

    #[error("Session check failed: {0}")]
    Session(#[from] StoreError),
}

/// Something that can report whether the user has a backend session.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn session_status(&self) -> Result<SessionStatus, StoreError>;
}

#[async_trait]
impl SessionSource for RemoteQueueStore {
    async fn session_status(&self) -> Result<SessionStatus, StoreError> {
        RemoteQueueStore::session_status(self).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateMode {
    Pin(String),
    Session,
}

#[derive(Debug)]
pub struct AccessGate {
    mode: GateMode,
    open: AtomicBool,
}

impl AccessGate {
    pub fn pin(expected: impl Into<String>) -> Self {
        Self {
            mode: GateMode::Pin(expected.into()),
            open: AtomicBool::new(false),
        }
    }

    pub fn session() -> Self {
        Self {
            mode: GateMode::Session,
            open: AtomicBool::new(false),
        }
    }

    /// A gate that starts open, for trusted single-user setups.
    pub fn open() -> Self {
        let gate = Self::session();
        gate.open.store(true, Ordering::SeqCst);
        gate
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn unlock_with_pin(&self, pin: &str) -> Result<(), GateError> {
        let GateMode::Pin(expected) = &self.mode else {
            return Err(GateError::NotPinGate);
        };
        if pin.trim() != expected {
            tracing::debug!("Nurse PIN rejected");
            return Err(GateError::WrongPin);
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Ask the backend whether a session exists and open or close accordingly.
    pub async fn check_session(&self, source: &dyn SessionSource) -> Result<bool, GateError> {
        let status = source.session_status().await.map_err(|e| {
            tracing::warn!(error = %e, "Session check failed");
            GateError::from(e)
        })?;
        self.open.store(status.logged_in, Ordering::SeqCst);
        Ok(status.logged_in)
    }

    pub fn lock(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}
