//! The connection slot: at most one connected agent per process.
//!
//! Occupancy is checked and reserved under a short synchronous lock before
//! any await point, so two logically concurrent connects cannot both
//! succeed. The slot is populated only once the connector resolves.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::agent::{AgentConnector, AgentError, BrowserAgent, ConnectOptions};

/// Precondition failures on the connection slot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Browser bridge not connected. Please run a connect tool first.")]
    NotConnected,

    #[error("Already connected to a tab.")]
    AlreadyConnected,

    #[error(transparent)]
    Agent(#[from] AgentError),
}

enum Slot {
    Empty,
    /// A connect is in flight; the slot is reserved.
    Connecting,
    Connected(Arc<dyn BrowserAgent>),
}

/// Where to attach a new agent.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectTarget {
    CurrentTab,
    NewTab { url: String },
}

/// Owns the connection slot and the connector that fills it.
///
/// Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct BrowserSession {
    slot: Arc<Mutex<Slot>>,
    connector: Arc<dyn AgentConnector>,
}

/// Releases a `Connecting` reservation if the connect future is dropped or
/// fails before committing.
struct Reservation<'a> {
    session: &'a BrowserSession,
    committed: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let mut slot = self.session.lock_slot();
            if matches!(*slot, Slot::Connecting) {
                *slot = Slot::Empty;
            }
        }
    }
}

impl BrowserSession {
    pub fn new(connector: Arc<dyn AgentConnector>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Empty)),
            connector,
        }
    }

    // The lock is never held across an await, so a poisoned slot still
    // holds a consistent value.
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True when an agent is attached and has not torn itself down.
    pub fn is_connected(&self) -> bool {
        match &*self.lock_slot() {
            Slot::Connected(agent) => !agent.is_closed(),
            _ => false,
        }
    }

    /// Return the connected agent or fail with [`SessionError::NotConnected`].
    ///
    /// An agent that has closed on its own is dropped from the slot here.
    pub fn ensure_connected(&self) -> Result<Arc<dyn BrowserAgent>, SessionError> {
        let mut slot = self.lock_slot();
        if matches!(&*slot, Slot::Connected(agent) if agent.is_closed()) {
            tracing::info!("Browser agent closed on its own; releasing connection slot");
            *slot = Slot::Empty;
        }
        match &*slot {
            Slot::Connected(agent) => Ok(agent.clone()),
            Slot::Empty | Slot::Connecting => Err(SessionError::NotConnected),
        }
    }

    fn reserve(&self) -> Result<Reservation<'_>, SessionError> {
        let mut slot = self.lock_slot();
        let occupied = match &*slot {
            Slot::Connected(agent) => !agent.is_closed(),
            Slot::Connecting => true,
            Slot::Empty => false,
        };
        if occupied {
            return Err(SessionError::AlreadyConnected);
        }
        *slot = Slot::Connecting;
        Ok(Reservation {
            session: self,
            committed: false,
        })
    }

    /// Attach a new agent. Fails with [`SessionError::AlreadyConnected`] when
    /// the slot is occupied; leaves the slot empty if the connector fails.
    pub async fn connect(
        &self,
        target: ConnectTarget,
        options: ConnectOptions,
    ) -> Result<(), SessionError> {
        let mut reservation = self.reserve()?;

        let agent = match &target {
            ConnectTarget::CurrentTab => self.connector.connect_current_tab(options).await?,
            ConnectTarget::NewTab { url } => self.connector.connect_new_tab(url, options).await?,
        };

        *self.lock_slot() = Slot::Connected(agent);
        reservation.committed = true;
        tracing::info!(?target, "Browser agent connected");
        Ok(())
    }

    /// Tear down the connected agent.
    ///
    /// The slot is cleared only after teardown succeeds; a failed teardown
    /// keeps the handle so the caller can retry.
    pub async fn disconnect(&self, close_new_tabs: bool) -> Result<(), SessionError> {
        let agent = self.ensure_connected()?;

        agent.destroy(close_new_tabs).await?;

        let mut slot = self.lock_slot();
        let still_current = matches!(&*slot, Slot::Connected(current) if Arc::ptr_eq(current, &agent));
        if still_current {
            *slot = Slot::Empty;
        }
        drop(slot);
        tracing::info!("Browser agent disconnected");
        Ok(())
    }
}
