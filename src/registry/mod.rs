// Live connection tracking and role-partitioned audiences

mod fanout;

pub use fanout::Delivery;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Outbound queue feeding one connection's socket writer
pub type Outbound = mpsc::Sender<Arc<str>>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Audience a connection belongs to once authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Tourist,
}

impl Role {
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "admin" => Some(Role::Admin),
            "tourist" => Some(Role::Tourist),
            _ => None,
        }
    }
}

/// Routing identity bound to a connection at auth time
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub role: Role,
    pub user_id: String,
    pub display_name: Option<String>,
}

struct Connection {
    outbound: Outbound,
    identity: Option<Identity>,
}

/// Tracks every live connection and which audience it is in.
///
/// A connection is anonymous from `open` until `register`; it is in at most
/// one audience at a time.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    admins: HashSet<ConnectionId>,
    tourists: HashSet<ConnectionId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted, still anonymous connection
    pub fn open(&mut self, id: ConnectionId, outbound: Outbound) {
        self.connections.insert(
            id,
            Connection {
                outbound,
                identity: None,
            },
        );
    }

    /// Bind a connection to an audience, moving it out of any previous one.
    ///
    /// Returns false when the connection is not (or no longer) open.
    pub fn register(
        &mut self,
        id: ConnectionId,
        role: Role,
        user_id: String,
        display_name: Option<String>,
    ) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return false;
        };

        connection.identity = Some(Identity {
            role,
            user_id,
            display_name,
        });

        self.admins.remove(&id);
        self.tourists.remove(&id);
        self.members_mut(role).insert(id);
        true
    }

    /// Forget a connection entirely. Safe to call more than once.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Identity> {
        self.admins.remove(&id);
        self.tourists.remove(&id);
        let removed = self.connections.remove(&id)?;
        debug!(connection_id = %id, "Connection unregistered");
        removed.identity
    }

    pub fn identity(&self, id: ConnectionId) -> Option<&Identity> {
        self.connections.get(&id)?.identity.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Snapshot of an audience's members and their queues
    pub fn audience(&self, role: Role) -> Vec<(ConnectionId, Outbound)> {
        self.members(role)
            .iter()
            .filter_map(|id| {
                let connection = self.connections.get(id)?;
                Some((*id, connection.outbound.clone()))
            })
            .collect()
    }

    pub fn audience_size(&self, role: Role) -> usize {
        self.members(role).len()
    }

    /// All open connections, anonymous ones included
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn members(&self, role: Role) -> &HashSet<ConnectionId> {
        match role {
            Role::Admin => &self.admins,
            Role::Tourist => &self.tourists,
        }
    }

    fn members_mut(&mut self, role: Role) -> &mut HashSet<ConnectionId> {
        match role {
            Role::Admin => &mut self.admins,
            Role::Tourist => &mut self.tourists,
        }
    }
}
