use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use rustc_hash::FxBuildHasher;
use tokio::sync::Mutex;

use crate::{modbus::Endpoint, prelude::*};

/// Connection handle shared between the cache and its current user.
pub type Shared<C> = Arc<Mutex<C>>;

/// Established connections keyed by device identity.
///
/// Entries live until they are invalidated or replaced. The whole map sits behind one
/// lock, which is also held while a missing connection is being established, so connects
/// to different devices are serialized. Dropping the last handle closes the connection.
pub struct ConnectionCache<C> {
    connections: Mutex<HashMap<Endpoint, Shared<C>, FxBuildHasher>>,
}

impl<C> Default for ConnectionCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ConnectionCache<C> {
    #[must_use]
    pub const fn new() -> Self {
        Self { connections: Mutex::const_new(HashMap::with_hasher(FxBuildHasher)) }
    }

    pub async fn get(&self, endpoint: &Endpoint) -> Option<Shared<C>> {
        self.connections.lock().await.get(endpoint).cloned()
    }

    /// Cache the connection, replacing (and thereby releasing) any previous one.
    ///
    /// Clients only populate the cache through [`Self::get_or_try_insert_with`],
    /// tests use this to seed it.
    #[cfg(test)]
    pub async fn put(&self, endpoint: Endpoint, connection: C) -> Shared<C> {
        let connection = Arc::new(Mutex::new(connection));
        if self.connections.lock().await.insert(endpoint, connection.clone()).is_some() {
            debug!("replaced the cached connection");
        }
        connection
    }

    /// Drop the cached entry so that the next access reconnects.
    pub async fn invalidate(&self, endpoint: &Endpoint) -> bool {
        let removed = self.connections.lock().await.remove(endpoint);
        if removed.is_some() {
            debug!(%endpoint, "invalidated the cached connection");
        }
        removed.is_some()
    }

    /// Return the cached connection or establish a new one under the cache lock.
    pub async fn get_or_try_insert_with<F, E>(
        &self,
        endpoint: &Endpoint,
        connect: F,
    ) -> Result<Shared<C>, E>
    where
        F: AsyncFnOnce() -> Result<C, E>,
    {
        let mut connections = self.connections.lock().await;
        let connection = match connections.entry(endpoint.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                debug!(%endpoint, "not using a cached connection");
                entry.insert(Arc::new(Mutex::new(connect().await?))).clone()
            }
        };
        drop(connections);
        Ok(connection)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }
}
