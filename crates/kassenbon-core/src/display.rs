// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Display handles — transient preview resources tied to a normalized image.
//
// A front end turns a normalized image into something it can draw (an object
// URL, a texture). Kassenbon models that resource as a `DisplayHandle` issued
// by a `DisplayRegistry`. Dropping the handle releases it, so a handle that is
// still registered after a session ends is a leak the registry can report.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

/// Tracks every live display handle.
///
/// Cheap to clone; all clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct DisplayRegistry {
    live: Arc<Mutex<HashSet<Uuid>>>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new handle and register it as live.
    pub fn issue(&self) -> DisplayHandle {
        let id = Uuid::new_v4();
        self.live
            .lock()
            .expect("display registry lock poisoned")
            .insert(id);
        debug!(handle = %id, "display handle issued");
        DisplayHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Number of handles that have been issued and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().expect("display registry lock poisoned").len()
    }

    /// Whether the handle with this id is still live.
    pub fn is_live(&self, id: Uuid) -> bool {
        self.live
            .lock()
            .expect("display registry lock poisoned")
            .contains(&id)
    }

    fn remove(&self, id: Uuid) {
        let removed = self
            .live
            .lock()
            .expect("display registry lock poisoned")
            .remove(&id);
        if removed {
            debug!(handle = %id, "display handle released");
        }
    }
}

/// A live preview resource. Released when dropped.
pub struct DisplayHandle {
    id: Uuid,
    registry: DisplayRegistry,
}

impl DisplayHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Release the handle now. Equivalent to dropping it.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

impl std::fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DisplayHandle").field(&self.id).finish()
    }
}

impl Serialize for DisplayHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}
