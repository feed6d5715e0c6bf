//! Ownership list for the observers a page has started.
//!
//! Every observer started for a page lives here until it is released
//! individually (a bounded wait that finished) or the whole registry is torn
//! down with the page context.

/// Identifies one observer for the lifetime of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

/// Something that can stop delivering callbacks.
pub trait Disconnect {
    fn disconnect(&mut self);
}

struct Entry<T, H> {
    id: ObserverId,
    tag: T,
    handle: H,
}

/// Observers in start order, each tagged with what it is watching for.
pub struct ObserverRegistry<T, H: Disconnect> {
    next_id: u32,
    entries: Vec<Entry<T, H>>,
}

impl<T: PartialEq, H: Disconnect> ObserverRegistry<T, H> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Reserve an id for an observer about to be started. Ids are never
    /// reused within a registry.
    pub fn allocate(&mut self) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn insert(&mut self, id: ObserverId, tag: T, handle: H) {
        self.entries.push(Entry { id, tag, handle });
    }

    pub fn tag(&self, id: ObserverId) -> Option<&T> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.tag)
    }

    pub fn contains_tag(&self, tag: &T) -> bool {
        self.entries.iter().any(|e| &e.tag == tag)
    }

    /// Disconnect and drop one observer. Returns `false` if it was already
    /// gone, which is normal when a timeout fires after a successful match.
    pub fn release(&mut self, id: ObserverId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(index) => {
                let mut entry = self.entries.remove(index);
                entry.handle.disconnect();
                true
            }
            None => false,
        }
    }

    /// Disconnect everything, in start order.
    pub fn disconnect_all(&mut self) {
        for mut entry in self.entries.drain(..) {
            entry.handle.disconnect();
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = ObserverId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: PartialEq, H: Disconnect> Default for ObserverRegistry<T, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, H: Disconnect> Drop for ObserverRegistry<T, H> {
    fn drop(&mut self) {
        for entry in &mut self.entries {
            entry.handle.disconnect();
        }
    }
}
