use std::collections::HashMap;

/// Handle-keyed registry of shadow records.
///
/// Lookups of unknown handles return `None`; reporting a stale or garbage
/// handle is the caller's job, since only the caller knows which error code
/// fits. Callers hold the device lock, so the map itself is not synchronized.
#[derive(Debug)]
pub struct HandleMap<T> {
    records: HashMap<u64, T>,
}

impl<T> HandleMap<T> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Register a record, returning the one it replaced (handle reuse by the driver).
    pub fn insert(&mut self, handle: u64, record: T) -> Option<T> {
        self.records.insert(handle, record)
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        self.records.get(&handle)
    }

    pub fn get_mut(&mut self, handle: u64) -> Option<&mut T> {
        self.records.get_mut(&handle)
    }

    pub fn contains(&self, handle: u64) -> bool {
        self.records.contains_key(&handle)
    }

    pub fn remove(&mut self, handle: u64) -> Option<T> {
        self.records.remove(&handle)
    }

    /// Drop every record, returning how many were released.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    pub fn handles(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> {
        self.records.iter().map(|(h, r)| (*h, r))
    }

    /// Return number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T> Default for HandleMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
