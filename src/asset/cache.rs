use super::Handle;

/// Append-only storage that hands out [`Handle`]s. Entries are never
/// removed, so a handle stays valid for the lifetime of its cache.
pub struct AssetCache<T> {
    items: Vec<T>,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn insert(&mut self, item: T) -> Handle<T> {
        self.items.push(item);
        Handle::new(self.items.len() - 1)
    }

    /// Swaps in a new version of an asset (e.g. a reloaded shader) and returns
    /// the old one. `None` when the handle was issued by another cache.
    pub fn replace(&mut self, handle: Handle<T>, item: T) -> Option<T> {
        self.items
            .get_mut(handle.index())
            .map(|slot| std::mem::replace(slot, item))
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        handle.index() < self.items.len()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.items.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.items.get_mut(handle.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (Handle::new(index), item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_resolve_to_their_items() {
        let mut cache = AssetCache::new();
        let a = cache.insert("a");
        let b = cache.insert("b");
        assert_eq!(cache.get(a), Some(&"a"));
        assert_eq!(cache.get(b), Some(&"b"));
        assert!(!cache.contains(Handle::new(2)));
        assert_eq!(
            cache.iter().map(|(handle, _)| handle).collect::<Vec<_>>(),
            vec![a, b]
        );
    }

    #[test]
    fn replace_keeps_the_handle() {
        let mut cache = AssetCache::new();
        let shader = cache.insert(1);
        assert_eq!(cache.replace(shader, 2), Some(1));
        assert_eq!(cache.get(shader), Some(&2));
        assert_eq!(cache.replace(Handle::new(9), 3), None);
    }
}
