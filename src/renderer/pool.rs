/// A record that can be handed out by a [`Pool`] and reset for reuse.
pub trait Poolable: Default {
    /// Returns the record to its freshly-created state while keeping any
    /// allocations it owns.
    fn reset(&mut self);
}

/// Flat arena of reusable records addressed by index.
///
/// Records are never freed. `flush` resets the used prefix and the count so
/// next frame hands the same records out again. When a frame needs more than
/// the current capacity the arena grows and logs once per frame.
pub struct Pool<T> {
    name: &'static str,
    items: Vec<T>,
    used: usize,
    grew_this_frame: bool,
    growths: usize,
}

impl<T: Poolable> Pool<T> {
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let mut items = Vec::with_capacity(capacity);
        items.resize_with(capacity, T::default);
        Self {
            name,
            items,
            used: 0,
            grew_this_frame: false,
            growths: 0,
        }
    }

    /// Hands out a cleared record and returns its index.
    pub fn acquire(&mut self) -> usize {
        if self.used == self.items.len() {
            let new_capacity = (self.items.len() * 2).max(4);
            self.items.resize_with(new_capacity, T::default);
            self.growths += 1;
            if !self.grew_this_frame {
                log::warn!(
                    "{} pool exhausted; grew to {} entries (initial capacity too small)",
                    self.name,
                    new_capacity
                );
                self.grew_this_frame = true;
            }
        }

        let index = self.used;
        self.items[index].reset();
        self.used += 1;
        index
    }

    /// Panics on an index not handed out since the last flush.
    pub fn get(&self, index: usize) -> &T {
        &self.items[..self.used][index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[..self.used][index]
    }

    pub fn flush(&mut self) {
        for item in &mut self.items[..self.used] {
            item.reset();
        }
        self.used = 0;
        self.grew_this_frame = false;
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Number of times the pool has grown since it was created.
    pub fn growths(&self) -> usize {
        self.growths
    }
}

impl<T> Poolable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}
