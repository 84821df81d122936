//! Stable-index storage for layout nodes and links.
//!
//! Removing an element frees its slot (to be reused later) and drops the key from the separate
//! `active` list. Keys of surviving elements never change.

#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    active: Vec<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            active: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> usize {
        let key = match self.free.pop() {
            Some(key) => {
                self.slots[key] = Some(value);
                key
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        };
        self.active.push(key);
        key
    }

    pub fn remove(&mut self, key: usize) -> Option<T> {
        let value = self.slots.get_mut(key)?.take()?;
        self.free.push(key);
        self.active.retain(|&k| k != key);
        Some(value)
    }

    pub fn get(&self, key: usize) -> Option<&T> {
        self.slots.get(key).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        self.slots.get_mut(key).and_then(Option::as_mut)
    }

    /// Two distinct elements mutably at once.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut T, &mut T)> {
        if a == b || a >= self.slots.len() || b >= self.slots.len() {
            return None;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        let (head, tail) = self.slots.split_at_mut(hi);
        let lo_ref = head[lo].as_mut()?;
        let hi_ref = tail[0].as_mut()?;
        if a < b {
            Some((lo_ref, hi_ref))
        } else {
            Some((hi_ref, lo_ref))
        }
    }

    /// Keys of live elements, in insertion order.
    pub fn keys(&self) -> &[usize] {
        &self.active
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.active
            .iter()
            .filter_map(|&k| self.slots[k].as_ref().map(|v| (k, v)))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::Arena;

    #[test]
    fn removal_keeps_other_keys_stable_and_reuses_slots() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        let c = arena.insert("c");

        assert_eq!(arena.remove(b), Some("b"));
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(c), Some(&"c"));
        assert_eq!(arena.keys(), &[a, c]);

        let d = arena.insert("d");
        assert_eq!(d, b);
        assert_eq!(arena.keys(), &[a, c, d]);
        assert_eq!(arena.remove(b + 100), None);
    }

    #[test]
    fn pair_mut_returns_elements_in_argument_order() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let (x, y) = arena.pair_mut(b, a).expect("distinct live keys");
        assert_eq!((*x, *y), (2, 1));
        assert!(arena.pair_mut(a, a).is_none());
    }
}
