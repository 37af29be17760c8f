/// Fixed-size ring of recently freed node slots.
///
/// A node whose reference count drops to zero is parked here instead of being
/// unlinked right away, so that it can be resurrected cheaply by a later
/// lookup. Pushing into a full ring evicts the oldest occupant, which the
/// caller then reclaims if it is still dead.
#[derive(Debug, Clone)]
pub struct Recycler {
    slots: Vec<Option<u32>>,
    head: usize,
    len: usize,
}

impl Recycler {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Park a node, returning the evicted occupant of its slot, if any.
    pub fn push(&mut self, id: u32) -> Option<u32> {
        let evicted = self.slots[self.head].replace(id);
        self.head = (self.head + 1) % self.slots.len();
        if evicted.is_none() {
            self.len += 1;
        }
        evicted
    }

    /// Empty the ring, oldest first.
    pub fn drain(&mut self) -> Vec<u32> {
        let n = self.slots.len();
        let mut result = Vec::with_capacity(self.len);
        for i in 0..n {
            if let Some(id) = self.slots[(self.head + i) % n].take() {
                result.push(id);
            }
        }
        self.head = 0;
        self.len = 0;
        result
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
