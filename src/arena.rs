//! Flat node storage for [`OrderedTree`](crate::OrderedTree).
//!
//! Nodes are addressed by a 32-bit [`Ptr`] instead of owning boxes, so every
//! child link is a plain index and dropping the tree never recurses. Vacated
//! slots form an intrusive free list and are reused LIFO by [`NodeArena::alloc`].

/// Node handle. `Ptr::NULL` marks an absent child (or an empty tree).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ptr(u32);

impl Ptr {
    pub(crate) const NULL: Ptr = Ptr(u32::MAX);

    #[inline]
    fn from_index(idx: usize) -> Self {
        match u32::try_from(idx) {
            Ok(raw) if raw != u32::MAX => Self(raw),
            _ => panic!("node arena capacity exceeded"),
        }
    }

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        debug_assert!(!self.is_null(), "NULL pointer dereference");
        self.0 as usize
    }
}

#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Ptr,
    pub(crate) right: Ptr,
}

impl<K, V> Node<K, V> {
    #[inline]
    pub(crate) fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            left: Ptr::NULL,
            right: Ptr::NULL,
        }
    }
}

#[derive(Clone)]
enum Slot<K, V> {
    Occupied(Node<K, V>),
    Vacant { next_free: Ptr },
}

#[derive(Clone)]
pub(crate) struct NodeArena<K, V> {
    slots: Vec<Slot<K, V>>,
    /// Most recently vacated slot, or NULL.
    free_head: Ptr,
    len: usize,
}

impl<K, V> NodeArena<K, V> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: Ptr::NULL,
            len: 0,
        }
    }

    /// Number of occupied slots.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn vacant_slots(&self) -> usize {
        self.slots.len() - self.len
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Slot<K, V>>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.slots.shrink_to_fit();
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = Ptr::NULL;
        self.len = 0;
    }

    pub(crate) fn alloc(&mut self, node: Node<K, V>) -> Ptr {
        self.len += 1;

        if self.free_head.is_null() {
            let ptr = Ptr::from_index(self.slots.len());
            self.slots.push(Slot::Occupied(node));
            return ptr;
        }

        let ptr = self.free_head;
        let slot = &mut self.slots[ptr.index()];
        match *slot {
            Slot::Vacant { next_free } => self.free_head = next_free,
            Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
        }
        *slot = Slot::Occupied(node);
        ptr
    }

    /// Vacates `ptr` and moves its node out.
    pub(crate) fn free(&mut self, ptr: Ptr) -> Node<K, V> {
        let vacant = Slot::Vacant {
            next_free: self.free_head,
        };
        match std::mem::replace(&mut self.slots[ptr.index()], vacant) {
            Slot::Occupied(node) => {
                self.free_head = ptr;
                self.len -= 1;
                node
            }
            Slot::Vacant { .. } => unreachable!("double free of node slot"),
        }
    }

    #[inline]
    pub(crate) fn get(&self, ptr: Ptr) -> &Node<K, V> {
        match &self.slots[ptr.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("dangling node pointer"),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, ptr: Ptr) -> &mut Node<K, V> {
        match &mut self.slots[ptr.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("dangling node pointer"),
        }
    }

    #[cfg(test)]
    pub(crate) fn occupied_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
