//! A linked list that flattens all its nodes onto a Vec for storage, gaining
//! data locality and O(1) random access by handle. Removed slots are
//! freelisted and reused by later pushes; the Vec never shrinks.

/// Index of a node in the linked list's storage vec.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeHandle(usize);

/// A node that lives in a linked list.
struct Node<T> {
    /// The value being stored.
    value: T,

    /// The node closer to the front, if any.
    prev: Option<NodeHandle>,

    /// The node closer to the back, if any.
    next: Option<NodeHandle>,
}

/// Doubly linked list over a single contiguous Vec of slots. The front holds
/// the most recently pushed (or moved) node and the back the oldest.
///
/// Handles stay valid until their node is removed, which lets LruCache keep a
/// handle per key and pull any node out of the queue, or move it back to the
/// front, in O(1).
pub(crate) struct LinkedList<T> {
    /// Node slots. `None` slots are on the freelist.
    store: Vec<Option<Node<T>>>,

    /// Slots which aren't in use anymore. These will be reused.
    free: Vec<NodeHandle>,

    head: Option<NodeHandle>,
    tail: Option<NodeHandle>,
    len: usize,
}

impl<T> LinkedList<T> {
    /// Creates a new linked list with room for `capacity` nodes before it has
    /// to grow.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// The number of live nodes in this list.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, node: NodeHandle) -> Option<&T> {
        self.node(node).map(|n| &n.value)
    }

    pub(crate) fn get_mut(&mut self, node: NodeHandle) -> Option<&mut T> {
        self.node_mut(node).map(|n| &mut n.value)
    }

    /// Pushes t onto the front of the list and returns a handle to the node.
    pub(crate) fn push_front(&mut self, t: T) -> NodeHandle {
        let n = Node {
            value: t,
            prev: None,
            next: None,
        };

        // use the first available slot in the storage vec, or append one
        let idx = match self.free.pop() {
            Some(idx) => {
                self.store[idx.0] = Some(n);
                idx
            }
            None => {
                self.store.push(Some(n));
                NodeHandle(self.store.len() - 1)
            }
        };

        self.link_front(idx);
        self.len += 1;

        idx
    }

    /// Pops the back node off the list if it exists.
    pub(crate) fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(tail)
    }

    /// Remove an arbitrary node from the list, returning its value. Returns
    /// None if the handle doesn't point at a live node.
    pub(crate) fn remove(&mut self, node: NodeHandle) -> Option<T> {
        self.node(node)?;
        self.unlink(node);

        let removed = self.store[node.0].take()?;
        self.free.push(node);
        self.len -= 1;

        Some(removed.value)
    }

    /// Moves a live node to the front of the list without reallocating it, so
    /// the handle stays the same.
    pub(crate) fn move_to_front(&mut self, node: NodeHandle) {
        if self.head == Some(node) || self.node(node).is_none() {
            return;
        }

        self.unlink(node);
        self.link_front(node);
    }

    /// Iterates from the front (newest) to the back (oldest).
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Clears this linked list. Does not free the underlying buffers.
    pub(crate) fn clear(&mut self) {
        self.store.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn node(&self, node: NodeHandle) -> Option<&Node<T>> {
        self.store.get(node.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, node: NodeHandle) -> Option<&mut Node<T>> {
        self.store.get_mut(node.0).and_then(Option::as_mut)
    }

    /// Splices a detached node in at the head.
    fn link_front(&mut self, node: NodeHandle) {
        let old_head = self.head;

        if let Some(n) = self.node_mut(node) {
            n.prev = None;
            n.next = old_head;
        }

        match old_head {
            Some(h) => {
                if let Some(head) = self.node_mut(h) {
                    head.prev = Some(node);
                }
            }
            None => self.tail = Some(node),
        }

        self.head = Some(node);
    }

    /// Links the node's neighbours to each other so the node isn't in the
    /// chain anymore. The slot itself is left alone.
    fn unlink(&mut self, node: NodeHandle) {
        let (prev, next) = match self.node_mut(node) {
            Some(n) => (n.prev.take(), n.next.take()),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(prev_node) = self.node_mut(p) {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(nx) => {
                if let Some(next_node) = self.node_mut(nx) {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }
}

pub(crate) struct Iter<'a, T> {
    list: &'a LinkedList<T>,
    cursor: Option<NodeHandle>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::LinkedList;

    fn contents(list: &LinkedList<u32>) -> Vec<u32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_push_and_pop() {
        let mut list = LinkedList::with_capacity(4);
        list.push_front(0);
        list.push_front(1);
        list.push_front(2);

        assert_eq!(vec![2, 1, 0], contents(&list));
        assert_eq!(Some(0), list.pop_back());
        assert_eq!(Some(1), list.pop_back());
        assert_eq!(Some(2), list.pop_back());
        assert_eq!(None, list.pop_back());
        assert_eq!(0, list.len());
    }

    /// Removes the middle, then the head node, to ensure the structure
    /// remains consistent throughout.
    #[test]
    fn test_head_removal() {
        let mut list = LinkedList::with_capacity(4);
        let a = list.push_front(0);
        let b = list.push_front(1);
        let c = list.push_front(2);

        assert_eq!(Some(1), list.remove(b));
        assert_eq!(vec![2, 0], contents(&list));
        assert_eq!(Some(2), list.remove(c));
        assert_eq!(vec![0], contents(&list));
        assert_eq!(Some(0), list.remove(a));
        assert!(contents(&list).is_empty());
    }

    #[test]
    fn test_stale_handle() {
        let mut list = LinkedList::with_capacity(2);
        let a = list.push_front(0);

        assert_eq!(Some(0), list.remove(a));
        assert_eq!(None, list.remove(a));
        assert_eq!(None, list.get(a));
    }

    #[test]
    fn test_move_to_front() {
        let mut list = LinkedList::with_capacity(4);
        let a = list.push_front(0);
        list.push_front(1);
        let c = list.push_front(2);

        list.move_to_front(a);
        assert_eq!(vec![0, 2, 1], contents(&list));

        // moving the head is a no-op
        list.move_to_front(a);
        assert_eq!(vec![0, 2, 1], contents(&list));

        list.move_to_front(c);
        assert_eq!(vec![2, 0, 1], contents(&list));
        assert_eq!(Some(1), list.pop_back());
        assert_eq!(Some(0), list.pop_back());
    }

    #[test]
    fn test_freelist_reuse() {
        let mut list = LinkedList::with_capacity(2);
        let a = list.push_front(0);
        list.push_front(1);
        list.remove(a);

        // the freed slot is handed back out rather than growing the store
        let c = list.push_front(2);
        assert_eq!(a, c);
        assert_eq!(2, list.store.len());
        assert_eq!(vec![2, 1], contents(&list));
    }

    #[test]
    fn test_clear() {
        let mut list = LinkedList::with_capacity(2);
        list.push_front(0);
        list.push_front(1);
        list.clear();

        assert_eq!(0, list.len());
        assert_eq!(None, list.pop_back());
        list.push_front(3);
        assert_eq!(vec![3], contents(&list));
    }
}
