//! The object heap: an arena-backed allocation list with mark-and-sweep
//! collection.
//!
//! Objects live in arena slots and refer to each other through handles, never
//! native references, so cyclic graphs are legal and cheap to build. An
//! intrusive `next` link threads every live object into one singly-linked
//! allocation list (not a free list); sweeping walks that list once.

use std::mem;

use super::value::Value;

/// An index into the heap arena. The only way to refer to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjHandle(u32);

impl ObjHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Object payload variants.
#[derive(Debug, Clone, Copy)]
pub enum ObjectKind {
    /// Two non-owning references into the heap, either of which may be empty.
    Pair {
        left: Option<ObjHandle>,
        right: Option<ObjHandle>,
    },
}

/// A heap node: mark flag, allocation-list link, payload.
#[derive(Debug, Clone)]
pub struct Object {
    pub marked: bool,
    pub next: Option<ObjHandle>,
    pub kind: ObjectKind,
}

/// Summary of one collection cycle. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    /// Objects on the allocation list when collection started.
    pub initial_count: usize,
    /// Objects unlinked and released by the sweep.
    pub objects_freed: usize,
    /// Objects that were reachable and survived.
    pub objects_survived: usize,
}

/// The heap owned by a single VM instance.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Option<Object>>,
    free: Vec<u32>,
    head: Option<ObjHandle>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new unmarked pair and prepend it to the allocation list.
    pub fn allocate_pair(&mut self, left: Option<ObjHandle>, right: Option<ObjHandle>) -> ObjHandle {
        let object = Object {
            marked: false,
            next: self.head,
            kind: ObjectKind::Pair { left, right },
        };
        let handle = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(object);
                ObjHandle(slot)
            }
            None => {
                self.slots.push(Some(object));
                ObjHandle((self.slots.len() - 1) as u32)
            }
        };
        self.head = Some(handle);
        handle
    }

    /// Borrow the object behind a handle.
    pub fn object(&self, handle: ObjHandle) -> &Object {
        self.slots[handle.index()].as_ref().expect("stale object handle")
    }

    fn object_mut(&mut self, handle: ObjHandle) -> &mut Object {
        self.slots[handle.index()].as_mut().expect("stale object handle")
    }

    /// The pair slots of an object.
    pub fn pair(&self, handle: ObjHandle) -> (Option<ObjHandle>, Option<ObjHandle>) {
        match self.object(handle).kind {
            ObjectKind::Pair { left, right } => (left, right),
        }
    }

    pub fn set_left(&mut self, handle: ObjHandle, target: Option<ObjHandle>) {
        match &mut self.object_mut(handle).kind {
            ObjectKind::Pair { left, .. } => *left = target,
        }
    }

    pub fn set_right(&mut self, handle: ObjHandle, target: Option<ObjHandle>) {
        match &mut self.object_mut(handle).kind {
            ObjectKind::Pair { right, .. } => *right = target,
        }
    }

    /// Whether the handle still refers to a live object.
    pub fn is_live(&self, handle: ObjHandle) -> bool {
        self.slots
            .get(handle.index())
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Count objects by walking the allocation list.
    pub fn object_count(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            count += 1;
            cursor = self.object(handle).next;
        }
        count
    }

    /// Approximate heap footprint in bytes.
    pub fn bytes_used(&self) -> usize {
        self.object_count() * mem::size_of::<Object>()
    }

    /// Run a full mark-and-sweep cycle over the given roots.
    ///
    /// Stop-the-world and synchronous: nothing executes or allocates while a
    /// collection is in progress. Every object reachable from a root at the
    /// moment of the call survives; everything else is freed exactly once.
    pub fn collect<'a, I>(&mut self, roots: I) -> GcStats
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let initial_count = self.object_count();
        self.mark(roots);
        let objects_freed = self.sweep();
        GcStats {
            initial_count,
            objects_freed,
            objects_survived: initial_count - objects_freed,
        }
    }

    /// Mark phase: explicit work-list traversal from the roots.
    ///
    /// A work-list rather than recursion keeps deep graphs from overflowing
    /// the native stack. Already-marked objects are skipped, which is what
    /// makes cycles terminate.
    fn mark<'a, I>(&mut self, roots: I)
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut worklist: Vec<ObjHandle> = roots
            .into_iter()
            .filter_map(|value| match value {
                Value::Obj(handle) => Some(*handle),
                Value::Int(_) => None,
            })
            .collect();

        while let Some(handle) = worklist.pop() {
            let object = self.object_mut(handle);
            if object.marked {
                continue;
            }
            object.marked = true;
            match object.kind {
                ObjectKind::Pair { left, right } => {
                    if let Some(left) = left {
                        worklist.push(left);
                    }
                    if let Some(right) = right {
                        worklist.push(right);
                    }
                }
            }
        }
    }

    /// Sweep phase: one pass over the allocation list.
    ///
    /// Unmarked objects are unlinked and their slots released; marked objects
    /// are unmarked for the next cycle and kept in their original relative
    /// order.
    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        let mut prev: Option<ObjHandle> = None;
        let mut cursor = self.head;

        while let Some(handle) = cursor {
            let next = self.object(handle).next;
            if self.object(handle).marked {
                self.object_mut(handle).marked = false;
                prev = Some(handle);
            } else {
                match prev {
                    Some(prev) => self.object_mut(prev).next = next,
                    None => self.head = next,
                }
                self.release(handle);
                freed += 1;
            }
            cursor = next;
        }
        freed
    }

    fn release(&mut self, handle: ObjHandle) {
        self.slots[handle.index()] = None;
        self.free.push(handle.index() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots(values: &[Value]) -> impl Iterator<Item = &Value> {
        values.iter()
    }

    #[test]
    fn rooted_object_survives() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);
        let stack = [Value::Obj(a)];

        let stats = heap.collect(roots(&stack));

        assert_eq!(stats.objects_survived, 1);
        assert_eq!(stats.objects_freed, 0);
        assert!(heap.is_live(a));
    }

    #[test]
    fn unrooted_object_is_freed() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);

        let stats = heap.collect(roots(&[]));

        assert_eq!(stats.initial_count, 1);
        assert_eq!(stats.objects_freed, 1);
        assert_eq!(stats.objects_survived, 0);
        assert!(!heap.is_live(a));
        assert_eq!(heap.object_count(), 0);
    }

    #[test]
    fn children_are_transitively_marked() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);
        let b = heap.allocate_pair(Some(a), None);
        let stack = [Value::Obj(b)];

        let stats = heap.collect(roots(&stack));

        assert_eq!(stats.objects_survived, 2);
        assert!(heap.is_live(a));
        assert!(heap.is_live(b));
    }

    #[test]
    fn two_node_cycle_survives_when_rooted() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);
        let b = heap.allocate_pair(Some(a), None);
        heap.set_right(a, Some(b));
        let stack = [Value::Obj(a)];

        let stats = heap.collect(roots(&stack));

        assert_eq!(stats.objects_survived, 2);
        assert_eq!(stats.objects_freed, 0);
    }

    #[test]
    fn unrooted_cycle_is_fully_reclaimed() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);
        let b = heap.allocate_pair(Some(a), None);
        heap.set_right(a, Some(b));

        let stats = heap.collect(roots(&[]));

        assert_eq!(stats.objects_freed, 2);
        assert_eq!(heap.object_count(), 0);
    }

    #[test]
    fn self_reference_survives_as_root() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);
        heap.set_left(a, Some(a));
        heap.set_right(a, Some(a));
        let stack = [Value::Obj(a)];

        let stats = heap.collect(roots(&stack));

        assert_eq!(stats.objects_survived, 1);
        assert_eq!(stats.objects_freed, 0);
    }

    #[test]
    fn diamond_graph_counts_shared_node_once() {
        let mut heap = Heap::new();
        let d = heap.allocate_pair(None, None);
        let b = heap.allocate_pair(Some(d), None);
        let c = heap.allocate_pair(Some(d), None);
        let root = heap.allocate_pair(Some(b), Some(c));
        let stack = [Value::Obj(root)];

        let stats = heap.collect(roots(&stack));

        assert_eq!(stats.objects_survived, 4);
        assert_eq!(stats.objects_freed, 0);
    }

    #[test]
    fn collection_is_idempotent_on_stable_roots() {
        let mut heap = Heap::new();
        let keep = heap.allocate_pair(None, None);
        heap.allocate_pair(None, None);
        let stack = [Value::Obj(keep)];

        let first = heap.collect(roots(&stack));
        let second = heap.collect(roots(&stack));

        assert_eq!(first.objects_freed, 1);
        assert_eq!(second.objects_freed, 0);
        assert_eq!(second.objects_survived, 1);
    }

    #[test]
    fn deep_list_does_not_overflow_the_mark_stack() {
        let mut heap = Heap::new();
        let root = heap.allocate_pair(None, None);
        let mut tail = root;
        for _ in 0..10_000 {
            let next = heap.allocate_pair(None, None);
            heap.set_right(tail, Some(next));
            tail = next;
        }
        let stack = [Value::Obj(root)];

        let stats = heap.collect(roots(&stack));

        assert_eq!(stats.objects_survived, 10_001);
    }

    #[test]
    fn garbage_stress_frees_everything() {
        let mut heap = Heap::new();
        for _ in 0..10_000 {
            heap.allocate_pair(None, None);
        }

        let stats = heap.collect(roots(&[]));

        assert_eq!(stats.objects_freed, 10_000);
        assert_eq!(heap.object_count(), 0);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);
        let index = a.index();
        heap.collect(roots(&[]));

        let b = heap.allocate_pair(None, None);

        assert_eq!(b.index(), index);
        assert_eq!(heap.object_count(), 1);
    }

    #[test]
    fn survivors_keep_their_relative_order() {
        let mut heap = Heap::new();
        let a = heap.allocate_pair(None, None);
        heap.allocate_pair(None, None);
        let c = heap.allocate_pair(None, None);
        let stack = [Value::Obj(a), Value::Obj(c)];

        heap.collect(roots(&stack));

        // List was built by prepending: c is still ahead of a.
        let mut order = Vec::new();
        let mut cursor = heap.head;
        while let Some(handle) = cursor {
            order.push(handle);
            cursor = heap.object(handle).next;
        }
        assert_eq!(order, vec![c, a]);
    }
}
