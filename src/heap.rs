//! The object arena and basket (component D, GC half): a stable-index arena
//! of [`crate::object::Object`]s with hard/soft reference semantics and
//! mark-and-sweep cycle collection.
//!
//! This follows Design Notes strategy (a): "stable indices into an arena
//! owned by the basket, with soft edges stored as index lists, and perform
//! mark-and-sweep over the arena." Concretely:
//!
//! - **Hard references** are a per-slot refcount (`hard_count`). A slot with
//!   `hard_count > 0` is a GC root — the analogue of the original runtime's
//!   `Basket::roots` set, but expressed as a counter rather than a
//!   reference-counted smart pointer's constructor/destructor pair, since
//!   `Value` is freely `Clone`d as a plain payload and isn't itself the
//!   thing whose lifetime should pin a heap slot (the owning [`crate::scope::Scope`]
//!   chain is).
//! - **Soft references** are never reference-counted at all: they're just
//!   `HeapId`s embedded in another object's fields (array elements,
//!   dictionary values, a function's captured scope, ...), discovered afresh
//!   on every collection by [`Object::trace`] rather than maintained as a
//!   persistent linked list of `Link`s. This trades a little sweep-time work
//!   for not having to thread Drop-time link bookkeeping through every
//!   container mutation — an acceptable simplification given the arena
//!   already owns every candidate for tracing.

use ahash::AHashSet;

use crate::object::Object;

/// A stable, generation-checked index into a [`Basket`]'s arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId {
    index: u32,
    generation: u32,
}

impl std::fmt::Debug for HeapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    hard_count: u32,
    object: Option<Object>,
}

/// The GC arena. One `Basket` is owned per interpreter instance.
#[derive(Default)]
pub struct Basket {
    slots: Vec<Slot>,
    free: Vec<u32>,
    allocations: usize,
}

impl Basket {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of allocations performed over this basket's lifetime
    /// (not currently-live count) — used by [`crate::resource::ResourceTracker`]
    /// to bound pathological allocation storms.
    #[must_use]
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    /// Number of slots currently occupied (live, whether reachable or not —
    /// reachability is only known right after a sweep).
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.object.is_some()).count()
    }

    /// Allocates a new object with zero hard references. Callers that want
    /// the new object to be a root must call [`Basket::retain`] themselves
    /// (typically immediately, before the allocating expression's value is
    /// dropped from the Rust stack).
    pub fn alloc(&mut self, object: Object) -> HeapId {
        self.allocations += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            slot.hard_count = 0;
            HeapId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, hard_count: 0, object: Some(object) });
            HeapId { index, generation: 0 }
        }
    }

    fn slot(&self, id: HeapId) -> Option<&Slot> {
        self.slots.get(id.index as usize).filter(|s| s.generation == id.generation && s.object.is_some())
    }

    fn slot_mut(&mut self, id: HeapId) -> Option<&mut Slot> {
        self.slots.get_mut(id.index as usize).filter(|s| s.generation == id.generation && s.object.is_some())
    }

    #[must_use]
    pub fn get(&self, id: HeapId) -> Option<&Object> {
        self.slot(id).and_then(|s| s.object.as_ref())
    }

    pub fn get_mut(&mut self, id: HeapId) -> Option<&mut Object> {
        self.slot_mut(id).and_then(|s| s.object.as_mut())
    }

    /// Adds a hard (pinning) reference.
    pub fn retain(&mut self, id: HeapId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.hard_count += 1;
        }
    }

    /// Removes a hard reference. Does not free the slot immediately even if
    /// the count reaches zero — collection only happens at an explicit
    /// [`Basket::collect_garbage`] call, matching the "collect between
    /// statements, not mid-expression" scheduling the executor uses.
    pub fn release(&mut self, id: HeapId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.hard_count = slot.hard_count.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn is_root(&self, id: HeapId) -> bool {
        self.slot(id).is_some_and(|s| s.hard_count > 0)
    }

    /// Runs a full mark-and-sweep pass: marks everything reachable from a
    /// root (`hard_count > 0`), then evicts and returns everything left
    /// unmarked.
    pub fn collect_garbage(&mut self) -> Vec<Object> {
        let mut unmarked: AHashSet<u32> =
            self.slots.iter().enumerate().filter(|(_, s)| s.object.is_some()).map(|(i, _)| i as u32).collect();

        let roots: Vec<u32> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.object.is_some() && s.hard_count > 0)
            .map(|(i, _)| i as u32)
            .collect();

        for root in roots {
            self.mark_recursive(&mut unmarked, root);
        }

        let mut garbage = Vec::new();
        for index in unmarked {
            let slot = &mut self.slots[index as usize];
            if let Some(object) = slot.object.take() {
                garbage.push(object);
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.hard_count = 0;
            self.free.push(index);
        }
        garbage
    }

    fn mark_recursive(&self, unmarked: &mut AHashSet<u32>, index: u32) {
        if !unmarked.remove(&index) {
            return;
        }
        let Some(object) = self.slots[index as usize].object.as_ref() else { return };
        let mut links = Vec::new();
        object.trace(&mut |id| links.push(id));
        for link in links {
            if let Some(slot) = self.slots.get(link.index as usize) {
                if slot.generation == link.generation {
                    self.mark_recursive(unmarked, link.index);
                }
            }
        }
    }

    /// Unconditionally evicts every object, ignoring roots — used for
    /// interpreter shutdown. Unlinks every slot before returning the
    /// objects, so a finalizer that happens to re-enter the basket (e.g. via
    /// a `Drop` impl reading stale state) can't observe half-torn-down
    /// structure.
    pub fn purge(&mut self) -> Vec<Object> {
        let mut garbage = Vec::new();
        for slot in &mut self.slots {
            if let Some(object) = slot.object.take() {
                garbage.push(object);
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.hard_count = 0;
        }
        self.free.clear();
        self.free.extend(0..self.slots.len() as u32);
        garbage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn alloc_and_get_round_trip() {
        let mut basket = Basket::new();
        let id = basket.alloc(Object::test_leaf());
        assert!(basket.get(id).is_some());
    }

    #[test]
    fn unrooted_object_is_collected() {
        let mut basket = Basket::new();
        let _id = basket.alloc(Object::test_leaf());
        let garbage = basket.collect_garbage();
        assert_eq!(garbage.len(), 1);
        assert_eq!(basket.occupied_count(), 0);
    }

    #[test]
    fn rooted_object_survives_collection() {
        let mut basket = Basket::new();
        let id = basket.alloc(Object::test_leaf());
        basket.retain(id);
        let garbage = basket.collect_garbage();
        assert!(garbage.is_empty());
        assert!(basket.get(id).is_some());
    }

    #[test]
    fn released_root_is_collected_on_next_sweep() {
        let mut basket = Basket::new();
        let id = basket.alloc(Object::test_leaf());
        basket.retain(id);
        basket.release(id);
        let garbage = basket.collect_garbage();
        assert_eq!(garbage.len(), 1);
    }

    #[test]
    fn freed_slot_index_is_reused_with_new_generation() {
        let mut basket = Basket::new();
        let id1 = basket.alloc(Object::test_leaf());
        basket.collect_garbage();
        let id2 = basket.alloc(Object::test_leaf());
        assert_eq!(id1.index, id2.index);
        assert_ne!(id1.generation, id2.generation);
        assert!(basket.get(id1).is_none());
    }

    #[test]
    fn purge_evicts_roots_too() {
        let mut basket = Basket::new();
        let id = basket.alloc(Object::test_leaf());
        basket.retain(id);
        let garbage = basket.purge();
        assert_eq!(garbage.len(), 1);
        assert!(basket.get(id).is_none());
    }
}
