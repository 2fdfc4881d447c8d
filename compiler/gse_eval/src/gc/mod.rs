//! The GC space: slot arena, roots and mark-and-sweep collection.
//!
//! Every container value (array, object, callable) and every context
//! lives in a slot of the space. Slots are addressed by [`GcRef`]
//! (index + generation); freed slots go to a free list and bump their
//! generation so stale handles are caught on access.
//!
//! # Reachability
//!
//! Everything that can hold a handle implements [`Traceable`]. A
//! collection starts from:
//!
//! - pinned handles (global contexts are pinned on creation),
//! - registered root providers (host wrappers, held weakly),
//! - extra roots passed to [`Space::collect`] (the class registry, the
//!   context an execution is about to run in).
//!
//! An implementation of `collect_references` that misses a handle is a
//! use-after-free waiting to happen: the object gets swept and the next
//! access through the stale handle aborts.
//!
//! Collection never runs while interpreter frames are live. The
//! interpreter brackets every entry point with
//! [`enter_execution`](Space::enter_execution) /
//! [`exit_execution`](Space::exit_execution); a `collect` requested in
//! between (e.g. by a native function) is recorded and runs at the next
//! engine entry instead.

use std::sync::Weak;

use rustc_hash::FxHashMap;

use crate::callable::{FunctionData, NativeFunction};
use crate::context::ContextData;
use crate::errors::invariant_violation;
use crate::object::{ObjectData, Wrapping};
use crate::value::{GcRef, Value};

/// Reports every GC handle an entity directly references.
pub trait Traceable {
    fn collect_references(&self, out: &mut Vec<GcRef>);
}

impl<T: Traceable> Traceable for [T] {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        for item in self {
            item.collect_references(out);
        }
    }
}

impl<T: Traceable> Traceable for Vec<T> {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        self.as_slice().collect_references(out);
    }
}

impl<T: Traceable> Traceable for Option<T> {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        if let Some(inner) = self {
            inner.collect_references(out);
        }
    }
}

/// Payload of a live slot.
#[derive(Debug)]
pub enum GcObject {
    Array(Vec<Value>),
    Object(ObjectData),
    Function(FunctionData),
    Native(NativeFunction),
    Context(ContextData),
}

impl GcObject {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GcObject::Array(_) => "array",
            GcObject::Object(_) => "object",
            GcObject::Function(_) => "function",
            GcObject::Native(_) => "native function",
            GcObject::Context(_) => "context",
        }
    }
}

impl Traceable for GcObject {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        match self {
            GcObject::Array(items) => items.collect_references(out),
            GcObject::Object(data) => data.collect_references(out),
            GcObject::Function(data) => data.collect_references(out),
            GcObject::Native(native) => native.collect_references(out),
            GcObject::Context(data) => data.collect_references(out),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<GcObject>,
    marked: bool,
}

/// Result of one collection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Live objects after the collection.
    pub marked: usize,
    /// Objects reclaimed.
    pub freed: usize,
    /// Requested while an execution was active; nothing was touched.
    pub deferred: bool,
}

/// Owner of every GC-managed object.
#[derive(Default)]
pub struct Space {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pins: FxHashMap<GcRef, usize>,
    providers: Vec<Weak<dyn Traceable + Send + Sync>>,
    pub(crate) wraps: FxHashMap<GcRef, Wrapping>,
    allocated_since_collect: usize,
    live: usize,
    active_executions: usize,
    collect_requested: bool,
}

impl Space {
    pub fn new() -> Self {
        Self::default()
    }

    // Allocation

    pub(crate) fn allocate(&mut self, object: GcObject) -> GcRef {
        self.allocated_since_collect = self.allocated_since_collect.saturating_add(1);
        self.live = self.live.saturating_add(1);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            slot.marked = false;
            return GcRef::new(index, slot.generation);
        }
        let Ok(index) = u32::try_from(self.slots.len()) else {
            invariant_violation("GC space exhausted");
        };
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
            marked: false,
        });
        GcRef::new(index, 0)
    }

    pub fn alloc_array(&mut self, items: Vec<Value>) -> Value {
        Value::Array(self.allocate(GcObject::Array(items)))
    }

    pub fn alloc_object(&mut self, data: ObjectData) -> Value {
        Value::Object(self.allocate(GcObject::Object(data)))
    }

    pub fn alloc_function(&mut self, data: FunctionData) -> Value {
        Value::Callable(self.allocate(GcObject::Function(data)))
    }

    pub fn alloc_native(&mut self, native: NativeFunction) -> Value {
        Value::Callable(self.allocate(GcObject::Native(native)))
    }

    // Access

    /// Whether `r` still points at a live object.
    pub fn contains(&self, r: GcRef) -> bool {
        self.slots
            .get(r.index())
            .is_some_and(|slot| slot.generation == r.generation() && slot.object.is_some())
    }

    pub fn try_get(&self, r: GcRef) -> Option<&GcObject> {
        let slot = self.slots.get(r.index())?;
        if slot.generation != r.generation() {
            return None;
        }
        slot.object.as_ref()
    }

    /// Payload of a live slot. A stale handle is fatal.
    pub fn get(&self, r: GcRef) -> &GcObject {
        match self.try_get(r) {
            Some(object) => object,
            None => stale_handle(r),
        }
    }

    pub fn get_mut(&mut self, r: GcRef) -> &mut GcObject {
        let live = self
            .slots
            .get_mut(r.index())
            .filter(|slot| slot.generation == r.generation())
            .and_then(|slot| slot.object.as_mut());
        match live {
            Some(object) => object,
            None => stale_handle(r),
        }
    }

    pub fn array(&self, r: GcRef) -> &Vec<Value> {
        match self.get(r) {
            GcObject::Array(items) => items,
            other => wrong_kind(r, "array", other),
        }
    }

    pub fn array_mut(&mut self, r: GcRef) -> &mut Vec<Value> {
        match self.get_mut(r) {
            GcObject::Array(items) => items,
            other => wrong_kind(r, "array", other),
        }
    }

    pub fn object_data(&self, r: GcRef) -> &ObjectData {
        match self.get(r) {
            GcObject::Object(data) => data,
            other => wrong_kind(r, "object", other),
        }
    }

    pub fn object_data_mut(&mut self, r: GcRef) -> &mut ObjectData {
        match self.get_mut(r) {
            GcObject::Object(data) => data,
            other => wrong_kind(r, "object", other),
        }
    }

    pub(crate) fn context_data(&self, r: GcRef) -> &ContextData {
        match self.get(r) {
            GcObject::Context(data) => data,
            other => wrong_kind(r, "context", other),
        }
    }

    pub(crate) fn context_data_mut(&mut self, r: GcRef) -> &mut ContextData {
        match self.get_mut(r) {
            GcObject::Context(data) => data,
            other => wrong_kind(r, "context", other),
        }
    }

    /// Number of live objects.
    pub fn live_objects(&self) -> usize {
        self.live
    }

    pub fn allocations_since_collect(&self) -> usize {
        self.allocated_since_collect
    }

    // Roots

    /// Keep `r` alive until a matching [`unpin`](Self::unpin). Pins nest.
    pub fn pin(&mut self, r: GcRef) {
        let count = self.pins.entry(r).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Pin the handle of a container value; primitives are ignored.
    pub fn pin_value(&mut self, value: &Value) {
        if let Some(r) = value.as_gc_ref() {
            self.pin(r);
        }
    }

    pub fn unpin(&mut self, r: GcRef) {
        if let Some(count) = self.pins.get_mut(&r) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.pins.remove(&r);
            }
        }
    }

    pub fn unpin_value(&mut self, value: &Value) {
        if let Some(r) = value.as_gc_ref() {
            self.unpin(r);
        }
    }

    pub fn is_pinned(&self, r: GcRef) -> bool {
        self.pins.contains_key(&r)
    }

    /// Register a host-side root provider. It is traced on every collection
    /// for as long as the host keeps the `Arc` alive.
    pub fn add_root_provider(&mut self, provider: Weak<dyn Traceable + Send + Sync>) {
        self.providers.push(provider);
    }

    // Execution tracking

    pub(crate) fn enter_execution(&mut self) {
        self.active_executions = self.active_executions.saturating_add(1);
    }

    pub(crate) fn exit_execution(&mut self) {
        self.active_executions = self.active_executions.saturating_sub(1);
    }

    /// Whether interpreter frames may be live.
    pub fn in_execution(&self) -> bool {
        self.active_executions > 0
    }

    /// Whether a collection was requested during an execution and has not
    /// run yet.
    pub fn collection_pending(&self) -> bool {
        self.collect_requested
    }

    // Collection

    /// Mark from every root, then sweep unmarked slots.
    ///
    /// During an execution the request is only recorded and the returned
    /// stats are `deferred`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn collect(&mut self, extra_roots: &[&dyn Traceable]) -> CollectStats {
        if self.in_execution() {
            self.collect_requested = true;
            tracing::debug!(depth = self.active_executions, "collection deferred");
            return CollectStats {
                deferred: true,
                ..CollectStats::default()
            };
        }

        let mut worklist: Vec<GcRef> = self.pins.keys().copied().collect();

        self.providers.retain(|p| p.strong_count() > 0);
        for provider in &self.providers {
            if let Some(provider) = provider.upgrade() {
                provider.collect_references(&mut worklist);
            }
        }
        for root in extra_roots {
            root.collect_references(&mut worklist);
        }

        let mut marked: usize = 0;
        while let Some(r) = worklist.pop() {
            let Some(slot) = self.slots.get_mut(r.index()) else {
                continue;
            };
            if slot.marked || slot.generation != r.generation() {
                continue;
            }
            if let Some(object) = &slot.object {
                slot.marked = true;
                marked = marked.saturating_add(1);
                object.collect_references(&mut worklist);
                if let Some(wrapping) = self.wraps.get(&r) {
                    wrapping.captures.collect_references(&mut worklist);
                }
            }
        }

        let mut freed: usize = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_none() {
                continue;
            }
            if slot.marked {
                slot.marked = false;
                continue;
            }
            #[allow(clippy::cast_possible_truncation, reason = "slot count is bounded by u32 on allocation")]
            let index = index as u32;
            self.wraps.remove(&GcRef::new(index, slot.generation));
            slot.object = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
            freed = freed.saturating_add(1);
        }

        self.live = self.live.saturating_sub(freed);
        self.allocated_since_collect = 0;
        self.collect_requested = false;
        tracing::debug!(marked, freed, live = self.live, "collection finished");
        CollectStats {
            marked,
            freed,
            deferred: false,
        }
    }
}

#[cold]
fn stale_handle(r: GcRef) -> ! {
    invariant_violation(&format!(
        "stale GC handle #{} (generation {})",
        r.index(),
        r.generation()
    ))
}

#[cold]
fn wrong_kind(r: GcRef, expected: &str, found: &GcObject) -> ! {
    invariant_violation(&format!(
        "GC handle #{} refers to a {}, expected {expected}",
        r.index(),
        found.kind_name()
    ))
}
