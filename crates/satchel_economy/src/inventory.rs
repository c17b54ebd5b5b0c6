//! # Inventory System
//!
//! Stacks, slots and containers.
//!
//! An [`ItemStack`] is not `Clone`: it lives in exactly one slot, or in the
//! transfer coordinator while it is being dragged. Units are only created by
//! [`Container::fill`] and only destroyed by [`Container::drain`]; merge,
//! split and move hand stacks around by value.
//!
//! Every slot mutation is published to the container's subscribers as a
//! [`SlotEvent`].

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::catalog::{ItemDefinition, ItemId};
use crate::error::{EconomyError, EconomyResult};

/// Identity of a single stack instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(u64);

impl StackId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A quantity of a single item, bounded by the item's stack size.
#[derive(Debug, PartialEq, Eq)]
pub struct ItemStack {
    id: StackId,
    item_id: ItemId,
    count: u32,
    max_stack: u32,
}

impl ItemStack {
    /// Creates a new stack. The count is clamped to the stack limit.
    pub(crate) fn new(def: &ItemDefinition, count: u32) -> Self {
        let max_stack = def.stack_limit();
        Self {
            id: StackId::next(),
            item_id: def.id,
            count: count.min(max_stack),
            max_stack,
        }
    }

    /// Stack identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> StackId {
        self.id
    }

    /// Item type held.
    #[inline]
    #[must_use]
    pub const fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Units held.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Stack limit captured from the item definition.
    #[inline]
    #[must_use]
    pub const fn max_stack(&self) -> u32 {
        self.max_stack
    }

    /// Units that can still be added.
    #[inline]
    #[must_use]
    pub const fn spare(&self) -> u32 {
        self.max_stack - self.count
    }

    /// Returns true if no more units fit.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count >= self.max_stack
    }

    /// Read-only copy for renderers and events.
    #[inline]
    #[must_use]
    pub const fn view(&self) -> StackView {
        StackView {
            id: self.id,
            item_id: self.item_id,
            count: self.count,
            max_stack: self.max_stack,
        }
    }

    /// Adds units, returns how many did not fit.
    pub(crate) fn add(&mut self, amount: u32) -> u32 {
        let to_add = self.spare().min(amount);
        self.count += to_add;
        amount - to_add
    }

    /// Removes units, returns how many were actually removed.
    pub(crate) fn remove(&mut self, amount: u32) -> u32 {
        let removed = self.count.min(amount);
        self.count -= removed;
        removed
    }

    /// Merges `other` into this stack.
    ///
    /// Returns `None` when `other` was fully absorbed. Otherwise this stack is
    /// full and `other` comes back holding the remainder. Stacks of a
    /// different item are returned untouched.
    pub fn absorb(&mut self, mut other: ItemStack) -> Option<ItemStack> {
        if other.item_id != self.item_id {
            return Some(other);
        }
        let remainder = self.add(other.count);
        if remainder == 0 {
            None
        } else {
            other.count = remainder;
            Some(other)
        }
    }

    /// Splits `desired` units off into a new stack.
    ///
    /// Only splits when `0 < desired < count`; this stack keeps the leftover.
    pub fn split_off(&mut self, desired: u32) -> Option<ItemStack> {
        if desired == 0 || desired >= self.count {
            return None;
        }
        self.count -= desired;
        Some(Self {
            id: StackId::next(),
            item_id: self.item_id,
            count: desired,
            max_stack: self.max_stack,
        })
    }
}

/// Copyable snapshot of a stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackView {
    /// Stack identity.
    pub id: StackId,
    /// Item type held.
    pub item_id: ItemId,
    /// Units held.
    pub count: u32,
    /// Stack limit.
    pub max_stack: u32,
}

/// Identifier of a container within [`Holdings`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

impl ContainerId {
    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of a single slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotRef {
    /// Owning container.
    pub container: ContainerId,
    /// Slot position within the container.
    pub index: usize,
}

impl SlotRef {
    /// Creates a slot address.
    #[inline]
    #[must_use]
    pub const fn new(container: ContainerId, index: usize) -> Self {
        Self { container, index }
    }
}

/// Change notification published by a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotEvent {
    /// A slot was set, cleared or had its count changed.
    Changed {
        /// The slot that changed.
        slot: SlotRef,
        /// Contents after the change.
        contents: Option<StackView>,
    },
    /// All slots were discarded and regenerated.
    Rebuilt {
        /// The rebuilt container.
        container: ContainerId,
        /// New slot count.
        slot_count: usize,
    },
}

/// An ordered, fixed-length sequence of slots.
///
/// Slot order is the priority order for allocation and drain.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    label: String,
    slots: Vec<Option<ItemStack>>,
    subscribers: Vec<Sender<SlotEvent>>,
}

impl Container {
    pub(crate) fn new(id: ContainerId, label: String, slot_count: usize) -> Self {
        Self {
            id,
            label,
            slots: (0..slot_count).map(|_| None).collect(),
            subscribers: Vec::new(),
        }
    }

    /// Container identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ContainerId {
        self.id
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Stack in a slot, or `None` if the slot is empty or out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Stack in a slot.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::SlotOutOfRange` for a bad index.
    pub fn slot(&self, index: usize) -> EconomyResult<Option<&ItemStack>> {
        self.check(index)?;
        Ok(self.slots[index].as_ref())
    }

    /// Iterates `(index, contents)` in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&ItemStack>)> {
        self.slots.iter().enumerate().map(|(i, s)| (i, s.as_ref()))
    }

    /// Total units of an item in this container.
    #[must_use]
    pub fn count_item(&self, item_id: ItemId) -> u64 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item_id == item_id)
            .map(|s| u64::from(s.count))
            .sum()
    }

    /// Number of empty slots.
    #[must_use]
    pub fn empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Read-only copy of every slot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Option<StackView>> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map(ItemStack::view))
            .collect()
    }

    /// Subscribes to slot changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<SlotEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Adds units of an item.
    ///
    /// Tops up existing stacks in slot order first, then opens new stacks in
    /// empty slots. Returns the quantity that did not fit.
    pub fn fill(&mut self, def: &ItemDefinition, quantity: u32) -> u32 {
        let mut remaining = quantity;

        // Phase 1: top up existing stacks
        for index in 0..self.slots.len() {
            if remaining == 0 {
                break;
            }
            let topped_up = match &mut self.slots[index] {
                Some(stack) if stack.item_id == def.id && !stack.is_full() => {
                    remaining = stack.add(remaining);
                    true
                }
                _ => false,
            };
            if topped_up {
                self.notify_slot(index);
            }
        }

        // Phase 2: new stacks in empty slots
        let limit = def.stack_limit();
        for index in 0..self.slots.len() {
            if remaining == 0 {
                break;
            }
            if self.slots[index].is_some() {
                continue;
            }
            let put = remaining.min(limit);
            self.slots[index] = Some(ItemStack::new(def, put));
            remaining -= put;
            self.notify_slot(index);
        }

        remaining
    }

    /// Removes up to `need` units of an item in slot order.
    ///
    /// Emptied stacks are destroyed and their slots cleared. Never removes
    /// more than exists; returns the unfulfilled part of `need`.
    pub fn drain(&mut self, item_id: ItemId, need: u64) -> u64 {
        let mut need = need;

        for index in 0..self.slots.len() {
            if need == 0 {
                break;
            }
            let emptied = match &mut self.slots[index] {
                Some(stack) if stack.item_id == item_id => {
                    let want = u32::try_from(need).unwrap_or(u32::MAX);
                    need -= u64::from(stack.remove(want));
                    stack.count == 0
                }
                _ => continue,
            };
            if emptied {
                self.slots[index] = None;
            }
            self.notify_slot(index);
        }

        need
    }

    /// Places an existing stack: merges into same-item stacks first, then the
    /// first empty slot. Returns whatever did not fit.
    pub(crate) fn stow(&mut self, stack: ItemStack) -> Option<ItemStack> {
        let mut carried = Some(stack);

        for index in 0..self.slots.len() {
            let Some(incoming) = carried.take() else {
                break;
            };
            match &mut self.slots[index] {
                Some(existing) if existing.item_id == incoming.item_id && !existing.is_full() => {
                    carried = existing.absorb(incoming);
                    self.notify_slot(index);
                }
                _ => carried = Some(incoming),
            }
        }

        let incoming = carried?;
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(incoming);
                self.notify_slot(index);
                None
            }
            None => Some(incoming),
        }
    }

    /// Puts a stack into an empty slot. Occupied or missing slots hand it back.
    pub(crate) fn place(&mut self, index: usize, stack: ItemStack) -> Result<(), ItemStack> {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(stack);
                self.notify_slot(index);
                Ok(())
            }
            _ => Err(stack),
        }
    }

    /// Empties a slot and returns what it held.
    pub(crate) fn take(&mut self, index: usize) -> EconomyResult<Option<ItemStack>> {
        self.check(index)?;
        let taken = self.slots[index].take();
        if taken.is_some() {
            self.notify_slot(index);
        }
        Ok(taken)
    }

    /// Runs `f` on the stack in a slot and publishes the change.
    pub(crate) fn modify<R>(&mut self, index: usize, f: impl FnOnce(&mut ItemStack) -> R) -> Option<R> {
        let stack = self.slots.get_mut(index)?.as_mut()?;
        let result = f(stack);
        if stack.count == 0 {
            self.slots[index] = None;
        }
        self.notify_slot(index);
        Some(result)
    }

    /// Discards and regenerates every slot. Returns the stacks that were held.
    pub(crate) fn rebuild(&mut self, slot_count: usize) -> Vec<ItemStack> {
        let displaced: Vec<ItemStack> = self.slots.drain(..).flatten().collect();
        self.slots = (0..slot_count).map(|_| None).collect();
        self.notify(&SlotEvent::Rebuilt {
            container: self.id,
            slot_count,
        });
        displaced
    }

    fn check(&self, index: usize) -> EconomyResult<()> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(EconomyError::SlotOutOfRange {
                container: self.id.0,
                index,
                len: self.slots.len(),
            })
        }
    }

    fn notify_slot(&mut self, index: usize) {
        if self.subscribers.is_empty() {
            return;
        }
        let event = SlotEvent::Changed {
            slot: SlotRef::new(self.id, index),
            contents: self.slots[index].as_ref().map(ItemStack::view),
        };
        self.notify(&event);
    }

    fn notify(&mut self, event: &SlotEvent) {
        // Disconnected subscribers are pruned here.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Every container the player owns, in a fixed order.
#[derive(Debug, Default)]
pub struct Holdings {
    containers: Vec<Container>,
}

impl Holdings {
    /// Creates empty holdings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a container with `slot_count` empty slots.
    pub fn add_container(&mut self, label: impl Into<String>, slot_count: usize) -> ContainerId {
        let id = ContainerId(self.containers.len());
        self.containers.push(Container::new(id, label.into(), slot_count));
        id
    }

    /// Looks up a container.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ContainerNotFound` for a foreign id.
    pub fn container(&self, id: ContainerId) -> EconomyResult<&Container> {
        self.containers
            .get(id.0)
            .ok_or(EconomyError::ContainerNotFound(id.0))
    }

    /// Looks up a container mutably.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ContainerNotFound` for a foreign id.
    pub fn container_mut(&mut self, id: ContainerId) -> EconomyResult<&mut Container> {
        self.containers
            .get_mut(id.0)
            .ok_or(EconomyError::ContainerNotFound(id.0))
    }

    /// All containers in order.
    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter()
    }

    /// All container ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<ContainerId> {
        self.containers.iter().map(Container::id).collect()
    }

    /// Stack at a slot address.
    ///
    /// # Errors
    ///
    /// Returns an error if the container or slot does not exist.
    pub fn stack_at(&self, slot: SlotRef) -> EconomyResult<Option<&ItemStack>> {
        self.container(slot.container)?.slot(slot.index)
    }

    /// Units of an item across the given containers. Unknown ids count as empty.
    #[must_use]
    pub fn count_item(&self, order: &[ContainerId], item_id: ItemId) -> u64 {
        order
            .iter()
            .filter_map(|&id| self.container(id).ok())
            .map(|c| c.count_item(item_id))
            .sum()
    }

    /// Units of an item across every container.
    #[must_use]
    pub fn total_item(&self, item_id: ItemId) -> u64 {
        self.containers.iter().map(|c| c.count_item(item_id)).sum()
    }
}
