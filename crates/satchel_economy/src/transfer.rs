//! # Transfer Coordinator
//!
//! Pick-up, drop resolution and reconciliation of held stacks.
//!
//! A picked-up stack leaves its slot and is owned by the coordinator until a
//! drop or cancel hands it back to [`Holdings`]. Reconciliation ("settle")
//! returns a stack to its origin, merging or stowing it nearby when the origin
//! is taken. When no slot anywhere can take it the stack stays parked here
//! and is retried on the next [`TransferCoordinator::cancel_all`].

use tracing::{debug, warn};

use crate::error::{EconomyError, EconomyResult};
use crate::inventory::{ContainerId, Holdings, ItemStack, SlotRef, StackView};

/// How much of a stack a pick-up takes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PickMode {
    /// The entire stack.
    WholeStack,
    /// Half, rounded up.
    Half,
    /// One unit.
    #[default]
    Single,
}

impl PickMode {
    /// Units to take from a stack of `quantity`.
    #[inline]
    #[must_use]
    pub const fn desired(self, quantity: u32) -> u32 {
        match self {
            Self::WholeStack => quantity,
            Self::Half => quantity.div_ceil(2),
            Self::Single => 1,
        }
    }
}

/// A stack detached from any slot.
#[derive(Debug)]
pub struct HeldStack {
    stack: ItemStack,
    origin: Option<SlotRef>,
}

impl HeldStack {
    /// The held stack.
    #[must_use]
    pub fn stack(&self) -> &ItemStack {
        &self.stack
    }

    /// Slot it was picked up from, if still known.
    #[must_use]
    pub const fn origin(&self) -> Option<SlotRef> {
        self.origin
    }
}

/// Where a reconciled stack ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Placed into the empty anchor slot.
    Anchored {
        /// The anchor slot.
        slot: SlotRef,
    },
    /// Fully merged into the stack at the anchor slot.
    Merged {
        /// The anchor slot.
        into: SlotRef,
    },
    /// Stowed into other stacks or slots.
    Relocated,
    /// No room anywhere; the stack stays parked in the coordinator.
    Stranded {
        /// Units still parked.
        quantity: u32,
    },
}

/// Result of dropping the held stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// The held stack now occupies `slot`.
    Placed {
        /// Slot that received the stack.
        slot: SlotRef,
        /// True when `slot` is the stack's origin.
        reanchored: bool,
    },
    /// The held stack was fully absorbed by the stack at `into`.
    Merged {
        /// Stack that absorbed the units.
        into: SlotRef,
    },
    /// The target filled up; the remainder was reconciled.
    PartiallyMerged {
        /// Stack that absorbed some units.
        into: SlotRef,
        /// Where the remainder went.
        remainder: Settlement,
    },
    /// The target could not take the stack; it was reconciled.
    Rejected {
        /// Where the stack went.
        returned: Settlement,
    },
}

/// Owns every stack that is not in a slot.
#[derive(Debug, Default)]
pub struct TransferCoordinator {
    /// Stack picked up by the player.
    active: Option<HeldStack>,
    /// Stacks that could not be reconciled, or were displaced with nowhere to go.
    parked: Vec<HeldStack>,
    /// Containers searched after the anchor's own. Empty means every container.
    stow_order: Vec<ContainerId>,
}

impl TransferCoordinator {
    /// Creates an idle coordinator that may stow into any container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an idle coordinator that stows only into `order` beyond the
    /// anchor's own container.
    ///
    /// Staging areas such as a sell container belong outside `order`: a
    /// stack only returns there when it was picked up there.
    #[must_use]
    pub fn with_stow_order(order: Vec<ContainerId>) -> Self {
        Self {
            stow_order: order,
            ..Self::default()
        }
    }

    /// Containers searched after the anchor's own.
    #[must_use]
    pub fn stow_order(&self) -> &[ContainerId] {
        &self.stow_order
    }

    /// The active held stack.
    #[must_use]
    pub fn held(&self) -> Option<&HeldStack> {
        self.active.as_ref()
    }

    /// Stacks waiting for room.
    #[must_use]
    pub fn parked(&self) -> &[HeldStack] {
        &self.parked
    }

    /// Returns true if no stack is outside holdings.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.parked.is_empty()
    }

    /// Units of an item owned by the coordinator.
    #[must_use]
    pub fn units_held(&self, item_id: u32) -> u64 {
        self.active
            .iter()
            .chain(&self.parked)
            .filter(|h| h.stack.item_id() == item_id)
            .map(|h| u64::from(h.stack.count()))
            .sum()
    }

    /// Lifts units out of a slot.
    ///
    /// When `mode` asks for less than the whole stack the source keeps the
    /// leftover in place and a new stack is held.
    ///
    /// # Errors
    ///
    /// `TransferInProgress` if a stack is already held, or a slot error if
    /// the address is invalid or the slot is empty.
    pub fn pick_up(&mut self, holdings: &mut Holdings, slot: SlotRef, mode: PickMode) -> EconomyResult<StackView> {
        if self.active.is_some() {
            return Err(EconomyError::TransferInProgress);
        }

        let empty = EconomyError::EmptySlot {
            container: slot.container.raw(),
            index: slot.index,
        };
        let container = holdings.container_mut(slot.container)?;
        let quantity = container
            .slot(slot.index)?
            .map(ItemStack::count)
            .ok_or_else(|| empty.clone())?;

        let desired = mode.desired(quantity);
        let stack = if desired < quantity {
            container.modify(slot.index, |s| s.split_off(desired)).flatten()
        } else {
            container.take(slot.index)?
        };
        let stack = stack.ok_or(empty)?;

        let view = stack.view();
        debug!(
            item_id = view.item_id,
            count = view.count,
            container = %slot.container,
            index = slot.index,
            "Picked up"
        );
        self.active = Some(HeldStack {
            stack,
            origin: Some(slot),
        });
        Ok(view)
    }

    /// Drops the held stack on `target`.
    ///
    /// # Errors
    ///
    /// `NoTransferInFlight` if nothing is held. An invalid target is not an
    /// error: the drop is rejected and the stack reconciled.
    pub fn drop_on(&mut self, holdings: &mut Holdings, target: SlotRef) -> EconomyResult<DropOutcome> {
        let HeldStack { stack, origin } = self.active.take().ok_or(EconomyError::NoTransferInFlight)?;
        let at_origin = origin == Some(target);

        let occupant = match holdings.stack_at(target) {
            Ok(occupant) => occupant.map(ItemStack::item_id),
            Err(e) => {
                debug!(error = %e, "Drop target invalid");
                let returned = self.settle(holdings, HeldStack { stack, origin }, None);
                return Ok(DropOutcome::Rejected { returned });
            }
        };

        let outcome = match occupant {
            None => match place_at(holdings, target, stack) {
                Ok(()) => DropOutcome::Placed {
                    slot: target,
                    reanchored: at_origin,
                },
                Err(stack) => {
                    let returned = self.settle(holdings, HeldStack { stack, origin }, None);
                    DropOutcome::Rejected { returned }
                }
            },
            Some(item_id) if item_id == stack.item_id() => match merge_into(holdings, target, stack) {
                None => DropOutcome::Merged { into: target },
                Some(stack) => {
                    let remainder = self.settle(holdings, HeldStack { stack, origin }, Some(target));
                    DropOutcome::PartiallyMerged { into: target, remainder }
                }
            },
            Some(_) => {
                let returned = self.settle(holdings, HeldStack { stack, origin }, None);
                DropOutcome::Rejected { returned }
            }
        };

        debug!(?outcome, "Dropped");
        Ok(outcome)
    }

    /// Returns the held stack to holdings.
    ///
    /// # Errors
    ///
    /// `NoTransferInFlight` if nothing is held.
    pub fn cancel(&mut self, holdings: &mut Holdings) -> EconomyResult<Settlement> {
        let held = self.active.take().ok_or(EconomyError::NoTransferInFlight)?;
        Ok(self.settle(holdings, held, None))
    }

    /// Reconciles the held stack and every parked stack.
    ///
    /// Works from a snapshot of the pending stacks, so stacks that strand
    /// again are parked for the next call rather than retried here.
    pub fn cancel_all(&mut self, holdings: &mut Holdings) -> Vec<Settlement> {
        let mut pending = std::mem::take(&mut self.parked);
        if let Some(active) = self.active.take() {
            pending.insert(0, active);
        }
        pending
            .into_iter()
            .map(|held| self.settle(holdings, held, None))
            .collect()
    }

    /// Moves a slot's stack into another container.
    ///
    /// Merges into same-item stacks first, then takes the first empty slot.
    /// Whatever does not fit stays in the source slot. Returns whether any
    /// unit moved.
    ///
    /// # Errors
    ///
    /// Returns an error if either container or the source slot is invalid.
    pub fn quick_move(&mut self, holdings: &mut Holdings, from: SlotRef, to: ContainerId) -> EconomyResult<bool> {
        if from.container == to {
            return Ok(false);
        }
        holdings.container(to)?;
        let Some(stack) = holdings.container_mut(from.container)?.take(from.index)? else {
            return Ok(false);
        };

        let before = stack.count();
        let rest = match holdings.container_mut(to) {
            Ok(target) => target.stow(stack),
            Err(_) => Some(stack),
        };
        let moved = rest.as_ref().map_or(before, |r| before - r.count());

        if let Some(rest) = rest {
            let back = match holdings.container_mut(from.container) {
                Ok(source) => source.place(from.index, rest).err(),
                Err(_) => Some(rest),
            };
            if let Some(back) = back {
                self.adopt(back);
            }
        }

        debug!(moved, from = %from.container, to = %to, "Quick move");
        Ok(moved > 0)
    }

    /// Parks a stack that has no slot and no known origin.
    pub fn adopt(&mut self, stack: ItemStack) {
        warn!(
            item_id = stack.item_id(),
            count = stack.count(),
            "Parking stack with no slot"
        );
        self.parked.push(HeldStack { stack, origin: None });
    }

    /// Clears origins at or past `from_index` in `container`.
    ///
    /// Called after a container is rebuilt and those slot addresses are stale.
    pub fn forget_origins(&mut self, container: ContainerId, from_index: usize) {
        for held in self.active.iter_mut().chain(self.parked.iter_mut()) {
            if held
                .origin
                .is_some_and(|o| o.container == container && o.index >= from_index)
            {
                held.origin = None;
            }
        }
    }

    /// Regenerates a container with `slot_count` slots and re-homes what it held.
    ///
    /// Displaced stacks are stowed across holdings, rebuilt container first;
    /// stacks with nowhere to go are parked. Origins pointing into the
    /// container are forgotten.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ContainerNotFound` for a foreign id.
    pub fn rebuild_container(
        &mut self,
        holdings: &mut Holdings,
        container: ContainerId,
        slot_count: usize,
    ) -> EconomyResult<Vec<Settlement>> {
        let displaced = holdings.container_mut(container)?.rebuild(slot_count);
        self.forget_origins(container, 0);

        let fallback = (slot_count > 0).then(|| SlotRef::new(container, 0));
        let settled = displaced
            .into_iter()
            .map(|stack| self.settle(holdings, HeldStack { stack, origin: None }, fallback))
            .collect();
        debug!(%container, slot_count, "Container rebuilt");
        Ok(settled)
    }

    /// Returns a held stack to holdings without losing any unit.
    ///
    /// Anchor is the origin, else `fallback`. Empty anchor: place. Same item:
    /// merge. Residue: stow in the anchor's container, then in the stow
    /// order. Anything left is parked.
    fn settle(&mut self, holdings: &mut Holdings, held: HeldStack, fallback: Option<SlotRef>) -> Settlement {
        let HeldStack { stack, origin } = held;
        let anchor = origin.or(fallback);

        let mut carried = Some(stack);
        if let Some(slot) = anchor {
            if let Some(stack) = carried.take() {
                match place_at(holdings, slot, stack) {
                    Ok(()) => return Settlement::Anchored { slot },
                    Err(back) => carried = Some(back),
                }
            }
            let same_item = match (holdings.stack_at(slot), carried.as_ref()) {
                (Ok(Some(existing)), Some(stack)) => existing.item_id() == stack.item_id(),
                _ => false,
            };
            if same_item {
                if let Some(stack) = carried.take() {
                    carried = merge_into(holdings, slot, stack);
                }
                if carried.is_none() {
                    return Settlement::Merged { into: slot };
                }
            }
        }

        let first = anchor.map(|slot| slot.container);
        let rest = if self.stow_order.is_empty() {
            holdings.ids()
        } else {
            self.stow_order.clone()
        };
        let order: Vec<ContainerId> = first
            .into_iter()
            .chain(rest.into_iter().filter(|&id| Some(id) != first))
            .collect();
        for id in order {
            let Some(stack) = carried.take() else {
                break;
            };
            carried = match holdings.container_mut(id) {
                Ok(container) => container.stow(stack),
                Err(_) => Some(stack),
            };
        }

        match carried {
            None => Settlement::Relocated,
            Some(stack) => {
                let quantity = stack.count();
                warn!(
                    item_id = stack.item_id(),
                    quantity,
                    "No room to settle stack, keeping it parked"
                );
                self.parked.push(HeldStack { stack, origin });
                Settlement::Stranded { quantity }
            }
        }
    }
}

fn place_at(holdings: &mut Holdings, slot: SlotRef, stack: ItemStack) -> Result<(), ItemStack> {
    match holdings.container_mut(slot.container) {
        Ok(container) => container.place(slot.index, stack),
        Err(_) => Err(stack),
    }
}

/// Merges into the stack at `slot`; returns what was not absorbed.
fn merge_into(holdings: &mut Holdings, slot: SlotRef, stack: ItemStack) -> Option<ItemStack> {
    let Ok(container) = holdings.container_mut(slot.container) else {
        return Some(stack);
    };
    let mut carried = Some(stack);
    container.modify(slot.index, |existing| {
        if let Some(incoming) = carried.take() {
            carried = existing.absorb(incoming);
        }
    });
    carried
}
