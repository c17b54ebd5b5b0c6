//! # Allocation Engine
//!
//! Catalog-aware wrappers over [`Container::fill`] and [`Container::drain`]
//! that walk several containers in priority order. The primary container is
//! always tried before any overflow container.

use tracing::{debug, warn};

use crate::catalog::{ItemCatalog, ItemId};
use crate::inventory::{Container, ContainerId, Holdings};

/// Fills a single container with `quantity` units of `item_id`.
///
/// Unknown items place nothing and the full quantity comes back.
pub fn fill(container: &mut Container, catalog: &ItemCatalog, item_id: ItemId, quantity: u32) -> u32 {
    let Some(def) = catalog.lookup(item_id) else {
        warn!(item_id, quantity, "Cannot allocate unknown item");
        return quantity;
    };
    container.fill(def, quantity)
}

/// Fills each container of `order` in turn, feeding the remainder forward.
///
/// Returns the quantity no container could accept.
pub fn fill_chain(
    holdings: &mut Holdings,
    order: &[ContainerId],
    catalog: &ItemCatalog,
    item_id: ItemId,
    quantity: u32,
) -> u32 {
    let Some(def) = catalog.lookup(item_id) else {
        warn!(item_id, quantity, "Cannot allocate unknown item");
        return quantity;
    };

    let mut remaining = quantity;
    for &id in order {
        if remaining == 0 {
            break;
        }
        match holdings.container_mut(id) {
            Ok(container) => remaining = container.fill(def, remaining),
            Err(e) => warn!(error = %e, "Skipping container during allocation"),
        }
    }

    debug!(item_id, quantity, placed = quantity - remaining, "Allocated");
    remaining
}

/// Removes up to `need` units of `item_id` from each container of `order`.
///
/// Returns the unfulfilled part of `need`.
pub fn drain_chain(holdings: &mut Holdings, order: &[ContainerId], item_id: ItemId, need: u64) -> u64 {
    let mut need = need;
    for &id in order {
        if need == 0 {
            break;
        }
        if let Ok(container) = holdings.container_mut(id) {
            need = container.drain(item_id, need);
        }
    }
    need
}

/// Units of an item across `order`.
#[must_use]
pub fn count_across(holdings: &Holdings, order: &[ContainerId], item_id: ItemId) -> u64 {
    holdings.count_item(order, item_id)
}
