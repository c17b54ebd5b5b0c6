//! # Satchel Event System
//!
//! Notifications from the session to whatever renders it.
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │  Commands   │─────>│   Session   │─────>│   Event     │─────> UI
//! │  (UI input) │      │             │      │   Channel   │
//! └─────────────┘      └──────┬──────┘      └─────────────┘
//!                             │
//!                      ┌──────┴──────┐
//!                      │   Economy   │
//!                      │  (Holdings) │
//!                      └─────────────┘
//! ```
//!
//! Every subscriber owns a bounded channel and sees every event published
//! after it subscribed. A subscriber that falls behind loses its own new
//! events; the others are unaffected. Dropped receivers are pruned on the
//! next publish.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use satchel_economy::{
    BuyAbort, BuyReport, ContainerId, CraftAbort, CraftReport, DropOutcome, ItemId, RecipeId, SellReport, Settlement,
    SlotRef, StackView,
};
use tracing::warn;

use crate::session::Panel;

/// Events published by a [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    // =========================================================================
    // Slot Events
    // =========================================================================
    /// A slot's contents changed.
    SlotChanged {
        /// The slot.
        slot: SlotRef,
        /// Contents after the change.
        contents: Option<StackView>,
    },

    /// A container was rebuilt with a new slot count.
    ContainerRebuilt {
        /// The container.
        container: ContainerId,
        /// New slot count.
        slot_count: usize,
    },

    // =========================================================================
    // Transfer Events
    // =========================================================================
    /// A stack was picked up.
    TransferStarted {
        /// The held stack.
        held: StackView,
        /// Where it came from.
        origin: SlotRef,
    },

    /// The held stack was dropped.
    TransferDropped(DropOutcome),

    /// Held or parked stacks were returned to holdings.
    TransferReconciled(Vec<Settlement>),

    // =========================================================================
    // Crafting & Shop Events
    // =========================================================================
    /// A recipe was selected.
    RecipeSelected(RecipeId),

    /// An item was selected in the shop.
    ShopItemSelected(ItemId),

    /// The requested quantity of a panel changed.
    QuantityChanged {
        /// Panel whose selector changed.
        panel: Panel,
        /// New quantity.
        quantity: u32,
    },

    /// A craft produced at least one unit.
    Crafted(CraftReport),

    /// A craft did nothing.
    CraftAborted(CraftAbort),

    /// A purchase completed.
    Bought(BuyReport),

    /// A purchase did nothing.
    BuyAborted(BuyAbort),

    /// The sell container was sold.
    Sold(SellReport),

    /// Value of the sell container changed.
    SellTotalChanged(u64),

    /// Wallet balance changed.
    BalanceChanged(u64),

    // =========================================================================
    // Session Events
    // =========================================================================
    /// The open panel changed.
    PanelChanged(Option<Panel>),

    /// Units that no container could take.
    Unplaced {
        /// Item that did not fit.
        item_id: ItemId,
        /// Units left over.
        quantity: u32,
    },
}

/// Fan-out of session events to any number of subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Events buffered per subscriber.
    capacity: usize,
    /// One sender per live subscriber.
    subscribers: Vec<Sender<SessionEvent>>,
}

impl EventBus {
    /// Creates a bus whose subscribers each buffer at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Vec::new(),
        }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&mut self) -> EventReceiver {
        let (sender, receiver) = bounded(self.capacity);
        self.subscribers.push(sender);
        EventReceiver { receiver }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Sends an event to every subscriber without blocking.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&mut self, event: &SessionEvent) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(?event, "Subscriber queue full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }
}

/// Handle for receiving events.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: Receiver<SessionEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    #[inline]
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.receiver.try_iter().collect()
    }

    /// Receives one event (non-blocking).
    #[inline]
    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_send_receive() {
        let mut bus = EventBus::new(8);
        let receiver = bus.subscribe();

        assert_eq!(bus.publish(&SessionEvent::BalanceChanged(40)), 1);
        assert!(receiver.has_events());

        assert_eq!(receiver.try_recv(), Some(SessionEvent::BalanceChanged(40)));
        assert!(!receiver.has_events());
    }

    #[test]
    fn test_event_drain() {
        let mut bus = EventBus::new(100);
        let receiver = bus.subscribe();

        for i in 0..10 {
            bus.publish(&SessionEvent::SellTotalChanged(i));
        }

        let events = receiver.drain();
        assert_eq!(events.len(), 10);
        assert_eq!(receiver.pending_count(), 0);
    }

    #[test]
    fn test_every_subscriber_sees_every_event() {
        let mut bus = EventBus::new(8);
        let ui = bus.subscribe();
        let log = bus.subscribe();

        assert_eq!(bus.publish(&SessionEvent::PanelChanged(Some(Panel::Shop))), 2);

        assert_eq!(ui.drain(), vec![SessionEvent::PanelChanged(Some(Panel::Shop))]);
        assert_eq!(log.drain(), vec![SessionEvent::PanelChanged(Some(Panel::Shop))]);
    }

    #[test]
    fn test_full_subscriber_does_not_starve_others() {
        let mut bus = EventBus::new(2);
        let slow = bus.subscribe();
        let fast = bus.subscribe();

        bus.publish(&SessionEvent::PanelChanged(None));
        bus.publish(&SessionEvent::PanelChanged(Some(Panel::Shop)));
        fast.drain();
        assert_eq!(bus.publish(&SessionEvent::PanelChanged(Some(Panel::Crafting))), 1);

        assert_eq!(
            slow.drain(),
            vec![
                SessionEvent::PanelChanged(None),
                SessionEvent::PanelChanged(Some(Panel::Shop)),
            ]
        );
        assert_eq!(fast.drain(), vec![SessionEvent::PanelChanged(Some(Panel::Crafting))]);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut bus = EventBus::new(4);
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.publish(&SessionEvent::BalanceChanged(1)), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(kept.has_events());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let mut bus = EventBus::new(4);

        assert_eq!(bus.publish(&SessionEvent::BalanceChanged(1)), 0);
    }
}
