//! # Satchel Session
//!
//! The command interface a UI drives:
//! ```text
//! Command:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. RUN                                                              │
//! │    └─ Transfer coordinator / crafting resolver / shop               │
//! │                                                                     │
//! │ 2. FLUSH SLOT CHANGES                                               │
//! │    ├─ Forward container notifications to the event bus              │
//! │    └─ Recompute the sell total if the sell area changed             │
//! │                                                                     │
//! │ 3. PUBLISH                                                          │
//! │    └─ Command result as a SessionEvent                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command runs to completion before the next one starts.

use crossbeam_channel::Receiver;
use satchel_economy::{
    allocation, BuyOutcome, ContainerId, CraftOutcome, CraftingResolver, DropOutcome, EconomyConfig, EconomyResult,
    Holdings, ItemCatalog, ItemId, LayoutConfig, PickMode, PlayerWallet, QuantitySelector, QuantitySteps, RecipeBook,
    RecipeId, SellReport, Settlement, Shop, ShopCatalog, ShopListing, SlotEvent, SlotRef, StackView,
    TransferCoordinator, Wallet,
};
use tracing::{debug, info, warn};

use crate::events::{EventBus, EventReceiver, SessionEvent};
use crate::view::{ContainerView, CraftingView, RecipeRow, SessionView, ShopView};

/// Events buffered per subscriber before new ones are dropped.
pub const EVENT_CAPACITY: usize = 1024;

/// Top-level panels. At most one is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Panel {
    /// Inventory grid.
    Inventory,
    /// Shop (buy and sell).
    Shop,
    /// Crafting.
    Crafting,
}

/// Which way a quantity button points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Decrease.
    Down,
    /// Increase.
    Up,
}

/// One player's inventory, crafting and shop state.
pub struct Session {
    catalog: ItemCatalog,
    recipes: RecipeBook,
    holdings: Holdings,
    inventory: ContainerId,
    hotbar: ContainerId,
    sell: ContainerId,
    transfers: TransferCoordinator,
    crafting: CraftingResolver,
    shop: Shop,
    wallet: PlayerWallet,
    steps: QuantitySteps,
    panel: Option<Panel>,
    slot_feeds: Vec<Receiver<SlotEvent>>,
    sell_total: u64,
    bus: EventBus,
}

impl Session {
    /// Builds a session from a parsed configuration.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the recipe table is invalid.
    pub fn from_config(config: &EconomyConfig) -> EconomyResult<Self> {
        Ok(Self::new(
            config.build_catalog(),
            config.build_recipes()?,
            config.build_shop_catalog(),
            config.layout,
            config.quantity,
            PlayerWallet::new(config.wallet.starting_balance),
        ))
    }

    /// Builds a session with empty containers sized by `layout`.
    #[must_use]
    pub fn new(
        catalog: ItemCatalog,
        recipes: RecipeBook,
        shop_catalog: ShopCatalog,
        layout: LayoutConfig,
        steps: QuantitySteps,
        wallet: PlayerWallet,
    ) -> Self {
        let mut holdings = Holdings::new();
        let inventory = holdings.add_container("inventory", layout.inventory_slots());
        let hotbar = holdings.add_container("hotbar", layout.hotbar_columns);
        let sell = holdings.add_container("sell", layout.sell_slots);

        let mut slot_feeds = Vec::with_capacity(3);
        for id in [inventory, hotbar, sell] {
            if let Ok(container) = holdings.container_mut(id) {
                slot_feeds.push(container.subscribe());
            }
        }

        let carry = vec![inventory, hotbar];

        info!(
            items = catalog.len(),
            recipes = recipes.len(),
            inventory_slots = layout.inventory_slots(),
            hotbar_slots = layout.hotbar_columns,
            "Session ready"
        );

        Self {
            catalog,
            recipes,
            holdings,
            inventory,
            hotbar,
            sell,
            transfers: TransferCoordinator::with_stow_order(carry.clone()),
            crafting: CraftingResolver::new(carry.clone(), carry.clone()),
            shop: Shop::new(shop_catalog, carry, sell),
            wallet,
            steps,
            panel: None,
            slot_feeds,
            sell_total: 0,
            bus: EventBus::new(EVENT_CAPACITY),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// New receiver for every session event published from now on.
    pub fn subscribe(&mut self) -> EventReceiver {
        self.bus.subscribe()
    }

    /// Item table.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Recipe table.
    #[must_use]
    pub fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    /// Every container.
    #[must_use]
    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    /// Held and parked stacks.
    #[must_use]
    pub fn transfers(&self) -> &TransferCoordinator {
        &self.transfers
    }

    /// Main inventory id.
    #[must_use]
    pub const fn inventory(&self) -> ContainerId {
        self.inventory
    }

    /// Hotbar id.
    #[must_use]
    pub const fn hotbar(&self) -> ContainerId {
        self.hotbar
    }

    /// Sell area id.
    #[must_use]
    pub const fn sell_area(&self) -> ContainerId {
        self.sell
    }

    /// Wallet balance.
    #[must_use]
    pub fn balance(&self) -> u64 {
        self.wallet.balance()
    }

    /// Open panel.
    #[must_use]
    pub const fn panel(&self) -> Option<Panel> {
        self.panel
    }

    /// Cached value of the sell area.
    #[must_use]
    pub const fn sell_total(&self) -> u64 {
        self.sell_total
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Picks up from a slot.
    ///
    /// # Errors
    ///
    /// See [`TransferCoordinator::pick_up`].
    pub fn pick_up(&mut self, slot: SlotRef, mode: PickMode) -> EconomyResult<StackView> {
        let held = self.transfers.pick_up(&mut self.holdings, slot, mode)?;
        self.flush_slot_events();
        self.publish(SessionEvent::TransferStarted { held, origin: slot });
        Ok(held)
    }

    /// Drops the held stack on a slot.
    ///
    /// # Errors
    ///
    /// `NoTransferInFlight` if nothing is held.
    pub fn drop_on(&mut self, target: SlotRef) -> EconomyResult<DropOutcome> {
        let outcome = self.transfers.drop_on(&mut self.holdings, target)?;
        self.flush_slot_events();
        self.publish(SessionEvent::TransferDropped(outcome));
        Ok(outcome)
    }

    /// Returns the held stack to where it came from.
    ///
    /// # Errors
    ///
    /// `NoTransferInFlight` if nothing is held.
    pub fn cancel_transfer(&mut self) -> EconomyResult<Settlement> {
        let settlement = self.transfers.cancel(&mut self.holdings)?;
        self.flush_slot_events();
        self.publish(SessionEvent::TransferReconciled(vec![settlement]));
        Ok(settlement)
    }

    /// Moves a slot's stack into another container.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid container or slot.
    pub fn quick_move(&mut self, from: SlotRef, to: ContainerId) -> EconomyResult<bool> {
        let moved = self.transfers.quick_move(&mut self.holdings, from, to)?;
        self.flush_slot_events();
        Ok(moved)
    }

    /// Moves a slot's stack onto the hotbar.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid slot.
    pub fn quick_move_to_hotbar(&mut self, from: SlotRef) -> EconomyResult<bool> {
        self.quick_move(from, self.hotbar)
    }

    // =========================================================================
    // Panels & Layout
    // =========================================================================

    /// Opens `panel`, or closes it if it is already open.
    ///
    /// Any other panel closes. Whenever a panel closes, the held stack and
    /// every parked stack are returned to holdings.
    pub fn toggle_panel(&mut self, panel: Panel) -> Option<Panel> {
        let previous = self.panel;
        self.panel = if previous == Some(panel) { None } else { Some(panel) };

        if previous.is_some() {
            self.reconcile_all();
        }
        debug!(?previous, now = ?self.panel, "Panel toggled");
        self.publish(SessionEvent::PanelChanged(self.panel));
        self.panel
    }

    /// Closes whatever panel is open.
    pub fn close_panels(&mut self) {
        if let Some(panel) = self.panel {
            self.toggle_panel(panel);
        }
    }

    /// Rebuilds the hotbar with `columns` slots (at least one).
    ///
    /// Stacks that no longer fit move elsewhere, or are parked when holdings
    /// are full.
    ///
    /// # Errors
    ///
    /// Propagates container lookup failures.
    pub fn set_hotbar_columns(&mut self, columns: usize) -> EconomyResult<Vec<Settlement>> {
        let columns = columns.max(1);
        let settled = self
            .transfers
            .rebuild_container(&mut self.holdings, self.hotbar, columns)?;
        if settled.iter().any(|s| matches!(s, Settlement::Stranded { .. })) {
            warn!(columns, "Hotbar rebuild left stacks parked");
        }
        self.flush_slot_events();
        if !settled.is_empty() {
            self.publish(SessionEvent::TransferReconciled(settled.clone()));
        }
        Ok(settled)
    }

    /// Adds units to the inventory, overflowing into the hotbar.
    ///
    /// Held and parked stacks are returned first so no origin slot is
    /// taken while its stack is away. Returns the quantity that fit nowhere.
    pub fn add_item_with_overflow(&mut self, item_id: ItemId, quantity: u32) -> u32 {
        self.reconcile_all();
        let remainder = allocation::fill_chain(
            &mut self.holdings,
            &[self.inventory, self.hotbar],
            &self.catalog,
            item_id,
            quantity,
        );
        self.flush_slot_events();
        if remainder > 0 {
            warn!(item_id, remainder, "Could not place all items");
            self.publish(SessionEvent::Unplaced {
                item_id,
                quantity: remainder,
            });
        }
        remainder
    }

    // =========================================================================
    // Quantity
    // =========================================================================

    /// Sets the requested quantity of a panel. `None` for the inventory.
    pub fn set_quantity(&mut self, panel: Panel, value: u32) -> Option<u32> {
        let quantity = self.selector_mut(panel)?.set(value);
        self.publish(SessionEvent::QuantityChanged { panel, quantity });
        Some(quantity)
    }

    /// Adds a signed delta to the requested quantity of a panel.
    pub fn change_quantity(&mut self, panel: Panel, delta: i32) -> Option<u32> {
        let quantity = self.selector_mut(panel)?.change(delta);
        self.publish(SessionEvent::QuantityChanged { panel, quantity });
        Some(quantity)
    }

    /// One tap of a +/- button.
    pub fn tap_quantity(&mut self, panel: Panel, step: Step) -> Option<u32> {
        let amount = self.steps.tap_step();
        self.change_quantity(panel, signed(amount, step))
    }

    /// One repeat while a +/- button is held.
    pub fn hold_quantity(&mut self, panel: Panel, step: Step) -> Option<u32> {
        let amount = self.steps.hold_tick_step();
        self.change_quantity(panel, signed(amount, step))
    }

    fn selector_mut(&mut self, panel: Panel) -> Option<&mut QuantitySelector> {
        match panel {
            Panel::Crafting => Some(self.crafting.quantity_mut()),
            Panel::Shop => Some(self.shop.quantity_mut()),
            Panel::Inventory => None,
        }
    }

    // =========================================================================
    // Crafting
    // =========================================================================

    /// Every recipe for the list, in configuration order.
    #[must_use]
    pub fn recipe_rows(&self) -> Vec<RecipeRow> {
        self.recipes
            .iter()
            .map(|recipe| RecipeRow {
                id: recipe.id,
                name: recipe.display_name(&self.catalog).to_owned(),
                icon: recipe.display_icon(&self.catalog).map(str::to_owned),
            })
            .collect()
    }

    /// Selects a recipe and resets its quantity to 1.
    ///
    /// # Errors
    ///
    /// `RecipeNotFound` for an unknown recipe.
    pub fn select_recipe(&mut self, id: RecipeId) -> EconomyResult<()> {
        self.crafting.select_recipe(&self.recipes, id)?;
        self.publish(SessionEvent::RecipeSelected(id));
        self.publish(SessionEvent::QuantityChanged {
            panel: Panel::Crafting,
            quantity: self.crafting.quantity(),
        });
        Ok(())
    }

    /// Crafts the selected recipe. Held and parked stacks are returned first.
    pub fn craft(&mut self) -> CraftOutcome {
        self.reconcile_all();
        let outcome = self.crafting.craft(&self.recipes, &self.catalog, &mut self.holdings);
        self.flush_slot_events();
        match &outcome {
            CraftOutcome::Crafted(report) => self.publish(SessionEvent::Crafted(report.clone())),
            CraftOutcome::Aborted(reason) => self.publish(SessionEvent::CraftAborted(*reason)),
        }
        outcome
    }

    // =========================================================================
    // Shop
    // =========================================================================

    /// Every catalog item with its buy price.
    #[must_use]
    pub fn shop_listing(&self) -> Vec<ShopListing> {
        self.shop.listing(&self.catalog)
    }

    /// Selects an item to buy and resets its quantity to 1.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` for an unknown item.
    pub fn select_shop_item(&mut self, item_id: ItemId) -> EconomyResult<()> {
        self.shop.select_item(&self.catalog, item_id)?;
        self.publish(SessionEvent::ShopItemSelected(item_id));
        self.publish(SessionEvent::QuantityChanged {
            panel: Panel::Shop,
            quantity: self.shop.quantity(),
        });
        Ok(())
    }

    /// Buys the selected item. Held and parked stacks are returned first.
    pub fn buy(&mut self) -> BuyOutcome {
        self.reconcile_all();
        let outcome = self.shop.buy(&self.catalog, &mut self.holdings, &mut self.wallet);
        self.flush_slot_events();
        match outcome {
            BuyOutcome::Bought(report) => {
                self.publish(SessionEvent::Bought(report));
                self.publish(SessionEvent::BalanceChanged(self.wallet.balance()));
            }
            BuyOutcome::Aborted(reason) => self.publish(SessionEvent::BuyAborted(reason)),
        }
        outcome
    }

    /// Sells everything in the sell area.
    ///
    /// # Errors
    ///
    /// Propagates container lookup failures.
    pub fn sell(&mut self) -> EconomyResult<SellReport> {
        let report = self.shop.sell(&self.catalog, &mut self.holdings, &mut self.wallet)?;
        self.flush_slot_events();
        if report.units > 0 {
            self.publish(SessionEvent::Sold(report));
            self.publish(SessionEvent::BalanceChanged(self.wallet.balance()));
        }
        Ok(report)
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Snapshot of one container.
    ///
    /// # Errors
    ///
    /// `ContainerNotFound` for a foreign id.
    pub fn container_view(&self, id: ContainerId) -> EconomyResult<ContainerView> {
        self.holdings.container(id).map(ContainerView::of)
    }

    /// Snapshot of the whole session.
    ///
    /// # Errors
    ///
    /// Propagates container lookup failures.
    pub fn view(&self) -> EconomyResult<SessionView> {
        Ok(SessionView {
            panel: self.panel,
            inventory: self.container_view(self.inventory)?,
            hotbar: self.container_view(self.hotbar)?,
            sell: self.container_view(self.sell)?,
            held: self.transfers.held().map(|h| h.stack().view()),
            parked: self.transfers.parked().iter().map(|h| h.stack().view()).collect(),
            balance: self.wallet.balance(),
            crafting: CraftingView {
                selected: self.crafting.selected(),
                quantity: self.crafting.quantity(),
                requirements: self.crafting.requirements(&self.recipes, &self.holdings),
                feasible: self.crafting.is_feasible(&self.recipes, &self.holdings),
                max_crafts: self
                    .crafting
                    .max_crafts_by_ingredients(&self.recipes, &self.holdings),
            },
            shop: ShopView {
                selected: self.shop.selected(),
                quantity: self.shop.quantity(),
                quote: self.shop.quote(&self.catalog, &self.wallet),
                sell_total: self.sell_total,
            },
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn reconcile_all(&mut self) {
        let settled = self.transfers.cancel_all(&mut self.holdings);
        self.flush_slot_events();
        if !settled.is_empty() {
            self.publish(SessionEvent::TransferReconciled(settled));
        }
    }

    /// Forwards container notifications and refreshes the sell total.
    fn flush_slot_events(&mut self) {
        let mut sell_dirty = false;
        for feed in &self.slot_feeds {
            for event in feed.try_iter() {
                let event = match event {
                    SlotEvent::Changed { slot, contents } => {
                        sell_dirty |= slot.container == self.sell;
                        SessionEvent::SlotChanged { slot, contents }
                    }
                    SlotEvent::Rebuilt {
                        container,
                        slot_count,
                    } => {
                        sell_dirty |= container == self.sell;
                        SessionEvent::ContainerRebuilt {
                            container,
                            slot_count,
                        }
                    }
                };
                self.bus.publish(&event);
            }
        }

        if sell_dirty {
            let total = self.shop.sell_total(&self.catalog, &self.holdings);
            if total != self.sell_total {
                self.sell_total = total;
                self.publish(SessionEvent::SellTotalChanged(total));
            }
        }
    }

    fn publish(&mut self, event: SessionEvent) {
        self.bus.publish(&event);
    }
}

fn signed(amount: u32, step: Step) -> i32 {
    let amount = i32::try_from(amount).unwrap_or(i32::MAX);
    match step {
        Step::Up => amount,
        Step::Down => -amount,
    }
}
