//! # Shop & Wallet
//!
//! Buying places units first and charges only for what was placed. Selling
//! removes every stack from the sell container, then credits the total.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::allocation;
use crate::catalog::{ItemCatalog, ItemId};
use crate::error::EconomyResult;
use crate::inventory::{ContainerId, Holdings};
use crate::quantity::QuantitySelector;

/// Currency holder used by the shop.
pub trait Wallet {
    /// Current balance.
    fn balance(&self) -> u64;

    /// Deducts `amount`. Returns false, leaving the balance unchanged, when
    /// funds are insufficient. Zero always succeeds.
    fn try_spend(&mut self, amount: u64) -> bool;

    /// Credits `amount`.
    fn add(&mut self, amount: u64);
}

/// The player's purse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerWallet {
    balance: u64,
}

impl PlayerWallet {
    /// Creates a wallet with a starting balance.
    #[must_use]
    pub const fn new(balance: u64) -> Self {
        Self { balance }
    }
}

impl Wallet for PlayerWallet {
    fn balance(&self) -> u64 {
        self.balance
    }

    fn try_spend(&mut self, amount: u64) -> bool {
        if amount == 0 {
            return true;
        }
        if self.balance < amount {
            return false;
        }
        self.balance -= amount;
        true
    }

    fn add(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }
}

fn default_available() -> bool {
    true
}

/// Price override for one item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopEntry {
    /// Item sold.
    pub item_id: ItemId,
    /// Unit price.
    pub price: u64,
    /// Whether the item can be bought.
    #[serde(default = "default_available")]
    pub available: bool,
}

/// Shop price overrides keyed by item.
#[derive(Clone, Debug, Default)]
pub struct ShopCatalog {
    entries: HashMap<ItemId, ShopEntry>,
}

impl ShopCatalog {
    /// Builds the table. Duplicate items keep the first entry.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = ShopEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            if catalog.entries.contains_key(&entry.item_id) {
                warn!(item_id = entry.item_id, "duplicate shop entry, keeping first");
                continue;
            }
            catalog.entries.insert(entry.item_id, entry);
        }
        catalog
    }

    /// Entry for an item.
    #[must_use]
    pub fn entry(&self, item_id: ItemId) -> Option<&ShopEntry> {
        self.entries.get(&item_id)
    }

    /// Unit buy price: the entry's price, else the item's own buy price.
    #[must_use]
    pub fn buy_price(&self, catalog: &ItemCatalog, item_id: ItemId) -> u64 {
        match self.entry(item_id) {
            Some(entry) => entry.price,
            None => catalog.lookup(item_id).map_or(0, |def| def.buy_price),
        }
    }

    /// Returns false only for entries marked unavailable.
    #[must_use]
    pub fn is_available(&self, item_id: ItemId) -> bool {
        self.entry(item_id).map_or(true, |e| e.available)
    }
}

/// One row of the buy listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopListing {
    /// Item id.
    pub item_id: ItemId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: u64,
    /// Whether it can be bought.
    pub available: bool,
}

/// Price preview for the selected item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuyQuote {
    /// Selected item.
    pub item_id: ItemId,
    /// Unit price.
    pub price_each: u64,
    /// `price_each * quantity`.
    pub total: u64,
    /// Whether the wallet covers `total`.
    pub affordable: bool,
}

/// Summary of a completed purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuyReport {
    /// Item bought.
    pub item_id: ItemId,
    /// Quantity asked for.
    pub requested: u32,
    /// Units placed and paid for.
    pub placed: u32,
    /// Unit price.
    pub price_each: u64,
    /// Amount charged.
    pub cost: u64,
}

/// Why a purchase did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuyAbort {
    /// No item selected.
    NoItemSelected,
    /// The entry is marked unavailable.
    Unavailable,
    /// The item has no price.
    NotForSale,
    /// The wallet cannot pay for a single unit.
    InsufficientFunds,
    /// No destination slot could take a single unit.
    NoSpace,
    /// The wallet refused the charge; placed units were removed again.
    PaymentRefused,
}

/// Result of [`Shop::buy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuyOutcome {
    /// At least one unit was bought.
    Bought(BuyReport),
    /// Nothing changed.
    Aborted(BuyAbort),
}

/// Summary of a sale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SellReport {
    /// Units removed.
    pub units: u64,
    /// Amount credited.
    pub total: u64,
}

/// Buy and sell state.
#[derive(Clone, Debug)]
pub struct Shop {
    catalog: ShopCatalog,
    selected: Option<ItemId>,
    quantity: QuantitySelector,
    destinations: Vec<ContainerId>,
    sell_container: ContainerId,
}

impl Shop {
    /// Creates a shop placing purchases into `destinations` and buying back
    /// whatever sits in `sell_container`.
    #[must_use]
    pub fn new(catalog: ShopCatalog, destinations: Vec<ContainerId>, sell_container: ContainerId) -> Self {
        Self {
            catalog,
            selected: None,
            quantity: QuantitySelector::new(),
            destinations,
            sell_container,
        }
    }

    /// Price table.
    #[must_use]
    pub fn catalog(&self) -> &ShopCatalog {
        &self.catalog
    }

    /// Container emptied by [`Shop::sell`].
    #[must_use]
    pub const fn sell_container(&self) -> ContainerId {
        self.sell_container
    }

    /// Selected item.
    #[must_use]
    pub const fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    /// Requested quantity.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    /// Mutable access to the quantity selector.
    pub fn quantity_mut(&mut self) -> &mut QuantitySelector {
        &mut self.quantity
    }

    /// Every catalog item with its buy price, in catalog order.
    #[must_use]
    pub fn listing(&self, catalog: &ItemCatalog) -> Vec<ShopListing> {
        catalog
            .iter()
            .map(|def| ShopListing {
                item_id: def.id,
                name: def.name.clone(),
                price: self.catalog.buy_price(catalog, def.id),
                available: self.catalog.is_available(def.id),
            })
            .collect()
    }

    /// Selects an item to buy and resets the quantity to 1.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ItemNotFound` for an unknown item.
    pub fn select_item(&mut self, catalog: &ItemCatalog, item_id: ItemId) -> EconomyResult<()> {
        catalog.get(item_id)?;
        self.selected = Some(item_id);
        self.quantity.reset();
        Ok(())
    }

    /// Price preview for the current selection.
    #[must_use]
    pub fn quote(&self, catalog: &ItemCatalog, wallet: &dyn Wallet) -> Option<BuyQuote> {
        let item_id = self.selected?;
        let price_each = self.catalog.buy_price(catalog, item_id);
        let total = price_each.saturating_mul(u64::from(self.quantity.get()));
        Some(BuyQuote {
            item_id,
            price_each,
            total,
            affordable: wallet.balance() >= total,
        })
    }

    /// Buys up to the selected quantity.
    ///
    /// The quantity is capped by what the wallet can pay for. Units are placed
    /// first and only placed units are charged; if the charge is refused the
    /// placed units are removed again.
    pub fn buy(&self, catalog: &ItemCatalog, holdings: &mut Holdings, wallet: &mut dyn Wallet) -> BuyOutcome {
        let Some(item_id) = self.selected else {
            return BuyOutcome::Aborted(BuyAbort::NoItemSelected);
        };
        if !self.catalog.is_available(item_id) {
            return BuyOutcome::Aborted(BuyAbort::Unavailable);
        }
        let price_each = self.catalog.buy_price(catalog, item_id);
        if price_each == 0 {
            return BuyOutcome::Aborted(BuyAbort::NotForSale);
        }

        let requested = self.quantity.get();
        let affordable = u32::try_from(wallet.balance() / price_each).unwrap_or(u32::MAX);
        let to_buy = requested.min(affordable);
        if to_buy == 0 {
            warn!(item_id, price_each, balance = wallet.balance(), "Not enough money");
            return BuyOutcome::Aborted(BuyAbort::InsufficientFunds);
        }

        let remainder = allocation::fill_chain(holdings, &self.destinations, catalog, item_id, to_buy);
        let placed = to_buy - remainder;
        if placed == 0 {
            warn!(item_id, "No space for purchased items");
            return BuyOutcome::Aborted(BuyAbort::NoSpace);
        }

        let cost = price_each * u64::from(placed);
        if !wallet.try_spend(cost) {
            let left = allocation::drain_chain(holdings, &self.destinations, item_id, u64::from(placed));
            warn!(item_id, cost, rolled_back = u64::from(placed) - left, "Wallet refused charge");
            return BuyOutcome::Aborted(BuyAbort::PaymentRefused);
        }

        info!(item_id, placed, requested, cost, "Bought");
        BuyOutcome::Bought(BuyReport {
            item_id,
            requested,
            placed,
            price_each,
            cost,
        })
    }

    /// Value of everything in the sell container.
    #[must_use]
    pub fn sell_total(&self, catalog: &ItemCatalog, holdings: &Holdings) -> u64 {
        let Ok(container) = holdings.container(self.sell_container) else {
            return 0;
        };
        container
            .iter()
            .filter_map(|(_, stack)| stack)
            .map(|stack| {
                let each = catalog
                    .lookup(stack.item_id())
                    .map_or(0, |def| def.effective_sell_price());
                each.saturating_mul(u64::from(stack.count()))
            })
            .fold(0, u64::saturating_add)
    }

    /// Removes every stack from the sell container and credits its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the sell container does not exist.
    pub fn sell(&self, catalog: &ItemCatalog, holdings: &mut Holdings, wallet: &mut dyn Wallet) -> EconomyResult<SellReport> {
        let total = self.sell_total(catalog, holdings);
        let container = holdings.container_mut(self.sell_container)?;
        let lots: Vec<(ItemId, u64)> = container
            .iter()
            .filter_map(|(_, stack)| stack)
            .map(|stack| (stack.item_id(), u64::from(stack.count())))
            .collect();

        let mut units = 0;
        for (item_id, count) in lots {
            let missing = container.drain(item_id, count);
            if missing > 0 {
                error!(item_id, count, missing, "Sell area drained short");
            }
            units += count - missing;
        }

        if units == 0 {
            debug!("Nothing to sell");
            return Ok(SellReport::default());
        }
        wallet.add(total);
        info!(units, total, "Sold");
        Ok(SellReport { units, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemDefinition;

    const APPLE: ItemId = 1;
    const GEM: ItemId = 2;
    const ROCK: ItemId = 3;

    struct Fixture {
        catalog: ItemCatalog,
        holdings: Holdings,
        bag: ContainerId,
        sell: ContainerId,
        shop: Shop,
    }

    fn fixture(bag_slots: usize) -> Fixture {
        let catalog = ItemCatalog::from_definitions([
            ItemDefinition::new(APPLE, "Apple", 10).with_prices(3, 0),
            ItemDefinition::new(GEM, "Gem", 1).with_prices(100, 40),
            ItemDefinition::new(ROCK, "Rock", 10),
        ]);
        let mut holdings = Holdings::new();
        let bag = holdings.add_container("bag", bag_slots);
        let sell = holdings.add_container("sell", 4);
        let shop_catalog = ShopCatalog::from_entries([ShopEntry {
            item_id: GEM,
            price: 50,
            available: true,
        }]);
        let shop = Shop::new(shop_catalog, vec![bag], sell);
        Fixture {
            catalog,
            holdings,
            bag,
            sell,
            shop,
        }
    }

    /// Accepts nothing but zero.
    struct FrozenWallet(u64);

    impl Wallet for FrozenWallet {
        fn balance(&self) -> u64 {
            self.0
        }

        fn try_spend(&mut self, amount: u64) -> bool {
            amount == 0
        }

        fn add(&mut self, _amount: u64) {}
    }

    #[test]
    fn test_wallet_contract() {
        let mut wallet = PlayerWallet::new(10);

        assert!(wallet.try_spend(0));
        assert!(!wallet.try_spend(11));
        assert_eq!(wallet.balance(), 10);
        assert!(wallet.try_spend(4));
        wallet.add(5);
        assert_eq!(wallet.balance(), 11);
    }

    #[test]
    fn test_buy_price_prefers_entry() {
        let f = fixture(4);

        assert_eq!(f.shop.catalog().buy_price(&f.catalog, GEM), 50);
        assert_eq!(f.shop.catalog().buy_price(&f.catalog, APPLE), 3);
        assert_eq!(f.shop.listing(&f.catalog).len(), 3);
    }

    #[test]
    fn test_buy_caps_by_balance() {
        let mut f = fixture(4);
        let mut wallet = PlayerWallet::new(20);
        f.shop.select_item(&f.catalog, APPLE).unwrap();
        f.shop.quantity_mut().set(10);

        let quote = f.shop.quote(&f.catalog, &wallet).unwrap();
        assert_eq!(quote.total, 30);
        assert!(!quote.affordable);

        let outcome = f.shop.buy(&f.catalog, &mut f.holdings, &mut wallet);

        let BuyOutcome::Bought(report) = outcome else {
            panic!("purchase should succeed");
        };
        assert_eq!(report.placed, 6);
        assert_eq!(report.cost, 18);
        assert_eq!(wallet.balance(), 2);
        assert_eq!(f.holdings.total_item(APPLE), 6);
    }

    #[test]
    fn test_buy_charges_only_placed_units() {
        let mut f = fixture(2);
        let mut wallet = PlayerWallet::new(1000);
        f.shop.select_item(&f.catalog, GEM).unwrap();
        f.shop.quantity_mut().set(5);

        let outcome = f.shop.buy(&f.catalog, &mut f.holdings, &mut wallet);

        let BuyOutcome::Bought(report) = outcome else {
            panic!("purchase should succeed");
        };
        assert_eq!(report.placed, 2);
        assert_eq!(wallet.balance(), 900);
    }

    #[test]
    fn test_buy_aborts() {
        let mut f = fixture(1);
        let mut wallet = PlayerWallet::new(1);

        assert_eq!(
            f.shop.buy(&f.catalog, &mut f.holdings, &mut wallet),
            BuyOutcome::Aborted(BuyAbort::NoItemSelected)
        );

        f.shop.select_item(&f.catalog, ROCK).unwrap();
        assert_eq!(
            f.shop.buy(&f.catalog, &mut f.holdings, &mut wallet),
            BuyOutcome::Aborted(BuyAbort::NotForSale)
        );

        f.shop.select_item(&f.catalog, GEM).unwrap();
        assert_eq!(
            f.shop.buy(&f.catalog, &mut f.holdings, &mut wallet),
            BuyOutcome::Aborted(BuyAbort::InsufficientFunds)
        );

        assert!(f.shop.select_item(&f.catalog, 77).is_err());
    }

    #[test]
    fn test_buy_rolls_back_refused_payment() {
        let mut f = fixture(2);
        let mut wallet = FrozenWallet(500);
        f.shop.select_item(&f.catalog, APPLE).unwrap();
        f.shop.quantity_mut().set(4);

        assert_eq!(
            f.shop.buy(&f.catalog, &mut f.holdings, &mut wallet),
            BuyOutcome::Aborted(BuyAbort::PaymentRefused)
        );
        assert_eq!(f.holdings.total_item(APPLE), 0);
        assert_eq!(f.holdings.container(f.bag).unwrap().empty_slots(), 2);
    }

    #[test]
    fn test_sell_empties_container_and_credits() {
        let mut f = fixture(2);
        let mut wallet = PlayerWallet::new(0);
        allocation::fill_chain(&mut f.holdings, &[f.sell], &f.catalog, APPLE, 5);
        allocation::fill_chain(&mut f.holdings, &[f.sell], &f.catalog, GEM, 2);
        allocation::fill_chain(&mut f.holdings, &[f.sell], &f.catalog, ROCK, 3);

        // Apple 5 * ceil(3/2) + Gem 2 * 40 + Rock 0
        assert_eq!(f.shop.sell_total(&f.catalog, &f.holdings), 90);

        let report = f.shop.sell(&f.catalog, &mut f.holdings, &mut wallet).unwrap();

        assert_eq!(report, SellReport { units: 10, total: 90 });
        assert_eq!(wallet.balance(), 90);
        assert_eq!(f.holdings.container(f.sell).unwrap().empty_slots(), 4);
    }

    #[test]
    fn test_sell_drains_split_stacks_and_notifies() {
        use crate::inventory::{SlotEvent, SlotRef};

        let mut f = fixture(2);
        let mut wallet = PlayerWallet::new(0);
        allocation::fill_chain(&mut f.holdings, &[f.sell], &f.catalog, APPLE, 15);
        let feed = f.holdings.container_mut(f.sell).unwrap().subscribe();

        let report = f.shop.sell(&f.catalog, &mut f.holdings, &mut wallet).unwrap();

        assert_eq!(report, SellReport { units: 15, total: 30 });
        assert_eq!(f.holdings.total_item(APPLE), 0);
        let cleared: Vec<SlotRef> = feed
            .try_iter()
            .filter_map(|event| match event {
                SlotEvent::Changed { slot, contents: None } => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(cleared, vec![SlotRef::new(f.sell, 0), SlotRef::new(f.sell, 1)]);
    }
}
