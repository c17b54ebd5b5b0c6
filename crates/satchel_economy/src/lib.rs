//! # Satchel Economy
//!
//! Inventory, transfer and crafting logic with no UI dependencies.
//!
//! ## Design Principles
//!
//! 1. **Conservation** - Units enter holdings only through allocation and leave only through drain
//! 2. **Single ownership** - A stack lives in one slot or in the transfer coordinator, never both
//! 3. **Produce then consume** - Crafts and purchases pay only for what was placed
//! 4. **External configuration** - Items, recipes and prices come from TOML
//!
//! ## Example
//!
//! ```rust,ignore
//! use satchel_economy::{allocation, EconomyConfig, Holdings, PickMode, SlotRef, TransferCoordinator};
//!
//! let config = EconomyConfig::from_path("data/demo.toml")?;
//! let catalog = config.build_catalog();
//!
//! let mut holdings = Holdings::new();
//! let bag = holdings.add_container("inventory", 24);
//! let remainder = allocation::fill_chain(&mut holdings, &[bag], &catalog, LOG, 15);
//!
//! let mut transfers = TransferCoordinator::new();
//! transfers.pick_up(&mut holdings, SlotRef::new(bag, 0), PickMode::Half)?;
//! transfers.drop_on(&mut holdings, SlotRef::new(bag, 5))?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod allocation;
pub mod catalog;
pub mod config;
pub mod crafting;
pub mod error;
pub mod inventory;
pub mod quantity;
pub mod shop;
pub mod transfer;

pub use catalog::{
    Ingredient, ItemCatalog, ItemDefinition, ItemId, ItemKind, RecipeBook, RecipeDefinition, RecipeId,
    EMPTY_ITEM, MAX_INGREDIENTS,
};
pub use config::{EconomyConfig, LayoutConfig, WalletConfig};
pub use crafting::{Consumption, CraftAbort, CraftOutcome, CraftReport, CraftingResolver, Requirement};
pub use error::{EconomyError, EconomyResult};
pub use inventory::{Container, ContainerId, Holdings, ItemStack, SlotEvent, SlotRef, StackId, StackView};
pub use quantity::{QuantitySelector, QuantitySteps, MAX_QUANTITY, MIN_QUANTITY};
pub use shop::{
    BuyAbort, BuyOutcome, BuyQuote, BuyReport, PlayerWallet, SellReport, Shop, ShopCatalog, ShopEntry, ShopListing,
    Wallet,
};
pub use transfer::{DropOutcome, HeldStack, PickMode, Settlement, TransferCoordinator};
