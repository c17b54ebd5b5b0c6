//! Read-only snapshots for a renderer.
//!
//! Views are plain data copied out of the session; holding one never blocks
//! a command.

use satchel_economy::{BuyQuote, Container, ContainerId, ItemId, RecipeId, Requirement, StackView};

use crate::session::Panel;

/// Copy of one container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerView {
    /// Container id.
    pub id: ContainerId,
    /// Label.
    pub label: String,
    /// Contents of every slot, in order.
    pub slots: Vec<Option<StackView>>,
}

impl ContainerView {
    pub(crate) fn of(container: &Container) -> Self {
        Self {
            id: container.id(),
            label: container.label().to_owned(),
            slots: container.snapshot(),
        }
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// One entry of the recipe list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeRow {
    /// Recipe id.
    pub id: RecipeId,
    /// Display name.
    pub name: String,
    /// Display icon key.
    pub icon: Option<String>,
}

/// State of the crafting panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CraftingView {
    /// Selected recipe.
    pub selected: Option<RecipeId>,
    /// Requested quantity.
    pub quantity: u32,
    /// Ingredient rows for the selected recipe.
    pub requirements: Vec<Requirement>,
    /// Whether the craft button is enabled.
    pub feasible: bool,
    /// Crafts the ingredients allow.
    pub max_crafts: u32,
}

/// State of the shop panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopView {
    /// Selected item.
    pub selected: Option<ItemId>,
    /// Requested quantity.
    pub quantity: u32,
    /// Price preview.
    pub quote: Option<BuyQuote>,
    /// Value of the sell container.
    pub sell_total: u64,
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionView {
    /// Open panel.
    pub panel: Option<Panel>,
    /// Main inventory.
    pub inventory: ContainerView,
    /// Hotbar.
    pub hotbar: ContainerView,
    /// Sell area.
    pub sell: ContainerView,
    /// Stack following the pointer.
    pub held: Option<StackView>,
    /// Stacks waiting for room.
    pub parked: Vec<StackView>,
    /// Wallet balance.
    pub balance: u64,
    /// Crafting panel.
    pub crafting: CraftingView,
    /// Shop panel.
    pub shop: ShopView,
}
