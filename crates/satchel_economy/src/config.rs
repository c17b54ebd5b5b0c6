//! # Economy Configuration
//!
//! Everything is loaded once from TOML before the first operation:
//!
//! ```toml
//! [layout]
//! inventory_rows = 4
//! inventory_columns = 6
//! hotbar_columns = 8
//! sell_slots = 4
//!
//! [wallet]
//! starting_balance = 100
//!
//! [[item]]
//! id = 1
//! name = "Log"
//! max_stack = 20
//! buy_price = 4
//!
//! [[recipe]]
//! id = 1
//! result = 2
//! ingredients = [{ item_id = 1, count = 1 }]
//!
//! [[shop]]
//! item_id = 1
//! price = 5
//! ```
//!
//! Every section is optional.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::catalog::{ItemCatalog, ItemDefinition, RecipeBook, RecipeDefinition};
use crate::error::{EconomyError, EconomyResult};
use crate::quantity::QuantitySteps;
use crate::shop::{ShopCatalog, ShopEntry};

/// Container dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Rows of the main inventory grid.
    pub inventory_rows: usize,
    /// Columns of the main inventory grid.
    pub inventory_columns: usize,
    /// Hotbar slots.
    pub hotbar_columns: usize,
    /// Slots in the shop's sell area.
    pub sell_slots: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            inventory_rows: 4,
            inventory_columns: 6,
            hotbar_columns: 8,
            sell_slots: 4,
        }
    }
}

impl LayoutConfig {
    /// Slots in the main inventory.
    #[must_use]
    pub const fn inventory_slots(&self) -> usize {
        self.inventory_rows * self.inventory_columns
    }

    fn normalized(mut self) -> Self {
        for (name, value) in [
            ("inventory_rows", &mut self.inventory_rows),
            ("inventory_columns", &mut self.inventory_columns),
            ("hotbar_columns", &mut self.hotbar_columns),
            ("sell_slots", &mut self.sell_slots),
        ] {
            if *value == 0 {
                warn!(field = name, "layout dimension of 0 raised to 1");
                *value = 1;
            }
        }
        self
    }
}

/// Wallet settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Balance at session start.
    pub starting_balance: u64,
}

/// Root of the configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Container dimensions.
    pub layout: LayoutConfig,
    /// Quantity button steps.
    pub quantity: QuantitySteps,
    /// Wallet settings.
    pub wallet: WalletConfig,
    /// Item definitions.
    #[serde(rename = "item")]
    pub items: Vec<ItemDefinition>,
    /// Recipe definitions.
    #[serde(rename = "recipe")]
    pub recipes: Vec<RecipeDefinition>,
    /// Shop price overrides.
    #[serde(rename = "shop")]
    pub shop: Vec<ShopEntry>,
}

impl EconomyConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigParse` for malformed TOML.
    pub fn from_toml_str(text: &str) -> EconomyResult<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| EconomyError::ConfigParse(e.to_string()))?;
        config.layout = config.layout.normalized();
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigIo` if the file cannot be read, or
    /// `EconomyError::ConfigParse` for malformed TOML.
    pub fn from_path(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EconomyError::ConfigIo(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Builds the item catalog.
    #[must_use]
    pub fn build_catalog(&self) -> ItemCatalog {
        ItemCatalog::from_definitions(self.items.iter().cloned())
    }

    /// Builds the recipe book.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` for a recipe with too many ingredients.
    pub fn build_recipes(&self) -> EconomyResult<RecipeBook> {
        RecipeBook::from_definitions(self.recipes.iter().cloned())
    }

    /// Builds the shop price table.
    #[must_use]
    pub fn build_shop_catalog(&self) -> ShopCatalog {
        ShopCatalog::from_entries(self.shop.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemKind;

    const SAMPLE: &str = r#"
        [layout]
        inventory_rows = 2
        inventory_columns = 0

        [quantity]
        hold_step_per_sec = 30.0

        [wallet]
        starting_balance = 250

        [[item]]
        id = 1
        name = "Log"
        max_stack = 20
        buy_price = 4

        [[item]]
        id = 2
        name = "Helmet"
        max_stack = 1
        kind = "gear_slot1"
        buy_price = 90
        sell_price = 30

        [[recipe]]
        id = 7
        result = 2
        name_override = "Wooden Helmet"
        ingredients = [{ item_id = 1, count = 6 }]

        [[shop]]
        item_id = 2
        price = 80
        available = false
    "#;

    #[test]
    fn test_parse_full_document() {
        let config = EconomyConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.layout.inventory_rows, 2);
        assert_eq!(config.layout.inventory_columns, 1);
        assert_eq!(config.layout.hotbar_columns, 8);
        assert_eq!(config.quantity.hold_tick_step(), 3);
        assert_eq!(config.wallet.starting_balance, 250);

        let catalog = config.build_catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(2).unwrap().kind, ItemKind::GearSlot1);
        assert_eq!(catalog.get(1).unwrap().effective_sell_price(), 2);

        let book = config.build_recipes().unwrap();
        assert_eq!(book.get(7).unwrap().display_name(&catalog), "Wooden Helmet");

        let shop = config.build_shop_catalog();
        assert!(!shop.is_available(2));
        assert_eq!(shop.buy_price(&catalog, 2), 80);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EconomyConfig::from_toml_str("").unwrap();

        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.layout.inventory_slots(), 24);
        assert!(config.items.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            EconomyConfig::from_toml_str("[[item]]\nid = \"one\""),
            Err(EconomyError::ConfigParse(_))
        ));
        assert!(matches!(
            EconomyConfig::from_path("/nonexistent/satchel.toml"),
            Err(EconomyError::ConfigIo(_))
        ));
    }
}
