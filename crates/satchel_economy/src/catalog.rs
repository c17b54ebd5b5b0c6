//! # Item & Recipe Catalog
//!
//! Read-only tables built once from configuration. Lookups never mutate.
//!
//! Duplicate ids are a configuration warning, not an error: the first
//! definition wins and later ones are ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EconomyError, EconomyResult};

/// Unique identifier for an item type.
pub type ItemId = u32;

/// Unique identifier for a recipe.
pub type RecipeId = u32;

/// Item id reserved for "no item".
pub const EMPTY_ITEM: ItemId = 0;

/// Maximum number of ingredients a recipe may list.
pub const MAX_INGREDIENTS: usize = 3;

/// Equipment category of an item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Not equippable.
    #[default]
    General,
    /// Equips into gear slot 1.
    GearSlot1,
    /// Equips into gear slot 2.
    GearSlot2,
    /// Equips into gear slot 3.
    GearSlot3,
    /// Equips into gear slot 4.
    GearSlot4,
}

/// An item definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Maximum stack size for this item type.
    pub max_stack: u32,
    /// Equipment category.
    #[serde(default)]
    pub kind: ItemKind,
    /// Unit price when bought from the shop.
    #[serde(default)]
    pub buy_price: u64,
    /// Unit price when sold to the shop. Zero means "derive from buy price".
    #[serde(default)]
    pub sell_price: u64,
    /// Icon key for the renderer.
    #[serde(default)]
    pub icon: Option<String>,
}

impl ItemDefinition {
    /// Creates a new item definition with no prices.
    #[must_use]
    pub fn new(id: ItemId, name: impl Into<String>, max_stack: u32) -> Self {
        Self {
            id,
            name: name.into(),
            max_stack,
            kind: ItemKind::General,
            buy_price: 0,
            sell_price: 0,
            icon: None,
        }
    }

    /// Sets buy and sell prices.
    #[must_use]
    pub const fn with_prices(mut self, buy_price: u64, sell_price: u64) -> Self {
        self.buy_price = buy_price;
        self.sell_price = sell_price;
        self
    }

    /// Sets the equipment category.
    #[must_use]
    pub const fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }

    /// Stack size, never below 1.
    #[inline]
    #[must_use]
    pub fn stack_limit(&self) -> u32 {
        self.max_stack.max(1)
    }

    /// Price paid per unit on sale.
    ///
    /// Falls back to half the buy price (rounded up) when no sell price is set.
    #[must_use]
    pub fn effective_sell_price(&self) -> u64 {
        if self.sell_price == 0 && self.buy_price > 0 {
            self.buy_price.div_ceil(2)
        } else {
            self.sell_price
        }
    }
}

/// Immutable item table indexed by id.
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    /// Definitions in configuration order.
    items: Vec<ItemDefinition>,
    /// Id -> position in `items`.
    by_id: HashMap<ItemId, usize>,
}

impl ItemCatalog {
    /// Builds the catalog. Duplicates and the reserved id 0 are skipped with a warning.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = ItemDefinition>) -> Self {
        let mut catalog = Self::default();

        for mut def in definitions {
            if def.id == EMPTY_ITEM {
                tracing::warn!(name = %def.name, "item id 0 is reserved, skipping definition");
                continue;
            }
            if catalog.by_id.contains_key(&def.id) {
                tracing::warn!(id = def.id, name = %def.name, "duplicate item id, keeping first");
                continue;
            }
            if def.max_stack == 0 {
                tracing::warn!(id = def.id, "max_stack of 0 raised to 1");
                def.max_stack = 1;
            }
            catalog.by_id.insert(def.id, catalog.items.len());
            catalog.items.push(def);
        }

        catalog
    }

    /// Finds an item definition by id.
    #[inline]
    #[must_use]
    pub fn lookup(&self, id: ItemId) -> Option<&ItemDefinition> {
        self.by_id.get(&id).map(|&idx| &self.items[idx])
    }

    /// Finds an item definition by id.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ItemNotFound` if the id is unknown.
    pub fn get(&self, id: ItemId) -> EconomyResult<&ItemDefinition> {
        self.lookup(id).ok_or(EconomyError::ItemNotFound(id))
    }

    /// All definitions in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.iter()
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no items are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One ingredient pair of a recipe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Item consumed. 0 marks an unused ingredient.
    pub item_id: ItemId,
    /// Units consumed per craft. 0 marks an unused ingredient.
    pub count: u32,
}

impl Ingredient {
    /// Creates a new ingredient pair.
    #[inline]
    #[must_use]
    pub const fn new(item_id: ItemId, count: u32) -> Self {
        Self { item_id, count }
    }

    /// Inactive ingredients are skipped everywhere.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.item_id != EMPTY_ITEM && self.count > 0
    }
}

/// A crafting recipe: up to three ingredients into one result item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    /// Unique recipe identifier.
    pub id: RecipeId,
    /// Item produced, one unit per craft.
    pub result: ItemId,
    /// Display name shown instead of the result item's name.
    #[serde(default)]
    pub name_override: Option<String>,
    /// Icon shown instead of the result item's icon.
    #[serde(default)]
    pub icon_override: Option<String>,
    /// Ingredient pairs.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl RecipeDefinition {
    /// Creates a recipe.
    #[must_use]
    pub fn new(id: RecipeId, result: ItemId, ingredients: Vec<Ingredient>) -> Self {
        Self {
            id,
            result,
            name_override: None,
            icon_override: None,
            ingredients,
        }
    }

    /// Sets the display name override.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    /// Ingredients that take part in crafting.
    pub fn active_ingredients(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.iter().filter(|i| i.is_active())
    }

    /// Returns true if at least one ingredient is active.
    #[must_use]
    pub fn has_active_ingredients(&self) -> bool {
        self.active_ingredients().next().is_some()
    }

    /// Name to display: override, then the result item's name, then a dash.
    #[must_use]
    pub fn display_name<'a>(&'a self, catalog: &'a ItemCatalog) -> &'a str {
        match (&self.name_override, catalog.lookup(self.result)) {
            (Some(name), _) if !name.is_empty() => name.as_str(),
            (_, Some(item)) => item.name.as_str(),
            _ => "—",
        }
    }

    /// Icon to display: override, then the result item's icon.
    #[must_use]
    pub fn display_icon<'a>(&'a self, catalog: &'a ItemCatalog) -> Option<&'a str> {
        self.icon_override
            .as_deref()
            .or_else(|| catalog.lookup(self.result).and_then(|i| i.icon.as_deref()))
    }
}

/// Immutable recipe table indexed by id.
#[derive(Clone, Debug, Default)]
pub struct RecipeBook {
    /// Recipes in configuration order.
    recipes: Vec<RecipeDefinition>,
    /// Id -> position in `recipes`.
    by_id: HashMap<RecipeId, usize>,
}

impl RecipeBook {
    /// Builds the recipe book.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if a recipe lists more than
    /// [`MAX_INGREDIENTS`] ingredients.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = RecipeDefinition>,
    ) -> EconomyResult<Self> {
        let mut book = Self::default();

        for recipe in definitions {
            if recipe.ingredients.len() > MAX_INGREDIENTS {
                return Err(EconomyError::InvalidConfig(format!(
                    "recipe {} lists {} ingredients, at most {} allowed",
                    recipe.id,
                    recipe.ingredients.len(),
                    MAX_INGREDIENTS
                )));
            }
            if book.by_id.contains_key(&recipe.id) {
                tracing::warn!(id = recipe.id, "duplicate recipe id, keeping first");
                continue;
            }
            book.by_id.insert(recipe.id, book.recipes.len());
            book.recipes.push(recipe);
        }

        Ok(book)
    }

    /// Finds a recipe by id.
    #[inline]
    #[must_use]
    pub fn lookup(&self, id: RecipeId) -> Option<&RecipeDefinition> {
        self.by_id.get(&id).map(|&idx| &self.recipes[idx])
    }

    /// Finds a recipe by id.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::RecipeNotFound` if the id is unknown.
    pub fn get(&self, id: RecipeId) -> EconomyResult<&RecipeDefinition> {
        self.lookup(id).ok_or(EconomyError::RecipeNotFound(id))
    }

    /// All recipes in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &RecipeDefinition> {
        self.recipes.iter()
    }

    /// Number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Returns true if the book has no recipes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_item_keeps_first() {
        let catalog = ItemCatalog::from_definitions(vec![
            ItemDefinition::new(1, "Stone", 10),
            ItemDefinition::new(1, "Other Stone", 50),
            ItemDefinition::new(2, "Wood", 20),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup(1).map(|i| i.name.as_str()), Some("Stone"));
        assert_eq!(catalog.lookup(1).map(|i| i.max_stack), Some(10));
    }

    #[test]
    fn test_reserved_and_zero_stack() {
        let catalog = ItemCatalog::from_definitions(vec![
            ItemDefinition::new(0, "Nothing", 10),
            ItemDefinition::new(3, "Relic", 0),
        ]);

        assert!(catalog.lookup(0).is_none());
        assert_eq!(catalog.get(3).map(ItemDefinition::stack_limit), Ok(1));
        assert_eq!(catalog.get(9), Err(EconomyError::ItemNotFound(9)));
    }

    #[test]
    fn test_sell_price_fallback() {
        let derived = ItemDefinition::new(1, "Gem", 5).with_prices(7, 0);
        assert_eq!(derived.effective_sell_price(), 4);

        let explicit = ItemDefinition::new(2, "Ore", 5).with_prices(7, 2);
        assert_eq!(explicit.effective_sell_price(), 2);

        let free = ItemDefinition::new(3, "Dirt", 5);
        assert_eq!(free.effective_sell_price(), 0);
    }

    #[test]
    fn test_inactive_ingredients_skipped() {
        let recipe = RecipeDefinition::new(
            1,
            10,
            vec![
                Ingredient::new(1, 2),
                Ingredient::new(0, 5),
                Ingredient::new(3, 0),
            ],
        );

        let active: Vec<_> = recipe.active_ingredients().copied().collect();
        assert_eq!(active, vec![Ingredient::new(1, 2)]);
        assert!(recipe.has_active_ingredients());
    }

    #[test]
    fn test_recipe_book_rejects_four_ingredients() {
        let recipe = RecipeDefinition::new(
            1,
            10,
            vec![Ingredient::new(1, 1); 4],
        );
        let result = RecipeBook::from_definitions(vec![recipe]);
        assert!(matches!(result, Err(EconomyError::InvalidConfig(_))));
    }

    #[test]
    fn test_display_name_resolution() {
        let catalog = ItemCatalog::from_definitions(vec![ItemDefinition::new(10, "Potion", 5)]);

        let plain = RecipeDefinition::new(1, 10, vec![]);
        assert_eq!(plain.display_name(&catalog), "Potion");

        let named = RecipeDefinition::new(2, 10, vec![]).with_name("Strong Potion");
        assert_eq!(named.display_name(&catalog), "Strong Potion");

        let orphan = RecipeDefinition::new(3, 99, vec![]);
        assert_eq!(orphan.display_name(&catalog), "—");
    }
}
