//! # Crafting Resolver
//!
//! **Produce first, consume exactly what was produced.**
//!
//! A craft places result units into the destination containers before any
//! ingredient is touched. Ingredients are then drained for the number of
//! units actually placed, never for the number requested:
//!
//! 1. Nothing is consumed when nothing could be placed
//! 2. A partial placement consumes `per_craft * placed` of every ingredient
//! 3. A recipe with no active ingredients cannot be crafted
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut resolver = CraftingResolver::new(vec![bag, bar], vec![bag, bar]);
//! resolver.select_recipe(&book, PLANK_RECIPE)?;
//! resolver.quantity_mut().set(4);
//!
//! if let CraftOutcome::Crafted(report) = resolver.craft(&book, &catalog, &mut holdings) {
//!     assert_eq!(report.placed, 4);
//! }
//! ```

use tracing::{debug, error, info};

use crate::allocation;
use crate::catalog::{ItemCatalog, ItemId, RecipeBook, RecipeDefinition, RecipeId};
use crate::error::EconomyResult;
use crate::inventory::{ContainerId, Holdings};
use crate::quantity::QuantitySelector;

/// One ingredient row for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Requirement {
    /// Ingredient item.
    pub item_id: ItemId,
    /// Units per craft.
    pub per_craft: u32,
    /// Units needed for the selected quantity.
    pub need: u64,
    /// Units available in the source containers.
    pub have: u64,
    /// `have >= need`.
    pub enough: bool,
}

/// Units of one ingredient removed by a craft.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumption {
    /// Ingredient item.
    pub item_id: ItemId,
    /// Units removed.
    pub amount: u64,
}

/// Summary of a completed craft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CraftReport {
    /// Recipe crafted.
    pub recipe: RecipeId,
    /// Item produced.
    pub result: ItemId,
    /// Quantity the player asked for.
    pub requested: u32,
    /// Units actually placed.
    pub placed: u32,
    /// Ingredients removed.
    pub consumed: Vec<Consumption>,
    /// Units that should have been consumed but were missing. Always 0 unless
    /// holdings changed between the feasibility check and the drain.
    pub shortfall: u64,
}

impl CraftReport {
    /// Returns true if fewer units than requested were produced.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.placed < self.requested
    }
}

/// Why a craft did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CraftAbort {
    /// No recipe selected.
    NoRecipeSelected,
    /// The selected recipe is not in the book.
    RecipeNotFound,
    /// Not enough ingredients for the selected quantity.
    Infeasible,
    /// Ingredients cover zero crafts.
    NoIngredientCapacity,
    /// The recipe produces an item missing from the catalog.
    UnknownResultItem,
    /// No destination slot could take a single unit.
    NoSpace,
}

/// Result of [`CraftingResolver::craft`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CraftOutcome {
    /// At least one unit was produced.
    Crafted(CraftReport),
    /// Nothing changed.
    Aborted(CraftAbort),
}

impl CraftOutcome {
    /// Units produced.
    #[must_use]
    pub fn placed(&self) -> u32 {
        match self {
            Self::Crafted(report) => report.placed,
            Self::Aborted(_) => 0,
        }
    }
}

/// Computes holdings and runs crafts for the selected recipe.
#[derive(Clone, Debug)]
pub struct CraftingResolver {
    selected: Option<RecipeId>,
    quantity: QuantitySelector,
    sources: Vec<ContainerId>,
    destinations: Vec<ContainerId>,
}

impl CraftingResolver {
    /// Creates a resolver reading ingredients from `sources` and placing
    /// results into `destinations`, both in priority order.
    #[must_use]
    pub fn new(sources: Vec<ContainerId>, destinations: Vec<ContainerId>) -> Self {
        Self {
            selected: None,
            quantity: QuantitySelector::new(),
            sources,
            destinations,
        }
    }

    /// Selected recipe.
    #[must_use]
    pub const fn selected(&self) -> Option<RecipeId> {
        self.selected
    }

    /// Selects a recipe and resets the quantity to 1.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::RecipeNotFound` if the book lacks `id`.
    pub fn select_recipe(&mut self, book: &RecipeBook, id: RecipeId) -> EconomyResult<()> {
        book.get(id)?;
        self.selected = Some(id);
        self.quantity.reset();
        debug!(recipe = id, "Recipe selected");
        Ok(())
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.quantity.reset();
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

    /// Containers ingredients are read from.
    #[must_use]
    pub fn sources(&self) -> &[ContainerId] {
        &self.sources
    }

    /// Containers results are placed into.
    #[must_use]
    pub fn destinations(&self) -> &[ContainerId] {
        &self.destinations
    }

    /// Units of an item across the source containers. Always recomputed.
    #[must_use]
    pub fn compute_have(&self, holdings: &Holdings, item_id: ItemId) -> u64 {
        allocation::count_across(holdings, &self.sources, item_id)
    }

    /// One row per active ingredient of the selected recipe.
    #[must_use]
    pub fn requirements(&self, book: &RecipeBook, holdings: &Holdings) -> Vec<Requirement> {
        let Some(recipe) = self.recipe(book) else {
            return Vec::new();
        };
        let quantity = u64::from(self.quantity.get());
        recipe
            .active_ingredients()
            .map(|ing| {
                let need = u64::from(ing.count) * quantity;
                let have = self.compute_have(holdings, ing.item_id);
                Requirement {
                    item_id: ing.item_id,
                    per_craft: ing.count,
                    need,
                    have,
                    enough: have >= need,
                }
            })
            .collect()
    }

    /// True if every active ingredient covers the selected quantity.
    ///
    /// Recipes without active ingredients are never feasible.
    #[must_use]
    pub fn is_feasible(&self, book: &RecipeBook, holdings: &Holdings) -> bool {
        self.recipe(book)
            .is_some_and(|recipe| self.covers(recipe, holdings, self.quantity.get()))
    }

    /// Crafts the ingredients allow, ignoring the requested quantity.
    #[must_use]
    pub fn max_crafts_by_ingredients(&self, book: &RecipeBook, holdings: &Holdings) -> u32 {
        self.recipe(book)
            .map_or(0, |recipe| self.capacity(recipe, holdings))
    }

    /// Produces up to the selected quantity.
    ///
    /// Results are placed first; ingredients are then drained for the units
    /// actually placed.
    pub fn craft(&self, book: &RecipeBook, catalog: &ItemCatalog, holdings: &mut Holdings) -> CraftOutcome {
        let Some(id) = self.selected else {
            return CraftOutcome::Aborted(CraftAbort::NoRecipeSelected);
        };
        let Some(recipe) = book.lookup(id) else {
            return CraftOutcome::Aborted(CraftAbort::RecipeNotFound);
        };
        let requested = self.quantity.get();

        if !self.covers(recipe, holdings, requested) {
            debug!(recipe = id, requested, "Craft infeasible");
            return CraftOutcome::Aborted(CraftAbort::Infeasible);
        }
        if catalog.lookup(recipe.result).is_none() {
            return CraftOutcome::Aborted(CraftAbort::UnknownResultItem);
        }

        let to_make = requested.min(self.capacity(recipe, holdings));
        if to_make == 0 {
            return CraftOutcome::Aborted(CraftAbort::NoIngredientCapacity);
        }

        let remainder = allocation::fill_chain(holdings, &self.destinations, catalog, recipe.result, to_make);
        let placed = to_make - remainder;
        if placed == 0 {
            debug!(recipe = id, "No space for craft result");
            return CraftOutcome::Aborted(CraftAbort::NoSpace);
        }

        let mut consumed = Vec::new();
        let mut shortfall = 0;
        for ing in recipe.active_ingredients() {
            let need = u64::from(ing.count) * u64::from(placed);
            let missing = allocation::drain_chain(holdings, &self.sources, ing.item_id, need);
            if missing > 0 {
                error!(
                    recipe = id,
                    item_id = ing.item_id,
                    need,
                    missing,
                    "Ingredient shortfall after placing craft result"
                );
            }
            shortfall += missing;
            consumed.push(Consumption {
                item_id: ing.item_id,
                amount: need - missing,
            });
        }

        info!(recipe = id, result = recipe.result, requested, placed, "Crafted");
        CraftOutcome::Crafted(CraftReport {
            recipe: id,
            result: recipe.result,
            requested,
            placed,
            consumed,
            shortfall,
        })
    }

    fn recipe<'a>(&self, book: &'a RecipeBook) -> Option<&'a RecipeDefinition> {
        self.selected.and_then(|id| book.lookup(id))
    }

    fn covers(&self, recipe: &RecipeDefinition, holdings: &Holdings, quantity: u32) -> bool {
        recipe.has_active_ingredients()
            && recipe.active_ingredients().all(|ing| {
                self.compute_have(holdings, ing.item_id) >= u64::from(ing.count) * u64::from(quantity)
            })
    }

    fn capacity(&self, recipe: &RecipeDefinition, holdings: &Holdings) -> u32 {
        recipe
            .active_ingredients()
            .map(|ing| self.compute_have(holdings, ing.item_id) / u64::from(ing.count))
            .min()
            .map_or(0, |crafts| u32::try_from(crafts).unwrap_or(u32::MAX))
    }
}
