//! Property tests for the unit conservation and stack bound guarantees.
//!
//! Run with: cargo test --package satchel_economy --test conservation_properties

use proptest::prelude::*;
use satchel_economy::{
    allocation, ContainerId, CraftOutcome, CraftingResolver, DropOutcome, Holdings, Ingredient, ItemCatalog,
    ItemDefinition, ItemId, PickMode, RecipeBook, RecipeDefinition, Settlement, SlotRef, TransferCoordinator,
};

const STONE: ItemId = 1;
const WOOD: ItemId = 2;
const STONE_MAX: u32 = 10;
const WOOD_MAX: u32 = 7;

fn catalog() -> ItemCatalog {
    ItemCatalog::from_definitions([
        ItemDefinition::new(STONE, "Stone", STONE_MAX),
        ItemDefinition::new(WOOD, "Wood", WOOD_MAX),
    ])
}

/// Inventory (6 slots) and hotbar (3 slots).
fn holdings() -> (Holdings, [ContainerId; 2]) {
    let mut holdings = Holdings::new();
    let bag = holdings.add_container("inventory", 6);
    let bar = holdings.add_container("hotbar", 3);
    (holdings, [bag, bar])
}

#[derive(Clone, Debug)]
enum Op {
    PickUp { container: usize, index: usize, mode: PickMode },
    Drop { container: usize, index: usize },
    QuickMove { container: usize, index: usize },
    /// Adds units while a stack may be held, so origins can be taken.
    Fill { container: usize, wood: bool, quantity: u32 },
    Cancel,
    CancelAll,
}

fn pick_mode() -> impl Strategy<Value = PickMode> {
    prop_oneof![
        Just(PickMode::WholeStack),
        Just(PickMode::Half),
        Just(PickMode::Single),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    // Index range runs past the end of both containers on purpose.
    prop_oneof![
        3 => (0..2usize, 0..8usize, pick_mode()).prop_map(|(container, index, mode)| Op::PickUp {
            container,
            index,
            mode
        }),
        3 => (0..2usize, 0..8usize).prop_map(|(container, index)| Op::Drop { container, index }),
        1 => (0..2usize, 0..8usize).prop_map(|(container, index)| Op::QuickMove { container, index }),
        1 => (0..2usize, any::<bool>(), 1u32..12).prop_map(|(container, wood, quantity)| Op::Fill {
            container,
            wood,
            quantity
        }),
        1 => Just(Op::Cancel),
        1 => Just(Op::CancelAll),
    ]
}

/// Applies one op. Returns the item and number of units it added, if any.
fn apply(
    op: &Op,
    catalog: &ItemCatalog,
    holdings: &mut Holdings,
    ids: [ContainerId; 2],
    transfers: &mut TransferCoordinator,
) -> Option<(ItemId, u64)> {
    match *op {
        Op::PickUp { container, index, mode } => {
            let _ = transfers.pick_up(holdings, SlotRef::new(ids[container], index), mode);
        }
        Op::Drop { container, index } => {
            let _ = transfers.drop_on(holdings, SlotRef::new(ids[container], index));
        }
        Op::QuickMove { container, index } => {
            let _ = transfers.quick_move(holdings, SlotRef::new(ids[container], index), ids[1 - container]);
        }
        Op::Fill { container, wood, quantity } => {
            let item_id = if wood { WOOD } else { STONE };
            let remainder = allocation::fill_chain(holdings, &[ids[container]], catalog, item_id, quantity);
            return Some((item_id, u64::from(quantity - remainder)));
        }
        Op::Cancel => {
            let _ = transfers.cancel(holdings);
        }
        Op::CancelAll => {
            transfers.cancel_all(holdings);
        }
    }
    None
}

fn units(holdings: &Holdings, transfers: &TransferCoordinator, item_id: ItemId) -> u64 {
    holdings.total_item(item_id) + transfers.units_held(item_id)
}

fn assert_bounds(holdings: &Holdings) {
    for container in holdings.iter() {
        for (_, stack) in container.iter() {
            if let Some(stack) = stack {
                assert!(stack.count() >= 1, "empty stack left in a slot");
                assert!(stack.count() <= stack.max_stack(), "stack over its limit");
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Property: merge, split, move and reconciliation never change the
    /// number of units of any item, and no stack leaves its bounds. Fills
    /// change the totals by exactly the units they placed.
    #[test]
    fn transfers_conserve_units(
        stone in 0u32..50,
        wood in 0u32..20,
        ops in prop::collection::vec(op(), 1..60)
    ) {
        let catalog = catalog();
        let (mut holdings, ids) = holdings();
        allocation::fill_chain(&mut holdings, &ids, &catalog, STONE, stone);
        allocation::fill_chain(&mut holdings, &ids, &catalog, WOOD, wood);
        let mut stone_total = holdings.total_item(STONE);
        let mut wood_total = holdings.total_item(WOOD);
        let mut transfers = TransferCoordinator::new();

        for op in &ops {
            match apply(op, &catalog, &mut holdings, ids, &mut transfers) {
                Some((STONE, added)) => stone_total += added,
                Some((_, added)) => wood_total += added,
                None => {}
            }
            prop_assert_eq!(units(&holdings, &transfers, STONE), stone_total);
            prop_assert_eq!(units(&holdings, &transfers, WOOD), wood_total);
            assert_bounds(&holdings);
        }

        transfers.cancel_all(&mut holdings);
        prop_assert!(transfers.held().is_none());
        prop_assert_eq!(units(&holdings, &transfers, STONE), stone_total);
        prop_assert_eq!(units(&holdings, &transfers, WOOD), wood_total);
    }

    /// Property: fill never opens a new stack while an existing stack of the
    /// same item in the container still has room.
    #[test]
    fn fill_tops_up_before_opening(
        initial in 1u32..40,
        splits in prop::collection::vec((0..6usize, 0..6usize), 0..8),
        quantity in 1u32..40
    ) {
        let catalog = catalog();
        let (mut holdings, ids) = holdings();
        let bag = ids[0];
        allocation::fill_chain(&mut holdings, &[bag], &catalog, STONE, initial);

        // Scatter partial stacks around the bag.
        let mut transfers = TransferCoordinator::new();
        for &(from, to) in &splits {
            let _ = transfers.pick_up(&mut holdings, SlotRef::new(bag, from), PickMode::Half);
            let _ = transfers.drop_on(&mut holdings, SlotRef::new(bag, to));
        }
        transfers.cancel_all(&mut holdings);

        let before = holdings.container(bag).unwrap().snapshot();
        let remainder = allocation::fill_chain(&mut holdings, &[bag], &catalog, STONE, quantity);
        let after = holdings.container(bag).unwrap().snapshot();

        let opened = before
            .iter()
            .zip(&after)
            .filter(|(b, a)| b.is_none() && a.is_some())
            .count();
        if opened > 0 {
            for (b, a) in before.iter().zip(&after) {
                if let (Some(b), Some(a)) = (b, a) {
                    prop_assert_eq!(a.id, b.id);
                    prop_assert_eq!(a.count, a.max_stack);
                }
            }
        }
        prop_assert!(remainder <= quantity);
    }

    /// Property: merging a into b (limit m) leaves b at min(a + b, m) and
    /// returns a + b - m to the origin when it overflows.
    #[test]
    fn merge_remainder_law(a in 1u32..=STONE_MAX, b in 1u32..=STONE_MAX) {
        let catalog = catalog();
        let (mut holdings, [bag, bar]) = holdings();
        allocation::fill_chain(&mut holdings, &[bag], &catalog, STONE, a);
        allocation::fill_chain(&mut holdings, &[bar], &catalog, STONE, b);
        let origin = SlotRef::new(bag, 0);
        let target = SlotRef::new(bar, 0);
        let mut transfers = TransferCoordinator::new();

        transfers.pick_up(&mut holdings, origin, PickMode::WholeStack).unwrap();
        let outcome = transfers.drop_on(&mut holdings, target).unwrap();

        let count_at = |slot: SlotRef| holdings.stack_at(slot).unwrap().map_or(0, |s| s.count());
        if a + b <= STONE_MAX {
            prop_assert_eq!(outcome, DropOutcome::Merged { into: target });
            prop_assert_eq!(count_at(target), a + b);
            prop_assert_eq!(count_at(origin), 0);
        } else {
            prop_assert_eq!(
                outcome,
                DropOutcome::PartiallyMerged {
                    into: target,
                    remainder: Settlement::Anchored { slot: origin }
                }
            );
            prop_assert_eq!(count_at(target), STONE_MAX);
            prop_assert_eq!(count_at(origin), a + b - STONE_MAX);
        }
    }

    /// Property: a split pick-up holds d units and leaves q - d at the origin.
    #[test]
    fn split_law(q in 1u32..=STONE_MAX, mode in pick_mode()) {
        let catalog = catalog();
        let (mut holdings, [bag, _]) = holdings();
        allocation::fill_chain(&mut holdings, &[bag], &catalog, STONE, q);
        let origin = SlotRef::new(bag, 0);
        let mut transfers = TransferCoordinator::new();

        let held = transfers.pick_up(&mut holdings, origin, mode).unwrap();
        let leftover = holdings.stack_at(origin).unwrap().map_or(0, |s| s.count());

        prop_assert_eq!(held.count, mode.desired(q).min(q));
        prop_assert_eq!(held.count + leftover, q);
    }

    /// Property: a craft consumes exactly per_craft * placed of every
    /// ingredient, never per_craft * requested.
    #[test]
    fn craft_consumes_for_placed_units(
        have_ore in 0u32..60,
        have_coal in 0u32..60,
        per_ore in 1u32..5,
        per_coal in 1u32..5,
        shelf_slots in 0usize..4,
        requested in 1u32..20
    ) {
        const ORE: ItemId = 1;
        const COAL: ItemId = 2;
        const LAMP: ItemId = 3;
        let catalog = ItemCatalog::from_definitions([
            ItemDefinition::new(ORE, "Ore", 100),
            ItemDefinition::new(COAL, "Coal", 100),
            ItemDefinition::new(LAMP, "Lamp", 3),
        ]);
        let book = RecipeBook::from_definitions([RecipeDefinition::new(
            1,
            LAMP,
            vec![Ingredient::new(ORE, per_ore), Ingredient::new(COAL, per_coal)],
        )])
        .unwrap();

        let mut holdings = Holdings::new();
        let bag = holdings.add_container("inventory", 4);
        let shelf = holdings.add_container("shelf", shelf_slots);
        allocation::fill_chain(&mut holdings, &[bag], &catalog, ORE, have_ore);
        allocation::fill_chain(&mut holdings, &[bag], &catalog, COAL, have_coal);

        let mut resolver = CraftingResolver::new(vec![bag], vec![shelf]);
        resolver.select_recipe(&book, 1).unwrap();
        resolver.quantity_mut().set(requested);
        let feasible = resolver.is_feasible(&book, &holdings);

        let outcome = resolver.craft(&book, &catalog, &mut holdings);
        let placed = outcome.placed();

        prop_assert!(placed <= requested);
        prop_assert_eq!(holdings.total_item(LAMP), u64::from(placed));
        prop_assert_eq!(
            holdings.total_item(ORE),
            u64::from(have_ore) - u64::from(per_ore * placed)
        );
        prop_assert_eq!(
            holdings.total_item(COAL),
            u64::from(have_coal) - u64::from(per_coal * placed)
        );
        match outcome {
            CraftOutcome::Crafted(report) => {
                prop_assert!(feasible);
                prop_assert_eq!(report.shortfall, 0);
                prop_assert_eq!(report.placed, requested.min(shelf_slots as u32 * 3));
            }
            CraftOutcome::Aborted(_) => prop_assert_eq!(placed, 0),
        }
    }
}
