//! # Satchel Demo
//!
//! Headless walkthrough of a session:
//!
//! Stock inventory → Move stacks → Craft → Buy → Sell → Shrink hotbar
//!
//! Usage: `satchel_demo [config.toml]`. Defaults to `data/demo.toml`.
//! Log level follows `RUST_LOG` (default `info`).

use satchel::economy::{CraftOutcome, EconomyConfig, EconomyResult, PickMode, SlotRef};
use satchel::{Panel, Session, SessionEvent, SessionView, Step};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/demo.toml");

const LOG: u32 = 1;
const STONE: u32 = 2;
const IRON_ORE: u32 = 3;

const PLANK_RECIPE: u32 = 1;
const AXE_RECIPE: u32 = 3;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn main() {
    init_tracing();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_owned());
    if let Err(err) = run(&path) {
        error!(%err, "Demo failed");
        std::process::exit(1);
    }
}

fn run(path: &str) -> EconomyResult<()> {
    info!(path, "Loading configuration");
    let config = EconomyConfig::from_path(path)?;
    let mut session = Session::from_config(&config)?;
    let events = session.subscribe();

    // =========================================================================
    // STEP 1: Stock the inventory
    // =========================================================================
    session.add_item_with_overflow(LOG, 40);
    session.add_item_with_overflow(STONE, 12);
    session.add_item_with_overflow(IRON_ORE, 5);
    summarize(&session.view()?);

    // =========================================================================
    // STEP 2: Move stacks around
    // =========================================================================
    session.toggle_panel(Panel::Inventory);
    let inventory = session.inventory();
    session.pick_up(SlotRef::new(inventory, 0), PickMode::Half)?;
    session.drop_on(SlotRef::new(session.hotbar(), 0))?;
    session.quick_move_to_hotbar(SlotRef::new(inventory, 1))?;

    // Held stacks return home when the panel closes.
    session.pick_up(SlotRef::new(inventory, 2), PickMode::Single)?;
    session.toggle_panel(Panel::Inventory);
    info!(idle = session.transfers().is_idle(), "Inventory closed");

    // =========================================================================
    // STEP 3: Craft
    // =========================================================================
    session.toggle_panel(Panel::Crafting);
    for row in session.recipe_rows() {
        info!(id = row.id, name = %row.name, "Recipe");
    }
    session.select_recipe(PLANK_RECIPE)?;
    session.set_quantity(Panel::Crafting, 10);
    report_craft(session.craft());

    session.select_recipe(AXE_RECIPE)?;
    session.tap_quantity(Panel::Crafting, Step::Up);
    report_craft(session.craft());

    // =========================================================================
    // STEP 4: Buy and sell
    // =========================================================================
    session.toggle_panel(Panel::Shop);
    session.select_shop_item(IRON_ORE)?;
    session.set_quantity(Panel::Shop, 3);
    if let Some(quote) = session.view()?.shop.quote {
        info!(total = quote.total, affordable = quote.affordable, "Quote");
    }
    info!(outcome = ?session.buy(), "Buy");

    let sell_slot = SlotRef::new(session.sell_area(), 0);
    if let Some(slot) = first_slot_holding(&session, STONE) {
        session.pick_up(slot, PickMode::WholeStack)?;
        session.drop_on(sell_slot)?;
    }
    info!(pending = session.sell_total(), "Sell area");
    let sold = session.sell()?;
    info!(units = sold.units, total = sold.total, balance = session.balance(), "Sold");
    session.close_panels();

    // =========================================================================
    // STEP 5: Shrink the hotbar
    // =========================================================================
    let settled = session.set_hotbar_columns(1)?;
    info!(relocated = settled.len(), "Hotbar resized");

    summarize(&session.view()?);

    let drained = events.drain();
    let slot_changes = drained
        .iter()
        .filter(|e| matches!(e, SessionEvent::SlotChanged { .. }))
        .count();
    info!(events = drained.len(), slot_changes, "Demo complete");
    Ok(())
}

fn first_slot_holding(session: &Session, item_id: u32) -> Option<SlotRef> {
    [session.inventory(), session.hotbar()].into_iter().find_map(|id| {
        let container = session.holdings().container(id).ok()?;
        container
            .iter()
            .find(|(_, stack)| stack.is_some_and(|s| s.item_id() == item_id))
            .map(|(index, _)| SlotRef::new(id, index))
    })
}

fn report_craft(outcome: CraftOutcome) {
    match outcome {
        CraftOutcome::Crafted(report) => info!(
            result = report.result,
            placed = report.placed,
            requested = report.requested,
            "Crafted"
        ),
        CraftOutcome::Aborted(reason) => info!(?reason, "Craft aborted"),
    }
}

fn summarize(view: &SessionView) {
    for container in [&view.inventory, &view.hotbar, &view.sell] {
        let units: u32 = container.slots.iter().flatten().map(|s| s.count).sum();
        info!(
            container = %container.label,
            occupied = container.occupied(),
            units,
            "Container"
        );
    }
    info!(balance = view.balance, parked = view.parked.len(), "Wallet");
}
