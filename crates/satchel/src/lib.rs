//! # Satchel
//!
//! Player-facing inventory, crafting and shop session.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                SATCHEL                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   UI input ──> ┌─────────────────┐       ┌─────────────────┐           │
//! │                │    Session      │──────>│   EventBus      │──> UI     │
//! │                │                 │       └─────────────────┘           │
//! │                │  • Panels       │                                      │
//! │                │  • Quantities   │──────> SessionView ───────> UI       │
//! │                └────────┬────────┘                                      │
//! │                         │                                               │
//! │                ┌────────┴────────┐                                      │
//! │                │ satchel_economy │                                      │
//! │                │                 │                                      │
//! │                │  • Holdings     │                                      │
//! │                │  • Transfers    │                                      │
//! │                │  • Crafting     │                                      │
//! │                │  • Shop         │                                      │
//! │                └─────────────────┘                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `events`: Session-to-UI event channel
//! - `session`: Command interface
//! - `view`: Read-only snapshots

pub mod events;
pub mod session;
pub mod view;

pub use satchel_economy as economy;

// Re-export commonly used types
pub use events::{EventBus, EventReceiver, SessionEvent};
pub use session::{Panel, Session, Step, EVENT_CAPACITY};
pub use view::{ContainerView, CraftingView, RecipeRow, SessionView, ShopView};
