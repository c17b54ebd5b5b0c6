//! Requested-quantity selection shared by crafting and the shop.

use serde::{Deserialize, Serialize};

/// Smallest selectable quantity.
pub const MIN_QUANTITY: u32 = 1;

/// Largest selectable quantity.
pub const MAX_QUANTITY: u32 = 9999;

/// A quantity clamped to `[MIN_QUANTITY, MAX_QUANTITY]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantitySelector {
    value: u32,
}

impl Default for QuantitySelector {
    fn default() -> Self {
        Self { value: MIN_QUANTITY }
    }
}

impl QuantitySelector {
    /// Creates a selector at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.value
    }

    /// Sets the value, clamped.
    pub fn set(&mut self, value: u32) -> u32 {
        self.value = value.clamp(MIN_QUANTITY, MAX_QUANTITY);
        self.value
    }

    /// Adds a signed step, clamped.
    pub fn change(&mut self, delta: i32) -> u32 {
        let next = i64::from(self.value) + i64::from(delta);
        let next = next.clamp(i64::from(MIN_QUANTITY), i64::from(MAX_QUANTITY));
        self.value = u32::try_from(next).unwrap_or(MIN_QUANTITY);
        self.value
    }

    /// Back to 1.
    pub fn reset(&mut self) {
        self.value = MIN_QUANTITY;
    }
}

/// Step sizes for the +/- buttons.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantitySteps {
    /// Step per tap.
    pub click_step: u32,
    /// Units per second while a button is held.
    pub hold_step_per_sec: f32,
    /// Milliseconds between hold repeats.
    pub repeat_interval_ms: u32,
}

impl Default for QuantitySteps {
    fn default() -> Self {
        Self {
            click_step: 1,
            hold_step_per_sec: 10.0,
            repeat_interval_ms: 100,
        }
    }
}

impl QuantitySteps {
    /// Step applied on each hold repeat, never below 1.
    #[must_use]
    pub fn hold_tick_step(&self) -> u32 {
        let interval_secs = self.repeat_interval_ms as f32 / 1000.0;
        let step = (self.hold_step_per_sec * interval_secs).round();
        if step.is_finite() && step >= 1.0 {
            step as u32
        } else {
            1
        }
    }

    /// Tap step, never below 1.
    #[must_use]
    pub fn tap_step(&self) -> u32 {
        self.click_step.max(1)
    }
}
