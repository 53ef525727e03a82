//! Sample applications shipped with the host.
//!
//! - **`hello`** – a static line of text.
//! - **`clock`** – a producer thread updating the time once per second.
//! - **`animate`** – sprites moved with animated bounds, re-triggered by
//!   delayed key events the application sends to itself.

pub mod animate;
pub mod clock;
pub mod hello;

use uuid::Uuid;

use crate::application::registry::AppEntry;

/// Names accepted by [`sample`].
pub const SAMPLE_NAMES: [&str; 3] = ["animate", "clock", "hello"];

/// The registry entry for the sample called `name`.
pub fn sample(name: &str) -> Option<AppEntry> {
    match name {
        "animate" => Some(AppEntry::new("animate", animate::Animate::default)),
        "clock" => Some(AppEntry::new("clock", clock::Clock::default)),
        "hello" => Some(AppEntry::new("hello", || hello::Hello).with_title(hello::TITLE)),
        _ => None,
    }
}

/// Every sample, in name order.
pub fn all() -> Vec<AppEntry> {
    SAMPLE_NAMES.iter().filter_map(|name| sample(name)).collect()
}

/// A pseudo-random value in `0..bound`, or 0 when `bound` is not positive.
pub(crate) fn random_below(bound: i64) -> i64 {
    match u128::try_from(bound) {
        Ok(bound) if bound > 0 => (Uuid::new_v4().as_u128() % bound) as i64,
        _ => 0,
    }
}

/// A pseudo-random value in `low..high`.
pub(crate) fn random_range(low: i64, high: i64) -> i64 {
    low + random_below(high - low)
}
