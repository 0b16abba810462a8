//! Resource credit ("mana") regeneration
//!
//! Mana regenerates linearly, from empty to full, over
//! [`REGENERATION_SECONDS`]. Balances of large accounts do not fit into an
//! `f64` mantissa, so all the math is done on [`BigUint`] and only the final
//! basis-point value is converted.
use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer};

/// Five days
pub const REGENERATION_SECONDS: u32 = 432_000;

const BASIS_POINTS_FULL: u16 = 10_000;

/// Raw manabar of an account, as last reported by a node
///
/// Only meaningful for the calculation it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcAccountState {
    pub current_mana: BigUint,
    pub max_mana: BigUint,
    pub last_update_time_seconds: i64,
}

/// Resource credit percentage with two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RcPercent(u16);

impl RcPercent {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(BASIS_POINTS_FULL);

    pub fn from_basis_points(bp: u16) -> Self {
        Self(bp.min(BASIS_POINTS_FULL))
    }

    pub fn basis_points(self) -> u16 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for RcPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}.{:02}", self.0 / 100, self.0 % 100))
    }
}

/// Mana available at `now_seconds`, capped at `max_mana`
///
/// A `now_seconds` earlier than the last update counts as no time elapsed.
pub fn regenerated_mana(state: &RcAccountState, now_seconds: i64) -> BigUint {
    let elapsed = now_seconds
        .saturating_sub(state.last_update_time_seconds)
        .max(0)
        .unsigned_abs();
    let elapsed = elapsed.min(u64::from(REGENERATION_SECONDS));

    let regen = &state.max_mana * BigUint::from(elapsed) / BigUint::from(REGENERATION_SECONDS);

    (&state.current_mana + regen).min(state.max_mana.clone())
}

/// Current resource credit percentage of an account
///
/// Returns `None` if `max_mana` is zero: there is no meaningful percentage,
/// and the caller has to decide what to display.
pub fn current_percentage(state: &RcAccountState, now_seconds: i64) -> Option<RcPercent> {
    if state.max_mana == BigUint::ZERO {
        return None;
    }

    let bp = regenerated_mana(state, now_seconds) * BigUint::from(BASIS_POINTS_FULL)
        / &state.max_mana;

    Some(match u16::try_from(&bp) {
        Ok(bp) => RcPercent::from_basis_points(bp),
        Err(_) => RcPercent::FULL,
    })
}

/// Deserialize a mana amount sent either as a JSON number or as a decimal
/// string
pub fn deserialize_mana<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(BigUint::from(n)),
        Raw::Str(s) => s
            .trim()
            .parse::<BigUint>()
            .map_err(|err| serde::de::Error::custom(format!("invalid mana amount {s:?}: {err}"))),
    }
}

#[cfg(test)]
mod tests;
