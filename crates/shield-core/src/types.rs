//! Primitive types shared across the shield engine.
//!
//! All amounts are integer base units of the bond denomination. All times
//! are unix seconds supplied by the caller; the engine never reads a wall
//! clock, so every replica applying the same operations produces the same
//! state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Bech32-style account address, ordered lexicographically.
pub type Address = String;

/// Integer amount in base units of the bond denomination.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Ambient block context passed into every operation by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCtx {
    /// Block height.
    pub height: u64,
    /// Block time, unix seconds.
    pub time: Timestamp,
}

impl BlockCtx {
    pub fn new(height: u64, time: Timestamp) -> Self {
        BlockCtx { height, time }
    }
}

/// Floor of `a * b / c`.
///
/// Split into quotient and remainder parts so the intermediate product
/// stays within `u128` for any operands the engine produces; saturates at
/// the type bound instead of wrapping.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> u128 {
    debug_assert!(c != 0, "mul_div_floor division by zero");
    let q = a / c;
    let r = a % c;
    q.saturating_mul(b)
        .saturating_add(r.saturating_mul(b) / c)
}

/// Ceiling of `a * b / c`.
///
/// The floor is exact iff the remainder term `(a % c) * b` divides `c`.
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> u128 {
    debug_assert!(c != 0, "mul_div_ceil division by zero");
    let floor = mul_div_floor(a, b, c);
    if (a % c).saturating_mul(b) % c == 0 {
        floor
    } else {
        floor.saturating_add(1)
    }
}

/// Fixed-point decimal amount with 18 fractional digits.
///
/// Used for reward accounting where proportional splits produce fractions
/// of a base unit. Truncation never discards value: the integer part is
/// paid out and the fractional dust is handed back to the caller to defer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DecAmount(u128);

impl DecAmount {
    /// Scaling factor: one base unit is `10^18` raw units.
    pub const SCALE: u128 = 1_000_000_000_000_000_000;

    pub fn zero() -> Self {
        DecAmount(0)
    }

    /// Whole base units, no fractional part.
    pub fn from_int(amount: Amount) -> Self {
        DecAmount(amount.saturating_mul(Self::SCALE))
    }

    /// Raw scaled representation.
    pub fn from_raw(raw: u128) -> Self {
        DecAmount(raw)
    }

    pub fn raw(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn add(self, other: DecAmount) -> DecAmount {
        DecAmount(self.0.saturating_add(other.0))
    }

    pub fn sub(self, other: DecAmount) -> DecAmount {
        DecAmount(self.0.saturating_sub(other.0))
    }

    /// `self * numer / denom`, truncated at the fixed-point scale.
    pub fn mul_ratio_truncate(self, numer: Amount, denom: Amount) -> DecAmount {
        if denom == 0 {
            return DecAmount(0);
        }
        DecAmount(mul_div_floor(self.0, numer, denom))
    }

    /// Split into the integer base-unit part and the fractional change.
    pub fn truncate(self) -> (Amount, DecAmount) {
        (self.0 / Self::SCALE, DecAmount(self.0 % Self::SCALE))
    }
}

/// Deterministic fingerprint of any serializable state: hex-encoded
/// SHA-256 over the bincode encoding. Collections must iterate in a
/// stable order (the engine uses `BTreeMap` everywhere) for replicas to
/// agree on the digest.
pub fn fingerprint<T: Serialize>(value: &T) -> String {
    let bytes = bincode::serialize(value).expect("state serialization cannot fail");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}
