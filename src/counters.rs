//! # Consumed counters.
//!
//! [`Quantity`] is the numeric sum type every counter holds; [`Consumed`] is the
//! ordered key → quantity map kept by tasks and tallies.
//!
//! ## Promotion
//! ```text
//! Int   + Int   → Int   (saturating)
//! Int   + Float → Float
//! Float + _     → Float
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Counter key recorded once per started task.
pub const HAS_STARTED: &str = "outcome.hasStarted";
/// Counter key recorded once per succeeded task.
pub const HAS_SUCCEEDED: &str = "outcome.hasSucceeded";
/// Counter key recorded once per failed task.
pub const HAS_FAILED: &str = "outcome.hasFailed";

/// Integer-or-float accumulator value.
///
/// Serializes as a bare JSON number.
///
/// ## Example
/// ```rust
/// use tasktally::Quantity;
///
/// assert_eq!(Quantity::Int(2) + Quantity::Int(3), Quantity::Int(5));
/// assert_eq!(Quantity::Int(2) + Quantity::Float(0.5), Quantity::Float(2.5));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// Whole-number count.
    Int(i64),
    /// Fractional measurement.
    Float(f64),
}

impl Quantity {
    /// Zero in integer form.
    pub const ZERO: Quantity = Quantity::Int(0);

    /// Lossy conversion to `f64` for rate computation.
    pub fn as_f64(self) -> f64 {
        match self {
            Quantity::Int(v) => v as f64,
            Quantity::Float(v) => v,
        }
    }

    /// Returns `true` if the value went through float promotion.
    pub fn is_float(self) -> bool {
        matches!(self, Quantity::Float(_))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::ZERO
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        match (self, rhs) {
            (Quantity::Int(a), Quantity::Int(b)) => Quantity::Int(a.saturating_add(b)),
            (a, b) => Quantity::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        *self = *self + rhs;
    }
}

impl From<i64> for Quantity {
    fn from(v: i64) -> Self {
        Quantity::Int(v)
    }
}

impl From<i32> for Quantity {
    fn from(v: i32) -> Self {
        Quantity::Int(i64::from(v))
    }
}

impl From<u32> for Quantity {
    fn from(v: u32) -> Self {
        Quantity::Int(i64::from(v))
    }
}

impl From<f64> for Quantity {
    fn from(v: f64) -> Self {
        Quantity::Float(v)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Int(v) => write!(f, "{v}"),
            Quantity::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Ordered map from counter key to accumulated [`Quantity`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Consumed {
    inner: BTreeMap<String, Quantity>,
}

impl Consumed {
    /// Creates an empty counter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to `key` (a missing key counts as zero).
    pub fn add(&mut self, key: impl Into<String>, delta: impl Into<Quantity>) {
        *self.inner.entry(key.into()).or_default() += delta.into();
    }

    /// Adds every key of `other` into this map.
    pub fn merge(&mut self, other: &Consumed) {
        for (key, delta) in &other.inner {
            match self.inner.get_mut(key) {
                Some(total) => *total += *delta,
                None => {
                    self.inner.insert(key.clone(), Quantity::ZERO + *delta);
                }
            }
        }
    }

    /// Current value of `key`, if recorded.
    pub fn get(&self, key: &str) -> Option<Quantity> {
        self.inner.get(key).copied()
    }

    /// Iterates keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Quantity)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True if no counter has been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Drops every counter.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl<K: Into<String>, Q: Into<Quantity>> FromIterator<(K, Q)> for Consumed {
    fn from_iter<I: IntoIterator<Item = (K, Q)>>(iter: I) -> Self {
        let mut out = Consumed::new();
        for (k, q) in iter {
            out.add(k, q);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_operand_promotes() {
        let mut q = Quantity::Int(1);
        q += Quantity::Float(0.25);
        assert_eq!(q, Quantity::Float(1.25));
        q += Quantity::Int(1);
        assert!(q.is_float());
        assert_eq!(q.as_f64(), 2.25);
    }

    #[test]
    fn test_int_addition_saturates() {
        assert_eq!(
            Quantity::Int(i64::MAX) + Quantity::Int(1),
            Quantity::Int(i64::MAX)
        );
    }

    #[test]
    fn test_merge_is_commutative() {
        let a: Consumed = [(HAS_STARTED, 1), (HAS_SUCCEEDED, 1)].into_iter().collect();
        let mut b: Consumed = [(HAS_STARTED, 1), (HAS_FAILED, 1)].into_iter().collect();
        b.add("rows", 2.5);

        let mut ab = Consumed::new();
        ab.merge(&a);
        ab.merge(&b);
        let mut ba = Consumed::new();
        ba.merge(&b);
        ba.merge(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.get(HAS_STARTED), Some(Quantity::Int(2)));
        assert_eq!(ab.get("rows"), Some(Quantity::Float(2.5)));
        assert_eq!(ab.len(), 4);
    }

    #[test]
    fn test_serializes_as_plain_numbers() {
        let mut c = Consumed::new();
        c.add(HAS_STARTED, 1);
        c.add("bytes", 1.5);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"bytes": 1.5, "outcome.hasStarted": 1})
        );
    }
}
