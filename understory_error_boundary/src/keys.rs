// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reset keys: opaque values a boundary watches to detect a changed context.
//!
//! ## Identity
//!
//! Keys compare with "same value" semantics:
//! - Booleans, integers and strings compare by value.
//! - Floats compare bitwise, so `NaN` matches `NaN` and `0.0` differs from `-0.0`.
//! - Shared values ([`ResetKey::shared`]) compare by pointer identity, never by contents.
//!
//! Two sequences are [changed](ResetKeys::changed) when their lengths differ or
//! any pair at the same position is not the same key.
//!
//! ```
//! use understory_error_boundary::keys::{ResetKey, ResetKeys};
//!
//! let user = ResetKey::shared(String::from("ada"));
//! let a = ResetKeys::from([user.clone(), ResetKey::from(1)]);
//! let b = ResetKeys::from([user, ResetKey::from(1)]);
//! assert!(!a.changed(&b));
//!
//! // Equal contents, different allocation.
//! let c = ResetKeys::from([ResetKey::shared(String::from("ada")), ResetKey::from(1)]);
//! assert!(a.changed(&c));
//! ```

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

/// A single opaque reset key.
#[derive(Clone)]
pub enum ResetKey {
    /// The absent value.
    Unit,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float, compared bitwise.
    Float(f64),
    /// A string, compared by content.
    Str(Rc<str>),
    /// A shared value, compared by pointer identity.
    Shared(Rc<dyn Any>),
}

impl ResetKey {
    /// Move `value` into a new shared allocation and use it as an identity key.
    pub fn shared<T: Any>(value: T) -> Self {
        Self::Shared(Rc::new(value))
    }

    /// Use an existing allocation as an identity key.
    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self::Shared(value)
    }

    /// Returns true if both keys are the same value.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            // Compare data pointers only; vtables may be duplicated across codegen units.
            (Self::Shared(a), Self::Shared(b)) => core::ptr::eq(
                Rc::as_ptr(a).cast::<()>(),
                Rc::as_ptr(b).cast::<()>(),
            ),
            _ => false,
        }
    }
}

impl PartialEq for ResetKey {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl fmt::Debug for ResetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("Unit"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::Shared(v) => f
                .debug_tuple("Shared")
                .field(&Rc::as_ptr(v).cast::<()>())
                .finish(),
        }
    }
}

impl From<()> for ResetKey {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for ResetKey {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ResetKey {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for ResetKey {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for ResetKey {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ResetKey {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ResetKey {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for ResetKey {
    fn from(v: String) -> Self {
        Self::Str(v.into())
    }
}

impl From<Rc<str>> for ResetKey {
    fn from(v: Rc<str>) -> Self {
        Self::Str(v)
    }
}

/// Ordered sequence of reset keys.
///
/// An absent key list is the empty sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResetKeys(Vec<ResetKey>);

impl ResetKeys {
    /// An empty key list.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Keys in order.
    pub fn as_slice(&self) -> &[ResetKey] {
        &self.0
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a key.
    pub fn push(&mut self, key: impl Into<ResetKey>) {
        self.0.push(key.into());
    }

    /// Returns true if `other` differs in length or in any position.
    pub fn changed(&self, other: &Self) -> bool {
        keys_changed(&self.0, &other.0)
    }
}

/// Returns true if `a` and `b` differ in length or in any position.
pub fn keys_changed(a: &[ResetKey], b: &[ResetKey]) -> bool {
    a.len() != b.len() || a.iter().zip(b).any(|(x, y)| !x.is_same(y))
}

impl From<Vec<ResetKey>> for ResetKeys {
    fn from(keys: Vec<ResetKey>) -> Self {
        Self(keys)
    }
}

impl<const N: usize> From<[ResetKey; N]> for ResetKeys {
    fn from(keys: [ResetKey; N]) -> Self {
        Self(keys.into())
    }
}

impl<K: Into<ResetKey>> FromIterator<K> for ResetKeys {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    #[test]
    fn floats_compare_bitwise() {
        assert!(ResetKey::from(f64::NAN).is_same(&ResetKey::from(f64::NAN)));
        assert!(!ResetKey::from(0.0).is_same(&ResetKey::from(-0.0)));
        assert!(ResetKey::from(1.5).is_same(&ResetKey::from(1.5)));
    }

    #[test]
    fn kinds_never_match_across_variants() {
        assert!(!ResetKey::from(1).is_same(&ResetKey::from(1.0)));
        assert!(!ResetKey::from("1").is_same(&ResetKey::from(1)));
        assert!(!ResetKey::Unit.is_same(&ResetKey::from(false)));
    }

    #[test]
    fn shared_keys_compare_by_identity() {
        let a = Rc::new(vec![1_u8, 2, 3]);
        let k1 = ResetKey::from_rc(a.clone());
        let k2 = ResetKey::from_rc(a);
        let k3 = ResetKey::shared(vec![1_u8, 2, 3]);
        assert!(k1.is_same(&k2));
        assert!(!k1.is_same(&k3));
    }

    #[test]
    fn length_change_counts_as_changed() {
        let a: ResetKeys = [1, 2].into_iter().collect();
        let b: ResetKeys = [1].into_iter().collect();
        assert!(a.changed(&b));
        assert!(ResetKeys::new().changed(&b));
        assert!(!ResetKeys::new().changed(&ResetKeys::default()));
    }

    fn key_strategy() -> impl Strategy<Value = ResetKey> {
        prop_oneof![
            Just(ResetKey::Unit),
            any::<bool>().prop_map(ResetKey::from),
            any::<i64>().prop_map(ResetKey::from),
            any::<f64>().prop_map(ResetKey::from),
            "[a-z]{0,6}".prop_map(ResetKey::from),
        ]
    }

    proptest! {
        #[test]
        fn clones_are_never_changed(keys in prop::collection::vec(key_strategy(), 0..8)) {
            let a = ResetKeys::from(keys);
            let b = a.clone();
            prop_assert!(!a.changed(&b));
        }

        #[test]
        fn appending_a_key_is_always_changed(
            keys in prop::collection::vec(key_strategy(), 0..8),
            extra in key_strategy(),
        ) {
            let a = ResetKeys::from(keys);
            let mut b = a.clone();
            b.push(extra);
            prop_assert!(a.changed(&b));
            prop_assert!(b.changed(&a));
        }

        #[test]
        fn changed_is_symmetric(
            a in prop::collection::vec(any::<i64>(), 0..6),
            b in prop::collection::vec(any::<i64>(), 0..6),
        ) {
            let a: ResetKeys = a.into_iter().collect();
            let b: ResetKeys = b.into_iter().collect();
            prop_assert_eq!(a.changed(&b), b.changed(&a));
            prop_assert_eq!(a.changed(&b), a != b);
        }
    }
}
