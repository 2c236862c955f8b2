// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host integration points for error boundaries.
//!
//! ## Overview
//!
//! A host runtime drives a boundary through three lifecycle calls, modeled by
//! [`ErrorCapture`]:
//!
//! 1) [`capture_error`](ErrorCapture::capture_error) during the render phase, when
//!    a descendant fails. Must only derive new state; no callbacks run here.
//! 2) [`after_catch`](ErrorCapture::after_catch) after the pass commits, with the
//!    error and its [`ErrorInfo`]. This is where reporting happens.
//! 3) [`after_update`](ErrorCapture::after_update) after every committed update
//!    (not the first mount), with the reset keys of the previous render.
//!
//! The reference [`Runtime`](crate::runtime::Runtime) is one such host. Other
//! toolkits can drive [`BoundaryHandle`](crate::boundary::BoundaryHandle) from
//! their own extension points.
//!
//! [`ParentLookup`] and [`path_to_ancestor`] let a host with a retained node
//! tree derive the component stack reported in [`ErrorInfo`].

use alloc::vec::Vec;

use crate::error::{CapturedError, ErrorInfo};
use crate::keys::ResetKeys;

/// Lifecycle capability set of an error boundary.
///
/// Methods take `&self`; implementations hold their state behind shared
/// interior mutability so fallbacks can keep a reset handle.
pub trait ErrorCapture {
    /// Render-phase capture: record `error` as the new state.
    fn capture_error(&self, error: CapturedError);

    /// Post-commit hook for a capture; reports the error.
    fn after_catch(&self, error: &CapturedError, info: &ErrorInfo);

    /// Post-update hook; `prev_keys` are the reset keys of the previous render.
    fn after_update(&self, prev_keys: &ResetKeys);
}

/// Look up the parent of a node in a host's tree.
pub trait ParentLookup<K> {
    /// Returns the parent of `node`, or `None` if `node` is a root.
    fn parent_of(&self, node: &K) -> Option<K>;
}

/// Collect the chain from `from` (inclusive) up to `ancestor` (exclusive).
///
/// The result is innermost first. If `ancestor` is never reached the chain
/// runs to the root.
///
/// ```
/// use understory_error_boundary::lifecycle::{ParentLookup, path_to_ancestor};
///
/// struct Parents;
/// impl ParentLookup<u32> for Parents {
///     fn parent_of(&self, n: &u32) -> Option<u32> {
///         (*n > 1).then(|| n - 1)
///     }
/// }
///
/// assert_eq!(path_to_ancestor(4, &1, &Parents), vec![4, 3, 2]);
/// assert_eq!(path_to_ancestor(2, &9, &Parents), vec![2, 1]);
/// ```
pub fn path_to_ancestor<K: Copy + Eq>(
    from: K,
    ancestor: &K,
    parents: &impl ParentLookup<K>,
) -> Vec<K> {
    let mut out = Vec::new();
    let mut cur = from;
    // Caller ensures acyclic ancestry.
    loop {
        if cur == *ancestor {
            break;
        }
        out.push(cur);
        match parents.parent_of(&cur) {
            Some(p) => cur = p,
            None => break,
        }
    }
    out
}
