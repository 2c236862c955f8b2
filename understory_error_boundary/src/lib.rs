// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_error_boundary --heading-base-level=0

//! Understory Error Boundary: contain render failures in a component tree.
//!
//! An error boundary wraps a subtree. When any descendant fails while rendering,
//! the boundary shows a fallback instead of the subtree, reports the failure once,
//! and offers ways to recover.
//!
//! - Capture: render bodies return `Result<View, RenderError>` and propagate
//!   failures with `?`; the innermost enclosing [`ErrorBoundary`] captures them.
//! - Fallbacks: a static [`View`], a render function, or a [`ComponentType`],
//!   each given the error and a reset handle through [`FallbackProps`].
//! - Recovery: a manual [`BoundaryHandle::reset`], or automatic reset when the
//!   watched [`ResetKeys`] change between renders.
//! - Forwarding: [`Scope::use_error_handler`] feeds errors from outside the render
//!   phase (event handlers, deferred work) back into the nearest boundary.
//! - Wrapping: [`with_error_boundary`] derives a wrapped component type named
//!   `withErrorBoundary(<name>)`.
//!
//! ## Host integration
//!
//! The boundary's state machine ([`BoundaryState`]) is independent of any host.
//! Hosts drive it through the [`ErrorCapture`] capability: capture during render,
//! then the post-catch and post-update callbacks once the pass commits.
//! [`Runtime`] is a small reference host with keyed scopes, hook state, effects,
//! and re-render scheduling; it is what the tests and demos run on.
//!
//! ## Minimal usage
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use understory_error_boundary::{
//!     component, BoundaryConfig, ErrorBoundary, RenderError, ResetKey, Runtime, View,
//! };
//!
//! let broken = Rc::new(Cell::new(true));
//! let flag = broken.clone();
//! let widget = component("Widget", move |_cx| {
//!     if flag.get() {
//!         return Err(RenderError::msg("widget failed"));
//!     }
//!     Ok(View::text("widget"))
//! });
//!
//! let reports = Rc::new(Cell::new(0));
//! let count = reports.clone();
//! let config = BoundaryConfig::new()
//!     .fallback_render(|props| Ok(View::text(format!("error: {}", props.error))))
//!     .reset_keys([ResetKey::from(broken.get())])
//!     .on_error(move |_, _| count.set(count.get() + 1));
//!
//! let mut rt = Runtime::new();
//! let app = ErrorBoundary::new(config, &widget);
//! assert_eq!(rt.render(&app).unwrap().text_content(), "error: widget failed");
//! assert_eq!(reports.get(), 1);
//! ```
//!
//! This crate is `no_std` and uses `alloc`. The `std` feature (on by default)
//! adds [`RuntimeOptions::catch_panics`].

#![no_std]

extern crate alloc;

#[cfg(any(feature = "std", test))]
#[cfg_attr(test, macro_use)]
extern crate std;

pub mod boundary;
pub mod component;
pub mod error;
pub mod hoc;
pub mod hook;
pub mod keys;
pub mod lifecycle;
pub mod runtime;
pub mod view;

pub use boundary::{
    BoundaryConfig, BoundaryFlags, BoundaryHandle, BoundaryState, ErrorBoundary, Fallback,
    FallbackProps, KeyCheck,
};
pub use component::{Component, ComponentType, FnComponent, Instance, component};
pub use error::{CapturedError, ErrorInfo, RenderError};
pub use hoc::{WithErrorBoundary, with_error_boundary};
pub use hook::ErrorHandler;
pub use keys::{ResetKey, ResetKeys, keys_changed};
pub use lifecycle::{ErrorCapture, ParentLookup, path_to_ancestor};
pub use runtime::{ChildKey, Runtime, RuntimeOptions, Scheduler, Scope, ScopeId, State};
pub use view::View;
