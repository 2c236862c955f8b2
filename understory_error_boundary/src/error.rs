// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types: captured errors, diagnostic info, and render failures.
//!
//! ## Overview
//!
//! A render body reports failure by returning [`RenderError`] (usually via `?`).
//! When a boundary captures it, the failure becomes a [`CapturedError`]: a shared,
//! cheaply clonable handle that is handed to fallbacks and to the `on_error` callback.
//! [`ErrorInfo`] carries the component stack of the failing render.

use alloc::borrow::Cow;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

/// A shared handle to an error raised while rendering.
///
/// Clones share identity; use [`CapturedError::ptr_eq`] to tell whether two
/// handles refer to the same occurrence.
#[derive(Clone)]
pub struct CapturedError(Rc<dyn core::error::Error + 'static>);

/// Message-only error behind [`CapturedError::msg`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageError(Cow<'static, str>);

impl CapturedError {
    /// Wrap an arbitrary error value.
    pub fn new<E: core::error::Error + 'static>(error: E) -> Self {
        Self(Rc::new(error))
    }

    /// Build an error that only carries a message.
    ///
    /// ```
    /// use understory_error_boundary::CapturedError;
    /// assert_eq!(CapturedError::msg("boom").message(), "boom");
    /// ```
    pub fn msg(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// The display message of the underlying error.
    pub fn message(&self) -> String {
        self.0.to_string()
    }

    /// Borrow the underlying error.
    pub fn as_error(&self) -> &(dyn core::error::Error + 'static) {
        &*self.0
    }

    /// Attempt to downcast the underlying error to a concrete type.
    pub fn downcast_ref<E: core::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Returns true if both handles refer to the same error occurrence.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapturedError").field(&self.0).finish()
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl core::error::Error for CapturedError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        self.0.source()
    }
}

/// Diagnostic info delivered alongside a captured error.
///
/// The component stack lists display names from the component that failed up
/// to, but not including, the boundary that captured the error (innermost first).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    component_stack: Vec<Cow<'static, str>>,
}

impl ErrorInfo {
    /// Build diagnostic info from an innermost-first component stack.
    pub fn new(component_stack: Vec<Cow<'static, str>>) -> Self {
        Self { component_stack }
    }

    /// Component names, innermost first.
    pub fn component_stack(&self) -> &[Cow<'static, str>] {
        &self.component_stack
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.component_stack {
            write!(f, "\n    in {name}")?;
        }
        Ok(())
    }
}

/// Failure of a render pass.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RenderError {
    /// A component raised an error while rendering.
    #[error(transparent)]
    Captured(#[from] CapturedError),
    /// A boundary entered the errored state with no fallback configured.
    ///
    /// This is a programming error: the boundary cannot produce output.
    #[error("ErrorBoundary requires one of fallback, fallback_render or fallback_component")]
    MissingFallback,
    /// Scheduled updates kept re-rendering past the configured limit.
    #[error("maximum update depth exceeded after {limit} render passes")]
    UpdateDepthExceeded {
        /// The configured pass limit.
        limit: usize,
    },
    /// A render body panicked while panic capture was enabled.
    #[cfg(feature = "std")]
    #[error("render panicked: {0}")]
    Panicked(CapturedError),
}

impl RenderError {
    /// Shorthand for a message-only [`RenderError::Captured`].
    pub fn msg(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Captured(CapturedError::msg(message))
    }

    /// Shorthand for wrapping an arbitrary error as [`RenderError::Captured`].
    pub fn new<E: core::error::Error + 'static>(error: E) -> Self {
        Self::Captured(CapturedError::new(error))
    }

    /// Whether an error boundary may capture this failure.
    ///
    /// Runtime faults such as [`RenderError::UpdateDepthExceeded`] always
    /// propagate to the caller of the render pass.
    pub fn is_capturable(&self) -> bool {
        !matches!(self, Self::UpdateDepthExceeded { .. })
    }

    /// Convert into the handle a boundary hands to its fallback and `on_error`.
    pub fn into_captured(self) -> CapturedError {
        match self {
            Self::Captured(error) => error,
            #[cfg(feature = "std")]
            Self::Panicked(error) => error,
            other => CapturedError::new(other),
        }
    }
}
