// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Forward errors from outside the render phase into the nearest boundary.
//!
//! Boundaries only see errors returned from render bodies. Errors raised in event
//! handlers, timers, or deferred work are funneled back with
//! [`Scope::use_error_handler`]: keep the returned [`ErrorHandler`], call
//! [`ErrorHandler::set`] where the error happens, and the next pass raises it
//! from the render body that owns the hook.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_error_boundary::{
//!     component, BoundaryConfig, CapturedError, ErrorBoundary, ErrorHandler, Runtime, View,
//! };
//!
//! let stash: Rc<RefCell<Option<ErrorHandler>>> = Rc::default();
//! let keep = stash.clone();
//! let fetcher = component("Fetcher", move |cx| {
//!     let handler = cx.use_error_handler(None)?;
//!     *keep.borrow_mut() = Some(handler);
//!     Ok(View::text("loading"))
//! });
//! let app = ErrorBoundary::new(BoundaryConfig::new().fallback("offline"), fetcher);
//!
//! let mut rt = Runtime::new();
//! assert_eq!(rt.render(&app).unwrap().text_content(), "loading");
//!
//! // Later, in a callback outside rendering:
//! let handler = stash.borrow().clone().unwrap();
//! handler.set(Some(CapturedError::msg("request failed")));
//! assert!(rt.needs_render());
//! assert_eq!(rt.render(&app).unwrap().text_content(), "offline");
//! ```

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use crate::error::{CapturedError, RenderError};
use crate::runtime::{Scheduler, Scope};

/// Setter returned by [`Scope::use_error_handler`].
///
/// Cheap to clone; clones feed the same hook.
#[derive(Clone)]
pub struct ErrorHandler {
    slot: Rc<RefCell<Option<CapturedError>>>,
    scheduler: Scheduler,
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("pending", &self.slot.try_borrow().map(|s| s.is_some()).ok())
            .finish_non_exhaustive()
    }
}

impl ErrorHandler {
    fn new(scheduler: Scheduler) -> Self {
        Self {
            slot: Rc::default(),
            scheduler,
        }
    }

    /// Store the next error (or clear it with `None`) and schedule a re-render.
    pub fn set(&self, error: Option<CapturedError>) {
        *self.slot.borrow_mut() = error;
        self.scheduler.schedule();
    }

    /// Forward an arbitrary error value.
    pub fn raise<E: core::error::Error + 'static>(&self, error: E) {
        self.set(Some(CapturedError::new(error)));
    }

    /// The error waiting to be raised, if any.
    pub fn pending(&self) -> Option<CapturedError> {
        self.slot.borrow().clone()
    }
}

impl Scope<'_> {
    /// Register an error-forwarding hook for this render body.
    ///
    /// Returns `Err` (to be propagated with `?`) when `given` is `Some`, or when
    /// an error was stored through the handler since it was created. Otherwise
    /// returns the handler.
    pub fn use_error_handler(
        &mut self,
        given: Option<CapturedError>,
    ) -> Result<ErrorHandler, RenderError> {
        let scheduler = self.scheduler();
        let handler = self.use_hook(|| ErrorHandler::new(scheduler));
        if let Some(error) = given {
            return Err(RenderError::Captured(error));
        }
        if let Some(error) = handler.pending() {
            tracing::debug!(scope = ?self.id(), error = %error, "raising forwarded error");
            return Err(RenderError::Captured(error));
        }
        Ok(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryConfig, ErrorBoundary};
    use crate::component::component;
    use crate::runtime::Runtime;
    use crate::view::View;
    use alloc::vec::Vec;
    use core::cell::Cell;

    fn stash() -> Rc<RefCell<Option<ErrorHandler>>> {
        Rc::default()
    }

    #[test]
    fn given_error_is_raised_immediately() {
        let child = component("Child", |cx| {
            cx.use_error_handler(Some(CapturedError::msg("given")))?;
            Ok(View::text("unreachable"))
        });
        let app = ErrorBoundary::new(
            BoundaryConfig::new().fallback_render(|p| Ok(View::text(p.error.message()))),
            child,
        );
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&app).unwrap().text_content(), "given");
    }

    #[test]
    fn forwarded_error_reaches_boundary_and_reset_remounts_clean() {
        let handlers = stash();
        let keep = handlers.clone();
        let child = component("Async", move |cx| {
            let h = cx.use_error_handler(None)?;
            *keep.borrow_mut() = Some(h);
            Ok(View::text("ok"))
        });
        let errors = Rc::new(RefCell::new(Vec::new()));
        let log = errors.clone();
        let resets = Rc::new(RefCell::new(None));
        let reset_slot = resets.clone();
        let config = BoundaryConfig::new()
            .fallback_render(move |p| {
                *reset_slot.borrow_mut() = Some(p.reset.clone());
                Ok(View::text(p.error.message()))
            })
            .on_error(move |e, _| log.borrow_mut().push(e.message()));
        let app = ErrorBoundary::new(config, child);
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&app).unwrap().text_content(), "ok");

        let h = handlers.borrow().clone().unwrap();
        h.set(Some(CapturedError::msg("late")));
        assert_eq!(rt.render(&app).unwrap().text_content(), "late");
        assert_eq!(*errors.borrow(), ["late"]);

        resets.borrow().as_ref().unwrap().reset();
        // The child re-mounts with a fresh hook, so the old error is gone.
        assert_eq!(rt.render(&app).unwrap().text_content(), "ok");
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn setting_none_clears_a_pending_error() {
        let handlers = stash();
        let keep = handlers.clone();
        let renders = Rc::new(Cell::new(0_u32));
        let count = renders.clone();
        let child = component("Child", move |cx| {
            count.set(count.get() + 1);
            let h = cx.use_error_handler(None)?;
            *keep.borrow_mut() = Some(h);
            Ok(View::text("fine"))
        });
        let app = ErrorBoundary::new(BoundaryConfig::new().fallback("broken"), child);
        let mut rt = Runtime::new();
        rt.render(&app).unwrap();

        let h = handlers.borrow().clone().unwrap();
        h.raise(core::fmt::Error);
        assert!(h.pending().is_some());
        h.set(None);
        assert_eq!(rt.render(&app).unwrap().text_content(), "fine");
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn forwarded_error_without_boundary_fails_the_render() {
        let handlers = stash();
        let keep = handlers.clone();
        let child = component("Child", move |cx| {
            let h = cx.use_error_handler(None)?;
            *keep.borrow_mut() = Some(h);
            Ok(View::Empty)
        });
        let mut rt = Runtime::new();
        rt.render(&child).unwrap();
        handlers.borrow().as_ref().unwrap().set(Some(CapturedError::msg("lost")));
        let err = rt.render(&child).unwrap_err();
        assert_eq!(err.into_captured().message(), "lost");
    }
}
