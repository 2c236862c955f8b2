// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The error boundary: state machine, configuration, fallback selection, and component.
//!
//! ## States
//!
//! - Healthy: no error; children render unchanged.
//! - Errored: a descendant failed during rendering; the fallback renders instead.
//!
//! ## Transitions
//!
//! - Healthy → Errored: [`ErrorCapture::capture_error`] in the render phase. No
//!   callbacks run here; `on_error` runs later from [`ErrorCapture::after_catch`],
//!   exactly once per transition.
//! - Errored → Healthy, manual: [`BoundaryHandle::reset`] calls `on_reset`, then
//!   clears the error and schedules a re-render.
//! - Errored → Healthy, automatic: [`ErrorCapture::after_update`] compares the
//!   previous and current reset keys. The first update after a capture is
//!   skipped so the render that failed is not mistaken for a key change. When
//!   the keys changed, `on_reset_keys_change(prev, next)` runs, then the error is
//!   cleared without calling `on_reset`.
//!
//! There is no terminal state; a boundary can fail and recover any number of times.
//!
//! ## Fallback selection
//!
//! Exactly one [`Fallback`] is resolved per errored render:
//! a static [`View`] as-is, a render function called with [`FallbackProps`], or
//! a [`ComponentType`] instantiated with [`FallbackProps`] in its own scope.
//! With no fallback configured the boundary fails with
//! [`RenderError::MissingFallback`], which propagates to the next boundary up.
//!
//! ```
//! use understory_error_boundary::{
//!     component, BoundaryConfig, ErrorBoundary, RenderError, Runtime, View,
//! };
//!
//! let bomb = component("Bomb", |_cx| Err(RenderError::msg("boom")));
//! let config = BoundaryConfig::new()
//!     .fallback_render(|props| Ok(View::element("span", [View::text(props.error.message())])));
//! let app = ErrorBoundary::new(config, bomb);
//!
//! let mut rt = Runtime::new();
//! assert_eq!(rt.render(&app).unwrap().to_string(), "<span>boom</span>");
//! ```

use alloc::borrow::Cow;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use bitflags::bitflags;

use crate::component::{Component, ComponentType};
use crate::error::{CapturedError, ErrorInfo, RenderError};
use crate::keys::{ResetKey, ResetKeys};
use crate::lifecycle::ErrorCapture;
use crate::runtime::{ChildKey, Scheduler, Scope};
use crate::view::View;

bitflags! {
    /// Internal bookkeeping bits of a boundary.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BoundaryFlags: u8 {
        /// Set on capture; the next post-update check is skipped and clears it.
        const UPDATED_WITH_ERROR = 0b0000_0001;
        /// Set on capture; cleared once `on_error` has been delivered.
        const CATCH_PENDING      = 0b0000_0010;
    }
}

impl Default for BoundaryFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of a post-update reset-key check.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyCheck {
    /// No error is held; nothing to compare.
    Healthy,
    /// First update after a capture; comparison skipped.
    Guarded,
    /// Keys are the same as in the previous render.
    Unchanged,
    /// Keys changed; the boundary should reset.
    Changed,
}

/// Error state of one boundary instance.
///
/// Pure state machine with no callbacks; [`BoundaryHandle`] drives it.
#[derive(Clone, Debug, Default)]
pub struct BoundaryState {
    error: Option<CapturedError>,
    flags: BoundaryFlags,
}

impl BoundaryState {
    /// A healthy state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The held error, if errored.
    pub fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    /// Returns true if an error is held.
    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// Current bookkeeping bits.
    pub fn flags(&self) -> BoundaryFlags {
        self.flags
    }

    /// Record `error` (Healthy → Errored).
    pub fn capture(&mut self, error: CapturedError) {
        self.error = Some(error);
        self.flags
            .insert(BoundaryFlags::UPDATED_WITH_ERROR | BoundaryFlags::CATCH_PENDING);
    }

    /// Consume the pending-report bit; returns true at most once per capture.
    pub fn take_catch(&mut self) -> bool {
        let pending = self.flags.contains(BoundaryFlags::CATCH_PENDING);
        self.flags.remove(BoundaryFlags::CATCH_PENDING);
        pending && self.error.is_some()
    }

    /// Post-update check of `prev` against `next`.
    ///
    /// Consumes [`BoundaryFlags::UPDATED_WITH_ERROR`] when set. Does not clear
    /// the error; the caller resets on [`KeyCheck::Changed`].
    pub fn check_reset_keys(&mut self, prev: &ResetKeys, next: &ResetKeys) -> KeyCheck {
        if self.error.is_none() {
            return KeyCheck::Healthy;
        }
        if self.flags.contains(BoundaryFlags::UPDATED_WITH_ERROR) {
            self.flags.remove(BoundaryFlags::UPDATED_WITH_ERROR);
            return KeyCheck::Guarded;
        }
        if prev.changed(next) {
            KeyCheck::Changed
        } else {
            KeyCheck::Unchanged
        }
    }

    /// Clear the error and all bookkeeping (Errored → Healthy).
    pub fn clear(&mut self) {
        self.error = None;
        self.flags = BoundaryFlags::empty();
    }
}

/// Render function variant of [`Fallback`].
pub type FallbackRender = Rc<dyn Fn(&FallbackProps) -> Result<View, RenderError>>;
/// Callback for [`BoundaryConfig::on_error`].
pub type OnError = Rc<dyn Fn(&CapturedError, &ErrorInfo)>;
/// Callback for [`BoundaryConfig::on_reset`].
pub type OnReset = Rc<dyn Fn(&[ResetKey])>;
/// Callback for [`BoundaryConfig::on_reset_keys_change`].
pub type OnResetKeysChange = Rc<dyn Fn(&ResetKeys, &ResetKeys)>;

/// Props handed to render-function and component fallbacks.
#[derive(Clone, Debug)]
pub struct FallbackProps {
    /// The captured error.
    pub error: CapturedError,
    /// Handle that resets the boundary that rendered this fallback.
    pub reset: BoundaryHandle,
}

impl FallbackProps {
    /// Reset the boundary; see [`BoundaryHandle::reset`].
    pub fn reset_error_boundary(&self) {
        self.reset.reset();
    }
}

/// What a boundary renders while errored.
#[derive(Clone)]
pub enum Fallback {
    /// A pre-built view rendered as-is; no reset handle is injected.
    Element(View),
    /// A function from [`FallbackProps`] to a view.
    Render(FallbackRender),
    /// A component type instantiated with [`FallbackProps`].
    Component(ComponentType<FallbackProps>),
}

impl Fallback {
    // Lower wins when more than one fallback is configured.
    fn precedence(&self) -> u8 {
        match self {
            Self::Element(_) => 0,
            Self::Render(_) => 1,
            Self::Component(_) => 2,
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(v) => f.debug_tuple("Element").field(v).finish(),
            Self::Render(_) => f.write_str("Render(..)"),
            Self::Component(ty) => f.debug_tuple("Component").field(&ty.display_name()).finish(),
        }
    }
}

/// Configuration of an error boundary.
///
/// Built with chained setters. Cloning is cheap: callbacks are shared.
#[derive(Clone, Default)]
pub struct BoundaryConfig {
    fallback: Option<Fallback>,
    reset_keys: ResetKeys,
    on_reset_keys_change: Option<OnResetKeysChange>,
    on_error: Option<OnError>,
    on_reset: Option<OnReset>,
}

impl fmt::Debug for BoundaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryConfig")
            .field("fallback", &self.fallback)
            .field("reset_keys", &self.reset_keys)
            .field("on_reset_keys_change", &self.on_reset_keys_change.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_reset", &self.on_reset.is_some())
            .finish()
    }
}

impl BoundaryConfig {
    /// A configuration with no fallback and no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a fallback.
    ///
    /// When several are offered, a static element wins over a render
    /// function, which wins over a component type.
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        let keep_current = self
            .fallback
            .as_ref()
            .is_some_and(|cur| cur.precedence() < fallback.precedence());
        if !keep_current {
            self.fallback = Some(fallback);
        }
        self
    }

    /// Static fallback view.
    pub fn fallback(self, view: impl Into<View>) -> Self {
        self.with_fallback(Fallback::Element(view.into()))
    }

    /// Fallback render function.
    pub fn fallback_render(
        self,
        render: impl Fn(&FallbackProps) -> Result<View, RenderError> + 'static,
    ) -> Self {
        self.with_fallback(Fallback::Render(Rc::new(render)))
    }

    /// Fallback component type.
    pub fn fallback_component(self, component: ComponentType<FallbackProps>) -> Self {
        self.with_fallback(Fallback::Component(component))
    }

    /// Values watched for automatic reset.
    pub fn reset_keys(mut self, keys: impl Into<ResetKeys>) -> Self {
        self.reset_keys = keys.into();
        self
    }

    /// Called with `(prev, next)` when reset keys change while errored.
    pub fn on_reset_keys_change(mut self, f: impl Fn(&ResetKeys, &ResetKeys) + 'static) -> Self {
        self.on_reset_keys_change = Some(Rc::new(f));
        self
    }

    /// Called once per capture with the error and diagnostic info.
    pub fn on_error(mut self, f: impl Fn(&CapturedError, &ErrorInfo) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    /// Called with the caller's arguments before a manual reset clears state.
    pub fn on_reset(mut self, f: impl Fn(&[ResetKey]) + 'static) -> Self {
        self.on_reset = Some(Rc::new(f));
        self
    }

    /// The selected fallback, if any.
    pub fn selected_fallback(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    /// Watched reset keys.
    pub fn watched_keys(&self) -> &ResetKeys {
        &self.reset_keys
    }
}

struct Shared {
    state: BoundaryState,
    config: BoundaryConfig,
    // Reset keys of the last committed render.
    committed_keys: ResetKeys,
}

/// Shared handle to one boundary instance.
///
/// Implements [`ErrorCapture`] for hosts and doubles as the reset handle given
/// to fallbacks. Callbacks always run with no internal borrow held, so they may
/// call back into the handle.
#[derive(Clone)]
pub struct BoundaryHandle {
    shared: Rc<RefCell<Shared>>,
    scheduler: Scheduler,
}

impl fmt::Debug for BoundaryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(shared) = self.shared.try_borrow() else {
            return f.write_str("BoundaryHandle { <borrowed> }");
        };
        f.debug_struct("BoundaryHandle")
            .field("state", &shared.state)
            .field("committed_keys", &shared.committed_keys)
            .finish_non_exhaustive()
    }
}

impl BoundaryHandle {
    /// Create a healthy boundary that requests re-renders through `scheduler`.
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                state: BoundaryState::new(),
                config: BoundaryConfig::new(),
                committed_keys: ResetKeys::new(),
            })),
            scheduler,
        }
    }

    /// The held error, if errored.
    pub fn error(&self) -> Option<CapturedError> {
        self.shared.borrow().state.error().cloned()
    }

    /// Returns true if an error is held.
    pub fn is_errored(&self) -> bool {
        self.shared.borrow().state.is_errored()
    }

    /// Snapshot of the state machine.
    pub fn state(&self) -> BoundaryState {
        self.shared.borrow().state.clone()
    }

    /// Manual reset with no arguments.
    pub fn reset(&self) {
        self.reset_with(&[]);
    }

    /// Manual reset: call `on_reset(args)`, then clear the error.
    pub fn reset_with(&self, args: &[ResetKey]) {
        let on_reset = self.shared.borrow().config.on_reset.clone();
        if let Some(on_reset) = on_reset {
            on_reset(args);
        }
        tracing::debug!("error boundary reset");
        self.clear();
    }

    /// Install the configuration of the current render.
    ///
    /// Returns the reset keys of the previous committed render.
    pub fn sync_config(&self, config: &BoundaryConfig) -> ResetKeys {
        let mut shared = self.shared.borrow_mut();
        shared.config = config.clone();
        shared.committed_keys.clone()
    }

    /// Record the current configuration's reset keys as committed.
    pub fn commit_keys(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.committed_keys = shared.config.reset_keys.clone();
    }

    fn clear(&self) {
        self.shared.borrow_mut().state.clear();
        self.scheduler.schedule();
    }
}

impl ErrorCapture for BoundaryHandle {
    fn capture_error(&self, error: CapturedError) {
        tracing::debug!(error = %error, "error boundary captured render error");
        self.shared.borrow_mut().state.capture(error);
    }

    fn after_catch(&self, error: &CapturedError, info: &ErrorInfo) {
        let on_error = {
            let mut shared = self.shared.borrow_mut();
            if !shared.state.take_catch() {
                return;
            }
            shared.config.on_error.clone()
        };
        if let Some(on_error) = on_error {
            on_error(error, info);
        }
    }

    fn after_update(&self, prev_keys: &ResetKeys) {
        let (check, next, on_change) = {
            let mut shared = self.shared.borrow_mut();
            let next = shared.config.reset_keys.clone();
            let check = shared.state.check_reset_keys(prev_keys, &next);
            (check, next, shared.config.on_reset_keys_change.clone())
        };
        if check != KeyCheck::Changed {
            return;
        }
        tracing::debug!(prev = ?prev_keys, next = ?next, "reset keys changed; resetting boundary");
        if let Some(on_change) = on_change {
            on_change(prev_keys, &next);
        }
        self.clear();
    }
}

const CHILDREN_KEY: ChildKey = ChildKey::Name(Cow::Borrowed("children"));
const FALLBACK_KEY: ChildKey = ChildKey::Name(Cow::Borrowed("fallback"));

/// Component that captures render errors from `children`.
pub struct ErrorBoundary<C> {
    config: BoundaryConfig,
    children: C,
}

impl<C> fmt::Debug for ErrorBoundary<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C> ErrorBoundary<C> {
    /// Wrap `children` in a boundary.
    pub fn new(config: BoundaryConfig, children: C) -> Self {
        Self { config, children }
    }

    /// The boundary's configuration.
    pub fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    fn render_fallback(
        &self,
        cx: &mut Scope<'_>,
        handle: &BoundaryHandle,
        error: CapturedError,
    ) -> Result<View, RenderError> {
        match &self.config.fallback {
            Some(Fallback::Element(view)) => Ok(view.clone()),
            Some(Fallback::Render(render)) => render(&FallbackProps {
                error,
                reset: handle.clone(),
            }),
            Some(Fallback::Component(ty)) => {
                let props = FallbackProps {
                    error,
                    reset: handle.clone(),
                };
                cx.child(FALLBACK_KEY, &ty.with_props(&props))
            }
            None => {
                tracing::warn!(error = %error, "error boundary has no fallback configured");
                Err(RenderError::MissingFallback)
            }
        }
    }
}

impl<C: Component> Component for ErrorBoundary<C> {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("ErrorBoundary")
    }

    fn render(&self, cx: &mut Scope<'_>) -> Result<View, RenderError> {
        let scheduler = cx.scheduler();
        let handle = cx.use_hook(|| BoundaryHandle::new(scheduler));
        let prev_keys = handle.sync_config(&self.config);
        let mounting = cx.is_mounting();

        let mut caught = None;
        let mark = cx.effect_mark();
        let view = match handle.error() {
            Some(error) => self.render_fallback(cx, &handle, error)?,
            None => match cx.child(CHILDREN_KEY, &self.children) {
                Ok(view) => view,
                Err(err) if !err.is_capturable() => return Err(err),
                Err(err) => {
                    let error = err.into_captured();
                    let info = cx.take_error_info();
                    // The failed subtree never commits: drop its effects and state so
                    // children re-mount fresh after a reset.
                    cx.discard_effects_since(mark);
                    cx.discard_children();
                    handle.capture_error(error.clone());
                    let view = self.render_fallback(cx, &handle, error.clone())?;
                    caught = Some((error, info));
                    view
                }
            },
        };

        // Lifecycle runs after the pass commits, children before parents.
        let h = handle.clone();
        cx.queue_effect(move || {
            if !mounting {
                h.after_update(&prev_keys);
            }
            h.commit_keys();
        });
        if let Some((error, info)) = caught {
            cx.queue_effect(move || handle.after_catch(&error, &info));
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::component;
    use crate::runtime::Runtime;
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::Cell;
    use proptest::prelude::*;
    use rstest::rstest;

    fn keys(values: &[i64]) -> ResetKeys {
        values.iter().copied().collect()
    }

    #[test]
    fn first_update_after_capture_is_guarded() {
        let mut state = BoundaryState::new();
        state.capture(CapturedError::msg("x"));
        assert_eq!(state.check_reset_keys(&keys(&[1]), &keys(&[2])), KeyCheck::Guarded);
        assert!(!state.flags().contains(BoundaryFlags::UPDATED_WITH_ERROR));
        assert_eq!(state.check_reset_keys(&keys(&[2]), &keys(&[2])), KeyCheck::Unchanged);
        assert_eq!(state.check_reset_keys(&keys(&[2]), &keys(&[3])), KeyCheck::Changed);
        // The caller decides when to clear.
        assert!(state.is_errored());
        state.clear();
        assert_eq!(state.check_reset_keys(&keys(&[3]), &keys(&[4])), KeyCheck::Healthy);
        assert_eq!(state.flags(), BoundaryFlags::empty());
    }

    #[test]
    fn catch_is_reported_once_per_capture() {
        let mut state = BoundaryState::new();
        assert!(!state.take_catch());
        state.capture(CapturedError::msg("x"));
        assert!(state.take_catch());
        assert!(!state.take_catch());
        state.clear();
        state.capture(CapturedError::msg("y"));
        assert!(state.take_catch());
    }

    #[test]
    fn fallback_precedence_is_element_render_component() {
        let ty = ComponentType::new("Oops", |_: &FallbackProps, _cx| Ok(View::Empty));
        let config = BoundaryConfig::new()
            .fallback_component(ty.clone())
            .fallback_render(|_| Ok(View::Empty));
        assert!(matches!(config.selected_fallback(), Some(Fallback::Render(_))));
        let config = config.fallback("static").fallback_component(ty);
        assert!(matches!(config.selected_fallback(), Some(Fallback::Element(_))));
        assert!(BoundaryConfig::new().selected_fallback().is_none());
    }

    /// Owner-controlled inputs and recorded callbacks for one boundary.
    #[derive(Clone, Default)]
    struct Harness {
        keys: Rc<RefCell<ResetKeys>>,
        throw: Rc<Cell<bool>>,
        child_renders: Rc<Cell<u32>>,
        errors: Rc<RefCell<Vec<(String, ErrorInfo)>>>,
        changes: Rc<RefCell<Vec<(ResetKeys, ResetKeys)>>>,
        resets: Rc<RefCell<Vec<Vec<ResetKey>>>>,
        handle: Rc<RefCell<Option<BoundaryHandle>>>,
    }

    impl Harness {
        fn config(&self) -> BoundaryConfig {
            let handle = self.handle.clone();
            let errors = self.errors.clone();
            let changes = self.changes.clone();
            let resets = self.resets.clone();
            BoundaryConfig::new()
                .fallback_render(move |p| {
                    *handle.borrow_mut() = Some(p.reset.clone());
                    Ok(View::element("span", [View::text(p.error.message())]))
                })
                .reset_keys(self.keys.borrow().clone())
                .on_error(move |e, info| errors.borrow_mut().push((e.message(), info.clone())))
                .on_reset_keys_change(move |prev, next| {
                    changes.borrow_mut().push((prev.clone(), next.clone()));
                })
                .on_reset(move |args| resets.borrow_mut().push(args.to_vec()))
        }

        fn app(&self) -> impl Component {
            let h = self.clone();
            component("App", move |cx| {
                let throw = h.throw.clone();
                let renders = h.child_renders.clone();
                let child = component("Child", move |_cx| {
                    renders.set(renders.get() + 1);
                    if throw.get() {
                        Err(RenderError::msg("boom"))
                    } else {
                        Ok(View::text("child"))
                    }
                });
                cx.child(0, &ErrorBoundary::new(h.config(), child))
            })
        }

        fn set_keys(&self, values: &[i64]) {
            *self.keys.borrow_mut() = keys(values);
        }

        fn reset_handle(&self) -> BoundaryHandle {
            self.handle.borrow().clone().expect("fallback rendered")
        }
    }

    #[test]
    fn fallback_render_shows_message_and_reports_once() {
        let h = Harness::default();
        h.throw.set(true);
        let app = h.app();
        let mut rt = Runtime::new();
        let view = rt.render(&app).unwrap();
        assert_eq!(view.to_string(), "<span>boom</span>");
        let errors = h.errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "boom");
        assert_eq!(errors[0].1.component_stack(), ["Child"]);
    }

    #[test]
    fn staying_errored_does_not_report_again() {
        let h = Harness::default();
        h.throw.set(true);
        let app = h.app();
        let mut rt = Runtime::new();
        for _ in 0..3 {
            assert_eq!(rt.render(&app).unwrap().text_content(), "boom");
        }
        assert_eq!(h.errors.borrow().len(), 1);
        // Errored boundaries do not re-render their children.
        assert_eq!(h.child_renders.get(), 1);
    }

    #[test]
    fn manual_reset_calls_on_reset_then_renders_children() {
        let h = Harness::default();
        h.throw.set(true);
        let app = h.app();
        let mut rt = Runtime::new();
        rt.render(&app).unwrap();

        h.throw.set(false);
        h.reset_handle().reset_with(&[ResetKey::from("retry")]);
        assert_eq!(*h.resets.borrow(), vec![vec![ResetKey::from("retry")]]);
        assert!(rt.needs_render());
        assert_eq!(rt.render(&app).unwrap().text_content(), "child");
        assert!(h.changes.borrow().is_empty());
    }

    #[test]
    fn boundary_recovers_and_fails_again() {
        let h = Harness::default();
        let app = h.app();
        let mut rt = Runtime::new();
        for round in 1..=3 {
            h.throw.set(true);
            assert_eq!(rt.render(&app).unwrap().text_content(), "boom");
            assert_eq!(h.errors.borrow().len(), round);
            h.throw.set(false);
            h.reset_handle().reset();
            assert_eq!(rt.render(&app).unwrap().text_content(), "child");
        }
    }

    #[test]
    fn changed_reset_keys_reset_automatically() {
        let h = Harness::default();
        h.set_keys(&[1]);
        let app = h.app();
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&app).unwrap().text_content(), "child");

        h.throw.set(true);
        assert_eq!(rt.render(&app).unwrap().text_content(), "boom");

        h.throw.set(false);
        h.set_keys(&[2]);
        assert_eq!(rt.render(&app).unwrap().text_content(), "child");
        assert_eq!(*h.changes.borrow(), vec![(keys(&[1]), keys(&[2]))]);
        // Automatic resets do not call on_reset.
        assert!(h.resets.borrow().is_empty());
    }

    #[test]
    fn keys_changed_by_the_failing_render_do_not_reset() {
        let h = Harness::default();
        h.set_keys(&[1]);
        let app = h.app();
        let mut rt = Runtime::new();
        rt.render(&app).unwrap();

        h.throw.set(true);
        h.set_keys(&[2]);
        assert_eq!(rt.render(&app).unwrap().text_content(), "boom");
        assert!(h.changes.borrow().is_empty());

        h.throw.set(false);
        assert_eq!(rt.render(&app).unwrap().text_content(), "boom");
        h.set_keys(&[3]);
        assert_eq!(rt.render(&app).unwrap().text_content(), "child");
        assert_eq!(*h.changes.borrow(), vec![(keys(&[2]), keys(&[3]))]);
    }

    #[test]
    fn mount_time_error_skips_the_first_update() {
        let h = Harness::default();
        h.set_keys(&[1]);
        h.throw.set(true);
        let app = h.app();
        let mut rt = Runtime::new();
        rt.render(&app).unwrap();

        h.throw.set(false);
        h.set_keys(&[2]);
        assert_eq!(rt.render(&app).unwrap().text_content(), "boom");
        h.set_keys(&[3]);
        assert_eq!(rt.render(&app).unwrap().text_content(), "child");
        assert_eq!(h.changes.borrow().len(), 1);
    }

    #[test]
    fn missing_fallback_fails_the_render() {
        let bomb = component("Bomb", |_cx| Err(RenderError::msg("X")));
        let app = ErrorBoundary::new(BoundaryConfig::new(), bomb);
        let mut rt = Runtime::new();
        let err = rt.render(&app).unwrap_err();
        assert!(matches!(err, RenderError::MissingFallback));
    }

    #[test]
    fn missing_fallback_is_captured_by_the_outer_boundary() {
        let reported = Rc::new(RefCell::new(Vec::new()));
        let log = reported.clone();
        let bomb = component("Bomb", |_cx| Err(RenderError::msg("X")));
        let inner = ErrorBoundary::new(
            BoundaryConfig::new().on_error(|_, _| panic!("inner never commits")),
            bomb,
        );
        let outer = ErrorBoundary::new(
            BoundaryConfig::new()
                .fallback("outer fallback")
                .on_error(move |e, _| log.borrow_mut().push(e.message())),
            inner,
        );
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&outer).unwrap().text_content(), "outer fallback");
        let reported = reported.borrow();
        assert_eq!(reported.len(), 1);
        assert!(reported[0].contains("fallback_render"));
    }

    #[test]
    fn innermost_boundary_captures() {
        let outer_errors = Rc::new(Cell::new(0_u32));
        let count = outer_errors.clone();
        let bomb = component("Bomb", |_cx| Err(RenderError::msg("X")));
        let panel = component("Panel", move |cx| {
            let inner = ErrorBoundary::new(BoundaryConfig::new().fallback("inner"), &bomb);
            let body = cx.child(0, &inner)?;
            Ok(View::element("section", [body]))
        });
        let outer = ErrorBoundary::new(
            BoundaryConfig::new()
                .fallback("outer")
                .on_error(move |_, _| count.set(count.get() + 1)),
            panel,
        );
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&outer).unwrap().to_string(), "<section>inner</section>");
        assert_eq!(outer_errors.get(), 0);
    }

    #[test]
    fn discarded_subtree_runs_no_effects() {
        let inner_reports = Rc::new(RefCell::new(Vec::new()));
        let outer_reports = Rc::new(RefCell::new(Vec::new()));
        let leaf_effects = Rc::new(Cell::new(0_u32));

        let inner_log = inner_reports.clone();
        let effects = leaf_effects.clone();
        let panel = component("Panel", move |cx| {
            let bomb = component("Bomb", |_cx| Err(RenderError::msg("inner boom")));
            let log = inner_log.clone();
            let inner = ErrorBoundary::new(
                BoundaryConfig::new()
                    .fallback("inner")
                    .on_error(move |e, _| log.borrow_mut().push(e.message())),
                bomb,
            );
            let first = cx.child(0, &inner)?;

            let count = effects.clone();
            let leaf = component("Leaf", move |cx| {
                let count = count.clone();
                cx.queue_effect(move || count.set(count.get() + 1));
                Ok(View::text("leaf"))
            });
            let second = cx.child(1, &leaf)?;

            let sibling = component("Sibling", |_cx| Err(RenderError::msg("sibling boom")));
            let third = cx.child(2, &sibling)?;
            Ok(View::fragment([first, second, third]))
        });

        let outer_log = outer_reports.clone();
        let outer = ErrorBoundary::new(
            BoundaryConfig::new()
                .fallback("outer")
                .on_error(move |e, _| outer_log.borrow_mut().push(e.message())),
            panel,
        );
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&outer).unwrap().text_content(), "outer");
        assert_eq!(rt.scope_count(), 1, "only the outer boundary stays mounted");
        assert!(
            inner_reports.borrow().is_empty(),
            "unmounted inner boundary must not report"
        );
        assert_eq!(leaf_effects.get(), 0, "effects of the discarded subtree must not run");
        assert_eq!(*outer_reports.borrow(), ["sibling boom"]);

        rt.render(&outer).unwrap();
        assert!(inner_reports.borrow().is_empty());
        assert_eq!(outer_reports.borrow().len(), 1);
    }

    #[test]
    fn component_stack_lists_failing_chain() {
        let stacks = Rc::new(RefCell::new(Vec::new()));
        let log = stacks.clone();
        let bomb = component("Bomb", |_cx| Err(RenderError::msg("X")));
        let list = component("List", move |cx| cx.child("item", &bomb));
        let app = ErrorBoundary::new(
            BoundaryConfig::new()
                .fallback(View::Empty)
                .on_error(move |_, info| log.borrow_mut().push(info.to_string())),
            list,
        );
        let mut rt = Runtime::new();
        rt.render(&app).unwrap();
        assert_eq!(*stacks.borrow(), ["\n    in Bomb\n    in List"]);
    }

    #[rstest]
    #[case::element(BoundaryConfig::new().fallback("static"), "static")]
    #[case::render(
        BoundaryConfig::new().fallback_render(|p| Ok(View::text(p.error.message()))),
        "X"
    )]
    #[case::component(
        BoundaryConfig::new().fallback_component(ComponentType::new(
            "ErrorFallback",
            |p: &FallbackProps, _cx| Ok(View::text(alloc::format!("failed: {}", p.error))),
        )),
        "failed: X"
    )]
    fn each_fallback_kind_renders(#[case] config: BoundaryConfig, #[case] expected: &str) {
        let bomb = component("Bomb", |_cx| Err(RenderError::msg("X")));
        let app = ErrorBoundary::new(config, bomb);
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&app).unwrap().text_content(), expected);
    }

    #[test]
    fn fallback_component_can_reset_from_its_own_scope() {
        let failing = Rc::new(Cell::new(true));
        let flag = failing.clone();
        let handles = Rc::new(RefCell::new(None));
        let stash = handles.clone();
        let fallback = ComponentType::new("ErrorFallback", move |p: &FallbackProps, cx| {
            // Fallback components get their own scope and hooks.
            let shown = cx.use_hook(|| Rc::new(Cell::new(0_u32)));
            shown.set(shown.get() + 1);
            *stash.borrow_mut() = Some(p.clone());
            Ok(View::text(alloc::format!("shown {}", shown.get())))
        });
        let child = component("Child", move |_cx| {
            if flag.get() {
                Err(RenderError::msg("X"))
            } else {
                Ok(View::text("ok"))
            }
        });
        let app = ErrorBoundary::new(BoundaryConfig::new().fallback_component(fallback), child);
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&app).unwrap().text_content(), "shown 1");
        assert_eq!(rt.render(&app).unwrap().text_content(), "shown 2");

        failing.set(false);
        let props: FallbackProps = handles.borrow().clone().unwrap();
        props.reset_error_boundary();
        assert_eq!(rt.render(&app).unwrap().text_content(), "ok");
    }

    #[test]
    fn reset_from_on_error_does_not_deadlock() {
        let handle_slot: Rc<RefCell<Option<BoundaryHandle>>> = Rc::default();
        let stash = handle_slot.clone();
        let from_error = handle_slot.clone();
        let failing = Rc::new(Cell::new(true));
        let flag = failing.clone();
        let child = component("Child", move |_cx| {
            if flag.replace(false) {
                Err(RenderError::msg("once"))
            } else {
                Ok(View::text("ok"))
            }
        });
        let config = BoundaryConfig::new()
            .fallback_render(move |p| {
                *stash.borrow_mut() = Some(p.reset.clone());
                Ok(View::Empty)
            })
            .on_error(move |_, _| {
                if let Some(h) = from_error.borrow().as_ref() {
                    h.reset();
                }
            });
        let app = ErrorBoundary::new(config, child);
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&app).unwrap().text_content(), "ok");
        assert!(!failing.get());
    }

    #[cfg(feature = "std")]
    #[test]
    fn panicking_child_is_captured_when_enabled() {
        use crate::runtime::RuntimeOptions;
        let child = component("Child", |_cx| -> Result<View, RenderError> {
            panic!("render exploded");
        });
        let app = ErrorBoundary::new(
            BoundaryConfig::new().fallback_render(|p| Ok(View::text(p.error.message()))),
            child,
        );
        let mut rt = Runtime::with_options(RuntimeOptions {
            catch_panics: true,
            ..Default::default()
        });
        assert_eq!(rt.render(&app).unwrap().text_content(), "render exploded");
    }

    fn key_seq() -> impl Strategy<Value = Vec<Vec<i64>>> {
        prop::collection::vec(prop::collection::vec(0_i64..3, 0..3), 2..10)
    }

    proptest! {
        #[test]
        fn identical_keys_keep_the_boundary_errored(
            initial in prop::collection::vec(0_i64..3, 0..3),
            updates in 1_usize..8,
        ) {
            let h = Harness::default();
            h.set_keys(&initial);
            let app = h.app();
            let mut rt = Runtime::new();
            rt.render(&app).unwrap();
            h.throw.set(true);
            rt.render(&app).unwrap();
            h.throw.set(false);
            for _ in 0..updates {
                // Same values, fresh sequence each render.
                h.set_keys(&initial);
                prop_assert_eq!(rt.render(&app).unwrap().text_content(), "boom");
            }
            prop_assert!(h.changes.borrow().is_empty());
        }

        #[test]
        fn first_changed_update_after_the_guard_resets_once(seq in key_seq()) {
            let h = Harness::default();
            h.set_keys(&seq[0]);
            let app = h.app();
            let mut rt = Runtime::new();
            rt.render(&app).unwrap();

            // The failing render itself may carry new keys; it is guarded.
            h.throw.set(true);
            h.set_keys(&seq[1]);
            prop_assert_eq!(rt.render(&app).unwrap().text_content(), "boom");
            h.throw.set(false);

            let mut expected_reset = None;
            for i in 2..seq.len() {
                h.set_keys(&seq[i]);
                let text = rt.render(&app).unwrap().text_content();
                if expected_reset.is_none() && seq[i] != seq[i - 1] {
                    expected_reset = Some(i);
                }
                let healthy = expected_reset.is_some();
                prop_assert_eq!(text, if healthy { "child" } else { "boom" });
            }

            let changes = h.changes.borrow();
            match expected_reset {
                Some(i) => {
                    prop_assert_eq!(changes.len(), 1);
                    prop_assert_eq!(&changes[0], &(keys(&seq[i - 1]), keys(&seq[i])));
                }
                None => prop_assert!(changes.is_empty()),
            }
        }
    }
}
