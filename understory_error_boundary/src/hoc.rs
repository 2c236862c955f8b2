// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wrap components in a boundary without touching their render bodies.

use alloc::borrow::Cow;
use alloc::format;
use core::fmt;

use crate::boundary::{BoundaryConfig, ErrorBoundary};
use crate::component::{Component, ComponentType};
use crate::error::RenderError;
use crate::runtime::{ChildKey, Scope};
use crate::view::View;

const WRAPPED_KEY: ChildKey = ChildKey::Index(0);

fn wrapped_name(inner: &str) -> Cow<'static, str> {
    let inner = if inner.is_empty() { "Unknown" } else { inner };
    Cow::Owned(format!("withErrorBoundary({inner})"))
}

/// Derive a component type that renders `component` inside an error boundary.
///
/// Props are forwarded unchanged. The display name is
/// `withErrorBoundary(<name>)`, using `Unknown` when the wrapped type has none.
///
/// ```
/// use understory_error_boundary::{
///     with_error_boundary, BoundaryConfig, ComponentType, RenderError, Runtime, View,
/// };
///
/// let profile: ComponentType<String> = ComponentType::new("Profile", |name: &String, _cx| {
///     if name.is_empty() {
///         return Err(RenderError::msg("no user"));
///     }
///     Ok(View::text(name.clone()))
/// });
/// let safe = with_error_boundary(&profile, BoundaryConfig::new().fallback("anonymous"));
/// assert_eq!(safe.display_name(), "withErrorBoundary(Profile)");
///
/// let mut rt = Runtime::new();
/// let ada = String::from("ada");
/// assert_eq!(rt.render(&safe.with_props(&ada)).unwrap().text_content(), "ada");
///
/// let mut rt = Runtime::new();
/// let nobody = String::new();
/// assert_eq!(rt.render(&safe.with_props(&nobody)).unwrap().text_content(), "anonymous");
/// ```
pub fn with_error_boundary<P: ?Sized + 'static>(
    component: &ComponentType<P>,
    config: BoundaryConfig,
) -> ComponentType<P> {
    let inner = component.clone();
    ComponentType::new(
        wrapped_name(component.display_name()),
        move |props: &P, cx: &mut Scope<'_>| {
            cx.child(
                WRAPPED_KEY,
                &ErrorBoundary::new(config.clone(), inner.with_props(props)),
            )
        },
    )
}

/// A single component wrapped in an error boundary.
///
/// The value-level counterpart of [`with_error_boundary`].
pub struct WithErrorBoundary<C> {
    inner: C,
    config: BoundaryConfig,
}

impl<C> fmt::Debug for WithErrorBoundary<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithErrorBoundary")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C> WithErrorBoundary<C> {
    /// Wrap `inner`.
    pub fn new(inner: C, config: BoundaryConfig) -> Self {
        Self { inner, config }
    }

    /// The wrapped component.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Component> Component for WithErrorBoundary<C> {
    fn name(&self) -> Cow<'static, str> {
        wrapped_name(&self.inner.name())
    }

    fn render(&self, cx: &mut Scope<'_>) -> Result<View, RenderError> {
        cx.child(WRAPPED_KEY, &ErrorBoundary::new(self.config.clone(), &self.inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::component;
    use crate::runtime::Runtime;
    use alloc::rc::Rc;
    use alloc::string::String;
    use core::cell::RefCell;

    #[test]
    fn empty_display_name_becomes_unknown() {
        let anon: ComponentType<()> = ComponentType::new("", |_, _| Ok(View::Empty));
        let wrapped = with_error_boundary(&anon, BoundaryConfig::new());
        assert_eq!(wrapped.display_name(), "withErrorBoundary(Unknown)");
    }

    #[test]
    fn props_are_forwarded_by_reference() {
        let seen = Rc::new(RefCell::new(String::new()));
        let log = seen.clone();
        let echo: ComponentType<String> = ComponentType::new("Echo", move |s: &String, _cx| {
            log.borrow_mut().push_str(s);
            Ok(View::text(s.clone()))
        });
        let wrapped = with_error_boundary(&echo, BoundaryConfig::new().fallback("x"));
        let props = String::from("hello");
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&wrapped.with_props(&props)).unwrap().text_content(), "hello");
        assert_eq!(*seen.borrow(), "hello");
    }

    #[test]
    fn wrapper_captures_inner_failure() {
        let broken = component("Broken", |_cx| Err(RenderError::msg("bad")));
        let wrapped = WithErrorBoundary::new(
            broken,
            BoundaryConfig::new().fallback_render(|p| Ok(View::text(p.error.message()))),
        );
        assert_eq!(wrapped.name(), "withErrorBoundary(Broken)");
        let mut rt = Runtime::new();
        assert_eq!(rt.render(&wrapped).unwrap().text_content(), "bad");
    }
}
