// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering units: the [`Component`] trait, closures, and named component types.
//!
//! ## Overview
//!
//! A [`Component`] is a value (its props) plus a render body. Render bodies
//! return `Result<View, RenderError>`; an `Err` is a render-phase failure that
//! propagates to the nearest ancestor boundary.
//!
//! [`ComponentType`] is the reusable form: a display name plus a render
//! function over props `P`. Bind it to props with [`ComponentType::with_props`]
//! to get a renderable [`Instance`].

use alloc::borrow::Cow;
use alloc::rc::Rc;
use core::fmt;

use crate::error::RenderError;
use crate::runtime::Scope;
use crate::view::View;

/// A rendering unit.
pub trait Component {
    /// Display name used for diagnostics and scope identity.
    ///
    /// Defaults to the unqualified type name.
    fn name(&self) -> Cow<'static, str> {
        short_type_name::<Self>().into()
    }

    /// Compute output for the current pass.
    fn render(&self, cx: &mut Scope<'_>) -> Result<View, RenderError>;
}

impl<C: Component + ?Sized> Component for &C {
    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }

    fn render(&self, cx: &mut Scope<'_>) -> Result<View, RenderError> {
        (**self).render(cx)
    }
}

impl<C: Component + ?Sized> Component for Rc<C> {
    fn name(&self) -> Cow<'static, str> {
        (**self).name()
    }

    fn render(&self, cx: &mut Scope<'_>) -> Result<View, RenderError> {
        (**self).render(cx)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = core::any::type_name::<T>();
    // Strip the module path but keep generic arguments intact.
    let head = full.split('<').next().unwrap_or(full);
    let start = head.rfind("::").map(|i| i + 2).unwrap_or(0);
    &full[start..]
}

/// A component backed by a closure.
///
/// Built with [`component`].
pub struct FnComponent<F> {
    name: Cow<'static, str>,
    render: F,
}

impl<F> fmt::Debug for FnComponent<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComponent")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Build a named component from a closure.
///
/// ```
/// use understory_error_boundary::{component, Runtime, View};
///
/// let hello = component("Hello", |_cx| Ok(View::text("hi")));
/// let mut rt = Runtime::new();
/// assert_eq!(rt.render(&hello).unwrap(), View::text("hi"));
/// ```
pub fn component<F>(name: impl Into<Cow<'static, str>>, render: F) -> FnComponent<F>
where
    F: Fn(&mut Scope<'_>) -> Result<View, RenderError>,
{
    FnComponent {
        name: name.into(),
        render,
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&mut Scope<'_>) -> Result<View, RenderError>,
{
    fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }

    fn render(&self, cx: &mut Scope<'_>) -> Result<View, RenderError> {
        (self.render)(cx)
    }
}

type RenderProps<P> = dyn Fn(&P, &mut Scope<'_>) -> Result<View, RenderError>;

/// A named, reusable render function over props `P`.
///
/// Cloning is cheap and keeps the same render function.
pub struct ComponentType<P: ?Sized> {
    name: Cow<'static, str>,
    render: Rc<RenderProps<P>>,
}

impl<P: ?Sized> Clone for ComponentType<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            render: self.render.clone(),
        }
    }
}

impl<P: ?Sized> fmt::Debug for ComponentType<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<P: ?Sized> ComponentType<P> {
    /// Create a component type with a display name.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        render: impl Fn(&P, &mut Scope<'_>) -> Result<View, RenderError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            render: Rc::new(render),
        }
    }

    /// Display name for tooling; may be empty.
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Bind props to produce a renderable instance.
    pub fn with_props<'a>(&'a self, props: &'a P) -> Instance<'a, P> {
        Instance { ty: self, props }
    }

    pub(crate) fn render_props(&self, props: &P, cx: &mut Scope<'_>) -> Result<View, RenderError> {
        (self.render)(props, cx)
    }
}

/// A [`ComponentType`] bound to borrowed props.
pub struct Instance<'a, P: ?Sized> {
    ty: &'a ComponentType<P>,
    props: &'a P,
}

impl<P: ?Sized> fmt::Debug for Instance<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

impl<P: ?Sized> Component for Instance<'_, P> {
    fn name(&self) -> Cow<'static, str> {
        self.ty.name.clone()
    }

    fn render(&self, cx: &mut Scope<'_>) -> Result<View, RenderError> {
        self.ty.render_props(self.props, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Component for Plain {
        fn render(&self, _cx: &mut Scope<'_>) -> Result<View, RenderError> {
            Ok(View::Empty)
        }
    }

    struct Generic<T>(T);
    impl<T> Component for Generic<T> {
        fn render(&self, _cx: &mut Scope<'_>) -> Result<View, RenderError> {
            Ok(View::Empty)
        }
    }

    #[test]
    fn default_name_strips_module_path() {
        assert_eq!(Plain.name(), "Plain");
        assert_eq!(Generic(1_u8).name(), "Generic<u8>");
    }

    #[test]
    fn references_forward_name() {
        let p = &Plain;
        assert_eq!(Component::name(&p), "Plain");
    }

    #[test]
    fn component_type_clones_share_name() {
        let ty: ComponentType<u32> = ComponentType::new("Counter", |n, _cx| {
            Ok(View::text(alloc::format!("{n}")))
        });
        let copy = ty.clone();
        assert_eq!(copy.display_name(), "Counter");
        assert_eq!(copy.with_props(&3).name(), "Counter");
    }
}
