// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference host runtime: scopes, hook state, render passes, and lifecycle flush.
//!
//! ## Overview
//!
//! [`Runtime::render`] renders a root [`Component`] to a [`View`]. Each pass:
//!
//! 1) Renders the tree top-down. Every component gets a [`Scope`] keyed by its
//!    parent scope and a [`ChildKey`]; hook state stored in the scope persists
//!    across passes while the component keeps being rendered at that position
//!    with the same display name.
//! 2) Unmounts scopes that were not rendered in the pass.
//! 3) Runs queued effects (post-update and post-catch lifecycle hooks),
//!    children before parents.
//! 4) Repeats while an update was scheduled, up to
//!    [`RuntimeOptions::max_update_depth`] passes.
//!
//! A pass that fails at the root unmounts everything and returns the error.
//!
//! ## Hooks
//!
//! Hooks are identified by call order within a render body, so call them
//! unconditionally and in the same order on every pass.
//!
//! ```
//! use understory_error_boundary::{component, Runtime, View};
//!
//! let greeting = component("Greeting", |cx| {
//!     let name = cx.use_state(|| String::from("world"));
//!     Ok(View::text(format!("hello {}", name.get())))
//! });
//!
//! let mut rt = Runtime::new();
//! assert_eq!(rt.render(&greeting).unwrap().text_content(), "hello world");
//! assert_eq!(rt.scope_count(), 1);
//! ```

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::component::Component;
use crate::error::{ErrorInfo, RenderError};
use crate::lifecycle::{ParentLookup, path_to_ancestor};
use crate::view::View;

/// Identifier of a mounted scope.
///
/// Identifiers are never reused within one [`Runtime`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ScopeId(u32);

/// Position of a child among its siblings.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ChildKey {
    /// Positional key.
    Index(usize),
    /// Named key.
    Name(Cow<'static, str>),
}

impl From<usize> for ChildKey {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<&'static str> for ChildKey {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for ChildKey {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

/// Shared re-render request flag.
///
/// Cloned into state setters and reset handles; setting it asks the owning
/// [`Runtime`] for another pass.
#[derive(Clone, Debug, Default)]
pub struct Scheduler(Rc<Cell<bool>>);

impl Scheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request another render pass.
    pub fn schedule(&self) {
        self.0.set(true);
    }

    /// Returns true if a pass has been requested.
    pub fn is_scheduled(&self) -> bool {
        self.0.get()
    }

    /// Clear the request, returning whether one was pending.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }
}

/// Runtime configuration.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeOptions {
    /// Maximum passes per [`Runtime::render`] call before failing with
    /// [`RenderError::UpdateDepthExceeded`].
    pub max_update_depth: usize,
    /// Convert panics in render bodies into [`RenderError::Panicked`] so
    /// boundaries can capture them.
    #[cfg(feature = "std")]
    pub catch_panics: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_update_depth: 50,
            #[cfg(feature = "std")]
            catch_panics: false,
        }
    }
}

struct ScopeSlot {
    parent: Option<ScopeId>,
    key: ChildKey,
    name: Cow<'static, str>,
    hooks: Vec<Box<dyn Any>>,
    children: BTreeMap<ChildKey, ScopeId>,
    created: u64,
    visited: u64,
}

/// Mounted scopes and their hook state.
#[derive(Default)]
struct ScopeTree {
    slots: BTreeMap<ScopeId, ScopeSlot>,
    root: Option<ScopeId>,
    next_id: u32,
    epoch: u64,
    // Innermost scope whose render failed and has not been captured yet.
    failed: Option<ScopeId>,
}

impl ParentLookup<ScopeId> for ScopeTree {
    fn parent_of(&self, node: &ScopeId) -> Option<ScopeId> {
        self.slots.get(node).and_then(|s| s.parent)
    }
}

impl ScopeTree {
    /// Find or create the scope for `key` under `parent`, and mark it visited.
    fn enter(
        &mut self,
        parent: Option<ScopeId>,
        key: ChildKey,
        name: Cow<'static, str>,
    ) -> ScopeId {
        let existing = match parent {
            Some(p) => self.slots.get(&p).and_then(|s| s.children.get(&key).copied()),
            None => self.root,
        };
        if let Some(id) = existing {
            if let Some(slot) = self.slots.get_mut(&id)
                && slot.name == name
            {
                slot.visited = self.epoch;
                return id;
            }
            // Same position, different component: remount.
            self.remove(id);
        }

        let id = ScopeId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        tracing::trace!(scope = id.0, name = %name, "mounting scope");
        self.slots.insert(
            id,
            ScopeSlot {
                parent,
                key: key.clone(),
                name,
                hooks: Vec::new(),
                children: BTreeMap::new(),
                created: self.epoch,
                visited: self.epoch,
            },
        );
        match parent {
            Some(p) => {
                if let Some(slot) = self.slots.get_mut(&p) {
                    slot.children.insert(key, id);
                }
            }
            None => self.root = Some(id),
        }
        id
    }

    /// Remove `id` and its subtree, unlinking it from its parent.
    fn remove(&mut self, id: ScopeId) {
        let Some(slot) = self.slots.remove(&id) else {
            return;
        };
        tracing::debug!(scope = id.0, name = %slot.name, "unmounting scope");
        match slot.parent {
            Some(p) => {
                if let Some(parent) = self.slots.get_mut(&p) {
                    parent.children.remove(&slot.key);
                }
            }
            None => {
                if self.root == Some(id) {
                    self.root = None;
                }
            }
        }
        for child in slot.children.into_values() {
            self.remove(child);
        }
    }

    /// Remove every descendant of `id`, keeping `id` itself.
    fn remove_children(&mut self, id: ScopeId) {
        let children: Vec<ScopeId> = match self.slots.get(&id) {
            Some(slot) => slot.children.values().copied().collect(),
            None => return,
        };
        for child in children {
            self.remove(child);
        }
    }

    /// Unmount scopes not visited in the current epoch.
    fn sweep(&mut self) {
        let stale: Vec<ScopeId> = self
            .slots
            .iter()
            .filter(|(_, s)| s.visited != self.epoch)
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.remove(id);
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.root = None;
        self.failed = None;
    }

    fn name_of(&self, id: ScopeId) -> Cow<'static, str> {
        self.slots
            .get(&id)
            .map(|s| s.name.clone())
            .unwrap_or(Cow::Borrowed("Unknown"))
    }
}

/// Reference host runtime.
///
/// Single-threaded: shared state uses `Rc` and `RefCell`.
pub struct Runtime {
    tree: ScopeTree,
    options: RuntimeOptions,
    scheduler: Scheduler,
    effects: Vec<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scopes", &self.tree.slots.len())
            .field("epoch", &self.tree.epoch)
            .field("options", &self.options)
            .field("scheduled", &self.scheduler.is_scheduled())
            .finish_non_exhaustive()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with default options.
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    /// Create a runtime with explicit options.
    pub fn with_options(options: RuntimeOptions) -> Self {
        Self {
            tree: ScopeTree::default(),
            options,
            scheduler: Scheduler::new(),
            effects: Vec::new(),
        }
    }

    /// Current options.
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// The scheduler shared with hooks and handles created by this runtime.
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    /// Returns true if state changed since the last pass and a render is due.
    pub fn needs_render(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    /// Number of mounted scopes.
    pub fn scope_count(&self) -> usize {
        self.tree.slots.len()
    }

    /// Render `root`, re-rendering until no further update is scheduled.
    pub fn render<C: Component + ?Sized>(&mut self, root: &C) -> Result<View, RenderError> {
        let mut passes = 0;
        loop {
            self.scheduler.take();
            passes += 1;
            match self.pass(root) {
                Ok(view) => {
                    self.flush_effects();
                    if !self.scheduler.is_scheduled() {
                        return Ok(view);
                    }
                    if passes >= self.options.max_update_depth {
                        tracing::warn!(passes, "update depth exceeded");
                        return Err(RenderError::UpdateDepthExceeded {
                            limit: self.options.max_update_depth,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "uncaught render error; unmounting tree");
                    self.effects.clear();
                    self.tree.clear();
                    return Err(err);
                }
            }
        }
    }

    fn pass<C: Component + ?Sized>(&mut self, root: &C) -> Result<View, RenderError> {
        self.tree.epoch += 1;
        self.tree.failed = None;
        tracing::trace!(epoch = self.tree.epoch, "render pass");
        let result = self.render_scope(None, ChildKey::Index(0), root);
        self.tree.sweep();
        result
    }

    fn flush_effects(&mut self) {
        let effects = core::mem::take(&mut self.effects);
        for effect in effects {
            effect();
        }
    }

    fn render_scope<C: Component + ?Sized>(
        &mut self,
        parent: Option<ScopeId>,
        key: ChildKey,
        component: &C,
    ) -> Result<View, RenderError> {
        let id = self.tree.enter(parent, key, component.name());
        let result = {
            let mut cx = Scope {
                rt: &mut *self,
                id,
                cursor: 0,
            };
            cx.run(component)
        };
        match &result {
            Ok(_) => self.tree.failed = None,
            Err(_) => {
                if self.tree.failed.is_none() {
                    self.tree.failed = Some(id);
                }
            }
        }
        result
    }
}

/// Per-component render context.
///
/// Renders children, stores hook state, and queues effects.
pub struct Scope<'rt> {
    rt: &'rt mut Runtime,
    id: ScopeId,
    cursor: usize,
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Scope<'_> {
    #[cfg(feature = "std")]
    fn run<C: Component + ?Sized>(&mut self, component: &C) -> Result<View, RenderError> {
        if !self.rt.options.catch_panics {
            return component.render(self);
        }
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| component.render(self)));
        outcome.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::debug!(scope = self.id.0, %message, "render panicked");
            Err(RenderError::Panicked(crate::error::CapturedError::msg(message)))
        })
    }

    #[cfg(not(feature = "std"))]
    fn run<C: Component + ?Sized>(&mut self, component: &C) -> Result<View, RenderError> {
        component.render(self)
    }

    /// Identifier of this scope.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Display name of the component rendering in this scope.
    pub fn name(&self) -> Cow<'static, str> {
        self.rt.tree.name_of(self.id)
    }

    /// Returns true during the first pass of this scope.
    pub fn is_mounting(&self) -> bool {
        self.rt
            .tree
            .slots
            .get(&self.id)
            .is_some_and(|s| s.created == s.visited)
    }

    /// The runtime's scheduler.
    pub fn scheduler(&self) -> Scheduler {
        self.rt.scheduler.clone()
    }

    /// Render a child component at `key`.
    ///
    /// Errors are returned unchanged so they keep propagating with `?` until a
    /// boundary captures them.
    pub fn child<C: Component + ?Sized>(
        &mut self,
        key: impl Into<ChildKey>,
        component: &C,
    ) -> Result<View, RenderError> {
        self.rt.render_scope(Some(self.id), key.into(), component)
    }

    /// Queue `effect` to run after the pass commits.
    pub fn queue_effect(&mut self, effect: impl FnOnce() + 'static) {
        self.rt.effects.push(Box::new(effect));
    }

    /// Persistent per-scope value, created by `init` on first use.
    ///
    /// Returns a clone of the stored value; store `Rc`-backed handles to share
    /// mutable state. If a hook slot changes type between passes (hooks called
    /// conditionally), the slot is re-initialized.
    pub fn use_hook<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> T {
        let index = self.cursor;
        self.cursor += 1;
        let epoch = self.rt.tree.epoch;
        let Some(slot) = self.rt.tree.slots.get_mut(&self.id) else {
            return init();
        };
        if let Some(value) = slot.hooks.get(index).and_then(|h| h.downcast_ref::<T>()) {
            return value.clone();
        }
        let value = init();
        if index < slot.hooks.len() {
            tracing::warn!(
                scope = self.id.0,
                name = %slot.name,
                index,
                epoch,
                "hook changed type between passes; re-initializing"
            );
            slot.hooks[index] = Box::new(value.clone());
        } else {
            slot.hooks.push(Box::new(value.clone()));
        }
        value
    }

    /// Persistent state whose setters schedule a re-render.
    pub fn use_state<T: 'static>(&mut self, init: impl FnOnce() -> T) -> State<T> {
        let scheduler = self.scheduler();
        self.use_hook(|| State {
            value: Rc::new(RefCell::new(init())),
            scheduler,
        })
    }

    /// Number of effects queued so far in this pass.
    pub(crate) fn effect_mark(&self) -> usize {
        self.rt.effects.len()
    }

    /// Drop effects queued after `mark`; they belong to a subtree that will not commit.
    pub(crate) fn discard_effects_since(&mut self, mark: usize) {
        let dropped = self.rt.effects.len().saturating_sub(mark);
        if dropped > 0 {
            tracing::trace!(scope = self.id.0, dropped, "discarding uncommitted effects");
        }
        self.rt.effects.truncate(mark);
    }

    /// Drop the hook state of every descendant scope.
    pub(crate) fn discard_children(&mut self) {
        self.rt.tree.remove_children(self.id);
    }

    /// Take the component stack of the pending failure, innermost first,
    /// stopping before this scope.
    pub(crate) fn take_error_info(&mut self) -> ErrorInfo {
        let tree = &mut self.rt.tree;
        let Some(failed) = tree.failed.take() else {
            return ErrorInfo::default();
        };
        let stack = path_to_ancestor(failed, &self.id, &*tree)
            .into_iter()
            .map(|id| tree.name_of(id))
            .collect();
        ErrorInfo::new(stack)
    }
}

/// State cell created by [`Scope::use_state`].
pub struct State<T> {
    value: Rc<RefCell<T>>,
    scheduler: Scheduler,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("State").field(&self.value.borrow()).finish()
    }
}

impl<T> State<T> {
    /// Clone out the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    /// Borrow the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Replace the value and schedule a re-render.
    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.scheduler.schedule();
    }

    /// Mutate the value in place and schedule a re-render.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
        self.scheduler.schedule();
    }
}

#[cfg(feature = "std")]
fn panic_message(payload: &(dyn Any + Send)) -> String {
    use alloc::string::ToString;
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else {
        String::from("Box<dyn Any>")
    }
}
