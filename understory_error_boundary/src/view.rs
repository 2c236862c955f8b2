// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderable output produced by components.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Output tree of a render pass.
///
/// Deliberately small: enough to express text, tagged elements, and grouping.
/// Toolkits map it onto their own retained or immediate widgets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum View {
    /// Renders nothing.
    #[default]
    Empty,
    /// A text run.
    Text(Cow<'static, str>),
    /// A tagged element with children.
    Element {
        /// Element tag, e.g. `"div"` or `"button"`.
        tag: Cow<'static, str>,
        /// Child views in order.
        children: Vec<View>,
    },
    /// Children without a wrapping element.
    Fragment(Vec<View>),
}

impl View {
    /// A text run.
    pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Text(text.into())
    }

    /// A tagged element.
    pub fn element(
        tag: impl Into<Cow<'static, str>>,
        children: impl IntoIterator<Item = Self>,
    ) -> Self {
        Self::Element {
            tag: tag.into(),
            children: children.into_iter().collect(),
        }
    }

    /// Children without a wrapping element.
    pub fn fragment(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Fragment(children.into_iter().collect())
    }

    /// Returns true for [`View::Empty`] and for fragments of empty views.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(_) | Self::Element { .. } => false,
            Self::Fragment(children) => children.iter().all(Self::is_empty),
        }
    }

    /// Concatenated text of this view and all descendants, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Empty => {}
            Self::Text(t) => out.push_str(t),
            Self::Element { children, .. } | Self::Fragment(children) => {
                for c in children {
                    c.collect_text(out);
                }
            }
        }
    }
}

impl From<&'static str> for View {
    fn from(text: &'static str) -> Self {
        Self::text(text)
    }
}

impl From<String> for View {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

/// Markup-like rendering, handy for logs and demos.
impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(t) => f.write_str(t),
            Self::Element { tag, children } => {
                write!(f, "<{tag}>")?;
                for c in children {
                    write!(f, "{c}")?;
                }
                write!(f, "</{tag}>")
            }
            Self::Fragment(children) => {
                for c in children {
                    write!(f, "{c}")?;
                }
                Ok(())
            }
        }
    }
}
