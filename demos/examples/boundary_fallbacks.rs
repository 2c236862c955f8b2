// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fallback kinds.
//!
//! Renders the same failing widget under three boundaries: a static fallback
//! view, a fallback render function, and a fallback component with its own
//! state. The render function's reset button is pressed once the widget is
//! fixed, and the boundary renders its children again.
//!
//! Run:
//! - `cargo run -p understory_demos --example boundary_fallbacks`
//! - `RUST_LOG=debug cargo run -p understory_demos --example boundary_fallbacks`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_error_boundary::{
    BoundaryConfig, BoundaryHandle, ComponentType, ErrorBoundary, FallbackProps, RenderError,
    Runtime, View, component,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A widget that fails while the threshold is exceeded.
    let value = Rc::new(Cell::new(0.7_f64));
    let reading = value.clone();
    let make_error = component("MakeError", move |_cx| {
        let n = reading.get();
        if n > 0.5 {
            return Err(RenderError::msg(format!("{n} is greater than 0.5")));
        }
        Ok(View::element("h3", [View::text(format!("MakeError {n}"))]))
    });

    println!("== Static fallback ==");
    let app = ErrorBoundary::new(
        BoundaryConfig::new().fallback(View::element("div", [View::text("something went wrong")])),
        &make_error,
    );
    println!("{}", Runtime::new().render(&app).expect("boundary captures"));

    println!("== Fallback render function ==");
    let reset_slot: Rc<RefCell<Option<BoundaryHandle>>> = Rc::default();
    let stash = reset_slot.clone();
    let config = BoundaryConfig::new()
        .fallback_render(move |props| {
            *stash.borrow_mut() = Some(props.reset.clone());
            Ok(View::element(
                "div",
                [
                    View::element("p", [View::text("Something went wrong:")]),
                    View::element("pre", [View::text(props.error.message())]),
                    View::element("button", [View::text("Try again")]),
                ],
            ))
        })
        .on_error(|error, info| tracing::info!(%error, stack = %info, "reported error"))
        .on_reset(|_| tracing::info!("trying to recover"));
    let app = ErrorBoundary::new(config, &make_error);
    let mut rt = Runtime::new();
    println!("{}", rt.render(&app).expect("boundary captures"));

    value.set(0.3);
    if let Some(handle) = reset_slot.borrow().as_ref() {
        handle.reset();
    }
    println!("{}", rt.render(&app).expect("children render after reset"));

    println!("== Fallback component ==");
    value.set(0.9);
    let fallback = ComponentType::new("ErrorFallback", |props: &FallbackProps, cx| {
        // Hook state lives in the fallback's own scope.
        let shown = cx.use_hook(|| Rc::new(Cell::new(0_u32)));
        shown.set(shown.get() + 1);
        Ok(View::element(
            "div",
            [View::text(format!(
                "failed with `{}` (shown {} times)",
                props.error,
                shown.get()
            ))],
        ))
    });
    let app = ErrorBoundary::new(BoundaryConfig::new().fallback_component(fallback), &make_error);
    let mut rt = Runtime::new();
    for _ in 0..2 {
        println!("{}", rt.render(&app).expect("boundary captures"));
    }
}
