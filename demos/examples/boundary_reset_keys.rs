// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Automatic recovery through reset keys.
//!
//! The owner passes the widget's input as a reset key. When the input fails,
//! the boundary shows its fallback; changing the input on a later render
//! resets the boundary without any explicit call.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example boundary_reset_keys`

use std::cell::Cell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_error_boundary::{
    BoundaryConfig, ErrorBoundary, RenderError, ResetKey, Runtime, View, component,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let input = Rc::new(Cell::new(0.2_f64));

    let owner_input = input.clone();
    let app = component("ResetKeysExample", move |cx| {
        let n = owner_input.get();
        let widget = component("MakeError", move |_cx| {
            if n > 0.5 {
                return Err(RenderError::msg(format!("{n} is greater than 0.5")));
            }
            Ok(View::text(format!("MakeError {n}")))
        });
        let config = BoundaryConfig::new()
            .fallback_render(|props| Ok(View::text(format!("fallback: {}", props.error))))
            .reset_keys([ResetKey::from(n)])
            .on_reset_keys_change(|prev, next| {
                tracing::info!(?prev, ?next, "reset keys changed");
            });
        cx.child(0, &ErrorBoundary::new(config, widget))
    });

    let mut rt = Runtime::new();
    // Deterministic stand-in for repeated random clicks.
    for n in [0.2, 0.8, 0.8, 0.4, 0.9, 0.1] {
        input.set(n);
        match rt.render(&app) {
            Ok(view) => println!("input {n}: {view}"),
            Err(err) => println!("input {n}: render failed: {err}"),
        }
    }
}
