// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wrapping component types and forwarding errors from outside rendering.
//!
//! `with_error_boundary` derives a wrapped component type. Inside it, a
//! fetcher registers an error handler; a simulated async completion that fails
//! hands its error to the handler, and the next pass raises it into the
//! boundary. Resetting re-mounts the fetcher with fresh state.
//!
//! Run:
//! - `cargo run -p understory_demos --example boundary_wrap_and_forward`

use std::cell::RefCell;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;
use understory_error_boundary::{
    BoundaryConfig, BoundaryHandle, CapturedError, ComponentType, ErrorHandler, Runtime, View,
    with_error_boundary,
};

#[derive(Debug)]
struct FetchError(f64);

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "async result {} is greater than 0.5", self.0)
    }
}

impl std::error::Error for FetchError {}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let handlers: Rc<RefCell<Option<ErrorHandler>>> = Rc::default();
    let keep = handlers.clone();
    let fetcher: ComponentType<str> = ComponentType::new("AsyncError", move |label: &str, cx| {
        let handler = cx.use_error_handler(None)?;
        let number = cx.use_state(|| 0.0_f64);
        *keep.borrow_mut() = Some(handler);
        Ok(View::element("h3", [View::text(format!("{label} {}", number.get()))]))
    });

    let reset_slot: Rc<RefCell<Option<BoundaryHandle>>> = Rc::default();
    let stash = reset_slot.clone();
    let safe = with_error_boundary(
        &fetcher,
        BoundaryConfig::new()
            .fallback_render(move |props| {
                *stash.borrow_mut() = Some(props.reset.clone());
                Ok(View::text(format!("caught: {}", props.error)))
            })
            .on_error(|error, info| tracing::info!(%error, stack = %info, "reported error")),
    );
    println!("wrapped type: {}", safe.display_name());

    let mut rt = Runtime::new();
    let root = safe.with_props("AsyncError");
    println!("{}", rt.render(&root).expect("renders"));

    // Deterministic stand-ins for fetched random numbers.
    for fetched in [0.3, 0.7] {
        let Some(handler) = handlers.borrow().clone() else {
            continue;
        };
        if fetched > 0.5 {
            handler.raise(FetchError(fetched));
        } else {
            handler.set(None);
        }
        println!("fetched {fetched}: {}", rt.render(&root).expect("renders"));
    }

    if let Some(handle) = reset_slot.borrow().as_ref() {
        handle.reset();
    }
    println!("after reset: {}", rt.render(&root).expect("renders"));

    // Errors can also be handed over directly while rendering.
    let direct: ComponentType<str> = ComponentType::new("Direct", |_: &str, cx| {
        cx.use_error_handler(Some(CapturedError::msg("given to the hook")))?;
        Ok(View::Empty)
    });
    let direct = with_error_boundary(&direct, BoundaryConfig::new().fallback("direct fallback"));
    println!("{}", Runtime::new().render(&direct.with_props("")).expect("renders"));
}
