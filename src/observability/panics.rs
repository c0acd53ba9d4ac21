//! Panic reporting.
//!
//! # Responsibilities
//! - Keep panics that a recovery boundary catches off stderr, so the boundary's
//!   own record is the only report
//! - Remember where the last contained panic on this thread happened
//! - Leave every other panic to the previously installed hook
//!
//! # Design Decisions
//! - A boundary marks the polls it runs with [`contained`]; the hook runs on
//!   the panicking thread, inside that poll, before the unwind reaches
//!   `catch_unwind`
//! - The hook is installed once per process

use std::cell::{Cell, RefCell};
use std::future::{poll_fn, Future};
use std::panic;
use std::pin::pin;
use std::sync::Once;

thread_local! {
    static CONTAINED_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Install the process-wide panic hook. Later calls do nothing.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAINED_DEPTH.with(Cell::get) > 0 {
                let location = info.location().map(|location| location.to_string());
                LAST_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `future` as a recovery boundary: panics raised while it is polled are
/// left to the caller's `catch_unwind` to report.
pub fn contained<F: Future>(future: F) -> impl Future<Output = F::Output> {
    async move {
        let mut future = pin!(future);
        poll_fn(|cx| {
            let _scope = Scope::enter();
            future.as_mut().poll(cx)
        })
        .await
    }
}

/// Take the location recorded by the most recent contained panic on this thread.
pub fn take_location() -> Option<String> {
    LAST_LOCATION.with(|slot| slot.borrow_mut().take())
}

struct Scope;

impl Scope {
    fn enter() -> Self {
        CONTAINED_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Scope
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        CONTAINED_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}
