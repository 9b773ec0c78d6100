//! `SIGINT`/`SIGTERM` handling for the reception process: a graceful exit
//! that drains the fleet via `KitchenManager::shutdown` rather than dying
//! mid-dispatch.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SigHandler, Signal};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signal: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Install handlers for `SIGINT` and `SIGTERM` that set a flag the REPL
/// checks between lines, instead of letting the default action tear the
/// process down mid-dispatch.
pub fn install() -> Result<(), anyhow::Error> {
    // SAFETY: `request_shutdown` only stores to an atomic, which is safe to
    // do from a signal handler.
    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::Handler(request_shutdown))?;
        signal::signal(Signal::SIGTERM, SigHandler::Handler(request_shutdown))?;
    }
    Ok(())
}

/// Whether a shutdown signal has arrived since the process started.
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
