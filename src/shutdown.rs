//! Cooperative shutdown on SIGINT / SIGTERM.
//!
//! The handlers are installed without `SA_RESTART`, so a signal that arrives
//! while the dispatcher is blocked reading the event socket makes that read
//! fail with `EINTR`.  The reader reports this as
//! [`StreamError::Interrupted`](crate::ipc::reader::StreamError::Interrupted)
//! and the loop sees the cleared running flag before blocking again.

use log::debug;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Flag cleared by the signal handler.  Set once by [`install`].
static RUNNING: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_signal(_signal: libc::c_int) {
    // Only an atomic store: async-signal-safe.
    if let Some(flag) = RUNNING.get() {
        flag.store(false, Ordering::SeqCst);
    }
}

/// Clear `running` when the process receives SIGINT or SIGTERM.
///
/// Only the first flag passed in is ever used.
/// See [`EventDispatcher::run`](crate::dispatch::EventDispatcher::run) for
/// when the loop notices the cleared flag.
pub fn install(running: Arc<AtomicBool>) -> io::Result<()> {
    if RUNNING.set(running).is_err() {
        debug!("interrupt handler already installed");
        return Ok(());
    }

    let handler: extern "C" fn(libc::c_int) = on_signal;
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: `action` is fully initialised before use and `on_signal`
        // only touches an atomic.
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handler as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
