//! Resize and termination notifications
//!
//! Handlers only store to static flags. The main loop polls and clears them
//! at the top of each tick.

use nix::libc;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);
static TERMINATE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("cannot install SIGWINCH handler: {0}")]
    Resize(#[from] nix::Error),
    #[error("cannot install termination handler: {0}")]
    Terminate(#[from] ctrlc::Error),
}

extern "C" fn on_winch(_: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

/// Install the SIGWINCH handler and the SIGINT/SIGTERM handler.
pub fn install() -> Result<(), SignalError> {
    let action = SigAction::new(
        SigHandler::Handler(on_winch),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only performs an atomic store.
    unsafe { sigaction(Signal::SIGWINCH, &action) }?;

    ctrlc::set_handler(|| TERMINATE.store(true, Ordering::SeqCst))?;
    Ok(())
}

/// Consume a pending resize notification
pub fn take_resize() -> bool {
    RESIZE_PENDING.swap(false, Ordering::SeqCst)
}

/// Raise the resize flag as if SIGWINCH had arrived
pub fn notify_resize() {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

pub fn terminate_requested() -> bool {
    TERMINATE.load(Ordering::SeqCst)
}

pub fn request_terminate() {
    TERMINATE.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_flag_is_consumed_once() {
        notify_resize();
        assert!(take_resize());
        assert!(!take_resize());

        on_winch(libc::SIGWINCH);
        assert!(take_resize());
    }
}
