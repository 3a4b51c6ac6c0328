//! Interactive interrupt handling.
//!
//! SIGINT, SIGQUIT and SIGTSTP never terminate or stop the shell. The
//! handler only raises a flag; the line loop checks it between stages and
//! abandons the current line, and interrupted reads return to the loop.
//! Handlers are installed without `SA_RESTART` so a blocking read or wait
//! is woken up with `EINTR`.

use nix::libc::c_int;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Signals that cancel the line being processed.
pub const INTERACTIVE_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTSTP];

extern "C" fn on_interactive_signal(_signal: c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the shell's handler for [`INTERACTIVE_SIGNALS`].
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_interactive_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in INTERACTIVE_SIGNALS {
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
        unsafe { sigaction(signal, &action) }?;
    }
    tracing::debug!("interactive signal handlers installed");
    Ok(())
}

/// Dispositions for a freshly forked child.
///
/// Interrupt and quit get their default action back so Ctrl-C reaches the
/// program being run. The stop signal is ignored: the shell has no job
/// control to resume a stopped child.
pub(crate) fn reset_for_child() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    // SAFETY: installing SIG_DFL/SIG_IGN runs no user code.
    unsafe {
        let _ = sigaction(Signal::SIGINT, &default);
        let _ = sigaction(Signal::SIGQUIT, &default);
        let _ = sigaction(Signal::SIGTSTP, &ignore);
    }
}

/// Whether a cancellation is pending.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Consume a pending cancellation.
pub fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}
