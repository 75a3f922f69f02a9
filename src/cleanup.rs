//! Process-wide cleanup registry.
//!
//! Resources that must be released even when the run is aborted by a signal
//! (temporary repositories, serving state, capture children) register a
//! release action here at acquisition time. Actions run at most once:
//! either through the owning guard's normal teardown, which disarms or
//! claims the entry, or through the signal hook, which drains the registry
//! in reverse registration order before exiting. Once the hook has begun,
//! every other thread parks at its next [`hold_on_termination`] gate so
//! teardown is not raced by the interrupted run.

use std::cell::Cell;
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

/// Exit code reported after signal-driven teardown (128 + SIGINT).
pub const INTERRUPT_EXIT_CODE: i32 = 130;

type Action = Box<dyn FnOnce() + Send>;

struct Entry {
    id: u64,
    label: String,
    action: Action,
}

static ENTRIES: Mutex<Vec<Entry>> = Mutex::new(Vec::new());
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static TERMINATING: AtomicBool = AtomicBool::new(false);

thread_local! {
    // Marks the thread that runs the drain, so its own actions pass the
    // termination gate.
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Handle to a registered cleanup action.
///
/// Dropping the handle leaves the action armed. Call
/// [`CleanupHandle::disarm`] once the resource was released through its
/// regular teardown path.
#[derive(Debug)]
pub struct CleanupHandle {
    id: u64,
}

/// Registers `action` to run on abnormal process termination.
pub fn register(label: &str, action: impl FnOnce() + Send + 'static) -> CleanupHandle {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let mut entries = ENTRIES.lock().unwrap_or_else(|e| e.into_inner());
    entries.push(Entry {
        id,
        label: label.to_string(),
        action: Box::new(action),
    });
    CleanupHandle { id }
}

impl CleanupHandle {
    /// Removes the action without running it.
    pub fn disarm(self) {
        take(self.id);
    }
}

fn take(id: u64) -> Option<Entry> {
    let mut entries = ENTRIES.lock().unwrap_or_else(|e| e.into_inner());
    entries
        .iter()
        .position(|e| e.id == id)
        .map(|idx| entries.remove(idx))
}

/// Parks the calling thread once signal-driven teardown has begun; from
/// that point the signal hook owns the rest of the process lifetime. A
/// no-op before then, and on the draining thread itself.
pub fn hold_on_termination() {
    if DRAINING.with(Cell::get) {
        return;
    }
    while TERMINATING.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
}

/// Disarms `handle` and runs `action` in its place, as one step under the
/// registry lock. A hook that fired first keeps the entry and parks the
/// caller; a hook firing during `action` waits for it before draining the
/// rest. `action` must not register or disarm entries itself.
pub fn run_claimed<T>(handle: CleanupHandle, action: impl FnOnce() -> T) -> T {
    let mut entries = ENTRIES.lock().unwrap_or_else(|e| e.into_inner());
    if TERMINATING.load(Ordering::SeqCst) {
        drop(entries);
        loop {
            thread::sleep(Duration::from_millis(50));
        }
    }
    if let Some(idx) = entries.iter().position(|e| e.id == handle.id) {
        entries.remove(idx);
    }
    DRAINING.with(|d| d.set(true));
    let result = action();
    DRAINING.with(|d| d.set(false));
    result
}

/// Runs every armed action, most recently registered first.
fn drain() {
    DRAINING.with(|d| d.set(true));
    loop {
        let entry = {
            let mut entries = ENTRIES.lock().unwrap_or_else(|e| e.into_inner());
            entries.pop()
        };
        match entry {
            Some(entry) => {
                debug!("running registered cleanup: {}", entry.label);
                (entry.action)();
            }
            None => break,
        }
    }
}

/// Installs the SIGINT/SIGTERM hook that drains the registry and exits.
pub fn install_signal_hook() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        if let Err(e) = ctrlc::set_handler(|| {
            TERMINATING.store(true, Ordering::SeqCst);
            warn!("termination requested, releasing resources");
            drain();
            process::exit(INTERRUPT_EXIT_CODE);
        }) {
            warn!("could not install termination handler: {e}");
        }
    });
}
