/*!
 * Shared test helpers
 */

#![allow(dead_code)]

use parking_lot::Mutex;
use rtk::{Kernel, KernelConfig, Pid, ProcessState};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

/// Kernel with a manual clock and the invariant audit enabled
pub fn manual_kernel() -> Kernel {
    Kernel::new(KernelConfig::manual()).unwrap()
}

/// Poll `cond` until it holds, panicking after a generous timeout
pub fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        thread::sleep(Duration::from_millis(1));
    }
}

pub fn wait_for_state(kernel: &Kernel, pid: Pid, state: ProcessState) {
    wait_until(&format!("process {} to be {}", pid, state), || {
        kernel.state(pid).ok() == Some(state)
    });
}
