/*!
 * Software Clock
 * Timer thread delivering ticks at a fixed period
 */

use super::traits::TickSink;
use crate::core::limits::CLOCK_THREAD_NAME;
use crate::core::types::Ticks;
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

/// Handle to the timer thread
pub struct ClockTask {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<Ticks>>,
}

impl ClockTask {
    pub fn spawn(sink: Arc<dyn TickSink>, period: Duration) -> io::Result<Self> {
        let stop = Arc::new(StopSignal {
            stopped: Mutex::new(false),
            cv: Condvar::new(),
        });
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(CLOCK_THREAD_NAME.into())
            .spawn(move || run_clock(sink, period, thread_stop))?;

        info!(?period, "Clock task spawned");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the timer and wait for it; returns ticks delivered
    pub fn shutdown(mut self) -> Ticks {
        *self.stop.stopped.lock() = true;
        self.stop.cv.notify_all();

        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(ticks)) => ticks,
            Some(Err(_)) => {
                warn!("Clock task panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for ClockTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            *self.stop.stopped.lock() = true;
            self.stop.cv.notify_all();
        }
    }
}

fn run_clock(sink: Arc<dyn TickSink>, period: Duration, stop: Arc<StopSignal>) -> Ticks {
    let start = Instant::now();
    let period_nanos = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX).max(1);
    let mut delivered: Ticks = 0;
    let mut stopped = stop.stopped.lock();

    while !*stopped {
        let deadline =
            start + Duration::from_nanos(period_nanos.saturating_mul(delivered + 1));
        if !stop.cv.wait_until(&mut stopped, deadline).timed_out() {
            continue;
        }

        // Catch up on ticks missed while descheduled instead of drifting
        let due = (start.elapsed().as_nanos() / u128::from(period_nanos)) as Ticks;
        let ticks = due.saturating_sub(delivered).max(1);
        delivered += ticks;

        drop(stopped);
        sink.tick(ticks);
        stopped = stop.stopped.lock();
    }

    info!(delivered, "Clock task stopped");
    delivered
}
