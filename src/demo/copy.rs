/*!
 * Producer/Consumer File Copy
 *
 * Two processes hand bytes across a one-slot buffer guarded by two
 * semaphores: `empty` (starts at 1) and `full` (starts at 0). The producer
 * publishes `None` after the last byte so the consumer knows to stop.
 *
 * A process that fails destroys both semaphores, which releases its peer
 * with an invalid-handle error instead of leaving it blocked forever.
 */

use crate::core::errors::KernelError;
use crate::core::types::{Pid, ProcessClass, SemaphoreHandle};
use crate::kernel::{Kernel, ProcessContext};
use crate::process::ProcessResult;
use anyhow::{bail, Context};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a completed copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub bytes: u64,
    pub producer: Pid,
    pub consumer: Pid,
}

#[derive(Clone)]
struct Handoff {
    empty: SemaphoreHandle,
    full: SemaphoreHandle,
    slot: Arc<Mutex<Option<u8>>>,
    copied: Arc<AtomicU64>,
}

impl Handoff {
    /// Destroy both semaphores, releasing any process blocked on them
    ///
    /// Either side may get here first, so a handle that is already gone is
    /// expected.
    fn abort(&self, kernel: &Kernel) {
        for sem in [self.empty, self.full] {
            match kernel.destroy_semaphore(sem) {
                Ok(()) | Err(KernelError::InvalidHandle(..)) => {}
                Err(e) => debug!(%sem, error = %e, "Failed to destroy handoff semaphore"),
            }
        }
    }
}

fn produce<R: Read>(ctx: &ProcessContext, handoff: &Handoff, source: R) -> ProcessResult {
    let mut bytes = BufReader::new(source).bytes();
    loop {
        ctx.wait(handoff.empty)?;
        let byte = bytes.next().transpose()?;
        *handoff.slot.lock() = byte;
        ctx.signal(handoff.full)?;

        if byte.is_none() {
            debug!(pid = %ctx.pid(), "Producer reached end of input");
            return Ok(());
        }
    }
}

fn consume<W: Write>(ctx: &ProcessContext, handoff: &Handoff, sink: W) -> ProcessResult {
    let mut out = BufWriter::new(sink);
    loop {
        ctx.wait(handoff.full)?;
        let byte = *handoff.slot.lock();
        ctx.signal(handoff.empty)?;

        match byte {
            Some(b) => {
                out.write_all(&[b])?;
                handoff.copied.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                out.flush()?;
                debug!(pid = %ctx.pid(), "Consumer reached end of stream");
                return Ok(());
            }
        }
    }
}

/// Copy `src` to `dst` through a producer and a consumer process of `class`
///
/// The kernel's scheduler must already be running.
pub fn copy_file(
    kernel: &Kernel,
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    class: ProcessClass,
) -> anyhow::Result<CopyReport> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if !kernel.is_running() {
        bail!("scheduler is not running");
    }

    let source = File::open(src).with_context(|| format!("opening {}", src.display()))?;
    let sink = File::create(dst).with_context(|| format!("creating {}", dst.display()))?;

    let handoff = Handoff {
        empty: kernel.create_semaphore(1),
        full: kernel.create_semaphore(0),
        slot: Arc::new(Mutex::new(None)),
        copied: Arc::new(AtomicU64::new(0)),
    };

    let h = handoff.clone();
    let producer = kernel
        .spawn("Producer", class, move |ctx| {
            produce(&ctx, &h, source).inspect_err(|_| h.abort(ctx.kernel()))
        })
        .inspect_err(|_| handoff.abort(kernel))?;

    let h = handoff.clone();
    let consumer = kernel.spawn("Consumer", class, move |ctx| {
        consume(&ctx, &h, sink).inspect_err(|_| h.abort(ctx.kernel()))
    });
    let consumer = match consumer {
        Ok(pid) => pid,
        Err(e) => {
            // The producer would otherwise wait on `empty` forever
            match kernel.terminate(producer) {
                Ok(()) | Err(KernelError::DoubleTerminate(_)) => {}
                Err(err) => warn!(pid = %producer, error = %err, "Failed to stop producer"),
            }
            handoff.abort(kernel);
            let status = kernel.join(producer)?;
            debug!(pid = %producer, ?status, "Producer reaped after consumer spawn failed");
            return Err(e).context("spawning consumer");
        }
    };

    let produced = kernel.join(producer)?;
    let consumed = kernel.join(consumer)?;

    if !produced.is_success() {
        bail!("producer {} ended with {:?}", producer, produced);
    }
    if !consumed.is_success() {
        bail!("consumer {} ended with {:?}", consumer, consumed);
    }

    kernel.destroy_semaphore(handoff.empty)?;
    kernel.destroy_semaphore(handoff.full)?;

    let bytes = handoff.copied.load(Ordering::Relaxed);
    info!(src = %src.display(), dst = %dst.display(), bytes, "File copied");
    Ok(CopyReport {
        bytes,
        producer,
        consumer,
    })
}
