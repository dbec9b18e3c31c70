/*!
 * Time Slicing Tests
 * Quantum expiry, sleeping and yielding driven by the kernel clock
 */

mod common;

use common::{entries, log, manual_kernel, wait_for_state, wait_until};
use pretty_assertions::assert_eq;
use rtk::{ClockMode, ExitStatus, Kernel, KernelConfig, ProcessClass, ProcessState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_quantum_expiry_requeues_at_tail() {
    let kernel = Kernel::new(KernelConfig::manual().with_quantum_ticks(2)).unwrap();
    let log = log();
    let (started_tx, started_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let hog = {
        let log = log.clone();
        kernel
            .spawn("hog", ProcessClass::TimeSliced, move |ctx| {
                started_tx.send(()).unwrap();
                go_rx.recv().unwrap();
                ctx.checkpoint()?;
                log.lock().push("hog".to_string());
                Ok(())
            })
            .unwrap()
    };
    let polite = {
        let log = log.clone();
        kernel
            .spawn("polite", ProcessClass::TimeSliced, move |_ctx| {
                log.lock().push("polite".to_string());
                Ok(())
            })
            .unwrap()
    };

    kernel.start_scheduler().unwrap();
    started_rx.recv().unwrap();
    assert_eq!(kernel.current(), Some(hog));
    assert_eq!(kernel.ready_snapshot(ProcessClass::TimeSliced), vec![polite]);

    kernel.tick(1);
    assert_eq!(kernel.current(), Some(hog));
    assert_eq!(kernel.stats().quantum_expiries, 0);

    kernel.tick(1);
    assert_eq!(kernel.stats().quantum_expiries, 1);
    assert_ne!(kernel.current(), Some(hog));

    // The expired process is parked at its checkpoint until polite finishes
    go_tx.send(()).unwrap();
    assert_eq!(kernel.join(polite).unwrap(), ExitStatus::Completed);
    assert_eq!(kernel.join(hog).unwrap(), ExitStatus::Completed);
    kernel.stop_scheduler().unwrap();

    assert_eq!(entries(&log), vec!["polite", "hog"]);
    assert_eq!(kernel.stats().invariant_violations, 0);
}

#[test]
fn test_real_time_has_no_quantum() {
    let kernel = manual_kernel();
    let (started_tx, started_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let rt = kernel
        .spawn("rt", ProcessClass::RealTime, move |ctx| {
            started_tx.send(()).unwrap();
            go_rx.recv().unwrap();
            ctx.checkpoint()?;
            Ok(())
        })
        .unwrap();

    kernel.start_scheduler().unwrap();
    started_rx.recv().unwrap();

    kernel.tick(100);
    assert_eq!(kernel.current(), Some(rt));
    assert_eq!(kernel.state(rt).unwrap(), ProcessState::Running);
    assert_eq!(kernel.stats().quantum_expiries, 0);

    go_tx.send(()).unwrap();
    assert_eq!(kernel.join(rt).unwrap(), ExitStatus::Completed);
    kernel.stop_scheduler().unwrap();
    assert_eq!(kernel.stats().ticks, 100);
}

#[test]
fn test_sleep_delays_for_ticks() {
    let kernel = manual_kernel();
    let sleeper = kernel
        .spawn("sleeper", ProcessClass::RealTime, |ctx| {
            ctx.sleep(3)?;
            Ok(())
        })
        .unwrap();

    kernel.start_scheduler().unwrap();
    wait_for_state(&kernel, sleeper, ProcessState::Delayed);
    assert_eq!(kernel.current(), None);

    kernel.tick(2);
    assert_eq!(kernel.state(sleeper).unwrap(), ProcessState::Delayed);

    kernel.tick(1);
    assert_eq!(kernel.join(sleeper).unwrap(), ExitStatus::Completed);
    kernel.stop_scheduler().unwrap();

    let stats = kernel.stats();
    assert_eq!(stats.sleeps, 1);
    assert_eq!(stats.ticks, 3);
}

#[test]
fn test_sleepers_wake_in_absolute_order() {
    let kernel = manual_kernel();
    let log = log();

    let pids: Vec<_> = [5u64, 3, 2]
        .into_iter()
        .map(|ticks| {
            let log = log.clone();
            kernel
                .spawn(&format!("sleep{}", ticks), ProcessClass::RealTime, move |ctx| {
                    ctx.sleep(ticks)?;
                    log.lock().push(ticks.to_string());
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    kernel.start_scheduler().unwrap();
    for pid in &pids {
        wait_for_state(&kernel, *pid, ProcessState::Delayed);
    }

    for tick in 1..=5 {
        kernel.tick(1);
        let expected = [2u64, 3, 5].iter().filter(|&&t| t <= tick).count();
        wait_until("sleepers to log", || log.lock().len() == expected);
    }

    for pid in pids {
        kernel.join(pid).unwrap();
    }
    kernel.stop_scheduler().unwrap();

    assert_eq!(entries(&log), vec!["2", "3", "5"]);
}

#[test]
fn test_yield_rotates_within_class() {
    let kernel = manual_kernel();
    let log = log();

    let a = {
        let log = log.clone();
        kernel
            .spawn("a", ProcessClass::TimeSliced, move |ctx| {
                log.lock().push("a1".to_string());
                ctx.yield_now()?;
                log.lock().push("a2".to_string());
                Ok(())
            })
            .unwrap()
    };
    let b = {
        let log = log.clone();
        kernel
            .spawn("b", ProcessClass::TimeSliced, move |_ctx| {
                log.lock().push("b".to_string());
                Ok(())
            })
            .unwrap()
    };

    kernel.start_scheduler().unwrap();
    kernel.join(a).unwrap();
    kernel.join(b).unwrap();
    kernel.stop_scheduler().unwrap();

    assert_eq!(entries(&log), vec!["a1", "b", "a2"]);
    assert_eq!(kernel.stats().yields, 1);
}

#[test]
fn test_sleep_zero_yields() {
    let kernel = manual_kernel();
    let pid = kernel
        .spawn("napper", ProcessClass::TimeSliced, |ctx| {
            ctx.sleep(0)?;
            Ok(())
        })
        .unwrap();

    kernel.start_scheduler().unwrap();
    assert_eq!(kernel.join(pid).unwrap(), ExitStatus::Completed);
    kernel.stop_scheduler().unwrap();

    let stats = kernel.stats();
    assert_eq!(stats.sleeps, 0);
    assert_eq!(stats.yields, 1);
}

#[test]
fn test_interval_clock_preempts_busy_processes() {
    let config = KernelConfig::default()
        .with_clock(ClockMode::Interval(Duration::from_millis(1)))
        .with_quantum_ticks(2)
        .with_invariant_checks(true);
    let kernel = Kernel::new(config).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let pids: Vec<_> = (0..2)
        .map(|i| {
            let stop = stop.clone();
            kernel
                .spawn(&format!("busy{}", i), ProcessClass::TimeSliced, move |ctx| {
                    while !stop.load(Ordering::Relaxed) {
                        ctx.checkpoint()?;
                        std::thread::yield_now();
                    }
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    kernel.start_scheduler().unwrap();
    wait_until("several quantum expiries", || kernel.stats().quantum_expiries >= 4);
    stop.store(true, Ordering::Relaxed);

    for pid in pids {
        assert_eq!(kernel.join(pid).unwrap(), ExitStatus::Completed);
    }
    kernel.stop_scheduler().unwrap();

    let stats = kernel.stats();
    assert!(stats.dispatches >= 4);
    assert_eq!(stats.invariant_violations, 0);
}
