/*!
 * Dispatch Tests
 * Class priority and FIFO ordering of the dispatch loop
 */

mod common;

use common::{entries, log, manual_kernel, wait_until};
use pretty_assertions::assert_eq;
use rtk::{ExitStatus, ProcessClass, ProcessState};
use std::sync::mpsc;

#[test]
fn test_real_time_dispatched_before_time_sliced() {
    let kernel = manual_kernel();
    let log = log();

    let mut pids = Vec::new();
    for (name, class) in [
        ("ts1", ProcessClass::TimeSliced),
        ("rt1", ProcessClass::RealTime),
        ("ts2", ProcessClass::TimeSliced),
        ("rt2", ProcessClass::RealTime),
    ] {
        let log = log.clone();
        let pid = kernel
            .spawn(name, class, move |_ctx| {
                log.lock().push(name.to_string());
                Ok(())
            })
            .unwrap();
        pids.push(pid);
    }

    assert_eq!(kernel.ready_snapshot(ProcessClass::RealTime), vec![pids[1], pids[3]]);
    assert_eq!(kernel.ready_snapshot(ProcessClass::TimeSliced), vec![pids[0], pids[2]]);

    kernel.start_scheduler().unwrap();
    for pid in &pids {
        assert_eq!(kernel.join(*pid).unwrap(), ExitStatus::Completed);
    }
    kernel.stop_scheduler().unwrap();

    assert_eq!(entries(&log), vec!["rt1", "rt2", "ts1", "ts2"]);

    let stats = kernel.stats();
    assert_eq!(stats.dispatches, 4);
    assert_eq!(stats.terminations, 4);
    assert_eq!(stats.invariant_violations, 0);
}

#[test]
fn test_fifo_within_class() {
    let kernel = manual_kernel();
    let log = log();

    let pids: Vec<_> = (0..5)
        .map(|i| {
            let log = log.clone();
            kernel
                .spawn(&format!("ts{}", i), ProcessClass::TimeSliced, move |_ctx| {
                    log.lock().push(format!("ts{}", i));
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    kernel.start_scheduler().unwrap();
    for pid in pids {
        kernel.join(pid).unwrap();
    }
    kernel.stop_scheduler().unwrap();

    assert_eq!(entries(&log), vec!["ts0", "ts1", "ts2", "ts3", "ts4"]);
}

#[test]
fn test_real_time_arriving_during_dispatch_goes_next() {
    let kernel = manual_kernel();
    let log = log();
    let (started_tx, started_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let first = {
        let log = log.clone();
        kernel
            .spawn("first", ProcessClass::TimeSliced, move |_ctx| {
                started_tx.send(()).unwrap();
                go_rx.recv().unwrap();
                log.lock().push("first".to_string());
                Ok(())
            })
            .unwrap()
    };

    kernel.start_scheduler().unwrap();
    started_rx.recv().unwrap();
    assert_eq!(kernel.current(), Some(first));

    let mut later = Vec::new();
    for (name, class) in [
        ("ts", ProcessClass::TimeSliced),
        ("rt", ProcessClass::RealTime),
    ] {
        let log = log.clone();
        later.push(
            kernel
                .spawn(name, class, move |_ctx| {
                    log.lock().push(name.to_string());
                    Ok(())
                })
                .unwrap(),
        );
    }

    // Neither newcomer may take the CPU from the running process
    assert_eq!(kernel.current(), Some(first));
    kernel.check_invariants().unwrap();

    go_tx.send(()).unwrap();
    for pid in [first, later[0], later[1]] {
        kernel.join(pid).unwrap();
    }
    kernel.stop_scheduler().unwrap();

    assert_eq!(entries(&log), vec!["first", "rt", "ts"]);
}

#[test]
fn test_processes_snapshot_before_dispatch() {
    let kernel = manual_kernel();
    let a = kernel.spawn("alpha", ProcessClass::RealTime, |_ctx| Ok(())).unwrap();
    let b = kernel.spawn("beta", ProcessClass::TimeSliced, |_ctx| Ok(())).unwrap();

    let infos = kernel.processes();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].pid, a);
    assert_eq!(infos[0].name, "alpha");
    assert_eq!(infos[0].class, ProcessClass::RealTime);
    assert_eq!(infos[1].pid, b);
    assert!(infos.iter().all(|i| i.state == ProcessState::Ready));
    assert_eq!(kernel.current(), None);

    let reaped = kernel.shutdown();
    assert_eq!(reaped, vec![(a, ExitStatus::Killed), (b, ExitStatus::Killed)]);
    assert!(kernel.processes().is_empty());
}

#[test]
fn test_idle_scheduler_wakes_for_new_process() {
    let kernel = manual_kernel();
    kernel.start_scheduler().unwrap();

    let stats_before = kernel.stats();
    assert_eq!(stats_before.dispatches, 0);

    let pid = kernel.spawn("late", ProcessClass::TimeSliced, |_ctx| Ok(())).unwrap();
    assert_eq!(kernel.join(pid).unwrap(), ExitStatus::Completed);
    wait_until("dispatch counted", || kernel.stats().dispatches == 1);

    kernel.stop_scheduler().unwrap();
}
