//! End-to-end concurrency tests: the operation gate rejects overlapping
//! requests of the same kind while letting independent kinds proceed.

use std::sync::Arc;
use std::time::Duration;

use sheetdock_core::automation::memory::{MemoryAutomation, MemoryDocument};
use sheetdock_core::error::OpBusy;
use sheetdock_core::ops::{OpGate, OpKind};
use sheetdock_core::scanner::{start_scan, ScanProgress};

/// While one scan worker is in flight, a second scan request is rejected
/// with busy, no second automation session is created, and after the first
/// finishes a new scan is accepted again.
#[test]
fn overlapping_scan_is_rejected_then_accepted_after_completion() {
    let automation = Arc::new(MemoryAutomation::new());
    automation.add_document(MemoryDocument::new("C:/books/a.xlsx"));

    // Hold the worker inside connect until we release it.
    let (release, gate_rx) = crossbeam_channel::bounded::<()>(1);
    automation.set_connect_gate(gate_rx);

    let gate = OpGate::new();
    let first = start_scan(&gate, automation.clone(), " - Excel".to_string()).unwrap();

    assert!(gate.is_busy(OpKind::Scan));
    let rejected = start_scan(&gate, automation.clone(), " - Excel".to_string());
    assert!(matches!(rejected, Err(OpBusy(OpKind::Scan))));

    // A different kind is not excluded by the running scan.
    let permit = gate.try_acquire(OpKind::LinkUpdate).unwrap();
    drop(permit);

    release.send(()).unwrap();
    let inventory = loop {
        match first
            .progress_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("scan must complete")
        {
            ScanProgress::Complete { inventory, .. } => break inventory,
            ScanProgress::Failed { message } => panic!("scan failed: {message}"),
            _ => {}
        }
    };

    assert_eq!(inventory.len(), 1);
    // The rejected request never reached the automation layer.
    assert_eq!(automation.connect_count(), 1);

    // Permit released on worker exit; scanning is available again. The
    // drop can race the final send by a frame, so poll briefly.
    let mut accepted = false;
    for _ in 0..100 {
        if !gate.is_busy(OpKind::Scan) {
            accepted = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(accepted, "scan permit was not released after completion");
    drop(start_scan(&gate, automation.clone(), " - Excel".to_string()).unwrap());
}

/// A scan against an unreachable application fails fast with a terminal
/// failure event and releases its permit.
#[test]
fn unreachable_application_fails_the_scan_terminally() {
    let automation = Arc::new(MemoryAutomation::new());
    automation.set_available(false);

    let gate = OpGate::new();
    let handle = start_scan(&gate, automation.clone(), " - Excel".to_string()).unwrap();

    let terminal = handle
        .progress_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("scan must emit a terminal event");
    match terminal {
        ScanProgress::Failed { message } => {
            assert!(message.contains("no running"), "got: {message}")
        }
        other => panic!("expected a failure, got {other:?}"),
    }
}
