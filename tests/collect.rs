// SPDX-License-Identifier: Apache-2.0

use sgx_platform_info::backend::fake::{Call, FakeLoader, Fault, CPU_SVN, PCE_INFO, QE_ID};
use sgx_platform_info::platform::MAX_ENCRYPTED_PPID_SIZE;
use sgx_platform_info::{collect, collect_within, Error, Status};

use std::thread;
use std::time::{Duration, Instant};

fn destroys(calls: &[Call]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, Call::Destroy(_)))
        .count()
}

#[test]
fn happy_path() {
    let loader = FakeLoader::default();
    let journal = loader.journal();

    let info = collect(&loader).unwrap();

    assert_eq!(info.pce_info(), PCE_INFO);
    assert_eq!(info.qe_id(), &QE_ID);
    assert_eq!(info.cpu_svn(), &CPU_SVN);
    assert_eq!(info.encrypted_ppid().len(), MAX_ENCRYPTED_PPID_SIZE);
    assert_eq!(destroys(&journal.calls()), 1);

    let hex = info.to_hex();
    assert_eq!(hex.pce_info.pce_isv_svn, "000d");
    assert_eq!(hex.qe_id, "5a".repeat(16));
    assert_eq!(hex.encrypted_ppid.len(), 2 * MAX_ENCRYPTED_PPID_SIZE);
}

#[test]
fn missing_image() {
    let loader = FakeLoader::new(Fault::Create);
    let journal = loader.journal();

    let err = collect(&loader).unwrap_err();

    assert!(matches!(err, Error::EnclaveCreate(_)));
    assert_eq!(u32::from(err.status()), 0xF009);
    assert_eq!(journal.calls(), vec![Call::Create(1)]);
}

#[test]
fn qe_id_failure_stops_collection() {
    let loader = FakeLoader::new(Fault::QeId);
    let journal = loader.journal();

    let err = collect(&loader).unwrap_err();

    assert_eq!(u32::from(err.status()), 0xF00A);
    assert_eq!(
        journal.calls(),
        vec![
            Call::Create(1),
            Call::PceInfo(1),
            Call::QeId(1),
            Call::Destroy(1)
        ]
    );
}

#[test]
fn oversized_ciphertext_rejected() {
    let loader = FakeLoader::new(Fault::ReportedLength(397));
    let journal = loader.journal();

    match collect(&loader) {
        Err(Error::ContractViolation { detail, .. }) => assert!(detail.contains("397")),
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(destroys(&journal.calls()), 1);
}

#[test]
fn short_ciphertext_accepted() {
    let loader = FakeLoader::new(Fault::ReportedLength(256));

    let info = collect(&loader).unwrap();

    assert_eq!(info.encrypted_ppid().len(), 256);
    assert_eq!(info.to_hex().encrypted_ppid.len(), 512);
}

#[test]
fn every_failure_destroys_once() {
    for fault in [
        Fault::None,
        Fault::PceInfo,
        Fault::QeId,
        Fault::EncryptedIdentity,
        Fault::ReportedLength(0),
        Fault::ReportedLength(385),
    ] {
        let loader = FakeLoader::new(fault);
        let journal = loader.journal();

        let _ = collect(&loader);

        let calls = journal.calls();
        assert_eq!(calls.first(), Some(&Call::Create(1)), "{:?}", fault);
        assert_eq!(calls.last(), Some(&Call::Destroy(1)), "{:?}", fault);
        assert_eq!(destroys(&calls), 1, "{:?}", fault);
    }
}

#[test]
fn repeated_collections_are_independent() {
    let loader = FakeLoader::default();
    let journal = loader.journal();

    let first = collect(&loader).unwrap();
    let second = collect(&loader).unwrap();

    assert_eq!(first.pce_info(), second.pce_info());
    assert_eq!(first.qe_id(), second.qe_id());
    assert_eq!(first.cpu_svn(), second.cpu_svn());
    assert_ne!(
        first.encrypted_ppid().as_bytes(),
        second.encrypted_ppid().as_bytes()
    );

    assert_eq!(journal.instance(1).last(), Some(&Call::Destroy(1)));
    assert_eq!(journal.instance(2).first(), Some(&Call::Create(2)));
}

#[test]
fn concurrent_collections() {
    let loader = FakeLoader::default();
    let journal = loader.journal();

    thread::scope(|s| {
        let workers: Vec<_> = (0..8).map(|_| s.spawn(|| collect(&loader))).collect();

        for worker in workers {
            let info = worker.join().unwrap().unwrap();
            assert_eq!(info.qe_id(), &QE_ID);
        }
    });

    for id in 1..=8 {
        assert_eq!(
            journal.instance(id),
            vec![
                Call::Create(id),
                Call::PceInfo(id),
                Call::QeId(id),
                Call::EncryptedIdentity(id),
                Call::Destroy(id)
            ]
        );
    }
}

#[test]
fn timeout_abandons_worker() {
    let loader = FakeLoader::new(Fault::Stall(Duration::from_millis(500)));
    let journal = loader.journal();

    let start = Instant::now();
    let err = collect_within(loader, Duration::from_millis(50)).unwrap_err();

    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(err.status(), Status::TimedOut);

    // The abandoned worker still releases its enclave.
    let deadline = Instant::now() + Duration::from_secs(10);
    while destroys(&journal.calls()) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(destroys(&journal.calls()), 1);
}
