use std::sync::Arc;
use std::thread;

use sieve::{SieveEngine, SieveError, SieveOutcome, SieveState, SieveWorker};

#[test]
fn test_worker_runs_to_completion() {
    let engine = Arc::new(SieveEngine::new(1_000).unwrap());
    let worker = SieveWorker::spawn(Arc::clone(&engine), 8).unwrap();

    let primes: Vec<u64> = worker.progress().iter().collect();
    assert_eq!(worker.wait().unwrap(), SieveOutcome::Completed);

    assert_eq!(primes.len(), 168);
    assert_eq!(primes.first(), Some(&2));
    assert_eq!(primes.last(), Some(&997));
    assert!(primes.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(engine.latest_prime(), 997);
    assert_eq!(engine.state(), SieveState::Completed);
}

#[test]
fn test_cancel_large_pass() {
    let engine = Arc::new(SieveEngine::new(10_000_000).unwrap());
    let worker = SieveWorker::spawn(Arc::clone(&engine), 16).unwrap();

    let mut reported = Vec::new();
    for _ in 0..10 {
        reported.push(worker.progress().recv().unwrap());
    }

    // The pass cannot get far ahead: the channel holds 16 primes.
    engine.interrupt_sieving();
    reported.extend(worker.progress().iter());
    assert_eq!(worker.wait().unwrap(), SieveOutcome::Cancelled);

    assert_eq!(engine.state(), SieveState::Cancelled);
    assert!(reported.len() < 100, "pass ran on after interrupt: {}", reported.len());
    assert_eq!(engine.latest_prime(), *reported.last().unwrap());
}

#[test]
fn test_stop_is_prompt() {
    let engine = Arc::new(SieveEngine::new(10_000_000).unwrap());
    let worker = SieveWorker::spawn(Arc::clone(&engine), 4).unwrap();
    worker.progress().recv().unwrap();

    assert_eq!(worker.stop().unwrap(), SieveOutcome::Cancelled);
    assert!(!engine.is_running());
    assert!(engine.latest_prime() < 1_000);
}

#[test]
fn test_stop_immediately_after_spawn() {
    let engine = Arc::new(SieveEngine::new(10_000_000).unwrap());
    let worker = SieveWorker::spawn(Arc::clone(&engine), 4).unwrap();

    assert_eq!(worker.stop().unwrap(), SieveOutcome::Cancelled);
    assert_eq!(engine.state(), SieveState::Cancelled);
}

#[test]
fn test_second_pass_is_busy() {
    let engine = Arc::new(SieveEngine::new(200_000).unwrap());
    let worker = SieveWorker::spawn(Arc::clone(&engine), 1).unwrap();
    assert_eq!(worker.progress().recv().unwrap(), 2);

    assert!(matches!(engine.sieve_primes(|_| {}), Err(SieveError::Busy)));
    assert!(matches!(
        SieveWorker::spawn(Arc::clone(&engine), 1),
        Err(SieveError::Busy)
    ));
    assert!(matches!(engine.resize(10), Err(SieveError::Busy)));
    assert!(matches!(engine.data_save("unused.dat"), Err(SieveError::Busy)));
    assert!(matches!(engine.data_load("unused.dat"), Err(SieveError::Busy)));
    assert!(matches!(engine.export_primes("unused.txt"), Err(SieveError::Busy)));
    assert_eq!(engine.sieve_size(), 200_000);

    // The original pass keeps going undisturbed.
    let rest: Vec<u64> = worker.progress().iter().collect();
    assert_eq!(worker.wait().unwrap(), SieveOutcome::Completed);
    assert_eq!(rest.len() + 1, 17_984);
    assert_eq!(engine.latest_prime(), 199_999);
}

#[test]
fn test_interrupt_from_other_thread() {
    let engine = Arc::new(SieveEngine::new(10_000_000).unwrap());
    let worker = SieveWorker::spawn(Arc::clone(&engine), 2).unwrap();
    worker.progress().recv().unwrap();

    let remote = Arc::clone(&engine);
    thread::spawn(move || remote.interrupt_sieving()).join().unwrap();

    let drained = worker.progress().iter().count();
    assert_eq!(worker.wait().unwrap(), SieveOutcome::Cancelled);
    assert!(drained < 50);
}

#[test]
fn test_drop_joins_worker() {
    let engine = Arc::new(SieveEngine::new(10_000_000).unwrap());
    {
        let worker = SieveWorker::spawn(Arc::clone(&engine), 4).unwrap();
        worker.progress().recv().unwrap();
    }
    assert_eq!(engine.state(), SieveState::Cancelled);
    assert_eq!(Arc::strong_count(&engine), 1);
}

#[test]
fn test_resume_in_background_after_stop() {
    let engine = Arc::new(SieveEngine::new(100_000).unwrap());

    let worker = SieveWorker::spawn(Arc::clone(&engine), 4).unwrap();
    let mut primes = vec![worker.progress().recv().unwrap()];
    engine.interrupt_sieving();
    primes.extend(worker.progress().iter());
    assert_eq!(worker.wait().unwrap(), SieveOutcome::Cancelled);

    let worker = SieveWorker::spawn(Arc::clone(&engine), 64).unwrap();
    primes.extend(worker.progress().iter());
    assert_eq!(worker.wait().unwrap(), SieveOutcome::Completed);

    assert_eq!(primes.len(), 9_592);
    assert_eq!(primes.last(), Some(&99_991));
}
