use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn counted(value: u32) -> (OwnedRef<u32>, Arc<AtomicUsize>) {
    let releases = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&releases);
    let r = OwnedRef::of(value, move |_v: u32| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (r, releases)
}

#[test]
fn of_starts_with_single_reference() {
    let (r, releases) = counted(7);
    assert!(r.is_valid());
    assert_eq!(r.ref_count(), 1);
    assert_eq!(*r.get().unwrap(), 7);
    drop(r);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn release_fires_once_after_last_close() {
    let (mut a, releases) = counted(1);
    let mut b = a.clone();
    let mut c = b.clone();
    assert_eq!(a.ref_count(), 3);
    assert!(a.ptr_eq(&c));

    assert!(!b.close());
    assert_eq!(releases.load(Ordering::SeqCst), 0);
    assert!(!a.close());
    assert_eq!(releases.load(Ordering::SeqCst), 0);
    assert_eq!(c.ref_count(), 1);
    assert!(c.close());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn close_is_idempotent() {
    let (mut a, releases) = counted(1);
    let mut b = a.clone();
    for _ in 0..5 {
        a.close();
    }
    assert_eq!(releases.load(Ordering::SeqCst), 0);
    assert_eq!(b.ref_count(), 1);
    assert!(b.close());
    assert!(!b.close());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn access_after_close_fails_loudly() {
    let (mut a, _releases) = counted(3);
    a.close();
    assert!(matches!(a.get(), Err(ReelError::Closed(_))));
    assert!(matches!(a.get_mut(), Err(ReelError::Closed(_))));
    assert_eq!(a.ref_count(), 0);
}

#[test]
fn clone_of_closed_ref_is_empty() {
    let (mut a, releases) = counted(3);
    a.close();
    let mut b = a.clone();
    assert!(!b.is_valid());
    assert!(a.clone_if_valid().is_none());
    b.close();
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn get_mut_requires_exclusive_handle() {
    let mut a = OwnedRef::new(vec![0u8; 4]);
    a.get_mut().unwrap()[0] = 9;

    let b = a.clone();
    assert!(matches!(a.get_mut(), Err(ReelError::Shared(_))));
    assert_eq!(b.get().unwrap()[0], 9);
    drop(b);
    assert!(a.get_mut().is_ok());
}

#[test]
fn releaser_receives_the_value() {
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&seen);
    let r = OwnedRef::of(42usize, move |v: usize| {
        sink.store(v, Ordering::SeqCst);
    });
    let r2 = r.clone();
    drop(r);
    assert_eq!(seen.load(Ordering::SeqCst), 0);
    drop(r2);
    assert_eq!(seen.load(Ordering::SeqCst), 42);
}

#[test]
fn close_all_closes_every_handle() {
    let (a, releases) = counted(5);
    let mut refs = vec![a.clone(), a.clone(), a];
    close_all(refs.iter_mut());
    assert!(refs.iter().all(|r| !r.is_valid()));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(!is_valid(refs.first()));
    assert!(!is_valid::<u32>(None));
}

#[test]
fn concurrent_clone_and_close_release_exactly_once() {
    for _ in 0..32 {
        let (root, releases) = counted(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                let mut local = root.clone();
                s.spawn(move || {
                    let mut extra: Vec<_> = (0..16).map(|_| local.clone()).collect();
                    close_all(extra.iter_mut());
                    local.close();
                });
            }
        });
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        drop(root);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn concurrent_last_closes_release_exactly_once() {
    for _ in 0..64 {
        let (root, releases) = counted(0);
        let handles: Vec<_> = (0..4).map(|_| root.clone()).collect();
        drop(root);
        std::thread::scope(|s| {
            for mut h in handles {
                s.spawn(move || {
                    h.close();
                });
            }
        });
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
