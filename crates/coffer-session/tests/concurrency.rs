//! Concurrent access to the session store.
//!
//! These tests hammer one store from many OS threads and check that no
//! update is lost and that creation happens exactly once per identity.

mod common;

use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use coffer_session::{AttributeValue, Error, SessionId};

use common::{SlowListener, TestStore};

#[test]
fn test_concurrent_distinct_puts_are_all_kept() -> Result<()> {
    let t = TestStore::new();
    let (id, _) = t.store.resolve_or_create(None)?;
    t.store.put_attribute(&id, "key0", AttributeValue::new(0_i32))?;

    let barrier = Barrier::new(9);
    thread::scope(|s| {
        for i in 1..=9_i32 {
            let store = &t.store;
            let id = &id;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                store
                    .put_attribute(id, format!("key{i}"), AttributeValue::new(i))
                    .expect("put failed");
            });
        }
    });

    let names = t.store.attribute_names(&id)?;
    let expected: BTreeSet<String> = (0..=9).map(|i| format!("key{i}")).collect();
    assert_eq!(names, expected);

    for i in 0..=9_i32 {
        let value = t.store.get_attribute(&id, &format!("key{i}"))?.expect("missing attribute");
        assert_eq!(value.downcast_ref::<i32>(), Some(&i));
    }

    t.store.invalidate(&id)?;
    assert!(matches!(t.store.resolve(&id), Err(Error::UnknownSession(_))));

    Ok(())
}

#[test]
fn test_concurrent_replaces_keep_one_offered_value() -> Result<()> {
    let t = TestStore::new();
    let (id, _) = t.store.resolve_or_create(None)?;
    t.store.put_attribute(&id, "a", AttributeValue::new(-1_i32))?;
    t.store.put_attribute(&id, "b", AttributeValue::new(-1_i32))?;

    let barrier = Barrier::new(8);
    thread::scope(|s| {
        for i in 0..8_i32 {
            let store = &t.store;
            let id = &id;
            let barrier = &barrier;
            s.spawn(move || {
                let key = if i % 2 == 0 { "a" } else { "b" };
                barrier.wait();
                let outcome = store
                    .put_attribute(id, key, AttributeValue::new(i))
                    .expect("put failed");
                assert!(!outcome.is_new_key());
            });
        }
    });

    let a = t.store.get_attribute(&id, "a")?.expect("a missing");
    let b = t.store.get_attribute(&id, "b")?.expect("b missing");
    let a = *a.downcast_ref::<i32>().expect("a is not i32");
    let b = *b.downcast_ref::<i32>().expect("b is not i32");
    assert!([0, 2, 4, 6].contains(&a), "unexpected value for a: {a}");
    assert!([1, 3, 5, 7].contains(&b), "unexpected value for b: {b}");
    assert_eq!(t.store.attribute_names(&id)?.len(), 2);

    Ok(())
}

#[test]
fn test_racing_resolutions_create_one_session() -> Result<()> {
    const RACERS: usize = 16;
    let t = TestStore::new();
    // Holds the winner inside creation until every racer has queued.
    t.store
        .listeners()
        .register(Arc::new(SlowListener(Duration::from_millis(100))));
    let stale = SessionId::from("stale-cookie-value");

    let barrier = Barrier::new(RACERS);
    let resolved: Vec<SessionId> = thread::scope(|s| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let store = &t.store;
                let stale = &stale;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    store.resolve_or_create(Some(stale)).expect("resolve failed").0
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("racer panicked"))
            .collect()
    });

    let first = &resolved[0];
    assert_ne!(first, &stale);
    assert!(resolved.iter().all(|id| id == first));
    assert_eq!(t.listener.created(), vec![first.clone()]);
    assert_eq!(t.store.len(), 1);

    Ok(())
}

#[test]
fn test_racing_reconstruction_yields_one_record() -> Result<()> {
    const RACERS: usize = 8;
    let t = TestStore::new();
    let (id, _) = t.store.resolve_or_create(None)?;
    t.store.put_attribute(&id, "n", AttributeValue::new(5_u64))?;
    t.store.evict(&id)?;

    let barrier = Barrier::new(RACERS);
    let records: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let store = &t.store;
                let id = &id;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    store.resolve(id).expect("resolve failed")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("racer panicked"))
            .collect()
    });

    assert!(records.iter().all(|r| Arc::ptr_eq(r, &records[0])));
    assert_eq!(t.listener.created().len(), 1);

    Ok(())
}

#[test]
fn test_puts_racing_evictions_are_not_lost() -> Result<()> {
    let t = TestStore::new();
    let (id, _) = t.store.resolve_or_create(None)?;

    thread::scope(|s| {
        let store = &t.store;
        let id = &id;
        s.spawn(move || {
            for i in 0..200_i32 {
                store
                    .put_attribute(id, format!("k{i}"), AttributeValue::new(i))
                    .expect("put failed");
            }
        });
        s.spawn(move || {
            for _ in 0..50 {
                // The session may be between reconstruction and eviction.
                let _ = store.evict(id);
                thread::yield_now();
            }
        });
    });

    assert_eq!(t.store.attribute_names(&id)?.len(), 200);
    for i in [0_i32, 99, 199] {
        let value = t.store.get_attribute(&id, &format!("k{i}"))?.expect("lost update");
        assert_eq!(value.downcast_ref::<i32>(), Some(&i));
    }
    assert!(t.listener.destroyed().is_empty());

    Ok(())
}

#[test]
fn test_distinct_sessions_in_parallel() -> Result<()> {
    let t = TestStore::new();

    let ids: Vec<SessionId> = thread::scope(|s| {
        let handles: Vec<_> = (0..8_u32)
            .map(|i| {
                let store = &t.store;
                s.spawn(move || {
                    let (id, _) = store.resolve_or_create(None).expect("create failed");
                    for j in 0..50_u32 {
                        store
                            .put_attribute(&id, format!("k{j}"), AttributeValue::new(i * 100 + j))
                            .expect("put failed");
                    }
                    id
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    });

    assert_eq!(ids.iter().collect::<BTreeSet<_>>().len(), 8);
    for id in &ids {
        assert_eq!(t.store.attribute_names(id)?.len(), 50);
    }
    assert_eq!(t.listener.created().len(), 8);

    Ok(())
}
