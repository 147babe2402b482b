//! Dispatcher behavior under concurrent delivery and registration.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use icsneo_rs::{CanMessage, Message, MessageDispatcher, MessageFilter, NetId};

fn can(network: NetId, id: u32) -> Arc<Message> {
    Arc::new(CanMessage::builder(network, id).build().into())
}

#[test]
fn parallel_delivery_reaches_every_handler() {
    let dispatcher = MessageDispatcher::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let registrations: Vec<_> = (0..4)
        .map(|_| {
            let hits = hits.clone();
            dispatcher.register(MessageFilter::for_network(NetId::HsCan), move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect();

    let barrier = Arc::new(Barrier::new(4));
    let threads: Vec<_> = (0..4)
        .map(|_| {
            let d = dispatcher.clone();
            let b = barrier.clone();
            thread::spawn(move || {
                b.wait();
                for i in 0..250 {
                    d.dispatch(can(NetId::HsCan, i));
                    d.dispatch(can(NetId::HsCan2, i));
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), 4 * 250 * 4);
    drop(registrations);
    assert!(dispatcher.is_empty());
}

#[test]
fn no_invocation_after_unregister_returns() {
    let dispatcher = MessageDispatcher::new();
    let removed = Arc::new(AtomicBool::new(false));
    let late_calls = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let r = removed.clone();
    let late = late_calls.clone();
    let registration = dispatcher.register(MessageFilter::any(), move |_| {
        if r.load(Ordering::SeqCst) {
            late.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_micros(50));
        Ok(())
    });

    let senders: Vec<_> = (0..3)
        .map(|_| {
            let d = dispatcher.clone();
            let s = stop.clone();
            thread::spawn(move || {
                while !s.load(Ordering::SeqCst) {
                    d.dispatch(can(NetId::HsCan, 0x1));
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    registration.unregister();
    removed.store(true, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));

    stop.store(true, Ordering::SeqCst);
    for s in senders {
        s.join().unwrap();
    }
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);
    assert!(dispatcher.is_empty());
}

#[test]
fn registration_churn_during_delivery() {
    let dispatcher = MessageDispatcher::new();
    let stop = Arc::new(AtomicBool::new(false));

    let sender = {
        let d = dispatcher.clone();
        let s = stop.clone();
        thread::spawn(move || {
            let mut delivered = 0;
            while !s.load(Ordering::SeqCst) {
                delivered += d.dispatch(can(NetId::HsCan, 0x7E8));
            }
            delivered
        })
    };

    for i in 0..200u32 {
        let filter = if i % 2 == 0 {
            MessageFilter::for_network(NetId::HsCan)
        } else {
            MessageFilter::any().arb_id(0x7E8)
        };
        let registration = dispatcher.register(filter, |_| Ok(()));
        if i % 3 == 0 {
            thread::yield_now();
        }
        drop(registration);
    }

    stop.store(true, Ordering::SeqCst);
    sender.join().unwrap();
    assert!(dispatcher.is_empty());
}
