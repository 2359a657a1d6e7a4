use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use tickline::core::{BufferEvent, RawSample, SampleBuffer};

fn raw(ts: i64, price: f64) -> RawSample {
    RawSample::new(ts, price, 100, ts as u64)
}

#[test]
fn query_operations_share_one_ordered_view() {
    let mut buffer = SampleBuffer::new(16).expect("capacity");
    buffer.add_sample(raw(1_000, 100.0), 1_000).expect("add");
    buffer.add_sample(raw(1_100, 101.0), 1_100).expect("add");
    buffer.add_sample(raw(1_200, 102.0), 1_200).expect("add");

    let latest: Vec<i64> = buffer.latest(2).iter().map(|s| s.timestamp_ms).collect();
    assert_eq!(latest, vec![1_100, 1_200]);

    let ranged: Vec<i64> = buffer
        .in_range(1_050, 1_150)
        .iter()
        .map(|s| s.timestamp_ms)
        .collect();
    assert_eq!(ranged, vec![1_100]);

    // Inverted bounds describe an empty interval.
    assert!(buffer.in_range(1_150, 1_050).is_empty());
}

#[test]
fn latest_returns_fewer_when_buffer_is_shorter() {
    let mut buffer = SampleBuffer::new(16).expect("capacity");
    buffer.add_sample(raw(1_000, 100.0), 1_000).expect("add");
    assert_eq!(buffer.latest(10).len(), 1);
    assert!(buffer.latest(0).is_empty());
}

#[test]
fn frequency_window_drops_arrivals_older_than_a_minute() {
    let mut buffer = SampleBuffer::new(64).expect("capacity");
    buffer.add_sample(raw(0, 100.0), 0).expect("add");
    buffer.add_sample(raw(30_000, 101.0), 30_000).expect("add");
    buffer.add_sample(raw(65_000, 102.0), 65_000).expect("add");

    let stats = buffer.frequency_stats(65_000);
    // The arrival at t=0 aged out of the trailing 60s.
    assert_eq!(stats.last_minute_count, 2);
    assert_eq!(stats.total_received, 3);
    assert!((stats.average_frequency - 2.0 / 60.0).abs() < 1e-12);
}

#[test]
fn total_received_counts_evicted_samples() {
    let mut buffer = SampleBuffer::new(2).expect("capacity");
    for i in 0..5 {
        buffer.add_sample(raw(i, 100.0), i).expect("add");
    }
    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.total_received(), 5);
}

#[test]
fn clear_notifies_and_resets_statistics() {
    let mut buffer = SampleBuffer::new(16).expect("capacity");
    let cleared = Rc::new(RefCell::new(false));

    let cleared_clone = Rc::clone(&cleared);
    buffer.subscribe(move |event| {
        if matches!(event, BufferEvent::Cleared) {
            *cleared_clone.borrow_mut() = true;
        }
    });

    buffer.add_sample(raw(1_000, 100.0), 1_000).expect("add");
    buffer.clear();

    assert!(*cleared.borrow());
    assert!(buffer.is_empty());
    assert_eq!(buffer.total_received(), 0);
    assert_eq!(buffer.frequency_stats(1_000).last_minute_count, 0);
}

#[test]
fn subscriber_sees_the_accepted_sample() {
    let mut buffer = SampleBuffer::new(16).expect("capacity");
    let seen_price = Rc::new(RefCell::new(None));

    let seen_clone = Rc::clone(&seen_price);
    buffer.subscribe(move |event| {
        if let BufferEvent::SampleAdded(sample) = event {
            *seen_clone.borrow_mut() = Some(sample.price);
        }
    });

    buffer.add_sample(raw(1_000, 123.5), 1_000).expect("add");
    assert_eq!(*seen_price.borrow(), Some(123.5));
}

proptest! {
    #[test]
    fn length_never_exceeds_capacity(
        capacity in 1_usize..64,
        count in 0_usize..200,
    ) {
        let mut buffer = SampleBuffer::new(capacity).expect("capacity");
        for i in 0..count {
            let ts = i as i64;
            buffer.add_sample(raw(ts, 100.0), ts).expect("add");
        }

        prop_assert!(buffer.len() <= capacity);
        prop_assert_eq!(buffer.len(), count.min(capacity));
        prop_assert_eq!(buffer.total_received(), count as u64);
    }

    #[test]
    fn ids_stay_unique_across_arbitrary_timestamps(
        timestamps in proptest::collection::vec(0_i64..10_000, 1..64),
    ) {
        let mut buffer = SampleBuffer::new(64).expect("capacity");
        let mut ids = std::collections::HashSet::new();
        for (i, ts) in timestamps.iter().enumerate() {
            let sample = buffer
                .add_sample(RawSample::new(*ts, 100.0, 0, i as u64), *ts)
                .expect("add");
            prop_assert!(ids.insert(sample.id));
        }
    }
}
