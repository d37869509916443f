//! Property tests for scheduler delivery: monotonic, exactly once, no gaps.

use core_events::{Event, EventKind};
use core_playback::Scheduler;
use proptest::prelude::*;
use std::time::Duration;

fn timeline() -> impl Strategy<Value = Vec<Event>> {
    proptest::collection::vec(0u32..50, 0..30).prop_map(|gaps| {
        let mut t = 0.0;
        gaps.into_iter()
            .enumerate()
            .map(|(i, gap)| {
                t += f64::from(gap);
                let mut ev = Event::new(t, EventKind::Focus);
                ev.extra.insert("seq".into(), serde_json::json!(i));
                ev
            })
            .collect()
    })
}

fn seq(ev: &Event) -> u64 {
    ev.extra
        .get("seq")
        .and_then(|v| v.as_u64())
        .expect("test events carry seq")
}

proptest! {
    #[test]
    fn ticks_deliver_each_event_once_in_order(
        events in timeline(),
        ticks in proptest::collection::vec(0u64..40, 1..200),
        speed in prop_oneof![Just(0.5), Just(1.0), Just(3.0)],
    ) {
        let total = events.len();
        let mut s = Scheduler::new();
        s.load_events(events).unwrap();
        s.set_speed(speed).unwrap();
        s.play().unwrap();
        let mut seen = Vec::new();
        let mut last_time = f64::NEG_INFINITY;
        for ms in ticks {
            for ev in s.advance(Duration::from_millis(ms)) {
                prop_assert!(ev.time >= last_time);
                last_time = ev.time;
                seen.push(seq(ev));
            }
        }
        // Drain whatever is left.
        while s.is_playing() {
            for ev in s.advance(Duration::from_secs(1)) {
                seen.push(seq(ev));
            }
        }
        prop_assert_eq!(seen, (0..total as u64).collect::<Vec<_>>());
        prop_assert!(s.is_finished());
    }

    #[test]
    fn seek_prefix_plus_ticks_covers_timeline(
        events in timeline(),
        at in 0u32..1500,
        ticks in proptest::collection::vec(1u64..60, 1..100),
    ) {
        let total = events.len();
        let mut s = Scheduler::new();
        s.load_events(events).unwrap();
        s.play().unwrap();
        let mut seen: Vec<u64> = s.seek(f64::from(at)).unwrap().iter().map(seq).collect();
        for ms in ticks {
            seen.extend(s.advance(Duration::from_millis(ms)).iter().map(seq));
        }
        while s.is_playing() {
            seen.extend(s.advance(Duration::from_secs(1)).iter().map(seq));
        }
        prop_assert_eq!(seen, (0..total as u64).collect::<Vec<_>>());
    }

    #[test]
    fn clock_never_exceeds_duration(events in timeline(), ticks in proptest::collection::vec(0u64..500, 1..50)) {
        let mut s = Scheduler::new();
        s.load_events(events).unwrap();
        s.play().unwrap();
        let mut previous = 0.0;
        for ms in ticks {
            s.advance(Duration::from_millis(ms));
            prop_assert!(s.current_time() >= previous);
            prop_assert!(s.current_time() <= s.duration());
            previous = s.current_time();
        }
    }
}
