use std::sync::{Arc, Barrier};
use std::thread;

use jsdebug_protocol::{RefOrValue, ValueKind};
use jsdebug_values::PropertyRef;

use crate::harness::{names, object, object_ref, prop, string, Fixture, TIMEOUT};

fn handle(name: &str, handle: i64) -> PropertyRef {
    PropertyRef::new(
        name,
        RefOrValue::Handle {
            handle,
            hint: Some(ValueKind::Object),
        },
    )
}

#[test]
fn concurrent_expansion_shares_one_round_trip() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("a", object_ref(10)), prop("b", object_ref(11))]));
    fx.mock.insert_object(object(10, Vec::new()));
    fx.mock.insert_object(object(11, Vec::new()));
    fx.pause(0, &[(1, 0)]);
    let scope = fx.first_frame().scopes()[0].clone();

    fx.mock.hold();
    let first = {
        let scope = scope.clone();
        thread::spawn(move || scope.variables().unwrap())
    };
    assert!(fx.mock.wait_for_requests(1, TIMEOUT));
    let second = {
        let scope = scope.clone();
        thread::spawn(move || scope.variables().unwrap())
    };
    fx.mock.release();

    let first = first.join().unwrap();
    let second = second.join().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(names(&first), ["a", "b"]);
    assert_eq!(fx.mock.scope_request_count(), 1);
    assert_eq!(fx.mock.lookups(), vec![vec![10, 11]]);
}

#[test]
fn many_readers_of_a_cold_scope_see_the_same_list() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("a", object_ref(10))]));
    fx.mock.insert_object(object(10, Vec::new()));
    fx.pause(0, &[(1, 0)]);
    let scope = fx.first_frame().scopes()[0].clone();

    let barrier = Arc::new(Barrier::new(8));
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let scope = scope.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                scope.variables().unwrap()
            })
        })
        .collect();
    let lists: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();

    assert!(lists.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(fx.mock.scope_request_count(), 1);
    assert_eq!(fx.mock.lookups().len(), 1);
}

#[test]
fn overlapping_loads_fetch_each_handle_once() {
    let fx = Fixture::new();
    for handle in [10, 11, 12] {
        fx.mock.insert_object(object(handle, Vec::new()));
    }
    let loader = fx.context.loader().clone();

    fx.mock.hold();
    let first = {
        let loader = loader.clone();
        thread::spawn(move || {
            loader
                .get_or_load_value_from_refs(&[handle("a", 10), handle("b", 11)])
                .unwrap()
        })
    };
    assert!(fx.mock.wait_for_requests(1, TIMEOUT));
    let second = {
        let loader = loader.clone();
        thread::spawn(move || {
            loader
                .get_or_load_value_from_refs(&[handle("b", 11), handle("c", 12)])
                .unwrap()
        })
    };
    assert!(fx.mock.wait_for_requests(2, TIMEOUT));
    fx.mock.release();

    let first = first.join().unwrap();
    let second = second.join().unwrap();
    assert_eq!(fx.mock.lookups(), vec![vec![10, 11], vec![12]]);
    assert!(Arc::ptr_eq(&first[1], &second[0]));
    assert!(!second[1].needs_load());
}

#[test]
fn colliding_handles_in_one_batch_share_a_mirror() {
    let fx = Fixture::new();
    fx.serve_scope(
        0,
        0,
        1,
        object(-1, vec![prop("left", object_ref(10)), prop("right", object_ref(10))]),
    );
    fx.mock.insert_object(string(10, "shared"));
    fx.pause(0, &[(1, 0)]);

    let variables = fx.first_frame().scopes()[0].variables().unwrap();
    assert!(Arc::ptr_eq(&variables[0].mirror(), &variables[1].mirror()));
    assert_eq!(fx.mock.lookups(), vec![vec![10]]);
    // The scope object and the shared value.
    assert_eq!(fx.context.loader().cached_count(), 2);
}
