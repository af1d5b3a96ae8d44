use std::sync::Arc;
use std::thread;

use jsdebug_protocol::{RefOrValue, ValueKind};

use crate::harness::{names, number, object, object_ref, prop, Fixture, TIMEOUT};

#[test]
fn resume_invalidates_cached_scope_contents() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("a", object_ref(10))]));
    fx.mock.insert_object(object(10, vec![prop("n", number(1.0))]));
    fx.pause(0, &[(1, 0)]);

    let scope = fx.first_frame().scopes()[0].clone();
    let before = scope.variables().unwrap();
    assert_eq!(before[0].mirror().generation(), 0);

    fx.resume();
    assert_eq!(fx.context.current_generation(), 1);
    assert_eq!(fx.context.loader().cached_count(), 0);
    assert!(fx.context.call_frames().is_empty());

    fx.serve_scope(0, 0, 1, object(-1, vec![prop("a", object_ref(20)), prop("b", number(2.0))]));
    fx.mock.insert_object(object(20, vec![prop("n", number(5.0))]));
    fx.pause(0, &[(1, 0)]);

    // Same scope reference as before the step.
    let after = scope.variables().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(names(&after), ["a", "b"]);
    assert_eq!(after[0].mirror().generation(), 1);
    assert_eq!(after[0].mirror().handle(), Some(20));
    assert_eq!(fx.mock.scope_request_count(), 2);
    assert_eq!(fx.mock.lookups(), vec![vec![10], vec![20]]);
}

#[test]
fn object_properties_are_reloaded_after_resume() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("o", object_ref(10))]));
    fx.mock.insert_object(object(10, vec![prop("n", number(1.0))]));
    fx.pause(0, &[(1, 0)]);

    let value = fx.first_frame().scopes()[0].variables().unwrap()[0].value();
    let object_view = value.as_object().unwrap().clone();
    let stale = object_view.properties().unwrap();
    assert_eq!(stale[0].value().value_string(), "1");

    fx.resume();
    fx.mock.insert_object(object(10, vec![prop("n", number(2.0)), prop("m", number(3.0))]));

    let fresh = object_view.properties().unwrap();
    assert_eq!(names(&fresh), ["n", "m"]);
    assert_eq!(fresh[0].value().value_string(), "2");
    assert_eq!(object_view.mirror().generation(), 1);
}

#[test]
fn handles_gone_after_resume_read_as_undefined() {
    let fx = Fixture::new();
    fx.mock.insert_object(object(10, Vec::new()));
    let loader = fx.context.loader().clone();
    let target = RefOrValue::Handle {
        handle: 10,
        hint: Some(ValueKind::Object),
    };
    assert_eq!(loader.get_or_load_value(&target).unwrap().kind(), ValueKind::Object);

    fx.resume();
    let mirror = loader.get_or_load_value(&target).unwrap();
    assert_eq!(mirror.kind(), ValueKind::Undefined);
    assert_eq!(mirror.generation(), 1);
}

#[test]
fn lookup_straddling_a_resume_is_repeated_in_the_new_generation() {
    let fx = Fixture::new();
    fx.mock.insert_object(object(10, vec![prop("n", number(1.0))]));
    let loader = fx.context.loader().clone();
    let target = RefOrValue::Handle {
        handle: 10,
        hint: Some(ValueKind::Object),
    };

    fx.mock.hold();
    let reader = {
        let loader = loader.clone();
        let target = target.clone();
        thread::spawn(move || loader.get_or_load_value(&target).unwrap())
    };
    assert!(fx.mock.wait_for_requests(1, TIMEOUT));
    fx.context
        .handle_event(jsdebug_protocol::DebugEvent::Resumed)
        .unwrap();
    fx.mock.release();

    let mirror = reader.join().unwrap();
    assert_eq!(mirror.generation(), 1);
    assert_eq!(fx.mock.lookups(), vec![vec![10], vec![10]]);
    assert!(Arc::ptr_eq(&mirror, &loader.cached(10).unwrap()));
}
