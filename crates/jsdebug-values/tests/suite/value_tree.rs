use std::sync::mpsc;

use jsdebug_protocol::{
    HandleDescription, PrimitiveValue, RawProperty, RawRef, Request, SetTarget, TransportError,
    ValueBody, ValueKind,
};
use jsdebug_values::{InternalProperties, JsValue, LoaderConfig, ValueError};

use crate::harness::{names, number, object, object_ref, prop, Fixture, TIMEOUT};

/// Pauses with one local scope holding `value` under the name `v` and returns it.
fn local_value(fx: &Fixture, value: RawRef) -> JsValue {
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("v", value)]));
    fx.pause(0, &[(1, 0)]);
    fx.first_frame().scopes()[0].variables().unwrap()[0].value()
}

#[test]
fn arrays_expose_length_and_holes() {
    let fx = Fixture::new();
    fx.mock.insert_object(HandleDescription::object(
        40,
        "Array",
        vec![
            RawProperty::new(0u32, number(10.0)),
            RawProperty::new(2u32, number(30.0)),
            prop("length", number(3.0)),
        ],
    ));
    let value = local_value(&fx, object_ref(40));
    assert_eq!(value.kind(), ValueKind::Array);

    let array = value.as_array().unwrap();
    assert_eq!(array.length().unwrap(), 3);
    assert_eq!(array.get(0).unwrap().value_string(), "10");
    assert!(array.get(1).unwrap().is_undefined());
    assert_eq!(array.get(2).unwrap().value_string(), "30");
    let indices: Vec<u32> = array.elements().unwrap().iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, [0, 2]);
}

#[test]
fn array_length_falls_back_to_the_highest_index() {
    let fx = Fixture::new();
    fx.mock.insert_object(HandleDescription::object(
        41,
        "Array",
        vec![
            RawProperty::new(4u32, number(1.0)),
            RawProperty::new("1", number(2.0)),
        ],
    ));
    let value = local_value(&fx, object_ref(41));
    let array = value.as_array().unwrap();
    assert_eq!(array.length().unwrap(), 5);
    assert_eq!(array.get(1).unwrap().value_string(), "2");
}

#[test]
fn functions_carry_their_source_location() {
    let fx = Fixture::new();
    fx.mock.insert_object(HandleDescription {
        class_name: Some("Function".to_string()),
        properties: Some(Vec::new()),
        name: Some(String::new()),
        inferred_name: Some("handler".to_string()),
        script_id: Some(7),
        line: Some(3),
        column: Some(2),
        ..HandleDescription::new(50, ValueKind::Function)
    });
    let value = local_value(&fx, object_ref(50));

    let function = value.as_function().unwrap();
    assert_eq!(function.name().as_deref(), Some("handler"));
    let location = function.source_location().unwrap();
    assert_eq!((location.script_id, location.line, location.column), (7, 3, 2));
    assert!(value.as_object().is_some());
}

#[test]
fn internal_properties_are_separate_by_default() {
    let fx = Fixture::new();
    let mut description = object(60, vec![prop("own", number(1.0))]);
    description.proto_object = Some(object_ref(61));
    fx.mock.insert_object(description);
    fx.mock.insert_object(HandleDescription::object(61, "Object", Vec::new()));
    let value = local_value(&fx, object_ref(60));
    let object_view = value.as_object().unwrap();

    assert_eq!(names(&object_view.properties().unwrap()), ["own"]);
    let internal = object_view.internal_properties().unwrap();
    assert_eq!(names(&internal), ["__proto__"]);
    assert_eq!(internal[0].mirror().handle(), Some(61));
    assert!(!internal[0].is_mutable());
}

#[test]
fn merged_internal_properties_follow_own_properties() {
    let fx = Fixture::with_config(LoaderConfig {
        internal_properties: InternalProperties::Merged,
        ..LoaderConfig::default()
    });
    let mut description = object(60, vec![prop("own", number(1.0))]);
    description.proto_object = Some(object_ref(61));
    description.constructor_function = Some(object_ref(62));
    fx.mock.insert_object(description);
    fx.mock.insert_object(HandleDescription::object(61, "Object", Vec::new()));
    fx.mock.insert_object(HandleDescription::object(62, "Function", Vec::new()));
    let value = local_value(&fx, object_ref(60));

    let properties = value.properties().unwrap();
    assert_eq!(names(&properties), ["own", "__proto__", "constructor"]);
}

#[test]
fn object_property_lookup_by_name() {
    let fx = Fixture::new();
    fx.mock.insert_object(object(70, vec![prop("a", number(1.0)), prop("b", number(2.0))]));
    let value = local_value(&fx, object_ref(70));
    let object_view = value.as_object().unwrap();

    assert_eq!(object_view.property("b").unwrap().unwrap().value().value_string(), "2");
    assert!(object_view.property("missing").unwrap().is_none());
    assert_eq!(value.class_name().as_deref(), Some("Object"));
}

#[test]
fn set_value_updates_the_variable_and_records_the_request() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("v", number(1.0))]));
    fx.pause(0, &[(1, 0)]);
    let variable = fx.first_frame().scopes()[0].variables().unwrap()[0].clone();
    assert!(variable.is_mutable());

    fx.mock.push_set_value(Ok(ValueBody {
        value: number(5.0),
        description: None,
    }));
    let updated = variable.set_value("2 + 3").unwrap();
    assert_eq!(updated.value_string(), "5");
    assert_eq!(variable.value().value_string(), "5");

    let requests = fx.mock.requests();
    assert!(matches!(
        requests.last(),
        Some(Request::SetValue {
            target: SetTarget::Scope { frame_id: 0, scope_index: 0 },
            expression,
            ..
        }) if expression == "2 + 3"
    ));
}

#[test]
fn set_value_on_object_property_reaches_the_owner() {
    let fx = Fixture::new();
    fx.mock.insert_object(object(80, vec![prop("count", number(1.0))]));
    let value = local_value(&fx, object_ref(80));
    let object_view = value.as_object().unwrap();
    let count = object_view.property("count").unwrap().unwrap();

    fx.mock.push_set_value(Ok(ValueBody {
        value: RawRef::inline(ValueKind::String, Some(PrimitiveValue::String("two".to_string()))),
        description: None,
    }));
    count.set_value("'two'").unwrap();

    let owner = fx.context.loader().cached(80).unwrap();
    let properties = owner.data().unwrap().properties.clone().unwrap();
    assert!(matches!(
        &properties[0].target,
        jsdebug_protocol::RefOrValue::Inline(inline) if inline.text == "two"
    ));
    assert_eq!(object_view.property("count").unwrap().unwrap().value().value_string(), "two");
}

#[test]
fn read_only_properties_reject_assignment() {
    let fx = Fixture::new();
    let read_only = RawProperty {
        attributes: Some(jsdebug_protocol::ATTRIBUTE_READ_ONLY),
        ..prop("fixed", number(1.0))
    };
    fx.mock.insert_object(object(81, vec![read_only]));
    let value = local_value(&fx, object_ref(81));
    let fixed = value.as_object().unwrap().property("fixed").unwrap().unwrap();

    assert!(!fixed.is_mutable());
    assert!(matches!(
        fixed.set_value("2"),
        Err(ValueError::NotApplicable { operation: "setValue", .. })
    ));
}

#[test]
fn set_value_async_reports_on_a_worker_thread() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("v", number(1.0))]));
    fx.pause(0, &[(1, 0)]);
    let variable = fx.first_frame().scopes()[0].variables().unwrap()[0].clone();

    fx.mock.push_set_value(Err(TransportError::CommandFailed {
        command: "setValue",
        message: "ReferenceError: nope is not defined".to_string(),
    }));
    let (tx, rx) = mpsc::channel();
    variable.set_value_async("nope", move |result| {
        let worker = std::thread::current().name().map(str::to_string);
        let _ = tx.send((worker, result.map(|value| value.value_string())));
    });

    let (worker, result) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(worker.as_deref(), Some("jsdebug-set-value"));
    assert!(matches!(result, Err(ValueError::Transport(TransportError::CommandFailed { .. }))));
    assert_eq!(variable.value().value_string(), "1");
}

#[tokio::test]
async fn values_can_be_read_from_async_code() {
    let fx = Fixture::new();
    fx.mock.insert_object(object(90, vec![prop("x", number(1.0))]));
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("o", object_ref(90))]));
    fx.pause(0, &[(1, 0)]);
    let scope = fx.first_frame().scopes()[0].clone();

    let variables = tokio::task::spawn_blocking(move || scope.variables())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(names(&variables), ["o"]);
}
