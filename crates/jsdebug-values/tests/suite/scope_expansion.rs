use std::sync::Arc;

use jsdebug_protocol::{RawRef, ValueKind};
use jsdebug_values::{JsValue, ScopeType};

use crate::harness::{names, number, object, object_ref, prop, string, Fixture};

#[test]
fn cold_scope_expansion_issues_one_scope_request_and_one_lookup() {
    let fx = Fixture::new();
    fx.serve_scope(
        0,
        1,
        1,
        object(
            -1,
            vec![
                prop("point", object_ref(10)),
                prop("label", RawRef::handle(11)),
                prop("count", number(3.0)),
            ],
        ),
    );
    fx.mock.insert_object(object(10, vec![prop("x", number(1.0))]));
    fx.mock.insert_object(string(11, "hello"));
    fx.pause(0, &[(1, 1)]);

    let frame = fx.first_frame();
    let scope = &frame.scopes()[0];
    assert_eq!(scope.scope_type(), ScopeType::Local);

    let variables = scope.variables().unwrap();
    assert_eq!(names(&variables), ["point", "label", "count"]);
    assert_eq!(fx.mock.scope_request_count(), 1);
    assert_eq!(fx.mock.lookups(), vec![vec![10, 11]]);

    let loader = fx.context.loader();
    assert!(Arc::ptr_eq(&variables[0].mirror(), &loader.cached(10).unwrap()));
    assert!(Arc::ptr_eq(&variables[1].mirror(), &loader.cached(11).unwrap()));
    assert_eq!(variables[1].value().value_string(), "hello");
    assert_eq!(variables[2].value().kind(), ValueKind::Number);

    // Warm reads stay local.
    let again = scope.variables().unwrap();
    assert!(Arc::ptr_eq(&variables, &again));
    assert_eq!(fx.mock.requests().len(), 2);
}

#[test]
fn with_scope_exposes_its_argument() {
    let fx = Fixture::new();
    let mut scope_object = object(-2, Vec::new());
    scope_object.proto_object = Some(object_ref(30));
    fx.serve_scope(0, 0, 2, scope_object);
    fx.mock.insert_object(object(
        30,
        vec![prop("x", number(1.0)), prop("y", RawRef::handle(31))],
    ));
    fx.mock.insert_object(string(31, "why"));
    fx.pause(0, &[(2, 0)]);

    let frame = fx.first_frame();
    let scope = &frame.scopes()[0];
    assert_eq!(scope.scope_type(), ScopeType::With);

    let argument = scope.with_argument().unwrap().expect("with scopes have an argument");
    let argument = match argument {
        JsValue::Object(object) => object,
        other => panic!("with argument should be an object, got {other:?}"),
    };
    assert_eq!(argument.handle(), Some(30));

    let variables = scope.variables().unwrap();
    let properties = argument.properties().unwrap();
    assert!(Arc::ptr_eq(&variables, &properties));
    assert_eq!(names(&variables), ["x", "y"]);
}

#[test]
fn unknown_scope_code_behaves_like_a_plain_scope() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 7, object(-3, vec![prop("v", number(7.0))]));
    fx.pause(0, &[(7, 0)]);

    let frame = fx.first_frame();
    let scope = &frame.scopes()[0];
    assert_eq!(scope.scope_type(), ScopeType::Unknown);
    assert!(!scope.is_with());
    assert!(scope.with_argument().unwrap().is_none());

    let variables = scope.variables().unwrap();
    assert_eq!(names(&variables), ["v"]);
    assert_eq!(variables[0].value().value_string(), "7");
    // Inline values need no lookup.
    assert!(fx.mock.lookups().is_empty());
}

#[test]
fn missing_scope_object_yields_no_variables() {
    let fx = Fixture::new();
    fx.mock.set_scope(
        0,
        0,
        jsdebug_protocol::ScopeBody {
            index: 0,
            frame_index: 0,
            scope_type: 1,
            object: None,
        },
    );
    fx.pause(0, &[(1, 0)]);

    assert!(fx.first_frame().scopes()[0].variables().unwrap().is_empty());
}
