use jsdebug_protocol::{DebugEvent, PauseReason};
use jsdebug_values::{FrameVariable, JsValue, ScopeType};

use crate::harness::{frame, number, object, prop, Fixture};

#[test]
fn frame_variables_flatten_the_scope_chain_outermost_first() {
    let fx = Fixture::new();
    fx.serve_scope(0, 0, 1, object(-1, vec![prop("l1", number(1.0)), prop("l2", number(2.0))]));
    fx.serve_scope(0, 1, 3, object(-2, vec![prop("c1", number(3.0))]));
    fx.serve_scope(0, 2, 0, object(-3, vec![prop("g", number(4.0))]));
    fx.pause(0, &[(1, 0), (3, 1), (0, 2)]);

    let frame = fx.first_frame();
    assert!(frame.has_variables());
    let variables = frame.variables().unwrap();
    let names: Vec<String> = variables.iter().map(FrameVariable::name).collect();
    assert_eq!(names, ["<GLOBAL>", "c1", "l2", "l1"]);

    let FrameVariable::Scope(global) = &variables[0] else {
        panic!("global scope should be a single scope entry");
    };
    assert_eq!(global.scope().scope_type(), ScopeType::Global);
    assert_eq!(global.class_name(), "#Scope");
    assert!(!variables[0].is_mutable());
    // Global members are only read when the entry is expanded.
    assert_eq!(fx.mock.scope_request_count(), 2);

    let value = variables[0].value();
    assert!(matches!(value, JsValue::ScopeObject(_)));
    assert_eq!(value.value_string(), "#Scope");
    let members = value.properties().unwrap();
    assert_eq!(members[0].name(), "g");
    assert_eq!(global.property("g").unwrap().unwrap().value().value_string(), "4");
}

#[test]
fn frame_metadata_and_receiver() {
    let fx = Fixture::new();
    fx.mock.insert_object(jsdebug_protocol::HandleDescription::object(900, "Window", Vec::new()));
    fx.pause(4, &[]);

    let frame = fx.first_frame();
    assert_eq!(frame.id(), 4);
    assert_eq!(frame.function_name(), "main");
    assert_eq!(frame.source_location().map(|l| l.line), Some(9));
    assert_eq!(frame.display_line(), Some(10));
    assert!(!frame.has_variables());
    assert!(frame.variables().unwrap().is_empty());

    let receiver = frame.receiver().unwrap();
    assert_eq!(receiver.class_name().as_deref(), Some("Window"));
    assert_eq!(receiver.value_string(), "#<Window>");
}

#[test]
fn pause_and_resume_manage_the_frame_list() {
    let fx = Fixture::new();
    assert!(fx.context.suspension().is_none());

    fx.context
        .handle_event(DebugEvent::Paused {
            frames: vec![frame(0, &[(1, 0)]), frame(1, &[(1, 0), (0, 1)])],
            reason: PauseReason::Step,
        })
        .unwrap();
    let suspension = fx.context.suspension().unwrap();
    assert_eq!(suspension.reason, PauseReason::Step);
    assert_eq!(suspension.frames.len(), 2);
    assert_eq!(fx.context.call_frames()[1].scopes().len(), 2);

    fx.context.handle_event(DebugEvent::Resumed).unwrap();
    assert!(fx.context.suspension().is_none());
    assert!(fx.context.call_frames().is_empty());
}
