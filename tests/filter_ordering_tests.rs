//! Tests for filter chain composition: zone ordering, path/name/wildcard
//! concatenation and dispatch-type filtering.

mod common;

use std::sync::Arc;

use common::{call_log, entries, CallLog, RecordingFilter, RecordingHandler, ShortCircuitFilter};
use corridor::{
    DispatchMask, DispatchType, Dispatcher, FilterHolder, FilterMapping, HandlerRequest,
    HandlerResponse, Source,
};
use http::Method;
use serde_json::json;

fn dispatcher_with_handler(log: &CallLog) -> Dispatcher {
    let dispatcher = Dispatcher::new();
    dispatcher
        .add_handler_with_mapping("h", "/*", RecordingHandler::new("h", log))
        .unwrap();
    dispatcher
}

fn register_filter(dispatcher: &Dispatcher, name: &str, log: &CallLog) {
    dispatcher
        .register_filter(FilterHolder::new(
            name,
            Source::Embedded,
            RecordingFilter::new(name, log),
        ))
        .unwrap();
}

fn path_mapping(name: &str, source: Source) -> FilterMapping {
    FilterMapping::new(name, source)
        .with_path_spec("/*")
        .unwrap()
        .with_dispatches(DispatchMask::ALL)
}

fn run(dispatcher: &Dispatcher, target: &str, dispatch_type: DispatchType) -> HandlerResponse {
    let mut req = HandlerRequest::new(Method::GET, target).with_dispatch_type(dispatch_type);
    let mut res = HandlerResponse::new();
    dispatcher.dispatch(target, &mut req, &mut res).unwrap();
    res
}

#[test]
fn test_prepend_and_append_zones_order_the_chain() {
    let log = call_log();
    let dispatcher = dispatcher_with_handler(&log);
    register_filter(&dispatcher, "d1", &log);
    register_filter(&dispatcher, "p1", &log);
    register_filter(&dispatcher, "a1", &log);

    // declared first, then one programmatic prepend and one append
    dispatcher
        .add_filter_mapping(path_mapping("d1", Source::Descriptor))
        .unwrap();
    dispatcher
        .prepend_filter_mapping(path_mapping("p1", Source::Api))
        .unwrap();
    dispatcher
        .add_filter_mapping(path_mapping("a1", Source::Api))
        .unwrap();
    dispatcher.start().unwrap();

    run(&dispatcher, "/x", DispatchType::Request);
    assert_eq!(entries(&log), vec!["p1", "d1", "a1", "h"]);
}

#[test]
fn test_chain_concatenates_path_name_and_wildcard_filters() {
    let log = call_log();
    let dispatcher = dispatcher_with_handler(&log);
    register_filter(&dispatcher, "by-path", &log);
    register_filter(&dispatcher, "by-name", &log);
    register_filter(&dispatcher, "by-wildcard", &log);

    // declared in an order that would put the wildcard filter first if
    // selection did not group path filters before name filters
    dispatcher
        .add_filter_mapping(
            FilterMapping::new("by-wildcard", Source::Descriptor)
                .with_target_name("*")
                .with_dispatches(DispatchMask::ALL),
        )
        .unwrap();
    dispatcher
        .add_filter_mapping(path_mapping("by-path", Source::Descriptor))
        .unwrap();
    dispatcher
        .add_filter_mapping(
            FilterMapping::new("by-name", Source::Descriptor)
                .with_target_name("h")
                .with_dispatches(DispatchMask::ALL),
        )
        .unwrap();
    dispatcher.start().unwrap();

    run(&dispatcher, "/x", DispatchType::Request);
    assert_eq!(entries(&log), vec!["by-path", "by-name", "by-wildcard", "h"]);
}

#[test]
fn test_name_filters_skipped_for_other_handlers() {
    let log = call_log();
    let dispatcher = dispatcher_with_handler(&log);
    dispatcher
        .add_handler_with_mapping("other", "/other", RecordingHandler::new("other", &log))
        .unwrap();
    register_filter(&dispatcher, "only-h", &log);
    dispatcher
        .add_filter_mapping(
            FilterMapping::new("only-h", Source::Descriptor)
                .with_target_name("h")
                .with_dispatches(DispatchMask::ALL),
        )
        .unwrap();
    dispatcher.start().unwrap();

    run(&dispatcher, "/other", DispatchType::Request);
    assert_eq!(entries(&log), vec!["other"]);

    log.lock().unwrap().clear();
    run(&dispatcher, "/x", DispatchType::Request);
    assert_eq!(entries(&log), vec!["only-h", "h"]);
}

#[test]
fn test_dispatch_type_mask_filters_the_chain() {
    let log = call_log();
    let dispatcher = dispatcher_with_handler(&log);
    register_filter(&dispatcher, "include-only", &log);
    dispatcher
        .add_filter_mapping(
            FilterMapping::new("include-only", Source::Descriptor)
                .with_path_spec("/*")
                .unwrap()
                .with_dispatches(DispatchMask::INCLUDE),
        )
        .unwrap();
    dispatcher.start().unwrap();

    run(&dispatcher, "/x", DispatchType::Request);
    assert_eq!(entries(&log), vec!["h"]);

    log.lock().unwrap().clear();
    run(&dispatcher, "/x", DispatchType::Include);
    assert_eq!(entries(&log), vec!["include-only", "h"]);
}

#[test]
fn test_unspecified_mask_defaults_to_request_only() {
    let log = call_log();
    let dispatcher = dispatcher_with_handler(&log);
    register_filter(&dispatcher, "f", &log);
    dispatcher
        .add_filter_mapping(
            FilterMapping::new("f", Source::Descriptor)
                .with_path_spec("/*")
                .unwrap(),
        )
        .unwrap();
    dispatcher.start().unwrap();

    run(&dispatcher, "/x", DispatchType::Forward);
    assert_eq!(entries(&log), vec!["h"]);

    log.lock().unwrap().clear();
    run(&dispatcher, "/x", DispatchType::Request);
    assert_eq!(entries(&log), vec!["f", "h"]);
}

#[test]
fn test_filter_mapped_twice_runs_twice() {
    let log = call_log();
    let dispatcher = dispatcher_with_handler(&log);
    register_filter(&dispatcher, "twice", &log);
    dispatcher
        .add_filter_mapping(path_mapping("twice", Source::Descriptor))
        .unwrap();
    dispatcher
        .add_filter_mapping(
            FilterMapping::new("twice", Source::Descriptor)
                .with_target_name("h")
                .with_dispatches(DispatchMask::ALL),
        )
        .unwrap();
    dispatcher.start().unwrap();

    run(&dispatcher, "/x", DispatchType::Request);
    assert_eq!(entries(&log), vec!["twice", "twice", "h"]);
}

#[test]
fn test_filter_can_short_circuit() {
    let log = call_log();
    let dispatcher = dispatcher_with_handler(&log);
    dispatcher
        .register_filter(FilterHolder::new(
            "gate",
            Source::Embedded,
            Arc::new(ShortCircuitFilter {
                log: Arc::clone(&log),
            }),
        ))
        .unwrap();
    dispatcher
        .add_filter_mapping(path_mapping("gate", Source::Embedded))
        .unwrap();
    dispatcher.start().unwrap();

    let res = run(&dispatcher, "/x", DispatchType::Request);
    assert_eq!(res.status, 403);
    // the handler never ran
    assert_eq!(entries(&log), vec!["short-circuit"]);
}

#[test]
fn test_name_based_dispatch_skips_path_filters() {
    let log = call_log();
    let dispatcher = Dispatcher::new();
    dispatcher
        .add_handler_with_mapping("named", "/n", RecordingHandler::new("named", &log))
        .unwrap();
    register_filter(&dispatcher, "path-only", &log);
    register_filter(&dispatcher, "for-named", &log);
    dispatcher
        .add_filter_mapping(path_mapping("path-only", Source::Descriptor))
        .unwrap();
    dispatcher
        .add_filter_mapping(
            FilterMapping::new("for-named", Source::Descriptor)
                .with_target_name("named")
                .with_dispatches(DispatchMask::ALL),
        )
        .unwrap();
    dispatcher.start().unwrap();

    // by name: only the name filter applies
    let mut req = HandlerRequest::new(Method::GET, "/n");
    let mut res = HandlerResponse::new();
    dispatcher.dispatch("named", &mut req, &mut res).unwrap();
    assert_eq!(entries(&log), vec!["for-named", "named"]);
    assert_eq!(res.body, json!({ "handler": "named" }));

    // by path: both apply
    log.lock().unwrap().clear();
    run(&dispatcher, "/n", DispatchType::Request);
    assert_eq!(entries(&log), vec!["path-only", "for-named", "named"]);
}

#[test]
fn test_empty_filter_mapping_rejected() {
    let dispatcher = Dispatcher::new();
    let err = dispatcher
        .add_filter_mapping(FilterMapping::new("f", Source::Descriptor))
        .unwrap_err();
    assert_eq!(
        err,
        corridor::ConfigError::EmptyFilterMapping {
            name: "f".to_string()
        }
    );
}
