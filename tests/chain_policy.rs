use std::sync::{Arc, Mutex};

use invoker::catalog::{Catalog, MemberDescriptor, Scope, SearchOrder, TypeDescriptor};
use invoker::chain::{self, Chain, EXIT_FAILURE, EXIT_SUCCESS};
use invoker::datatype::{ParsedValue, TypeTag, arg};
use invoker::error::InvokeError;
use invoker::executor::Invoker;
use invoker::trace::{Stage, TraceSink};

const MARKER: &str = "-invoke";

fn tokens(line: &str) -> Vec<String> {
    line.split(' ').map(String::from).collect()
}

// Steps.Record pushes its argument, Steps.Fail returns an error, Steps.Panic panics.
fn recording_catalog(log: &Arc<Mutex<Vec<String>>>) -> Catalog {
    let (record, count) = (Arc::clone(log), Arc::clone(log));
    let mut main = Scope::new("Main");
    main.keep(
        TypeDescriptor::new("Steps")
            .with_method(MemberDescriptor::method("Record").param("what", TypeTag::String).call(move |args| {
                record.lock().unwrap().push(arg::<String>(args, 0)?);
                Ok(None)
            }))
            .with_method(MemberDescriptor::method("Count").param("n", TypeTag::Int).returns(TypeTag::Int).call(
                move |args| {
                    let n = arg::<i64>(args, 0)?;
                    count.lock().unwrap().push(format!("count {n}"));
                    Ok(Some(ParsedValue::Int(n)))
                },
            ))
            .with_method(MemberDescriptor::method("Fail").call(|_| Err(anyhow::anyhow!("failed on purpose"))))
            .with_method(MemberDescriptor::method("Panic").call(|_| panic!("boom"))),
    )
    .unwrap();
    let mut catalog = Catalog::new();
    catalog.keep(main).unwrap();
    catalog
}

fn run(line: &str, log: &Arc<Mutex<Vec<String>>>) -> (chain::ChainReport, TraceSink) {
    let catalog = recording_catalog(log);
    let invoker = Invoker::new(&catalog, SearchOrder::default());
    let mut sink = TraceSink::buffered();
    let report = chain::run_with(&invoker, &tokens(line), MARKER, &mut sink);
    (report, sink)
}

#[test]
fn full_chain_runs_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (report, sink) = run("-invoke Steps.Record one -next Steps.Count 2 -next Steps.Record three", &log);
    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert_eq!(*log.lock().unwrap(), vec!["one", "count 2", "three"]);
    assert_eq!(report.results, vec![None, Some(ParsedValue::Int(2)), None]);
    assert_eq!(sink.steps(), 3);
}

#[test]
fn callee_fault_aborts_the_rest_of_the_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (report, sink) = run("-invoke Steps.Record one -next Steps.Fail -next Steps.Record three", &log);
    assert_eq!(report.exit_code(), EXIT_FAILURE);
    // the first call's side effect stays, the third call never runs
    assert_eq!(*log.lock().unwrap(), vec!["one"]);
    assert_eq!(report.results.len(), 1);
    match report.failure {
        Some(InvokeError::CalleeFault { member, message }) => {
            assert_eq!(member, "Fail");
            assert_eq!(message, "failed on purpose");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(sink.steps(), 2);
}

#[test]
fn coercion_failure_aborts_the_rest_of_the_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (report, _) = run("-invoke Steps.Record one -next Steps.Count abc -next Steps.Record three", &log);
    assert_eq!(report.exit_code(), EXIT_FAILURE);
    assert_eq!(*log.lock().unwrap(), vec!["one"]);
    assert!(matches!(report.failure, Some(InvokeError::ArgumentCoercionFailed { index: 0, .. })));
}

#[test]
fn panicking_callee_is_a_fault_and_its_trace_is_flushed() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (report, sink) = run("-invoke Steps.Panic -next Steps.Record never", &log);
    assert!(log.lock().unwrap().is_empty());
    match report.failure {
        Some(InvokeError::CalleeFault { message, .. }) => assert_eq!(message, "boom"),
        other => panic!("unexpected {other:?}"),
    }
    let failures: Vec<_> = sink.records().iter().filter(|r| r.stage == Stage::Failure).collect();
    assert!(!failures.is_empty());
    assert!(failures.iter().all(|r| r.step == 1));
}

#[test]
fn every_step_is_flushed_once_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (_, sink) = run("-invoke Steps.Record a -next Steps.Record b", &log);
    let steps: Vec<usize> = sink.records().iter().map(|r| r.step).collect();
    assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(steps.first(), Some(&1));
    assert_eq!(steps.last(), Some(&2));
    let requests = sink.records().iter().filter(|r| r.stage == Stage::Request && r.message.starts_with("Invoke:")).count();
    assert_eq!(requests, 2);
}

#[test]
fn host_tokens_and_options_are_skipped() {
    let chain = Chain::parse(
        &tokens("-batchmode -projectPath p -invoke Steps.Count -321 -next Steps.Record x -quit Steps.Record y"),
        MARKER,
    )
    .unwrap();
    assert_eq!(chain.calls(), &[tokens("Steps.Count -321"), tokens("Steps.Record x")]);
}

#[test]
fn only_plain_decimals_pass_as_negative_numbers() {
    let chain = Chain::parse(&tokens("-invoke Steps.Count -2.5 -0 -1e5 -next Steps.Record x"), MARKER).unwrap();
    assert_eq!(chain.calls(), &[tokens("Steps.Count -2.5 -0")]);
}

#[test]
fn negative_numbers_are_arguments() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (report, _) = run("-invoke Steps.Count -321", &log);
    assert_eq!(report.results, vec![Some(ParsedValue::Int(-321))]);
}

#[test]
fn empty_call_fails_after_the_calls_before_it() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (report, _) = run("-invoke Steps.Record one -next", &log);
    assert_eq!(*log.lock().unwrap(), vec!["one"]);
    assert!(matches!(report.failure, Some(InvokeError::InvalidCommandLine(_))));
}

#[test]
fn nothing_to_invoke_exits_with_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (report, sink) = run("-batchmode -quit", &log);
    assert_eq!(report.exit_code(), EXIT_FAILURE);
    assert!(matches!(report.failure, Some(InvokeError::InvalidCommandLine(_))));
    assert_eq!(sink.records()[0].message, "Nothing to invoke");

    let (report, _) = run("-batchmode -invoke", &log);
    assert_eq!(report.exit_code(), EXIT_FAILURE);
}

#[test]
fn invoke_log_appends_json_lines() {
    let path = std::env::temp_dir().join(format!("invoker_trace_{}.jsonl", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let log = Arc::new(Mutex::new(Vec::new()));
    let catalog = recording_catalog(&log);
    let invoker = Invoker::new(&catalog, SearchOrder::default());
    let line = format!("-invokeLog {} -invoke Steps.Record one", path.display());
    assert_eq!(chain::log_path(&tokens(&line)), Some(path.to_str().unwrap()));

    assert_eq!(chain::run(&invoker, &tokens(&line), MARKER), EXIT_SUCCESS);
    let first = std::fs::read_to_string(&path).unwrap().lines().count();
    assert!(first > 0);
    let failing = format!("-invokeLog {} -invoke Steps.Fail", path.display());
    assert_eq!(chain::run(&invoker, &tokens(&failing), MARKER), EXIT_FAILURE);
    let written = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let records: Vec<serde_json::Value> = written.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert!(records.len() > first);
    assert!(records.iter().all(|r| r.get("stage").is_some() && r.get("at").is_some()));
    assert_eq!(records.last().unwrap()["stage"], "failure");
}

#[cfg(target_os = "linux")]
#[test]
fn failed_trace_write_keeps_the_records() {
    // every write to /dev/full fails with ENOSPC
    let mut sink = TraceSink::to_file("/dev/full").unwrap();
    let mut step = sink.begin_step();
    step.record(Stage::Request, "first");
    step.record(Stage::Invoke, "second");
    assert!(matches!(step.finish(), Err(InvokeError::Trace(_))));
    let messages: Vec<&str> = sink.records().iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);

    // the next step starts from an empty buffer
    let mut step = sink.begin_step();
    step.record(Stage::Request, "third");
    drop(step);
    assert_eq!(sink.records().len(), 3);
}
