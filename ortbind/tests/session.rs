//! End-to-end session scenarios against the in-process engine.
//!
//! Run with: cargo test -p ortbind --features mock --test session

use std::io;
use std::sync::{Arc, Mutex};

use ortbind::mock;
use ortbind::{
    ElementType, HostValue, ModelSource, OrtError, OutputKind, RunOptions, Session, SessionOptions,
    TypeDescriptor,
};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn open(engine: &mock::Engine, model: &str) -> Session {
    Session::open_with_api(engine.api(), model, &SessionOptions::default()).unwrap()
}

#[test]
fn sigmoid_from_bytes_and_path_agree() {
    let engine = mock::lock();
    let by_path = open(&engine, "models/sigmoid.onnx");
    let bytes = b"sigmoid".to_vec();
    let by_bytes = Session::open_with_api(engine.api(), ModelSource::from(&bytes), &SessionOptions::default()).unwrap();
    assert_eq!(by_path.inputs(), by_bytes.inputs());
    assert_eq!(by_path.outputs(), by_bytes.outputs());
}

#[test]
fn lightgbm_outputs_labels_and_probability_maps() {
    let engine = mock::lock();
    let session = open(&engine, "lightgbm.onnx");

    assert_eq!(session.inputs()[0].name, "input");
    let names: Vec<&str> = session.outputs().iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["label", "probabilities"]);

    let x = HostValue::from(vec![vec![5.0f32, 0.0], vec![0.0, 5.0], vec![-5.0, -5.0]]);
    let out = session.run(None, [("input", x)], &RunOptions::default()).unwrap();

    assert_eq!(out[0], HostValue::from(vec![1i64, 2, 0]));
    let rows = out[1].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    for row in rows {
        let entries = row.as_map().unwrap();
        assert_eq!(entries.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [0, 1, 2]);
        let total: f32 = entries
            .iter()
            .map(|(_, v)| match v {
                HostValue::Float(p) => *p,
                other => panic!("unexpected {other:?}"),
            })
            .sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    drop(out);
    drop(session);
    assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
    assert_eq!(engine.stats().invalid_releases, 0);
}

#[test]
fn requested_outputs_keep_request_order() {
    let engine = mock::lock();
    let session = open(&engine, "lightgbm.onnx");
    let x = HostValue::from(vec![vec![1.0f32, 2.0]]);
    let out = session
        .run(Some(&["probabilities", "label"]), [("input", x)], &RunOptions::default())
        .unwrap();
    assert!(out[0].as_array().is_some());
    assert_eq!(out[1], HostValue::from(vec![2i64]));
}

#[test]
fn string_tensor_identity() {
    let engine = mock::lock();
    let session = open(&engine, "strings.onnx");
    assert_eq!(session.inputs()[0].descriptor.element_type(), Some(ElementType::String));

    let x = HostValue::from(vec![vec!["a", "bb"], vec!["", "ccc"]]);
    let out = session.run(None, [("x", x.clone())], &RunOptions::default()).unwrap();
    assert_eq!(out[0], x);

    let options = RunOptions {
        output: OutputKind::Buffer,
        ..Default::default()
    };
    let out = session.run(None, [("x", x)], &options).unwrap();
    let buffer = out[0].as_buffer().unwrap();
    assert_eq!(buffer.shape(), &[2, 2]);
    assert_eq!(buffer.to_nested(), HostValue::from(vec![vec!["a", "bb"], vec!["", "ccc"]]));
}

#[test]
fn string_keyed_map_output_is_unsupported() {
    let engine = mock::lock();
    let session = open(&engine, "zipmap_string.onnx");
    match &session.outputs()[0].descriptor {
        TypeDescriptor::Sequence(inner) => assert_eq!(inner.to_string(), "map(string,tensor(float))"),
        other => panic!("unexpected {other}"),
    }

    let x = HostValue::from(vec![vec![1.0f32, 0.0]]);
    let err = session.run(None, [("x", x)], &RunOptions::default()).unwrap_err();
    assert!(matches!(err, OrtError::UnsupportedType { kind: "map key", .. }), "{err:?}");
    drop(session);
    assert!(engine.leaks().is_empty(), "{:?}", engine.leaks());
}

#[test]
fn engine_type_error_passes_through() {
    let engine = mock::lock();
    let session = open(&engine, "lightgbm.onnx");
    let input = ortbind::NativeValue::from_host(
        engine.api(),
        &HostValue::from(vec![vec![1.0f64, 2.0]]),
        ElementType::Double,
    )
    .unwrap();
    let err = session
        .run(None, [("input", &input)], &RunOptions::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected input data type. Actual: (tensor(double)) , expected: (tensor(float))"
    );
}

#[test]
fn missing_input_is_reported_by_engine() {
    let engine = mock::lock();
    let session = open(&engine, "sigmoid.onnx");
    let feed: [(&str, HostValue); 0] = [];
    let err = session.run(None, feed, &RunOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Missing Input: x");
    assert_eq!(engine.stats().runs, 1);
}

#[test]
fn unavailable_provider_warns_once_and_falls_back() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let engine = mock::lock();
    let options = SessionOptions {
        providers: vec!["CUDAExecutionProvider".into(), "CPUExecutionProvider".into()],
        ..Default::default()
    };
    let session = tracing::subscriber::with_default(subscriber, || {
        Session::open_with_api(engine.api(), "sigmoid.onnx", &options)
    })
    .unwrap();

    let logs = captured.text();
    let warnings: Vec<&str> = logs.lines().filter(|l| l.contains("WARN")).collect();
    assert_eq!(warnings.len(), 1, "{logs}");
    assert!(warnings[0].contains("CUDAExecutionProvider"));
    assert!(!engine.calls().iter().any(|c| c.contains("CUDA")));
    assert_eq!(session.providers().unwrap(), ["CPUExecutionProvider"]);
}

#[test]
fn options_from_json_reach_engine() {
    let engine = mock::lock();
    let options = SessionOptions::from_json(
        r#"{
            "intra_op_num_threads": 2,
            "graph_optimization_level": "basic",
            "session_config_entries": {"session.load_model_format": "ONNX"}
        }"#,
    )
    .unwrap();
    let _session = Session::open_with_api(engine.api(), "sigmoid.onnx", &options).unwrap();
    let calls = engine.calls();
    assert!(calls.contains(&"SetIntraOpNumThreads(2)".to_string()), "{calls:?}");
    assert!(calls.contains(&"SetSessionGraphOptimizationLevel(1)".to_string()));
    assert!(calls.contains(&"AddSessionConfigEntry(session.load_model_format=ONNX)".to_string()));
}

#[test]
fn concurrent_opens_share_one_environment() {
    let engine = mock::lock();
    let api = engine.api();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(move || {
                Session::open_with_api(api, "sigmoid.onnx", &SessionOptions::default()).map(|s| s.inputs().len())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }
    assert_eq!(engine.stats().env_created, 1);
}

#[test]
fn sessions_move_across_threads() {
    let engine = mock::lock();
    let session = open(&engine, "sigmoid.onnx");
    let out = std::thread::spawn(move || {
        let x = HostValue::from(vec![vec![vec![0.0f32; 5]; 4]; 3]);
        session.run(None, [("x", x)], &RunOptions::default())
    })
    .join()
    .unwrap()
    .unwrap();
    assert_eq!(out[0].nested_shape(), vec![3, 4, 5]);
}

#[test]
fn bad_bytes_are_engine_errors() {
    let engine = mock::lock();
    let err = Session::open_with_api(engine.api(), b"not a model".as_slice(), &SessionOptions::default())
        .err()
        .unwrap();
    match err {
        OrtError::Engine { code, .. } => assert_eq!(code, ortbind::ErrorCode::InvalidProtobuf),
        other => panic!("unexpected {other:?}"),
    }
}
