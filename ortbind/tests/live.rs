//! Tests against a real ONNX Runtime build.
//!
//! Run with: ORT_DYLIB_PATH=... ORT_TEST_MODEL=... cargo test -p ortbind --test live -- --ignored
//!
//! `ORT_TEST_MODEL` should point at the backend-test sigmoid model
//! (`x`, `y`: float[3,4,5]).

use std::path::PathBuf;

use ortbind::{Api, HostValue, ORT_API_VERSION, RunOptions, Session, SessionOptions};

fn model_path() -> PathBuf {
    PathBuf::from(std::env::var("ORT_TEST_MODEL").expect("ORT_TEST_MODEL required"))
}

#[test]
#[ignore]
fn binds_pinned_version() {
    let api = Api::global().expect("bind onnxruntime");
    assert_eq!(api.version(), ORT_API_VERSION);
    println!("onnxruntime {}", api.lib_version().unwrap_or("unknown"));
    let providers = api.available_providers().unwrap();
    assert!(providers.iter().any(|p| p == "CPUExecutionProvider"), "{providers:?}");
}

#[test]
#[ignore]
fn sigmoid_round_trip() {
    let path = model_path();
    let session = Session::open(&path, &SessionOptions::default()).unwrap();
    assert_eq!(session.inputs()[0].descriptor.to_string(), "tensor(float)");

    let x = HostValue::from(vec![vec![vec![0.0f32; 5]; 4]; 3]);
    let out = session.run(None, [("x", x)], &RunOptions::default()).unwrap();
    let first = &out[0].as_array().unwrap()[0].as_array().unwrap()[0].as_array().unwrap()[0];
    assert_eq!(*first, HostValue::Float(0.5));

    let bytes = std::fs::read(&path).unwrap();
    let from_bytes = Session::open(&bytes, &SessionOptions::default()).unwrap();
    assert_eq!(from_bytes.outputs(), session.outputs());
}

#[test]
#[ignore]
fn unknown_output_name() {
    let session = Session::open(&model_path(), &SessionOptions::default()).unwrap();
    let x = HostValue::from(vec![vec![vec![0.0f32; 5]; 4]; 3]);
    let err = session
        .run(Some(&["bad"]), [("x", x)], &RunOptions::default())
        .unwrap_err();
    assert!(matches!(err, ortbind::OrtError::InvalidOutputName { .. }), "{err:?}");
}

#[test]
#[ignore]
fn metadata_and_profiling() {
    let options = SessionOptions {
        enable_profiling: Some(true),
        ..Default::default()
    };
    let session = Session::open(&model_path(), &options).unwrap();
    let metadata = session.model_metadata().unwrap();
    println!("{}", serde_json::to_string_pretty(&metadata).unwrap());

    let profile = session.end_profiling().unwrap();
    assert!(profile.starts_with("onnxruntime_profile_"), "{profile}");
    let _ = std::fs::remove_file(profile);
}
