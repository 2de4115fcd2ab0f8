//! Session and run options.
//!
//! Both are plain serde structs so they can come from a config file. Unset
//! fields leave the engine's defaults alone.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::ptr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::{Api, cstring, ort_path, ortsys};
use crate::error::{OrtError, Result};
use crate::ffi::{self, OrtRunOptions, OrtSessionOptions};
use crate::handle::Handle;

/// Default prefix for profile files.
pub const DEFAULT_PROFILE_PREFIX: &str = "onnxruntime_profile_";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

impl ExecutionMode {
    fn as_raw(self) -> ffi::ExecutionMode {
        match self {
            ExecutionMode::Sequential => ffi::ORT_SEQUENTIAL,
            ExecutionMode::Parallel => ffi::ORT_PARALLEL,
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = OrtError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(OrtError::Argument(format!("invalid execution mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphOptimizationLevel {
    None,
    Basic,
    Extended,
    #[default]
    All,
}

impl GraphOptimizationLevel {
    fn as_raw(self) -> ffi::GraphOptimizationLevel {
        match self {
            GraphOptimizationLevel::None => ffi::ORT_DISABLE_ALL,
            GraphOptimizationLevel::Basic => ffi::ORT_ENABLE_BASIC,
            GraphOptimizationLevel::Extended => ffi::ORT_ENABLE_EXTENDED,
            GraphOptimizationLevel::All => ffi::ORT_ENABLE_ALL,
        }
    }
}

impl FromStr for GraphOptimizationLevel {
    type Err = OrtError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(GraphOptimizationLevel::None),
            "basic" => Ok(GraphOptimizationLevel::Basic),
            "extended" => Ok(GraphOptimizationLevel::Extended),
            "all" => Ok(GraphOptimizationLevel::All),
            other => Err(OrtError::Argument(format!(
                "invalid graph optimization level: {other}"
            ))),
        }
    }
}

/// How `Session::run` hands back tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Nested `HostValue::Array`s.
    #[default]
    Nested,
    /// `HostValue::Buffer` with an `ndarray` buffer.
    Buffer,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Nested => f.write_str("nested"),
            OutputKind::Buffer => f.write_str("buffer"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionOptions
// ---------------------------------------------------------------------------

/// Options applied when a session is opened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_cpu_mem_arena: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_mem_pattern: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_profiling: Option<bool>,

    /// Used when profiling is enabled. Defaults to `onnxruntime_profile_`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_file_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<ExecutionMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_optimization_level: Option<GraphOptimizationLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_op_num_threads: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intra_op_num_threads: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_severity_level: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_verbosity_level: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logid: Option<String>,

    /// Where the engine writes the optimized graph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_model_filepath: Option<PathBuf>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub free_dimension_overrides_by_denotation: BTreeMap<String, i64>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub free_dimension_overrides_by_name: BTreeMap<String, i64>,

    /// Passed through to `AddSessionConfigEntry` verbatim.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub session_config_entries: BTreeMap<String, String>,

    /// Execution providers in order of preference.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
}

impl SessionOptions {
    /// Parses options from JSON. Unknown keys and invalid enum values are
    /// argument errors.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| OrtError::Argument(format!("session options: {e}")))
    }

    pub(crate) fn profiling(&self) -> bool {
        self.enable_profiling.unwrap_or(false)
    }

    /// Creates the native options and applies every set field. Execution
    /// providers are appended by the session.
    pub(crate) fn build(&self, api: &Api) -> Result<Handle<OrtSessionOptions>> {
        let mut ptr = ptr::null_mut();
        ortsys!(api, CreateSessionOptions(&mut ptr))?;
        let options = Handle::new(api, ptr);
        let opts = options.as_ptr();

        if let Some(enable) = self.enable_cpu_mem_arena {
            if enable {
                ortsys!(api, EnableCpuMemArena(opts))?;
            } else {
                ortsys!(api, DisableCpuMemArena(opts))?;
            }
        }
        if let Some(enable) = self.enable_mem_pattern {
            if enable {
                ortsys!(api, EnableMemPattern(opts))?;
            } else {
                ortsys!(api, DisableMemPattern(opts))?;
            }
        }
        if let Some(enable) = self.enable_profiling {
            if enable {
                let prefix = self.profile_file_prefix.as_deref().unwrap_or(DEFAULT_PROFILE_PREFIX);
                let prefix = ort_path(OsStr::new(prefix))?;
                ortsys!(api, EnableProfiling(opts, prefix.as_ptr()))?;
            } else {
                ortsys!(api, DisableProfiling(opts))?;
            }
        }
        if let Some(mode) = self.execution_mode {
            ortsys!(api, SetSessionExecutionMode(opts, mode.as_raw()))?;
        }
        if let Some(level) = self.graph_optimization_level {
            ortsys!(api, SetSessionGraphOptimizationLevel(opts, level.as_raw()))?;
        }
        if let Some(n) = self.inter_op_num_threads {
            ortsys!(api, SetInterOpNumThreads(opts, n))?;
        }
        if let Some(n) = self.intra_op_num_threads {
            ortsys!(api, SetIntraOpNumThreads(opts, n))?;
        }
        if let Some(level) = self.log_severity_level {
            ortsys!(api, SetSessionLogSeverityLevel(opts, level))?;
        }
        if let Some(level) = self.log_verbosity_level {
            ortsys!(api, SetSessionLogVerbosityLevel(opts, level))?;
        }
        if let Some(logid) = &self.logid {
            let logid = cstring(logid)?;
            ortsys!(api, SetSessionLogId(opts, logid.as_ptr()))?;
        }
        if let Some(path) = &self.optimized_model_filepath {
            let path = ort_path(path.as_os_str())?;
            ortsys!(api, SetOptimizedModelFilePath(opts, path.as_ptr()))?;
        }
        for (denotation, value) in &self.free_dimension_overrides_by_denotation {
            let denotation = cstring(denotation)?;
            ortsys!(api, AddFreeDimensionOverride(opts, denotation.as_ptr(), *value))?;
        }
        for (name, value) in &self.free_dimension_overrides_by_name {
            let name = cstring(name)?;
            ortsys!(api, AddFreeDimensionOverrideByName(opts, name.as_ptr(), *value))?;
        }
        for (key, value) in &self.session_config_entries {
            let key = cstring(key)?;
            let value = cstring(value)?;
            ortsys!(api, AddSessionConfigEntry(opts, key.as_ptr(), value.as_ptr()))?;
        }

        Ok(options)
    }
}

// ---------------------------------------------------------------------------
// RunOptions
// ---------------------------------------------------------------------------

/// Options for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_severity_level: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_verbosity_level: Option<i32>,

    /// Run tag, shown in engine logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Asks the engine to stop at its next checkpoint.
    pub terminate: bool,

    pub output: OutputKind,
}

impl RunOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| OrtError::Argument(format!("run options: {e}")))
    }

    pub(crate) fn build(&self, api: &Api) -> Result<Handle<OrtRunOptions>> {
        let mut ptr = ptr::null_mut();
        ortsys!(api, CreateRunOptions(&mut ptr))?;
        let options = Handle::new(api, ptr);
        let opts = options.as_ptr();

        if let Some(level) = self.log_severity_level {
            ortsys!(api, RunOptionsSetRunLogSeverityLevel(opts, level))?;
        }
        if let Some(level) = self.log_verbosity_level {
            ortsys!(api, RunOptionsSetRunLogVerbosityLevel(opts, level))?;
        }
        if let Some(tag) = &self.tag {
            let tag = cstring(tag)?;
            ortsys!(api, RunOptionsSetRunTag(opts, tag.as_ptr()))?;
        }
        if self.terminate {
            ortsys!(api, RunOptionsSetTerminate(opts))?;
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn enums_from_str() {
        assert_eq!("parallel".parse::<ExecutionMode>().unwrap(), ExecutionMode::Parallel);
        assert_eq!(
            "extended".parse::<GraphOptimizationLevel>().unwrap(),
            GraphOptimizationLevel::Extended
        );
        assert!(matches!(
            "fast".parse::<ExecutionMode>(),
            Err(OrtError::Argument(msg)) if msg.contains("fast")
        ));
        assert!(matches!(
            "max".parse::<GraphOptimizationLevel>(),
            Err(OrtError::Argument(_))
        ));
    }

    #[test]
    fn from_json_rejects_bad_enum() {
        let err = SessionOptions::from_json(r#"{"execution_mode": "turbo"}"#).unwrap_err();
        assert!(matches!(err, OrtError::Argument(_)), "{err:?}");

        let err = SessionOptions::from_json(r#"{"graph_optimization_level": "max"}"#).unwrap_err();
        assert!(matches!(err, OrtError::Argument(_)), "{err:?}");
    }

    #[test]
    fn from_json_full() {
        let opts = SessionOptions::from_json(
            r#"{
                "execution_mode": "parallel",
                "graph_optimization_level": "basic",
                "intra_op_num_threads": 2,
                "free_dimension_overrides_by_name": {"batch": 1},
                "session_config_entries": {"session.use_env_allocators": "1"},
                "providers": ["CPUExecutionProvider"]
            }"#,
        )
        .unwrap();
        assert_eq!(opts.execution_mode, Some(ExecutionMode::Parallel));
        assert_eq!(opts.graph_optimization_level, Some(GraphOptimizationLevel::Basic));
        assert_eq!(opts.intra_op_num_threads, Some(2));
        assert_eq!(opts.free_dimension_overrides_by_name["batch"], 1);
        assert_eq!(opts.providers, vec!["CPUExecutionProvider"]);

        let json = serde_json::to_string(&opts).unwrap();
        assert!(!json.contains("enable_profiling"));
    }

    #[test]
    fn build_applies_set_fields() {
        let engine = mock::lock();
        let opts = SessionOptions {
            enable_cpu_mem_arena: Some(false),
            enable_profiling: Some(true),
            execution_mode: Some(ExecutionMode::Parallel),
            graph_optimization_level: Some(GraphOptimizationLevel::All),
            logid: Some("test".into()),
            free_dimension_overrides_by_denotation: BTreeMap::from([("DATA_BATCH".into(), 4)]),
            ..Default::default()
        };
        let handle = opts.build(engine.api()).unwrap();
        drop(handle);

        let calls = engine.calls();
        assert!(calls.contains(&"DisableCpuMemArena".to_string()), "{calls:?}");
        assert!(calls.contains(&"EnableProfiling(onnxruntime_profile_)".to_string()));
        assert!(calls.contains(&"SetSessionExecutionMode(1)".to_string()));
        assert!(calls.contains(&"SetSessionGraphOptimizationLevel(99)".to_string()));
        assert!(calls.contains(&"SetSessionLogId(test)".to_string()));
        assert!(calls.contains(&"AddFreeDimensionOverride(DATA_BATCH=4)".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("SetIntraOpNumThreads")));
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn run_options_build() {
        let engine = mock::lock();
        let opts = RunOptions {
            tag: Some("batch-7".into()),
            terminate: true,
            ..Default::default()
        };
        drop(opts.build(engine.api()).unwrap());
        let calls = engine.calls();
        assert!(calls.contains(&"RunOptionsSetRunTag(batch-7)".to_string()));
        assert!(calls.contains(&"RunOptionsSetTerminate".to_string()));
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn run_options_from_json() {
        let opts = RunOptions::from_json(r#"{"output": "buffer", "tag": "t"}"#).unwrap();
        assert_eq!(opts.output, OutputKind::Buffer);
        assert!(RunOptions::from_json(r#"{"output": "numo"}"#).is_err());
    }
}
