//! Sandbox configuration and per-execution resource limits

use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Host-side configuration shared by all executions of one judge instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Path to Python interpreter
    pub python_path: PathBuf,

    /// Path to Node.js interpreter
    pub node_path: PathBuf,

    /// Working directory for sandboxed processes
    pub workdir: PathBuf,

    /// Environment variables visible inside the sandbox (host env is cleared)
    pub env: Vec<(String, String)>,

    /// Capture cap per output stream, in bytes; excess is discarded and flagged
    pub capture_limit: usize,

    /// Maximum number of simultaneously running sandboxes
    pub max_concurrent: usize,

    /// Maximum number of processes/threads per sandbox
    pub max_pids: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            python_path: PathBuf::from("/usr/bin/python3"),
            node_path: PathBuf::from("/usr/bin/node"),
            workdir: std::env::temp_dir(),
            env: vec![
                ("PATH".into(), "/usr/bin:/bin".into()),
                ("HOME".into(), "/tmp".into()),
                ("TMPDIR".into(), "/tmp".into()),
            ],
            capture_limit: 1024 * 1024, // 1MB per stream
            max_concurrent: 8,
            max_pids: 16,
        }
    }
}

impl SandboxConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }

    /// Interpreter path for a language.
    #[must_use]
    pub fn interpreter(&self, language: Language) -> &Path {
        match language {
            Language::Python => &self.python_path,
            Language::JavaScript => &self.node_path,
        }
    }
}

/// Builder for SandboxConfig
#[derive(Debug, Default)]
pub struct SandboxConfigBuilder {
    config: SandboxConfig,
}

impl SandboxConfigBuilder {
    #[must_use]
    pub fn python_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.python_path = path.into();
        self
    }

    #[must_use]
    pub fn node_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.node_path = path.into();
        self
    }

    #[must_use]
    pub fn workdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.workdir = path.into();
        self
    }

    #[must_use]
    pub fn capture_limit(mut self, bytes: usize) -> Self {
        self.config.capture_limit = bytes;
        self
    }

    #[must_use]
    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.max_concurrent = n.max(1);
        self
    }

    #[must_use]
    pub fn max_pids(mut self, n: u32) -> Self {
        self.config.max_pids = n;
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn build(self) -> SandboxConfig {
        self.config
    }
}

/// Resource limits for a single execution.
///
/// Deliberately has no `Default`: the caller always states the budget for a
/// run explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    /// Hard wall-clock deadline; the process group is killed when it expires
    pub wall_time: Duration,

    /// Address-space ceiling in bytes
    pub memory_bytes: u64,
}

impl Limits {
    #[must_use]
    pub const fn new(time_ms: u64, memory_mb: u64) -> Self {
        Self {
            wall_time: Duration::from_millis(time_ms),
            memory_bytes: memory_mb * 1024 * 1024,
        }
    }

    /// CPU-seconds backstop derived from the wall-clock budget; catches
    /// spin loops even if the host-side deadline handling is delayed.
    #[must_use]
    pub const fn cpu_seconds(&self) -> u64 {
        self.wall_time.as_secs() + 2
    }
}
