use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use crate::error::AnalyzeError;

/// Bytes requested per read call inside a worker.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 32 * 1024 * 1024;

/// Lookback window used to find a line boundary near each split point.
/// Also the longest record the planner can split around.
pub const DEFAULT_MAX_RECORD_LEN: usize = 100;

/// Below this many bytes per worker the file is processed as a single part.
pub const DEFAULT_MIN_PART_SIZE: u64 = 4096;

/// Fixed name of the CPU profile artifact.
pub const CPU_PROFILE_FILE: &str = "cpu.prof";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workers: usize,
    pub read_buffer_size: usize,
    pub max_record_len: usize,
    pub min_part_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: available_workers(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            min_part_size: DEFAULT_MIN_PART_SIZE,
        }
    }
}

impl Config {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_max_record_len(mut self, len: usize) -> Self {
        self.max_record_len = len;
        self
    }

    pub fn with_min_part_size(mut self, size: u64) -> Self {
        self.min_part_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), AnalyzeError> {
        if self.workers == 0 {
            return Err(AnalyzeError::Config("worker count must be at least 1".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(AnalyzeError::Config("read buffer size must be at least 1 byte".into()));
        }
        if self.max_record_len == 0 {
            return Err(AnalyzeError::Config("maximum record length must be at least 1 byte".into()));
        }
        if self.min_part_size == 0 {
            return Err(AnalyzeError::Config("minimum part size must be at least 1 byte".into()));
        }
        Ok(())
    }
}

/// Hardware concurrency, falling back to a single worker.
pub fn available_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Profiling switches taken from `CPU_PROFILE` and `MEM_PROFILE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSettings {
    pub cpu: bool,
    pub mem_path: Option<PathBuf>,
}

impl ProfileSettings {
    pub fn from_env() -> Self {
        Self::from_values(env::var_os("CPU_PROFILE"), env::var_os("MEM_PROFILE"))
    }

    fn from_values(cpu: Option<std::ffi::OsString>, mem: Option<std::ffi::OsString>) -> Self {
        Self {
            cpu: cpu.is_some_and(|v| !v.is_empty()),
            mem_path: mem.filter(|v| !v.is_empty()).map(PathBuf::from),
        }
    }
}
