use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a run.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("no input file given (usage: endpoint-latency <access.log>)")]
    MissingPath,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot stat {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot seek {path} to offset {offset}: {source}")]
    Seek {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("cannot read {path} at offset {offset}: {source}")]
    Read {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("no newline within {limit} bytes before offset {offset}; a record exceeds the maximum record length")]
    RecordTooLong { offset: u64, limit: usize },

    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("cannot write profile {path}: {source}")]
    Profile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write report: {0}")]
    Output(#[source] io::Error),
}

/// A single log line that could not be turned into a record. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("line has no endpoint/response-time fields")]
    MissingFields,

    #[error("empty response time")]
    EmptyField,

    #[error("invalid digit {0:?} in response time")]
    InvalidDigit(char),

    #[error("response time does not fit in 64 bits")]
    Overflow,

    #[error("endpoint is not valid UTF-8")]
    InvalidEndpoint,
}
