//! Streams one part of the log through the tokenizer into a local stats map.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::{AnalyzeError, RecordError};
use crate::intern::Interner;
use crate::planner::Part;
use crate::stats::StatsMap;
use crate::tokenizer;

/// Everything a worker hands back to the coordinator.
#[derive(Debug)]
pub struct PartSummary {
    pub index: usize,
    pub stats: StatsMap,
    pub records: u64,
    pub skipped: u64,
}

struct Accumulator {
    index: usize,
    stats: StatsMap,
    interner: Interner,
    records: u64,
    skipped: u64,
}

impl Accumulator {
    /// `segment` must start at a line boundary located at absolute `offset`.
    fn consume(&mut self, segment: &[u8], offset: u64) {
        for (line_offset, outcome) in tokenizer::records(segment) {
            let observed = outcome.and_then(|record| {
                let endpoint = self
                    .interner
                    .intern(record.endpoint)
                    .map_err(|_| RecordError::InvalidEndpoint)?;
                Ok((endpoint, record.response_time))
            });

            match observed {
                Ok((endpoint, response_time)) => {
                    self.stats.observe(endpoint, response_time);
                    self.records += 1;
                }
                Err(error) => {
                    self.skipped += 1;
                    warn!(
                        worker = self.index,
                        offset = offset + line_offset as u64,
                        %error,
                        "skipping record"
                    );
                }
            }
        }
    }
}

/// Processes `part` of the file at `path`, reading at most `buffer_size`
/// bytes at a time. Lines split across reads are carried over and tokenized
/// once complete; a trailing line without a newline is tokenized at the end.
pub fn process_part(
    path: &Path,
    index: usize,
    part: Part,
    buffer_size: usize,
) -> Result<PartSummary, AnalyzeError> {
    let started = Instant::now();

    let mut file = File::open(path).map_err(|source| AnalyzeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    file.seek(SeekFrom::Start(part.offset))
        .map_err(|source| AnalyzeError::Seek {
            path: path.to_path_buf(),
            offset: part.offset,
            source,
        })?;
    let mut reader = file.take(part.size);

    let capacity = usize::try_from(part.size)
        .unwrap_or(usize::MAX)
        .clamp(1, buffer_size.max(1));
    let mut buf = vec![0u8; capacity];
    let mut remainder: Vec<u8> = Vec::new();
    let mut remainder_offset = part.offset;
    let mut position = part.offset;

    let mut acc = Accumulator {
        index,
        stats: StatsMap::new(),
        interner: Interner::new(),
        records: 0,
        skipped: 0,
    };

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(AnalyzeError::Read {
                    path: path.to_path_buf(),
                    offset: position,
                    source,
                })
            }
        };
        let chunk = &buf[..n];

        match memchr::memrchr(b'\n', chunk) {
            None => {
                if remainder.is_empty() {
                    remainder_offset = position;
                }
                remainder.extend_from_slice(chunk);
            }
            Some(last) => {
                let mut start = 0;
                if !remainder.is_empty() {
                    // Only the carried bytes plus the first line of this chunk
                    // need to be stitched together.
                    let first = memchr::memchr(b'\n', chunk).unwrap_or(last);
                    remainder.extend_from_slice(&chunk[..=first]);
                    acc.consume(&remainder, remainder_offset);
                    remainder.clear();
                    start = first + 1;
                }
                if start <= last {
                    acc.consume(&chunk[start..=last], position + start as u64);
                }
                if last + 1 < n {
                    remainder_offset = position + last as u64 + 1;
                    remainder.extend_from_slice(&chunk[last + 1..]);
                }
            }
        }
        position += n as u64;
    }

    if !remainder.is_empty() {
        acc.consume(&remainder, remainder_offset);
    }

    debug!(
        worker = index,
        offset = part.offset,
        size = part.size,
        records = acc.records,
        skipped = acc.skipped,
        endpoints = acc.stats.len(),
        intern_hits = acc.interner.hits(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "part processed"
    );

    Ok(PartSummary {
        index,
        stats: acc.stats,
        records: acc.records,
        skipped: acc.skipped,
    })
}
