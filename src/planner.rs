//! Splits the input into line-aligned byte ranges, one per worker.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::config::Config;
use crate::error::AnalyzeError;

/// Contiguous byte range `[offset, offset + size)` of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub offset: u64,
    pub size: u64,
}

impl Part {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

fn is_single_part(file_size: u64, config: &Config) -> bool {
    file_size / (config.workers.max(1) as u64) < config.min_part_size
}

/// Plans parts over an in-memory view of the whole file.
///
/// Each of the first `workers - 1` boundaries is placed just after the last
/// newline inside the `max_record_len` bytes preceding `offset + file_size /
/// workers`. The final part runs to the end of the file.
pub fn plan(data: &[u8], config: &Config) -> Result<Vec<Part>, AnalyzeError> {
    let file_size = data.len() as u64;
    let workers = config.workers.max(1);
    if is_single_part(file_size, config) {
        return Ok(vec![Part {
            offset: 0,
            size: file_size,
        }]);
    }

    let chunk = file_size / workers as u64;
    let lookback = config.max_record_len as u64;
    let mut parts = Vec::with_capacity(workers);
    let mut offset = 0u64;

    for _ in 1..workers {
        let target = offset + chunk;
        let window_start = target.saturating_sub(lookback).max(offset);
        let window = &data[window_start as usize..target as usize];
        let newline = memchr::memrchr(b'\n', window).ok_or(AnalyzeError::RecordTooLong {
            offset: target,
            limit: config.max_record_len,
        })?;

        let next = window_start + newline as u64 + 1;
        parts.push(Part {
            offset,
            size: next - offset,
        });
        offset = next;
    }

    if offset < file_size {
        parts.push(Part {
            offset,
            size: file_size - offset,
        });
    }
    Ok(parts)
}

/// Plans parts for the file at `path`.
pub fn plan_file(path: &Path, config: &Config) -> Result<Vec<Part>, AnalyzeError> {
    let file = File::open(path).map_err(|source| AnalyzeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let file_size = file
        .metadata()
        .map_err(|source| AnalyzeError::Metadata {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    let parts = if is_single_part(file_size, config) {
        vec![Part {
            offset: 0,
            size: file_size,
        }]
    } else {
        // SAFETY: the log is treated as read-only for the duration of the run;
        // only the lookback windows are touched.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| AnalyzeError::Read {
            path: path.to_path_buf(),
            offset: 0,
            source,
        })?;
        plan(&mmap, config)?
    };

    debug!(file_size, parts = parts.len(), "planned parts");
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(workers: usize) -> Config {
        Config::default().with_workers(workers)
    }

    fn assert_partition(data: &[u8], parts: &[Part]) {
        let mut expected = 0u64;
        for part in parts {
            assert_eq!(part.offset, expected);
            if part.offset > 0 {
                assert_eq!(data[part.offset as usize - 1], b'\n');
            }
            expected = part.end();
        }
        assert_eq!(expected, data.len() as u64);
    }

    fn lines(count: usize, width: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(count * width);
        for i in 0..count {
            let body = format!("{:0>w$}", i, w = width - 1);
            data.extend_from_slice(body.as_bytes());
            data.push(b'\n');
        }
        data
    }

    #[test]
    fn small_input_is_a_single_part() {
        let data = lines(10, 50);
        let parts = plan(&data, &config(4)).unwrap();
        assert_eq!(parts, vec![Part { offset: 0, size: 500 }]);
    }

    #[test]
    fn split_threshold_is_bytes_per_worker() {
        let below = lines(127, 64);
        assert_eq!(plan(&below, &config(2)).unwrap().len(), 1);

        let at = lines(128, 64);
        let parts = plan(&at, &config(2)).unwrap();
        assert_eq!(parts.len(), 2);
        assert_partition(&at, &parts);
    }

    #[test]
    fn empty_input_is_a_single_empty_part() {
        assert_eq!(plan(&[], &config(8)).unwrap(), vec![Part { offset: 0, size: 0 }]);
    }

    #[test]
    fn large_input_splits_on_line_boundaries() {
        let data = lines(2_000, 80);
        let parts = plan(&data, &config(4)).unwrap();
        assert_eq!(parts.len(), 4);
        assert_partition(&data, &parts);
    }

    #[test]
    fn record_longer_than_lookback_fails() {
        let mut data = vec![b'x'; 20_000];
        data.push(b'\n');
        let err = plan(&data, &config(2)).unwrap_err();
        assert!(matches!(err, AnalyzeError::RecordTooLong { limit: 100, .. }));
    }

    #[test]
    fn longer_lookback_accepts_longer_records() {
        let data = lines(101, 250);
        assert!(plan(&data, &config(2)).is_err());

        let parts = plan(&data, &config(2).with_max_record_len(256)).unwrap();
        assert_eq!(parts.len(), 2);
        assert_partition(&data, &parts);
    }

    proptest! {
        #[test]
        fn parts_always_partition_the_input(
            widths in prop::collection::vec(1usize..=100, 0..600),
            workers in 1usize..16,
        ) {
            let mut data = Vec::new();
            for width in widths {
                data.extend(std::iter::repeat(b'a').take(width - 1));
                data.push(b'\n');
            }

            let config = config(workers).with_min_part_size(128);
            let parts = plan(&data, &config).unwrap();
            prop_assert!(parts.len() <= workers);
            assert_partition(&data, &parts);
        }
    }
}
