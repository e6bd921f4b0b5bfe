//! Runs the whole analysis: plan, process parts in parallel, merge.

use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use rayon::ThreadPoolBuilder;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AnalyzeError;
use crate::planner;
use crate::stats::StatsMap;
use crate::worker::{self, PartSummary};

#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub plan: Duration,
    pub process: Duration,
    pub merge: Duration,
}

#[derive(Debug)]
pub struct Analysis {
    pub stats: StatsMap,
    pub records: u64,
    pub skipped: u64,
    pub workers: usize,
    pub parts: Vec<planner::Part>,
    pub timings: PhaseTimings,
}

type Outcome = (usize, Result<PartSummary, AnalyzeError>);

/// Analyzes the log at `path`.
///
/// Every worker runs to completion before any failure is reported; when
/// several parts fail, the error of the lowest-indexed part is returned.
pub fn analyze(path: &Path, config: &Config) -> Result<Analysis, AnalyzeError> {
    config.validate()?;

    let planning = Instant::now();
    let parts = planner::plan_file(path, config)?;
    let plan = planning.elapsed();

    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("latency-worker-{i}"))
        .build()?;

    let processing = Instant::now();
    let (tx, rx) = bounded::<Outcome>(parts.len());
    pool.scope(|scope| {
        for (index, &part) in parts.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let outcome = worker::process_part(path, index, part, config.read_buffer_size);
                // Capacity equals the number of parts, so this never blocks.
                let _ = tx.send((index, outcome));
            });
        }
    });
    drop(tx);
    let mut outcomes: Vec<Outcome> = rx.iter().collect();
    let process = processing.elapsed();

    let merging = Instant::now();
    outcomes.sort_unstable_by_key(|(index, _)| *index);

    let mut stats = StatsMap::new();
    let mut records = 0;
    let mut skipped = 0;
    let mut failure = None;

    for (index, outcome) in outcomes {
        match outcome {
            Ok(summary) => {
                records += summary.records;
                skipped += summary.skipped;
                if failure.is_none() {
                    stats.merge(summary.stats);
                }
            }
            Err(err) => {
                if failure.is_none() {
                    failure = Some(err);
                } else {
                    warn!(worker = index, error = %err, "additional worker failure");
                }
            }
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }
    let merge = merging.elapsed();

    debug!(
        parts = parts.len(),
        records,
        skipped,
        endpoints = stats.len(),
        "analysis complete"
    );

    Ok(Analysis {
        stats,
        records,
        skipped,
        workers: config.workers,
        parts,
        timings: PhaseTimings {
            plan,
            process,
            merge,
        },
    })
}
