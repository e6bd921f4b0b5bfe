use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::error;

use endpoint_latency::config::{CPU_PROFILE_FILE, DEFAULT_MAX_RECORD_LEN, DEFAULT_READ_BUFFER_SIZE};
use endpoint_latency::logging::init_logging;
use endpoint_latency::profile::{self, CountingAllocator, CpuProfile};
use endpoint_latency::{analyze, report, AnalyzeError, Config, ProfileSettings};

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

/// Per-endpoint min/avg/max response times from a fixed-format access log.
///
/// Set CPU_PROFILE to write a timing report to ./cpu.prof, and MEM_PROFILE to
/// a path to write a heap snapshot there before exit.
#[derive(Parser)]
#[command(name = "endpoint-latency", version)]
struct Cli {
    /// Access log to analyze
    path: Option<PathBuf>,

    /// Number of parallel workers (defaults to the number of CPUs)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Longest supported log line in bytes; bounds the split lookback window
    #[arg(long, default_value_t = DEFAULT_MAX_RECORD_LEN)]
    max_record_len: usize,

    /// Bytes read per call inside each worker
    #[arg(long, default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    buffer_size: usize,

    /// Log level for diagnostics on stderr (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let started = Instant::now();
    let profiling = ProfileSettings::from_env();
    let path = cli.path.ok_or(AnalyzeError::MissingPath)?;

    let mut config = Config::default()
        .with_max_record_len(cli.max_record_len)
        .with_read_buffer_size(cli.buffer_size);
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }

    let analysis = analyze(&path, &config)?;

    let rendering = Instant::now();
    let mut out = BufWriter::new(io::stdout().lock());
    report::write_json(&analysis.stats, &mut out)
        .and_then(|()| out.flush())
        .map_err(AnalyzeError::Output)?;
    let render = rendering.elapsed();

    if profiling.cpu {
        let cpu = CpuProfile::new(&analysis, render, started.elapsed());
        profile::write_cpu_profile(Path::new(CPU_PROFILE_FILE), &cpu)?;
    }

    drop(analysis);
    if let Some(mem_path) = &profiling.mem_path {
        profile::write_heap_snapshot(mem_path)?;
    }
    Ok(())
}
