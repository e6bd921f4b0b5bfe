//! Run timings and allocation counters. Heap counters only move when
//! [`CountingAllocator`] is the global allocator.

use std::alloc::{GlobalAlloc, Layout, System};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::analyzer::Analysis;
use crate::error::AnalyzeError;

static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static PEAK_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);

/// Pass-through to the system allocator that keeps allocation counters.
pub struct CountingAllocator;

#[inline]
fn record_alloc(size: usize) {
    let size = size as u64;
    ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    ALLOCATED_BYTES.fetch_add(size, Ordering::Relaxed);
    let live = LIVE_BYTES.fetch_add(size, Ordering::Relaxed) + size;
    PEAK_BYTES.fetch_max(live, Ordering::Relaxed);
}

#[inline]
fn record_dealloc(size: usize) {
    LIVE_BYTES.fetch_sub(size as u64, Ordering::Relaxed);
}

unsafe impl GlobalAlloc for CountingAllocator {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        record_dealloc(layout.size());
        unsafe { System.dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            record_dealloc(layout.size());
            record_alloc(new_size);
        }
        new_ptr
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeapSnapshot {
    pub live_bytes: u64,
    pub peak_bytes: u64,
    pub allocations: u64,
    pub allocated_bytes: u64,
}

pub fn heap_snapshot() -> HeapSnapshot {
    HeapSnapshot {
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
        peak_bytes: PEAK_BYTES.load(Ordering::Relaxed),
        allocations: ALLOCATIONS.load(Ordering::Relaxed),
        allocated_bytes: ALLOCATED_BYTES.load(Ordering::Relaxed),
    }
}

/// Run timings written to `cpu.prof`.
#[derive(Debug, Clone, Serialize)]
pub struct CpuProfile {
    pub workers: usize,
    pub parts: usize,
    pub records: u64,
    pub skipped: u64,
    pub plan_ms: f64,
    pub process_ms: f64,
    pub merge_ms: f64,
    pub render_ms: f64,
    pub total_ms: f64,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

impl CpuProfile {
    pub fn new(analysis: &Analysis, render: Duration, total: Duration) -> Self {
        Self {
            workers: analysis.workers,
            parts: analysis.parts.len(),
            records: analysis.records,
            skipped: analysis.skipped,
            plan_ms: millis(analysis.timings.plan),
            process_ms: millis(analysis.timings.process),
            merge_ms: millis(analysis.timings.merge),
            render_ms: millis(render),
            total_ms: millis(total),
        }
    }
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), AnalyzeError> {
    let to_error = |source: std::io::Error| AnalyzeError::Profile {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_error)?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value).map_err(|e| to_error(e.into()))?;
    out.write_all(b"\n").map_err(to_error)?;
    out.flush().map_err(to_error)
}

pub fn write_cpu_profile(path: &Path, profile: &CpuProfile) -> Result<(), AnalyzeError> {
    write_json_file(path, profile)
}

pub fn write_heap_snapshot(path: &Path) -> Result<(), AnalyzeError> {
    write_json_file(path, &heap_snapshot())
}
