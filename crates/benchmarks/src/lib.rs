//! Benchmark instrumentation for the inventory listener.
//!
//! This crate measures ingestion throughput over fixed-size batches of
//! processed messages and exports the finished batches.
//!
//! # Quick Start
//!
//! ```
//! use std::num::NonZeroUsize;
//! use inventory_listener_benchmarks::BenchmarkRecorder;
//!
//! let recorder = BenchmarkRecorder::new(NonZeroUsize::new(2).unwrap());
//! assert!(recorder.observe().is_none());
//! let report = recorder.observe().unwrap();
//! assert_eq!(report.batch_size, 2);
//! assert_eq!(recorder.collected(), 0);
//! ```
//!
//! # Modules
//!
//! - [`recorder`] - The shared batch throughput recorder
//! - [`result`] - The canonical `BenchmarkResult` struct
//! - [`io`] - I/O operations for reading/writing results

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod io;
pub mod recorder;
pub mod result;

pub use recorder::{BatchReport, BenchmarkRecorder};
pub use result::BenchmarkResult;
