//! Concurrency utilities for coordinating pipeline shutdown.
//!
//! The extraction core funnels all cross-task communication through the partition
//! queue; the only other coordination primitive it needs is a broadcast shutdown
//! signal, provided by the [`shutdown`] module.

pub mod shutdown;
