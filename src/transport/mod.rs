//! Transport module - element queues that carry batches between processes.
//!
//! The dispatcher only needs blocking, whole-count reads and writes with a
//! timeout, expressed in 4-byte elements. [`Transport`] captures that
//! contract; [`SharedMemQueue`] is an in-process synced implementation.

mod queue;

use std::time::Duration;

use crate::error::Result;

pub use queue::SharedMemQueue;

/// Element queue used for request and reply batches.
pub trait Transport: Send + Sync {
    /// Create a queue holding up to `elements` elements.
    fn with_capacity(elements: usize) -> Self
    where
        Self: Sized;

    /// Read exactly `count` elements into `buf`, waiting up to `timeout`.
    ///
    /// Partial reads are not supported: either all elements arrive or the
    /// call fails and nothing is consumed.
    fn read(&self, buf: &mut [u8], count: usize, timeout: Duration) -> Result<()>;

    /// Write exactly `count` elements from `buf`, waiting up to `timeout`.
    fn write(&self, buf: &[u8], count: usize, timeout: Duration) -> Result<()>;

    /// Capacity in elements.
    fn size(&self) -> usize;
}
