//! In-process synced element queue.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use composer_cmd::transport::{SharedMemQueue, Transport};
//!
//! let queue = SharedMemQueue::with_capacity(4);
//! queue.write(&[1, 0, 0, 0, 2, 0, 0, 0], 2, Duration::from_millis(10)).unwrap();
//!
//! let mut buf = [0u8; 8];
//! queue.read(&mut buf, 2, Duration::from_millis(10)).unwrap();
//! assert_eq!(buf, [1, 0, 0, 0, 2, 0, 0, 0]);
//! ```

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use tracing::warn;

use super::Transport;
use crate::error::{ComposerError, Result, StatusCode};
use crate::protocol::ELEMENT_SIZE;

/// Bounded byte queue with blocking element reads and writes.
#[derive(Debug)]
pub struct SharedMemQueue {
    capacity: usize,
    data: Mutex<VecDeque<u8>>,
    readable: Condvar,
    writable: Condvar,
}

impl SharedMemQueue {
    /// Elements currently queued.
    pub fn available(&self) -> usize {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
            / ELEMENT_SIZE
    }

    fn check_request(&self, buf_len: usize, count: usize) -> Result<usize> {
        let bytes = count.saturating_mul(ELEMENT_SIZE);
        if count > self.capacity {
            return Err(ComposerError::Transport(StatusCode::INVALID_PARAM));
        }
        if buf_len < bytes {
            return Err(ComposerError::Protocol(format!(
                "Buffer of {} bytes cannot hold {} elements",
                buf_len, count
            )));
        }
        Ok(bytes)
    }
}

impl Transport for SharedMemQueue {
    fn with_capacity(elements: usize) -> Self {
        Self {
            capacity: elements,
            data: Mutex::new(VecDeque::with_capacity(elements * ELEMENT_SIZE)),
            readable: Condvar::new(),
            writable: Condvar::new(),
        }
    }

    fn read(&self, buf: &mut [u8], count: usize, timeout: Duration) -> Result<()> {
        let bytes = self.check_request(buf.len(), count)?;
        let guard = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut data, _) = self
            .readable
            .wait_timeout_while(guard, timeout, |data| data.len() < bytes)
            .unwrap_or_else(PoisonError::into_inner);

        if data.len() < bytes {
            warn!(count, available = data.len() / ELEMENT_SIZE, "Queue read timed out");
            return Err(ComposerError::Timeout);
        }

        for (dst, src) in buf[..bytes].iter_mut().zip(data.drain(..bytes)) {
            *dst = src;
        }
        drop(data);
        self.writable.notify_all();
        Ok(())
    }

    fn write(&self, buf: &[u8], count: usize, timeout: Duration) -> Result<()> {
        let bytes = self.check_request(buf.len(), count)?;
        let limit = self.capacity * ELEMENT_SIZE;
        let guard = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut data, _) = self
            .writable
            .wait_timeout_while(guard, timeout, |data| limit - data.len() < bytes)
            .unwrap_or_else(PoisonError::into_inner);

        if limit - data.len() < bytes {
            warn!(count, free = (limit - data.len()) / ELEMENT_SIZE, "Queue write timed out");
            return Err(ComposerError::Timeout);
        }

        data.extend(&buf[..bytes]);
        drop(data);
        self.readable.notify_all();
        Ok(())
    }

    fn size(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const WAIT: Duration = Duration::from_millis(20);

    #[test]
    fn test_write_then_read() {
        let queue = SharedMemQueue::with_capacity(8);
        let payload: Vec<u8> = (0..16).collect();
        queue.write(&payload, 4, WAIT).unwrap();
        assert_eq!(queue.available(), 4);

        let mut out = vec![0u8; 16];
        queue.read(&mut out, 4, WAIT).unwrap();
        assert_eq!(out, payload);
        assert_eq!(queue.available(), 0);
    }

    #[test]
    fn test_read_times_out_without_consuming() {
        let queue = SharedMemQueue::with_capacity(8);
        queue.write(&[7u8; 4], 1, WAIT).unwrap();

        let mut out = [0u8; 8];
        let err = queue.read(&mut out, 2, WAIT).unwrap_err();
        assert!(matches!(err, ComposerError::Timeout));
        assert_eq!(queue.available(), 1);
    }

    #[test]
    fn test_write_times_out_when_full() {
        let queue = SharedMemQueue::with_capacity(2);
        queue.write(&[0u8; 8], 2, WAIT).unwrap();
        let err = queue.write(&[0u8; 4], 1, WAIT).unwrap_err();
        assert!(matches!(err, ComposerError::Timeout));
    }

    #[test]
    fn test_count_above_capacity_rejected() {
        let queue = SharedMemQueue::with_capacity(2);
        let err = queue.write(&[0u8; 12], 3, WAIT).unwrap_err();
        assert!(matches!(
            err,
            ComposerError::Transport(StatusCode::INVALID_PARAM)
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let queue = SharedMemQueue::with_capacity(4);
        assert!(queue.write(&[0u8; 6], 2, WAIT).is_err());
    }

    #[test]
    fn test_blocked_reader_woken_by_writer() {
        let queue = Arc::new(SharedMemQueue::with_capacity(4));
        let reader = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut out = [0u8; 8];
                queue
                    .read(&mut out, 2, Duration::from_secs(5))
                    .map(|_| out)
            })
        };

        thread::sleep(Duration::from_millis(10));
        queue.write(&[1, 0, 0, 0, 2, 0, 0, 0], 2, WAIT).unwrap();
        let out = reader.join().unwrap().unwrap();
        assert_eq!(out, [1, 0, 0, 0, 2, 0, 0, 0]);
    }
}
