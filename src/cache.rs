//! Buffer handle cache.
//!
//! Lets a client send a full buffer descriptor once and reference it by
//! sequence number afterwards. The cache is two-level: a [`DeviceCache`] per
//! device holds the client target binding and a [`LayerCache`] per layer.
//! All of it sits behind the single lock of [`DeviceCacheManager`], and the
//! vendor callback passed to `set_buffer` runs while that lock is held, so a
//! resolved handle cannot be evicted before the vendor has used it.
//!
//! # Example
//!
//! ```
//! use composer_cmd::buffer::BufferHandle;
//! use composer_cmd::cache::DeviceCacheManager;
//!
//! let manager = DeviceCacheManager::new();
//! let status = manager.with_device(0, |dev| {
//!     dev.layer_cache_instance(3)
//!         .set_layer_buffer(Some(BufferHandle::default()), 1, &[], |_handle| Ok(()))
//! });
//! assert!(status.is_ok());
//!
//! // The same sequence number resolves from the cache without a descriptor.
//! let status = manager.with_device(0, |dev| {
//!     dev.layer_cache_instance(3)
//!         .set_layer_buffer(None, 1, &[], |_handle| Ok(()))
//! });
//! assert!(status.is_ok());
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::buffer::BufferHandle;
use crate::error::{StatusCode, VdiResult};

/// Handles keyed by sequence number, plus the currently bound one.
#[derive(Debug, Default)]
pub struct BufferCache {
    entries: HashMap<u32, BufferHandle>,
    current: Option<u32>,
}

impl BufferCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the handle for `seq` and hand it to `apply`.
    ///
    /// Steps, in order:
    /// 1. Every id in `deleting` is evicted. Unknown ids are ignored.
    /// 2. A fresh `buffer` is used as is; without one, `seq` must already be
    ///    cached or the call fails with `FAILURE`.
    /// 3. `apply` runs with the resolved handle. A fresh handle is stored under
    ///    `seq` only if `apply` succeeds; otherwise it is dropped and any older
    ///    entry for `seq` stays.
    pub fn set_buffer<F>(
        &mut self,
        buffer: Option<BufferHandle>,
        seq: u32,
        deleting: &[u32],
        apply: F,
    ) -> VdiResult<()>
    where
        F: FnOnce(&BufferHandle) -> VdiResult<()>,
    {
        for id in deleting {
            self.erase(*id);
        }

        match buffer {
            Some(handle) => {
                apply(&handle)?;
                if self.entries.insert(seq, handle).is_some() {
                    debug!(seq, "Replaced cached buffer");
                }
            }
            None => {
                let handle = self.entries.get(&seq).ok_or_else(|| {
                    warn!(seq, "No cached buffer for sequence number");
                    StatusCode::FAILURE
                })?;
                apply(handle)?;
            }
        }

        self.current = Some(seq);
        Ok(())
    }

    /// Evict `seq`, closing its descriptors. Returns whether it was present.
    pub fn erase(&mut self, seq: u32) -> bool {
        if self.current == Some(seq) {
            self.current = None;
        }
        self.entries.remove(&seq).is_some()
    }

    /// Cached handle for `seq`.
    #[inline]
    pub fn get(&self, seq: u32) -> Option<&BufferHandle> {
        self.entries.get(&seq)
    }

    /// Check if `seq` is cached.
    #[inline]
    pub fn contains(&self, seq: u32) -> bool {
        self.entries.contains_key(&seq)
    }

    /// Sequence number of the most recently applied handle.
    #[inline]
    pub fn current_seq(&self) -> Option<u32> {
        self.current
    }

    /// Number of cached handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is cached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-layer buffer state.
///
/// A deletion list is applied immediately on the call that carries it; no
/// retired set is kept between calls.
#[derive(Debug, Default)]
pub struct LayerCache {
    buffers: BufferCache,
}

impl LayerCache {
    /// Bind a layer buffer, evicting `deleting` first.
    pub fn set_layer_buffer<F>(
        &mut self,
        buffer: Option<BufferHandle>,
        seq: u32,
        deleting: &[u32],
        apply: F,
    ) -> VdiResult<()>
    where
        F: FnOnce(&BufferHandle) -> VdiResult<()>,
    {
        self.buffers.set_buffer(buffer, seq, deleting, apply)
    }

    /// Underlying handle table.
    #[inline]
    pub fn buffers(&self) -> &BufferCache {
        &self.buffers
    }
}

/// Per-device state: the client target binding and the layer caches.
#[derive(Debug, Default)]
pub struct DeviceCache {
    client: BufferCache,
    layers: HashMap<u32, LayerCache>,
}

impl DeviceCache {
    /// Bind the client target buffer.
    pub fn set_display_client_buffer<F>(
        &mut self,
        buffer: Option<BufferHandle>,
        seq: u32,
        apply: F,
    ) -> VdiResult<()>
    where
        F: FnOnce(&BufferHandle) -> VdiResult<()>,
    {
        self.client.set_buffer(buffer, seq, &[], apply)
    }

    /// Layer cache for `layer_id`, created on first use.
    pub fn layer_cache_instance(&mut self, layer_id: u32) -> &mut LayerCache {
        self.layers.entry(layer_id).or_default()
    }

    /// Layer cache for `layer_id`, if it exists.
    pub fn layer(&self, layer_id: u32) -> Option<&LayerCache> {
        self.layers.get(&layer_id)
    }

    /// Client target handle table.
    #[inline]
    pub fn client_buffers(&self) -> &BufferCache {
        &self.client
    }

    /// Number of layer caches.
    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// Process-wide owner of every device cache.
#[derive(Debug, Default)]
pub struct DeviceCacheManager {
    devices: Mutex<HashMap<u32, DeviceCache>>,
}

impl DeviceCacheManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the cache of `dev_id` (created on first use) under the lock.
    ///
    /// A poisoned lock is recovered: the cache tables stay consistent across
    /// a panicking vendor callback because entries are only inserted after it
    /// returns.
    pub fn with_device<R>(&self, dev_id: u32, f: impl FnOnce(&mut DeviceCache) -> R) -> R {
        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        f(devices.entry(dev_id).or_default())
    }

    /// Number of known devices.
    pub fn device_count(&self) -> usize {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Log a summary of every cache at debug level.
    pub fn dump(&self) {
        let devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        for (dev_id, device) in devices.iter() {
            debug!(
                dev_id,
                client_buffers = device.client.len(),
                client_seq = ?device.client.current_seq(),
                layers = device.layers.len(),
                "Device cache"
            );
            for (layer_id, layer) in device.layers.iter() {
                debug!(
                    dev_id,
                    layer_id,
                    buffers = layer.buffers.len(),
                    seq = ?layer.buffers.current_seq(),
                    "Layer cache"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::os::fd::AsRawFd;

    fn handle_with_fd() -> BufferHandle {
        BufferHandle {
            fd: Some(File::open("/dev/null").unwrap().into()),
            width: 64,
            height: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_handle_cached_after_success() {
        let mut cache = BufferCache::new();
        let handle = handle_with_fd();
        let raw = handle.fd.as_ref().unwrap().as_raw_fd();

        let mut seen = -1;
        cache
            .set_buffer(Some(handle), 7, &[], |h| {
                seen = h.raw_fd();
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, raw);
        assert!(cache.contains(7));
        assert_eq!(cache.current_seq(), Some(7));
    }

    #[test]
    fn test_reuse_resolves_same_handle() {
        let mut cache = BufferCache::new();
        let mut first = -1;
        let mut second = -2;
        cache
            .set_buffer(Some(handle_with_fd()), 3, &[], |h| {
                first = h.raw_fd();
                Ok(())
            })
            .unwrap();
        cache
            .set_buffer(None, 3, &[], |h| {
                second = h.raw_fd();
                Ok(())
            })
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_absent_handle_without_entry_fails() {
        let mut cache = BufferCache::new();
        let mut called = false;
        let status = cache.set_buffer(None, 7, &[], |_| {
            called = true;
            Ok(())
        });
        assert_eq!(status, Err(StatusCode::FAILURE));
        assert!(!called);
        assert_eq!(cache.current_seq(), None);
    }

    #[test]
    fn test_failed_apply_drops_fresh_handle_keeps_prior() {
        let mut cache = BufferCache::new();
        let original = handle_with_fd();
        let original_raw = original.raw_fd();
        cache.set_buffer(Some(original), 1, &[], |_| Ok(())).unwrap();

        let status = cache.set_buffer(Some(handle_with_fd()), 1, &[], |_| Err(StatusCode(-5)));
        assert_eq!(status, Err(StatusCode(-5)));
        assert_eq!(cache.get(1).unwrap().raw_fd(), original_raw);
    }

    #[test]
    fn test_failed_apply_does_not_cache_new_seq() {
        let mut cache = BufferCache::new();
        let status = cache.set_buffer(Some(handle_with_fd()), 9, &[], |_| {
            Err(StatusCode::FAILURE)
        });
        assert!(status.is_err());
        assert!(!cache.contains(9));
    }

    #[test]
    fn test_deletion_is_idempotent() {
        let mut cache = BufferCache::new();
        cache.set_buffer(Some(handle_with_fd()), 1, &[], |_| Ok(())).unwrap();
        cache.set_buffer(Some(handle_with_fd()), 2, &[], |_| Ok(())).unwrap();

        cache.set_buffer(None, 2, &[42, 1, 1], |_| Ok(())).unwrap();
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
        assert!(!cache.erase(1));
    }

    #[test]
    fn test_deletions_run_before_resolution() {
        let mut cache = BufferCache::new();
        cache.set_buffer(Some(handle_with_fd()), 4, &[], |_| Ok(())).unwrap();

        // Deleting the entry being resolved leaves nothing to resolve.
        let status = cache.set_buffer(None, 4, &[4], |_| Ok(()));
        assert_eq!(status, Err(StatusCode::FAILURE));

        // A fresh handle for a deleted seq is installed after the eviction.
        cache.set_buffer(Some(handle_with_fd()), 5, &[5], |_| Ok(())).unwrap();
        assert!(cache.contains(5));
    }

    #[test]
    fn test_manager_creates_on_first_use() {
        let manager = DeviceCacheManager::new();
        assert_eq!(manager.device_count(), 0);

        manager.with_device(2, |dev| {
            dev.layer_cache_instance(10);
            dev.layer_cache_instance(11);
        });
        assert_eq!(manager.device_count(), 1);
        assert_eq!(manager.with_device(2, |dev| dev.layer_count()), 2);
        manager.dump();
    }

    #[test]
    fn test_client_and_layer_caches_are_separate() {
        let manager = DeviceCacheManager::new();
        manager
            .with_device(0, |dev| {
                dev.set_display_client_buffer(Some(handle_with_fd()), 1, |_| Ok(()))
            })
            .unwrap();

        let status = manager.with_device(0, |dev| {
            dev.layer_cache_instance(0)
                .set_layer_buffer(None, 1, &[], |_| Ok(()))
        });
        assert_eq!(status, Err(StatusCode::FAILURE));
        assert!(manager.with_device(0, |dev| dev.client_buffers().contains(1)));
    }
}
