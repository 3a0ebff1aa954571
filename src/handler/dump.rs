//! Debug dump of consumed layer buffers.
//!
//! When enabled, every layer buffer handed to the vendor is first written to
//! `<dir>/hdi_layer_<dev>_<layer>_<w>x<h>_<MM-DD-hh-mm-ss>-<usec>`. The write
//! waits for the acquire fence so the contents are complete. Nothing here can
//! fail a command: every error is logged and the dump is skipped.

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::buffer::BufferHandle;
use crate::config::DumpConfig;

/// Maps a buffer's memory for reading.
pub trait BufferMapper: Send + Sync {
    /// Copy out the first `buffer.size` bytes of the buffer.
    fn read_buffer(&self, buffer: &BufferHandle) -> io::Result<Vec<u8>>;
}

/// Reads buffer contents through a duplicate of its descriptor.
#[derive(Debug, Default)]
pub struct FdBufferMapper;

impl BufferMapper for FdBufferMapper {
    fn read_buffer(&self, buffer: &BufferHandle) -> io::Result<Vec<u8>> {
        let fd = buffer.fd.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "buffer has no descriptor")
        })?;
        let file = File::from(fd.try_clone()?);
        let mut data = vec![0u8; buffer.byte_len()];
        file.read_exact_at(&mut data, 0)?;
        Ok(data)
    }
}

static MAPPER: OnceLock<Box<dyn BufferMapper>> = OnceLock::new();

/// Install the process-wide mapper. Fails if one is already in use.
pub fn install_mapper(mapper: Box<dyn BufferMapper>) -> bool {
    MAPPER.set(mapper).is_ok()
}

fn mapper() -> &'static dyn BufferMapper {
    MAPPER.get_or_init(|| Box::new(FdBufferMapper)).as_ref()
}

/// Wait until `fence` signals, retrying on `EINTR`/`EAGAIN`.
///
/// Times out with `ETIME`; a fence reporting `POLLERR`/`POLLNVAL` fails with
/// `EINVAL`.
pub fn wait_fence(fence: BorrowedFd<'_>, timeout: Duration) -> io::Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        let poll_timeout = PollTimeout::try_from(left).unwrap_or(PollTimeout::MAX);
        let mut fds = [PollFd::new(fence, PollFlags::POLLIN)];

        match poll(&mut fds, poll_timeout) {
            Ok(0) => return Err(Errno::ETIME.into()),
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                if revents.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL) {
                    return Err(Errno::EINVAL.into());
                }
                return Ok(());
            }
            Err(Errno::EINTR) | Err(Errno::EAGAIN) => continue,
            Err(errno) => return Err(errno.into()),
        }
    }
}

/// Dump file name for a buffer consumed at `now`.
pub fn dump_file_name(dev_id: u32, layer_id: u32, buffer: &BufferHandle, now: OffsetDateTime) -> String {
    format!(
        "hdi_layer_{}_{}_{}x{}_{:02}-{:02}-{:02}-{:02}-{:02}-{}",
        dev_id,
        layer_id,
        buffer.width,
        buffer.height,
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.microsecond()
    )
}

/// Writes layer buffers to disk when enabled.
#[derive(Debug, Clone)]
pub struct LayerDumper {
    config: DumpConfig,
}

impl LayerDumper {
    /// Create a dumper.
    pub fn new(config: DumpConfig) -> Self {
        Self { config }
    }

    /// Check if dumping is on.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Dump `buffer` once `fence` signals. Returns the written path.
    pub fn dump_layer_buffer(
        &self,
        dev_id: u32,
        layer_id: u32,
        fence: Option<BorrowedFd<'_>>,
        buffer: &BufferHandle,
    ) -> Option<PathBuf> {
        if !self.config.enabled {
            return None;
        }

        let Some(fence) = fence else {
            error!(dev_id, layer_id, "Fence is invalid, skipping buffer dump");
            return None;
        };
        if let Err(e) = wait_fence(fence.as_fd(), self.config.fence_timeout()) {
            error!(dev_id, layer_id, error = %e, "Fence wait failed, skipping buffer dump");
            return None;
        }

        let path = self
            .config
            .dir
            .join(dump_file_name(dev_id, layer_id, buffer, OffsetDateTime::now_utc()));
        info!(path = %path.display(), "Dumping layer buffer");

        let data = match mapper().read_buffer(buffer) {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "Map buffer failed");
                return None;
            }
        };

        let started = Instant::now();
        if let Err(e) = std::fs::write(&path, &data) {
            error!(path = %path.display(), error = %e, "Write dump file failed");
            return None;
        }
        debug!(bytes = data.len(), elapsed = ?started.elapsed(), "Buffer dump written");
        Some(path)
    }
}
