//! Owned native buffer descriptor.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// Native buffer descriptor sent by the client.
///
/// Owns its descriptors: dropping a handle closes them. A handle that is
/// committed into a cache lives as long as its cache entry.
#[derive(Debug, Default)]
pub struct BufferHandle {
    /// Primary buffer descriptor.
    pub fd: Option<OwnedFd>,
    /// Width in pixels.
    pub width: i32,
    /// Row stride in bytes.
    pub stride: i32,
    /// Height in pixels.
    pub height: i32,
    /// Size of the mapped region in bytes.
    pub size: i32,
    /// Pixel format.
    pub format: i32,
    /// Usage flags.
    pub usage: u64,
    /// Physical address, if the allocator exposes one.
    pub phy_addr: u64,
    /// Extra vendor descriptors.
    pub reserve_fds: Vec<Option<OwnedFd>>,
    /// Extra vendor integers.
    pub reserve_ints: Vec<i32>,
}

impl BufferHandle {
    /// Raw value of the primary descriptor, or -1.
    #[inline]
    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_ref().map_or(-1, |fd| fd.as_raw_fd())
    }

    /// Size in bytes, clamped to zero.
    #[inline]
    pub fn byte_len(&self) -> usize {
        usize::try_from(self.size).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_raw_fd_without_descriptor() {
        let handle = BufferHandle::default();
        assert_eq!(handle.raw_fd(), -1);
    }

    #[test]
    fn test_raw_fd_matches_owned() {
        let fd: OwnedFd = File::open("/dev/null").unwrap().into();
        let raw = fd.as_raw_fd();
        let handle = BufferHandle {
            fd: Some(fd),
            ..Default::default()
        };
        assert_eq!(handle.raw_fd(), raw);
    }

    #[test]
    fn test_byte_len_clamps_negative() {
        let handle = BufferHandle {
            size: -5,
            ..Default::default()
        };
        assert_eq!(handle.byte_len(), 0);
    }
}
