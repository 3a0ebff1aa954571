//! # composer-cmd
//!
//! Command-batch protocol engine for a display composer service.
//!
//! A client accumulates display and layer commands into a batch, writes the
//! batch into a shared request queue, and asks the service to process it. The
//! service walks the batch section by section, forwards each command to the
//! vendor backend, and answers with a reply batch carrying command replies and
//! a table of per-opcode error codes.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): little-endian section framing
//! - **Codec** ([`codec`]): typed fields, buffer handles, descriptor ids
//! - **Cache** ([`cache`]): buffer handles referenced by sequence number
//! - **Handler** ([`handler`]): dispatch, error table, reply assembly
//! - **Transport** ([`transport`]): element queues carrying the batches
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use composer_cmd::cache::DeviceCacheManager;
//! use composer_cmd::transport::{SharedMemQueue, Transport};
//! use composer_cmd::vdi::ComposerVdi;
//! use composer_cmd::DisplayCmdResponder;
//!
//! struct Driver;
//! impl ComposerVdi for Driver {}
//!
//! let cache = Arc::new(DeviceCacheManager::new());
//! let mut responder: DisplayCmdResponder<SharedMemQueue, Driver> =
//!     DisplayCmdResponder::create(Arc::new(Driver), cache);
//! responder.init_request(Arc::new(SharedMemQueue::with_capacity(1024)));
//! assert!(responder.get_reply().is_ok());
//! ```

pub mod buffer;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod fd;
pub mod handler;
pub mod protocol;
pub mod transport;
pub mod types;
pub mod vdi;

pub use buffer::BufferHandle;
pub use config::ResponderConfig;
pub use error::{ComposerError, Result, StatusCode, VdiResult};
pub use handler::DisplayCmdResponder;
pub use vdi::ComposerVdi;
