//! Handler module - batch dispatch and per-command handling.
//!
//! Provides:
//! - [`DisplayCmdResponder`] - reads a batch, routes each section, writes the reply
//! - [`ErrorTable`] - business errors collected while processing one batch
//! - [`LayerDumper`] - optional debug dump of consumed layer buffers

mod commands;
mod dump;
mod error_table;
mod responder;

pub use dump::{dump_file_name, install_mapper, wait_fence, BufferMapper, FdBufferMapper, LayerDumper};
pub use error_table::ErrorTable;
pub use responder::DisplayCmdResponder;
