//! Batch dispatcher.
//!
//! [`DisplayCmdResponder`] owns the per-batch state of one client session:
//! 1. Read a request batch from the request queue
//! 2. Walk its sections and route each opcode to a handler
//! 3. Append the error table, once every section has run, and the end marker
//! 4. Write the reply to the reply queue
//! 5. Reset for the next batch, whatever happened above
//!
//! Business errors from a handler land in the error table and processing
//! continues. Framing errors, unknown opcodes, and transport failures abort
//! the batch.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use composer_cmd::cache::DeviceCacheManager;
//! use composer_cmd::fd::FdSet;
//! use composer_cmd::handler::DisplayCmdResponder;
//! use composer_cmd::protocol::{cmd, CommandPacker};
//! use composer_cmd::transport::{SharedMemQueue, Transport};
//! use composer_cmd::vdi::ComposerVdi;
//!
//! struct Driver;
//! impl ComposerVdi for Driver {}
//!
//! let mut responder: DisplayCmdResponder<SharedMemQueue, Driver> =
//!     DisplayCmdResponder::create(Arc::new(Driver), Arc::new(DeviceCacheManager::new()));
//!
//! let request = Arc::new(SharedMemQueue::with_capacity(1024));
//! responder.init_request(Arc::clone(&request));
//! let reply = responder.get_reply().unwrap();
//!
//! let mut packer = CommandPacker::with_capacity(64);
//! packer.start_pack(cmd::CONTROL_REQUEST_BEGIN).unwrap();
//! packer.pack_end(cmd::CONTROL_REQUEST_END).unwrap();
//! request
//!     .write(packer.data(), packer.valid_elements(), Duration::from_millis(10))
//!     .unwrap();
//!
//! let count = responder
//!     .process(packer.valid_elements(), &mut FdSet::new(), &mut FdSet::new())
//!     .unwrap();
//! assert_eq!(reply.size(), 32 * 1024);
//! assert!(count > 0);
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, debug_span, error, warn};

use super::dump::LayerDumper;
use super::error_table::ErrorTable;
use crate::cache::DeviceCacheManager;
use crate::config::ResponderConfig;
use crate::error::{ComposerError, Result};
use crate::fd::FdSet;
use crate::protocol::{cmd, command_to_str, CommandPacker, CommandUnpacker, ELEMENT_SIZE};
use crate::transport::Transport;
use crate::vdi::ComposerVdi;

/// Dispatcher for command batches of one client session.
///
/// Not safe for concurrent `process` calls; use one responder per session.
/// The cache manager may be shared between responders.
pub struct DisplayCmdResponder<T: Transport, V: ComposerVdi + ?Sized> {
    pub(super) vdi: Arc<V>,
    pub(super) cache: Arc<DeviceCacheManager>,
    config: ResponderConfig,
    request: Option<Arc<T>>,
    reply: Option<Arc<T>>,
    is_reply_updated: bool,
    pub(super) reply_packer: CommandPacker,
    pub(super) reply_command_count: u32,
    pub(super) errors: ErrorTable,
    pub(super) dumper: LayerDumper,
}

impl<T: Transport, V: ComposerVdi + ?Sized> DisplayCmdResponder<T, V> {
    /// Create a responder with defaults plus the dump switch from the environment.
    pub fn create(vdi: Arc<V>, cache: Arc<DeviceCacheManager>) -> Self {
        Self::new(vdi, cache, ResponderConfig::from_env())
    }

    /// Create a responder with an explicit configuration.
    pub fn new(vdi: Arc<V>, cache: Arc<DeviceCacheManager>, config: ResponderConfig) -> Self {
        let dumper = LayerDumper::new(config.dump.clone());
        Self {
            vdi,
            cache,
            config,
            request: None,
            reply: None,
            is_reply_updated: false,
            reply_packer: CommandPacker::new(),
            reply_command_count: 0,
            errors: ErrorTable::new(),
            dumper,
        }
    }

    /// Bind the request queue, replacing any previous one.
    pub fn init_request(&mut self, request: Arc<T>) {
        if self.request.replace(request).is_some() {
            debug!("Replaced request queue");
        }
    }

    /// Reply queue for the client.
    ///
    /// Unless a batch was processed since the last call, the reply is reset
    /// to an empty batch first (creating the queue on first use).
    pub fn get_reply(&mut self) -> Result<Arc<T>> {
        if !self.is_reply_updated {
            if let Err(e) = self.init_reply(self.config.init_element_count) {
                error!(error = %e, "Reply init failed");
                return Err(e);
            }
        }
        self.is_reply_updated = false;
        self.reply.clone().ok_or(ComposerError::NotInitialized)
    }

    /// Configuration in use.
    #[inline]
    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    /// Process one request batch of `in_count` elements.
    ///
    /// Descriptors referenced by the batch are taken from `in_fds`; reply
    /// descriptors are appended to `out_fds`. Returns the number of reply
    /// elements written. Per-batch state is reset before returning, on
    /// success and on failure.
    pub fn process(&mut self, in_count: usize, in_fds: &mut FdSet, out_fds: &mut FdSet) -> Result<usize> {
        let result = self.cmd_request(in_count, in_fds, out_fds);
        if let Err(e) = &result {
            error!(error = %e, "Command batch failed");
        }
        let reset = self.period_data_reset();
        let count = result?;
        reset?;
        Ok(count)
    }

    fn cmd_request(&mut self, in_count: usize, in_fds: &mut FdSet, out_fds: &mut FdSet) -> Result<usize> {
        let request = self.request.clone().ok_or(ComposerError::NotInitialized)?;
        if self.reply.is_none() || !self.reply_packer.is_initialized() {
            self.init_reply(self.config.init_element_count)?;
        }
        let reply = self.reply.clone().ok_or(ComposerError::NotInitialized)?;
        let timeout = self.config.transfer_timeout();

        if in_count > request.size() {
            return Err(ComposerError::Protocol(format!(
                "Request of {} elements exceeds queue size {}",
                in_count,
                request.size()
            )));
        }
        let mut data = vec![0u8; in_count * ELEMENT_SIZE];
        request.read(&mut data, in_count, timeout)?;

        let mut unpacker = CommandUnpacker::new(Bytes::from(data));
        let begin = unpacker.pack_begin()?;
        if begin != cmd::CONTROL_REQUEST_BEGIN {
            return Err(ComposerError::Protocol(format!(
                "Batch begins with {} ({}), expected {}",
                command_to_str(begin),
                begin,
                command_to_str(cmd::CONTROL_REQUEST_BEGIN)
            )));
        }

        while unpacker.next_section() {
            let opcode = unpacker.begin_section()?;
            self.process_request_cmd(&mut unpacker, opcode, in_fds, out_fds)?;
        }

        self.pack_error_table()?;
        self.reply_packer.pack_end(cmd::CONTROL_REPLY_END)?;

        let count = self.reply_packer.valid_elements();
        if let Err(e) = reply.write(self.reply_packer.data(), count, timeout) {
            error!(error = %e, count, "Reply write failed");
            return Err(e);
        }
        debug!(count, commands = self.reply_command_count, "Reply written");
        self.is_reply_updated = true;
        Ok(count)
    }

    fn process_request_cmd(
        &mut self,
        unpacker: &mut CommandUnpacker,
        opcode: i32,
        in_fds: &mut FdSet,
        out_fds: &mut FdSet,
    ) -> Result<()> {
        let _span = debug_span!("command", name = command_to_str(opcode)).entered();
        debug!(opcode, "Dispatching section");

        let status = match opcode {
            cmd::REQUEST_PREPARE_DISPLAY_LAYERS => self.on_prepare_display_layers(unpacker),
            cmd::REQUEST_SET_DISPLAY_CLIENT_BUFFER => {
                self.on_set_display_client_buffer(unpacker, in_fds)
            }
            cmd::REQUEST_SET_DISPLAY_CLIENT_DAMAGE => self.on_set_display_client_damage(unpacker),
            cmd::REQUEST_COMMIT => self.on_commit(unpacker, out_fds),
            cmd::REQUEST_SET_LAYER_ALPHA => self.on_set_layer_alpha(unpacker),
            cmd::REQUEST_SET_LAYER_REGION => self.on_set_layer_region(unpacker),
            cmd::REQUEST_SET_LAYER_CROP => self.on_set_layer_crop(unpacker),
            cmd::REQUEST_SET_LAYER_ZORDER => self.on_set_layer_zorder(unpacker),
            cmd::REQUEST_SET_LAYER_PREMULTI => self.on_set_layer_pre_multi(unpacker),
            cmd::REQUEST_SET_LAYER_TRANSFORM_MODE => self.on_set_layer_transform_mode(unpacker),
            cmd::REQUEST_SET_LAYER_DIRTY_REGION => self.on_set_layer_dirty_region(unpacker),
            cmd::REQUEST_SET_LAYER_VISIBLE_REGION => self.on_set_layer_visible_region(unpacker),
            cmd::REQUEST_SET_LAYER_BUFFER => self.on_set_layer_buffer(unpacker, in_fds),
            cmd::REQUEST_SET_LAYER_COMPOSITION_TYPE => {
                self.on_set_layer_composition_type(unpacker)
            }
            cmd::REQUEST_SET_LAYER_BLEND_TYPE => self.on_set_layer_blend_type(unpacker),
            cmd::REQUEST_SET_LAYER_MASK_INFO => self.on_set_layer_mask_info(unpacker),
            cmd::REQUEST_SET_LAYER_COLOR => self.on_set_layer_color(unpacker),
            cmd::CONTROL_REQUEST_END => {
                debug!("Request end marker");
                return Ok(());
            }
            _ => {
                error!(opcode, "Unsupported command");
                return Err(ComposerError::HandlerNotFound(opcode));
            }
        };

        if let Err(code) = status {
            self.reply_packer.abort_section();
            error!(status = %code, "{} failed", command_to_str(opcode));
            self.errors.record(opcode, code);
        }
        Ok(())
    }

    fn pack_error_table(&mut self) -> Result<()> {
        if !self.errors.is_empty() {
            warn!(entries = self.errors.len(), "Batch finished with command errors");
        }
        self.errors.pack(&mut self.reply_packer)?;
        self.reply_command_count += 1;
        Ok(())
    }

    fn init_reply(&mut self, elements: usize) -> Result<()> {
        let reply = self
            .reply
            .get_or_insert_with(|| Arc::new(T::with_capacity(elements)));
        self.reply_packer.init(reply.size() * ELEMENT_SIZE);
        self.reply_packer.start_pack(cmd::CONTROL_REPLY_BEGIN)
    }

    fn period_data_reset(&mut self) -> Result<()> {
        self.reply_command_count = 0;
        self.errors.clear();

        if !self.reply_packer.is_initialized() {
            return Ok(());
        }
        if let Err(e) = self.reply_packer.start_pack(cmd::CONTROL_REPLY_BEGIN) {
            error!(error = %e, "Reply reset failed");
            return Err(e);
        }
        Ok(())
    }
}
