//! The fixed-layout command buffer exchanged over the I2C bus.
//!
//! # Wire layout
//!
//! | Bytes    | Content                                                        |
//! |----------|----------------------------------------------------------------|
//! | `0`      | command tag (`i8`)                                             |
//! | `1..29`  | parameter region: seven little-endian 4-byte slots, or text    |
//! | `29..32` | reserved, sent as zero and ignored on receive                  |
//!
//! Tags below zero are error codes, zero means "no error", and positive tags
//! name callable operations (see [`Command`]).
//!
//! The slot view and the text view share the same 28 bytes. Writing a slot
//! overwrites part of the text and vice versa.
//!
//! ```rust
//! use throttle_envoy::command_buffer::{Command, CommandBuffer, ErrorCode};
//!
//! let mut buffer = CommandBuffer::new(Command::SetServoPosition);
//! buffer.set_param_i32(0, 45)?;
//! let bytes = buffer.encode();
//! assert_eq!(bytes[0], 2);
//! assert_eq!(CommandBuffer::decode(&bytes)?.param_i32(0)?, 45);
//!
//! buffer.set_error(ErrorCode::GENERIC, "servo stalled");
//! assert_eq!(buffer.command(), Command::Error(ErrorCode::GENERIC));
//! assert_eq!(buffer.text_str(), Some("servo stalled"));
//! # Ok::<(), throttle_envoy::Error>(())
//! ```

use crate::{Error, Result};

/// Size in bytes of an encoded [`CommandBuffer`]; also the only accepted write length.
pub const ENCODED_LEN: usize = 32;

/// Size in bytes of the parameter region.
pub const PARAMS_LEN: usize = 28;

/// Number of 4-byte parameter slots.
pub const PARAM_SLOTS: usize = 7;

/// Longest error message [`CommandBuffer::set_error`] stores; the last byte stays NUL.
pub const ERROR_MESSAGE_CAPACITY: usize = PARAMS_LEN - 1;

const PARAMS_OFFSET: usize = 1;
const SLOT_LEN: usize = 4;

const _: () = assert!(PARAMS_OFFSET + PARAMS_LEN <= ENCODED_LEN, "buffer must fit in one transaction");
const _: () = assert!(PARAM_SLOTS * SLOT_LEN == PARAMS_LEN);

// ============================================================================
// Command tags
// ============================================================================

/// A negative command tag reporting a failure.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, defmt::Format)]
pub struct ErrorCode(i8);

impl ErrorCode {
    /// A non-specific error.
    pub const GENERIC: Self = Self(-1);

    /// Wrap a raw tag, or `None` if it is not in the error band (below zero).
    #[must_use]
    pub const fn new(tag: i8) -> Option<Self> {
        if tag < 0 { Some(Self(tag)) } else { None }
    }

    /// The raw (negative) tag.
    #[must_use]
    pub const fn tag(self) -> i8 {
        self.0
    }
}

/// Decoded meaning of a command tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, defmt::Format)]
pub enum Command {
    /// Error band (tag < 0).
    Error(ErrorCode),
    /// Tag 0: the previous operation succeeded.
    NoError,
    /// Tag 1: report the current logical servo position in slot 0.
    GetServoPosition,
    /// Tag 2: move the servo to the logical position in slot 0.
    SetServoPosition,
    /// Any other positive tag; ignored by the controller.
    Unrecognized(i8),
}

impl Command {
    /// Raw tag for this command.
    #[must_use]
    pub const fn tag(self) -> i8 {
        match self {
            Self::Error(code) => code.tag(),
            Self::NoError => 0,
            Self::GetServoPosition => 1,
            Self::SetServoPosition => 2,
            Self::Unrecognized(tag) => tag,
        }
    }

    /// Decode a raw tag.
    #[must_use]
    pub const fn from_tag(tag: i8) -> Self {
        match tag {
            0 => Self::NoError,
            1 => Self::GetServoPosition,
            2 => Self::SetServoPosition,
            _ => match ErrorCode::new(tag) {
                Some(code) => Self::Error(code),
                None => Self::Unrecognized(tag),
            },
        }
    }
}

impl From<i8> for Command {
    fn from(tag: i8) -> Self {
        Self::from_tag(tag)
    }
}

impl From<Command> for i8 {
    fn from(command: Command) -> Self {
        command.tag()
    }
}

// ============================================================================
// CommandBuffer
// ============================================================================

/// One bus transaction's worth of data: a command tag plus a 28-byte parameter region.
///
/// The tag is kept raw so that unrecognized tags survive a decode/encode cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommandBuffer {
    command: i8,
    params: [u8; PARAMS_LEN],
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl CommandBuffer {
    /// All-zero buffer (tag 0, "no error").
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            command: 0,
            params: [0; PARAMS_LEN],
        }
    }

    /// Buffer carrying `command` with a zeroed parameter region.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command: command.tag(),
            params: [0; PARAMS_LEN],
        }
    }

    /// Decode one transaction. The reserved trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferLength`] unless `bytes` is exactly [`ENCODED_LEN`] long.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; ENCODED_LEN] = bytes.try_into().map_err(|_| Error::BufferLength {
            expected: ENCODED_LEN,
            actual: bytes.len(),
        })?;
        let [tag, rest @ ..] = bytes;
        let (params, _reserved) = rest.split_at(PARAMS_LEN);
        let mut buffer = Self::zeroed();
        buffer.command = i8::from_le_bytes([*tag]);
        buffer.params.copy_from_slice(params);
        Ok(buffer)
    }

    /// Encode to the 32-byte wire form, reserved bytes zeroed.
    #[must_use]
    pub fn encode(&self) -> [u8; ENCODED_LEN] {
        let mut bytes = [0u8; ENCODED_LEN];
        let [tag, rest @ ..] = &mut bytes;
        *tag = self.command.to_le_bytes()[0];
        let (params, _reserved) = rest.split_at_mut(PARAMS_LEN);
        params.copy_from_slice(&self.params);
        bytes
    }

    /// The decoded command tag.
    #[must_use]
    pub const fn command(&self) -> Command {
        Command::from_tag(self.command)
    }

    /// The raw command tag.
    #[must_use]
    pub const fn tag(&self) -> i8 {
        self.command
    }

    /// Replace the command tag, leaving the parameters alone.
    pub const fn set_command(&mut self, command: Command) {
        self.command = command.tag();
    }

    /// Mark success: tag 0 and a zero-filled parameter region.
    pub const fn clear_error(&mut self) {
        self.command = Command::NoError.tag();
        self.params = [0; PARAMS_LEN];
    }

    /// Mark failure with `code` and a human-readable message.
    ///
    /// The parameter region is zero-filled, then at most
    /// [`ERROR_MESSAGE_CAPACITY`] bytes of `message` are copied in. Longer
    /// messages are truncated silently at a character boundary; the last byte
    /// of the region is always NUL.
    pub fn set_error(&mut self, code: ErrorCode, message: &str) {
        self.command = code.tag();
        self.params = [0; PARAMS_LEN];
        let mut len = message.len().min(ERROR_MESSAGE_CAPACITY);
        while !message.is_char_boundary(len) {
            len = len.saturating_sub(1);
        }
        let message = message.as_bytes();
        if let (Some(dst), Some(src)) = (self.params.get_mut(..len), message.get(..len)) {
            dst.copy_from_slice(src);
        }
    }

    /// The whole parameter region.
    #[must_use]
    pub const fn params(&self) -> &[u8; PARAMS_LEN] {
        &self.params
    }

    /// Text view: the parameter bytes before the first NUL (all 28 if there is none).
    #[must_use]
    pub fn text(&self) -> &[u8] {
        let end = self
            .params
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(PARAMS_LEN);
        self.params.get(..end).unwrap_or(&[])
    }

    /// Text view as UTF-8, or `None` if the bytes are not valid UTF-8.
    #[must_use]
    pub fn text_str(&self) -> Option<&str> {
        core::str::from_utf8(self.text()).ok()
    }

    /// Longest valid UTF-8 prefix of the text view.
    #[must_use]
    pub fn text_prefix(&self) -> &str {
        let text = self.text();
        match core::str::from_utf8(text) {
            Ok(text) => text,
            Err(err) => text
                .get(..err.valid_up_to())
                .and_then(|valid| core::str::from_utf8(valid).ok())
                .unwrap_or_default(),
        }
    }

    /// Slot 0 as a signed integer, the argument and result slot of the servo commands.
    #[must_use]
    pub const fn first_param_i32(&self) -> i32 {
        let [b0, b1, b2, b3, ..] = self.params;
        i32::from_le_bytes([b0, b1, b2, b3])
    }

    /// Store a signed integer in slot 0.
    pub const fn set_first_param_i32(&mut self, value: i32) {
        let [b0, b1, b2, b3] = value.to_le_bytes();
        let [p0, p1, p2, p3, ..] = &mut self.params;
        *p0 = b0;
        *p1 = b1;
        *p2 = b2;
        *p3 = b3;
    }

    fn slot(&self, index: usize) -> Result<[u8; SLOT_LEN]> {
        let start = index.checked_mul(SLOT_LEN).ok_or(Error::IndexOutOfBounds)?;
        self.params
            .get(start..)
            .and_then(|tail| tail.first_chunk::<SLOT_LEN>())
            .copied()
            .ok_or(Error::IndexOutOfBounds)
    }

    fn set_slot(&mut self, index: usize, bytes: [u8; SLOT_LEN]) -> Result<()> {
        let start = index.checked_mul(SLOT_LEN).ok_or(Error::IndexOutOfBounds)?;
        let slot = self
            .params
            .get_mut(start..)
            .and_then(|tail| tail.first_chunk_mut::<SLOT_LEN>())
            .ok_or(Error::IndexOutOfBounds)?;
        *slot = bytes;
        Ok(())
    }

    /// Slot `index` (0..7) as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not below [`PARAM_SLOTS`].
    pub fn param_i32(&self, index: usize) -> Result<i32> {
        self.slot(index).map(i32::from_le_bytes)
    }

    /// Slot `index` (0..7) as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not below [`PARAM_SLOTS`].
    pub fn param_u32(&self, index: usize) -> Result<u32> {
        self.slot(index).map(u32::from_le_bytes)
    }

    /// Slot `index` (0..7) as a float.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not below [`PARAM_SLOTS`].
    pub fn param_f32(&self, index: usize) -> Result<f32> {
        self.slot(index).map(f32::from_le_bytes)
    }

    /// Store a signed integer in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not below [`PARAM_SLOTS`].
    pub fn set_param_i32(&mut self, index: usize, value: i32) -> Result<()> {
        self.set_slot(index, value.to_le_bytes())
    }

    /// Store an unsigned integer in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not below [`PARAM_SLOTS`].
    pub fn set_param_u32(&mut self, index: usize, value: u32) -> Result<()> {
        self.set_slot(index, value.to_le_bytes())
    }

    /// Store a float in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not below [`PARAM_SLOTS`].
    pub fn set_param_f32(&mut self, index: usize, value: f32) -> Result<()> {
        self.set_slot(index, value.to_le_bytes())
    }
}
