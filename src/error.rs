use derive_more::{Display, Error, From};
use heapless::String;

use crate::command_buffer::ERROR_MESSAGE_CAPACITY;

/// Errors returned by this crate.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// An embassy task could not be spawned (its pool is exhausted).
    #[display("task spawn failed: {_0:?}")]
    TaskSpawn(#[error(not(source))] embassy_executor::SpawnError),

    /// A parameter slot index past the end of the parameter region.
    #[display("index out of bounds")]
    #[from(ignore)]
    IndexOutOfBounds,

    /// A byte buffer that is not exactly one encoded command buffer long.
    #[display("expected a {expected}-byte buffer, got {actual} bytes")]
    #[from(ignore)]
    BufferLength {
        /// The encoded command buffer size.
        expected: usize,
        /// The length that was supplied.
        actual: usize,
    },

    /// The device answered with a negative (error) command tag.
    #[display("device error {code}: {message}")]
    #[from(ignore)]
    Remote {
        /// The negative command tag.
        code: i8,
        /// The text carried in the parameter region.
        #[error(not(source))]
        message: String<ERROR_MESSAGE_CAPACITY>,
    },

    /// The I2C bus reported a failure.
    #[display("I2C bus error: {_0:?}")]
    Bus(#[error(not(source))] embedded_hal::i2c::ErrorKind),
}

/// Result alias with [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
