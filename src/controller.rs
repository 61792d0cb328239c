//! The command dispatcher: receive/request handlers over the controller's shared state.
//!
//! See [`ServoController`] for the full usage example.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use portable_atomic::{AtomicI32, Ordering};

use crate::calibration::Calibration;
use crate::command_buffer::{Command, CommandBuffer, ENCODED_LEN};

/// What [`ServoController::on_receive`] did with a write.
#[derive(Clone, Copy, Debug, Eq, PartialEq, defmt::Format)]
pub enum Received {
    /// The write was not exactly one command buffer long, or was not addressed
    /// to this device alone; nothing changed.
    Dropped {
        /// Number of bytes the master wrote.
        len: usize,
    },
    /// `GetServoPosition`: the logical position now sits in slot 0 of the response.
    ServoPositionReported {
        /// Logical position written to slot 0.
        logical: i32,
    },
    /// `SetServoPosition`: the servo position was updated.
    ServoPositionSet {
        /// Logical target taken from slot 0.
        logical: i32,
        /// Physical angle stored for the actuation loop.
        physical: i32,
    },
    /// Any other tag: the buffer holds the received bytes, the position is untouched.
    Ignored {
        /// The raw tag.
        tag: i8,
    },
}

/// One event from the I2C slave peripheral, with the bytes the master wrote.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BusEvent<'a> {
    /// The master wrote `bytes` and sent STOP.
    Write(&'a [u8]),
    /// The master is reading.
    Read,
    /// The master wrote `bytes`, then issued a repeated START to read.
    WriteRead(&'a [u8]),
    /// A write to the general call address. Never dispatched.
    GeneralCall(&'a [u8]),
    /// A write longer than the listen buffer. Only its length is known.
    Overrun {
        /// Bytes received before the buffer filled.
        len: usize,
    },
}

/// What the transport should do after a [`BusEvent`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BusReply {
    /// Outcome of the write half, if the event carried one.
    pub received: Option<Received>,
    /// Bytes to clock out to the master, if the event asked for a read.
    pub response: Option<[u8; ENCODED_LEN]>,
}

/// State owned by one throttle body: the response buffer and the servo position.
///
/// The bus transport calls [`on_receive`](Self::on_receive) for every master
/// write and [`on_request`](Self::on_request) for every master read. Both are
/// short and never block, so they can run from the bus event context. The
/// actuation loop only reads [`servo_position`](Self::servo_position).
///
/// The controller is the only writer of both pieces of state.
///
/// # Example
///
/// ```rust
/// use throttle_envoy::calibration::CALIBRATION;
/// use throttle_envoy::command_buffer::{Command, CommandBuffer};
/// use throttle_envoy::controller::{Received, ServoController};
///
/// let controller = ServoController::new(CALIBRATION);
///
/// // Master writes SetServoPosition(45).
/// let mut request = CommandBuffer::new(Command::SetServoPosition);
/// request.set_param_i32(0, 45)?;
/// let received = controller.on_receive(&request.encode());
/// assert_eq!(received, Received::ServoPositionSet { logical: 45, physical: 67 });
///
/// // Master writes GetServoPosition, then reads the response.
/// controller.on_receive(&CommandBuffer::new(Command::GetServoPosition).encode());
/// let response = CommandBuffer::decode(&controller.on_request())?;
/// assert_eq!(response.command(), Command::NoError);
/// assert_eq!(response.param_i32(0)?, 45);
/// # Ok::<(), throttle_envoy::Error>(())
/// ```
pub struct ServoController {
    calibration: Calibration,
    buffer: Mutex<CriticalSectionRawMutex, RefCell<CommandBuffer>>,
    servo_position: AtomicI32,
}

impl ServoController {
    /// Create a controller. The servo position starts at the calibration's startup position.
    #[must_use]
    pub const fn new(calibration: Calibration) -> Self {
        Self {
            buffer: Mutex::new(RefCell::new(CommandBuffer::zeroed())),
            servo_position: AtomicI32::new(calibration.startup_position),
            calibration,
        }
    }

    /// The calibration this controller maps positions with.
    #[must_use]
    pub const fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Handle a master write.
    ///
    /// Anything other than exactly [`ENCODED_LEN`] bytes is dropped without
    /// touching state. Otherwise the bytes replace the resident buffer and the
    /// command is executed against it.
    pub fn on_receive(&self, bytes: &[u8]) -> Received {
        let Ok(incoming) = CommandBuffer::decode(bytes) else {
            return Received::Dropped { len: bytes.len() };
        };

        self.buffer.lock(|cell| {
            let mut buffer = cell.borrow_mut();
            *buffer = incoming;
            self.dispatch(&mut buffer)
        })
    }

    fn dispatch(&self, buffer: &mut CommandBuffer) -> Received {
        match buffer.command() {
            Command::GetServoPosition => {
                let logical = self.logical_position();
                buffer.clear_error();
                buffer.set_first_param_i32(logical);
                Received::ServoPositionReported { logical }
            }
            Command::SetServoPosition => {
                let logical = buffer.first_param_i32();
                let physical = self.calibration.logical_to_physical(logical);
                self.servo_position.store(physical, Ordering::Release);
                buffer.clear_error();
                Received::ServoPositionSet { logical, physical }
            }
            Command::Error(_) | Command::NoError | Command::Unrecognized(_) => {
                Received::Ignored { tag: buffer.tag() }
            }
        }
    }

    /// Route one bus event to [`on_receive`](Self::on_receive) and
    /// [`on_request`](Self::on_request).
    ///
    /// ```rust
    /// use throttle_envoy::calibration::CALIBRATION;
    /// use throttle_envoy::command_buffer::{Command, CommandBuffer};
    /// use throttle_envoy::controller::{BusEvent, ServoController};
    ///
    /// let controller = ServoController::new(CALIBRATION);
    /// let request = CommandBuffer::new(Command::GetServoPosition).encode();
    /// let reply = controller.on_bus_event(BusEvent::WriteRead(&request));
    /// assert!(reply.received.is_some());
    /// assert_eq!(reply.response, Some(controller.on_request()));
    /// ```
    #[must_use]
    pub fn on_bus_event(&self, event: BusEvent<'_>) -> BusReply {
        match event {
            BusEvent::Write(bytes) => BusReply {
                received: Some(self.on_receive(bytes)),
                response: None,
            },
            BusEvent::Read => BusReply {
                received: None,
                response: Some(self.on_request()),
            },
            BusEvent::WriteRead(bytes) => {
                let received = self.on_receive(bytes);
                BusReply {
                    received: Some(received),
                    response: Some(self.on_request()),
                }
            }
            BusEvent::GeneralCall(bytes) => BusReply {
                received: Some(Received::Dropped { len: bytes.len() }),
                response: None,
            },
            BusEvent::Overrun { len } => BusReply {
                received: Some(Received::Dropped { len }),
                response: None,
            },
        }
    }

    /// Handle a master read: the resident buffer, byte for byte.
    #[must_use]
    pub fn on_request(&self) -> [u8; ENCODED_LEN] {
        self.buffer.lock(|cell| cell.borrow().encode())
    }

    /// Copy of the resident buffer.
    #[must_use]
    pub fn response(&self) -> CommandBuffer {
        self.buffer.lock(|cell| *cell.borrow())
    }

    /// Last commanded physical servo angle.
    #[must_use]
    pub fn servo_position(&self) -> i32 {
        self.servo_position.load(Ordering::Acquire)
    }

    /// Last commanded position mapped back to the logical range.
    #[must_use]
    pub fn logical_position(&self) -> i32 {
        self.calibration.physical_to_logical(self.servo_position())
    }
}
