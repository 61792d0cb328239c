//! Firmware core for an I2C-addressable servo actuator ("throttle body") on the Pico 1 and 2.
//!
//! A bus master writes a fixed 32-byte command buffer to read or set the servo
//! position; a later read returns the buffer the device assembled in response.
//!
//! - [`command_buffer`]: the wire layout and the error-encoding convention.
//! - [`position`]: logical (0..=90) ↔ physical angle mapping and the saturation curve.
//! - [`controller`]: the receive/request handlers over the shared state.
//! - [`actuation`]: the rate-limited loop that drives the servo.
//! - `throttle_body`: the I2C slave device that ties it together (embedded builds).
//! - [`client`]: the bus-master side of the protocol.
//!
//! # Glossary
//!
//! - **Logical position:** the 0..=90 angle unit the protocol uses.
//! - **Physical position:** the calibrated servo angle
//!   ([`SERVO_MIN_POSITION`](calibration::SERVO_MIN_POSITION)..=[`SERVO_MAX_POSITION`](calibration::SERVO_MAX_POSITION)).
//! - **Command tag:** byte 0 of the buffer, naming the operation or error.
//! - **Transaction:** one complete master write or master read.
#![cfg_attr(not(feature = "host"), no_std)]
#![cfg_attr(not(feature = "host"), no_main)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded")]

// Compile-time checks: exactly one board must be selected (unless testing with host feature)
#[cfg(all(not(any(feature = "pico1", feature = "pico2")), not(feature = "host")))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[cfg(all(not(feature = "arm"), not(feature = "host")))]
compile_error!("Must enable the 'arm' architecture feature");

pub mod actuation;
pub mod calibration;
pub mod client;
pub mod command_buffer;
pub mod controller;
mod error;
pub mod position;
// These modules require embassy_rp and are excluded when testing on host
#[cfg(not(feature = "host"))]
pub mod servo;
#[cfg(not(feature = "host"))]
pub mod throttle_body;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
