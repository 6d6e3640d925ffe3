//! # Telemetry Module
//!
//! Defines the sensor data model and the codec that turns raw MQTT payloads
//! into validated readings.
//!
//! ## Why This Module Exists
//!
//! Payloads arrive from the network and have to be treated as untrusted input:
//! they may be truncated, hand-typed by someone testing with `mosquitto_pub`,
//! or simply garbage. The codec is the single place where bytes become a
//! [`Reading`], so every consumer downstream (the store, the HTTP API) can rely
//! on a fully populated, well-typed value and never has to re-validate.
//!
//! ## Module Architecture
//!
//! ```text
//! telemetry/
//! ├── reading.rs - The decoded sensor snapshot
//! └── codec.rs   - Strict JSON decoding with per-field validation
//! ```
//!
//! ## Error Handling Strategy
//!
//! Decoding is pure and infallible in the sense that a bad payload produces a
//! [`codec::DecodeError`] value, never a panic. Callers drop the message and
//! keep the subscription alive.

pub mod codec;
pub mod reading;

pub use codec::{decode, DecodeError};
pub use reading::Reading;
