//! # MQTT Subscription Module
//!
//! Maintains the bridge's single broker connection and feeds decoded readings
//! into the latest-value store.
//!
//! ## Why This Module Exists
//!
//! The dashboard never talks to the broker directly; this module is the only
//! component with a network-facing subscription. It owns the full connection
//! lifecycle so the rest of the process can stay oblivious to broker outages:
//! as long as the process is up, the store always has a last-known-good reading
//! to serve.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs     - Connection parameters
//! └── subscriber.rs - Connection state machine and message pump
//! ```
//!
//! ## Robust Connection Management
//!
//! The connection lifecycle is modeled as an explicit state machine
//! (Disconnected → Connecting → Connected → Subscribed). Any transport failure
//! tears the machine down to Disconnected and the driver loop rebuilds it after
//! an exponential backoff, so a flapping broker is never hammered and never
//! takes the process down with it. A malformed message is logged and dropped
//! without touching the connection.

pub mod config;
pub mod subscriber;

pub use config::MqttConfig;
pub use subscriber::run_subscription;
