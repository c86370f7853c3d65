//! Bluetooth Low Energy transport for BlueST sensor nodes
//!
//! This crate implements the `GattTransport` contract from `bluest-core` on
//! top of btleplug, so a protocol session can run against real hardware.
//!
//! ## Architecture
//!
//! - [`config`] - Scan and connection settings
//! - [`error`] - Error types specific to the BLE transport
//! - [`device`] - Discovered nodes and connection state
//! - [`discovery`] - Adapter setup and advertisement scanning
//! - [`connection`] - Connecting and running a session with a notification pump
//! - [`transport`] - `GattTransport` implementation over a btleplug peripheral
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bluest_ble::{BleConfig, BlueStConnection, BlueStScanner};
//! use bluest_core::{FeatureMask, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BleConfig::new().with_name_filter("BM2V");
//! let mut scanner = BlueStScanner::new(config.clone());
//! scanner.initialize_adapter().await?;
//!
//! let mut devices = scanner.scan().await?;
//! if let Some(device) = devices.first_mut() {
//!     let connection =
//!         BlueStConnection::open(device, &config, vec![], SessionConfig::default()).await?;
//!     connection.session().subscribe(|frame: &bluest_core::FeatureFrame| {
//!         println!("{} @ {}", frame.features(), frame.device_timestamp);
//!     });
//!     connection.start(FeatureMask::BATTERY).await?;
//!     connection.close(device).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod device;
pub mod discovery;
pub mod error;
pub mod transport;

// Public API exports
pub use config::BleConfig;
pub use connection::{connect, BlueStConnection};
pub use device::{ConnectionState, DiscoveredDevice};
pub use discovery::{advertisement_from_properties, parse_manufacturer_data, BlueStScanner};
pub use error::BleTransportError;
pub use transport::BtleTransport;

// Re-export the transport contract for convenience
pub use bluest_core::GattTransport;
