//! BlueST node discovery
//!
//! btleplug hands manufacturer-specific data over as a map from company id to
//! the remaining bytes. The first two bytes of a BlueST record (protocol
//! version and device id) land in the company id, so the raw AD field is
//! rebuilt before parsing.

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use tracing::{debug, info};

use bluest_core::protocol::advertisement::MANUFACTURER_SPECIFIC_AD_TYPE;
use bluest_core::{AdvertisementRecord, BlueStResult};

use crate::config::BleConfig;
use crate::device::DiscoveredDevice;
use crate::error::BleTransportError;

// ----------------------------------------------------------------------------
// Advertisement Reconstruction
// ----------------------------------------------------------------------------

/// Rebuild the raw manufacturer-specific AD field btleplug split apart
pub fn manufacturer_ad_field(company_id: u16, data: &[u8]) -> Vec<u8> {
    let length = (1 + 2 + data.len()).min(u8::MAX as usize) as u8;
    let mut field = Vec::with_capacity(2 + 2 + data.len());
    field.push(length);
    field.push(MANUFACTURER_SPECIFIC_AD_TYPE);
    field.extend_from_slice(&company_id.to_le_bytes());
    field.extend_from_slice(data);
    field
}

/// Parse one btleplug manufacturer data entry as a BlueST record
pub fn parse_manufacturer_data(company_id: u16, data: &[u8]) -> BlueStResult<AdvertisementRecord> {
    AdvertisementRecord::parse(&manufacturer_ad_field(company_id, data), 0)
}

/// First manufacturer data entry that parses as a BlueST record
pub fn advertisement_from_properties(
    properties: &PeripheralProperties,
) -> Option<AdvertisementRecord> {
    properties
        .manufacturer_data
        .iter()
        .find_map(|(company_id, data)| match parse_manufacturer_data(*company_id, data) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Ignoring manufacturer data 0x{:04X}: {}", company_id, e);
                None
            }
        })
}

// ----------------------------------------------------------------------------
// Scanner
// ----------------------------------------------------------------------------

/// Scans for advertising BlueST nodes
pub struct BlueStScanner {
    config: BleConfig,
    adapter: Option<Adapter>,
}

impl BlueStScanner {
    pub fn new(config: BleConfig) -> Self {
        Self {
            config,
            adapter: None,
        }
    }

    /// Initialize the first available BLE adapter
    pub async fn initialize_adapter(&mut self) -> Result<(), BleTransportError> {
        let manager = Manager::new()
            .await
            .map_err(|e| BleTransportError::ManagerFailed(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| BleTransportError::ManagerFailed(e.to_string()))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(BleTransportError::AdapterNotAvailable)?;

        self.adapter = Some(adapter);
        info!("BLE adapter initialized");
        Ok(())
    }

    pub fn adapter(&self) -> Option<&Adapter> {
        self.adapter.as_ref()
    }

    /// Listen for the configured duration and report every BlueST node seen
    pub async fn scan(&self) -> Result<Vec<DiscoveredDevice>, BleTransportError> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or(BleTransportError::AdapterNotAvailable)?;

        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| BleTransportError::ScanFailed(e.to_string()))?;
        debug!("Scanning for BlueST nodes for {:?}", self.config.scan_duration);
        tokio::time::sleep(self.config.scan_duration).await;
        adapter
            .stop_scan()
            .await
            .map_err(|e| BleTransportError::ScanFailed(e.to_string()))?;

        let peripherals = adapter
            .peripherals()
            .await
            .map_err(|e| BleTransportError::ScanFailed(e.to_string()))?;

        let mut devices = Vec::new();
        for peripheral in peripherals {
            let properties = match peripheral.properties().await {
                Ok(Some(properties)) => properties,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Failed to read properties of {}: {}", peripheral.id(), e);
                    continue;
                }
            };

            if !self.config.matches_name(properties.local_name.as_deref()) {
                continue;
            }
            let Some(advertisement) = advertisement_from_properties(&properties) else {
                continue;
            };

            debug!(
                "Discovered BlueST node {:?} with features {}",
                properties.local_name, advertisement.features
            );
            devices.push(DiscoveredDevice::new(
                peripheral,
                properties.local_name.clone(),
                properties.rssi,
                advertisement,
            ));
        }

        info!("Scan finished: {} BlueST nodes found", devices.len());
        Ok(devices)
    }
}
