//! Sensor configuration
//!
//! Snapshot of every register in the static register map, loaded from and
//! saved to a connected node through its register-access characteristic.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::protocol::register_map::{
    RegisterDescriptor, ACCELEROMETER_FULL_SCALE, ACCELEROMETER_OUTPUT_DATA_RATE,
    FIRMWARE_VERSION, GYROSCOPE_FULL_SCALE, GYROSCOPE_OUTPUT_DATA_RATE, MAGNETOMETER_FULL_SCALE,
    MAGNETOMETER_OUTPUT_DATA_RATE, REGISTER_MAP, TIMER_FREQUENCY,
};
use crate::session::DeviceSession;
use crate::types::CancelToken;
use crate::{BlueStError, BlueStResult};

/// Accelerometer full scale applied by [`SensorConfig::configure_motion`], in g
pub const ACCELEROMETER_FULL_SCALE_PRESET: u16 = 16;
/// Gyroscope full scale applied by [`SensorConfig::configure_motion`], in dps
pub const GYROSCOPE_FULL_SCALE_PRESET: u16 = 2000;
/// Magnetometer full scale applied by [`SensorConfig::configure_motion`], in gauss
pub const MAGNETOMETER_FULL_SCALE_PRESET: u16 = 12;

// ----------------------------------------------------------------------------
// Motion Rates
// ----------------------------------------------------------------------------

/// Output data rates for the motion sensors and the notification timer, in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MotionRates {
    pub accelerometer: u16,
    pub gyroscope: u16,
    pub magnetometer: u16,
    pub timer: u16,
}

impl MotionRates {
    /// Fastest rates the reference firmware accepts
    pub const MAX: Self = Self {
        accelerometer: 208,
        gyroscope: 208,
        magnetometer: 80,
        timer: 133,
    };
}

impl Default for MotionRates {
    fn default() -> Self {
        Self::MAX
    }
}

// ----------------------------------------------------------------------------
// Sensor Configuration
// ----------------------------------------------------------------------------

/// One word per register in the static map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub firmware_version: u16,
    pub timer_frequency: u16,
    pub accelerometer_full_scale: u16,
    pub accelerometer_output_data_rate: u16,
    pub gyroscope_full_scale: u16,
    pub gyroscope_output_data_rate: u16,
    pub magnetometer_full_scale: u16,
    pub magnetometer_output_data_rate: u16,
}

impl SensorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value held for a register, `None` if it is not in the map
    pub fn get(&self, register: &RegisterDescriptor) -> Option<u16> {
        self.slot(register).map(|v| *v)
    }

    /// Store a value for a register
    pub fn set(&mut self, register: &RegisterDescriptor, value: u16) -> BlueStResult<()> {
        let slot = self.slot_mut(register)?;
        *slot = value;
        Ok(())
    }

    /// Apply the full-scale presets and the given rates
    pub fn configure_motion(&mut self, rates: MotionRates) {
        self.accelerometer_full_scale = ACCELEROMETER_FULL_SCALE_PRESET;
        self.gyroscope_full_scale = GYROSCOPE_FULL_SCALE_PRESET;
        self.magnetometer_full_scale = MAGNETOMETER_FULL_SCALE_PRESET;
        self.accelerometer_output_data_rate = rates.accelerometer;
        self.gyroscope_output_data_rate = rates.gyroscope;
        self.magnetometer_output_data_rate = rates.magnetometer;
        self.timer_frequency = rates.timer;
    }

    /// Read every register from the device
    pub async fn load(session: &DeviceSession, cancel: &CancelToken) -> BlueStResult<Self> {
        let mut config = Self::default();
        for register in REGISTER_MAP {
            let value = session.read_u16(register, cancel).await?;
            debug!("Loaded {} = {}", register.name, value);
            config.set(register, value)?;
        }
        info!("Loaded sensor configuration, firmware 0x{:04X}", config.firmware_version);
        Ok(config)
    }

    /// Write every writable register to the device
    ///
    /// Stops at the first failure; registers earlier in the map keep their
    /// new values.
    pub async fn save(&self, session: &DeviceSession, cancel: &CancelToken) -> BlueStResult<()> {
        let mut written = 0;
        for register in REGISTER_MAP.iter().filter(|r| r.writable) {
            let value = self.get(register).ok_or_else(|| unknown_register(register))?;
            session.write_u16(register, value, cancel).await?;
            written += 1;
        }
        info!("Saved {} sensor configuration registers", written);
        Ok(())
    }

    fn slot(&self, register: &RegisterDescriptor) -> Option<&u16> {
        let slot = match register.index {
            i if i == FIRMWARE_VERSION.index => &self.firmware_version,
            i if i == TIMER_FREQUENCY.index => &self.timer_frequency,
            i if i == ACCELEROMETER_FULL_SCALE.index => &self.accelerometer_full_scale,
            i if i == ACCELEROMETER_OUTPUT_DATA_RATE.index => &self.accelerometer_output_data_rate,
            i if i == GYROSCOPE_FULL_SCALE.index => &self.gyroscope_full_scale,
            i if i == GYROSCOPE_OUTPUT_DATA_RATE.index => &self.gyroscope_output_data_rate,
            i if i == MAGNETOMETER_FULL_SCALE.index => &self.magnetometer_full_scale,
            i if i == MAGNETOMETER_OUTPUT_DATA_RATE.index => &self.magnetometer_output_data_rate,
            _ => return None,
        };
        Some(slot)
    }

    fn slot_mut(&mut self, register: &RegisterDescriptor) -> BlueStResult<&mut u16> {
        let slot = match register.index {
            i if i == FIRMWARE_VERSION.index => &mut self.firmware_version,
            i if i == TIMER_FREQUENCY.index => &mut self.timer_frequency,
            i if i == ACCELEROMETER_FULL_SCALE.index => &mut self.accelerometer_full_scale,
            i if i == ACCELEROMETER_OUTPUT_DATA_RATE.index => {
                &mut self.accelerometer_output_data_rate
            }
            i if i == GYROSCOPE_FULL_SCALE.index => &mut self.gyroscope_full_scale,
            i if i == GYROSCOPE_OUTPUT_DATA_RATE.index => &mut self.gyroscope_output_data_rate,
            i if i == MAGNETOMETER_FULL_SCALE.index => &mut self.magnetometer_full_scale,
            i if i == MAGNETOMETER_OUTPUT_DATA_RATE.index => {
                &mut self.magnetometer_output_data_rate
            }
            _ => return Err(unknown_register(register)),
        };
        Ok(slot)
    }
}

fn unknown_register(register: &RegisterDescriptor) -> BlueStError {
    BlueStError::argument(format!(
        "Register {} (0x{:02X}) is not part of the sensor configuration",
        register.name, register.index
    ))
}
