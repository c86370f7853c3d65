//! Device session
//!
//! A [`DeviceSession`] owns the feature characteristics discovered on one
//! connected node. It computes the node's capabilities, arms and disarms
//! notifications, decodes incoming notifications into [`FeatureFrame`]s which
//! it fans out to subscribed listeners, and issues register operations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::protocol::feature_mask::{
    feature_mask_of, is_feature_characteristic, REGISTER_ACCESS_CHARACTERISTIC_UUID,
};
use crate::protocol::frame::{DecodedPayload, FrameCursor, FrameShape, PayloadKind, Payloads};
use crate::protocol::register::{Persistence, RegisterAccess, TransactionState};
use crate::protocol::register_map::RegisterDescriptor;
use crate::transport::{CharacteristicHandle, CharacteristicInfo, GattTransport};
use crate::types::{CancelToken, FeatureMask, Timestamp};
use crate::{BlueStError, BlueStResult};

// ----------------------------------------------------------------------------
// Aggregate Declarations
// ----------------------------------------------------------------------------

/// Caller-declared aggregate characteristic and the order of its payloads
///
/// The device does not describe the layout of aggregate frames, so the payload
/// order has to come from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFeature {
    pub mask: FeatureMask,
    pub layout: Vec<PayloadKind>,
}

impl AggregateFeature {
    pub fn new(mask: FeatureMask, layout: Vec<PayloadKind>) -> Self {
        Self { mask, layout }
    }

    fn validate(&self) -> BlueStResult<()> {
        if !self.mask.is_aggregate() {
            return Err(BlueStError::argument(format!(
                "Aggregate feature mask 0x{:08X} must have at least two bits set",
                self.mask.bits()
            )));
        }
        if self.layout.is_empty() {
            return Err(BlueStError::argument(format!(
                "Aggregate feature {} declares no payloads",
                self.mask
            )));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Frames and Listeners
// ----------------------------------------------------------------------------

/// Characteristic a frame came from, with its derived feature mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureSource {
    pub handle: CharacteristicHandle,
    pub features: FeatureMask,
}

/// One decoded telemetry notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    pub source: FeatureSource,
    /// Wall-clock time the transport received the notification
    pub received_at: Timestamp,
    /// 16-bit on-device timestamp shared by every payload
    pub device_timestamp: u16,
    pub payloads: Payloads,
}

impl FeatureFrame {
    pub fn features(&self) -> FeatureMask {
        self.source.features
    }

    pub fn is_aggregate(&self) -> bool {
        self.source.features.is_aggregate()
    }

    /// First payload; the only one for single-feature frames
    pub fn payload(&self) -> Option<&DecodedPayload> {
        self.payloads.first()
    }
}

/// Receiver of decoded frames
///
/// Called synchronously from the transport's delivery context; implementations
/// must return quickly and must not block.
pub trait FrameListener: Send + Sync {
    fn on_frame(&self, frame: &FeatureFrame);
}

impl<F> FrameListener for F
where
    F: Fn(&FeatureFrame) + Send + Sync,
{
    fn on_frame(&self, frame: &FeatureFrame) {
        self(frame)
    }
}

/// Handle returned by [`DeviceSession::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ----------------------------------------------------------------------------
// Device Session
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct FeatureCharacteristic {
    info: CharacteristicInfo,
    features: FeatureMask,
    shape: Option<FrameShape>,
}

/// Protocol session over one connected BlueST node
pub struct DeviceSession {
    transport: Arc<dyn GattTransport>,
    characteristics: Vec<FeatureCharacteristic>,
    capabilities: FeatureMask,
    register_access: Option<RegisterAccess>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn FrameListener>)>>,
    next_listener_id: AtomicU64,
}

impl DeviceSession {
    /// Build a session from the characteristics the transport discovered
    pub fn new(
        transport: Arc<dyn GattTransport>,
        aggregates: Vec<AggregateFeature>,
        config: SessionConfig,
    ) -> BlueStResult<Self> {
        for aggregate in &aggregates {
            aggregate.validate()?;
        }

        let discovered = transport.characteristics();
        let mut characteristics = Vec::new();
        let mut register_handle = None;

        for info in discovered {
            if info.handle.uuid == REGISTER_ACCESS_CHARACTERISTIC_UUID {
                register_handle = Some(info.handle);
                continue;
            }
            if !is_feature_characteristic(&info.handle.uuid) {
                continue;
            }

            let features = feature_mask_of(&info.handle.uuid);
            let shape = if features.is_single() {
                PayloadKind::for_feature(features).map(FrameShape::Single)
            } else if let Some(aggregate) = aggregates.iter().find(|a| a.mask == features) {
                Some(FrameShape::Aggregate(aggregate.layout.clone()))
            } else {
                debug!(
                    "Skipping undeclared aggregate characteristic {} ({})",
                    info.handle.uuid, features
                );
                continue;
            };

            if shape.is_none() {
                debug!("No payload decoder for feature {}", features);
            }
            characteristics.push(FeatureCharacteristic {
                info,
                features,
                shape,
            });
        }

        if characteristics.is_empty() {
            return Err(BlueStError::configuration(
                "No BlueST feature characteristics discovered on device",
            ));
        }

        let capabilities = characteristics
            .iter()
            .fold(FeatureMask::NONE, |acc, c| acc | c.features);
        if capabilities.is_empty() {
            return Err(BlueStError::configuration("Device reports no features"));
        }

        let register_access =
            register_handle.map(|handle| RegisterAccess::new(transport.clone(), handle, &config));

        info!(
            "BlueST session ready: {} characteristics, features {}, register access {}",
            characteristics.len(),
            capabilities,
            if register_access.is_some() { "available" } else { "unavailable" }
        );

        Ok(Self {
            transport,
            characteristics,
            capabilities,
            register_access,
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        })
    }

    /// OR of every feature characteristic's mask
    pub fn capabilities(&self) -> FeatureMask {
        self.capabilities
    }

    /// Feature characteristics kept by this session, in discovery order
    pub fn sources(&self) -> Vec<FeatureSource> {
        self.characteristics
            .iter()
            .map(|c| FeatureSource {
                handle: c.info.handle,
                features: c.features,
            })
            .collect()
    }

    pub fn supports_register_access(&self) -> bool {
        self.register_access.is_some()
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Arm notifications on every notify-capable characteristic intersecting `target`
    ///
    /// Stops at the first transport failure. Returns the number of
    /// characteristics armed.
    pub async fn enable_notifications(&self, target: FeatureMask) -> BlueStResult<usize> {
        let mut enabled = 0;
        for characteristic in &self.characteristics {
            if !characteristic.features.intersects(target) {
                continue;
            }
            if !characteristic.info.notify {
                debug!(
                    "Characteristic {} cannot notify, skipping",
                    characteristic.info.handle.uuid
                );
                continue;
            }

            self.transport
                .set_notifications(&characteristic.info.handle, true)
                .await
                .map_err(|source| BlueStError::Notification {
                    uuid: characteristic.info.handle.uuid,
                    source,
                })?;
            enabled += 1;
        }

        info!("Enabled notifications on {} characteristics for {}", enabled, target);
        Ok(enabled)
    }

    /// Disarm notifications on every characteristic
    ///
    /// Every characteristic is attempted. Unreachable-device failures are
    /// ignored; any other failure is reported after all attempts.
    pub async fn disable_all_notifications(&self) -> BlueStResult<()> {
        let mut failures = Vec::new();
        for characteristic in &self.characteristics {
            let uuid = characteristic.info.handle.uuid;
            match self
                .transport
                .set_notifications(&characteristic.info.handle, false)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_unreachable() => {
                    debug!("Ignoring unreachable device while disabling {}", uuid);
                }
                Err(e) => {
                    warn!("Failed to disable notifications on {}: {}", uuid, e);
                    failures.push((uuid, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BlueStError::NotificationTeardown { failures })
        }
    }

    /// Register a listener; listeners run in subscription order
    pub fn subscribe<L>(&self, listener: L) -> ListenerId
    where
        L: FrameListener + 'static,
    {
        self.subscribe_shared(Arc::new(listener))
    }

    /// Register an already shared listener
    pub fn subscribe_shared(&self, listener: Arc<dyn FrameListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Decode a raw notification without dispatching it
    ///
    /// Returns `Ok(None)` for characteristics this session does not track.
    pub fn decode_notification(
        &self,
        uuid: &Uuid,
        received_at: Timestamp,
        data: &[u8],
    ) -> BlueStResult<Option<FeatureFrame>> {
        let Some(characteristic) = self.characteristics.iter().find(|c| c.info.handle.uuid == *uuid)
        else {
            return Ok(None);
        };

        let shape = characteristic.shape.as_ref().ok_or_else(|| {
            BlueStError::unsupported(format!(
                "No payload decoder for feature {}",
                characteristic.features
            ))
        })?;

        let (device_timestamp, payloads) = shape.decode(&mut FrameCursor::new(data))?;
        Ok(Some(FeatureFrame {
            source: FeatureSource {
                handle: characteristic.info.handle,
                features: characteristic.features,
            },
            received_at,
            device_timestamp,
            payloads,
        }))
    }

    /// Entry point for the transport's notification callback
    ///
    /// Decodes the notification and hands the frame to every listener in
    /// subscription order.
    pub fn handle_notification(
        &self,
        uuid: &Uuid,
        received_at: Timestamp,
        data: &[u8],
    ) -> BlueStResult<()> {
        let Some(frame) = self.decode_notification(uuid, received_at, data)? else {
            debug!("Notification from untracked characteristic {}", uuid);
            return Ok(());
        };

        let listeners: Vec<Arc<dyn FrameListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener.on_frame(&frame);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Register Access
    // ------------------------------------------------------------------------

    fn register_access(&self) -> BlueStResult<&RegisterAccess> {
        self.register_access.as_ref().ok_or_else(|| {
            BlueStError::unsupported("Accessing configuration registers is not supported")
        })
    }

    /// State of the register-access slot, if the device has one
    pub fn register_state(&self) -> Option<TransactionState> {
        self.register_access.as_ref().and_then(|r| r.state())
    }

    /// Read `width` bytes from a register
    pub async fn read_register(
        &self,
        index: u8,
        persistence: Persistence,
        width: usize,
        cancel: &CancelToken,
    ) -> BlueStResult<Vec<u8>> {
        self.register_access()?
            .read(index, persistence, width, cancel)
            .await
    }

    /// Write `data` to a register
    pub async fn write_register(
        &self,
        index: u8,
        persistence: Persistence,
        data: &[u8],
        cancel: &CancelToken,
    ) -> BlueStResult<()> {
        self.register_access()?
            .write(index, persistence, data, cancel)
            .await
    }

    /// Read a one-word register described by the static map
    pub async fn read_u16(
        &self,
        register: &RegisterDescriptor,
        cancel: &CancelToken,
    ) -> BlueStResult<u16> {
        let bytes = self
            .read_register(register.index, register.persistence, 2, cancel)
            .await?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Write a one-word register described by the static map
    pub async fn write_u16(
        &self,
        register: &RegisterDescriptor,
        value: u16,
        cancel: &CancelToken,
    ) -> BlueStResult<()> {
        if !register.writable {
            return Err(BlueStError::argument(format!(
                "Register {} is read-only",
                register.name
            )));
        }
        self.write_register(register.index, register.persistence, &value.to_le_bytes(), cancel)
            .await
    }
}
