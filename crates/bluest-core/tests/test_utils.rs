//! Test utilities for exercising the BlueST protocol without a radio
//!
//! Provides a scriptable in-memory [`GattTransport`] and helpers for building
//! characteristic sets and notification payloads.

#![allow(dead_code)]

use async_trait::async_trait;
use bluest_core::protocol::feature_mask::{
    feature_characteristic_uuid, CONFIG_SERVICE_UUID, DATA_SERVICE_UUID,
    REGISTER_ACCESS_CHARACTERISTIC_UUID,
};
use bluest_core::{
    CharacteristicHandle, CharacteristicInfo, FeatureMask, GattTransport, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Characteristic Builders
// ----------------------------------------------------------------------------

/// Notify-capable feature characteristic in the data service
pub fn feature(mask: FeatureMask) -> CharacteristicInfo {
    CharacteristicInfo {
        handle: CharacteristicHandle::new(DATA_SERVICE_UUID, feature_characteristic_uuid(mask)),
        notify: true,
    }
}

/// Feature characteristic that cannot notify
pub fn silent_feature(mask: FeatureMask) -> CharacteristicInfo {
    CharacteristicInfo {
        notify: false,
        ..feature(mask)
    }
}

/// The register-access characteristic in the config service
pub fn register_access() -> CharacteristicInfo {
    CharacteristicInfo {
        handle: CharacteristicHandle::new(CONFIG_SERVICE_UUID, REGISTER_ACCESS_CHARACTERISTIC_UUID),
        notify: false,
    }
}

/// Timestamp followed by three little-endian axes
pub fn motion_payload(timestamp: u16, x: i16, y: i16, z: i16) -> Vec<u8> {
    let mut data = timestamp.to_le_bytes().to_vec();
    data.extend_from_slice(&x.to_le_bytes());
    data.extend_from_slice(&y.to_le_bytes());
    data.extend_from_slice(&z.to_le_bytes());
    data
}

/// Register response with the control byte, index and payload
pub fn register_response(control: u8, index: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![control, index, 0x00, (payload.len() / 2) as u8];
    data.extend_from_slice(payload);
    data
}

// ----------------------------------------------------------------------------
// Mock Transport
// ----------------------------------------------------------------------------

/// Register-channel operation as seen by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Write,
    Read,
}

/// Scriptable GATT transport
///
/// Reads pop from a queue; once it is empty `idle_read` is returned. Writes
/// and notification toggles are recorded in order. Every register write and
/// read yields to the scheduler so concurrent callers get a chance to
/// interleave.
pub struct MockTransport {
    characteristics: Vec<CharacteristicInfo>,
    reads: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    idle_read: Mutex<Option<Vec<u8>>>,
    writes: Mutex<Vec<Vec<u8>>>,
    write_failure: Mutex<Option<TransportError>>,
    notify_calls: Mutex<Vec<(Uuid, bool)>>,
    notify_failures: Mutex<HashMap<Uuid, TransportError>>,
    events: Mutex<Vec<TransportEvent>>,
    read_count: AtomicUsize,
}

impl MockTransport {
    pub fn new(characteristics: Vec<CharacteristicInfo>) -> Self {
        Self {
            characteristics,
            reads: Mutex::new(VecDeque::new()),
            idle_read: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            write_failure: Mutex::new(None),
            notify_calls: Mutex::new(Vec::new()),
            notify_failures: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            read_count: AtomicUsize::new(0),
        }
    }

    /// Queue the next uncached read result
    pub fn push_read(&self, response: Vec<u8>) {
        self.reads.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_read_error(&self, error: TransportError) {
        self.reads.lock().unwrap().push_back(Err(error));
    }

    /// Response returned once the read queue is exhausted
    pub fn set_idle_read(&self, response: Vec<u8>) {
        *self.idle_read.lock().unwrap() = Some(response);
    }

    pub fn fail_writes(&self, error: TransportError) {
        *self.write_failure.lock().unwrap() = Some(error);
    }

    /// Make every notification toggle on `uuid` fail
    pub fn fail_notifications(&self, uuid: Uuid, error: TransportError) {
        self.notify_failures.lock().unwrap().insert(uuid, error);
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn notify_calls(&self) -> Vec<(Uuid, bool)> {
        self.notify_calls.lock().unwrap().clone()
    }

    /// Register writes and reads in the order they reached the transport
    pub fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GattTransport for MockTransport {
    fn characteristics(&self) -> Vec<CharacteristicInfo> {
        self.characteristics.clone()
    }

    async fn write_with_response(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), TransportError> {
        if let Some(error) = self.write_failure.lock().unwrap().clone() {
            return Err(error);
        }
        assert_eq!(characteristic.uuid, REGISTER_ACCESS_CHARACTERISTIC_UUID);
        self.writes.lock().unwrap().push(data.to_vec());
        self.events.lock().unwrap().push(TransportEvent::Write);
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn read_uncached(
        &self,
        characteristic: &CharacteristicHandle,
    ) -> Result<Vec<u8>, TransportError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(TransportEvent::Read);
        let next = self.reads.lock().unwrap().pop_front();
        tokio::task::yield_now().await;
        if let Some(next) = next {
            return next;
        }
        self.idle_read
            .lock()
            .unwrap()
            .clone()
            .ok_or(TransportError::ReadFailed {
                uuid: characteristic.uuid,
                reason: "no scripted response".into(),
            })
    }

    async fn set_notifications(
        &self,
        characteristic: &CharacteristicHandle,
        enabled: bool,
    ) -> Result<(), TransportError> {
        self.notify_calls
            .lock()
            .unwrap()
            .push((characteristic.uuid, enabled));
        match self.notify_failures.lock().unwrap().get(&characteristic.uuid) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
