//! Configuration register access
//!
//! Registers are read and written through a single characteristic. The client
//! writes a 4-byte control frame (plus payload for writes), then polls the same
//! characteristic until the device clears `PENDING_EXEC` or raises `ERROR`:
//!
//! ```text
//! request:  [control:1][index:1][reserved=0:1][word_count:1][payload...]
//! response: [control:1][_:1][error_code:1][_:1][payload...]
//! ```
//!
//! Only one transaction may be in flight per device, so [`RegisterAccess`]
//! serializes callers behind an async mutex.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::transport::{CharacteristicHandle, GattTransport};
use crate::types::CancelToken;
use crate::{BlueStError, BlueStResult};

/// Size of the control header in requests and responses
pub const CONTROL_HEADER_LEN: usize = 4;

/// How often a caller queued for the slot re-checks its cancel signal
const SLOT_CHECK_INTERVAL: Duration = Duration::from_millis(5);

// ----------------------------------------------------------------------------
// Control Field
// ----------------------------------------------------------------------------

/// Bit set carried in byte 0 of every control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterAccessControl(u8);

impl RegisterAccessControl {
    pub const NONE: Self = Self(0x00);

    /// Operation requested but not yet executed by the device
    pub const PENDING_EXEC: Self = Self(1 << 7);

    /// Target the persistent copy of the register
    pub const PERSISTENT: Self = Self(1 << 6);

    /// Write rather than read
    pub const WRITE: Self = Self(1 << 5);

    /// Device failed the operation; byte 2 holds the code
    pub const ERROR: Self = Self(1 << 4);

    /// Request an acknowledgement
    pub const ACK_REQUIRED: Self = Self(1 << 3);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0
    }

    pub const fn with(self, flag: Self) -> Self {
        Self(self.0 | flag.0)
    }

    pub const fn is_pending(self) -> bool {
        self.contains(Self::PENDING_EXEC)
    }

    pub const fn is_error(self) -> bool {
        self.contains(Self::ERROR)
    }
}

/// Which copy of a register an access targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persistence {
    /// Lost on device reset
    Session,
    /// Retained across resets
    Persistent,
}

// ----------------------------------------------------------------------------
// Frames
// ----------------------------------------------------------------------------

fn check_width(width: usize) -> BlueStResult<u8> {
    if width % 2 != 0 {
        return Err(BlueStError::argument(format!(
            "Register length must be a multiple of 2, got {}",
            width
        )));
    }
    u8::try_from(width / 2).map_err(|_| {
        BlueStError::argument(format!("Register length {} exceeds 255 words", width))
    })
}

fn request_control(persistence: Persistence, write: bool) -> RegisterAccessControl {
    let mut control = RegisterAccessControl::PENDING_EXEC.with(RegisterAccessControl::ACK_REQUIRED);
    if persistence == Persistence::Persistent {
        control = control.with(RegisterAccessControl::PERSISTENT);
    }
    if write {
        control = control.with(RegisterAccessControl::WRITE);
    }
    control
}

/// Build the 4-byte read request for `width` bytes of register `index`
pub fn encode_read_request(
    index: u8,
    persistence: Persistence,
    width: usize,
) -> BlueStResult<[u8; CONTROL_HEADER_LEN]> {
    let words = check_width(width)?;
    Ok([request_control(persistence, false).as_u8(), index, 0, words])
}

/// Build a write request carrying `data`
pub fn encode_write_request(
    index: u8,
    persistence: Persistence,
    data: &[u8],
) -> BlueStResult<Vec<u8>> {
    let words = check_width(data.len())?;
    let mut frame = Vec::with_capacity(CONTROL_HEADER_LEN + data.len());
    frame.extend_from_slice(&[request_control(persistence, true).as_u8(), index, 0, words]);
    frame.extend_from_slice(data);
    Ok(frame)
}

/// Interpretation of one poll response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<'a> {
    /// Device still executing
    Pending,
    /// Operation finished; bytes following the header
    Complete(&'a [u8]),
    /// Device reported a failure code
    DeviceError(u8),
}

/// Classify a response; `ERROR` wins over `PENDING_EXEC`
pub fn parse_response(response: &[u8]) -> BlueStResult<PollOutcome<'_>> {
    if response.len() < CONTROL_HEADER_LEN {
        return Err(BlueStError::TruncatedFrame {
            expected: CONTROL_HEADER_LEN,
            available: response.len(),
        });
    }

    let control = RegisterAccessControl::new(response[0]);
    if control.is_error() {
        return Ok(PollOutcome::DeviceError(response[2]));
    }
    if control.is_pending() {
        return Ok(PollOutcome::Pending);
    }
    Ok(PollOutcome::Complete(&response[CONTROL_HEADER_LEN..]))
}

// ----------------------------------------------------------------------------
// Transaction State
// ----------------------------------------------------------------------------

/// Progress of the most recent register transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    RequestSent,
    Polling { polls: u32 },
    Done,
    Failed,
}

// ----------------------------------------------------------------------------
// Register Access
// ----------------------------------------------------------------------------

/// Request/poll driver bound to a device's register-access characteristic
pub struct RegisterAccess {
    transport: Arc<dyn GattTransport>,
    characteristic: CharacteristicHandle,
    poll_interval: Duration,
    timeout: Option<Duration>,
    /// Held for the whole transaction; the characteristic has one slot
    state: Mutex<TransactionState>,
}

impl RegisterAccess {
    pub fn new(
        transport: Arc<dyn GattTransport>,
        characteristic: CharacteristicHandle,
        config: &SessionConfig,
    ) -> Self {
        Self {
            transport,
            characteristic,
            poll_interval: config.register_poll_interval,
            timeout: config.register_timeout,
            state: Mutex::new(TransactionState::Idle),
        }
    }

    pub fn characteristic(&self) -> &CharacteristicHandle {
        &self.characteristic
    }

    /// State the last transaction ended in; `None` while one holds the slot
    pub fn state(&self) -> Option<TransactionState> {
        self.state.try_lock().ok().map(|state| *state)
    }

    /// Read `width` bytes from register `index`
    pub async fn read(
        &self,
        index: u8,
        persistence: Persistence,
        width: usize,
        cancel: &CancelToken,
    ) -> BlueStResult<Vec<u8>> {
        let request = encode_read_request(index, persistence, width)?;
        self.run(index, &request, cancel, |payload| {
            if payload.len() < width {
                return Err(BlueStError::TruncatedFrame {
                    expected: width,
                    available: payload.len(),
                });
            }
            Ok(payload[..width].to_vec())
        })
        .await
    }

    /// Write `data` to register `index`
    pub async fn write(
        &self,
        index: u8,
        persistence: Persistence,
        data: &[u8],
        cancel: &CancelToken,
    ) -> BlueStResult<()> {
        let request = encode_write_request(index, persistence, data)?;
        self.run(index, &request, cancel, |_| Ok(())).await
    }

    /// Take the slot, run one transaction and record how it ended
    ///
    /// The deadline covers the wait for the slot as well as the transaction.
    async fn run<T>(
        &self,
        index: u8,
        request: &[u8],
        cancel: &CancelToken,
        complete: impl Fn(&[u8]) -> BlueStResult<T>,
    ) -> BlueStResult<T> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let mut state = self.acquire(index, cancel, deadline).await?;
        let result = self
            .transact(&mut state, index, request, cancel, deadline, complete)
            .await;
        *state = if result.is_ok() {
            TransactionState::Done
        } else {
            TransactionState::Failed
        };
        result
    }

    /// Wait for the single in-flight slot, giving up once cancelled
    async fn acquire(
        &self,
        index: u8,
        cancel: &CancelToken,
        deadline: Option<Instant>,
    ) -> BlueStResult<MutexGuard<'_, TransactionState>> {
        let lock = self.state.lock();
        tokio::pin!(lock);

        loop {
            if interrupted(cancel, deadline) {
                debug!("Register 0x{:02X} access cancelled while waiting for slot", index);
                return Err(BlueStError::Cancelled);
            }
            tokio::select! {
                guard = &mut lock => return Ok(guard),
                _ = tokio::time::sleep(SLOT_CHECK_INTERVAL) => {}
            }
        }
    }

    async fn transact<T>(
        &self,
        state: &mut TransactionState,
        index: u8,
        request: &[u8],
        cancel: &CancelToken,
        deadline: Option<Instant>,
        complete: impl Fn(&[u8]) -> BlueStResult<T>,
    ) -> BlueStResult<T> {
        if interrupted(cancel, deadline) {
            debug!("Register 0x{:02X} access cancelled before request", index);
            return Err(BlueStError::Cancelled);
        }

        debug!("Register 0x{:02X} request: {}", index, hex::encode(request));
        self.transport
            .write_with_response(&self.characteristic, request)
            .await?;
        *state = TransactionState::RequestSent;

        let mut polls = 0u32;
        loop {
            if interrupted(cancel, deadline) {
                debug!("Register 0x{:02X} access cancelled after {} polls", index, polls);
                return Err(BlueStError::Cancelled);
            }

            let response = self.transport.read_uncached(&self.characteristic).await?;
            polls += 1;
            *state = TransactionState::Polling { polls };
            trace!("Register 0x{:02X} poll {}: {}", index, polls, hex::encode(&response));

            match parse_response(&response)? {
                PollOutcome::DeviceError(code) => {
                    debug!("Register 0x{:02X} failed with code 0x{:02X}", index, code);
                    return Err(BlueStError::Access { index, code });
                }
                PollOutcome::Pending => {
                    if !self.poll_interval.is_zero() {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
                PollOutcome::Complete(payload) => {
                    debug!("Register 0x{:02X} completed after {} polls", index, polls);
                    return complete(payload);
                }
            }
        }
    }
}

fn interrupted(cancel: &CancelToken, deadline: Option<Instant>) -> bool {
    cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_request_layout() {
        let frame = encode_read_request(0x74, Persistence::Persistent, 2).unwrap();
        assert_eq!(frame, [0x80 | 0x40 | 0x08, 0x74, 0x00, 0x01]);

        let frame = encode_read_request(0x00, Persistence::Session, 4).unwrap();
        assert_eq!(frame, [0x80 | 0x08, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_write_request_layout() {
        let frame = encode_write_request(0x21, Persistence::Session, &[0x85, 0x00]).unwrap();
        assert_eq!(frame, vec![0x80 | 0x20 | 0x08, 0x21, 0x00, 0x01, 0x85, 0x00]);
    }

    #[test]
    fn test_odd_width_rejected() {
        assert!(matches!(
            encode_read_request(0x21, Persistence::Session, 3),
            Err(BlueStError::Argument { .. })
        ));
        assert!(matches!(
            encode_write_request(0x21, Persistence::Session, &[1, 2, 3]),
            Err(BlueStError::Argument { .. })
        ));
    }

    #[test]
    fn test_error_bit_wins_over_pending() {
        let response = [0x80 | 0x10, 0x00, 0x2A, 0x00];
        assert_eq!(parse_response(&response).unwrap(), PollOutcome::DeviceError(0x2A));
    }

    #[test]
    fn test_pending_and_complete() {
        assert_eq!(
            parse_response(&[0x80, 0x74, 0x00, 0x01]).unwrap(),
            PollOutcome::Pending
        );
        assert_eq!(
            parse_response(&[0x08, 0x74, 0x00, 0x01, 0x10, 0x00]).unwrap(),
            PollOutcome::Complete(&[0x10, 0x00])
        );
    }

    #[test]
    fn test_short_response_truncated() {
        assert!(matches!(
            parse_response(&[0x80, 0x00]),
            Err(BlueStError::TruncatedFrame {
                expected: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn test_control_flags() {
        let control = RegisterAccessControl::NONE
            .with(RegisterAccessControl::WRITE)
            .with(RegisterAccessControl::ERROR);
        assert!(control.is_error());
        assert!(!control.is_pending());
        assert!(control.contains(RegisterAccessControl::WRITE));
        assert_eq!(control.as_u8(), 0x30);
    }
}
