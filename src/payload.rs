use crate::errors::PayloadError;

pub const PAYLOAD_LEN: usize = 12;

const SEQUENCE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub sequence: u32,
    /// Monotonic microseconds since boot.
    pub timestamp_us: u64,
}

impl Payload {
    pub const fn new(sequence: u32, timestamp_us: u64) -> Self {
        Self {
            sequence,
            timestamp_us,
        }
    }

    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut out = [0u8; PAYLOAD_LEN];
        out[..SEQUENCE_LEN].copy_from_slice(&self.sequence.to_le_bytes());
        out[SEQUENCE_LEN..].copy_from_slice(&self.timestamp_us.to_le_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        if data.len() != PAYLOAD_LEN {
            return Err(PayloadError::InvalidLength(data.len()));
        }

        let mut sequence = [0u8; SEQUENCE_LEN];
        sequence.copy_from_slice(&data[..SEQUENCE_LEN]);
        let mut timestamp = [0u8; PAYLOAD_LEN - SEQUENCE_LEN];
        timestamp.copy_from_slice(&data[SEQUENCE_LEN..]);

        Ok(Self {
            sequence: u32::from_le_bytes(sequence),
            timestamp_us: u64::from_le_bytes(timestamp),
        })
    }
}

pub const CCCD_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CccdValue {
    Disabled,
    NotificationsEnabled,
    /// Anything else, including the indications bit.
    Unrecognized(u16),
}

impl CccdValue {
    /// Returns `None` unless `data` is exactly two bytes long.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let raw: [u8; CCCD_LEN] = data.try_into().ok()?;
        Some(match u16::from_le_bytes(raw) {
            0x0000 => CccdValue::Disabled,
            0x0001 => CccdValue::NotificationsEnabled,
            other => CccdValue::Unrecognized(other),
        })
    }

    pub fn encode(notifications_enabled: bool) -> [u8; CCCD_LEN] {
        u16::from(notifications_enabled).to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_sequence_then_timestamp_little_endian() {
        let bytes = Payload::new(0x0403_0201, 0x0c0b_0a09_0807_0605).encode();
        assert_eq!(
            bytes,
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c]
        );
    }

    #[test]
    fn decode_recovers_encoded_fields() {
        let payload = Payload::new(u32::MAX, 1_234_567_890_123);
        assert_eq!(Payload::decode(&payload.encode()), Ok(payload));
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(
            Payload::decode(&[0u8; 11]),
            Err(PayloadError::InvalidLength(11))
        );
        assert_eq!(
            Payload::decode(&[0u8; 13]),
            Err(PayloadError::InvalidLength(13))
        );
    }

    #[test]
    fn cccd_parse() {
        assert_eq!(CccdValue::parse(&[0x01, 0x00]), Some(CccdValue::NotificationsEnabled));
        assert_eq!(CccdValue::parse(&[0x00, 0x00]), Some(CccdValue::Disabled));
        assert_eq!(CccdValue::parse(&[0x02, 0x00]), Some(CccdValue::Unrecognized(0x0002)));
        assert_eq!(CccdValue::parse(&[0x01]), None);
        assert_eq!(CccdValue::parse(&[0x01, 0x00, 0x00]), None);
    }

    #[test]
    fn cccd_encode() {
        assert_eq!(CccdValue::encode(true), [0x01, 0x00]);
        assert_eq!(CccdValue::encode(false), [0x00, 0x00]);
    }
}
