use crate::device::constants::PACKET_LEN;
use crate::error::DecodeError;

/// Decode a notification payload into a pressure percentage.
///
/// The first four bytes are a little-endian IEEE-754 `f32`. Trailing bytes are ignored so newer
/// firmware can pad the packet. The value is not range checked.
pub fn decode(bytes: &[u8]) -> Result<f32, DecodeError> {
    let raw: [u8; PACKET_LEN] = bytes
        .get(..PACKET_LEN)
        .and_then(|head| head.try_into().ok())
        .ok_or(DecodeError::TooShort { len: bytes.len() })?;

    Ok(f32::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_little_endian_float() {
        assert_eq!(decode(&[0x00, 0x00, 0x48, 0x42]), Ok(50.0));
    }

    #[test]
    fn should_ignore_trailing_bytes() {
        let mut packet = 72.5_f32.to_le_bytes().to_vec();
        packet.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode(&packet), Ok(72.5));
    }

    #[test]
    fn should_reject_short_packets() {
        for len in 0..PACKET_LEN {
            let packet = vec![0x42; len];
            assert_eq!(decode(&packet), Err(DecodeError::TooShort { len }));
        }
    }

    #[test]
    fn should_pass_out_of_range_values_through() {
        assert_eq!(decode(&(-3.0_f32).to_le_bytes()), Ok(-3.0));
        assert_eq!(decode(&150.0_f32.to_le_bytes()), Ok(150.0));
    }
}
