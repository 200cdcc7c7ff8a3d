// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Little-endian PCM16 framing for binary WebSocket frames.

pub fn encode_pcm16le(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decodes little-endian PCM16. A trailing odd byte is dropped.
pub fn decode_pcm16le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_layout() {
        assert_eq!(encode_pcm16le(&[1, -2]), vec![0x01, 0x00, 0xfe, 0xff]);
        assert_eq!(decode_pcm16le(&[0x01, 0x00, 0xfe, 0xff, 0x7f]), vec![1, -2]);
        assert!(decode_pcm16le(&[]).is_empty());
    }
}
