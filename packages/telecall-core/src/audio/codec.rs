//! μ-law (G.711) to 16-bit linear PCM decoding and WAV container framing.
//!
//! The decode algorithm below is bit-exact with the G.711 companding table;
//! see the module-level doc on [`decode_mulaw_sample`] for the step
//! breakdown. The WAV writer produces a complete, finite file per call —
//! unlike an infinite streaming source, every flush here has a known sample
//! count up front, so both the RIFF and `data` size fields are exact.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol_constants::{PCM_BITS_PER_SAMPLE, PCM_CHANNELS, WAV_AUDIO_FORMAT_PCM};

const MULAW_BIAS: i16 = 0x84;

/// Decodes a single μ-law byte into a 16-bit linear PCM sample.
///
/// 1. Invert all bits of the input byte.
/// 2. Extract sign, exponent, and mantissa from the inverted byte.
/// 3. Reconstruct the magnitude from exponent/mantissa plus the G.711 bias.
/// 4. Apply the sign.
#[must_use]
pub fn decode_mulaw_sample(mulaw_byte: u8) -> i16 {
    let x = !mulaw_byte;
    let sign = x & 0x80;
    let exponent = (x >> 4) & 0x07;
    let mantissa = x & 0x0F;
    let magnitude = (((mantissa as i16) << 3) + MULAW_BIAS) << exponent;
    if sign != 0 {
        -(magnitude - MULAW_BIAS)
    } else {
        magnitude - MULAW_BIAS
    }
}

/// Encodes a 16-bit linear PCM sample into a μ-law byte.
///
/// The inverse of [`decode_mulaw_sample`]: add back the bias, find the
/// segment (exponent) from the position of the highest set bit, then read
/// the mantissa out of the bits just below it. Used by tests to establish
/// the round-trip invariant over all 256 μ-law byte values.
#[must_use]
pub fn encode_mulaw_sample(sample: i16) -> u8 {
    const CLIP: i16 = 32_635;

    let sign: u8 = if sample < 0 { 0x80 } else { 0x00 };
    let magnitude = sample.unsigned_abs().min(CLIP as u16) as i16 + MULAW_BIAS;

    let highest_bit = 15 - magnitude.leading_zeros() as i16;
    let exponent = (highest_bit - 7).clamp(0, 7);
    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;

    let byte = sign | ((exponent as u8) << 4) | mantissa as u8;
    !byte
}

/// Decodes a full slice of μ-law bytes into 16-bit linear PCM samples.
#[must_use]
pub fn decode_mulaw_to_pcm16(data: &[u8]) -> Vec<i16> {
    data.iter().map(|&b| decode_mulaw_sample(b)).collect()
}

/// Builds a complete single-channel 16-bit PCM WAV file from decoded
/// samples at the given sample rate.
#[must_use]
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Bytes {
    let data_size = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * 2;
    let block_align: u16 = 2;

    let mut buf = BytesMut::with_capacity(44 + samples.len() * 2);

    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_size);
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(WAV_AUDIO_FORMAT_PCM);
    buf.put_u16_le(PCM_CHANNELS);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(PCM_BITS_PER_SAMPLE);

    buf.put_slice(b"data");
    buf.put_u32_le(data_size);
    for sample in samples {
        buf.put_i16_le(*sample);
    }

    buf.freeze()
}

/// Decodes a μ-law byte slice straight into a WAV file at the given sample
/// rate. The convenience entry point used by the flush pipeline.
#[must_use]
pub fn mulaw_to_wav(data: &[u8], sample_rate: u32) -> Bytes {
    encode_wav(&decode_mulaw_to_pcm16(data), sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_every_mulaw_byte() {
        for byte in 0u8..=255 {
            let decoded = decode_mulaw_sample(byte);
            let re_encoded = encode_mulaw_sample(decoded);
            assert_eq!(
                re_encoded, byte,
                "round trip failed for byte {byte:#04x} (decoded {decoded})"
            );
        }
    }

    #[test]
    fn wav_header_matches_scenario_6() {
        let input = [0x00u8, 0xFF, 0x7F, 0x80, 0x01, 0xFE, 0x7E, 0x81];
        let wav = mulaw_to_wav(&input, 8_000);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");

        let channels = u16::from_le_bytes([wav[22], wav[23]]);
        let sample_rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        let bits_per_sample = u16::from_le_bytes([wav[34], wav[35]]);
        assert_eq!(channels, 1);
        assert_eq!(sample_rate, 8_000);
        assert_eq!(bits_per_sample, 16);

        assert_eq!(&wav[36..40], b"data");
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 16);
    }

    #[test]
    fn data_subchunk_is_64000_bytes_for_32000_samples() {
        let samples = vec![0i16; 32_000];
        let wav = encode_wav(&samples, 8_000);
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 64_000);
        assert_eq!(wav.len(), 44 + 64_000);
    }
}
