//! Fixed-size binary codec for the plugin configuration.
//!
//! Fields are written little-endian in declared order: the parameter block,
//! the tunable extras, then the three derived shape scalars. The layout has
//! a fixed byte size; `decode` rejects buffers of any other length and
//! re-validates the decoded configuration, so no partially-constructed
//! plugin escapes a bad buffer. `encode(decode(b)) == b` for every buffer
//! `decode` accepts.

use crate::bbox::BoxCoding;
use crate::config::{NmsConfig, NmsParameters};
use crate::util::{NmsError, NmsResult};

/// Byte size of every serialized configuration.
pub const SERIALIZED_SIZE: usize = 69;

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn usize64(&mut self, value: usize) {
        self.buf.extend_from_slice(&(value as u64).to_le_bytes());
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        bytes
    }

    fn bool(&mut self) -> NmsResult<bool> {
        let offset = self.pos;
        match self.take::<1>()[0] {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(NmsError::SerializedValueInvalid { offset }),
        }
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take::<4>())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take::<4>())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take::<4>())
    }

    fn usize64(&mut self) -> NmsResult<usize> {
        let offset = self.pos;
        usize::try_from(u64::from_le_bytes(self.take::<8>()))
            .map_err(|_| NmsError::SerializedValueInvalid { offset })
    }
}

/// Serializes a configuration into its fixed-size byte layout.
pub fn encode(config: &NmsConfig) -> Vec<u8> {
    let mut w = Writer {
        buf: Vec::with_capacity(SERIALIZED_SIZE),
    };
    let params = &config.params;
    w.bool(params.share_location);
    w.i32(params.background_label_id);
    w.usize64(params.num_classes);
    w.usize64(params.top_k);
    w.usize64(params.keep_top_k);
    w.f32(params.score_threshold);
    w.f32(params.iou_threshold);
    w.bool(params.is_normalized);
    w.bool(params.clip_boxes);
    w.bool(config.box_coding == BoxCoding::CenterSize);
    w.u32(config.score_bits);
    w.bool(config.caffe_semantics);
    w.usize64(config.boxes_size);
    w.usize64(config.scores_size);
    w.usize64(config.num_priors);
    debug_assert_eq!(w.buf.len(), SERIALIZED_SIZE);
    w.buf
}

/// Deserializes and validates a configuration.
pub fn decode(data: &[u8]) -> NmsResult<NmsConfig> {
    if data.len() != SERIALIZED_SIZE {
        return Err(NmsError::SerializedLengthMismatch {
            expected: SERIALIZED_SIZE,
            got: data.len(),
        });
    }
    let mut r = Reader { buf: data, pos: 0 };
    let params = NmsParameters {
        share_location: r.bool()?,
        background_label_id: r.i32(),
        num_classes: r.usize64()?,
        top_k: r.usize64()?,
        keep_top_k: r.usize64()?,
        score_threshold: r.f32(),
        iou_threshold: r.f32(),
        is_normalized: r.bool()?,
        clip_boxes: r.bool()?,
    };
    let config = NmsConfig {
        params,
        box_coding: if r.bool()? {
            BoxCoding::CenterSize
        } else {
            BoxCoding::Corner
        },
        score_bits: r.u32(),
        caffe_semantics: r.bool()?,
        boxes_size: r.usize64()?,
        scores_size: r.usize64()?,
        num_priors: r.usize64()?,
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, SERIALIZED_SIZE};
    use crate::config::{NmsConfig, NmsParameters};
    use crate::util::NmsError;

    fn sample_config() -> NmsConfig {
        NmsConfig::new(NmsParameters {
            share_location: false,
            background_label_id: 0,
            num_classes: 5,
            top_k: 64,
            keep_top_k: 32,
            score_threshold: 0.25,
            iou_threshold: 0.6,
            is_normalized: false,
            clip_boxes: false,
        })
        .unwrap()
        .with_score_bits(8)
        .unwrap()
        .with_input_shape(512)
        .unwrap()
    }

    #[test]
    fn round_trips_byte_for_byte() {
        let config = sample_config();
        let bytes = encode(&config);
        assert_eq!(bytes.len(), SERIALIZED_SIZE);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, config);
        assert_eq!(encode(&decoded), bytes);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let bytes = encode(&sample_config());
        assert_eq!(
            decode(&bytes[..bytes.len() - 1]).unwrap_err(),
            NmsError::SerializedLengthMismatch {
                expected: SERIALIZED_SIZE,
                got: SERIALIZED_SIZE - 1,
            }
        );
    }

    #[test]
    fn non_canonical_bool_is_rejected() {
        let mut bytes = encode(&sample_config());
        bytes[0] = 2;
        assert_eq!(
            decode(&bytes).unwrap_err(),
            NmsError::SerializedValueInvalid { offset: 0 }
        );
    }

    #[test]
    fn decoded_configuration_is_revalidated() {
        let mut bytes = encode(&sample_config());
        // keep_top_k occupies bytes 21..29; bump it above top_k.
        bytes[21..29].copy_from_slice(&65u64.to_le_bytes());
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            NmsError::InvalidConfiguration { .. }
        ));
    }
}
