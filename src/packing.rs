//! Four 8-bit channels folded into one 32-bit float slot.
//!
//! The packed value is never used as a number on the CPU. Its bit pattern is
//! uploaded as an ordinary `f32` vertex attribute and the vertex shader
//! recovers the bytes with `bitcast<u32>` (see [`UNPACK_WGSL`]). Nothing in
//! between may normalize or interpolate the attribute.
//!
//! # Layout
//!
//! `pack(a, b, c, d)` builds the big-endian word `a b c d`: `a` lands in the
//! most significant byte, `d` in the least significant one.
//!
//! ```
//! use ember::packing::{pack, unpack};
//!
//! let packed = pack(12, 34, 56, 78);
//! assert_eq!(packed.to_bits(), 0x0C22_384E);
//! assert_eq!(unpack(packed), [12, 34, 56, 78]);
//! ```
//!
//! Some byte combinations are NaN or infinity when read as floats. That is
//! fine: the bits are copied, never computed on.

/// Pack four bytes into the bit pattern of an `f32`.
#[inline]
pub fn pack(a: u8, b: u8, c: u8, d: u8) -> f32 {
    f32::from_bits(u32::from_be_bytes([a, b, c, d]))
}

/// Floor each input, then [`pack`] it.
///
/// Callers clamp to `[0, 255]` beforehand. Out-of-range input is a caller
/// bug (caught by a debug assertion); release builds saturate.
#[inline]
pub fn pack_floored(a: f32, b: f32, c: f32, d: f32) -> f32 {
    pack(to_byte(a), to_byte(b), to_byte(c), to_byte(d))
}

/// Recover the four bytes written by [`pack`].
#[inline]
pub fn unpack(packed: f32) -> [u8; 4] {
    packed.to_bits().to_be_bytes()
}

#[inline]
fn to_byte(v: f32) -> u8 {
    let v = v.floor();
    debug_assert!(
        (0.0..=255.0).contains(&v),
        "packed channel value {v} outside [0, 255]"
    );
    v as u8
}

/// WGSL mirror of [`unpack`] for vertex shaders.
///
/// - `unpack_bytes(packed: f32) -> vec4<u32>` - the four bytes, `a` in `.x`
/// - `unpack_unorm(packed: f32) -> vec4<f32>` - bytes scaled to 0..1
/// - `unpack_velocity(packed: f32) -> vec3<f32>` - first three bytes re-centred around 127
pub const UNPACK_WGSL: &str = r#"
fn unpack_bytes(packed: f32) -> vec4<u32> {
    let bits = bitcast<u32>(packed);
    return vec4<u32>(
        (bits >> 24u) & 0xFFu,
        (bits >> 16u) & 0xFFu,
        (bits >> 8u) & 0xFFu,
        bits & 0xFFu
    );
}

fn unpack_unorm(packed: f32) -> vec4<f32> {
    return vec4<f32>(unpack_bytes(packed)) / 255.0;
}

fn unpack_velocity(packed: f32) -> vec3<f32> {
    let b = unpack_bytes(packed);
    return vec3<f32>(f32(b.x), f32(b.y), f32(b.z)) - vec3<f32>(127.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_byte_order() {
        assert_eq!(pack(0xAA, 0, 0, 0).to_bits(), 0xAA00_0000);
        assert_eq!(pack(0, 0, 0, 0xAA).to_bits(), 0x0000_00AA);
        assert_eq!(pack(1, 2, 3, 4).to_bits(), 0x0102_0304);
    }

    #[test]
    fn test_round_trip_all_bytes_per_lane() {
        for v in 0..=255u8 {
            assert_eq!(unpack(pack(v, 0, 0, 0)), [v, 0, 0, 0]);
            assert_eq!(unpack(pack(0, v, 0, 0)), [0, v, 0, 0]);
            assert_eq!(unpack(pack(0, 0, v, 0)), [0, 0, v, 0]);
            assert_eq!(unpack(pack(0, 0, 0, v)), [0, 0, 0, v]);
        }
    }

    #[test]
    fn test_round_trip_grid() {
        // Covers the NaN and infinity patterns (high byte 0x7F/0xFF).
        let samples = [0u8, 1, 64, 127, 128, 200, 254, 255];
        for &a in &samples {
            for &b in &samples {
                for &c in &samples {
                    for &d in &samples {
                        assert_eq!(unpack(pack(a, b, c, d)), [a, b, c, d]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_round_trip_through_vec() {
        // Packed values survive being stored in and copied out of a channel.
        let values: Vec<f32> = (0..=255u8).map(|v| pack(255, v, v, 255 - v)).collect();
        let copied = values.clone();
        for (v, packed) in (0..=255u8).zip(copied) {
            assert_eq!(unpack(packed), [255, v, v, 255 - v]);
        }
    }

    #[test]
    fn test_pack_floored() {
        assert_eq!(unpack(pack_floored(12.9, 0.2, 254.99, 255.0)), [12, 0, 254, 255]);
    }

    #[test]
    fn test_unpack_wgsl_valid() {
        let module = naga::front::wgsl::parse_str(UNPACK_WGSL).expect("parse");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).expect("UNPACK_WGSL should validate");
    }
}
