//! §4.6 Serialization: conversion between the external 32-byte little-endian
//! wire format (RFC 7748 u-coordinates and scalars) and the internal 9-limb
//! radix-2^29 representation, plus scalar clamping.
//!
//! An alternating 25/26-bit radix would need a hand-written table of
//! per-limb bit offsets to pack/unpack bytes. This crate's uniform 29-bit
//! radix has no such irregularity, so packing is expressed as a single
//! per-bit extraction loop instead of a table.

/// Unpacks a 32-byte little-endian integer into nine 29-bit limbs
/// (261 bits of capacity, comfortably covering the 255-bit input), by
/// reading each limb's bit window directly out of the byte array. The loop
/// bounds are compile-time constants, not data, so this has no
/// data-dependent control flow despite the per-bit loop.
pub(crate) fn bytes_to_limbs(bytes: &[u8; 32]) -> [u64; 9] {
    let mut limbs = [0u64; 9];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let base = i * 29;
        let mut acc = 0u64;
        for b in 0..29 {
            let bit_pos = base + b;
            if bit_pos >= 256 {
                break;
            }
            let bit = (bytes[bit_pos / 8] >> (bit_pos % 8)) & 1;
            acc |= (bit as u64) << b;
        }
        *limb = acc;
    }
    limbs
}

/// Packs nine 29-bit limbs back into a 32-byte little-endian buffer.
/// Callers that need a canonical RFC 7748 encoding must pass limbs that
/// have already been through `Field::final_reduce` and
/// `Field::subtract_p_if_ge`; this function itself performs no reduction,
/// it only repacks the bits it is given.
pub(crate) fn limbs_to_bytes(limbs: &[u64; 9]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, &limb) in limbs.iter().enumerate() {
        let base = i * 29;
        for b in 0..29 {
            let bit_pos = base + b;
            if bit_pos >= 256 {
                break;
            }
            let bit = (limb >> b) & 1;
            out[bit_pos / 8] |= (bit as u8) << (bit_pos % 8);
        }
    }
    out
}

/// §4.6 scalar clamping: clears the low 3 bits of byte 0, clears the top
/// bit and sets bit 254 of byte 31 (`e[0] &= 248; e[31] &= 127; e[31] |= 64`).
pub(crate) fn clamp_scalar(scalar: &mut [u8; 32]) {
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_arbitrary_255_bit_value() {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }
        bytes[31] &= 0x7F; // keep it under 2^255 so the round trip is exact
        let limbs = bytes_to_limbs(&bytes);
        assert_eq!(limbs_to_bytes(&limbs), bytes);
    }

    #[test]
    fn zero_roundtrips() {
        let bytes = [0u8; 32];
        let limbs = bytes_to_limbs(&bytes);
        assert_eq!(limbs, [0u64; 9]);
        assert_eq!(limbs_to_bytes(&limbs), bytes);
    }

    #[test]
    fn clamp_sets_and_clears_expected_bits() {
        let mut s = [0xFFu8; 32];
        clamp_scalar(&mut s);
        assert_eq!(s[0] & 0b0000_0111, 0);
        assert_eq!(s[31] & 0x80, 0);
        assert_eq!(s[31] & 0x40, 0x40);
    }
}
