//! §4.1/§4.6/§5 Public ECDH façade: batch-4 X25519 key generation and
//! shared-secret computation, per RFC 7748.
//!
//! Every operation here is total (§4.7 of spec.md / §7 of SPEC_FULL.md):
//! any 32-byte buffer is a valid scalar or u-coordinate input, so these
//! functions return plain arrays rather than threading a `Result`
//! through code that can't actually fail.
//!
//! `keygen` takes the fixed-base Edwards path (`edwards.rs`/`table.rs`)
//! for speed; `sharedsecret` takes the variable-base Montgomery ladder
//! (`montgomery.rs`), since the peer's public key isn't the fixed base
//! point. Both converge on the same external u-coordinate representation.

use crate::edwards;
use crate::field::Field;
use crate::montgomery;
use crate::serialize::{self, bytes_to_limbs, limbs_to_bytes};
use crate::table;
use crate::vector::V;
use std::array;

fn field_from_lane_bytes(bytes: &[[u8; 32]; 4]) -> Field {
    let limbs: [[u64; 9]; 4] = array::from_fn(|lane| bytes_to_limbs(&bytes[lane]));
    Field(array::from_fn(|i| {
        V::from_lanes(array::from_fn(|lane| limbs[lane][i]))
    }))
}

fn field_to_lane_bytes(f: Field) -> [[u8; 32]; 4] {
    let canon = f.final_reduce().subtract_p_if_ge();
    array::from_fn(|lane| limbs_to_bytes(&array::from_fn(|i| canon.0[i].lane(lane))))
}

fn scalar_bit(scalars: &[[u8; 32]; 4], t: usize) -> V {
    V::from_lanes(array::from_fn(|lane| {
        ((scalars[lane][t / 8] >> (t % 8)) & 1) as u64
    }))
}

/// §4.6 Key generation: derives four independent public keys from four
/// independent 32-byte private scalars in one batched pass.
///
/// Each `sk_in[i]` is clamped per RFC 7748 §5 before use; the input
/// buffers themselves are not modified.
pub fn keygen(sk_in: &[[u8; 32]; 4]) -> [[u8; 32]; 4] {
    let mut clamped = *sk_in;
    for s in clamped.iter_mut() {
        serialize::clamp_scalar(s);
    }

    let point = edwards::scalarmult_base(&clamped, table::groups());
    let u = edwards::to_montgomery_u(&point);
    field_to_lane_bytes(u)
}

/// §4.6 Shared-secret computation: `sk_in[i] * pk_peer[i]` for each of
/// the four lanes, batched through a single Montgomery ladder pass.
///
/// Per RFC 7748 §5, `pk_peer`'s most significant bit is masked off before
/// use (u-coordinates are only 255 bits wide) and `sk_in` is clamped the
/// same way `keygen` clamps it.
pub fn sharedsecret(sk_in: &[[u8; 32]; 4], pk_peer: &[[u8; 32]; 4]) -> [[u8; 32]; 4] {
    let mut clamped = *sk_in;
    for s in clamped.iter_mut() {
        serialize::clamp_scalar(s);
    }

    let mut masked = *pk_peer;
    for u in masked.iter_mut() {
        u[31] &= 0x7F;
    }

    let x1 = field_from_lane_bytes(&masked);
    let (x2, z2) = montgomery::ladder(x1, |t| scalar_bit(&clamped, t));
    let u_out = montgomery::to_affine(x2, z2);
    field_to_lane_bytes(u_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_secret_agrees_both_directions() {
        let mut alice_sk = [[0u8; 32]; 4];
        let mut bob_sk = [[0u8; 32]; 4];
        for lane in 0..4 {
            for i in 0..32 {
                alice_sk[lane][i] = (i as u8).wrapping_mul(7).wrapping_add(lane as u8 * 13 + 1);
                bob_sk[lane][i] = (i as u8).wrapping_mul(11).wrapping_add(lane as u8 * 17 + 2);
            }
        }

        let alice_pk = keygen(&alice_sk);
        let bob_pk = keygen(&bob_sk);

        let shared_a = sharedsecret(&alice_sk, &bob_pk);
        let shared_b = sharedsecret(&bob_sk, &alice_pk);
        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn batched_lanes_match_independent_single_lane_runs() {
        let mut sk = [[0u8; 32]; 4];
        let mut pk_peer = [[0u8; 32]; 4];
        for lane in 0..4 {
            for i in 0..32 {
                sk[lane][i] = (i as u8).wrapping_mul(19 + lane as u8).wrapping_add(3);
                pk_peer[lane][i] = (i as u8).wrapping_mul(23 + lane as u8).wrapping_add(5);
            }
        }

        let batched = sharedsecret(&sk, &pk_peer);

        for lane in 0..4 {
            let sk4 = [sk[lane]; 4];
            let pk4 = [pk_peer[lane]; 4];
            let single = sharedsecret(&sk4, &pk4);
            assert_eq!(batched[lane], single[0]);
        }
    }
}
