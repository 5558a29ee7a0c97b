//! §4.3 Montgomery-curve variable-base scalar multiplication.
//!
//! Implements the RFC 7748 differential addition-doubling ladder over
//! Curve25519 (`v^2 = u^3 + 486662u^2 + u`), operating on projective
//! `(X:Z)` points so the curve's `v`-coordinate is never needed. This is
//! the core of `sharedsecret`: one call per key agreement, scalar is the
//! caller's private key, `u1` is the peer's public u-coordinate (or the
//! fixed base `u = 9` for `keygen`, though `keygen` is actually driven by
//! the Edwards fixed-base path in `edwards.rs` for constant-time speed —
//! see module docs there).
//!
//! The doubling step below uses the `BB + 121666*E` form (see
//! `DESIGN.md` for why that's algebraically identical to the RFC
//! pseudocode's `BB + a24*E` with `a24 = 121665` applied to `AA` instead).

use crate::field::Field;
use crate::vector::V;

/// One step of the Montgomery ladder: given the fixed base `x1`, the
/// running pair `(x2, z2)` = `n*P` and `(x3, z3)` = `(n+1)*P`, and the
/// current scalar bit, produces the next pair. `swap` must be the
/// cumulative XOR of the current and previous bit, per RFC 7748 §5's
/// "swap ^= k_t" construction — this is what keeps the cswap pattern
/// itself data-independent while still conditioning on the bit stream.
struct LadderState {
    x2: Field,
    z2: Field,
    x3: Field,
    z3: Field,
}

impl LadderState {
    fn start(x1: Field) -> LadderState {
        LadderState {
            x2: Field::ONE,
            z2: Field::ZERO,
            x3: x1,
            z3: Field::ONE,
        }
    }

    fn step(&mut self, x1: Field, swap: V) {
        Field::cswap(&mut self.x2, &mut self.x3, swap);
        Field::cswap(&mut self.z2, &mut self.z3, swap);

        let a = self.x2.add(self.z2).reduce();
        let aa = a.square();
        let b = self.x2.sub(self.z2);
        let bb = b.square();
        let e = aa.sub(bb);
        let c = self.x3.add(self.z3).reduce();
        let d = self.x3.sub(self.z3);
        let da = d.mul(a);
        let cb = c.mul(b);

        self.x3 = da.add(cb).reduce().square();
        self.z3 = x1.mul(da.sub(cb).square());
        self.x2 = aa.mul(bb);
        self.z2 = e.mul(bb.add(e.mul29(121666)).reduce());
    }
}

/// Runs the full 255-step ladder (bits 254 down to 0 of a clamped scalar;
/// bit 255 is always 0 after clamping and bits above that are ignored).
/// `scalar_bit(t)` must return a 0/1 [`V`] giving bit `t` of each lane's
/// scalar, independently per lane.
pub(crate) fn ladder(x1: Field, scalar_bit: impl Fn(usize) -> V) -> (Field, Field) {
    let mut state = LadderState::start(x1);
    let mut swap = V::ZERO;

    for t in (0..255).rev() {
        let bit = scalar_bit(t);
        let swap_now = swap.xor(bit);
        state.step(x1, swap_now);
        swap = bit;
    }
    Field::cswap(&mut state.x2, &mut state.x3, swap);
    Field::cswap(&mut state.z2, &mut state.z3, swap);

    (state.x2, state.z2)
}

/// §4.3.2: recovers the affine u-coordinate `x2 * z2^-1` from the ladder's
/// projective output.
pub(crate) fn to_affine(x2: Field, z2: Field) -> Field {
    x2.mul(z2.invert())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::bytes_to_limbs;
    use std::array;

    fn field_from_bytes_all_lanes(bytes: [u8; 32]) -> Field {
        let limbs = bytes_to_limbs(&bytes);
        Field(array::from_fn(|i| V::broadcast(limbs[i])))
    }

    fn bit_of(scalar: &[u8; 32], t: usize) -> u8 {
        (scalar[t / 8] >> (t % 8)) & 1
    }

    /// The Montgomery ladder run against the fixed base `u = 9` must agree
    /// with the Edwards fixed-base path (`edwards::scalarmult_base` +
    /// `edwards::to_montgomery_u`) for the same scalar: both are supposed
    /// to compute `scalar * B`, just via two different curve models. This
    /// cross-checks both modules against each other without depending on
    /// a memorized external test vector.
    #[test]
    fn ladder_on_base_point_matches_edwards_fixed_base_path() {
        let mut scalar: [u8; 32] = [0u8; 32];
        for (i, b) in scalar.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(41).wrapping_add(5);
        }
        crate::serialize::clamp_scalar(&mut scalar);

        let mut u9 = [0u8; 32];
        u9[0] = 9;
        let x1 = field_from_bytes_all_lanes(u9);
        let (x2, z2) = ladder(x1, |t| V::broadcast(bit_of(&scalar, t) as u64));
        let ladder_out = to_affine(x2, z2).final_reduce().subtract_p_if_ge();
        let ladder_bytes =
            crate::serialize::limbs_to_bytes(&array::from_fn(|i| ladder_out.0[i].lane(0)));

        let point = crate::edwards::scalarmult_base(&[scalar; 4], crate::table::groups());
        let u = crate::edwards::to_montgomery_u(&point)
            .final_reduce()
            .subtract_p_if_ge();
        let edwards_bytes = crate::serialize::limbs_to_bytes(&array::from_fn(|i| u.0[i].lane(0)));

        assert_eq!(ladder_bytes, edwards_bytes);
    }
}
