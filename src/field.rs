//! Batched finite field arithmetic over `p = 2^255 - 19`.
//!
//! This is the radix-2^29 counterpart of the crate's field arithmetic: the
//! same prime as Curve25519/Ed25519, but laid out as nine 29-bit limbs
//! (9 x 29 = 261 bits of headroom) instead of the usual 10 alternating
//! 25/26-bit limbs, and with every limb carrying four independent users'
//! values side by side in a [`V`].
//!
//! ## Representation
//!
//! Arithmetic is carried out modulo the auxiliary prime
//! `p* = 64 * (2^255 - 19) = 2^261 - 1216`, not `p` itself: 9 x 29 = 261
//! bits divides evenly, whereas `p`'s 255 bits do not, which would leave a
//! fractional top limb. The wraparound constant `CONSTC = 1216` is what
//! every carry-fold step uses to bring a value that spilled past bit 261
//! back down into limb 0 (`2^261 ≡ 1216 (mod p*)`). The boundary between
//! `p*`-arithmetic and canonical `mod p` values is crossed exactly once, in
//! [`Field::final_reduce`].
//!
//! Limb classes, matching the invariants each operation below documents:
//! - *reduced*: every limb `<= 2^29 - 1`; value in `[0, 2p*)`.
//! - *loose*: every limb `<= 2^30`; produced by [`Field::add`] only.
//! - *canonical*: reduced, and value in `[0, p)`; only meaningful after
//!   [`Field::final_reduce`].
//!
//! [`Field::mul`], [`Field::square`] and [`Field::mul29`] all require
//! reduced operands (see the overflow analysis on [`Field::mul`]); a loose
//! value must be passed through [`Field::reduce`] first. [`Field::sub`]
//! accepts a loose or reduced left-hand side, but its right-hand side must
//! be reduced, and always returns reduced.

use crate::vector::V;
use std::array;
use std::ops::{Add, Mul, Neg, Sub};

const MASK29: u64 = (1u64 << 29) - 1;
const CONSTC: u64 = 1216;
/// Low limb of `p* = 2^261 - 1216`: `2^29 - 1216`.
const LSWP: u64 = (1u64 << 29) - CONSTC;
/// Every limb of `p*` above the low one is the all-ones 29-bit limb.
const M29: u64 = MASK29;

/// A field element modulo `p = 2^255 - 19`, held as 9 limbs of radix `2^29`,
/// batched four-wide: lane `j` of limb `i` is the i-th limb of the j-th
/// user's element.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Field(pub(crate) [V; 9]);

impl Field {
    pub(crate) const ZERO: Field = Field([V::ZERO; 9]);

    pub(crate) const ONE: Field = {
        let mut limbs = [V::ZERO; 9];
        limbs[0] = V([1, 1, 1, 1]);
        Field(limbs)
    };

    /// Builds a field element with the same value `c` (< 2^29) in every
    /// lane, used for small curve constants.
    pub(crate) fn broadcast_small(c: u64) -> Field {
        let mut limbs = [V::ZERO; 9];
        limbs[0] = V::broadcast(c);
        Field(limbs)
    }

    /// Propagates carries forward through all nine limbs and folds the
    /// overflow off the top limb back into limb 0 via `CONSTC`, then lets
    /// that one more ripple into limb 1. This is the carry discipline
    /// shared by [`Field::sub`], [`Field::mul`], [`Field::mul29`] and
    /// [`Field::square`]; every one of them ends by calling this on its
    /// raw per-limb sums.
    ///
    /// A single forward sweep like this one only normalises columns that
    /// are already within a few bits of `2^29` (the `shr(29)`/`mul32` here
    /// assume a carry that fits 32 bits). `mul`/`square` run their own
    /// [`Field::carry_propagate_raw17`] pass first to bring their much
    /// wider 17-column product scan down to that range before ever handing
    /// it to this function.
    fn carry_reduce(limbs: &mut [V; 9]) {
        for i in 0..8 {
            let carry = limbs[i].shr(29);
            limbs[i] = limbs[i].and(V::broadcast(MASK29));
            limbs[i + 1] = limbs[i + 1].add(carry);
        }
        let top = limbs[8].shr(29);
        limbs[8] = limbs[8].and(V::broadcast(MASK29));
        limbs[0] = limbs[0].add(top.mul32(V::broadcast(CONSTC)));

        let carry0 = limbs[0].shr(29);
        limbs[0] = limbs[0].and(V::broadcast(MASK29));
        limbs[1] = limbs[1].add(carry0);
    }

    /// §4.2.1 Add. Per-limb addition, no reduction. Loose output: every
    /// limb `<= 2^30` given reduced (`<= 2^29-1`) inputs.
    pub(crate) fn add(self, rhs: Field) -> Field {
        Field(array::from_fn(|i| self.0[i].add(rhs.0[i])))
    }

    /// §4.2.2/§4.2.3 Sub. Computes `2p* + a - b` limb-wise (non-negative
    /// since `a, b < 2p*`) and carries/folds the result, so this single
    /// method realizes both the non-reducing subtraction and the
    /// subsequent carry sweep §4.2.2/§4.2.3 describe as two steps. `self`
    /// may be loose or reduced; `rhs` must be reduced (`<= 2^29-1` per
    /// limb) — the `2*LSWP` padding on limb 0 only covers a reduced `rhs`,
    /// so a loose `rhs` with a large limb 0 can underflow the per-limb
    /// subtraction. Always returns reduced.
    pub(crate) fn sub(self, rhs: Field) -> Field {
        let mut limbs: [V; 9] = array::from_fn(|i| {
            let p_star_i = if i == 0 { LSWP } else { M29 };
            self.0[i].add(V::broadcast(2 * p_star_i)).sub(rhs.0[i])
        });
        Self::carry_reduce(&mut limbs);
        Field(limbs)
    }

    /// Reduces a loose value (limbs `<= 2^30`) down to the reduced class
    /// required by [`Field::mul`]/[`Field::square`]/[`Field::mul29`].
    /// Implemented as `self - 0`, reusing the sub carry chain.
    pub(crate) fn reduce(self) -> Field {
        self.sub(Field::ZERO)
    }

    /// Inter-half carry propagation for a 17-column product scan (§4.2.4):
    /// a fresh column can hold up to 9 summands of two reduced (`<=
    /// 2^29-1`) limbs, i.e. up to ~2^61 — far past what `mul32`'s 32-bit
    /// operand can hold without truncation. This ripples every column's
    /// overflow into the next, left to right, so columns 0..15 end up
    /// `<= 2^29-1` and the overflow that would otherwise need an 18th
    /// column (there is no `raw[17]`) is peeled off column 16 and returned
    /// separately, since it folds via `CONSTC` into limb 8 rather than
    /// limbs 0..7 (see `mul`/`square`).
    fn carry_propagate_raw17(raw: &mut [V; 17]) -> V {
        for i in 0..16 {
            let carry = raw[i].shr(29);
            raw[i] = raw[i].and(V::broadcast(MASK29));
            raw[i + 1] = raw[i + 1].add(carry);
        }
        let top_carry = raw[16].shr(29);
        raw[16] = raw[16].and(V::broadcast(MASK29));
        top_carry
    }

    /// Folds a carry-propagated 17-column product scan down to 9 limbs:
    /// columns 9..16 fold into limbs 0..7 via `CONSTC` (since
    /// `2^(29*9) = 2^261 ≡ 1216 (mod p*)`), and the column-16 overflow
    /// peeled off by [`Field::carry_propagate_raw17`] folds into limb 8 the
    /// same way (it represents the coefficient of `2^(29*17) = p* *
    /// 2^(29*8) + 1216 * 2^(29*8)`). Every term here is now `<= 2^29-1`,
    /// so the `CONSTC` multiply is a true 32x32 product, not a truncation.
    fn fold_high_half(raw: &[V; 17], top_carry: V) -> [V; 9] {
        let mut limbs: [V; 9] = array::from_fn(|i| raw[i]);
        let c = V::broadcast(CONSTC);
        for i in 0..8 {
            limbs[i] = limbs[i].add(raw[i + 9].mul32(c));
        }
        limbs[8] = limbs[8].add(top_carry.mul32(c));
        limbs
    }

    /// §4.2.4 Multiply.
    ///
    /// Product-scans the two 9-limb operands into 17 raw columns, carry-
    /// propagates between the two halves so every column fits a 32-bit
    /// multiply, folds the high half into the low one via `CONSTC`, then
    /// carry-reduces.
    ///
    /// Overflow analysis: each column accumulates at most 9 products of two
    /// reduced (`<= 2^29-1`) limbs, each product `< 2^58`; nine such
    /// summands comfortably fit a 64-bit lane, which is why the inter-half
    /// carry propagation can run directly over the raw columns. This is
    /// also why `mul` requires reduced inputs — a loose (`2^30`) operand
    /// would let a column overflow 64 bits before the carry pass ever runs.
    pub(crate) fn mul(self, rhs: Field) -> Field {
        let mut raw = [V::ZERO; 17];
        for i in 0..9 {
            for j in 0..9 {
                raw[i + j] = raw[i + j].add(self.0[i].mul32(rhs.0[j]));
            }
        }

        let top_carry = Self::carry_propagate_raw17(&mut raw);
        let mut limbs = Self::fold_high_half(&raw, top_carry);
        Self::carry_reduce(&mut limbs);
        Field(limbs)
    }

    /// §4.2.6 Square. Same column-scan shape as [`Field::mul`], but visits
    /// each unordered limb pair once and doubles the off-diagonal products
    /// instead of computing every ordered pair — numerically identical to
    /// `self.mul(self)`, with roughly half the 32x32 multiplies.
    pub(crate) fn square(self) -> Field {
        let mut raw = [V::ZERO; 17];
        for i in 0..9 {
            raw[2 * i] = raw[2 * i].add(self.0[i].mul32(self.0[i]));
            for j in (i + 1)..9 {
                let cross = self.0[i].mul32(self.0[j]);
                raw[i + j] = raw[i + j].add(cross.add(cross));
            }
        }

        let top_carry = Self::carry_propagate_raw17(&mut raw);
        let mut limbs = Self::fold_high_half(&raw, top_carry);
        Self::carry_reduce(&mut limbs);
        Field(limbs)
    }

    /// §4.2.5 Small-scalar multiply. Multiplies every limb by the 29-bit
    /// constant `c` and carry-reduces. Used for the ladder step's
    /// `(A-2)/4` factor and doubling's factor of 2.
    pub(crate) fn mul29(self, c: u32) -> Field {
        let cv = V::broadcast(c as u64);
        let mut limbs: [V; 9] = array::from_fn(|i| self.0[i].mul32(cv));
        Self::carry_reduce(&mut limbs);
        Field(limbs)
    }

    /// §4.2.7 Inversion via the fixed Curve25519 addition chain:
    /// `self^(p-2) = self^(2^255 - 21)`, built from squarings and 11
    /// multiplies (`2^250 - 1`, then eleven more doublings and one more
    /// multiply to reach `2^255 - 21 = (2^250-1)*32 + 11`). Any correct
    /// chain of similar length would do; this one follows the canonical
    /// Curve25519 layout (blocks of 5, 10, 20, 10, 50, 100, 50, 5
    /// doublings with a multiply after each block).
    pub(crate) fn invert(self) -> Field {
        let mut t0 = self.square();
        let mut t1 = t0.n_square(2);

        t1 = self.mul(t1);
        t0 = t0.mul(t1);

        let mut t2 = t0.square();
        t1 = t1.mul(t2);

        t2 = t1.n_square(5);
        t1 = t2.mul(t1);

        t2 = t1.n_square(10);
        t2 = t2.mul(t1);

        let mut t3 = t2.n_square(20);
        t2 = t3.mul(t2);

        t2 = t2.n_square(10);
        t1 = t2.mul(t1);

        t2 = t1.n_square(50);
        t2 = t2.mul(t1);

        t3 = t2.n_square(100);
        t2 = t3.mul(t2);

        t2 = t2.n_square(50);
        t1 = t2.mul(t1);

        t1 = t1.n_square(5);

        t1.mul(t0)
    }

    /// Repeated squaring, `self^(2^n)`.
    pub(crate) fn n_square(self, n: usize) -> Field {
        (0..n).fold(self, |acc, _| acc.square())
    }

    /// `self^((p-5)/8) = self^(2^252 - 3)`, the addition chain the twisted
    /// Edwards point-decompression square root needs (used only by
    /// `table.rs` to derive the base point and the `sqrt(-1)` constant at
    /// startup — not part of the per-handshake hot path). Same addition
    /// chain shape as `invert`, one multiply shorter at the end.
    pub(crate) fn pow_p58(self) -> Field {
        let z = self;
        let t0 = z.square();
        let mut t1 = t0.n_square(2);
        t1 = z.mul(t1);
        let mut t0b = t0.mul(t1);
        t0b = t0b.square();
        t0b = t1.mul(t0b);
        t1 = t0b.n_square(5);
        t0b = t1.mul(t0b);
        t1 = t0b.n_square(10);
        t1 = t1.mul(t0b);
        let mut t2 = t1.n_square(20);
        t1 = t2.mul(t1);
        t1 = t1.n_square(10);
        t0b = t1.mul(t0b);
        t1 = t0b.n_square(50);
        t1 = t1.mul(t0b);
        t2 = t1.n_square(100);
        t1 = t2.mul(t1);
        t1 = t1.n_square(50);
        t0b = t1.mul(t0b);
        t0b = t0b.n_square(2);
        t0b.mul(z)
    }

    /// §4.2.8 Conditional swap. `flag` must hold `0` or `1` in every lane
    /// (independently per lane — each batched user's swap decision is its
    /// own). Branch-free: builds an all-ones/all-zero mask per lane and
    /// XOR-conditionally exchanges every limb.
    pub(crate) fn cswap(a: &mut Field, b: &mut Field, flag: V) {
        let mask = flag.mask_from_bit();
        for i in 0..9 {
            let x = a.0[i].xor(b.0[i]).and(mask);
            a.0[i] = a.0[i].xor(x);
            b.0[i] = b.0[i].xor(x);
        }
    }

    /// Constant-time conditional move: replaces `self` with `src` in lanes
    /// where `flag` is `1`, leaves it unchanged where `flag` is `0`.
    pub(crate) fn cmov(&mut self, src: &Field, flag: V) {
        let mask = flag.mask_from_bit();
        for i in 0..9 {
            let x = self.0[i].xor(src.0[i]).and(mask);
            self.0[i] = self.0[i].xor(x);
        }
    }

    /// §4.5 Final canonical reduction: folds `p* = 64p + CONSTC/19...`-scale
    /// wraparound down to `mod (2^255 - 19)` using the identity
    /// `2^255 ≡ 19 (mod p)`. Two passes of "fold bits >= 23 of limb 8,
    /// scaled by 19, back into limb 0" suffice
    /// (the first pass can push at most one further bit above position 23
    /// in limb 8). Leaves a value in `[0, p + eps)`, top limb `<= 2^23-1`.
    ///
    /// This alone is **not** a bit-exact RFC 7748 encoding; callers that
    /// serialize to bytes must additionally apply [`Field::subtract_p_if_ge`].
    pub(crate) fn final_reduce(self) -> Field {
        let mut limbs = self.0;
        for _ in 0..2 {
            let top = limbs[8].shr(23);
            limbs[8] = limbs[8].and(V::broadcast((1u64 << 23) - 1));
            limbs[0] = limbs[0].add(top.mul32(V::broadcast(19)));
            for i in 0..8 {
                let carry = limbs[i].shr(29);
                limbs[i] = limbs[i].and(V::broadcast(MASK29));
                limbs[i + 1] = limbs[i + 1].add(carry);
            }
        }
        Field(limbs)
    }

    /// The constant-time conditional subtraction a strictly canonical byte
    /// encoding requires: after [`Field::final_reduce`] the value can still sit in
    /// `[p, p + eps)`, which round-trips fine through further field
    /// arithmetic but is not a canonical RFC 7748 byte string. Subtracts
    /// `p` once, conditionally, based on whether the value is `>= p`.
    pub(crate) fn subtract_p_if_ge(self) -> Field {
        // p = 2^255 - 19, as 9 limbs of 29 bits: limb0 = 2^29-19, limbs
        // 1..8 = 2^29-1, except the top limb only carries 23 bits
        // (8*29 + 23 = 255), so p's limb8 = 2^23-1.
        let mut p_limbs = [V::broadcast(MASK29); 9];
        p_limbs[0] = V::broadcast((1u64 << 29) - 19);
        p_limbs[8] = V::broadcast((1u64 << 23) - 1);

        // Borrow-propagating subtraction self - p. A borrow out of the top
        // limb means self < p; its absence means self >= p.
        let mut borrow = V::ZERO;
        let mut diff = [V::ZERO; 9];
        for i in 0..9 {
            let width_mask = if i == 8 { (1u64 << 23) - 1 } else { MASK29 };
            let raw = self.0[i].sub(p_limbs[i]).sub(borrow);
            borrow = raw.shr(63);
            diff[i] = raw.and(V::broadcast(width_mask));
        }
        let is_ge = V::broadcast(1).sub(borrow);

        let mut out = self;
        out.cmov(&Field(diff), is_ge);
        out
    }
}

impl Add for Field {
    type Output = Field;
    fn add(self, rhs: Field) -> Field {
        Field::add(self, rhs)
    }
}

impl Sub for Field {
    type Output = Field;
    fn sub(self, rhs: Field) -> Field {
        Field::sub(self, rhs)
    }
}

impl Mul for Field {
    type Output = Field;
    fn mul(self, rhs: Field) -> Field {
        Field::mul(self, rhs)
    }
}

impl Neg for Field {
    type Output = Field;
    fn neg(self) -> Field {
        Field::ZERO.sub(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{bytes_to_limbs, limbs_to_bytes};

    fn field_from_u64(lanes: [u64; 4]) -> Field {
        let per_lane: [[u8; 32]; 4] = array::from_fn(|i| {
            let mut b = [0u8; 32];
            b[..8].copy_from_slice(&lanes[i].to_le_bytes());
            b
        });
        let limbs: [[u64; 9]; 4] = array::from_fn(|i| bytes_to_limbs(&per_lane[i]));
        Field(array::from_fn(|limb| {
            V::from_lanes(array::from_fn(|lane| limbs[lane][limb]))
        }))
    }

    fn field_to_u64_lane0(f: Field) -> u64 {
        let canon = f.final_reduce().subtract_p_if_ge();
        let limbs: [u64; 9] = array::from_fn(|i| canon.0[i].lane(0));
        let bytes = limbs_to_bytes(&limbs);
        u64::from_le_bytes(bytes[..8].try_into().unwrap())
    }

    #[test]
    fn add_then_reduce_roundtrips_small_values() {
        let a = field_from_u64([1, 2, 3, 4]);
        let b = field_from_u64([10, 20, 30, 40]);
        let sum = a.add(b).reduce();
        assert_eq!(field_to_u64_lane0(sum), 11);
    }

    #[test]
    fn mul_matches_scalar_multiplication_for_small_values() {
        let a = field_from_u64([6, 0, 0, 0]);
        let b = field_from_u64([7, 0, 0, 0]);
        assert_eq!(field_to_u64_lane0(a.mul(b)), 42);
    }

    #[test]
    fn square_matches_mul_with_self() {
        let a = field_from_u64([123, 0, 0, 0]);
        assert_eq!(field_to_u64_lane0(a.square()), field_to_u64_lane0(a.mul(a)));
    }

    #[test]
    fn invert_is_multiplicative_inverse() {
        let a = field_from_u64([5, 0, 0, 0]);
        let inv = a.invert();
        let one = a.mul(inv).final_reduce().subtract_p_if_ge();
        assert_eq!(field_to_u64_lane0(one), 1);
    }

    #[test]
    fn cswap_flag_zero_is_identity_flag_one_is_swap() {
        let mut a = field_from_u64([1, 1, 1, 1]);
        let mut b = field_from_u64([2, 2, 2, 2]);
        Field::cswap(&mut a, &mut b, V::ZERO);
        assert_eq!(field_to_u64_lane0(a), 1);
        assert_eq!(field_to_u64_lane0(b), 2);

        Field::cswap(&mut a, &mut b, V::broadcast(1));
        assert_eq!(field_to_u64_lane0(a), 2);
        assert_eq!(field_to_u64_lane0(b), 1);

        // cswap is its own inverse: swapping the same pair again with the
        // same true flag restores the original values.
        Field::cswap(&mut a, &mut b, V::broadcast(1));
        assert_eq!(field_to_u64_lane0(a), 1);
        assert_eq!(field_to_u64_lane0(b), 2);
    }
}
