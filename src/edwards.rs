//! §4.4 Twisted-Edwards fixed-base scalar multiplication.
//!
//! `keygen` needs `scalar * B` for the fixed base point `B`, which is much
//! faster done on the birationally-equivalent twisted Edwards curve
//! `-x^2 + y^2 = 1 + d*x^2*y^2` (the Ed25519 curve) with a precomputed
//! multiple-of-B table than it is with the Montgomery ladder in
//! `montgomery.rs`. The point is mapped back to a Montgomery u-coordinate
//! at the end (§4.4.6) so the public API never exposes Edwards
//! coordinates.
//!
//! Coordinate systems and formulas here are the standard Ed25519 ones
//! (Hisil/Wong/Carter/Dawson extended coordinates, dbl-2008-hwcd
//! doubling, add-2008-hwcd-3 addition), batched across the four lanes the
//! same way `field.rs` batches field elements.
//!
//! ## Extended coordinates without an extra multiply
//!
//! A point is `(x, y)` = `(X/Z, Y/Z)` with `T/Z = XY/Z^2`, i.e. `T = XY/Z`.
//! Rather than carry `T` as a fourth field directly, [`ExtPoint`] stores
//! the two pre-multiply factors `e, h` coming out of the previous
//! [`Completed`] -> [`ExtPoint`] conversion (where `e, h` are the
//! conversion's own `x1, y1` intermediates) such that `e * h` equals `T`
//! exactly — no extra multiply is spent producing them, since the
//! conversion already computes `e` and `h` on the way to `X` and `Y`.
//! `T` itself is materialized with one multiply, lazily, only where a
//! subsequent formula actually needs it (`ExtPoint::t`).

use crate::field::Field;
use crate::vector::V;

/// A point on the twisted Edwards curve in extended projective
/// coordinates: affine `(x, y) = (x/z, y/z)`, with `e * h` equal to the
/// extended coordinate `t = x*y/z` (see module docs).
#[derive(Clone, Copy)]
pub(crate) struct ExtPoint {
    pub(crate) x: Field,
    pub(crate) y: Field,
    pub(crate) z: Field,
    pub(crate) e: Field,
    pub(crate) h: Field,
}

impl ExtPoint {
    pub(crate) const IDENTITY: ExtPoint = ExtPoint {
        x: Field::ZERO,
        y: Field::ONE,
        z: Field::ONE,
        e: Field::ZERO,
        h: Field::ONE,
    };

    /// Materializes `t = x*y/z` with one multiply.
    pub(crate) fn t(&self) -> Field {
        self.e.mul(self.h)
    }
}

/// The "P1P1" formula intermediate: four field values that collapse to a
/// full [`ExtPoint`] (or a plain projective `x, y, z`) via one multiply
/// per coordinate, the fourth (`e, h`) falling out for free.
pub(crate) struct Completed {
    x: Field,
    y: Field,
    z: Field,
    t: Field,
}

impl Completed {
    pub(crate) fn to_ext(&self) -> ExtPoint {
        ExtPoint {
            x: self.x.mul(self.t),
            y: self.y.mul(self.z),
            z: self.z.mul(self.t),
            e: self.x,
            h: self.y,
        }
    }

    /// Projective `(x, y, z)` only, when the caller has no further use for
    /// the extended `t` coordinate (e.g. the final doubling round in
    /// `scalarmult_base` before the last conversion to [`ExtPoint`]).
    pub(crate) fn to_proj(&self) -> (Field, Field, Field) {
        (self.x.mul(self.t), self.y.mul(self.z), self.z.mul(self.t))
    }
}

/// A cached point, `(Y+X, Y-X, Z, 2d*T)`, for use as the second operand of
/// general point addition. Ported from `ge_p3_to_cached`/`ge_add`.
pub(crate) struct CachedPoint {
    yplusx: Field,
    yminusx: Field,
    z: Field,
    t2d: Field,
}

impl CachedPoint {
    pub(crate) fn from_ext(p: &ExtPoint, d2: Field) -> CachedPoint {
        CachedPoint {
            yplusx: p.y.add(p.x).reduce(),
            yminusx: p.y.sub(p.x),
            z: p.z,
            t2d: p.t().mul(d2),
        }
    }
}

/// An affine precomputed table entry, `(Y+X, Y-X, 2d*X*Y)` with `Z = 1`
/// implied. Ported from `GePrecomp`/`ge_madd`/`ge_msub`.
#[derive(Clone, Copy)]
pub(crate) struct DuifPoint {
    pub(crate) yplusx: Field,
    pub(crate) yminusx: Field,
    pub(crate) xy2d: Field,
}

impl DuifPoint {
    pub(crate) const IDENTITY: DuifPoint = DuifPoint {
        yplusx: Field::ONE,
        yminusx: Field::ONE,
        xy2d: Field::ZERO,
    };

    pub(crate) fn from_affine(x: Field, y: Field, d2: Field) -> DuifPoint {
        DuifPoint {
            yplusx: y.add(x).reduce(),
            yminusx: y.sub(x),
            xy2d: x.mul(y).mul(d2),
        }
    }

    fn cmov(&mut self, other: &DuifPoint, flag: V) {
        self.yplusx.cmov(&other.yplusx, flag);
        self.yminusx.cmov(&other.yminusx, flag);
        self.xy2d.cmov(&other.xy2d, flag);
    }
}

/// §4.4.2 Doubling. Input is read as plain projective `(x, y, z)`: the
/// formula never touches `t`, so this works whether it is called with an
/// [`ExtPoint`] or a bare projective triple. Ported from `ge_p2_dbl`
/// (dbl-2008-hwcd, `a = -1`).
pub(crate) fn double(x: Field, y: Field, z: Field) -> Completed {
    let a = x.square();
    let b = y.square();
    let c = z.square().mul29(2);
    let h = x.add(y).reduce().square();
    let y_out = b.add(a).reduce();
    let z_out = b.sub(a);
    let x_out = h.sub(y_out);
    let t_out = c.sub(z_out);
    Completed {
        x: x_out,
        y: y_out,
        z: z_out,
        t: t_out,
    }
}

/// §4.4.1 General addition, `p + q` with `q` in cached form. Ported from
/// `ge_add`.
pub(crate) fn add(p: &ExtPoint, q: &CachedPoint) -> Completed {
    let ypx = p.y.add(p.x).reduce();
    let ymx = p.y.sub(p.x);
    let a = ypx.mul(q.yplusx);
    let b = ymx.mul(q.yminusx);
    let c = q.t2d.mul(p.t());
    let zz = p.z.mul(q.z);
    let d = zz.add(zz).reduce();
    Completed {
        x: a.sub(b),
        y: a.add(b).reduce(),
        z: d.add(c).reduce(),
        t: d.sub(c),
    }
}

/// §4.4.1 Mixed addition, `p + q` with `q` an affine table entry (`z = 1`
/// implied). Ported from `ge_madd`.
pub(crate) fn madd(p: &ExtPoint, q: &DuifPoint) -> Completed {
    let ypx = p.y.add(p.x).reduce();
    let ymx = p.y.sub(p.x);
    let a = ypx.mul(q.yplusx);
    let b = ymx.mul(q.yminusx);
    let c = q.xy2d.mul(p.t());
    let d = p.z.add(p.z).reduce();
    Completed {
        x: a.sub(b),
        y: a.add(b).reduce(),
        z: d.add(c).reduce(),
        t: d.sub(c),
    }
}

/// Mixed subtraction, `p - q`. Ported from `ge_msub`: identical to
/// [`madd`] with the `yplusx`/`yminusx` operands swapped and `c`'s sign
/// flipped, which is exactly what adding `-q` amounts to.
pub(crate) fn msub(p: &ExtPoint, q: &DuifPoint) -> Completed {
    let ypx = p.y.add(p.x).reduce();
    let ymx = p.y.sub(p.x);
    let a = ypx.mul(q.yminusx);
    let b = ymx.mul(q.yplusx);
    let c = q.xy2d.mul(p.t());
    let d = p.z.add(p.z).reduce();
    Completed {
        x: a.sub(b),
        y: a.add(b).reduce(),
        z: d.sub(c),
        t: d.add(c).reduce(),
    }
}

/// §4.4.3 Constant-time table lookup: scans all 8 entries of `group`
/// (indices standing for multiples `1, 3, 5, ..., 15` of the group's base
/// point) and masks out everything but the one matching `digit`'s
/// magnitude, then flips the sign if `digit` was negative. `digit` is a
/// signed nibble in `[-8, 8]`, carried as the low byte of each lane.
/// Ported from `select`/`cmov`/`equal`/`negative`.
pub(crate) fn select(group: &[DuifPoint; 8], digit: V) -> DuifPoint {
    let babs = digit.abs_i8();
    let bneg = digit.neg_mask_i8();

    let mut t = DuifPoint::IDENTITY;
    for (k, entry) in group.iter().enumerate() {
        let mask = babs.eq_mask((k + 1) as u64);
        t.cmov(entry, mask);
    }

    let negated = DuifPoint {
        yplusx: t.yminusx,
        yminusx: t.yplusx,
        xy2d: -t.xy2d,
    };
    t.cmov(&negated, bneg);
    t
}

/// §4.4.4 Signed-nibble scalar recoding: splits a 32-byte scalar into 64
/// nibbles and carry-propagates them into the range `[-8, 8]`. Ported
/// from `ge_scalarmult_base`'s recoding loop. Operates on one lane's raw
/// scalar bytes at a time — the carry computation is a pure shift
/// (`(e[i] + 8) >> 4`), not a branch, so doing this once per lane rather
/// than batched across `V` loses nothing in constant-time-ness.
fn recode_scalar(a: &[u8; 32]) -> [i8; 64] {
    let mut e = [0i8; 64];
    for i in 0..32 {
        e[2 * i] = (a[i] & 15) as i8;
        e[2 * i + 1] = ((a[i] >> 4) & 15) as i8;
    }

    let mut carry: i8 = 0;
    for d in e.iter_mut().take(63) {
        *d += carry;
        carry = (*d + 8) >> 4;
        *d -= carry << 4;
    }
    e[63] += carry;
    e
}

/// §4.4.5 Fixed-base scalar multiplication, batched across all four
/// lanes' independent scalars at once. Ported structurally from
/// `ge_scalarmult_base`: an odd-indexed mixed-addition pass building up
/// `15, 13, ..., 1` multiples of each `16^i * B` group, four doublings to
/// shift by one hex digit, then an even-indexed pass for the remaining
/// nibbles.
pub(crate) fn scalarmult_base(scalars: &[[u8; 32]; 4], table: &[[DuifPoint; 8]; 32]) -> ExtPoint {
    let recoded: [[i8; 64]; 4] = std::array::from_fn(|lane| recode_scalar(&scalars[lane]));
    let digit = |pos: usize| -> V {
        V::from_lanes(std::array::from_fn(|lane| recoded[lane][pos] as u8 as u64))
    };

    let mut h = ExtPoint::IDENTITY;
    let mut i = 1;
    while i < 64 {
        let t = select(&table[i / 2], digit(i));
        h = madd(&h, &t).to_ext();
        i += 2;
    }

    let (x, y, z) = double(h.x, h.y, h.z).to_proj();
    let (x, y, z) = double(x, y, z).to_proj();
    let (x, y, z) = double(x, y, z).to_proj();
    h = double(x, y, z).to_ext();

    let mut i = 0;
    while i < 64 {
        let t = select(&table[i / 2], digit(i));
        h = madd(&h, &t).to_ext();
        i += 2;
    }
    h
}

/// §4.4.6 Edwards -> Montgomery coordinate map: the birational
/// equivalence `u = (1 + y) / (1 - y)` between Ed25519 and Curve25519,
/// evaluated at the affine Edwards `y = Y/Z` of `p`.
pub(crate) fn to_montgomery_u(p: &ExtPoint) -> Field {
    let z_inv = p.z.invert();
    let y = p.y.mul(z_inv);
    let numerator = Field::ONE.add(y).reduce();
    let denominator = Field::ONE.sub(y);
    numerator.mul(denominator.invert())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recode_scalar_digits_are_bounded_and_reconstruct_value() {
        let mut a = [0u8; 32];
        for (i, b) in a.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(53).wrapping_add(7);
        }
        let e = recode_scalar(&a);
        for &d in &e {
            assert!((-8..=8).contains(&d));
        }

        // Reconstruct the original little-endian integer from the signed
        // nibbles and check it matches `a` exactly.
        let mut acc: i128 = 0;
        let mut scale: i128 = 1;
        for &d in &e {
            acc += d as i128 * scale;
            scale *= 16;
        }
        let mut expected: i128 = 0;
        for (i, &b) in a.iter().enumerate() {
            expected += (b as i128) << (8 * i);
        }
        assert_eq!(acc, expected);
    }

    #[test]
    fn select_identity_digit_zero_returns_identity() {
        let mut group = [DuifPoint::IDENTITY; 8];
        for (k, entry) in group.iter_mut().enumerate() {
            *entry = DuifPoint {
                yplusx: Field::broadcast_small((k as u64 + 10) * 2),
                yminusx: Field::broadcast_small(k as u64 + 1),
                xy2d: Field::broadcast_small(k as u64 + 5),
            };
        }
        let picked = select(&group, V::ZERO);
        // digit 0 matches no table row, so the masked-out identity survives.
        let one = picked.yplusx.final_reduce().subtract_p_if_ge();
        assert_eq!(one.0[0].lane(0), 1);
    }
}
