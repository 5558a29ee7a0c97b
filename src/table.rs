//! Base-point precomputed table, generated at first use.
//!
//! spec.md leaves the table's *contents* as an external mathematical
//! artefact implementers are expected to regenerate from the curve
//! constants and the standard base point (RFC 7748 Appendix A.2 / RFC
//! 8032 §5.1). This module does exactly that: it derives Curve25519's `d`
//! constant, recovers the base point's `x`-coordinate from its standard
//! `y = 4/5`, and builds the 32-groups-of-8 Duif table by repeated
//! doubling and addition, computed rather than copied in as a literal.
//!
//! Table shape: `table[i][j]` holds the affine point `(2*j + 1) * 16^i *
//! B` for `i` in `0..32`, `j` in `0..8`, matching `ge_scalarmult_base`'s
//! indexing (`base[pos][babs - 1]`).

use crate::edwards::{self, CachedPoint, DuifPoint, ExtPoint};
use crate::field::Field;
use std::sync::OnceLock;

/// `d = -121665/121666 mod p`, the twisted Edwards curve parameter.
fn curve_d() -> Field {
    let a = Field::broadcast_small(121665);
    let b = Field::broadcast_small(121666);
    (-a).mul(b.invert())
}

/// `sqrt(-1) mod p`, needed by point decompression's second candidate
/// root. Computed as `2^((p-1)/4)`, using the identity
/// `2^((p-1)/4) = (2^((p-5)/8))^2 * 2` (since `2*((p-5)/8) + 1 = (p-1)/4`).
fn sqrt_minus_one() -> Field {
    let two = Field::broadcast_small(2);
    two.pow_p58().square().mul(two)
}

/// Returns the lane-0 canonical limbs of `x`, for the non-secret,
/// public-constant comparisons table generation needs (every lane holds
/// the same broadcast value here, so lane 0 speaks for all of them).
fn canonical_limbs(x: Field) -> [u64; 9] {
    let c = x.final_reduce().subtract_p_if_ge();
    std::array::from_fn(|i| c.0[i].lane(0))
}

fn fields_equal(a: Field, b: Field) -> bool {
    canonical_limbs(a) == canonical_limbs(b)
}

fn is_negative(x: Field) -> bool {
    canonical_limbs(x)[0] & 1 == 1
}

/// Standard Ed25519 point decompression's square-root step (RFC 8032
/// §5.1.3), used here only to recover the base point's `x` from its
/// known `y`. This runs once, over public constants, so it takes a
/// straight-line non-constant-time shape rather than the constant-time
/// discipline the rest of this crate's secret-data paths require.
fn recover_x(y: Field, d: Field, sign_negative: bool) -> Field {
    let sqrtm1 = sqrt_minus_one();
    let y2 = y.square();
    let u = y2.sub(Field::ONE);
    let v = y2.mul(d).add(Field::ONE).reduce();

    let v3 = v.square().mul(v);
    let v7 = v3.square().mul(v);
    let uv7 = u.mul(v7);
    let t = uv7.pow_p58();
    let mut x = u.mul(v3).mul(t);

    let vxx = v.mul(x.square());
    let root_check = vxx.sub(u);
    if !fields_equal(root_check, Field::ZERO) {
        let neg_u = -u;
        debug_assert!(fields_equal(vxx.sub(neg_u), Field::ZERO));
        x = x.mul(sqrtm1);
    }

    if is_negative(x) != sign_negative {
        x = -x;
    }
    x
}

pub(crate) struct BaseTable {
    pub(crate) d: Field,
    pub(crate) d2: Field,
    pub(crate) groups: [[DuifPoint; 8]; 32],
}

fn build() -> BaseTable {
    let d = curve_d();
    let d2 = d.add(d).reduce();

    // Standard base point: y = 4/5, x the unique even root.
    let y = Field::broadcast_small(4).mul(Field::broadcast_small(5).invert());
    let x = recover_x(y, d, false);

    let mut b = ExtPoint {
        x,
        y,
        z: Field::ONE,
        e: x,
        h: y,
    };

    let mut groups: [[DuifPoint; 8]; 32] = [[DuifPoint::IDENTITY; 8]; 32];

    for group in groups.iter_mut() {
        let z_inv = b.z.invert();
        let ax = b.x.mul(z_inv);
        let ay = b.y.mul(z_inv);
        group[0] = DuifPoint::from_affine(ax, ay, d2);

        let doubled = edwards::double(b.x, b.y, b.z).to_ext();
        let doubled_cached = CachedPoint::from_ext(&doubled, d2);

        let mut cur = b;
        for entry in group.iter_mut().skip(1) {
            cur = edwards::add(&cur, &doubled_cached).to_ext();
            let z_inv = cur.z.invert();
            let ax = cur.x.mul(z_inv);
            let ay = cur.y.mul(z_inv);
            *entry = DuifPoint::from_affine(ax, ay, d2);
        }

        // Advance to 16 * (current group base) for the next group.
        let (x1, y1, z1) = edwards::double(b.x, b.y, b.z).to_proj();
        let (x2, y2, z2) = edwards::double(x1, y1, z1).to_proj();
        let (x3, y3, z3) = edwards::double(x2, y2, z2).to_proj();
        b = edwards::double(x3, y3, z3).to_ext();
    }

    BaseTable { d, d2, groups }
}

static TABLE: OnceLock<BaseTable> = OnceLock::new();

pub(crate) fn base_table() -> &'static BaseTable {
    TABLE.get_or_init(build)
}

/// Re-exported so `edwards::scalarmult_base` callers don't need to reach
/// into `BaseTable` directly.
pub(crate) fn groups() -> &'static [[DuifPoint; 8]; 32] {
    &base_table().groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_point_satisfies_curve_equation() {
        // -x^2 + y^2 = 1 + d*x^2*y^2
        let t = base_table();
        let y = Field::broadcast_small(4).mul(Field::broadcast_small(5).invert());
        let x = recover_x(y, t.d, false);

        let x2 = x.square();
        let y2 = y.square();
        let lhs = y2.sub(x2);
        let rhs = Field::ONE.add(t.d.mul(x2).mul(y2)).reduce();
        assert!(fields_equal(lhs, rhs));
    }

    #[test]
    fn table_group_zero_entry_zero_is_base_point() {
        let t = base_table();
        let y = Field::broadcast_small(4).mul(Field::broadcast_small(5).invert());
        let x = recover_x(y, t.d, false);
        let expected = DuifPoint::from_affine(x, y, t.d2);
        assert!(fields_equal(t.groups[0][0].yplusx, expected.yplusx));
        assert!(fields_equal(t.groups[0][0].yminusx, expected.yminusx));
        assert!(fields_equal(t.groups[0][0].xy2d, expected.xy2d));
    }
}
