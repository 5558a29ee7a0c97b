//! Batch-4 X25519 Diffie-Hellman key agreement.
//!
//! A constant-time, allocation-free implementation of X25519 (RFC 7748)
//! that processes four independent key agreements side by side, one value
//! per lane, instead of one scalar multiplication at a time. There is no
//! real SIMD backend wired in (`vector.rs` is a scalar-loop shim over the
//! four lanes) — the batching is in the data layout and the algorithms,
//! not in an ISA dependency, so a backend with real AVX2/NEON intrinsics
//! can be swapped in behind the same lane contract without touching the
//! field or curve layers.
//!
//! # Module overview
//!
//! - `vector`
//!   The 4-lane primitive type every other module is built on: lane-wise
//!   add/sub/multiply-low-32, shifts, masks, and the constant-time
//!   comparison helpers the field and curve layers need.
//!
//! - `field`
//!   Constant-time arithmetic modulo `2^255 - 19`, radix `2^29`, batched
//!   across four lanes. Addition, subtraction, multiplication, squaring,
//!   inversion, conditional swap/move, and the canonical-encoding
//!   reduction every public output goes through.
//!
//! - `serialize`
//!   Conversion between the external 32-byte little-endian wire format
//!   and the internal 9-limb representation, plus RFC 7748 scalar
//!   clamping.
//!
//! - `montgomery`
//!   The variable-base Montgomery ladder over Curve25519, used by
//!   `sharedsecret` (the peer's public key is not the fixed base point,
//!   so there is no precomputed table to exploit).
//!
//! - `edwards` / `table`
//!   Fixed-base scalar multiplication on the birationally equivalent
//!   twisted Edwards curve, used by `keygen`. `table` derives the
//!   precomputed base-point multiples at first use rather than shipping
//!   them as a literal.
//!
//! - `x25519`
//!   The public façade: `keygen` and `sharedsecret`.
//!
//! # Design goals
//!
//! - No heap allocations in the core arithmetic
//! - Constant-time with respect to all secret data (scalars, shared
//!   secrets); only the base-point table generation in `table.rs` — over
//!   public constants, run once — takes shortcuts a secret-data path
//!   could not
//! - No runtime dependencies

mod edwards;
mod field;
mod montgomery;
mod serialize;
mod table;
mod vector;

pub mod x25519;
