//! Node identity resolution.
//!
//! A generator packs a 16-bit node id into every identifier. The id is taken,
//! in order, from:
//!
//! 1. [`NODE_ID_VAR`]: an explicit decimal value in `0..=65535`. A malformed
//!    value is an error, not a fallthrough.
//! 2. [`WORKLOAD_NAME_VAR`]: the workload instance name (e.g. a pod name),
//!    hashed.
//! 3. [`HOSTNAME_VAR`]: a host-name-style variable, hashed.
//! 4. The host name reported by the OS, hashed.
//! 5. The low 16 bits of the first private IPv4 address (RFC 1918 or RFC 3927
//!    link-local) on a non-loopback interface.
//!
//! Hashed signals use 32-bit FNV-1a folded to 16 bits with XOR.
//!
//! # Collision risk
//!
//! Only the explicit value is guaranteed unique. Sources 2 to 5 map into
//! 65 536 slots, so for `n` nodes the chance that at least two share an id is
//! roughly `1 - exp(-n(n-1) / 131072)`:
//!
//! | nodes | collision chance |
//! |------:|-----------------:|
//! | 10    | 0.07 %           |
//! | 50    | 1.9 %            |
//! | 100   | 7.3 %            |
//! | 301   | 50 %             |
//! | 1000  | 99.95 %          |
//!
//! Fleets beyond a few dozen processes should set [`NODE_ID_VAR`].
mod hash;
mod resolve;

pub use hash::*;
pub use resolve::*;
