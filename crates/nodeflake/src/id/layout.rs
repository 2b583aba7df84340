use core::{fmt, time::Duration};

use crate::{Error, Result};

/// Width of the time field.
pub const TIME_BITS: u32 = 39;

/// Width of the per-unit sequence field.
pub const SEQUENCE_BITS: u32 = 8;

/// Width of the node id field.
pub const NODE_BITS: u32 = 16;

/// Duration of one unit of the time field.
pub const TIME_UNIT: Duration = Duration::from_millis(10);

/// Bitmask for the 39-bit time field. Occupies bits 24 through 62.
pub const TIME_MASK: u64 = (1 << TIME_BITS) - 1;

/// Bitmask for the 8-bit sequence field. Occupies bits 16 through 23.
pub const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Bitmask for the 16-bit node field. Occupies bits 0 through 15.
pub const NODE_MASK: u64 = (1 << NODE_BITS) - 1;

/// Number of bits to shift the time field to its position.
pub const TIME_SHIFT: u32 = SEQUENCE_BITS + NODE_BITS;

/// Number of bits to shift the sequence field to its position.
pub const SEQUENCE_SHIFT: u32 = NODE_BITS;

/// The fields of a decomposed identifier.
///
/// ```
/// use nodeflake::{Parts, decompose};
///
/// let parts = Parts { time: 1000, sequence: 2, node: 7 };
/// let id = parts.compose()?;
/// assert_eq!(id, (1000 << 24) | (2 << 16) | 7);
/// assert_eq!(decompose(id)?, parts);
/// # Ok::<(), nodeflake::Error>(())
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Parts {
    /// Elapsed [`TIME_UNIT`]s since the generator epoch.
    pub time: u64,
    /// Position within the time unit.
    pub sequence: u8,
    /// Node identity of the generator that produced the identifier.
    pub node: u16,
}

impl Parts {
    /// Packs the fields back into an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] if `time` does not fit in
    /// [`TIME_BITS`] or if every field is zero.
    pub fn compose(&self) -> Result<i64> {
        compose(self.time, self.sequence, self.node)
    }

    /// Time since the generator epoch, truncated to [`TIME_UNIT`].
    ///
    /// Saturates for hand-built values whose `time` is far outside
    /// [`TIME_BITS`].
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.time.saturating_mul(TIME_UNIT.as_millis() as u64))
    }
}

impl fmt::Display for Parts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time={} sequence={} node={}",
            self.time, self.sequence, self.node
        )
    }
}

/// Packs `time`, `sequence` and `node` into an identifier.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] if `time` exceeds [`TIME_MASK`] or the
/// packed value is not positive.
pub fn compose(time: u64, sequence: u8, node: u16) -> Result<i64> {
    if time > TIME_MASK {
        return Err(Error::invalid_id(time, "time exceeds 39 bits"));
    }
    let id = pack(time, sequence, node);
    if id <= 0 {
        return Err(Error::invalid_id(id, "identifier must be positive"));
    }
    Ok(id)
}

/// Splits an identifier into its fields.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] if `id <= 0`.
pub fn decompose(id: i64) -> Result<Parts> {
    if id <= 0 {
        return Err(Error::invalid_id(id, "identifier must be positive"));
    }
    let raw = id as u64;
    Ok(Parts {
        time: (raw >> TIME_SHIFT) & TIME_MASK,
        sequence: ((raw >> SEQUENCE_SHIFT) & SEQUENCE_MASK) as u8,
        node: (raw & NODE_MASK) as u16,
    })
}

/// Unchecked packing for counters that already keep `time <= TIME_MASK`.
#[inline]
pub(crate) const fn pack(time: u64, sequence: u8, node: u16) -> i64 {
    (((time & TIME_MASK) << TIME_SHIFT)
        | ((sequence as u64) << SEQUENCE_SHIFT)
        | node as u64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_reassembles_with_layout_formula() {
        let samples = [
            1_i64,
            0xffff,
            1 << 16,
            1 << 24,
            (12_345 << 24) | (17 << 16) | 4242,
            i64::MAX,
        ];
        for id in samples {
            let parts = decompose(id).unwrap();
            let rebuilt = ((parts.time as i64) << 24)
                | (i64::from(parts.sequence) << 16)
                | i64::from(parts.node);
            assert_eq!(rebuilt, id);
            assert_eq!(parts.compose().unwrap(), id);
        }
    }

    #[test]
    fn decompose_extracts_fields() {
        let parts = decompose((99 << 24) | (255 << 16) | 65535).unwrap();
        assert_eq!(
            parts,
            Parts {
                time: 99,
                sequence: 255,
                node: 65535
            }
        );
    }

    #[test]
    fn max_id_fills_every_field() {
        let parts = decompose(i64::MAX).unwrap();
        assert_eq!(parts.time, TIME_MASK);
        assert_eq!(u64::from(parts.sequence), SEQUENCE_MASK);
        assert_eq!(u64::from(parts.node), NODE_MASK);
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        for id in [0, -1, i64::MIN] {
            assert!(matches!(
                decompose(id),
                Err(Error::InvalidIdentifier { .. })
            ));
        }
        assert!(matches!(
            compose(0, 0, 0),
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn compose_rejects_time_outside_layout() {
        assert!(matches!(
            compose(TIME_MASK + 1, 0, 1),
            Err(Error::InvalidIdentifier { .. })
        ));
        assert_eq!(compose(TIME_MASK, 0, 0).unwrap(), (TIME_MASK << 24) as i64);
    }

    #[test]
    fn elapsed_uses_time_unit() {
        let parts = Parts {
            time: 150,
            sequence: 0,
            node: 0,
        };
        assert_eq!(parts.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn elapsed_saturates_for_out_of_range_time() {
        let parts = Parts {
            time: u64::MAX,
            sequence: 0,
            node: 0,
        };
        assert_eq!(parts.elapsed(), Duration::from_millis(u64::MAX));

        let last = Parts {
            time: TIME_MASK,
            sequence: 0,
            node: 0,
        };
        assert_eq!(last.elapsed(), Duration::from_millis(TIME_MASK * 10));
    }
}
