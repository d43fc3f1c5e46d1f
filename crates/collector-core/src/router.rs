//! Partition router — a pure function from [`DeviceIdentity`] to a stable
//! partition index.
//!
//! Uses FNV-1a 32-bit over the identity's `"{oui}-{product_class}-{serial_number}"`
//! rendering, modulo the partition count. Hand-rolled to match the
//! original's direct use of Go's `hash/fnv`; no single crate dominates this
//! niche and the algorithm is a dozen lines.

use crate::identity::DeviceIdentity;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Maps `identity` to an index into `[0, partition_count)`, or `None` when
/// `partition_count` is zero.
///
/// Deterministic for a given `(identity, partition_count)` pair. Stable
/// across process restarts only as long as `partition_count` does not
/// change, per the sink's own partition discovery. An empty partition list
/// is a real (if transient) condition a sink can report, not invalid
/// input — the original's `enqueue()` treats it as a no-op
/// (`if len(s.partitionQueues) == 0 { return nil }`) rather than a fault,
/// and this port does the same rather than panicking.
pub fn route(identity: &DeviceIdentity, partition_count: usize) -> Option<usize> {
    if partition_count == 0 {
        return None;
    }
    let hash = fnv1a32(identity.to_string().as_bytes());
    Some((hash as usize) % partition_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_is_deterministic() {
        let id = DeviceIdentity::new("ACME", "RT", "1");
        assert_eq!(route(&id, 8), route(&id, 8));
    }

    #[test]
    fn same_identity_same_partition_regardless_of_call_count() {
        let id = DeviceIdentity::new("ACME", "RT", "42");
        let first = route(&id, 16);
        for _ in 0..100 {
            assert_eq!(route(&id, 16), first);
        }
    }

    #[test]
    fn result_always_within_partition_range() {
        for serial in 0..50 {
            let id = DeviceIdentity::new("ACME", "RT", serial.to_string());
            assert!(route(&id, 7).unwrap() < 7);
        }
    }

    #[test]
    fn zero_partitions_returns_none() {
        let id = DeviceIdentity::new("ACME", "RT", "1");
        assert_eq!(route(&id, 0), None);
    }
}
