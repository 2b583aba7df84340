const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Hashes `signal` into a node id: FNV-1a, then the high half XORed into the
/// low half so every input bit can reach the result.
///
/// ```
/// let a = nodeflake::hash_node_id("pod-a");
/// assert_eq!(a, nodeflake::hash_node_id("pod-a"));
/// assert_ne!(a, nodeflake::hash_node_id("pod-b"));
/// ```
pub const fn hash_node_id(signal: &str) -> u16 {
    let hash = fnv1a_32(signal.as_bytes());
    ((hash >> 16) ^ (hash & 0xffff)) as u16
}
