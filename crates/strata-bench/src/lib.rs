//! Benchmark workloads shared by the Strata criterion benches.
//!
//! - [`word_keys`]: deterministic string keys for hash-map benches
//! - [`SCRATCH_RESERVE`]: arena reservation used by every bench

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strata_core::MIB;

/// Arena reservation for benchmarks (one 64 MiB block).
pub const SCRATCH_RESERVE: usize = 64 * MIB;

/// `count` distinct, non-empty keys with a mixed length distribution.
///
/// Generated with a fixed linear congruential sequence so runs are
/// comparable.
pub fn word_keys(count: usize) -> Vec<String> {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    (0..count)
        .map(|i| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let len = 4 + (state >> 60) as usize;
            let mut key = format!("{i:x}-");
            key.extend((0..len).map(|j| (b'a' + ((state >> ((j * 4) % 64)) & 0xF) as u8) as char));
            key
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn word_keys_are_distinct_and_deterministic() {
        let keys = word_keys(1000);
        assert_eq!(keys.len(), 1000);
        assert!(keys.iter().all(|k| !k.is_empty()));
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 1000);
        assert_eq!(keys, word_keys(1000));
    }
}
