// Seedable random source for phrase generation.
//
// xoshiro256++ (Blackman & Vigna, 2019) expanded from a single u64 seed via
// SplitMix64. Every stochastic decision in `antiphon_music` (random chain
// entry point, successor choice, simultaneous-note count) draws from a
// `PhraseRng` handed in by the caller. Nothing reads ambient randomness, so
// a fixed seed reproduces a whole generation run bit for bit.
//
// Output must not depend on platform, compiler version or optimization
// level: the core generator is pure integer arithmetic.

use serde::{Deserialize, Serialize};

/// Explicit random-source handle threaded through the generation pipeline.
///
/// Two `PhraseRng`s built from the same seed yield identical streams.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhraseRng {
    s: [u64; 4],
}

impl PhraseRng {
    /// Create a generator from a `u64` seed.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform integer in `[low, high)`.
    ///
    /// Rejection sampling keeps the draw free of modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`. Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Uniform `usize` in `[low, high]`. Panics if `low > high`.
    pub fn range_usize_inclusive(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "range_usize_inclusive: low must be <= high");
        self.range_u64(low as u64, high as u64 + 1) as usize
    }

    /// Pick one element uniformly, or `None` for an empty slice.
    ///
    /// Repeated elements are not collapsed, so a value listed twice is twice
    /// as likely. The transition tables rely on this to encode frequency.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.range_usize(0, items.len());
        items.get(idx)
    }
}

/// SplitMix64 step, used only to expand the seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = PhraseRng::new(42);
        let mut b = PhraseRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = PhraseRng::new(42);
        let mut b = PhraseRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn known_sequence_from_seed_zero() {
        // If this ever breaks, every recorded seed produces different music.
        let mut rng = PhraseRng::new(0);
        let vals: Vec<u64> = (0..5).map(|_| rng.next_u64()).collect();
        assert_eq!(
            vals,
            vec![
                0x5317_5d61_490b_23df,
                0x61da_6f3d_c380_d507,
                0x5c0f_df91_ec9a_7bfc,
                0x02ee_bf8c_3bbe_5e1a,
                0x7eca_04eb_af4a_5eea,
            ]
        );
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = PhraseRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn range_usize_inclusive_reaches_both_ends() {
        let mut rng = PhraseRng::new(666);
        let mut saw_low = false;
        let mut saw_high = false;
        for _ in 0..10_000 {
            let v = rng.range_usize_inclusive(1, 5);
            assert!((1..=5).contains(&v));
            saw_low |= v == 1;
            saw_high |= v == 5;
        }
        assert!(saw_low && saw_high);
    }

    #[test]
    fn choose_empty_is_none() {
        let mut rng = PhraseRng::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
    }

    #[test]
    fn choose_respects_repetition() {
        let mut rng = PhraseRng::new(7);
        let items = [1u8, 1, 1, 2];
        let n = 20_000;
        let ones = (0..n)
            .filter(|_| *rng.choose(&items).unwrap() == 1)
            .count();
        let pct = ones as f64 / n as f64;
        assert!(
            (0.70..0.80).contains(&pct),
            "repeated item should be drawn ~75% of the time, got {:.1}%",
            pct * 100.0
        );
    }

    #[test]
    fn serialization_roundtrip_continues_stream() {
        let mut rng = PhraseRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: PhraseRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
