//! Fixed 256-bit set indexed by an 8-bit id.

/// Record of which 8-bit ids have been seen.
///
/// ```
/// use mediaframe::reassembly::ChunkMask;
///
/// let mut mask = ChunkMask::default();
/// assert!(mask.insert(3));
/// assert!(!mask.insert(3));
/// assert!(mask.contains(3));
/// assert!(!mask.covers(4));
/// for id in [0, 1, 2] {
///     mask.insert(id);
/// }
/// assert!(mask.covers(4));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkMask([u64; 4]);

impl ChunkMask {
    const fn locate(id: u8) -> (usize, u64) { ((id / 64) as usize, 1 << (id % 64)) }

    /// Add `id`, returning `false` if it was already present.
    pub fn insert(&mut self, id: u8) -> bool {
        let (word, bit) = Self::locate(id);
        let fresh = self.0[word] & bit == 0;
        self.0[word] |= bit;
        fresh
    }

    /// Remove `id`, returning whether it was present.
    pub fn remove(&mut self, id: u8) -> bool {
        let (word, bit) = Self::locate(id);
        let present = self.0[word] & bit != 0;
        self.0[word] &= !bit;
        present
    }

    #[must_use]
    pub fn contains(&self, id: u8) -> bool {
        let (word, bit) = Self::locate(id);
        self.0[word] & bit != 0
    }

    /// Number of ids present.
    #[must_use]
    pub fn count(&self) -> u32 { self.0.iter().map(|word| word.count_ones()).sum() }

    /// Whether every id in `0..expected` is present.
    #[must_use]
    pub fn covers(&self, expected: u8) -> bool { (0..expected).all(|id| self.contains(id)) }
}
