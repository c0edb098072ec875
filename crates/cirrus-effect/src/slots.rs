//! The slot model: which numeric binding slots an entity uses, per resource
//! category.

// ── SlotCategory ──────────────────────────────────────────────────────────

/// One of the six independent binding namespaces a shader stage draws from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SlotCategory {
    /// Read-only texture (`t` annotation, values < 1000).
    TextureRead,
    /// Read-write texture (`u` annotation, or `t` values >= 1000).
    TextureWrite,
    /// Texture bound as a read-only structured buffer (`b`, values < 1000).
    BufferRead,
    /// Texture bound as a read-write structured buffer (`z`, or `b` >= 1000).
    BufferWrite,
    /// Sampler state (`s`).
    Sampler,
    /// Constant buffer (`c`).
    ConstantBuffer,
}

impl SlotCategory {
    pub const COUNT: usize = 6;

    /// All categories, in the order used to index per-category arrays.
    pub const ALL: [SlotCategory; Self::COUNT] = [
        SlotCategory::TextureRead,
        SlotCategory::TextureWrite,
        SlotCategory::BufferRead,
        SlotCategory::BufferWrite,
        SlotCategory::Sampler,
        SlotCategory::ConstantBuffer,
    ];

    /// Index into per-category arrays ([`crate::usage::UsageSets`], pass layouts).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            SlotCategory::TextureRead => 0,
            SlotCategory::TextureWrite => 1,
            SlotCategory::BufferRead => 2,
            SlotCategory::BufferWrite => 3,
            SlotCategory::Sampler => 4,
            SlotCategory::ConstantBuffer => 5,
        }
    }
}

// ── SlotSet ───────────────────────────────────────────────────────────────

/// Fixed-capacity bit set over binding slot numbers for one category.
///
/// Bit `i` set ⇔ slot `i` is used by the owning entity. Capacity is 128
/// slots, which comfortably covers every binding tier the format addresses;
/// slot numbers at or above [`SlotSet::CAPACITY`] are rejected by
/// [`insert`](SlotSet::insert) so a bad annotation can never wrap around.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SlotSet(u128);

impl SlotSet {
    pub const CAPACITY: u32 = 128;

    #[inline]
    pub fn new() -> Self {
        Self(0)
    }

    /// Marks `slot` as used. Returns `false` (and changes nothing) when the
    /// slot number is out of capacity.
    #[inline]
    pub fn insert(&mut self, slot: u32) -> bool {
        if slot >= Self::CAPACITY {
            return false;
        }
        self.0 |= 1u128 << slot;
        true
    }

    #[inline]
    pub fn contains(self, slot: u32) -> bool {
        slot < Self::CAPACITY && self.0 & (1u128 << slot) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of used slots (popcount).
    #[inline]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Unions `other` into `self`.
    #[inline]
    pub fn union_with(&mut self, other: SlotSet) {
        self.0 |= other.0;
    }

    /// Used slot numbers in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..Self::CAPACITY).filter(move |&s| self.contains(s))
    }

    /// Ascending slot numbers as a freshly built list.
    ///
    /// Slots fit in `u8` by construction (capacity 128).
    pub fn to_indices(self) -> Vec<u8> {
        self.iter().map(|s| s as u8).collect()
    }
}
