//! Shader objects as the loader sees them: a stage, an entry point, the
//! slots they consume, and (for vertex shaders) an input layout.

use std::collections::BTreeMap;

use crate::backend::{SamplerHandle, ShaderHandle};
use crate::slots::{SlotCategory, SlotSet};
use crate::usage::UsageSets;

// ── StageKind ─────────────────────────────────────────────────────────────

/// Pipeline stage a shader object belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Geometry,
    Pixel,
    Compute,
    RayGeneration,
    ClosestHit,
    AnyHit,
    Intersection,
    Miss,
    Callable,
}

impl StageKind {
    pub const COUNT: usize = 10;

    /// Index into the per-pass one-shader-per-stage table.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            StageKind::Vertex => 0,
            StageKind::Geometry => 1,
            StageKind::Pixel => 2,
            StageKind::Compute => 3,
            StageKind::RayGeneration => 4,
            StageKind::ClosestHit => 5,
            StageKind::AnyHit => 6,
            StageKind::Intersection => 7,
            StageKind::Miss => 8,
            StageKind::Callable => 9,
        }
    }

    /// The stage keyword as it appears on a shader-stage line.
    pub fn keyword(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Geometry => "geometry",
            StageKind::Pixel => "pixel",
            StageKind::Compute => "compute",
            StageKind::RayGeneration => "raygen",
            StageKind::ClosestHit => "closesthit",
            StageKind::AnyHit => "anyhit",
            StageKind::Intersection => "intersection",
            StageKind::Miss => "miss",
            StageKind::Callable => "callable",
        }
    }
}

// ── Input layout ──────────────────────────────────────────────────────────

/// One vertex-input element from a `layout { ... }` block.
///
/// The format token is backend vocabulary; the loader carries it opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutElement {
    pub format: String,
    pub byte_offset: u32,
    pub input_slot: u32,
}

// ── Shader ────────────────────────────────────────────────────────────────

/// Identity under which shader objects are de-duplicated: a given
/// filename + entry point + stage is parsed and created exactly once per
/// effect.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ShaderKey {
    pub filename: String,
    pub entry: String,
    pub stage: StageKind,
}

/// Index of a [`Shader`] in the owning effect's shader arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderId(pub(crate) usize);

/// A loaded shader stage.
///
/// Slot usage is `Option` per category: `None` means "not yet populated",
/// which is distinct from "populated and legitimately uses no slots". The
/// first usage annotation seen for a shader wins; later annotations for the
/// same shader only contribute to the owning pass's aggregated sets.
#[derive(Debug, Clone)]
pub struct Shader {
    pub stage: StageKind,
    pub filename: String,
    pub entry: String,
    /// Backend object for this shader.
    pub handle: ShaderHandle,
    /// Vertex-input layout; only ever populated on vertex shaders.
    pub layout: Vec<LayoutElement>,
    usage: [Option<SlotSet>; SlotCategory::COUNT],
    /// Sampler bindings materialized by slot (the slot-to-sampler resolver
    /// clears the corresponding usage bits as it fills this in).
    pub samplers: BTreeMap<u32, SamplerHandle>,
}

impl Shader {
    pub fn new(key: ShaderKey, handle: ShaderHandle) -> Self {
        Self {
            stage: key.stage,
            filename: key.filename,
            entry: key.entry,
            handle,
            layout: Vec::new(),
            usage: [None; SlotCategory::COUNT],
            samplers: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> ShaderKey {
        ShaderKey {
            filename: self.filename.clone(),
            entry: self.entry.clone(),
            stage: self.stage,
        }
    }

    /// True once any category has been populated, even with an empty set.
    pub fn has_usage(&self) -> bool {
        self.usage.iter().any(|u| u.is_some())
    }

    /// The shader's slot set for `cat`; empty when never populated.
    pub fn slots(&self, cat: SlotCategory) -> SlotSet {
        self.usage[cat.index()].unwrap_or_default()
    }

    /// First-writer-wins merge of an extracted annotation: each category is
    /// taken only if currently unset on this shader.
    pub fn adopt_usage(&mut self, extracted: &UsageSets) {
        for cat in SlotCategory::ALL {
            let slot = &mut self.usage[cat.index()];
            if slot.is_none() {
                *slot = Some(extracted.get(cat));
            }
        }
    }

    /// Removes `slot` from the sampler set after its binding has been
    /// materialized. The owning pass's aggregated set is untouched.
    pub fn clear_sampler_slot(&mut self, slot: u32) {
        if let Some(set) = &mut self.usage[SlotCategory::Sampler.index()] {
            let mut cleared = SlotSet::new();
            for s in set.iter().filter(|&s| s != slot) {
                cleared.insert(s);
            }
            *set = cleared;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;

    fn shader() -> Shader {
        Shader::new(
            ShaderKey {
                filename: "a.vs".into(),
                entry: "main".into(),
                stage: StageKind::Vertex,
            },
            ShaderHandle(1),
        )
    }

    #[test]
    fn first_writer_wins() {
        let mut d = Diagnostics::new();
        let mut sh = shader();
        assert!(!sh.has_usage());

        sh.adopt_usage(&UsageSets::parse("t:(0)", 1, &mut d));
        sh.adopt_usage(&UsageSets::parse("t:(5) s:(1)", 2, &mut d));

        // Texture usage keeps the first occurrence; sampler was populated
        // (as empty) by the first adopt, so the second is ignored there too.
        assert_eq!(sh.slots(SlotCategory::TextureRead).to_indices(), vec![0]);
        assert!(sh.slots(SlotCategory::Sampler).is_empty());
    }

    #[test]
    fn populated_empty_differs_from_unset() {
        let mut d = Diagnostics::new();
        let mut sh = shader();
        sh.adopt_usage(&UsageSets::parse("", 1, &mut d));
        assert!(sh.has_usage());
        assert!(sh.slots(SlotCategory::TextureRead).is_empty());
    }

    #[test]
    fn clear_sampler_slot_leaves_others() {
        let mut d = Diagnostics::new();
        let mut sh = shader();
        sh.adopt_usage(&UsageSets::parse("s:(0,3)", 1, &mut d));
        sh.clear_sampler_slot(0);
        assert_eq!(sh.slots(SlotCategory::Sampler).to_indices(), vec![3]);
    }
}
