//! Passes: one concrete combination of shader stages and fixed-function
//! state, plus the cumulative binding layout draw-time code binds against.

use std::collections::HashMap;

use crate::backend::RenderStateHandle;
use crate::shader::{ShaderId, StageKind};
use crate::slots::{SlotCategory, SlotSet};
use crate::usage::UsageSets;

// ── HitGroup ──────────────────────────────────────────────────────────────

/// Ray-tracing hit group: the shaders invoked together on a geometry hit.
#[derive(Debug, Default, Clone)]
pub struct HitGroup {
    pub closest_hit: Option<ShaderId>,
    pub any_hit: Option<ShaderId>,
    pub intersection: Option<ShaderId>,
}

// ── EffectPass ────────────────────────────────────────────────────────────

/// One executable pass.
///
/// The aggregated slot sets are always the union of every attached shader's
/// annotation; the per-category index lists are derived from them and
/// rebuilt on every change, so their length always equals the popcount of
/// the corresponding set.
#[derive(Debug, Clone)]
pub struct EffectPass {
    pub name: String,
    /// Dense index within the owning technique, assigned in declaration
    /// order.
    pub index: usize,

    pub blend_state: Option<RenderStateHandle>,
    pub depth_state: Option<RenderStateHandle>,
    pub rasterizer_state: Option<RenderStateHandle>,
    pub target_format_state: Option<RenderStateHandle>,
    /// Primitive topology token, backend vocabulary.
    pub topology: Option<String>,
    pub multiview: bool,
    /// Compute dispatch group size from `numthreads x y z`.
    pub num_threads: [u32; 3],

    /// At most one shader per stage, indexed by [`StageKind::index`].
    /// Hit-group, miss, and callable shaders live in the maps below instead.
    pub stage_shaders: [Option<ShaderId>; StageKind::COUNT],
    /// Pixel shaders registered per render-target output format.
    pub pixel_by_output_format: HashMap<String, ShaderId>,
    pub hit_groups: HashMap<String, HitGroup>,
    /// Miss shaders keyed by entry point.
    pub miss_shaders: HashMap<String, ShaderId>,
    /// Callable shaders keyed by entry point.
    pub callable_shaders: HashMap<String, ShaderId>,

    pub max_payload_size: u32,
    pub max_attribute_size: u32,
    pub max_trace_recursion_depth: u32,

    aggregated: UsageSets,
    slot_lists: [Vec<u8>; SlotCategory::COUNT],
}

impl EffectPass {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            blend_state: None,
            depth_state: None,
            rasterizer_state: None,
            target_format_state: None,
            topology: None,
            multiview: false,
            num_threads: [1, 1, 1],
            stage_shaders: [None; StageKind::COUNT],
            pixel_by_output_format: HashMap::new(),
            hit_groups: HashMap::new(),
            miss_shaders: HashMap::new(),
            callable_shaders: HashMap::new(),
            max_payload_size: 0,
            max_attribute_size: 0,
            max_trace_recursion_depth: 0,
            aggregated: UsageSets::new(),
            slot_lists: Default::default(),
        }
    }

    /// Folds one shader's extracted annotation into the cumulative layout
    /// and rebuilds the derived index lists.
    pub fn fold_usage(&mut self, usage: &UsageSets) {
        self.aggregated.union_with(usage);
        for cat in SlotCategory::ALL {
            self.slot_lists[cat.index()] = self.aggregated.get(cat).to_indices();
        }
    }

    /// True iff some attached shader declared `slot` in `cat`.
    pub fn uses_slot(&self, cat: SlotCategory, slot: u32) -> bool {
        self.aggregated.get(cat).contains(slot)
    }

    /// Ascending slot indices draw-time code must bind for `cat`.
    pub fn resource_slots(&self, cat: SlotCategory) -> &[u8] {
        &self.slot_lists[cat.index()]
    }

    pub fn aggregated_slots(&self, cat: SlotCategory) -> SlotSet {
        self.aggregated.get(cat)
    }

    pub fn shader(&self, stage: StageKind) -> Option<ShaderId> {
        self.stage_shaders[stage.index()]
    }

    pub fn set_shader(&mut self, stage: StageKind, id: ShaderId) {
        self.stage_shaders[stage.index()] = Some(id);
    }

    /// True once any shader has been attached through any route.
    pub fn has_shaders(&self) -> bool {
        self.stage_shaders.iter().any(Option::is_some)
            || !self.pixel_by_output_format.is_empty()
            || !self.miss_shaders.is_empty()
            || !self.callable_shaders.is_empty()
            || self.hit_groups.values().any(|hg| {
                hg.closest_hit.is_some() || hg.any_hit.is_some() || hg.intersection.is_some()
            })
    }
}

// ── EffectVariantPass ─────────────────────────────────────────────────────

/// A named family of passes sharing a logical role.
///
/// Member passes live in the technique's dense pass list; this map only
/// points at them by the variant's own (possibly dotted) name.
#[derive(Debug, Default, Clone)]
pub struct EffectVariantPass {
    pub name: String,
    passes: HashMap<String, usize>,
}

impl EffectVariantPass {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), passes: HashMap::new() }
    }

    pub fn register(&mut self, variant_name: impl Into<String>, pass_index: usize) {
        self.passes.insert(variant_name.into(), pass_index);
    }

    /// Two-segment variant lookup.
    ///
    /// Each stored key is split on the first `.`; segment 1 must equal
    /// `first`, and when `second` is given the key must carry a matching
    /// segment 2. A linear scan is fine at the handful of variants this
    /// format sees in practice.
    pub fn find(&self, first: &str, second: Option<&str>) -> Option<usize> {
        for (key, &index) in &self.passes {
            let (seg1, seg2) = match key.split_once('.') {
                Some((a, b)) => (a, Some(b)),
                None => (key.as_str(), None),
            };
            if seg1 != first {
                continue;
            }
            match second {
                None => return Some(index),
                Some(want) if seg2 == Some(want) => return Some(index),
                Some(_) => continue,
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}
