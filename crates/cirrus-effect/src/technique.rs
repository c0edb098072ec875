//! Techniques and technique groups.
//!
//! Techniques live in a single arena owned by the [`Effect`](crate::Effect);
//! groups and the effect-level lookup tables refer to them by arena id.

use std::collections::HashMap;

use crate::pass::{EffectPass, EffectVariantPass};

/// Index of a technique in the owning effect's arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TechniqueId(pub(crate) usize);

// ── EffectTechnique ───────────────────────────────────────────────────────

/// A named collection of passes for one rendering algorithm variant.
#[derive(Debug, Clone)]
pub struct EffectTechnique {
    /// Stored name, qualified as `group::name` when the owning group is
    /// named.
    pub name: String,
    /// Dense index within the owning group.
    pub index: usize,
    /// True once a `variant_pass` block has been opened in this technique.
    pub variant_mode: bool,
    passes: Vec<EffectPass>,
    pass_by_name: HashMap<String, usize>,
    variant_passes: HashMap<String, EffectVariantPass>,
}

impl EffectTechnique {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            variant_mode: false,
            passes: Vec::new(),
            pass_by_name: HashMap::new(),
            variant_passes: HashMap::new(),
        }
    }

    /// Appends a pass at the next dense index, regardless of any index the
    /// description file may have declared, and registers it under its name.
    pub fn add_pass(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        let index = self.passes.len();
        self.pass_by_name.insert(name.clone(), index);
        self.passes.push(EffectPass::new(name, index));
        index
    }

    pub fn add_variant_pass(&mut self, name: impl Into<String>) -> &mut EffectVariantPass {
        let name = name.into();
        self.variant_mode = true;
        self.variant_passes
            .entry(name.clone())
            .or_insert_with(|| EffectVariantPass::new(name))
    }

    pub fn pass(&self, index: usize) -> Option<&EffectPass> {
        self.passes.get(index)
    }

    pub fn pass_mut(&mut self, index: usize) -> Option<&mut EffectPass> {
        self.passes.get_mut(index)
    }

    pub fn pass_by_name(&self, name: &str) -> Option<&EffectPass> {
        self.pass_by_name.get(name).and_then(|&i| self.passes.get(i))
    }

    pub fn variant_pass(&self, name: &str) -> Option<&EffectVariantPass> {
        self.variant_passes.get(name)
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn passes(&self) -> &[EffectPass] {
        &self.passes
    }

    pub fn variant_passes(&self) -> impl Iterator<Item = &EffectVariantPass> {
        self.variant_passes.values()
    }
}

// ── EffectTechniqueGroup ──────────────────────────────────────────────────

/// A namespace of techniques. The empty-string group is the default,
/// ungrouped namespace.
#[derive(Debug, Default, Clone)]
pub struct EffectTechniqueGroup {
    pub name: String,
    by_name: HashMap<String, TechniqueId>,
    by_index: Vec<TechniqueId>,
}

impl EffectTechniqueGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), by_name: HashMap::new(), by_index: Vec::new() }
    }

    /// Registers a technique under its plain (unqualified) name at the next
    /// dense group index, returning that index.
    pub fn register(&mut self, plain_name: impl Into<String>, id: TechniqueId) -> usize {
        let index = self.by_index.len();
        self.by_name.insert(plain_name.into(), id);
        self.by_index.push(id);
        index
    }

    pub fn technique_by_name(&self, plain_name: &str) -> Option<TechniqueId> {
        self.by_name.get(plain_name).copied()
    }

    pub fn technique_by_index(&self, index: usize) -> Option<TechniqueId> {
        self.by_index.get(index).copied()
    }

    pub fn technique_count(&self) -> usize {
        self.by_index.len()
    }
}
