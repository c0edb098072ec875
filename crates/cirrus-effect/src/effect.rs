//! The effect root object: everything one `.cfx` description loads into.
//!
//! An [`Effect`] exclusively owns its groups, techniques, passes, and
//! shaders (shaders live in an arena and are referenced by id from passes
//! and hit groups, so a de-duplicated shader is created once and shared).
//! Reloading is wholesale: drop the old effect, call [`Effect::load`] again.
//! There is no incremental patch path, and the object graph must not be
//! shared with other threads until the load returns.

use std::collections::HashMap;

use crate::backend::{EffectBackend, RenderStateHandle, RenderStateKind, SamplerHandle};
use crate::error::{Diagnostic, Diagnostics, LoadError};
use crate::resource::{ResourceCatalog, ShaderResource};
use crate::shader::{Shader, ShaderId, ShaderKey};
use crate::technique::{EffectTechnique, EffectTechniqueGroup, TechniqueId};

// ── Effect ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Effect {
    /// Path the description was loaded from.
    pub source_path: String,
    /// Companion binary path, recorded once an inline reference opened it.
    pub binary_path: Option<String>,

    groups: HashMap<String, EffectTechniqueGroup>,
    techniques: Vec<EffectTechnique>,
    technique_by_full_name: HashMap<String, TechniqueId>,
    /// Global declaration order, for index-based iteration.
    technique_order: Vec<TechniqueId>,

    shaders: Vec<Shader>,
    shader_by_key: HashMap<ShaderKey, ShaderId>,

    pub resources: ResourceCatalog,
    named_states: HashMap<(RenderStateKind, String), RenderStateHandle>,
    samplers_by_slot: HashMap<u32, SamplerHandle>,
}

impl Effect {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self { source_path: source_path.into(), ..Self::default() }
    }

    /// Loads an effect description through the backend.
    ///
    /// Structural and platform errors return `Err`; everything non-fatal is
    /// accumulated on the returned [`LoadedEffect`].
    pub fn load(path: &str, backend: &mut dyn EffectBackend) -> Result<LoadedEffect, LoadError> {
        let bytes = backend
            .read_file(path)
            .map_err(|source| LoadError::FileRead { path: path.to_string(), source })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        crate::parser::parse_str(&text, path, backend)
    }

    // ── Technique index ───────────────────────────────────────────────────

    /// Creates the group and/or technique on first use and returns the
    /// technique id. The stored technique name is qualified as
    /// `group::name` when the group name is non-empty; the technique's
    /// group-local index is dense in creation order.
    pub fn ensure_technique(&mut self, group_name: &str, name: &str) -> TechniqueId {
        let full_name = if group_name.is_empty() {
            name.to_string()
        } else {
            format!("{group_name}::{name}")
        };
        if let Some(&id) = self.technique_by_full_name.get(&full_name) {
            return id;
        }

        let group = self
            .groups
            .entry(group_name.to_string())
            .or_insert_with(|| EffectTechniqueGroup::new(group_name));
        let id = TechniqueId(self.techniques.len());
        let group_index = group.register(name, id);
        self.techniques.push(EffectTechnique::new(full_name.clone(), group_index));
        self.technique_by_full_name.insert(full_name, id);
        self.technique_order.push(id);
        id
    }

    pub fn technique_group(&self, name: &str) -> Option<&EffectTechniqueGroup> {
        self.groups.get(name)
    }

    /// Lookup by full (possibly `group::`-qualified) name.
    pub fn technique(&self, full_name: &str) -> Option<&EffectTechnique> {
        self.technique_by_full_name
            .get(full_name)
            .map(|&TechniqueId(i)| &self.techniques[i])
    }

    /// Lookup in global declaration order.
    pub fn technique_by_index(&self, index: usize) -> Option<&EffectTechnique> {
        self.technique_order.get(index).map(|&TechniqueId(i)| &self.techniques[i])
    }

    pub fn technique_ref(&self, id: TechniqueId) -> &EffectTechnique {
        &self.techniques[id.0]
    }

    pub(crate) fn technique_mut(&mut self, id: TechniqueId) -> &mut EffectTechnique {
        &mut self.techniques[id.0]
    }

    pub fn technique_count(&self) -> usize {
        self.techniques.len()
    }

    pub fn techniques(&self) -> impl Iterator<Item = &EffectTechnique> {
        self.technique_order.iter().map(|&TechniqueId(i)| &self.techniques[i])
    }

    // ── Shader arena ──────────────────────────────────────────────────────

    /// De-duplication lookup: the id of an already-created shader with this
    /// filename + entry + stage, if any.
    pub(crate) fn find_shader(&self, key: &ShaderKey) -> Option<ShaderId> {
        self.shader_by_key.get(key).copied()
    }

    pub(crate) fn add_shader(&mut self, shader: Shader) -> ShaderId {
        let id = ShaderId(self.shaders.len());
        self.shader_by_key.insert(shader.key(), id);
        self.shaders.push(shader);
        id
    }

    pub fn shader(&self, id: ShaderId) -> &Shader {
        &self.shaders[id.0]
    }

    pub(crate) fn shader_mut(&mut self, id: ShaderId) -> &mut Shader {
        &mut self.shaders[id.0]
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    // ── Resources and states ──────────────────────────────────────────────

    pub fn resource_by_name(&self, name: &str) -> Option<&ShaderResource> {
        self.resources.lookup(name)
    }

    pub(crate) fn register_render_state(
        &mut self,
        kind: RenderStateKind,
        name: &str,
        handle: RenderStateHandle,
    ) {
        self.named_states.insert((kind, name.to_string()), handle);
    }

    pub fn render_state(&self, kind: RenderStateKind, name: &str) -> Option<RenderStateHandle> {
        self.named_states.get(&(kind, name.to_string())).copied()
    }

    pub(crate) fn register_sampler(&mut self, slot: u32, handle: SamplerHandle) {
        self.samplers_by_slot.insert(slot, handle);
    }

    pub fn sampler_at_slot(&self, slot: u32) -> Option<SamplerHandle> {
        self.samplers_by_slot.get(&slot).copied()
    }
}

// ── LoadedEffect ──────────────────────────────────────────────────────────

/// A parsed effect together with the non-fatal diagnostics the load
/// accumulated. The caller decides whether diagnostics-with-partial-success
/// is an acceptable load.
#[derive(Debug)]
pub struct LoadedEffect {
    pub effect: Effect,
    diagnostics: Vec<Diagnostic>,
}

impl LoadedEffect {
    pub(crate) fn new(effect: Effect, diagnostics: Diagnostics) -> Self {
        Self { effect, diagnostics: diagnostics.entries().to_vec() }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
