//! The line-level format parser.
//!
//! A `.cfx` description is parsed in one synchronous pass, strictly in file
//! order, with no lookahead beyond the current line. Each line is routed by
//! the current [`Level`] and its leading keyword; shader-stage lines feed
//! the annotation extractor, the inline-binary resolver, and the
//! technique/pass index as they go. The parse must end back at
//! [`Level::Outside`] or the whole load fails structurally.

use crate::backend::{EffectBackend, RenderStateKind};
use crate::effect::{Effect, LoadedEffect};
use crate::error::{Diagnostics, LoadError};
use crate::inline::InlineBinary;
use crate::level::{BlockKind, CloseContext, Level};
use crate::resource::{ResourceKind, TextureShape};
use crate::shader::{LayoutElement, Shader, ShaderId, ShaderKey, StageKind};
use crate::slots::SlotCategory;
use crate::technique::TechniqueId;
use crate::usage::UsageSets;

// ── Entry point ───────────────────────────────────────────────────────────

/// Parses effect-description text into an [`Effect`].
///
/// `source_path` names the description file (it seeds the companion binary
/// path); `backend` supplies platform identity, file access, and object
/// creation.
pub fn parse_str(
    src: &str,
    source_path: &str,
    backend: &mut dyn EffectBackend,
) -> Result<LoadedEffect, LoadError> {
    Parser::new(source_path, backend).run(src)
}

// ── Parser state ──────────────────────────────────────────────────────────

/// A directive that has announced a block and is waiting for its `{`.
#[derive(Debug, Clone)]
enum Pending {
    Group(String),
    Technique(String),
    VariantPass(String),
    Variant(String),
    Pass(String),
    Layout,
    HitGroup(String),
    MissShaders,
    CallableShaders,
    RaytracingConfig,
}

impl Pending {
    fn block_kind(&self) -> BlockKind {
        match self {
            Pending::Group(_) => BlockKind::Group,
            Pending::Technique(_) => BlockKind::Technique,
            Pending::VariantPass(_) => BlockKind::VariantPass,
            Pending::Variant(_) => BlockKind::Variant,
            Pending::Pass(_) => BlockKind::Pass,
            Pending::Layout => BlockKind::Layout,
            Pending::HitGroup(_) => BlockKind::HitGroup,
            Pending::MissShaders => BlockKind::MissShaders,
            Pending::CallableShaders => BlockKind::CallableShaders,
            Pending::RaytracingConfig => BlockKind::RaytracingConfig,
        }
    }
}

struct Parser<'b> {
    backend: &'b mut dyn EffectBackend,
    effect: Effect,
    diags: Diagnostics,
    inline: InlineBinary,

    level: Level,
    line_no: usize,
    platform_checked: bool,
    pending: Option<Pending>,

    /// Name of the enclosing `group` block, if any (may be the empty
    /// string; cleared when the parser returns to top level).
    group_name: Option<String>,
    current_technique: Option<TechniqueId>,
    current_pass: Option<usize>,
    current_variant_pass: Option<String>,
    current_hit_group: Option<String>,
    /// The open pass was introduced by a `variant` line.
    in_variant_block: bool,
    /// Vertex shader receiving elements from the open `layout` block, if
    /// its layout had not been populated before (first assignment wins).
    layout_target: Option<ShaderId>,
}

impl<'b> Parser<'b> {
    fn new(source_path: &str, backend: &'b mut dyn EffectBackend) -> Self {
        Self {
            backend,
            effect: Effect::new(source_path),
            diags: Diagnostics::new(),
            inline: InlineBinary::for_source(source_path),
            level: Level::Outside,
            line_no: 0,
            platform_checked: false,
            pending: None,
            group_name: None,
            current_technique: None,
            current_pass: None,
            current_variant_pass: None,
            current_hit_group: None,
            in_variant_block: false,
            layout_target: None,
        }
    }

    fn run(mut self, src: &str) -> Result<LoadedEffect, LoadError> {
        for (i, raw) in src.lines().enumerate() {
            self.line_no = i + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            self.dispatch(line)?;
        }
        if self.level != Level::Outside || self.pending.is_some() {
            return Err(self.structural("unexpected end of file inside a block"));
        }
        if !self.platform_checked {
            return Err(self.structural("missing platform tag"));
        }
        Ok(LoadedEffect::new(self.effect, self.diags))
    }

    // ── Line dispatch ─────────────────────────────────────────────────────

    fn dispatch(&mut self, line: &str) -> Result<(), LoadError> {
        // The platform tag must come before anything else.
        if !self.platform_checked {
            return self.handle_platform(line);
        }

        if line == "{" {
            return self.open_pending();
        }
        if line == "}" {
            return self.close_block();
        }

        // A directive may open its block on the same line.
        let (line, brace_here) = match line.strip_suffix('{') {
            Some(rest) => (rest.trim_end(), true),
            None => (line, false),
        };
        if self.pending.is_some() {
            return Err(self.structural("expected '{' to open the announced block"));
        }

        match self.level {
            Level::Outside => self.handle_outside(line)?,
            Level::Group => self.handle_group(line)?,
            Level::Technique => self.handle_technique(line)?,
            Level::VariantPass => self.handle_variant_pass(line)?,
            Level::Pass => self.handle_pass(line)?,
            Level::Layout => self.handle_layout(line)?,
            Level::HitGroup => self.handle_stage_line(line, &[
                StageKind::ClosestHit,
                StageKind::AnyHit,
                StageKind::Intersection,
            ])?,
            Level::MissShaders => self.handle_stage_line(line, &[StageKind::Miss])?,
            Level::CallableShaders => self.handle_stage_line(line, &[StageKind::Callable])?,
            Level::RaytracingConfig => self.handle_raytracing_config(line)?,
        }

        if brace_here {
            self.open_pending()?;
        }
        Ok(())
    }

    fn handle_platform(&mut self, line: &str) -> Result<(), LoadError> {
        let (keyword, declared) = split_keyword(line);
        if keyword != "platform" || declared.is_empty() {
            return Err(self.structural("first line must declare the target platform"));
        }
        if !declared.eq_ignore_ascii_case(self.backend.platform_name()) {
            return Err(LoadError::PlatformMismatch {
                declared: declared.to_string(),
                backend: self.backend.platform_name().to_string(),
            });
        }
        self.platform_checked = true;
        Ok(())
    }

    // ── Block open/close ──────────────────────────────────────────────────

    fn open_pending(&mut self) -> Result<(), LoadError> {
        let Some(pending) = self.pending.take() else {
            return Err(self.structural("'{' without a preceding block directive"));
        };
        self.level = self
            .level
            .open(pending.block_kind())
            .map_err(|m| self.structural_msg(m))?;

        match pending {
            Pending::Group(name) => self.group_name = Some(name),
            Pending::Technique(name) => {
                let group = self.group_name.clone().unwrap_or_default();
                self.current_technique = Some(self.effect.ensure_technique(&group, &name));
            }
            Pending::VariantPass(name) => {
                let tid = self.require_technique()?;
                self.effect.technique_mut(tid).add_variant_pass(name.clone());
                self.current_variant_pass = Some(name);
            }
            Pending::Variant(name) => {
                let tid = self.require_technique()?;
                let tech = self.effect.technique_mut(tid);
                let index = tech.add_pass(name.as_str());
                if let Some(vp) = self.current_variant_pass.clone() {
                    tech.add_variant_pass(vp).register(name.as_str(), index);
                }
                self.current_pass = Some(index);
                self.in_variant_block = true;
            }
            Pending::Pass(name) => {
                let tid = self.require_technique()?;
                let index = self.effect.technique_mut(tid).add_pass(name.as_str());
                self.current_pass = Some(index);
                self.in_variant_block = false;
            }
            Pending::Layout => {
                self.layout_target = self.layout_target_shader();
            }
            Pending::HitGroup(name) => {
                let (tid, pi) = self.require_pass()?;
                if let Some(pass) = self.effect.technique_mut(tid).pass_mut(pi) {
                    pass.hit_groups.entry(name.clone()).or_default();
                }
                self.current_hit_group = Some(name);
            }
            Pending::MissShaders | Pending::CallableShaders | Pending::RaytracingConfig => {}
        }
        Ok(())
    }

    fn close_block(&mut self) -> Result<(), LoadError> {
        let ctx = CloseContext {
            in_group: self.group_name.is_some(),
            in_variant_block: self.in_variant_block,
        };
        let closing = self.level;
        self.level = self.level.close(ctx).map_err(|m| self.structural_msg(m))?;

        match closing {
            Level::Pass => {
                if let Ok((tid, pi)) = self.require_pass() {
                    let tech = self.effect.technique_ref(tid);
                    if let Some(pass) = tech.pass(pi) {
                        if !pass.has_shaders() {
                            self.diags.warn(
                                format!("pass:empty:{}:{}", tech.name, pass.name),
                                self.line_no,
                                format!(
                                    "pass {:?} in technique {:?} has no shaders attached",
                                    pass.name, tech.name
                                ),
                            );
                        }
                    }
                }
                self.current_pass = None;
                self.in_variant_block = false;
            }
            Level::VariantPass => self.current_variant_pass = None,
            Level::Technique => self.current_technique = None,
            Level::HitGroup => self.current_hit_group = None,
            Level::Layout => self.layout_target = None,
            _ => {}
        }
        if self.level == Level::Outside {
            self.group_name = None;
        }
        Ok(())
    }

    // ── Level handlers ────────────────────────────────────────────────────

    fn handle_outside(&mut self, line: &str) -> Result<(), LoadError> {
        let (keyword, rest) = split_keyword(line);
        match keyword {
            "group" => self.pending = Some(Pending::Group(block_name(rest).to_string())),
            "technique" => self.pending = Some(Pending::Technique(block_name(rest).to_string())),
            "texture" => self.declare_texture(rest)?,
            "accelerationstructure" => {
                let (name, rest) = split_keyword(rest);
                let slot = self.parse_u32(rest.split_whitespace().next().unwrap_or(""))?;
                self.effect.resources.declare(name, slot, ResourceKind::AccelerationStructure);
            }
            "constantbuffer" => {
                let (name, rest) = split_keyword(rest);
                let slot = self.parse_u32(rest.split_whitespace().next().unwrap_or(""))?;
                self.effect.resources.declare(name, slot, ResourceKind::ConstantBuffer);
            }
            "SamplerState" => self.declare_sampler(rest)?,
            "BlendState" => self.declare_render_state(RenderStateKind::Blend, rest)?,
            "DepthStencilState" => {
                self.declare_render_state(RenderStateKind::DepthStencil, rest)?
            }
            "RasterizerState" => self.declare_render_state(RenderStateKind::Rasterizer, rest)?,
            "RenderTargetFormatState" => {
                self.declare_render_state(RenderStateKind::TargetFormat, rest)?
            }
            other => {
                return Err(self.structural_msg(format!(
                    "unknown top-level directive {other:?}"
                )));
            }
        }
        Ok(())
    }

    fn handle_group(&mut self, line: &str) -> Result<(), LoadError> {
        let (keyword, rest) = split_keyword(line);
        match keyword {
            "technique" => {
                self.pending = Some(Pending::Technique(block_name(rest).to_string()));
                Ok(())
            }
            other => Err(self.structural_msg(format!(
                "unknown directive {other:?} inside group (expected technique)"
            ))),
        }
    }

    fn handle_technique(&mut self, line: &str) -> Result<(), LoadError> {
        let (keyword, rest) = split_keyword(line);
        match keyword {
            // A declared pass index, if present, is ignored: indices are
            // always assigned densely in declaration order.
            "pass" => {
                self.pending = Some(Pending::Pass(block_name(rest).to_string()));
                Ok(())
            }
            "variant_pass" => {
                self.pending = Some(Pending::VariantPass(block_name(rest).to_string()));
                Ok(())
            }
            other => Err(self.structural_msg(format!(
                "unknown directive {other:?} inside technique (expected pass or variant_pass)"
            ))),
        }
    }

    fn handle_variant_pass(&mut self, line: &str) -> Result<(), LoadError> {
        let (keyword, rest) = split_keyword(line);
        match keyword {
            "variant" => {
                self.pending = Some(Pending::Variant(block_name(rest).to_string()));
                Ok(())
            }
            other => Err(self.structural_msg(format!(
                "unknown directive {other:?} inside variant_pass (expected variant)"
            ))),
        }
    }

    fn handle_pass(&mut self, line: &str) -> Result<(), LoadError> {
        let (keyword, rest) = split_keyword(line);
        match keyword.trim_end_matches(':') {
            "blend" => self.set_pass_state(RenderStateKind::Blend, unquote(rest)),
            "rasterizer" => self.set_pass_state(RenderStateKind::Rasterizer, unquote(rest)),
            "depthstencil" => self.set_pass_state(RenderStateKind::DepthStencil, unquote(rest)),
            "targetformat" => self.set_pass_state(RenderStateKind::TargetFormat, unquote(rest)),
            "topology" => {
                let topology = first_token(rest).to_string();
                self.with_pass(|p| p.topology = Some(topology))
            }
            "multiview" => {
                let v = self.parse_u32(first_token(rest))?;
                self.with_pass(|p| p.multiview = v != 0)
            }
            "numthreads" => {
                let mut it = rest.split_whitespace();
                let x = self.parse_u32(it.next().unwrap_or(""))?;
                let y = self.parse_u32(it.next().unwrap_or(""))?;
                let z = self.parse_u32(it.next().unwrap_or(""))?;
                self.with_pass(|p| p.num_threads = [x, y, z])
            }
            "maxpayloadsize" | "maxattributesize" | "maxtracerecursiondepth" => {
                self.handle_raytracing_config(line)
            }
            "layout" => {
                self.pending = Some(Pending::Layout);
                Ok(())
            }
            "hitgroup" => {
                self.pending = Some(Pending::HitGroup(block_name(rest).to_string()));
                Ok(())
            }
            "missshaders" => {
                self.pending = Some(Pending::MissShaders);
                Ok(())
            }
            "callableshaders" => {
                self.pending = Some(Pending::CallableShaders);
                Ok(())
            }
            "raytracingconfig" => {
                self.pending = Some(Pending::RaytracingConfig);
                Ok(())
            }
            _ => self.handle_stage_line(line, &[
                StageKind::Vertex,
                StageKind::Geometry,
                StageKind::Pixel,
                StageKind::Compute,
                StageKind::RayGeneration,
            ]),
        }
    }

    fn handle_raytracing_config(&mut self, line: &str) -> Result<(), LoadError> {
        let (keyword, rest) = split_keyword(line);
        let value = self.parse_u32(first_token(rest))?;
        match keyword.trim_end_matches(':') {
            "maxpayloadsize" => self.with_pass(|p| p.max_payload_size = value),
            "maxattributesize" => self.with_pass(|p| p.max_attribute_size = value),
            "maxtracerecursiondepth" => self.with_pass(|p| p.max_trace_recursion_depth = value),
            other => Err(self.structural_msg(format!(
                "unknown raytracing config directive {other:?}"
            ))),
        }
    }

    fn handle_layout(&mut self, line: &str) -> Result<(), LoadError> {
        let mut it = line.split_whitespace();
        let format = it.next().unwrap_or("").to_string();
        let byte_offset = self.parse_u32(it.next().unwrap_or(""))?;
        let input_slot = self.parse_u32(it.next().unwrap_or(""))?;
        if let Some(id) = self.layout_target {
            self.effect
                .shader_mut(id)
                .layout
                .push(LayoutElement { format, byte_offset, input_slot });
        }
        Ok(())
    }

    // ── Shader-stage lines ────────────────────────────────────────────────

    fn handle_stage_line(&mut self, line: &str, allowed: &[StageKind]) -> Result<(), LoadError> {
        let Some((head, rest)) = line.split_once(':') else {
            return Err(self.structural_msg(format!(
                "expected a shader-stage line or known directive, got {line:?}"
            )));
        };
        let head = head.trim();

        // `pixel(rgba16f)` carries the render-target format the shader was
        // compiled for.
        let (stage_word, output_format) = match head.split_once('(') {
            Some((word, fmt)) => (word.trim(), Some(fmt.trim_end_matches(')').to_string())),
            None => (head, None),
        };
        let stage = allowed
            .iter()
            .copied()
            .find(|s| s.keyword() == stage_word || (*s == StageKind::RayGeneration && stage_word == "raygeneration"))
            .ok_or_else(|| {
                self.structural_msg(format!(
                    "stage keyword {stage_word:?} is not valid at {:?} level",
                    self.level
                ))
            })?;

        let rest = rest.trim();
        let file_ref = first_token(rest).trim_end_matches(',');
        if file_ref.is_empty() {
            return Err(self.structural_msg(format!("missing shader filename after {stage_word}:")));
        }
        let (filename, entry) = match file_ref.split_once('(') {
            Some((f, e)) => (f.to_string(), e.trim_end_matches([')', ',']).to_string()),
            None => (file_ref.to_string(), "main".to_string()),
        };

        // Optional `inline:(0xOFF,0xLEN)` reference into the companion
        // binary; everything after it is the usage annotation.
        let tail = &rest[file_ref_end(rest, file_ref)..];
        let mut inline_ref = None;
        let mut annotation = tail;
        for tok in tail.split_whitespace() {
            if tok.trim_matches(',').is_empty() {
                continue;
            }
            if let Some(args) = tok.trim_end_matches(',').strip_prefix("inline:(") {
                inline_ref = Some(self.parse_inline_args(args.trim_end_matches(')'))?);
                let pos = tail.find(tok).unwrap_or(0);
                annotation = &tail[pos + tok.len()..];
            }
            break;
        }

        // Hit shaders are only meaningful under a named hit group.
        let hit_stage = matches!(
            stage,
            StageKind::ClosestHit | StageKind::AnyHit | StageKind::Intersection
        );
        if hit_stage && self.current_hit_group.is_none() {
            return Err(self.structural_msg("hit shader outside a hitgroup block"));
        }
        let (tid, pi) = self.require_pass()?;

        let key = ShaderKey { filename: filename.clone(), entry: entry.clone(), stage };
        let id = match self.effect.find_shader(&key) {
            Some(id) => id,
            None => {
                let handle = match inline_ref {
                    Some((offset, length)) => {
                        let bytes = self
                            .inline
                            .resolve(&mut *self.backend, offset, length)?
                            .to_vec();
                        self.effect.binary_path = Some(self.inline.path().to_string());
                        self.backend
                            .create_shader_inline(&filename, &entry, stage, &bytes)
                            .map_err(|m| self.backend_err(m))?
                    }
                    None => self
                        .backend
                        .create_shader(&filename, &entry, stage)
                        .map_err(|m| self.backend_err(m))?,
                };
                self.effect.add_shader(Shader::new(key, handle))
            }
        };

        // Extract usage; shader adoption is first-writer-wins per category,
        // while the pass aggregation below always unions this occurrence.
        let usage = UsageSets::parse(annotation, self.line_no, &mut self.diags);
        self.effect.shader_mut(id).adopt_usage(&usage);
        self.resolve_samplers(id);

        let hit_group = self.current_hit_group.clone();
        let line_no = self.line_no;
        let pass = self
            .effect
            .technique_mut(tid)
            .pass_mut(pi)
            .ok_or(LoadError::Structural {
                line: line_no,
                message: "shader-stage line outside any pass".into(),
            })?;
        pass.fold_usage(&usage);

        match (stage, hit_group, output_format) {
            (StageKind::ClosestHit, Some(hg_name), _) => {
                pass.hit_groups.entry(hg_name).or_default().closest_hit = Some(id);
            }
            (StageKind::AnyHit, Some(hg_name), _) => {
                pass.hit_groups.entry(hg_name).or_default().any_hit = Some(id);
            }
            (StageKind::Intersection, Some(hg_name), _) => {
                pass.hit_groups.entry(hg_name).or_default().intersection = Some(id);
            }
            (StageKind::Miss, _, _) => {
                pass.miss_shaders.insert(entry, id);
            }
            (StageKind::Callable, _, _) => {
                pass.callable_shaders.insert(entry, id);
            }
            (StageKind::Pixel, _, Some(format)) => {
                pass.pixel_by_output_format.insert(format, id);
            }
            _ => pass.set_shader(stage, id),
        }
        Ok(())
    }

    /// Slot-to-sampler resolution: runs after the shader's usage is
    /// populated and before anything else sees it. Materialized slots are
    /// cleared from the shader's sampler set only; the pass keeps them.
    fn resolve_samplers(&mut self, id: ShaderId) {
        let slots = self.effect.shader(id).slots(SlotCategory::Sampler).to_indices();
        for slot in slots {
            let slot = slot as u32;
            match self.effect.sampler_at_slot(slot) {
                Some(handle) => {
                    let shader = self.effect.shader_mut(id);
                    shader.samplers.insert(slot, handle);
                    shader.clear_sampler_slot(slot);
                }
                None => self.diags.warn(
                    format!("sampler:slot:{slot}"),
                    self.line_no,
                    format!("no sampler state registered at slot {slot}"),
                ),
            }
        }
    }

    fn parse_inline_args(&self, args: &str) -> Result<(u64, u64), LoadError> {
        let mut parts = args.split(',');
        let offset = parse_hex(parts.next().unwrap_or(""));
        let length = parse_hex(parts.next().unwrap_or(""));
        match (offset, length) {
            (Some(o), Some(l)) => Ok((o, l)),
            _ => Err(LoadError::Structural {
                line: self.line_no,
                message: format!("malformed inline reference ({args})"),
            }),
        }
    }

    // ── Declarations ──────────────────────────────────────────────────────

    fn declare_texture(&mut self, rest: &str) -> Result<(), LoadError> {
        let mut it = rest.split_whitespace();
        let name = it.next().unwrap_or("");
        if name.is_empty() {
            return Err(self.structural_msg("texture directive needs a name"));
        }
        let slot = self.parse_u32(it.next().unwrap_or(""))?;
        let dim = it.next().unwrap_or("2d");
        let Some(shape) = TextureShape::from_token(dim) else {
            return Err(self.structural_msg(format!("unknown texture dimension {dim:?}")));
        };
        let mut multisample = dim.ends_with("ms");
        let mut array = false;
        let mut read_write = false;
        for flag in it {
            match flag {
                "ms" => multisample = true,
                "array" => array = true,
                "read_write" => read_write = true,
                other => self.diags.warn(
                    format!("texture:flag:{other}"),
                    self.line_no,
                    format!("unknown texture qualifier {other:?}, ignoring"),
                ),
            }
        }
        self.effect.resources.declare(
            name,
            slot,
            ResourceKind::Texture { shape, array, multisample, read_write },
        );
        Ok(())
    }

    fn declare_sampler(&mut self, rest: &str) -> Result<(), LoadError> {
        let (name, rest) = split_keyword(rest);
        if name.is_empty() {
            return Err(self.structural_msg("SamplerState directive needs a name"));
        }
        let (slot_tok, description) = split_keyword(rest);
        let slot = self.parse_u32(slot_tok)?;
        let description = (!description.is_empty()).then_some(description);
        match self.backend.get_or_create_sampler_state(name, description) {
            Ok(handle) => {
                self.effect.resources.declare(name, slot, ResourceKind::Sampler);
                self.effect.register_sampler(slot, handle);
            }
            Err(m) => self.diags.warn(
                format!("sampler:create:{name}"),
                self.line_no,
                format!("backend rejected sampler state {name:?}: {m}"),
            ),
        }
        Ok(())
    }

    fn declare_render_state(
        &mut self,
        kind: RenderStateKind,
        rest: &str,
    ) -> Result<(), LoadError> {
        let (name, description) = split_keyword(rest);
        if name.is_empty() {
            return Err(self.structural_msg(format!("{kind:?} state directive needs a name")));
        }
        match self.backend.create_render_state(kind, name, description) {
            Ok(handle) => self.effect.register_render_state(kind, name, handle),
            Err(m) => self.diags.warn(
                format!("state:create:{kind:?}:{name}"),
                self.line_no,
                format!("backend rejected {kind:?} state {name:?}: {m}"),
            ),
        }
        Ok(())
    }

    /// Resolves a `blend NAME`-family reference against the named states
    /// registered so far. Unresolved names are non-fatal: the field stays
    /// unset.
    fn set_pass_state(&mut self, kind: RenderStateKind, name: &str) -> Result<(), LoadError> {
        match self.effect.render_state(kind, name) {
            Some(handle) => self.with_pass(|p| match kind {
                RenderStateKind::Blend => p.blend_state = Some(handle),
                RenderStateKind::DepthStencil => p.depth_state = Some(handle),
                RenderStateKind::Rasterizer => p.rasterizer_state = Some(handle),
                RenderStateKind::TargetFormat => p.target_format_state = Some(handle),
            }),
            None => {
                self.diags.warn(
                    format!("state:unresolved:{kind:?}:{name}"),
                    self.line_no,
                    format!("unresolved {kind:?} state reference {name:?}"),
                );
                Ok(())
            }
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn layout_target_shader(&mut self) -> Option<ShaderId> {
        let (tid, pi) = self.require_pass().ok()?;
        let pass = self.effect.technique_ref(tid).pass(pi)?;
        let id = match pass.shader(StageKind::Vertex) {
            Some(id) => id,
            None => {
                self.diags.warn(
                    format!("layout:no-vertex:{}", pass.name),
                    self.line_no,
                    format!("layout block in pass {:?} before any vertex shader", pass.name),
                );
                return None;
            }
        };
        // A de-duplicated shader keeps its first layout.
        if self.effect.shader(id).layout.is_empty() { Some(id) } else { None }
    }

    fn with_pass(
        &mut self,
        f: impl FnOnce(&mut crate::pass::EffectPass),
    ) -> Result<(), LoadError> {
        let (tid, pi) = self.require_pass()?;
        let line = self.line_no;
        let pass = self.effect.technique_mut(tid).pass_mut(pi).ok_or_else(|| {
            LoadError::Structural { line, message: "directive outside any pass".into() }
        })?;
        f(pass);
        Ok(())
    }

    fn require_technique(&self) -> Result<TechniqueId, LoadError> {
        self.current_technique.ok_or_else(|| LoadError::Structural {
            line: self.line_no,
            message: "directive outside any technique".into(),
        })
    }

    fn require_pass(&self) -> Result<(TechniqueId, usize), LoadError> {
        match (self.current_technique, self.current_pass) {
            (Some(t), Some(p)) => Ok((t, p)),
            _ => Err(LoadError::Structural {
                line: self.line_no,
                message: "directive outside any pass".into(),
            }),
        }
    }

    fn parse_u32(&self, token: &str) -> Result<u32, LoadError> {
        token.parse().map_err(|_| LoadError::Structural {
            line: self.line_no,
            message: format!("expected a non-negative integer, got {token:?}"),
        })
    }

    fn structural(&self, message: &str) -> LoadError {
        self.structural_msg(message.to_string())
    }

    fn structural_msg(&self, message: impl Into<String>) -> LoadError {
        let message = message.into();
        log::error!("line {}: {message}", self.line_no);
        LoadError::Structural { line: self.line_no, message }
    }

    fn backend_err(&self, message: String) -> LoadError {
        LoadError::Backend { line: self.line_no, message }
    }
}

// ── Lexical helpers ───────────────────────────────────────────────────────

/// Drops a `//` comment, leaving the payload.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Splits a line into its leading keyword and the trimmed remainder.
fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((k, rest)) => (k, rest.trim()),
        None => (line, ""),
    }
}

fn first_token(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Strips one pair of surrounding double quotes, if present.
fn unquote(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// A block name: either a quoted string (which may be empty or contain
/// spaces) or the first bare token. Anything after it, such as a declared
/// pass index, is ignored.
fn block_name(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix('"') {
        if let Some(end) = stripped.find('"') {
            return &stripped[..end];
        }
    }
    first_token(text)
}

/// Byte offset in `rest` just past the filename token.
fn file_ref_end(rest: &str, file_ref: &str) -> usize {
    rest.find(file_ref).map(|i| i + file_ref.len()).unwrap_or(0)
}

fn parse_hex(token: &str) -> Option<u64> {
    let token = token.trim();
    let digits = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}
