//! Loader and resource-binding model for the **Cirrus shader-effect
//! description format** (`.cfx`).
//!
//! A `.cfx` file describes render techniques: passes, shader stage
//! assignments, fixed-function state references, and — critically — the
//! numeric slot contract between each shader stage and the resources it
//! consumes. Binding mistakes silently corrupt rendering or crash GPU
//! drivers, so the loader doubles as a static binding verifier: every pass
//! ends up with the exact set of slots draw-time code must bind, per
//! resource category.
//!
//! The crate is GPU-free. Concrete backends sit behind [`EffectBackend`],
//! which supplies platform identity, file access, and render-state /
//! shader / sampler creation; [`NullBackend`] stands in for offline
//! validation and tooling.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`slots`] | `SlotCategory`, `SlotSet` |
//! | [`usage`] | `UsageSets` annotation extractor |
//! | [`resource`] | `ShaderResource`, `ResourceCatalog` |
//! | [`shader`] | `StageKind`, `Shader` |
//! | [`pass`] | `EffectPass`, `HitGroup`, `EffectVariantPass` |
//! | [`technique`] | `EffectTechnique`, `EffectTechniqueGroup` |
//! | [`effect`] | `Effect`, `LoadedEffect`, the `load` entry point |
//! | [`level`] | block-nesting state machine |
//! | [`parser`] | `parse_str` entry point |
//! | [`inline`] | companion-binary resolver |
//! | [`backend`] | `EffectBackend`, handles, `NullBackend` |
//! | [`error`] | `LoadError`, `Diagnostic` |
//!
//! # Quick start
//!
//! ```rust
//! use cirrus_effect::{NullBackend, parse_str};
//!
//! let src = r#"platform vulkan
//! technique "wisps" {
//!     pass "draw" {
//!         vertex: wisps.vs(main), c:(0)
//!         pixel: wisps.ps(main), t:(0,1)
//!     }
//! }"#;
//!
//! let mut backend = NullBackend::new("vulkan");
//! let loaded = parse_str(src, "wisps.cfx", &mut backend).unwrap();
//! let tech = loaded.effect.technique("wisps").unwrap();
//! assert_eq!(tech.pass_count(), 1);
//! ```
//!
//! # Loading and reloading
//!
//! [`Effect::load`] reads the description through the backend and parses it
//! in one synchronous pass on the calling thread. The resulting object
//! graph is exclusively owned by the call until it returns; reloading (for
//! example after a device reset) means dropping the old [`Effect`] and
//! loading again — there is no incremental patch path.

pub mod backend;
pub mod effect;
pub mod error;
pub mod inline;
pub mod level;
pub mod parser;
pub mod pass;
pub mod resource;
pub mod shader;
pub mod slots;
pub mod technique;
pub mod usage;

pub use backend::{
    EffectBackend, NullBackend, RenderStateHandle, RenderStateKind, SamplerHandle, ShaderHandle,
};
pub use effect::{Effect, LoadedEffect};
pub use error::{Diagnostic, LoadError};
pub use parser::parse_str;
pub use pass::{EffectPass, EffectVariantPass, HitGroup};
pub use resource::{ResourceCatalog, ResourceKind, ShaderResource, TextureShape};
pub use shader::{Shader, StageKind};
pub use slots::{SlotCategory, SlotSet};
pub use technique::{EffectTechnique, EffectTechniqueGroup};
pub use usage::UsageSets;

#[cfg(test)]
mod load_tests {
    use std::collections::HashMap;

    use super::*;

    // ── Recording backend ─────────────────────────────────────────────────

    /// Serves files from memory and records every backend call, so tests
    /// never touch the filesystem and can assert on what the loader asked
    /// for.
    struct MemoryBackend {
        platform: String,
        files: HashMap<String, Vec<u8>>,
        read_log: Vec<String>,
        /// (filename, entry, stage, inline bytecode if any)
        shaders: Vec<(String, String, StageKind, Option<Vec<u8>>)>,
        next_handle: u64,
    }

    impl MemoryBackend {
        fn new(platform: &str) -> Self {
            Self {
                platform: platform.to_string(),
                files: HashMap::new(),
                read_log: Vec::new(),
                shaders: Vec::new(),
                next_handle: 1,
            }
        }

        fn with_file(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
            self.files.insert(name.to_string(), bytes.into());
            self
        }

        fn reads_of(&self, name: &str) -> usize {
            self.read_log.iter().filter(|n| n.as_str() == name).count()
        }

        fn next(&mut self) -> u64 {
            let h = self.next_handle;
            self.next_handle += 1;
            h
        }
    }

    impl EffectBackend for MemoryBackend {
        fn platform_name(&self) -> &str {
            &self.platform
        }

        fn read_file(&mut self, name: &str) -> std::io::Result<Vec<u8>> {
            self.read_log.push(name.to_string());
            self.files.get(name).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string())
            })
        }

        fn create_render_state(
            &mut self,
            _kind: RenderStateKind,
            _name: &str,
            _description: &str,
        ) -> Result<RenderStateHandle, String> {
            Ok(RenderStateHandle(self.next()))
        }

        fn create_shader(
            &mut self,
            filename: &str,
            entry: &str,
            stage: StageKind,
        ) -> Result<ShaderHandle, String> {
            self.shaders.push((filename.into(), entry.into(), stage, None));
            Ok(ShaderHandle(self.next()))
        }

        fn create_shader_inline(
            &mut self,
            filename: &str,
            entry: &str,
            stage: StageKind,
            bytecode: &[u8],
        ) -> Result<ShaderHandle, String> {
            self.shaders
                .push((filename.into(), entry.into(), stage, Some(bytecode.to_vec())));
            Ok(ShaderHandle(self.next()))
        }

        fn get_or_create_sampler_state(
            &mut self,
            _name: &str,
            _description: Option<&str>,
        ) -> Result<SamplerHandle, String> {
            Ok(SamplerHandle(self.next()))
        }
    }

    fn parse(src: &str) -> LoadedEffect {
        let mut backend = MemoryBackend::new("vulkan");
        parse_str(src, "fx.cfx", &mut backend).unwrap()
    }

    // ── Scenarios ─────────────────────────────────────────────────────────

    #[test]
    fn scenario_minimal_pass_layout() {
        let loaded = parse(
            r#"platform vulkan
group "" {
    technique "t" {
        pass "p" {
            vertex: a.vs(main), t:(0)
            pixel: a.ps(main), t:(1), s:(0)
        }
    }
}"#,
        );
        let fx = &loaded.effect;
        assert_eq!(fx.technique_count(), 1);
        let tech = fx.technique("t").unwrap();
        let pass = tech.pass(0).unwrap();
        assert_eq!(pass.name, "p");
        assert_eq!(pass.index, 0);
        assert_eq!(pass.resource_slots(SlotCategory::TextureRead), &[0, 1]);
        assert_eq!(pass.resource_slots(SlotCategory::Sampler), &[0]);
        assert!(pass.uses_slot(SlotCategory::TextureRead, 0));
        assert!(pass.uses_slot(SlotCategory::TextureRead, 1));
        assert!(!pass.uses_slot(SlotCategory::TextureRead, 2));
        assert!(pass.uses_slot(SlotCategory::Sampler, 0));
    }

    #[test]
    fn scenario_inline_binary_opened_once() {
        let mut binary = vec![0u8; 0x40];
        for (i, b) in binary.iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut backend = MemoryBackend::new("vulkan").with_file("fx.cfxb", binary.clone());
        let src = r#"platform vulkan
technique "t" {
    pass "p" {
        vertex: a.vs(main) inline:(0x10,0x20), t:(0)
        pixel: b.ps(main) inline:(0x00,0x10)
    }
}"#;
        let loaded = parse_str(src, "fx.cfx", &mut backend).unwrap();
        assert_eq!(backend.reads_of("fx.cfxb"), 1);
        assert_eq!(loaded.effect.binary_path.as_deref(), Some("fx.cfxb"));

        let (_, _, _, bytecode) = &backend.shaders[0];
        assert_eq!(bytecode.as_deref(), Some(&binary[0x10..0x30]));
        let (_, _, _, bytecode) = &backend.shaders[1];
        assert_eq!(bytecode.as_deref(), Some(&binary[0x00..0x10]));
    }

    #[test]
    fn no_inline_reference_never_opens_binary() {
        let mut backend = MemoryBackend::new("vulkan");
        let src = "platform vulkan\ntechnique \"t\" {\n pass \"p\" {\n vertex: a.vs(main)\n }\n}\n";
        let loaded = parse_str(src, "fx.cfx", &mut backend).unwrap();
        assert_eq!(backend.reads_of("fx.cfxb"), 0);
        assert!(loaded.effect.binary_path.is_none());
    }

    #[test]
    fn missing_binary_is_fatal_only_when_referenced() {
        let mut backend = MemoryBackend::new("vulkan");
        let src = r#"platform vulkan
technique "t" {
    pass "p" {
        vertex: a.vs(main) inline:(0x0,0x4)
    }
}"#;
        let err = parse_str(src, "fx.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::MissingBinary { .. }));
    }

    #[test]
    fn inline_range_out_of_bounds_is_fatal() {
        let mut backend = MemoryBackend::new("vulkan").with_file("fx.cfxb", vec![0u8; 8]);
        let src = r#"platform vulkan
technique "t" {
    pass "p" {
        vertex: a.vs(main) inline:(0x4,0x10)
    }
}"#;
        let err = parse_str(src, "fx.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::InlineOutOfRange { .. }));
    }

    #[test]
    fn scenario_variant_two_segment_lookup() {
        let loaded = parse(
            r#"platform vulkan
technique "t" {
    variant_pass "vp" {
        variant "a.x" {
            vertex: a.vs(main)
        }
        variant "b" {
            vertex: b.vs(main)
        }
    }
}"#,
        );
        let tech = loaded.effect.technique("t").unwrap();
        let vp = tech.variant_pass("vp").unwrap();
        assert_eq!(vp.len(), 2);

        let a = vp.find("a", Some("x")).unwrap();
        assert_eq!(tech.pass(a).unwrap().name, "a.x");
        assert_eq!(vp.find("a", Some("y")), None);
        assert_eq!(vp.find("b", None).map(|i| tech.pass(i).unwrap().name.as_str()), Some("b"));

        // Variant passes still occupy dense technique indices.
        assert_eq!(tech.pass_count(), 2);
        assert_eq!(tech.pass(0).unwrap().index, 0);
        assert_eq!(tech.pass(1).unwrap().index, 1);
    }

    #[test]
    fn scenario_unclosed_technique_is_structural() {
        let mut backend = MemoryBackend::new("vulkan");
        let src = "platform vulkan\ntechnique \"t\" {\n pass \"p\" {\n vertex: a.vs(main)\n }\n";
        let err = parse_str(src, "fx.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::Structural { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn platform_mismatch_is_recoverable() {
        let mut backend = MemoryBackend::new("d3d12");
        let err = parse_str("platform vulkan\n", "fx.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::PlatformMismatch { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn unknown_top_level_directive_is_structural() {
        let mut backend = MemoryBackend::new("vulkan");
        let err = parse_str("platform vulkan\nfrobnicate x\n", "fx.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::Structural { line: 2, .. }));
    }

    #[test]
    fn idempotent_reparse() {
        let src = r#"platform vulkan
group "sky" {
    technique "t" {
        pass "near" {
            vertex: a.vs(main), t:(0) c:(0)
            pixel: a.ps(main), t:(1,2), s:(0)
        }
        pass "far" {
            vertex: a.vs(main), t:(0)
            pixel: far.ps(main), t:(3)
        }
    }
}"#;
        let first = parse(src);
        let second = parse(src);
        for loaded in [&first, &second] {
            let tech = loaded.effect.technique("sky::t").unwrap();
            assert_eq!(tech.pass_count(), 2);
            assert_eq!(tech.pass_by_name("near").unwrap().index, 0);
            assert_eq!(tech.pass_by_name("far").unwrap().index, 1);
        }
        for i in 0..2 {
            let a = first.effect.technique("sky::t").unwrap().pass(i).unwrap();
            let b = second.effect.technique("sky::t").unwrap().pass(i).unwrap();
            for cat in SlotCategory::ALL {
                assert_eq!(a.resource_slots(cat), b.resource_slots(cat));
            }
        }
    }

    #[test]
    fn first_writer_wins_shader_but_pass_unions() {
        let loaded = parse(
            r#"platform vulkan
technique "t" {
    pass "p" {
        vertex: a.vs(main), t:(0)
    }
    pass "q" {
        vertex: a.vs(main), t:(5) s:(1)
    }
}"#,
        );
        let fx = &loaded.effect;
        let tech = fx.technique("t").unwrap();

        // Same filename+entry+stage: one shader object, first annotation
        // kept.
        assert_eq!(fx.shader_count(), 1);
        let p = tech.pass_by_name("p").unwrap();
        let vs = fx.shader(p.shader(StageKind::Vertex).unwrap());
        assert_eq!(vs.slots(SlotCategory::TextureRead).to_indices(), vec![0]);
        assert!(vs.slots(SlotCategory::Sampler).is_empty());

        // Each pass aggregates the annotation written on its own line.
        let q = tech.pass_by_name("q").unwrap();
        assert_eq!(q.resource_slots(SlotCategory::TextureRead), &[5]);
        assert_eq!(q.resource_slots(SlotCategory::Sampler), &[1]);
        assert_eq!(p.resource_slots(SlotCategory::TextureRead), &[0]);
    }

    #[test]
    fn rw_redirection_end_to_end() {
        let loaded = parse(
            r#"platform vulkan
technique "t" {
    pass "p" {
        compute: blur.cs(main), t:(1005) u:(5)
    }
}"#,
        );
        let pass = loaded.effect.technique("t").unwrap().pass(0).unwrap();
        assert!(pass.resource_slots(SlotCategory::TextureRead).is_empty());
        assert_eq!(pass.resource_slots(SlotCategory::TextureWrite), &[5]);
    }

    #[test]
    fn sampler_resolution_materializes_and_clears_shader_bits() {
        let loaded = parse(
            r#"platform vulkan
SamplerState wrapLinear 0 filter=linear wrap
technique "t" {
    pass "p" {
        pixel: a.ps(main), s:(0,7) t:(0)
    }
}"#,
        );
        let fx = &loaded.effect;
        let pass = fx.technique("t").unwrap().pass(0).unwrap();
        let ps = fx.shader(pass.shader(StageKind::Pixel).unwrap());

        // Slot 0 had a registered sampler: attached to the shader and
        // cleared from its set. Slot 7 had none: bit stays, diagnostic
        // emitted. The pass keeps both bits either way.
        assert!(ps.samplers.contains_key(&0));
        assert_eq!(ps.slots(SlotCategory::Sampler).to_indices(), vec![7]);
        assert_eq!(pass.resource_slots(SlotCategory::Sampler), &[0, 7]);
        assert!(loaded.diagnostics().iter().any(|d| d.message.contains("slot 7")));
    }

    #[test]
    fn unresolved_state_reference_is_soft() {
        let loaded = parse(
            r#"platform vulkan
BlendState additive src_alpha one
technique "t" {
    pass "p" {
        blend additive
        depthstencil missing
        vertex: a.vs(main)
    }
}"#,
        );
        let pass = loaded.effect.technique("t").unwrap().pass(0).unwrap();
        assert!(pass.blend_state.is_some());
        assert!(pass.depth_state.is_none());
        assert!(loaded.diagnostics().iter().any(|d| d.message.contains("missing")));
    }

    #[test]
    fn empty_pass_warns_but_stays_registered() {
        let loaded = parse(
            "platform vulkan\ntechnique \"t\" {\n pass \"p\" {\n }\n}\n",
        );
        let tech = loaded.effect.technique("t").unwrap();
        assert_eq!(tech.pass_count(), 1);
        assert!(loaded.diagnostics().iter().any(|d| d.message.contains("no shaders")));
    }

    #[test]
    fn pass_directives_and_layout() {
        let loaded = parse(
            r#"platform vulkan
technique "t" {
    pass "p" {
        vertex: a.vs(main), c:(0)
        layout {
            rgb32_float 0 0
            rg32_float 12 0
        }
        topology trianglestrip
        multiview 1
        numthreads 8 8 1
    }
}"#,
        );
        let fx = &loaded.effect;
        let pass = fx.technique("t").unwrap().pass(0).unwrap();
        assert_eq!(pass.topology.as_deref(), Some("trianglestrip"));
        assert!(pass.multiview);
        assert_eq!(pass.num_threads, [8, 8, 1]);

        let vs = fx.shader(pass.shader(StageKind::Vertex).unwrap());
        assert_eq!(vs.layout.len(), 2);
        assert_eq!(vs.layout[1].format, "rg32_float");
        assert_eq!(vs.layout[1].byte_offset, 12);
        assert_eq!(vs.layout[1].input_slot, 0);
    }

    #[test]
    fn raytracing_blocks() {
        let loaded = parse(
            r#"platform vulkan
technique "rt" {
    pass "trace" {
        raygen: trace.rgen(main), t:(0) u:(0)
        hitgroup "solid" {
            closesthit: hit.rchit(closest), c:(0)
            anyhit: hit.rahit(any)
        }
        missshaders {
            miss: sky.rmiss(skyMiss)
            miss: shadow.rmiss(shadowMiss)
        }
        callableshaders {
            callable: probe.rcall(probe)
        }
        raytracingconfig {
            maxpayloadsize: 32
            maxattributesize: 8
            maxtracerecursiondepth: 2
        }
    }
}"#,
        );
        let fx = &loaded.effect;
        let pass = fx.technique("rt").unwrap().pass(0).unwrap();
        assert!(pass.shader(StageKind::RayGeneration).is_some());

        let hg = pass.hit_groups.get("solid").unwrap();
        assert!(hg.closest_hit.is_some());
        assert!(hg.any_hit.is_some());
        assert!(hg.intersection.is_none());
        assert_eq!(fx.shader(hg.closest_hit.unwrap()).stage, StageKind::ClosestHit);

        assert_eq!(pass.miss_shaders.len(), 2);
        assert!(pass.miss_shaders.contains_key("skyMiss"));
        assert_eq!(pass.callable_shaders.len(), 1);
        assert_eq!(pass.max_payload_size, 32);
        assert_eq!(pass.max_attribute_size, 8);
        assert_eq!(pass.max_trace_recursion_depth, 2);

        // Hit and raygen usage all lands on the owning pass.
        assert_eq!(pass.resource_slots(SlotCategory::ConstantBuffer), &[0]);
        assert_eq!(pass.resource_slots(SlotCategory::TextureWrite), &[0]);
    }

    #[test]
    fn pixel_shader_by_output_format() {
        let loaded = parse(
            r#"platform vulkan
technique "t" {
    pass "p" {
        vertex: a.vs(main)
        pixel(rgba16f): a.ps(mainHdr), t:(0)
        pixel(rgba8): a.ps(mainLdr), t:(0)
    }
}"#,
        );
        let pass = loaded.effect.technique("t").unwrap().pass(0).unwrap();
        assert!(pass.shader(StageKind::Pixel).is_none());
        assert_eq!(pass.pixel_by_output_format.len(), 2);
        assert!(pass.pixel_by_output_format.contains_key("rgba16f"));
    }

    #[test]
    fn resource_declarations_reach_the_catalog() {
        let loaded = parse(
            r#"platform vulkan
texture cloudDensity 3 3d
texture shadowMap 7 2dms array
texture blurTarget 0 2d read_write
accelerationstructure sceneTlas 5
constantbuffer frameConstants 0
technique "t" {
    pass "p" {
        vertex: a.vs(main)
    }
}"#,
        );
        let fx = &loaded.effect;
        let density = fx.resource_by_name("cloudDensity").unwrap();
        assert_eq!(density.slot, 3);
        assert_eq!(density.dimensionality, 3);

        let shadow = fx.resource_by_name("shadowMap").unwrap();
        assert!(matches!(
            shadow.kind,
            ResourceKind::Texture { array: true, multisample: true, read_write: false, .. }
        ));

        assert!(fx.resource_by_name("blurTarget").unwrap().kind.is_read_write_texture());
        assert!(matches!(
            fx.resource_by_name("sceneTlas").unwrap().kind,
            ResourceKind::AccelerationStructure
        ));
        // Read-write textures stay out of the slot reverse index.
        assert!(fx.resources.texture_at_slot(0).is_none());
        assert_eq!(fx.resources.texture_at_slot(7).unwrap().name, "shadowMap");
    }

    #[test]
    fn load_reads_description_through_backend() {
        let src = "platform vulkan\ntechnique \"t\" {\n pass \"p\" {\n vertex: a.vs(main)\n }\n}\n";
        let mut backend = MemoryBackend::new("vulkan").with_file("fx.cfx", src.as_bytes().to_vec());
        let loaded = Effect::load("fx.cfx", &mut backend).unwrap();
        assert_eq!(backend.reads_of("fx.cfx"), 1);
        assert_eq!(loaded.effect.source_path, "fx.cfx");
        assert!(loaded.effect.technique("t").is_some());
    }

    #[test]
    fn missing_description_file_is_recoverable() {
        let mut backend = MemoryBackend::new("vulkan");
        let err = Effect::load("nope.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::FileRead { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn braces_on_their_own_lines() {
        let loaded = parse(
            "platform vulkan\ngroup \"g\"\n{\n technique \"t\"\n {\n  pass \"p\"\n  {\n   vertex: a.vs(main)\n  }\n }\n}\n",
        );
        assert!(loaded.effect.technique("g::t").is_some());
        assert_eq!(loaded.effect.technique_group("g").unwrap().technique_count(), 1);
    }

    #[test]
    fn stray_brace_is_structural() {
        let mut backend = MemoryBackend::new("vulkan");
        let err = parse_str("platform vulkan\n{\n", "fx.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::Structural { line: 2, .. }));

        let mut backend = MemoryBackend::new("vulkan");
        let err = parse_str("platform vulkan\n}\n", "fx.cfx", &mut backend).unwrap_err();
        assert!(matches!(err, LoadError::Structural { line: 2, .. }));
    }
}
