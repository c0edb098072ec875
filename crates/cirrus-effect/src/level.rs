//! Block-nesting state of the format parser.
//!
//! The nesting rules of the format are a small pushdown automaton with a
//! few non-uniform transitions (every raytracing sub-block closes back to
//! the pass; a pass closes to its variant-pass block when it was opened by
//! a `variant` line). They are spelled out here as an explicit transition
//! table over a tagged state type so every legal move is named and every
//! illegal one is a structural error, rather than arithmetic on an integer
//! level.

// ── Level ─────────────────────────────────────────────────────────────────

/// Where the parser currently is in the block structure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Level {
    Outside,
    Group,
    Technique,
    VariantPass,
    Pass,
    Layout,
    HitGroup,
    MissShaders,
    CallableShaders,
    RaytracingConfig,
}

/// The construct a `{` opens, as named by the directive preceding it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockKind {
    Group,
    Technique,
    VariantPass,
    /// A `variant "name"` block inside a `variant_pass`; its body is a pass.
    Variant,
    Pass,
    Layout,
    HitGroup,
    MissShaders,
    CallableShaders,
    RaytracingConfig,
}

/// Context a close transition depends on.
#[derive(Debug, Copy, Clone, Default)]
pub struct CloseContext {
    /// The enclosing technique sits inside an explicit `group` block.
    pub in_group: bool,
    /// The closing pass was opened by a `variant` line.
    pub in_variant_block: bool,
}

impl Level {
    /// Transition for an opening brace introducing `kind`.
    pub fn open(self, kind: BlockKind) -> Result<Level, String> {
        use BlockKind as B;
        use Level as L;
        match (self, kind) {
            (L::Outside, B::Group) => Ok(L::Group),
            // A technique outside any group block lands in the default
            // (empty-name) group.
            (L::Outside | L::Group, B::Technique) => Ok(L::Technique),
            (L::Technique, B::Pass) => Ok(L::Pass),
            (L::Technique, B::VariantPass) => Ok(L::VariantPass),
            (L::VariantPass, B::Variant) => Ok(L::Pass),
            (L::Pass, B::Layout) => Ok(L::Layout),
            (L::Pass, B::HitGroup) => Ok(L::HitGroup),
            (L::Pass, B::MissShaders) => Ok(L::MissShaders),
            (L::Pass, B::CallableShaders) => Ok(L::CallableShaders),
            (L::Pass, B::RaytracingConfig) => Ok(L::RaytracingConfig),
            (level, kind) => Err(format!("{kind:?} block cannot open at {level:?} level")),
        }
    }

    /// Transition for a closing brace.
    pub fn close(self, ctx: CloseContext) -> Result<Level, String> {
        use Level as L;
        match self {
            L::Outside => Err("unbalanced '}' at top level".to_string()),
            L::Group => Ok(L::Outside),
            L::Technique => Ok(if ctx.in_group { L::Group } else { L::Outside }),
            L::VariantPass => Ok(L::Technique),
            L::Pass => Ok(if ctx.in_variant_block { L::VariantPass } else { L::Technique }),
            L::Layout
            | L::HitGroup
            | L::MissShaders
            | L::CallableShaders
            | L::RaytracingConfig => Ok(L::Pass),
        }
    }
}
