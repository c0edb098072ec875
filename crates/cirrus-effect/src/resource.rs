//! The resource catalog: every texture, sampler, constant buffer, and
//! acceleration structure declared by name in an effect description.

use std::collections::HashMap;

// ── Kinds ─────────────────────────────────────────────────────────────────

/// Base shape of a declared texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureShape {
    D1,
    D2,
    D3,
    Cube,
}

impl TextureShape {
    /// Parses the fixed dimension vocabulary of `texture` directives.
    pub fn from_token(token: &str) -> Option<TextureShape> {
        // An `ms` suffix folds into the multisample flag, not the shape.
        match token.trim_end_matches("ms") {
            "1d" => Some(TextureShape::D1),
            "2d" => Some(TextureShape::D2),
            "3d" => Some(TextureShape::D3),
            "cubemap" => Some(TextureShape::Cube),
            _ => None,
        }
    }

    /// Sampling dimensionality (cube maps take a 3D direction).
    pub fn dimensionality(self) -> u8 {
        match self {
            TextureShape::D1 => 1,
            TextureShape::D2 => 2,
            TextureShape::D3 => 3,
            TextureShape::Cube => 3,
        }
    }
}

/// What a named resource is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Texture {
        shape: TextureShape,
        array: bool,
        multisample: bool,
        read_write: bool,
    },
    Sampler,
    ConstantBuffer,
    AccelerationStructure,
}

impl ResourceKind {
    pub fn is_read_write_texture(self) -> bool {
        matches!(self, ResourceKind::Texture { read_write: true, .. })
    }
}

// ── ShaderResource ────────────────────────────────────────────────────────

/// One named resource declaration. Owned by the catalog for the lifetime of
/// the effect; looked up by exact name.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderResource {
    pub name: String,
    pub slot: u32,
    /// 0 for samplers/constant buffers/acceleration structures, 1–3 for
    /// textures.
    pub dimensionality: u8,
    pub kind: ResourceKind,
}

// ── ResourceCatalog ───────────────────────────────────────────────────────

/// Name → descriptor table for every declared resource.
///
/// Duplicate declarations overwrite the prior entry for that name; the
/// source format treats redeclaration as benign and so do we. Only plain
/// (non-read-write) textures are additionally indexed by slot for reverse
/// lookup.
#[derive(Debug, Default)]
pub struct ResourceCatalog {
    by_name: HashMap<String, ShaderResource>,
    texture_by_slot: HashMap<u32, String>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, slot: u32, kind: ResourceKind) {
        let name = name.into();
        let dimensionality = match kind {
            ResourceKind::Texture { shape, .. } => shape.dimensionality(),
            _ => 0,
        };
        if matches!(kind, ResourceKind::Texture { read_write: false, .. }) {
            self.texture_by_slot.insert(slot, name.clone());
        }
        self.by_name.insert(
            name.clone(),
            ShaderResource { name, slot, dimensionality, kind },
        );
    }

    pub fn lookup(&self, name: &str) -> Option<&ShaderResource> {
        self.by_name.get(name)
    }

    pub fn slot_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|r| r.slot)
    }

    /// Reverse lookup for plain textures only.
    pub fn texture_at_slot(&self, slot: u32) -> Option<&ShaderResource> {
        self.texture_by_slot.get(&slot).and_then(|n| self.by_name.get(n))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderResource> {
        self.by_name.values()
    }
}
