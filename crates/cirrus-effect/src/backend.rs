//! The backend collaborator boundary.
//!
//! The loader never talks to a graphics API. Everything a concrete backend
//! must provide — its identity string, file resolution, and creation of
//! render states / shaders / samplers — comes through [`EffectBackend`].
//! Returned handles are opaque to the loader; it only stores them on the
//! object graph for draw-time code to use.

use std::collections::HashMap;
use std::io;

use crate::shader::StageKind;

// ── Handles ───────────────────────────────────────────────────────────────

/// Opaque backend handle to a created render-state object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderStateHandle(pub u64);

/// Opaque backend handle to a created shader object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderHandle(pub u64);

/// Opaque backend handle to a sampler-state object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SamplerHandle(pub u64);

/// Which fixed-function state family a named state description belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderStateKind {
    Blend,
    DepthStencil,
    Rasterizer,
    TargetFormat,
}

// ── EffectBackend ─────────────────────────────────────────────────────────

/// Operations the loader delegates to the graphics backend.
///
/// State descriptions are passed through as the raw directive text; their
/// vocabulary belongs to the backend, not to the loader.
pub trait EffectBackend {
    /// Identity string validated against the description's platform line.
    fn platform_name(&self) -> &str;

    /// Resolves `name` against the backend's search paths and returns the
    /// file bytes. Used for the description file and, lazily, for the
    /// companion binary artifact.
    fn read_file(&mut self, name: &str) -> io::Result<Vec<u8>>;

    /// Creates a named fixed-function state object from its description.
    fn create_render_state(
        &mut self,
        kind: RenderStateKind,
        name: &str,
        description: &str,
    ) -> Result<RenderStateHandle, String>;

    /// Creates a shader object from a standalone shader file.
    fn create_shader(&mut self, filename: &str, entry: &str, stage: StageKind)
    -> Result<ShaderHandle, String>;

    /// Creates a shader object from bytecode sliced out of the companion
    /// binary artifact.
    fn create_shader_inline(
        &mut self,
        filename: &str,
        entry: &str,
        stage: StageKind,
        bytecode: &[u8],
    ) -> Result<ShaderHandle, String>;

    /// Returns the sampler registered under `name`, creating it from
    /// `description` when given.
    fn get_or_create_sampler_state(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<SamplerHandle, String>;
}

// ── NullBackend ───────────────────────────────────────────────────────────

/// A backend that accepts everything and hands out sequential handles.
///
/// Lets the loader run without a GPU: offline validation, binding-layout
/// dumps, tests. File reads are served from the host filesystem through the
/// configured search paths, tried in order.
#[derive(Debug)]
pub struct NullBackend {
    platform: String,
    search_paths: Vec<std::path::PathBuf>,
    next_handle: u64,
    samplers: HashMap<String, SamplerHandle>,
}

impl NullBackend {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            search_paths: vec![std::path::PathBuf::from(".")],
            next_handle: 1,
            samplers: HashMap::new(),
        }
    }

    /// Prepends a directory to the file search list.
    pub fn with_search_path(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.search_paths.insert(0, dir.into());
        self
    }

    fn next(&mut self) -> u64 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }
}

impl EffectBackend for NullBackend {
    fn platform_name(&self) -> &str {
        &self.platform
    }

    fn read_file(&mut self, name: &str) -> io::Result<Vec<u8>> {
        for dir in &self.search_paths {
            let candidate = dir.join(name);
            match std::fs::read(&candidate) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{name} not found on any search path"),
        ))
    }

    fn create_render_state(
        &mut self,
        kind: RenderStateKind,
        name: &str,
        _description: &str,
    ) -> Result<RenderStateHandle, String> {
        log::debug!("null backend: {kind:?} state {name:?}");
        Ok(RenderStateHandle(self.next()))
    }

    fn create_shader(
        &mut self,
        filename: &str,
        entry: &str,
        stage: StageKind,
    ) -> Result<ShaderHandle, String> {
        log::debug!("null backend: {stage:?} shader {filename}({entry})");
        Ok(ShaderHandle(self.next()))
    }

    fn create_shader_inline(
        &mut self,
        filename: &str,
        entry: &str,
        stage: StageKind,
        bytecode: &[u8],
    ) -> Result<ShaderHandle, String> {
        log::debug!(
            "null backend: inline {stage:?} shader {filename}({entry}), {} bytes",
            bytecode.len()
        );
        Ok(ShaderHandle(self.next()))
    }

    fn get_or_create_sampler_state(
        &mut self,
        name: &str,
        _description: Option<&str>,
    ) -> Result<SamplerHandle, String> {
        if let Some(&h) = self.samplers.get(name) {
            return Ok(h);
        }
        let h = SamplerHandle(self.next());
        self.samplers.insert(name.to_string(), h);
        Ok(h)
    }
}
