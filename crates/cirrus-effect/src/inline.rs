//! The inline-binary resolver.
//!
//! Shader-stage lines may reference bytecode embedded in a companion binary
//! artifact (`.cfxb`, same stem as the description file) by byte offset and
//! length. The artifact is opened at most once per load, on the first such
//! reference; a description with no inline references never touches it.

use std::path::Path;

use crate::backend::EffectBackend;
use crate::error::LoadError;

pub const BINARY_EXTENSION: &str = "cfxb";

#[derive(Debug)]
pub struct InlineBinary {
    path: String,
    data: Option<Vec<u8>>,
}

impl InlineBinary {
    /// Derives the companion artifact path from the description file path.
    pub fn for_source(source_path: &str) -> Self {
        let path = Path::new(source_path)
            .with_extension(BINARY_EXTENSION)
            .to_string_lossy()
            .into_owned();
        Self { path, data: None }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// True once the artifact has actually been read.
    pub fn opened(&self) -> bool {
        self.data.is_some()
    }

    /// Returns `[offset, offset + length)` of the artifact, reading it
    /// through the backend on first use. A missing artifact is fatal here
    /// and only here.
    pub fn resolve(
        &mut self,
        backend: &mut dyn EffectBackend,
        offset: u64,
        length: u64,
    ) -> Result<&[u8], LoadError> {
        if self.data.is_none() {
            let bytes = backend
                .read_file(&self.path)
                .map_err(|source| LoadError::MissingBinary { path: self.path.clone(), source })?;
            log::debug!("opened companion binary {} ({} bytes)", self.path, bytes.len());
            self.data = Some(bytes);
        }
        let data = self.data.as_deref().unwrap_or_default();

        match offset.checked_add(length) {
            Some(end) if end <= data.len() as u64 => {
                Ok(&data[offset as usize..end as usize])
            }
            _ => Err(LoadError::InlineOutOfRange {
                path: self.path.clone(),
                offset,
                length,
                size: data.len() as u64,
            }),
        }
    }
}
