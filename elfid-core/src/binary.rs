use crate::header::elf::{identify, Identification};
use anyhow::{Context, Result};
use std::io::Read;

pub struct Binary {
    pub path: String,
    pub size: usize,
    pub identification: Identification,
}

impl Binary {
    /// Reads the whole file and identifies it.
    ///
    /// I/O failures carry the path as context. Validation failures are the
    /// bare [`IdentError`](crate::IdentError) and can be recovered with
    /// `downcast_ref`.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .with_context(|| format!("failed to read {}", path.display()))?;

        log::info!("Loaded {} ({} bytes)", path.display(), buf.len());
        Self::from_bytes(path.display().to_string(), &buf)
    }

    pub fn from_bytes(path: impl Into<String>, buf: &[u8]) -> Result<Self> {
        let identification = identify(buf)?;

        Ok(Self {
            path: path.into(),
            size: buf.len(),
            identification,
        })
    }
}
