use thiserror::Error;

/// Reasons an identification check can reject a buffer.
///
/// Every variant is terminal for the check that produced it. Nothing in this
/// crate retries or substitutes a default value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentError {
    #[error("not an ELF file (bad magic number)")]
    NotElf,
    #[error("file too short to contain the ELF identification field")]
    InvalidLength,
    #[error("invalid ELF class byte")]
    InvalidFormat,
    #[error("invalid ELF data encoding byte")]
    InvalidEndianness,
    #[error("invalid ELF header version")]
    InvalidVersion,
}

pub type Result<T> = std::result::Result<T, IdentError>;
