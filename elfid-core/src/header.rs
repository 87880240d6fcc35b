pub mod elf;

pub trait Header: std::fmt::Debug + Send + Sync {
    /// Returns a short human-readable name, e.g. "ELF".
    fn format_name(&self) -> &'static str;

    /// Returns true if this is a 64-bit binary.
    fn is_64(&self) -> bool;

    /// Returns true if multi-byte fields are stored least significant byte first.
    fn is_little_endian(&self) -> bool;
}
