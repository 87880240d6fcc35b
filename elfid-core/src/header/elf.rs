//! Checks against the 16-byte `e_ident` prefix of an ELF file.
//!
//! Each check reads a fixed offset and either decodes the byte or rejects it.
//! The checks are independent of one another; [`identify`] runs them in file
//! order and stops at the first failure.
//!
//! Reference: [ELF Specification v1.2](https://refspecs.linuxfoundation.org/elf/elf.pdf)

use crate::error::{IdentError, Result};
use crate::header::Header;
use goblin::elf::header::{
    EI_ABIVERSION, EI_CLASS, EI_DATA, EI_OSABI, EI_VERSION, ELFCLASS32, ELFCLASS64, ELFDATA2LSB,
    ELFDATA2MSB, ELFMAG, SELFMAG,
};
use std::fmt;

/// `EV_CURRENT`, the only header version ever published.
const EV_ORIGINAL: u8 = 1;

/// Word size of the target, from `e_ident[EI_CLASS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Elf32,
    Elf64,
}

impl Class {
    /// Human-readable word size, e.g. "64-bit (8-byte word)".
    pub fn as_str(&self) -> &'static str {
        match self {
            Class::Elf32 => "32-bit (4-byte word)",
            Class::Elf64 => "64-bit (8-byte word)",
        }
    }

    /// The `EI_CLASS` byte as stored in the file.
    pub fn raw(&self) -> u8 {
        match self {
            Class::Elf32 => ELFCLASS32,
            Class::Elf64 => ELFCLASS64,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte order of multi-byte fields, from `e_ident[EI_DATA]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Human-readable byte order, e.g. "Little Endian".
    pub fn as_str(&self) -> &'static str {
        match self {
            Endianness::Little => "Little Endian",
            Endianness::Big => "Big Endian",
        }
    }

    /// The `EI_DATA` byte as stored in the file.
    pub fn raw(&self) -> u8 {
        match self {
            Endianness::Little => ELFDATA2LSB,
            Endianness::Big => ELFDATA2MSB,
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header version, from `e_ident[EI_VERSION]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    Original,
}

impl Version {
    /// Human-readable header version, e.g. "1 (Original)".
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Original => "1 (Original)",
        }
    }

    /// The `EI_VERSION` byte as stored in the file.
    pub fn raw(&self) -> u8 {
        match self {
            Version::Original => EV_ORIGINAL,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system / ABI extensions, from `e_ident[EI_OSABI]`.
///
/// Values outside the table are kept as [`OsAbi::Unknown`]; this byte never
/// makes a buffer invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsAbi {
    SystemV,
    HpUx,
    NetBsd,
    Linux,
    Solaris,
    Aix,
    Irix,
    FreeBsd,
    Tru64,
    Modesto,
    OpenBsd,
    ArmAeabi,
    Arm,
    Standalone,
    Unknown(u8),
}

impl OsAbi {
    /// Maps an `EI_OSABI` byte; unlisted values become [`OsAbi::Unknown`].
    pub fn from_raw(value: u8) -> Self {
        match value {
            0 => OsAbi::SystemV,
            1 => OsAbi::HpUx,
            2 => OsAbi::NetBsd,
            3 => OsAbi::Linux,
            6 => OsAbi::Solaris,
            7 => OsAbi::Aix,
            8 => OsAbi::Irix,
            9 => OsAbi::FreeBsd,
            10 => OsAbi::Tru64,
            11 => OsAbi::Modesto,
            12 => OsAbi::OpenBsd,
            64 => OsAbi::ArmAeabi,
            97 => OsAbi::Arm,
            255 => OsAbi::Standalone,
            other => OsAbi::Unknown(other),
        }
    }

    /// The `EI_OSABI` byte as stored in the file.
    pub fn raw(&self) -> u8 {
        match self {
            OsAbi::SystemV => 0,
            OsAbi::HpUx => 1,
            OsAbi::NetBsd => 2,
            OsAbi::Linux => 3,
            OsAbi::Solaris => 6,
            OsAbi::Aix => 7,
            OsAbi::Irix => 8,
            OsAbi::FreeBsd => 9,
            OsAbi::Tru64 => 10,
            OsAbi::Modesto => 11,
            OsAbi::OpenBsd => 12,
            OsAbi::ArmAeabi => 64,
            OsAbi::Arm => 97,
            OsAbi::Standalone => 255,
            OsAbi::Unknown(value) => *value,
        }
    }

    /// Returns `None` for values outside the known table.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self {
            OsAbi::SystemV => "UNIX - System V",
            OsAbi::HpUx => "HP-UX",
            OsAbi::NetBsd => "NetBSD",
            OsAbi::Linux => "GNU/Linux",
            OsAbi::Solaris => "Solaris",
            OsAbi::Aix => "AIX",
            OsAbi::Irix => "IRIX",
            OsAbi::FreeBsd => "FreeBSD",
            OsAbi::Tru64 => "Tru64",
            OsAbi::Modesto => "Novell Modesto",
            OsAbi::OpenBsd => "OpenBSD",
            OsAbi::ArmAeabi => "ARM EABI",
            OsAbi::Arm => "ARM",
            OsAbi::Standalone => "Standalone App",
            OsAbi::Unknown(_) => return None,
        };
        Some(name)
    }
}

impl fmt::Display for OsAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "<unknown: {:#04x}>", self.raw()),
        }
    }
}

fn byte_at(buf: &[u8], offset: usize) -> Result<u8> {
    buf.get(offset).copied().ok_or(IdentError::InvalidLength)
}

/// Compares the buffer against `\x7fELF`.
///
/// Only `min(4, buf.len())` bytes are compared, so a buffer holding a proper
/// prefix of the magic (e.g. just `[0x7f]`) passes. An empty buffer fails
/// with [`IdentError::InvalidLength`].
pub fn check_magic(buf: &[u8]) -> Result<()> {
    if buf.is_empty() {
        return Err(IdentError::InvalidLength);
    }

    let len = SELFMAG.min(buf.len());
    if buf[..len] != ELFMAG[..len] {
        log::debug!("magic mismatch: {:02x?}", &buf[..len]);
        return Err(IdentError::NotElf);
    }

    Ok(())
}

/// Reads `EI_CLASS` (offset 0x04).
///
/// Fails with [`IdentError::InvalidLength`] if the buffer is shorter than 5
/// bytes, and with [`IdentError::InvalidFormat`] for anything but 1 or 2.
pub fn decode_class(buf: &[u8]) -> Result<Class> {
    let class = match byte_at(buf, EI_CLASS)? {
        ELFCLASS32 => Class::Elf32,
        ELFCLASS64 => Class::Elf64,
        other => {
            log::debug!("unsupported EI_CLASS {other:#x}");
            return Err(IdentError::InvalidFormat);
        }
    };
    log::debug!("EI_CLASS: {class}");
    Ok(class)
}

/// Reads `EI_DATA` (offset 0x05).
///
/// Fails with [`IdentError::InvalidLength`] if the buffer is shorter than 6
/// bytes, and with [`IdentError::InvalidEndianness`] for anything but 1 or 2.
pub fn decode_endianness(buf: &[u8]) -> Result<Endianness> {
    let endianness = match byte_at(buf, EI_DATA)? {
        ELFDATA2LSB => Endianness::Little,
        ELFDATA2MSB => Endianness::Big,
        other => {
            log::debug!("unsupported EI_DATA {other:#x}");
            return Err(IdentError::InvalidEndianness);
        }
    };
    log::debug!("EI_DATA: {endianness}");
    Ok(endianness)
}

/// Reads `EI_VERSION` (offset 0x06).
///
/// Fails with [`IdentError::InvalidLength`] if the buffer is shorter than 7
/// bytes, and with [`IdentError::InvalidVersion`] for anything but 1.
pub fn decode_version(buf: &[u8]) -> Result<Version> {
    match byte_at(buf, EI_VERSION)? {
        EV_ORIGINAL => {
            log::debug!("EI_VERSION: {}", Version::Original);
            Ok(Version::Original)
        }
        other => {
            log::debug!("unsupported EI_VERSION {other:#x}");
            Err(IdentError::InvalidVersion)
        }
    }
}

/// Reads `EI_OSABI` (offset 0x07). Only fails with [`IdentError::InvalidLength`].
pub fn decode_os_abi(buf: &[u8]) -> Result<OsAbi> {
    let os_abi = OsAbi::from_raw(byte_at(buf, EI_OSABI)?);
    log::debug!("EI_OSABI: {os_abi}");
    Ok(os_abi)
}

/// Reads `EI_ABIVERSION` (offset 0x08). Only fails with [`IdentError::InvalidLength`].
pub fn decode_abi_version(buf: &[u8]) -> Result<u8> {
    let abi_version = byte_at(buf, EI_ABIVERSION)?;
    log::debug!("EI_ABIVERSION: {abi_version}");
    Ok(abi_version)
}

/// Decoded identification fields of a buffer that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identification {
    pub class: Class,
    pub endianness: Endianness,
    pub version: Version,
    /// `None` when the buffer ends before `EI_OSABI`.
    pub os_abi: Option<OsAbi>,
    /// `None` when the buffer ends before `EI_ABIVERSION`.
    pub abi_version: Option<u8>,
}

/// Runs every check in file order, returning the first error encountered.
pub fn identify(buf: &[u8]) -> Result<Identification> {
    check_magic(buf)?;
    let class = decode_class(buf)?;
    let endianness = decode_endianness(buf)?;
    let version = decode_version(buf)?;

    Ok(Identification {
        class,
        endianness,
        version,
        os_abi: optional(decode_os_abi(buf))?,
        abi_version: optional(decode_abi_version(buf))?,
    })
}

/// Maps a length failure to `None` and passes every other result through.
fn optional<T>(res: Result<T>) -> Result<Option<T>> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(IdentError::InvalidLength) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Header for Identification {
    fn format_name(&self) -> &'static str {
        "ELF"
    }

    fn is_64(&self) -> bool {
        self.class == Class::Elf64
    }

    fn is_little_endian(&self) -> bool {
        self.endianness == Endianness::Little
    }
}

impl fmt::Display for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.format_name())?;
        writeln!(f, "Class: {}", self.class)?;
        writeln!(f, "Endianness: {}", self.endianness)?;
        write!(f, "Version: {}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];

    fn ident(class: u8, data: u8, version: u8) -> Vec<u8> {
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&[class, data, version]);
        buf
    }

    #[test]
    fn magic_accepts_elf_signature() {
        assert_eq!(check_magic(&MAGIC), Ok(()));
        assert_eq!(check_magic(&ident(2, 1, 1)), Ok(()));
    }

    #[test]
    fn magic_rejects_empty_buffer() {
        assert_eq!(check_magic(&[]), Err(IdentError::InvalidLength));
    }

    #[test]
    fn magic_accepts_partial_prefix() {
        assert_eq!(check_magic(&[0x7f]), Ok(()));
        assert_eq!(check_magic(&[0x7f, b'E']), Ok(()));
        assert_eq!(check_magic(&[0x7f, b'E', b'L']), Ok(()));
    }

    #[test]
    fn magic_rejects_partial_mismatch() {
        assert_eq!(check_magic(&[0x7e]), Err(IdentError::NotElf));
        assert_eq!(check_magic(&[0x7f, b'E', b'X']), Err(IdentError::NotElf));
    }

    #[test]
    fn magic_rejects_zeroes() {
        assert_eq!(check_magic(&[0, 0, 0, 0]), Err(IdentError::NotElf));
    }

    #[test]
    fn magic_rejects_other_formats() {
        assert_eq!(check_magic(b"MZ\x90\x00"), Err(IdentError::NotElf));
        assert_eq!(check_magic(&[0xcf, 0xfa, 0xed, 0xfe]), Err(IdentError::NotElf));
    }

    #[test]
    fn class_values() {
        assert_eq!(decode_class(&ident(1, 1, 1)), Ok(Class::Elf32));
        assert_eq!(decode_class(&ident(2, 1, 1)), Ok(Class::Elf64));
        assert_eq!(decode_class(&ident(3, 1, 1)), Err(IdentError::InvalidFormat));
        assert_eq!(decode_class(&ident(0, 1, 1)), Err(IdentError::InvalidFormat));
        assert_eq!(decode_class(&MAGIC), Err(IdentError::InvalidLength));
    }

    #[test]
    fn class_strings() {
        assert_eq!(Class::Elf32.to_string(), "32-bit (4-byte word)");
        assert_eq!(Class::Elf64.to_string(), "64-bit (8-byte word)");
    }

    #[test]
    fn endianness_values() {
        assert_eq!(
            decode_endianness(&ident(2, 1, 1)).map(|e| e.to_string()),
            Ok("Little Endian".to_string())
        );
        assert_eq!(
            decode_endianness(&ident(2, 2, 1)).map(|e| e.to_string()),
            Ok("Big Endian".to_string())
        );
        assert_eq!(
            decode_endianness(&ident(2, 0, 1)),
            Err(IdentError::InvalidEndianness)
        );
        assert_eq!(
            decode_endianness(&[0x7f, b'E', b'L', b'F', 2]),
            Err(IdentError::InvalidLength)
        );
    }

    #[test]
    fn version_values() {
        assert_eq!(
            decode_version(&ident(2, 1, 1)).map(|v| v.to_string()),
            Ok("1 (Original)".to_string())
        );
        assert_eq!(decode_version(&ident(2, 1, 2)), Err(IdentError::InvalidVersion));
        assert_eq!(decode_version(&ident(2, 1, 0)), Err(IdentError::InvalidVersion));
        assert_eq!(
            decode_version(&[0x7f, b'E', b'L', b'F', 2, 1]),
            Err(IdentError::InvalidLength)
        );
    }

    #[test]
    fn decoders_do_not_depend_on_magic() {
        let buf = [0, 0, 0, 0, 1, 2, 1];
        assert_eq!(decode_class(&buf), Ok(Class::Elf32));
        assert_eq!(decode_endianness(&buf), Ok(Endianness::Big));
        assert_eq!(decode_version(&buf), Ok(Version::Original));
    }

    #[test]
    fn raw_values_match_goblin_constants() {
        assert_eq!(Class::Elf64.raw(), ELFCLASS64);
        assert_eq!(Endianness::Big.raw(), ELFDATA2MSB);
        assert_eq!(Version::Original.raw(), 1);
    }

    #[test]
    fn os_abi_values() {
        let mut buf = ident(2, 1, 1);
        assert_eq!(decode_os_abi(&buf), Err(IdentError::InvalidLength));

        buf.push(3);
        assert_eq!(decode_os_abi(&buf), Ok(OsAbi::Linux));
        assert_eq!(OsAbi::Linux.to_string(), "GNU/Linux");

        buf[EI_OSABI] = 0x42;
        assert_eq!(decode_os_abi(&buf), Ok(OsAbi::Unknown(0x42)));
        assert_eq!(OsAbi::Unknown(0x42).to_string(), "<unknown: 0x42>");
    }

    #[test]
    fn os_abi_known_values_keep_their_byte() {
        for value in [0u8, 1, 2, 3, 6, 7, 8, 9, 10, 11, 12, 64, 97, 255] {
            let abi = OsAbi::from_raw(value);
            assert!(abi.name().is_some(), "{value} should be named");
            assert_eq!(abi.raw(), value);
        }
    }

    #[test]
    fn abi_version_is_raw_byte() {
        let mut buf = ident(2, 1, 1);
        buf.push(0);
        assert_eq!(decode_abi_version(&buf), Err(IdentError::InvalidLength));
        buf.push(7);
        assert_eq!(decode_abi_version(&buf), Ok(7));
    }

    #[test]
    fn identify_minimal_64_bit_little_endian() {
        let id = identify(&[0x7f, 0x45, 0x4c, 0x46, 0x02, 0x01, 0x01]).unwrap();
        assert_eq!(id.class.to_string(), "64-bit (8-byte word)");
        assert_eq!(id.endianness.to_string(), "Little Endian");
        assert_eq!(id.version.to_string(), "1 (Original)");
        assert_eq!(id.os_abi, None);
        assert_eq!(id.abi_version, None);
        assert!(id.is_64());
        assert!(id.is_little_endian());
    }

    #[test]
    fn identify_full_ident() {
        let mut buf = [0u8; 16];
        buf[..7].copy_from_slice(&ident(1, 2, 1));
        buf[EI_OSABI] = 9;
        buf[EI_ABIVERSION] = 1;

        let id = identify(&buf).unwrap();
        assert_eq!(id.class, Class::Elf32);
        assert_eq!(id.endianness, Endianness::Big);
        assert_eq!(id.os_abi, Some(OsAbi::FreeBsd));
        assert_eq!(id.abi_version, Some(1));
        assert!(!id.is_64());
        assert!(!id.is_little_endian());
    }

    #[test]
    fn identify_stops_at_first_failure() {
        assert_eq!(identify(&[0, 0, 0, 0]), Err(IdentError::NotElf));
        assert_eq!(identify(&[0x7f]), Err(IdentError::InvalidLength));
        assert_eq!(identify(&ident(9, 9, 9)), Err(IdentError::InvalidFormat));
        assert_eq!(identify(&ident(1, 9, 9)), Err(IdentError::InvalidEndianness));
        assert_eq!(identify(&ident(1, 1, 9)), Err(IdentError::InvalidVersion));
    }

    #[test]
    fn identification_display() {
        let id = identify(&ident(2, 1, 1)).unwrap();
        assert_eq!(
            id.to_string(),
            "ELF\nClass: 64-bit (8-byte word)\nEndianness: Little Endian\nVersion: 1 (Original)"
        );
    }

    proptest! {
        #[test]
        fn magic_prefix_always_passes(tail in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut buf = MAGIC.to_vec();
            buf.extend(tail);
            prop_assert_eq!(check_magic(&buf), Ok(()));
        }

        #[test]
        fn wrong_magic_always_fails(head in any::<[u8; 4]>(), tail in proptest::collection::vec(any::<u8>(), 0..16)) {
            prop_assume!(head != MAGIC);
            let mut buf = head.to_vec();
            buf.extend(tail);
            prop_assert_eq!(check_magic(&buf), Err(IdentError::NotElf));
        }

        #[test]
        fn unknown_class_is_invalid_format(class in 3u8..=255) {
            prop_assert_eq!(decode_class(&ident(class, 1, 1)), Err(IdentError::InvalidFormat));
        }

        #[test]
        fn unknown_data_is_invalid_endianness(data in any::<u8>()) {
            prop_assume!(data != ELFDATA2LSB && data != ELFDATA2MSB);
            prop_assert_eq!(decode_endianness(&ident(1, data, 1)), Err(IdentError::InvalidEndianness));
        }

        #[test]
        fn unknown_version_is_invalid(version in any::<u8>()) {
            prop_assume!(version != 1);
            prop_assert_eq!(decode_version(&ident(1, 1, version)), Err(IdentError::InvalidVersion));
        }

        #[test]
        fn checks_are_idempotent(buf in proptest::collection::vec(any::<u8>(), 0..24)) {
            prop_assert_eq!(check_magic(&buf), check_magic(&buf));
            prop_assert_eq!(decode_class(&buf), decode_class(&buf));
            prop_assert_eq!(decode_endianness(&buf), decode_endianness(&buf));
            prop_assert_eq!(decode_version(&buf), decode_version(&buf));
            prop_assert_eq!(identify(&buf), identify(&buf));
        }
    }
}
