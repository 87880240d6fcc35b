pub mod binary;
pub mod error;
pub mod header;

pub use binary::*;
pub use error::{IdentError, Result};
pub use header::elf::*;
pub use header::Header;
