// File I/O: Excel tables in and out, zip archives, e-invoice containers

pub mod archive;
pub mod bill;
pub mod error;
pub mod scratch;
pub mod xlsx;

pub use archive::{package, ArchiveEntry};
pub use error::IoError;
pub use scratch::WorkContext;

/// Fill colour of summary rows in report workbooks (0xRRGGBB).
pub const DEFAULT_HIGHLIGHT: u32 = 0xD3D3D3;
