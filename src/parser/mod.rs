//! Byte-level reference parsing.
//!
//! A hand-rolled literal/skip scanner instead of a regex engine: the
//! reference pattern never changes shape, and the corpus is large.

pub mod asset_kind;
pub mod extractor;
pub mod scanner;

pub use asset_kind::AssetKind;
pub use extractor::{
    extract_references, scan_references, ExtractError, FileReferences, ReferenceExtractor,
    ScanScratch, SubExtractor, REFERENCE_PREFIX,
};
pub use scanner::{is_hex_digit, ByteScanner};
