//! # ctx identifiers
//!
//! Per-language identifier harvesting for codebase snapshots.
//!
//! ## Architecture
//!
//! ```text
//! File path
//!     │
//!     ├──> Capability table (extension → Language)
//!     │
//!     ├──> Tree-sitter parsing → syntax tree
//!     │
//!     └──> Declaration walk
//!          ├─> Stop at declaration / identifier nodes
//!          ├─> Harvest nested identifier leaves
//!          └─> Drop single-character and whitespace tokens
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ctx_identifiers::Extractors;
//! use std::path::Path;
//!
//! let mut extractors = Extractors::new();
//! let terms = extractors
//!     .extract_file(Path::new("main.go"), b"package main\n\nfunc foo() {}\n")
//!     .unwrap();
//! assert!(terms.contains("foo"));
//! ```

mod error;
mod extractor;
mod language;

pub use error::{ExtractError, Result};
pub use extractor::{extract, Extractors, IdentifierExtractor};
pub use language::{Language, NodeKinds};
