//! # quote_core - Advertising Production Quote Engine
//!
//! `quote_core` is the computational heart of Quoteline. An operator enters
//! unit costs against a fixed catalog of line items; the engine prices each
//! line, rolls the totals up through subsections and sections, and derives
//! the client-facing top sheet (gross, cutdown, VAT, grand total).
//!
//! ## Design Philosophy
//!
//! - **Arena catalog**: Sections, subsections and items are addressed by
//!   index; display codes are derived, never used as keys
//! - **Owned session**: One [`QuoteSession`] owns the values and keeps the
//!   cached totals consistent after every edit
//! - **JSON-First**: Saved quotes, registry and errors all serialize
//! - **Lenient input**: Garbage, negative or NaN numbers become 0 silently
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{NaiveDate, Utc};
//! use quote_core::{catalog, LineInput, Position, QuoteSession, Settings};
//!
//! let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let mut session = QuoteSession::new(catalog::standard()?, Settings::default(), today);
//!
//! let edit = LineInput { rate: Some("800".into()), nb: Some("2".into()), ..Default::default() };
//! session.update_line(Position::new(3, 0, 0), &edit)?;
//!
//! let saved = session.snapshot("ALPHA-1", Utc::now());
//! let json = saved.to_json_pretty()?;
//! # Ok::<(), quote_core::QuoteError>(())
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - The immutable section/subsection/item tree
//! - [`line`] - Line records and the pricing formula
//! - [`input`] - Coercion of operator and wire numbers
//! - [`store`] - Line values for every catalog position
//! - [`rollup`] - Subsection, section and composite totals
//! - [`summary`] - Top sheet rows and the grand figures
//! - [`presentation`] - Display codes, group banners and money formatting
//! - [`project`] - Project header, top sheet fields and settings
//! - [`quote`] - The saved quote format
//! - [`registry`] - Saved quotes keyed by id
//! - [`session`] - The open quote
//! - [`file_io`] - On-disk storage with atomic saves and locking
//! - [`errors`] - Structured error types

pub mod catalog;
pub mod errors;
pub mod file_io;
pub mod input;
pub mod line;
pub mod presentation;
pub mod project;
pub mod quote;
pub mod registry;
pub mod rollup;
pub mod session;
pub mod store;
pub mod summary;

// Re-export commonly used types at crate root for convenience
pub use catalog::Catalog;
pub use errors::{QuoteError, QuoteResult};
pub use file_io::{FileLock, QuoteStorage};
pub use line::{price, LineInput, LineRecord};
pub use project::{ExtraFields, ProjectMetadata, Settings};
pub use quote::SavedQuote;
pub use registry::QuoteRegistry;
pub use session::QuoteSession;
pub use store::Position;
pub use summary::Summary;
