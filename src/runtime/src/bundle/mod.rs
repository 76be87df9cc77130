//! Bundle packaging: ignore rules and the gzip tar archive builder.

mod archive;
mod ignore;

pub use archive::{Archive, ArchiveBuilder, ArchiveEntry, EntryKind};
pub use ignore::IgnoreRules;
