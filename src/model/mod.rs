//! Data model for interface documents and their resolved form.
//!
//! `RawDocument` is transient and lives for one load cycle. `ResolvedModel`
//! is what the repository publishes; it owns its originating document plus
//! the flattened member lists.

pub mod identity;
pub mod member;
pub mod raw;
pub mod resolved;

pub use identity::{MemberId, MemberKind, ModelId};
pub use member::{Member, MemberSchema, localized};
pub use raw::{INTERFACE_MARKER, RawDocument};
pub use resolved::ResolvedModel;
