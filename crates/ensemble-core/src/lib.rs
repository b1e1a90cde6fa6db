//! # Ensemble Core
//!
//! Core types shared by the Ensemble group-management stack.
//!
//! ## Key Types
//!
//! - [`Identity`]: Opaque byte identifier of a group member or owned identity
//! - [`GroupId`]: Opaque byte identifier of a group
//! - [`PermissionSet`]: Capability flags granted to a group member
//! - [`GroupType`]: Permission template applied to a whole group
//! - [`MemberOrPending`]: A joined member or an invited-but-not-joined member

pub mod error;
pub mod group_type;
pub mod identity;
pub mod member;
pub mod permissions;

// Re-export main types
pub use error::*;
pub use group_type::*;
pub use identity::*;
pub use member::*;
pub use permissions::*;
