//! Dialect probes for comparator disambiguation
//!
//! A probe answers structural questions the snapshots alone cannot, such as
//! which large-object family a column's declared type belongs to on the
//! target dialect. Probes are advisory: callers treat every error as
//! "no evidence". Live probes go behind a [`BoundedProbe`]; the offline
//! [`TypeFamilyProbe`] is used directly.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemadelta_catalog::{DialectProbe, ProbeRequest, TypeFamily, TypeFamilyProbe};
//! use schemadelta_core::DialectConfig;
//!
//! let probe = TypeFamilyProbe::new();
//! let request = ProbeRequest::new(DialectConfig::Oracle, Some("docs"), "body", "CLOB");
//! assert_eq!(probe.type_family(&request)?, TypeFamily::CharacterLargeObject);
//! ```

pub mod probe;
pub mod bounded;
pub mod type_family;
pub mod mock;

pub use probe::{DialectProbe, ProbeError, ProbeRequest, TypeFamily};
pub use bounded::BoundedProbe;
pub use type_family::TypeFamilyProbe;
pub use mock::MockProbe;
