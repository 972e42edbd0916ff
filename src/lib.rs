/// OID Directory - client toolkit for X.660 OID registration directories
///
/// Translates OID identities between ASN.1 notation, dotNotation and directory
/// DNs, parses subtree specifications and generalized times, and caches
/// directory-derived registrations and registrants with per-entry TTLs.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod notation;
pub mod record;
pub mod subtree;
pub mod time;

pub use cache::{Cacheable, CacheKind, Clock, ManualClock, ObjectCache, SystemClock};
pub use config::{CacheConfig, Dimension, DirectoryConfig, DirectoryProfile, LoggingConfig};
pub use error::{DirError, DirResult};
pub use notation::{
    asn1_notation_to_multi, dn_to_dot_notation, dn_to_dot_notation_2d, dn_to_dot_notation_3d,
    dot_notation_to_dn, dot_notation_to_dn_2d, dot_notation_to_dn_3d, Asn1Notation, DotNotation,
    NameAndNumberForm, NumberForm, RegisteredRoot, RootArc,
};
pub use record::{FieldTable, Registrant, Registration, ValueTransform};
pub use subtree::{ChopKind, Refinement, SpecificExclusion, SubtreeSpecification};
pub use time::{generalized_time_to_time, parse_generalized_time, time_to_generalized_time};
