//! Foundation types for the blob service.
//!
//! Every other blob crate depends on `blob-types`. The types here carry no
//! I/O and no external collaborators.
//!
//! # Key Types
//!
//! - [`ContentLocation`]: container + object name pair, serialized as
//!   `"container/object"`
//! - [`Clock`]: source of wall-clock timestamps ([`SystemClock`],
//!   [`FixedClock`])

pub mod error;
pub mod location;
pub mod temporal;

pub use error::TypeError;
pub use location::{ContentLocation, LOCATION_SEPARATOR};
pub use temporal::{Clock, FixedClock, SystemClock};
