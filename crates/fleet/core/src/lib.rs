//! Fleet Core Types
//!
//! Domain types shared by the truck document services: device assignments,
//! telematics records, document library items, and sharing grants.
//! Everything here is pure; no I/O happens in this crate.

mod api;
mod device;
mod document;
mod sharing;
mod telematics;

pub use api::*;
pub use device::*;
pub use document::*;
pub use sharing::*;
pub use telematics::*;
