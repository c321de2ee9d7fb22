//! Fleet Service Layer
//!
//! Truck resolution, document lookup, and folder synchronization on top of
//! the upstream traits.

mod locator;
mod resolver;
mod syncer;

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

pub use locator::DocumentLocator;
pub use resolver::{DriverTruck, TruckResolver, truck_for_device};
pub use syncer::{ASSIGNMENT_WINDOW, DEFAULT_TEST_DRIVER, DocumentSyncer};
