//! Truck Documents Shell
//!
//! Terminal client for a truck tablet: enrolls the device against a truck,
//! lists the truck's documents, and keeps PDFs available offline.

pub mod backend;
pub mod cache;
pub mod enroll;
pub mod identity;
pub mod shell;
pub mod status;

pub use backend::{ApiClient, DEFAULT_API_BASE, Rejected, ShellBackend, is_unreachable};
pub use cache::{CacheEntry, CachedDocument, DirCache, OfflineCache};
pub use enroll::{Enroller, EnrollmentInput, PromptEnroller};
pub use identity::DeviceIdentity;
pub use shell::{EnrollmentCancelled, Shell, ShellState};
pub use status::{ConsoleSink, StatusSink};
