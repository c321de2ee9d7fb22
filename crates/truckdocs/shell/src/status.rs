//! Status reporting.

use fleet_core::TruckDocument;

use crate::cache::CacheEntry;

/// Where the shell reports progress and results.
pub trait StatusSink: Send {
    /// Persistent status line, e.g. the resolved truck.
    fn status(&mut self, message: &str);

    /// Transient notice.
    fn notice(&mut self, message: &str);

    /// Show the documents fetched for the truck.
    fn documents(&mut self, truck: &str, documents: &[TruckDocument]);

    /// Show documents available offline.
    fn cached(&mut self, entries: &[CacheEntry]);
}

/// Prints to standard output.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn status(&mut self, message: &str) {
        println!("{message}");
    }

    fn notice(&mut self, message: &str) {
        println!("  * {message}");
    }

    fn documents(&mut self, truck: &str, documents: &[TruckDocument]) {
        if documents.is_empty() {
            println!("No documents for truck {truck}.");
            return;
        }

        println!("Documents for truck {truck}:");
        for doc in documents {
            let scope = if doc.applies_to_all_trucks { "all trucks" } else { "this truck" };
            match &doc.web_url {
                Some(url) => println!("  {} ({scope})  {url}", doc.name),
                None => println!("  {} ({scope})", doc.name),
            }
        }
    }

    fn cached(&mut self, entries: &[CacheEntry]) {
        if entries.is_empty() {
            println!("No documents available offline.");
            return;
        }

        println!("Offline documents:");
        for entry in entries {
            println!(
                "  {}  {} bytes  saved {}",
                entry.name,
                entry.size,
                entry.cached_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
}
