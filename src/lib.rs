//! # gddns
//!
//! A dynamic DNS updater for dyndns2-compatible providers (Google Domains
//! and friends).
//!
//! Each run discovers the host's public address, looks up the record that is
//! currently published for the hostname, and only calls the provider's
//! update endpoint when the two differ.
//!
//! ## Usage
//!
//! ```bash
//! # Update the record if the address changed
//! gddns update --hostname home.example.com --username u --password p
//!
//! # Show discovered address and published record
//! gddns status --json
//!
//! # Re-check every five minutes
//! gddns daemon --interval 300
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod resolver;
pub mod updater;

pub use config::Config;
pub use detector::{Address, AddressSource, IpDetector, IpFamily};
pub use error::{DdnsError, ProviderResponse, Result};
pub use updater::{Outcome, Status, Updater};

/// User-Agent sent with every HTTP request.
pub fn user_agent() -> String {
    format!(
        "gddns/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
