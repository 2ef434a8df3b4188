//! Endpoint parsing
//!
//! Turns operator input into probe targets:
//! - Stratum relays (`stratum+tcp://host:port`) are parsed but never resolved here;
//!   their host name is looked up again on every probe.
//! - Host targets (`host[:port]`) are resolved once, and the numeric address is
//!   what gets stored, probed and displayed afterwards.

pub mod host;
pub mod stratum;

use crate::models::{Category, Endpoint, TargetError};

pub use host::{parse_host, resolve_host, split_host_port};
pub use stratum::{has_stratum_scheme, parse_stratum};

/// Parse raw input for the given category.
///
/// Stratum input never fails: malformed URLs come back as an invalid endpoint.
/// Host input fails on empty input, a bad port, or a resolution error.
pub fn parse(raw: &str, category: Category) -> Result<Endpoint, TargetError> {
    match category {
        Category::Stratum => Ok(parse_stratum(raw)),
        Category::Host => parse_host(raw),
    }
}
