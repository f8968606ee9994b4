/// Remote telemetry service access.
///
/// `client` handles URL construction, JSON parsing, and resilient fetching
/// for the two read endpoints (`overall` catalog, `mgraph` time series).
/// `fixtures` (test only) holds representative response payloads.

pub mod client;

#[cfg(test)]
pub(crate) mod fixtures;
