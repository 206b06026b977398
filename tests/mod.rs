//! Integration tests for livetv
//!
//! Tests are organized by component:
//! - resolver_test: multi-hop stream resolution against a mock site
//! - catalog_test: cached channel and schedule listings
//! - epg_test: XMLTV feed download and upcoming programmes
//! - cli_test: argument parsing, output format, exit codes

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
