//! flowspec - OpenAPI documents and Postman collections from recorded HTTP traffic.
//!
//! This library turns captured HTTP flows into API artifacts so an API contract can be
//! reverse-engineered from observed calls. It also converts existing OpenAPI documents
//! into Postman collections.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`flow`] - Normalizes raw flow records and computes their stable IDs
//! 2. [`url_parts`] - Splits captured URLs into server, path and query parts
//! 3. [`selector`] - Drops static assets, applies the ID allow-list and browsing filters
//! 4. [`openapi_builder`] - Groups flows into an OpenAPI document
//! 5. [`postman`] - Groups flows into a Postman collection
//! 6. [`converter`] - Converts an existing OpenAPI document into a Postman collection
//! 7. [`serializer`] - Serializes documents to YAML or JSON
//! 8. [`artifacts`] - Stores generated documents under timestamped and `latest` names
//! 9. [`service`] - Runs whole generation calls and reports structured outcomes
//!
//! All synthesis functions are pure: they take a slice of flows (and a [`clock::Clock`]
//! where a timestamp is needed) and return a fresh document.
//!
//! # Example Usage
//!
//! ```
//! use flowspec::{
//!     clock::FixedClock,
//!     flow::parse_flows,
//!     openapi_builder::synthesize_openapi,
//!     postman::synthesize_postman,
//!     selector::select,
//!     serializer::serialize_json,
//! };
//! use std::collections::HashSet;
//!
//! let flows = parse_flows(r#"[
//!     {"method": "GET", "url": "http://api.test/users?active=true", "status": 200},
//!     {"method": "GET", "url": "http://api.test/logo.png", "status": 200}
//! ]"#).unwrap();
//!
//! let selected = select(&flows, &HashSet::new());
//! assert_eq!(selected.len(), 1);
//!
//! let openapi = synthesize_openapi(&selected).unwrap();
//! assert!(openapi.paths["/users"].contains_key("get"));
//!
//! let collection = synthesize_postman(&selected, &FixedClock::at_unix(0)).unwrap();
//! println!("{}", serialize_json(&collection).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod clock;
pub mod flow;
pub mod url_parts;
pub mod selector;
pub mod openapi_builder;
pub mod postman;
pub mod converter;
pub mod serializer;
pub mod artifacts;
pub mod service;
pub mod error;
