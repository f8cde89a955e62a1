//! # topoforge_topology
//!
//! In-memory model of a virtual infrastructure topology (networks, routers,
//! instances) together with the operations the generator needs before any
//! provider-specific work happens.
//!
//! ## Features
//!
//! - **Model**: serde types that keep provider-specific attributes intact
//! - **Validation**: JSON-schema shape checks plus IP/CIDR consistency
//! - **Loading**: validate-then-parse, reporting every violation at once
//! - **Renaming**: deterministic `<name>_<suffix>` rewriting on a deep copy
//!
//! ## Example
//!
//! ```rust,no_run
//! use topoforge_topology::{rename, Suffix, TopologyLoader};
//!
//! let topology = TopologyLoader::load("topology.json", "aws").unwrap();
//! let suffix = Suffix::generate();
//! let copy = rename(&topology, &suffix);
//! assert_eq!(copy.instances.len(), topology.instances.len());
//! ```

pub mod cidr;
pub mod error;
pub mod loader;
pub mod models;
pub mod rename;
pub mod validator;

pub use cidr::Ipv4Cidr;
pub use error::{TopologyError, TopologyResult};
pub use loader::TopologyLoader;
pub use models::{Instance, Network, NetworkAttachment, Router, Topology};
pub use rename::{rename, Suffix, SuffixGenerator, SUFFIX_LEN, SUFFIX_SPACE};
pub use validator::{TopologyValidator, ValidationResult};
