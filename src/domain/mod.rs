//! Domain layer: construct tree, synthesis and encoding
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod address;
pub mod arena;
pub mod encode;
pub mod error;
pub mod name;
pub mod synth;
pub mod value;

pub use address::{Address, SEPARATOR};
pub use arena::{App, ConstructKind, KeyStyle, Layout, Node, NodeId, Placement, ScopeId};
pub use encode::{Encoder, Format, JsonEncoder, YamlEncoder};
pub use error::{DomainError, DomainResult};
pub use name::validate_local_name;
pub use synth::{artifacts, synthesize, Artifact, Document, Origin};
pub use value::{data_from_json, Data, Value};
