//! Circuit model: nets, branch unknowns, devices and their properties.
//!
//! A [`Circuit`] is assembled from [`DeviceDecl`]s (or by connecting
//! [`Device`](crate::components::Device)s directly) against a shared
//! [`DeviceRegistry`]. Property values are validated against the class
//! schema once, when a device is created.

mod graph;
mod props;
mod registry;
mod types;
mod validate;

pub use graph::{Circuit, DeviceDecl, ModelCard, DEFAULT_GROUND, GROUND_ALIAS};
pub use props::{
    Cmp, Domain, PropKind, PropSpec, PropValue, Properties, Range, RawValue, MAX_RANGE_BOUNDS,
};
pub use registry::DeviceRegistry;
pub use types::*;
pub use validate::{terminal_counts, validate_circuit};
