//! `censuswalk-xwalk` — temporal crosswalk construction for census geographies.
//!
//! Pure engine crate: receives pre-loaded tables, returns a finished crosswalk
//! with its reconciliation reports. No CLI or IO dependencies.

pub mod accounting;
pub mod atoms;
pub mod config;
pub mod engine;
pub mod error;
pub mod finish;
pub mod geo;
pub mod ids;
pub mod join;
pub mod model;
pub mod nodata;
pub mod registry;
pub mod table;

pub use config::XwalkConfig;
pub use engine::{run, XwalkInput};
pub use error::{ErrorClass, XwalkError};
pub use geo::{CensusYear, CodeType, Endpoint, Geography, Side};
pub use model::{Atom, BaseCrosswalk, BaseRow, Crosswalk, CrosswalkResult};
pub use table::Table;
