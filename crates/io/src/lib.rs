// Crosswalk file I/O

pub mod crosswalk;
pub mod csv;
pub mod product;
pub mod snapshot;

pub use crate::crosswalk::{read_crosswalk, write_crosswalk, write_crosswalk_csv};
pub use crate::csv::{read_base, read_table};
pub use crate::product::write_data_product;
pub use crate::snapshot::{read_snapshot, write_snapshot, SNAPSHOT_FORMAT_VERSION};
