//! Read and write G-EQDSK magnetic equilibrium files.
//!
//! ```
//! use geqdsk::{EquilibriumRecord, from_str, to_string};
//!
//! let mut rec = EquilibriumRecord::new(4, 3);
//! rec.qpsi = vec![1.0, 1.5, 2.5, 4.0];
//! let text = to_string(&rec).unwrap();
//! let rec2 = from_str(&text).unwrap();
//! assert_eq!(rec2.qpsi, rec.qpsi);
//! ```
extern crate pest;
#[macro_use]
extern crate pest_derive;
pub mod eqdsk_error;
pub mod record;
pub mod tokens;
pub(crate) mod parsing;
pub mod de;
pub mod ser;
#[cfg(feature = "dataframes")]
pub mod dataframes;

pub use eqdsk_error::{EError, EResult};
pub use record::{EquilibriumRecord, FluxGrid, Scalars, ScalarSlot};
pub use de::{from_path, from_reader, from_str, DeSettings};
pub use ser::{to_path, to_string, to_writer, SerSettings};
