//! [`BarSource`](crate::bar_source::BarSource) implementations.
//!
//! | Source | Description |
//! |--------|-------------|
//! | [`CsvDirectorySource`] | One CSV file per instrument in a directory |
//! | [`SampleSource`] | Deterministic synthetic bars |

mod csv_directory;
mod sample;

pub use csv_directory::CsvDirectorySource;
pub use sample::SampleSource;
