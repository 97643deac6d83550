//! Output generation for collected press releases.
//!
//! # Submodules
//!
//! - [`csv`]: the release table (`Date,Headlines,Text`) and the failure ledger
//! - [`json`]: a full snapshot of a run, including release URLs
//!
//! # Output Structure
//!
//! ```text
//! sec_press_releases.csv       # newest first, URL column dropped
//! failed_items.csv             # appended across runs
//! json_output_dir/
//! └── press_releases_1997_2011.json
//! ```

pub mod csv;
pub mod json;
