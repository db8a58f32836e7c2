//! MRC/CCP4 density maps for structural biology.
//!
//! A [`MapFile`] owns the header, the text labels and the voxel grid of one
//! map file. Its [`Orientation`] records which logical axis is stored as
//! columns, rows and sections; reorienting a map physically transposes the
//! grid by the axis swaps of a [`PermutationMatrix`].
//!
//! ```no_run
//! use mrcmap::{FileMode, MapFile, Orientation};
//!
//! # fn main() -> Result<(), mrcmap::Error> {
//! let mut map = MapFile::open("emd_1234.map", FileMode::ReadWrite)?;
//! map.set_orientation("ZYX".parse::<Orientation>()?)?;
//! map.add_label("reoriented to ZYX");
//! map.close()?;
//! # Ok(())
//! # }
//! ```

mod grid;
mod header;
mod mapfile;
mod mode;
mod orientation;
mod permutation;

#[cfg(test)]
#[path = "../test/tests.rs"]
mod tests;

#[cfg(test)]
#[path = "../test/mapfile_test.rs"]
mod mapfile_test;

pub use grid::{Sample, Statistics, Voxel, VoxelGrid};
pub use header::{FileEndian, HEADER_SIZE, Header, LABEL_SIZE, MAX_LABELS};
pub use mapfile::{
    FileMode, MapFile, MapFileOptions, VoxelSize, axis_order_of, read, set_axis_order, write,
};
pub use mode::Mode;
pub use orientation::{Axis, Orientation};
pub use permutation::PermutationMatrix;

pub use half::f16;
pub use ndarray;
pub use num_complex::Complex32;

// Error type

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid orientation: {0}")]
    InvalidOrientation(String),
    #[error("not a permutation matrix: {0:?}")]
    InvalidPermutation([[i32; 3]; 3]),
    #[error("repeated axis codes in {0:?}")]
    DuplicateAxis(Vec<i32>),
    #[error("axis codes differ: {old:?} vs. {new:?}")]
    AxisSetMismatch { old: Vec<i32>, new: Vec<i32> },
    #[error("expected {expected} values, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("unsupported voxel mode {0}; use one of 0, 1, 2, 3, 4, 6, 12")]
    UnsupportedVoxelMode(u32),
    #[error("grid dimension {0} does not fit in the header")]
    DimensionOverflow(usize),
    #[error("malformed MRC header: {0}")]
    MalformedHeader(String),
    #[error("truncated file: need {expected} bytes, found {found}")]
    TruncatedFile { expected: u64, found: u64 },
    #[error("no data to write; assign a grid before closing")]
    NoData,
}
