//! Assignment of the logical X, Y and Z axes to the storage roles of a grid.
//!
//! Columns are the fastest-varying axis on disk, sections the slowest. The
//! axis codes used by the map header are 1 = X, 2 = Y, 3 = Z.

use crate::{Error, PermutationMatrix};
use core::fmt;
use core::ops::Div;
use core::str::FromStr;

/// A logical axis of the unit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 1,
    Y = 2,
    Z = 3,
}

impl Axis {
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[inline]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::X),
            2 => Some(Self::Y),
            3 => Some(Self::Z),
            _ => None,
        }
    }

    /// Case-insensitive.
    #[inline]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }

    #[inline]
    pub fn as_char(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
        }
    }

    /// Index of this axis in a C-ordered (Z, Y, X) array shape.
    #[inline]
    fn c_order_index(self) -> usize {
        match self {
            Self::X => 2,
            Self::Y => 1,
            Self::Z => 0,
        }
    }

    #[inline]
    fn from_c_order_index(index: usize) -> Option<Self> {
        match index {
            2 => Some(Self::X),
            1 => Some(Self::Y),
            0 => Some(Self::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Which logical axis is stored as columns, rows and sections.
///
/// The three axes are always distinct, so every value of this type is one
/// of the six permutations of X, Y and Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation {
    cols: Axis,
    rows: Axis,
    sections: Axis,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::XYZ
    }
}

impl Orientation {
    /// Columns along X, rows along Y, sections along Z.
    pub const XYZ: Orientation = Orientation {
        cols: Axis::X,
        rows: Axis::Y,
        sections: Axis::Z,
    };

    pub fn new(cols: Axis, rows: Axis, sections: Axis) -> Result<Self, Error> {
        if cols == rows || rows == sections || cols == sections {
            return Err(Error::InvalidOrientation(format!(
                "repeated axis values: ({cols}, {rows}, {sections})"
            )));
        }
        Ok(Self {
            cols,
            rows,
            sections,
        })
    }

    /// Builds an orientation from three axis labels such as `"X"` or `"z"`.
    pub fn from_labels(cols: &str, rows: &str, sections: &str) -> Result<Self, Error> {
        let parse = |label: &str| -> Result<Axis, Error> {
            let mut chars = label.chars();
            let axis = match (chars.next(), chars.next()) {
                (Some(c), None) => Axis::from_char(c),
                _ => None,
            };
            axis.ok_or_else(|| {
                Error::InvalidOrientation(format!(
                    "axis label {label:?} must be one of X, Y, Z"
                ))
            })
        };
        Self::new(parse(cols)?, parse(rows)?, parse(sections)?)
    }

    /// Builds an orientation from the header's axis codes (mapc, mapr, maps).
    pub fn from_integers(codes: [i32; 3]) -> Result<Self, Error> {
        let invalid = || {
            Error::InvalidOrientation(format!(
                "invalid axis codes {codes:?}: use each of 1, 2, 3 exactly once"
            ))
        };
        let [c, r, s] = codes;
        let cols = Axis::from_code(c).ok_or_else(invalid)?;
        let rows = Axis::from_code(r).ok_or_else(invalid)?;
        let sections = Axis::from_code(s).ok_or_else(invalid)?;
        Self::new(cols, rows, sections).map_err(|_| invalid())
    }

    /// Axis codes of (columns, rows, sections).
    #[inline]
    pub fn to_integers(&self) -> [i32; 3] {
        [self.cols.code(), self.rows.code(), self.sections.code()]
    }

    /// For each array axis of a (section, row, column) grid, the C-order
    /// index (0 = Z, 1 = Y, 2 = X) of the logical axis stored there.
    #[inline]
    pub fn to_axis_order(&self) -> [usize; 3] {
        [
            self.sections.c_order_index(),
            self.rows.c_order_index(),
            self.cols.c_order_index(),
        ]
    }

    /// Inverse of [`Orientation::to_axis_order`].
    pub fn from_axis_order(order: [usize; 3]) -> Result<Self, Error> {
        let invalid = || {
            Error::InvalidOrientation(format!(
                "invalid axis order {order:?}: use each of 0, 1, 2 exactly once"
            ))
        };
        let sections = Axis::from_c_order_index(order[0]).ok_or_else(invalid)?;
        let rows = Axis::from_c_order_index(order[1]).ok_or_else(invalid)?;
        let cols = Axis::from_c_order_index(order[2]).ok_or_else(invalid)?;
        Self::new(cols, rows, sections).map_err(|_| invalid())
    }

    #[inline]
    pub fn cols(&self) -> Axis {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> Axis {
        self.rows
    }

    #[inline]
    pub fn sections(&self) -> Axis {
        self.sections
    }

    /// Role (0 = columns, 1 = rows, 2 = sections) played by `axis`.
    #[inline]
    pub fn position_of(&self, axis: Axis) -> usize {
        if self.cols == axis {
            0
        } else if self.rows == axis {
            1
        } else {
            2
        }
    }

    /// The permutation that carries this orientation onto `other`; equal to
    /// `PermutationMatrix::from_orientations` on the two axis-code triples.
    #[inline]
    pub fn derive_permutation(&self, other: &Orientation) -> PermutationMatrix {
        PermutationMatrix::from_columns([
            other.position_of(self.cols),
            other.position_of(self.rows),
            other.position_of(self.sections),
        ])
    }
}

impl FromStr for Orientation {
    type Err = Error;

    /// Parses three letters, e.g. `"ZYX"` or `"yzx"`.
    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || {
            Error::InvalidOrientation(format!(
                "invalid orientation string {s:?}: use the letters X, Y, Z once each"
            ))
        };
        let axes: Vec<Axis> = s
            .chars()
            .map(Axis::from_char)
            .collect::<Option<_>>()
            .ok_or_else(invalid)?;
        match axes[..] {
            [cols, rows, sections] => Self::new(cols, rows, sections).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.cols, self.rows, self.sections)
    }
}

impl Div for Orientation {
    type Output = PermutationMatrix;

    fn div(self, other: Orientation) -> PermutationMatrix {
        self.derive_permutation(&other)
    }
}

impl Div for &Orientation {
    type Output = PermutationMatrix;

    fn div(self, other: &Orientation) -> PermutationMatrix {
        self.derive_permutation(other)
    }
}
