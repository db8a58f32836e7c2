//! 3x3 permutation matrices relating two axis orderings.

use crate::Error;
use core::fmt;
use core::ops::{Mul, MulAssign};

/// A square 0/1 matrix with exactly one 1 in every row and every column.
///
/// Built from an old and a new ordering of axis codes, entry
/// `(i, position of old[i] in new)` is 1. Multiplying a row vector on the
/// right (`v · P`) moves the value at position `i` of the old ordering to its
/// position in the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermutationMatrix {
    /// Column of the 1 in each row.
    columns: [usize; 3],
}

impl Default for PermutationMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PermutationMatrix {
    pub const IDENTITY: PermutationMatrix = PermutationMatrix {
        columns: [0, 1, 2],
    };

    /// Validates a dense matrix.
    pub fn new(matrix: [[i32; 3]; 3]) -> Result<Self, Error> {
        let invalid = || Error::InvalidPermutation(matrix);

        let entries = matrix.iter().flatten();
        let nonzero = entries.clone().filter(|&&e| e != 0).count();
        let sum: i64 = entries.clone().map(|&e| i64::from(e)).sum();
        if nonzero != 3 || sum != 3 || entries.clone().any(|&e| e != 0 && e != 1) {
            return Err(invalid());
        }

        let mut columns = [0usize; 3];
        let mut used = [false; 3];
        for (row, values) in matrix.iter().enumerate() {
            let mut ones = values.iter().enumerate().filter(|&(_, &e)| e == 1);
            match (ones.next(), ones.next()) {
                (Some((col, _)), None) if !used[col] => {
                    columns[row] = col;
                    used[col] = true;
                }
                _ => return Err(invalid()),
            }
        }
        Ok(Self { columns })
    }

    /// Crate-internal constructor for a row-to-column map already known to
    /// be a bijection.
    #[inline]
    pub(crate) const fn from_columns(columns: [usize; 3]) -> Self {
        Self { columns }
    }

    /// The matrix carrying the ordering `old` onto `new`.
    ///
    /// Both orderings must hold three distinct codes drawn from the same set.
    pub fn from_orientations(old: &[i32], new: &[i32]) -> Result<Self, Error> {
        for ordering in [old, new] {
            if ordering.len() != 3 {
                return Err(Error::ShapeMismatch {
                    expected: 3,
                    found: ordering.len(),
                });
            }
            if ordering[0] == ordering[1] || ordering[1] == ordering[2] || ordering[0] == ordering[2]
            {
                return Err(Error::DuplicateAxis(ordering.to_vec()));
            }
        }

        let mut columns = [0usize; 3];
        for (row, code) in old.iter().enumerate() {
            columns[row] = new
                .iter()
                .position(|c| c == code)
                .ok_or_else(|| Error::AxisSetMismatch {
                    old: old.to_vec(),
                    new: new.to_vec(),
                })?;
        }
        Ok(Self { columns })
    }

    #[inline]
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        u8::from(self.columns[row] == col)
    }

    /// Dense form of the matrix.
    pub fn as_array(&self) -> [[u8; 3]; 3] {
        core::array::from_fn(|row| core::array::from_fn(|col| self.get(row, col)))
    }

    /// The transpose, which for a permutation matrix is also its inverse.
    pub fn transpose(&self) -> Self {
        let mut columns = [0usize; 3];
        for (row, &col) in self.columns.iter().enumerate() {
            columns[col] = row;
        }
        Self { columns }
    }

    /// `P · v` for a column vector `v` of length 3.
    pub fn left_mul<T: Copy>(&self, v: &[T]) -> Result<[T; 3], Error> {
        check_len(v)?;
        Ok(core::array::from_fn(|row| v[self.columns[row]]))
    }

    /// `v · P` for a row vector `v` of length 3.
    pub fn right_mul<T: Copy>(&self, v: &[T]) -> Result<[T; 3], Error> {
        check_len(v)?;
        let rows = self.transpose().columns;
        Ok(core::array::from_fn(|col| v[rows[col]]))
    }

    /// Pairwise axis swaps that apply this permutation to an array stored in
    /// (section, row, column) order, i.e. with axes numbered in reverse of the
    /// (column, row, section) ordering the matrix is built from.
    ///
    /// Swaps are applied in sequence; applying the reversed sequence undoes
    /// them.
    pub fn swap_sequence(&self) -> &'static [(usize, usize)] {
        match self.columns {
            [0, 1, 2] => &[],
            [0, 2, 1] => &[(0, 1)],
            [1, 0, 2] => &[(1, 2)],
            [2, 1, 0] => &[(0, 2)],
            [2, 0, 1] => &[(0, 2), (1, 2)],
            [1, 2, 0] => &[(0, 2), (0, 1)],
            // Construction only admits the six permutations of three axes
            other => unreachable!("row-to-column map {other:?} is not a permutation"),
        }
    }
}

#[inline]
fn check_len<T>(v: &[T]) -> Result<(), Error> {
    if v.len() != 3 {
        return Err(Error::ShapeMismatch {
            expected: 3,
            found: v.len(),
        });
    }
    Ok(())
}

impl Mul for PermutationMatrix {
    type Output = PermutationMatrix;

    /// Matrix product: applying `self` then `rhs` to a row vector.
    fn mul(self, rhs: PermutationMatrix) -> PermutationMatrix {
        PermutationMatrix {
            columns: core::array::from_fn(|row| rhs.columns[self.columns[row]]),
        }
    }
}

impl MulAssign for PermutationMatrix {
    fn mul_assign(&mut self, rhs: PermutationMatrix) {
        *self = *self * rhs;
    }
}

impl fmt::Display for PermutationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.as_array() {
            writeln!(f, "[{} {} {}]", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}
