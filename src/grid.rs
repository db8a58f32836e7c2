use crate::{Error, FileEndian, Mode, PermutationMatrix};
use half::f16;
use ndarray::Array3;
use num_complex::Complex32;

/// A numeric value that can be cast into any voxel mode.
pub trait Sample: Copy + 'static {
    fn to_f64(self) -> f64;

    #[inline]
    fn to_complex(self) -> Complex32 {
        Complex32::new(self.to_f64() as f32, 0.0)
    }
}

macro_rules! impl_real_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_real_sample!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl Sample for f16 {
    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
}

impl Sample for Complex32 {
    /// Real part; the imaginary part is discarded when casting to a real mode.
    #[inline]
    fn to_f64(self) -> f64 {
        self.re as f64
    }

    #[inline]
    fn to_complex(self) -> Complex32 {
        self
    }
}

/// A sample type stored on disk by one of the voxel modes.
pub trait Voxel: Sample + bytemuck::Pod {
    const MODE: Mode;

    /// Casts with `as` semantics: floats truncate toward zero and saturate.
    fn from_sample<S: Sample>(value: S) -> Self;

    fn swap_bytes(self) -> Self;

    /// Value used for the density statistics.
    #[inline]
    fn magnitude(self) -> f64 {
        self.to_f64()
    }

    fn wrap(array: Array3<Self>) -> VoxelGrid;

    fn unwrap_ref(grid: &VoxelGrid) -> Option<&Array3<Self>>;

    fn unwrap_mut(grid: &mut VoxelGrid) -> Option<&mut Array3<Self>>;
}

macro_rules! impl_voxel {
    ($t:ty, $variant:ident, |$v:ident| $from:expr, |$w:ident| $swap:expr) => {
        impl Voxel for $t {
            const MODE: Mode = Mode::$variant;

            #[inline]
            fn from_sample<S: Sample>($v: S) -> Self {
                $from
            }

            #[inline]
            fn swap_bytes(self) -> Self {
                let $w = self;
                $swap
            }

            fn wrap(array: Array3<Self>) -> VoxelGrid {
                VoxelGrid::$variant(array)
            }

            fn unwrap_ref(grid: &VoxelGrid) -> Option<&Array3<Self>> {
                match grid {
                    VoxelGrid::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn unwrap_mut(grid: &mut VoxelGrid) -> Option<&mut Array3<Self>> {
                match grid {
                    VoxelGrid::$variant(array) => Some(array),
                    _ => None,
                }
            }
        }
    };
}

impl_voxel!(i8, Int8, |v| v.to_f64() as i8, |w| w);
impl_voxel!(i16, Int16, |v| v.to_f64() as i16, |w| i16::swap_bytes(w));
impl_voxel!(f32, Float32, |v| v.to_f64() as f32, |w| f32::from_bits(
    w.to_bits().swap_bytes()
));
impl_voxel!(i32, Int32, |v| v.to_f64() as i32, |w| i32::swap_bytes(w));
impl_voxel!(u16, Uint16, |v| v.to_f64() as u16, |w| u16::swap_bytes(w));
impl_voxel!(f16, Float16, |v| f16::from_f64(v.to_f64()), |w| f16::from_bits(
    w.to_bits().swap_bytes()
));

impl Voxel for Complex32 {
    const MODE: Mode = Mode::Complex64;

    #[inline]
    fn from_sample<S: Sample>(value: S) -> Self {
        value.to_complex()
    }

    #[inline]
    fn swap_bytes(self) -> Self {
        Complex32::new(
            f32::from_bits(self.re.to_bits().swap_bytes()),
            f32::from_bits(self.im.to_bits().swap_bytes()),
        )
    }

    #[inline]
    fn magnitude(self) -> f64 {
        self.norm() as f64
    }

    fn wrap(array: Array3<Self>) -> VoxelGrid {
        VoxelGrid::Complex64(array)
    }

    fn unwrap_ref(grid: &VoxelGrid) -> Option<&Array3<Self>> {
        match grid {
            VoxelGrid::Complex64(array) => Some(array),
            _ => None,
        }
    }

    fn unwrap_mut(grid: &mut VoxelGrid) -> Option<&mut Array3<Self>> {
        match grid {
            VoxelGrid::Complex64(array) => Some(array),
            _ => None,
        }
    }
}

/// Density statistics written to the header.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Root of the mean squared density
    pub rms: f64,
}

impl Statistics {
    /// Complex grids are summarised by their magnitudes. An empty grid gives
    /// all zeros.
    pub fn of<T: Voxel>(array: &Array3<T>) -> Self {
        if array.is_empty() {
            return Self::default();
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for value in array.iter() {
            let m = value.magnitude();
            min = min.min(m);
            max = max.max(m);
            sum += m;
            sum_sq += m * m;
        }

        let n = array.len() as f64;
        Self {
            min,
            max,
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
        }
    }
}

/// The owned density grid, indexed `[section, row, column]`.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelGrid {
    Int8(Array3<i8>),
    Int16(Array3<i16>),
    Float32(Array3<f32>),
    Int32(Array3<i32>),
    Complex64(Array3<Complex32>),
    Uint16(Array3<u16>),
    Float16(Array3<f16>),
}

macro_rules! dispatch {
    ($grid:expr, $array:ident => $body:expr) => {
        match $grid {
            VoxelGrid::Int8($array) => $body,
            VoxelGrid::Int16($array) => $body,
            VoxelGrid::Float32($array) => $body,
            VoxelGrid::Int32($array) => $body,
            VoxelGrid::Complex64($array) => $body,
            VoxelGrid::Uint16($array) => $body,
            VoxelGrid::Float16($array) => $body,
        }
    };
}

impl<T: Voxel> From<Array3<T>> for VoxelGrid {
    fn from(array: Array3<T>) -> Self {
        T::wrap(array)
    }
}

impl VoxelGrid {
    /// Casts an array of any sample type into the representation of `mode`.
    pub fn from_samples<S: Sample>(array: &Array3<S>, mode: Mode) -> Self {
        match mode {
            Mode::Int8 => Self::Int8(array.mapv(i8::from_sample)),
            Mode::Int16 => Self::Int16(array.mapv(i16::from_sample)),
            Mode::Float32 => Self::Float32(array.mapv(f32::from_sample)),
            Mode::Int32 => Self::Int32(array.mapv(i32::from_sample)),
            Mode::Complex64 => Self::Complex64(array.mapv(Complex32::from_sample)),
            Mode::Uint16 => Self::Uint16(array.mapv(u16::from_sample)),
            Mode::Float16 => Self::Float16(array.mapv(f16::from_sample)),
        }
    }

    pub fn zeros(mode: Mode, shape: (usize, usize, usize)) -> Self {
        Self::from_samples(&Array3::<f32>::zeros(shape), mode)
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        match self {
            Self::Int8(_) => Mode::Int8,
            Self::Int16(_) => Mode::Int16,
            Self::Float32(_) => Mode::Float32,
            Self::Int32(_) => Mode::Int32,
            Self::Complex64(_) => Mode::Complex64,
            Self::Uint16(_) => Mode::Uint16,
            Self::Float16(_) => Mode::Float16,
        }
    }

    /// Shape as (sections, rows, columns).
    #[inline]
    pub fn dim(&self) -> (usize, usize, usize) {
        dispatch!(self, array => array.dim())
    }

    #[inline]
    pub fn len(&self) -> usize {
        dispatch!(self, array => array.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the serialised samples in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len() * self.mode().byte_size()
    }

    /// Typed access, `None` when `T` is not the sample type of this grid.
    #[inline]
    pub fn as_array<T: Voxel>(&self) -> Option<&Array3<T>> {
        T::unwrap_ref(self)
    }

    #[inline]
    pub fn as_array_mut<T: Voxel>(&mut self) -> Option<&mut Array3<T>> {
        T::unwrap_mut(self)
    }

    /// A converted copy; a plain clone when `mode` is already this grid's.
    pub fn cast(&self, mode: Mode) -> Self {
        if mode == self.mode() {
            return self.clone();
        }
        dispatch!(self, array => Self::from_samples(array, mode))
    }

    pub fn into_mode(self, mode: Mode) -> Self {
        if mode == self.mode() {
            self
        } else {
            self.cast(mode)
        }
    }

    /// Real-valued copy for array transforms.
    pub fn to_f32(&self) -> Array3<f32> {
        dispatch!(self, array => array.mapv(|v| v.to_f64() as f32))
    }

    #[inline]
    pub fn swap_axes(&mut self, a: usize, b: usize) {
        dispatch!(self, array => array.swap_axes(a, b))
    }

    /// Reorders the axes by the swap sequence of `permutation`.
    pub fn permute(&mut self, permutation: &PermutationMatrix) {
        for &(a, b) in permutation.swap_sequence() {
            self.swap_axes(a, b);
        }
    }

    pub fn statistics(&self) -> Statistics {
        dispatch!(self, array => Statistics::of(array))
    }

    /// Reads `shape` samples of `mode` from the start of `bytes`.
    pub fn decode(
        bytes: &[u8],
        mode: Mode,
        shape: (usize, usize, usize),
        endian: FileEndian,
    ) -> Result<Self, Error> {
        match mode {
            Mode::Int8 => decode_array::<i8>(bytes, shape, endian),
            Mode::Int16 => decode_array::<i16>(bytes, shape, endian),
            Mode::Float32 => decode_array::<f32>(bytes, shape, endian),
            Mode::Int32 => decode_array::<i32>(bytes, shape, endian),
            Mode::Complex64 => decode_array::<Complex32>(bytes, shape, endian),
            Mode::Uint16 => decode_array::<u16>(bytes, shape, endian),
            Mode::Float16 => decode_array::<f16>(bytes, shape, endian),
        }
    }

    /// Appends the samples in logical (section, row, column) order as
    /// little-endian bytes.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        dispatch!(self, array => encode_array(array, out))
    }
}

fn decode_array<T: Voxel>(
    bytes: &[u8],
    shape: (usize, usize, usize),
    endian: FileEndian,
) -> Result<VoxelGrid, Error> {
    let expected = shape
        .0
        .checked_mul(shape.1)
        .and_then(|n| n.checked_mul(shape.2))
        .and_then(|n| n.checked_mul(core::mem::size_of::<T>()))
        .ok_or_else(|| Error::MalformedHeader(format!("grid shape {shape:?} overflows usize")))?;
    let bytes = bytes.get(..expected).ok_or(Error::TruncatedFile {
        expected: expected as u64,
        found: bytes.len() as u64,
    })?;

    let mut values: Vec<T> = bytemuck::pod_collect_to_vec(bytes);
    if endian != FileEndian::native() {
        for value in values.iter_mut() {
            *value = value.swap_bytes();
        }
    }

    let array = Array3::from_shape_vec(shape, values)
        .map_err(|e| Error::MalformedHeader(e.to_string()))?;
    Ok(T::wrap(array))
}

fn encode_array<T: Voxel>(array: &Array3<T>, out: &mut Vec<u8>) {
    let little_endian = FileEndian::native() == FileEndian::LittleEndian;
    out.reserve(array.len() * core::mem::size_of::<T>());

    match array.as_slice() {
        // Contiguous and already in file order
        Some(values) if little_endian => out.extend_from_slice(bytemuck::cast_slice(values)),
        _ => {
            for &value in array.iter() {
                let value = if little_endian { value } else { value.swap_bytes() };
                out.extend_from_slice(bytemuck::bytes_of(&value));
            }
        }
    }
}
