use crate::Error;

/// On-disk representation of a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    Int8 = 0,
    Int16 = 1,
    #[default]
    Float32 = 2,
    Int32 = 3,
    Complex64 = 4,
    Uint16 = 6,
    Float16 = 12,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Self::Int8,
        Self::Int16,
        Self::Float32,
        Self::Int32,
        Self::Complex64,
        Self::Uint16,
        Self::Float16,
    ];

    #[inline]
    pub fn from_u32(mode: u32) -> Option<Self> {
        match mode {
            0 => Some(Self::Int8),
            1 => Some(Self::Int16),
            2 => Some(Self::Float32),
            3 => Some(Self::Int32),
            4 => Some(Self::Complex64),
            6 => Some(Self::Uint16),
            12 => Some(Self::Float16),
            _ => None,
        }
    }

    #[inline]
    pub fn code(&self) -> u32 {
        *self as u32
    }

    #[inline]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Float32 => 4,
            Self::Int32 => 4,
            Self::Complex64 => 8,
            Self::Uint16 => 2,
            Self::Float16 => 2,
        }
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex64)
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Uint16)
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float16)
    }

    /// Name of the in-memory sample type.
    pub fn dtype_name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Float32 => "float32",
            Self::Int32 => "int32",
            Self::Complex64 => "complex64",
            Self::Uint16 => "uint16",
            Self::Float16 => "float16",
        }
    }
}

impl TryFrom<u32> for Mode {
    type Error = Error;

    fn try_from(mode: u32) -> Result<Self, Error> {
        Self::from_u32(mode).ok_or(Error::UnsupportedVoxelMode(mode))
    }
}

impl core::fmt::Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.code(), self.dtype_name())
    }
}
