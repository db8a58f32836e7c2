use crate::{Error, Mode};
use tracing::warn;

/// Size of the fixed header block, labels included.
pub const HEADER_SIZE: usize = 1024;
/// Width of one text label.
pub const LABEL_SIZE: usize = 80;
/// Number of label slots in the header.
pub const MAX_LABELS: usize = 10;

const LABEL_OFFSET: usize = 224;

/// Byte order of a map file, as announced by its machine stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEndian {
    LittleEndian,
    BigEndian,
}

impl FileEndian {
    /// Stamp written by this crate: little-endian IEEE floats and integers.
    pub const LITTLE_ENDIAN_STAMP: [u8; 4] = [0x44, 0x44, 0x00, 0x00];
    pub const BIG_ENDIAN_STAMP: [u8; 4] = [0x11, 0x11, 0x00, 0x00];

    /// Only `0x11 0x11` denotes big-endian; older tools write several
    /// little-endian variants (`0x44 0x41`, `0x44 0x44`), so anything else is
    /// treated as little-endian.
    #[inline]
    pub fn from_machst(machst: &[u8; 4]) -> Self {
        if machst[0] == 0x11 && machst[1] == 0x11 {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    #[inline]
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    #[inline]
    pub fn machst(&self) -> [u8; 4] {
        match self {
            Self::LittleEndian => Self::LITTLE_ENDIAN_STAMP,
            Self::BigEndian => Self::BIG_ENDIAN_STAMP,
        }
    }
}

/// The 1024-byte MRC/CCP4 map header.
///
/// Field names follow the CCP4 map format description. Fields that
/// [`MapFile`](crate::MapFile) derives from its grid (dimensions, lengths,
/// axis roles, statistics, label count) are overwritten before every write;
/// the others are carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    /// Number of columns (fastest changing axis)
    pub nc: i32,
    /// Number of rows
    pub nr: i32,
    /// Number of sections (slowest changing axis)
    pub ns: i32,
    /// Voxel mode (see [`Mode`])
    pub mode: u32,
    /// Position of the first column, row and section in the unit cell
    pub start: [i32; 3],
    /// Intervals along X
    pub nx: i32,
    /// Intervals along Y
    pub ny: i32,
    /// Intervals along Z
    pub nz: i32,
    /// Unit cell length along X in Ångström
    pub x_length: f32,
    /// Unit cell length along Y in Ångström
    pub y_length: f32,
    /// Unit cell length along Z in Ångström
    pub z_length: f32,
    /// Cell angle between Y and Z in degrees
    pub alpha: f32,
    /// Cell angle between X and Z in degrees
    pub beta: f32,
    /// Cell angle between X and Y in degrees
    pub gamma: f32,
    /// Axis code (1, 2, 3 for X, Y, Z) of the columns
    pub mapc: i32,
    /// Axis code of the rows
    pub mapr: i32,
    /// Axis code of the sections
    pub maps: i32,
    /// Minimum density
    pub amin: f32,
    /// Maximum density
    pub amax: f32,
    /// Mean density
    pub amean: f32,
    /// Space group number
    pub ispg: i32,
    /// Bytes of symmetry records (extended header) following the header
    pub nsymbt: i32,
    /// Non-zero when the skew matrix and translation apply
    pub lskflg: i32,
    /// Skew matrix S11..S33, row major
    pub skew_matrix: [f32; 9],
    /// Skew translation T1..T3
    pub skew_translation: [f32; 3],
    /// Reserved words
    pub extra: [i32; 15],
    /// Must contain "MAP "
    pub map: [u8; 4],
    /// Machine stamp encoding the byte order
    pub machst: [u8; 4],
    /// Root-mean-square density
    pub rms: f32,
    /// Number of labels in use
    pub nlabl: i32,
    /// Ten 80-byte label slots
    pub label: [u8; MAX_LABELS * LABEL_SIZE],
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    #[inline]
    /// Constructs the header of an empty map: no dimensions, 32-bit float
    /// mode, orthogonal cell, P1 space group, XYZ axis roles.
    pub const fn new() -> Self {
        Self {
            nc: 0,
            nr: 0,
            ns: 0,
            mode: 2,
            start: [0; 3],
            nx: 0,
            ny: 0,
            nz: 0,
            x_length: 0.0,
            y_length: 0.0,
            z_length: 0.0,
            alpha: 90.0,
            beta: 90.0,
            gamma: 90.0,
            mapc: 1,
            mapr: 2,
            maps: 3,
            amin: 0.0,
            amax: 0.0,
            amean: 0.0,
            ispg: 1,
            nsymbt: 0,
            lskflg: 0,
            skew_matrix: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            skew_translation: [0.0; 3],
            extra: [0; 15],
            map: *b"MAP ",
            machst: FileEndian::LITTLE_ENDIAN_STAMP,
            rms: 0.0,
            nlabl: 0,
            label: [0; MAX_LABELS * LABEL_SIZE],
        }
    }

    #[inline]
    /// Offset, in bytes, from file start to the first voxel value.
    // Symmetry records (nsymbt bytes) sit between the header and the data,
    // so this is 1024 only when there is no extended header.
    pub fn data_offset(&self) -> usize {
        HEADER_SIZE + self.extended_header_size()
    }

    #[inline]
    pub fn extended_header_size(&self) -> usize {
        self.nsymbt.max(0) as usize
    }

    #[inline]
    /// Number of voxels declared by the header, `None` if it overflows `usize`.
    pub fn voxel_count(&self) -> Option<usize> {
        let [nc, nr, ns] = [self.nc, self.nr, self.ns].map(|n| n.max(0) as usize);
        nc.checked_mul(nr)?.checked_mul(ns)
    }

    #[inline]
    /// Size, in bytes, of the voxel data block.
    ///
    /// `None` for an unknown mode or when the size overflows `usize`.
    pub fn data_size(&self) -> Option<usize> {
        let mode = Mode::from_u32(self.mode)?;
        self.voxel_count()?.checked_mul(mode.byte_size())
    }

    /// Checks the map tag, the dimensions, the mode and the data size.
    pub fn validate(&self) -> Result<Mode, Error> {
        if self.map != *b"MAP " {
            return Err(Error::MalformedHeader(format!(
                "missing map tag, found {:?}",
                String::from_utf8_lossy(&self.map)
            )));
        }
        if self.nc < 0 || self.nr < 0 || self.ns < 0 {
            return Err(Error::MalformedHeader(format!(
                "negative dimensions ({}, {}, {})",
                self.nc, self.nr, self.ns
            )));
        }
        if self.nsymbt < 0 {
            return Err(Error::MalformedHeader(format!(
                "negative symmetry table size {}",
                self.nsymbt
            )));
        }
        let mode = Mode::try_from(self.mode)?;
        if self.data_size().is_none() {
            return Err(Error::MalformedHeader(format!(
                "dimensions ({}, {}, {}) overflow the addressable data size",
                self.nc, self.nr, self.ns
            )));
        }
        Ok(mode)
    }

    #[inline]
    pub fn detect_endian(&self) -> FileEndian {
        FileEndian::from_machst(&self.machst)
    }

    /// Text of the labels in use, with trailing padding removed.
    ///
    /// A label count beyond the ten slots is clamped with a warning.
    pub fn labels(&self) -> Vec<String> {
        let count = if self.nlabl < 0 || self.nlabl as usize > MAX_LABELS {
            warn!(
                nlabl = self.nlabl,
                "label count overruns the header label block; reading at most {MAX_LABELS}"
            );
            (self.nlabl.max(0) as usize).min(MAX_LABELS)
        } else {
            self.nlabl as usize
        };

        self.label
            .chunks_exact(LABEL_SIZE)
            .take(count)
            .map(|slot| {
                String::from_utf8_lossy(slot)
                    .trim_end_matches([' ', '\0'])
                    .to_string()
            })
            .collect()
    }

    /// Fills the label block: used slots are space padded, unused slots
    /// zeroed. Labels must already fit in 80 bytes; longer ones are cut.
    pub fn set_labels<S: AsRef<str>>(&mut self, labels: &[S]) {
        self.label = [0; MAX_LABELS * LABEL_SIZE];
        let used = labels.len().min(MAX_LABELS);
        for (slot, text) in self.label.chunks_exact_mut(LABEL_SIZE).zip(&labels[..used]) {
            let bytes = text.as_ref().as_bytes();
            let n = bytes.len().min(LABEL_SIZE);
            slot[..n].copy_from_slice(&bytes[..n]);
            slot[n..].fill(b' ');
        }
        self.nlabl = used as i32;
    }

    /// Decode a header from raw bytes, honouring the byte order announced by
    /// the machine stamp at bytes 212-215.
    pub fn decode_from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let machst = [bytes[212], bytes[213], bytes[214], bytes[215]];
        let file_endian = FileEndian::from_machst(&machst);

        let word = |offset: usize| -> [u8; 4] {
            [bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]
        };
        let decode_i32 = |offset: usize| -> i32 {
            match file_endian {
                FileEndian::LittleEndian => i32::from_le_bytes(word(offset)),
                FileEndian::BigEndian => i32::from_be_bytes(word(offset)),
            }
        };
        let decode_u32 = |offset: usize| -> u32 {
            match file_endian {
                FileEndian::LittleEndian => u32::from_le_bytes(word(offset)),
                FileEndian::BigEndian => u32::from_be_bytes(word(offset)),
            }
        };
        let decode_f32 = |offset: usize| -> f32 {
            match file_endian {
                FileEndian::LittleEndian => f32::from_le_bytes(word(offset)),
                FileEndian::BigEndian => f32::from_be_bytes(word(offset)),
            }
        };

        let mut header = Self::new();

        header.nc = decode_i32(0);
        header.nr = decode_i32(4);
        header.ns = decode_i32(8);
        header.mode = decode_u32(12);
        header.start = [decode_i32(16), decode_i32(20), decode_i32(24)];
        header.nx = decode_i32(28);
        header.ny = decode_i32(32);
        header.nz = decode_i32(36);

        header.x_length = decode_f32(40);
        header.y_length = decode_f32(44);
        header.z_length = decode_f32(48);
        header.alpha = decode_f32(52);
        header.beta = decode_f32(56);
        header.gamma = decode_f32(60);

        header.mapc = decode_i32(64);
        header.mapr = decode_i32(68);
        header.maps = decode_i32(72);

        header.amin = decode_f32(76);
        header.amax = decode_f32(80);
        header.amean = decode_f32(84);

        header.ispg = decode_i32(88);
        header.nsymbt = decode_i32(92);
        header.lskflg = decode_i32(96);

        for (i, value) in header.skew_matrix.iter_mut().enumerate() {
            *value = decode_f32(100 + 4 * i);
        }
        for (i, value) in header.skew_translation.iter_mut().enumerate() {
            *value = decode_f32(136 + 4 * i);
        }
        for (i, value) in header.extra.iter_mut().enumerate() {
            *value = decode_i32(148 + 4 * i);
        }

        // Tag and stamp are byte signatures, never swapped
        header.map.copy_from_slice(&bytes[208..212]);
        header.machst = machst;

        header.rms = decode_f32(216);
        header.nlabl = decode_i32(220);

        header.label.copy_from_slice(&bytes[LABEL_OFFSET..HEADER_SIZE]);

        header
    }

    /// Encode the header to raw bytes in the byte order announced by its
    /// machine stamp.
    pub fn encode_to_bytes(&self, out: &mut [u8; HEADER_SIZE]) {
        let file_endian = self.detect_endian();

        macro_rules! encode {
            ($offset:expr, $value:expr) => {
                let bytes = match file_endian {
                    FileEndian::LittleEndian => $value.to_le_bytes(),
                    FileEndian::BigEndian => $value.to_be_bytes(),
                };
                out[$offset..$offset + 4].copy_from_slice(&bytes);
            };
        }

        encode!(0, self.nc);
        encode!(4, self.nr);
        encode!(8, self.ns);
        encode!(12, self.mode);
        encode!(16, self.start[0]);
        encode!(20, self.start[1]);
        encode!(24, self.start[2]);
        encode!(28, self.nx);
        encode!(32, self.ny);
        encode!(36, self.nz);

        encode!(40, self.x_length);
        encode!(44, self.y_length);
        encode!(48, self.z_length);
        encode!(52, self.alpha);
        encode!(56, self.beta);
        encode!(60, self.gamma);

        encode!(64, self.mapc);
        encode!(68, self.mapr);
        encode!(72, self.maps);

        encode!(76, self.amin);
        encode!(80, self.amax);
        encode!(84, self.amean);

        encode!(88, self.ispg);
        encode!(92, self.nsymbt);
        encode!(96, self.lskflg);

        for (i, value) in self.skew_matrix.iter().enumerate() {
            encode!(100 + 4 * i, value);
        }
        for (i, value) in self.skew_translation.iter().enumerate() {
            encode!(136 + 4 * i, value);
        }
        for (i, value) in self.extra.iter().enumerate() {
            encode!(148 + 4 * i, value);
        }

        out[208..212].copy_from_slice(&self.map);
        out[212..216].copy_from_slice(&self.machst);

        encode!(216, self.rms);
        encode!(220, self.nlabl);

        out[LABEL_OFFSET..HEADER_SIZE].copy_from_slice(&self.label);
    }

    /// Convenience wrapper around [`Header::encode_to_bytes`].
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        self.encode_to_bytes(&mut out);
        out
    }
}
