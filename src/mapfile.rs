use crate::{
    Error, FileEndian, HEADER_SIZE, Header, LABEL_SIZE, MAX_LABELS, Mode, Orientation, Sample,
    Statistics, VoxelGrid,
};
use core::fmt;
use ndarray::Array3;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// How a map file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// `r`: parse the file, never write it back.
    Read,
    /// `r+`: parse the file and rewrite it on close.
    ReadWrite,
    /// `w`: create or truncate; data must be assigned before close.
    WriteCreate,
}

impl FileMode {
    #[inline]
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::Read)
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadWrite => "r+",
            Self::WriteCreate => "w",
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical size of one voxel along three axes, in Ångström.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSize(pub [f32; 3]);

impl VoxelSize {
    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        self.0
    }
}

impl Default for VoxelSize {
    fn default() -> Self {
        Self([1.0; 3])
    }
}

impl From<f32> for VoxelSize {
    /// Isotropic voxels.
    fn from(size: f32) -> Self {
        Self([size; 3])
    }
}

impl From<[f32; 3]> for VoxelSize {
    fn from(size: [f32; 3]) -> Self {
        Self(size)
    }
}

impl From<(f32, f32, f32)> for VoxelSize {
    fn from((a, b, c): (f32, f32, f32)) -> Self {
        Self([a, b, c])
    }
}

impl TryFrom<&[f32]> for VoxelSize {
    type Error = Error;

    fn try_from(size: &[f32]) -> Result<Self, Error> {
        <[f32; 3]>::try_from(size)
            .map(Self)
            .map_err(|_| Error::ShapeMismatch {
                expected: 3,
                found: size.len(),
            })
    }
}

/// Construction parameters of a new map file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapFileOptions {
    pub orientation: Orientation,
    /// Voxel size along X, Y and Z. It is stored in column, row, section
    /// order, so it is permuted by `orientation`.
    pub voxel_size: VoxelSize,
    pub mode: Mode,
    pub start: [i32; 3],
}

impl Default for MapFileOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::XYZ,
            voxel_size: VoxelSize::default(),
            mode: Mode::Float32,
            start: [0; 3],
        }
    }
}

/// An open MRC/CCP4 map: header fields, labels and the owned voxel grid.
///
/// Writable maps are written back when [`MapFile::close`] is called or the
/// value is dropped. Before every write the dimensions, cell lengths, axis
/// codes, statistics and label block of the header are recomputed from the
/// grid, the orientation and the voxel size.
pub struct MapFile {
    path: PathBuf,
    /// `None` once the handle is released.
    file: Option<File>,
    file_mode: FileMode,
    header: Header,
    extended_header: Vec<u8>,
    labels: Vec<String>,
    orientation: Orientation,
    /// Column, row, section order
    voxel_size: [f32; 3],
    mode: Mode,
    grid: Option<VoxelGrid>,
}

/// Everything parsed out of an existing file.
struct Contents {
    header: Header,
    extended_header: Vec<u8>,
    labels: Vec<String>,
    orientation: Orientation,
    voxel_size: [f32; 3],
    mode: Mode,
    grid: VoxelGrid,
}

impl MapFile {
    /// Opens `path`. Read modes parse the whole file immediately; write mode
    /// behaves like [`MapFile::create`] with default options.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display(), mode = %file_mode))]
    pub fn open(path: impl AsRef<Path>, file_mode: FileMode) -> Result<Self, Error> {
        let path = path.as_ref();
        if file_mode == FileMode::WriteCreate {
            return Self::create(path, MapFileOptions::default());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(file_mode == FileMode::ReadWrite)
            .open(path)?;
        let contents = with_contents(&file, decode_map)?;
        debug!(
            shape = ?contents.grid.dim(),
            mode = %contents.mode,
            orientation = %contents.orientation,
            "parsed map file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            file_mode,
            header: contents.header,
            extended_header: contents.extended_header,
            labels: contents.labels,
            orientation: contents.orientation,
            voxel_size: contents.voxel_size,
            mode: contents.mode,
            grid: Some(contents.grid),
        })
    }

    /// Creates (or truncates) `path` for writing. Nothing is written until
    /// the map is closed or dropped.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>, options: MapFileOptions) -> Result<Self, Error> {
        let path = path.as_ref();
        let voxel_size = (Orientation::XYZ / options.orientation).right_mul(&options.voxel_size.0)?;

        let mut header = Header::new();
        header.mode = options.mode.code();
        header.start = options.start;
        [header.mapc, header.mapr, header.maps] = options.orientation.to_integers();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            file_mode: FileMode::WriteCreate,
            header,
            extended_header: Vec::new(),
            labels: Vec::new(),
            orientation: options.orientation,
            voxel_size,
            mode: options.mode,
            grid: None,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn file_mode(&self) -> FileMode {
        self.file_mode
    }

    /// The header as last recomputed.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable access for the fields carried through unchanged (cell angles,
    /// space group, skew, reserved words). Derived fields are overwritten on
    /// the next recomputation.
    #[inline]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    #[inline]
    pub fn nc(&self) -> i32 {
        self.header.nc
    }

    #[inline]
    pub fn nr(&self) -> i32 {
        self.header.nr
    }

    #[inline]
    pub fn ns(&self) -> i32 {
        self.header.ns
    }

    /// Bytes between the main header and the voxel data.
    #[inline]
    pub fn extended_header(&self) -> &[u8] {
        &self.extended_header
    }

    /// Statistics of the current grid.
    pub fn statistics(&self) -> Option<Statistics> {
        self.grid.as_ref().map(VoxelGrid::statistics)
    }

    // Data

    /// The grid, indexed `[section, row, column]`; `None` until assigned.
    #[inline]
    pub fn data(&self) -> Option<&VoxelGrid> {
        self.grid.as_ref()
    }

    /// In-place access to the samples. Call [`MapFile::update_header`] to
    /// refresh the statistics afterwards; the write path does it regardless.
    #[inline]
    pub fn data_mut(&mut self) -> Option<&mut VoxelGrid> {
        self.grid.as_mut()
    }

    /// Replaces the grid with `data` cast to the current voxel mode.
    pub fn set_data<S: Sample>(&mut self, data: Array3<S>) -> Result<(), Error> {
        self.grid = Some(VoxelGrid::from_samples(&data, self.mode));
        self.update_header()
    }

    /// Replaces the grid, casting it to the current voxel mode if needed.
    pub fn set_grid(&mut self, grid: VoxelGrid) -> Result<(), Error> {
        self.grid = Some(grid.into_mode(self.mode));
        self.update_header()
    }

    /// Removes the grid, leaving a writable map unable to close cleanly until
    /// a new one is assigned.
    pub fn take_data(&mut self) -> Option<VoxelGrid> {
        self.grid.take()
    }

    // Voxel size

    /// Voxel size in column, row, section order.
    #[inline]
    pub fn voxel_size(&self) -> [f32; 3] {
        self.voxel_size
    }

    /// Sets the voxel size in column, row, section order; a scalar applies
    /// to all three.
    pub fn set_voxel_size(&mut self, size: impl Into<VoxelSize>) -> Result<(), Error> {
        self.voxel_size = size.into().to_array();
        self.refresh()
    }

    // Voxel mode

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Changes the voxel mode and casts the grid.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error> {
        let old = self.mode;
        if old.is_integer() && mode.is_float() {
            warn!(from = %old, to = %mode, "file size will increase by converting integer voxels to float");
        } else if old.is_float() && mode.is_integer() {
            warn!(from = %old, to = %mode, "truncating data by converting float voxels to integer");
        } else if old.is_complex() && !mode.is_complex() {
            warn!(from = %old, to = %mode, "discarding the imaginary part of complex voxels");
        }

        self.mode = mode;
        if let Some(grid) = self.grid.take() {
            self.grid = Some(grid.into_mode(mode));
        }
        self.refresh()
    }

    /// [`MapFile::set_mode`] from a raw header code.
    pub fn set_mode_code(&mut self, code: u32) -> Result<(), Error> {
        self.set_mode(Mode::try_from(code)?)
    }

    // Orientation

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Reorients the map: the grid axes are swapped in place and the voxel
    /// size follows its axes.
    pub fn set_orientation(&mut self, orientation: Orientation) -> Result<(), Error> {
        let permutation = self.orientation / orientation;
        if permutation.is_identity() {
            return Ok(());
        }

        if let Some(grid) = self.grid.as_mut() {
            grid.permute(&permutation);
        }
        self.voxel_size = permutation.right_mul(&self.voxel_size)?;
        debug!(from = %self.orientation, to = %orientation, "reoriented map");
        self.orientation = orientation;
        self.refresh()
    }

    // Start

    #[inline]
    pub fn start(&self) -> [i32; 3] {
        self.header.start
    }

    pub fn set_start(&mut self, start: &[i32]) -> Result<(), Error> {
        self.header.start = <[i32; 3]>::try_from(start).map_err(|_| Error::ShapeMismatch {
            expected: 3,
            found: start.len(),
        })?;
        self.refresh()
    }

    // Labels

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Appends a label. Returns `false`, with a warning, when all ten slots
    /// are taken.
    pub fn add_label(&mut self, text: &str) -> bool {
        if self.labels.len() >= MAX_LABELS {
            warn!(label = text, "all {MAX_LABELS} label slots are used; label not added");
            return false;
        }
        self.labels.push(fit_label(text));
        self.header.nlabl = self.labels.len() as i32;
        true
    }

    /// Inserts a label before `position`. Negative positions count from the
    /// end and a position equal to the label count appends.
    pub fn insert_label(&mut self, text: &str, position: isize) -> bool {
        if self.labels.len() >= MAX_LABELS {
            warn!(label = text, "all {MAX_LABELS} label slots are used; label not inserted");
            return false;
        }
        let Some(index) = self.label_index(position, true) else {
            return false;
        };
        self.labels.insert(index, fit_label(text));
        self.header.nlabl = self.labels.len() as i32;
        true
    }

    pub fn get_label(&self, id: isize) -> Option<&str> {
        self.label_index(id, false)
            .map(|index| self.labels[index].as_str())
    }

    pub fn del_label(&mut self, id: isize) -> Option<String> {
        let index = self.label_index(id, false)?;
        let removed = self.labels.remove(index);
        self.header.nlabl = self.labels.len() as i32;
        Some(removed)
    }

    pub fn clear_labels(&mut self) {
        self.labels.clear();
        self.header.nlabl = 0;
    }

    fn label_index(&self, id: isize, allow_end: bool) -> Option<usize> {
        let count = self.labels.len() as isize;
        let upper = if allow_end { count } else { count - 1 };
        if id < -count || id > upper {
            warn!(id, "label index out of range [{}, {upper}]", -count);
            return None;
        }
        let index = if id < 0 { count + id } else { id };
        Some(index as usize)
    }

    // Whole-map operations

    /// Adopts a copy of another map's grid, cast to this map's mode, together
    /// with its labels, voxel size and orientation.
    pub fn copy(&mut self, other: &MapFile) -> Result<(), Error> {
        let grid = other.grid.as_ref().ok_or(Error::NoData)?;
        self.grid = Some(grid.cast(self.mode));
        self.labels = other.labels.clone();
        self.voxel_size = other.voxel_size;
        self.orientation = other.orientation;
        self.update_header()
    }

    /// Recomputes the derived header fields from the grid, the orientation,
    /// the voxel size and the labels.
    pub fn update_header(&mut self) -> Result<(), Error> {
        let Some(grid) = self.grid.as_mut() else {
            return Err(Error::NoData);
        };
        if grid.mode() != self.mode {
            *grid = grid.cast(self.mode);
        }
        let (ns, nr, nc) = grid.dim();
        let stats = grid.statistics();

        let header = &mut self.header;
        [header.nc, header.nr, header.ns] = [to_i32(nc)?, to_i32(nr)?, to_i32(ns)?];
        [header.nx, header.ny, header.nz] = [header.nc, header.nr, header.ns];
        header.x_length = (nc as f64 * self.voxel_size[0] as f64) as f32;
        header.y_length = (nr as f64 * self.voxel_size[1] as f64) as f32;
        header.z_length = (ns as f64 * self.voxel_size[2] as f64) as f32;
        [header.mapc, header.mapr, header.maps] = self.orientation.to_integers();
        header.mode = self.mode.code();
        header.amin = stats.min as f32;
        header.amax = stats.max as f32;
        header.amean = stats.mean as f32;
        header.rms = stats.rms as f32;
        header.nsymbt = to_i32(self.extended_header.len())?;
        header.set_labels(&self.labels);
        header.map = *b"MAP ";
        header.machst = FileEndian::LittleEndian.machst();
        Ok(())
    }

    /// Recomputes when there is a grid to recompute from.
    fn refresh(&mut self) -> Result<(), Error> {
        if self.grid.is_some() {
            self.update_header()?;
        }
        Ok(())
    }

    /// Writes header, extended header and grid to disk. A no-op for
    /// read-only maps.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub fn save(&mut self) -> Result<(), Error> {
        if !self.file_mode.is_writable() {
            return Ok(());
        }
        self.update_header()?;
        let Some(grid) = self.grid.as_ref() else {
            return Err(Error::NoData);
        };

        let mut buffer =
            Vec::with_capacity(HEADER_SIZE + self.extended_header.len() + grid.byte_len());
        buffer.extend_from_slice(&self.header.to_bytes());
        buffer.extend_from_slice(&self.extended_header);
        grid.encode_into(&mut buffer);

        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buffer)?;
        file.set_len(buffer.len() as u64)?;
        file.flush()?;
        info!(bytes = buffer.len(), shape = ?grid.dim(), mode = %self.mode, "wrote map file");
        Ok(())
    }

    /// Writes a writable map and releases the file.
    pub fn close(mut self) -> Result<(), Error> {
        let result = self.save();
        self.file = None;
        result
    }
}

impl Drop for MapFile {
    fn drop(&mut self) {
        if self.file.is_none() {
            return;
        }
        if let Err(e) = self.save() {
            error!(path = %self.path.display(), error = %e, "failed to write map file on drop");
        }
    }
}

impl PartialEq for MapFile {
    /// Compares the fields that define the map on disk, and the grid.
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.header, &other.header);
        a.nc == b.nc
            && a.nr == b.nr
            && a.ns == b.ns
            && self.mode == other.mode
            && a.start == b.start
            && a.nx == b.nx
            && a.ny == b.ny
            && a.nz == b.nz
            && a.alpha == b.alpha
            && a.beta == b.beta
            && a.gamma == b.gamma
            && self.orientation == other.orientation
            && a.ispg == b.ispg
            && a.nsymbt == b.nsymbt
            && a.lskflg == b.lskflg
            && self.grid == other.grid
    }
}

impl fmt::Debug for MapFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapFile")
            .field("path", &self.path)
            .field("file_mode", &self.file_mode)
            .field("mode", &self.mode)
            .field("orientation", &self.orientation)
            .field("voxel_size", &self.voxel_size)
            .field("shape", &self.grid.as_ref().map(VoxelGrid::dim))
            .field("labels", &self.labels)
            .finish()
    }
}

impl fmt::Display for MapFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        writeln!(f, "{:<32}{}", "File:", self.path.display())?;
        writeln!(f, "{:<32}{}, {}, {}", "Cols, rows, sections:", h.nc, h.nr, h.ns)?;
        writeln!(f, "{:<32}{}", "Mode:", self.mode)?;
        let [c, r, s] = h.start;
        writeln!(f, "{:<32}{c}, {r}, {s}", "Start col, row, section:")?;
        writeln!(f, "{:<32}{}, {}, {}", "Intervals X, Y, Z:", h.nx, h.ny, h.nz)?;
        writeln!(
            f,
            "{:<32}{:.3}, {:.3}, {:.3}",
            "Cell lengths (Å):", h.x_length, h.y_length, h.z_length
        )?;
        writeln!(
            f,
            "{:<32}{:.3}, {:.3}, {:.3}",
            "Cell angles (deg):", h.alpha, h.beta, h.gamma
        )?;
        let [vc, vr, vs] = self.voxel_size;
        writeln!(f, "{:<32}{vc:.4}, {vr:.4}, {vs:.4}", "Voxel size (Å):")?;
        writeln!(f, "{:<32}{}", "Orientation (col, row, sec):", self.orientation)?;
        writeln!(
            f,
            "{:<32}{}, {}, {}",
            "Min, max, mean density:", h.amin, h.amax, h.amean
        )?;
        writeln!(f, "{:<32}{}", "RMS deviation:", h.rms)?;
        writeln!(f, "{:<32}{}", "Space group:", h.ispg)?;
        writeln!(f, "{:<32}{}", "Extended header bytes:", h.nsymbt)?;
        writeln!(f, "{:<32}{}", "Labels:", self.labels.len())?;
        for label in &self.labels {
            writeln!(f, "    {label}")?;
        }
        Ok(())
    }
}

fn to_i32(n: usize) -> Result<i32, Error> {
    i32::try_from(n).map_err(|_| Error::DimensionOverflow(n))
}

/// Cuts a label to at most [`LABEL_SIZE`] bytes on a character boundary.
fn fit_label(text: &str) -> String {
    if text.len() <= LABEL_SIZE {
        return text.to_string();
    }
    let mut end = LABEL_SIZE;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];
    warn!(
        label = text,
        truncated, "label longer than {LABEL_SIZE} bytes will be truncated"
    );
    truncated.to_string()
}

#[cfg(feature = "mmap")]
fn with_contents<R>(file: &File, f: impl FnOnce(&[u8]) -> Result<R, Error>) -> Result<R, Error> {
    if file.metadata()?.len() == 0 {
        return f(&[]);
    }
    // SAFETY: the mapping lives only for this call and is copied out by `f`.
    let mmap = unsafe { memmap2::MmapOptions::new().map(file)? };
    f(&mmap[..])
}

#[cfg(not(feature = "mmap"))]
fn with_contents<R>(file: &File, f: impl FnOnce(&[u8]) -> Result<R, Error>) -> Result<R, Error> {
    use std::io::Read;

    let mut bytes = Vec::new();
    let mut reader = file;
    reader.read_to_end(&mut bytes)?;
    f(&bytes)
}

fn decode_map(bytes: &[u8]) -> Result<Contents, Error> {
    let header_bytes: &[u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            Error::MalformedHeader(format!(
                "file holds {} bytes, shorter than the {HEADER_SIZE}-byte header",
                bytes.len()
            ))
        })?;
    let header = Header::decode_from_bytes(header_bytes);
    let mode = header.validate()?;
    let orientation = Orientation::from_integers([header.mapc, header.mapr, header.maps])?;
    let labels = header.labels();

    let offset = header.data_offset();
    let required = header
        .data_size()
        .and_then(|size| size.checked_add(offset))
        .ok_or_else(|| {
            Error::MalformedHeader(format!(
                "dimensions ({}, {}, {}) overflow the addressable data size",
                header.nc, header.nr, header.ns
            ))
        })?;
    if bytes.len() < required {
        return Err(Error::TruncatedFile {
            expected: required as u64,
            found: bytes.len() as u64,
        });
    }
    let extended_header = bytes[HEADER_SIZE..offset].to_vec();

    let [nc, nr, ns] = [header.nc, header.nr, header.ns].map(|n| n as usize);
    let grid = VoxelGrid::decode(&bytes[offset..], mode, (ns, nr, nc), header.detect_endian())?;

    // Empty axes keep the default unit voxel
    let spacing = |length: f32, count: usize| {
        if count == 0 { 1.0 } else { length / count as f32 }
    };
    let voxel_size = [
        spacing(header.x_length, nc),
        spacing(header.y_length, nr),
        spacing(header.z_length, ns),
    ];

    Ok(Contents {
        header,
        extended_header,
        labels,
        orientation,
        voxel_size,
        mode,
        grid,
    })
}

// Collaborator entry points

/// Opens a map read-only.
pub fn read(path: impl AsRef<Path>) -> Result<MapFile, Error> {
    let path = path.as_ref();
    info!(path = %path.display(), "reading map");
    MapFile::open(path, FileMode::Read)
}

/// Creates a map file holding `grid` in its own voxel mode. With a
/// `reference`, the voxel size, orientation and start are taken from it; the
/// grid is assumed to be laid out accordingly and is not permuted.
///
/// The file is written when the returned map is closed or dropped.
pub fn write(
    path: impl AsRef<Path>,
    grid: impl Into<VoxelGrid>,
    reference: Option<&MapFile>,
) -> Result<MapFile, Error> {
    let path = path.as_ref();
    let grid = grid.into();
    info!(path = %path.display(), shape = ?grid.dim(), "writing map");

    let options = MapFileOptions {
        mode: grid.mode(),
        ..MapFileOptions::default()
    };
    let mut map = MapFile::create(path, options)?;
    if let Some(reference) = reference {
        map.voxel_size = reference.voxel_size;
        map.orientation = reference.orientation;
        map.header.start = reference.header.start;
    }
    map.set_grid(grid)?;
    Ok(map)
}

/// For each array axis of the map's grid, the C-order index (0 = Z, 1 = Y,
/// 2 = X) of the logical axis stored there.
pub fn axis_order_of(map: &MapFile) -> [usize; 3] {
    map.orientation().to_axis_order()
}

/// Reorients `map` so that its grid axes hold the logical axes of `order`.
pub fn set_axis_order(map: &mut MapFile, order: [usize; 3]) -> Result<(), Error> {
    map.set_orientation(Orientation::from_axis_order(order)?)
}
