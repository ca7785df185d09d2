//! Line-oriented text format holding one voxel's values per line.
//!
//! Each line contains a concentration followed by the x-, y- and
//! z-components of the gradient, separated by whitespace. Lines appear in
//! voxel order with the x-index varying slowest and the z-index fastest.
//! There is no header.

use super::create_file_and_map_err;
use crate::{
    error::FieldError,
    field::Field,
    geometry::{
        Dim3::{X, Y, Z},
        Vec3,
    },
    num::BFloat,
    species::SpeciesKey,
};
use std::{
    fmt,
    io::{self, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
    str,
};

/// Number of values expected on each line.
pub const VALUES_PER_LINE: usize = 4;

/// Parses the concentration and gradient held by a single line.
///
/// Tokens beyond the fourth are ignored.
///
/// # Errors
///
/// Returns `FieldError::MalformedInput` referring to the given line number
/// if the line has fewer than four tokens or any of them is not a finite
/// number.
pub fn parse_voxel_line<F: BFloat>(
    line: &str,
    line_number: usize,
) -> Result<(F, Vec3<F>), FieldError> {
    let mut values = [F::zero(); VALUES_PER_LINE];
    let mut tokens = line.split_whitespace();
    for (idx, value) in values.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| FieldError::MalformedInput {
            line_number,
            reason: format!("expected {} values, found {}", VALUES_PER_LINE, idx),
        })?;
        *value = token
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .and_then(F::from_f64)
            .ok_or_else(|| FieldError::MalformedInput {
                line_number,
                reason: format!("could not parse `{}` as a finite number", token),
            })?;
    }
    Ok((values[0], Vec3::new(values[1], values[2], values[3])))
}

/// Reads consecutive voxel values from a buffered source.
#[derive(Debug)]
pub struct VoxelLineReader<R> {
    reader: R,
    source_path: Option<PathBuf>,
    line_number: usize,
    buffer: Vec<u8>,
}

impl<R: BufRead> VoxelLineReader<R> {
    /// Creates a new reader positioned before the first line.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            source_path: None,
            line_number: 0,
            buffer: Vec::new(),
        }
    }

    /// Names the file the source was opened from, so that read errors
    /// refer to it.
    pub fn with_source_path<P: Into<PathBuf>>(mut self, source_path: P) -> Self {
        self.source_path = Some(source_path.into());
        self
    }

    /// Returns the path of the file being read, if known.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Returns the number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line_number
    }

    /// Reads and parses the next line.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::MalformedInput` if the source is exhausted or the
    /// line cannot be parsed or is not valid UTF-8, and
    /// `FieldError::FileAccess` if reading fails.
    pub fn next_voxel_values<F: BFloat>(&mut self) -> Result<(F, Vec3<F>), FieldError> {
        self.buffer.clear();
        let n_bytes = match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(n_bytes) => n_bytes,
            Err(err) => {
                return Err(match &self.source_path {
                    Some(source_path) => FieldError::from_io_at_path(source_path.clone(), err),
                    None => FieldError::from_io(err),
                })
            }
        };
        self.line_number += 1;
        if n_bytes == 0 {
            return Err(FieldError::MalformedInput {
                line_number: self.line_number,
                reason: "unexpected end of input".to_string(),
            });
        }
        let line = str::from_utf8(&self.buffer).map_err(|err| FieldError::MalformedInput {
            line_number: self.line_number,
            reason: format!("line is not valid UTF-8 ({})", err),
        })?;
        parse_voxel_line(line, self.line_number)
    }
}

/// Writes the values of the given species for every voxel of the field.
///
/// # Returns
///
/// The number of lines written.
///
/// # Errors
///
/// Returns `FieldError::InvalidParameter` if the field does not hold the
/// species in every voxel, and `FieldError::FileAccess` if writing fails.
pub fn write_voxel_lines<F, W>(
    field: &Field<F>,
    key: &SpeciesKey,
    writer: &mut W,
) -> Result<usize, FieldError>
where
    F: BFloat + fmt::Display,
    W: Write,
{
    let layer = field.species_layer(key).ok_or_else(|| {
        FieldError::InvalidParameter(format!("field does not contain species {}", key))
    })?;
    let mut n_lines = 0;
    for indices in field.grid().voxel_indices() {
        let (concentration, gradient) = layer.value(&indices).ok_or_else(|| {
            FieldError::InvalidParameter(format!(
                "species {} is missing in voxel {}",
                key, indices
            ))
        })?;
        writeln!(
            writer,
            "{} {} {} {}",
            concentration, gradient[X], gradient[Y], gradient[Z]
        )
        .map_err(FieldError::from_io)?;
        n_lines += 1;
    }
    Ok(n_lines)
}

/// Writes the values of the given species to the file at the given path.
pub fn write_voxel_lines_to_file<F, P>(
    field: &Field<F>,
    key: &SpeciesKey,
    file_path: P,
) -> Result<usize, FieldError>
where
    F: BFloat + fmt::Display,
    P: AsRef<Path>,
{
    let file_path = file_path.as_ref();
    let mut writer = BufWriter::new(create_file_and_map_err(file_path)?);
    let n_lines = write_voxel_lines(field, key, &mut writer)?;
    writer
        .flush()
        .map_err(|err: io::Error| FieldError::from_io_at_path(file_path, err))?;
    Ok(n_lines)
}
