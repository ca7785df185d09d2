//! File input/output and status reporting.

pub mod voxel_lines;

use crate::error::FieldError;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fs,
    io::BufReader,
    path::Path,
};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// How much non-critical status output to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(rename_all = "lowercase"))]
pub enum Verbosity {
    #[default]
    Quiet,
    Messages,
    Progress,
}

impl Verbosity {
    /// Whether status messages should be printed.
    pub fn print_messages(&self) -> bool {
        matches!(self, Self::Messages | Self::Progress)
    }

    /// Whether progress bars should be shown.
    pub fn show_progress(&self) -> bool {
        *self == Self::Progress
    }

    /// Creates a progress bar over the given number of items, which is
    /// hidden unless progress should be shown.
    pub fn create_progress_bar(&self, n_items: usize) -> ProgressBar {
        if self.show_progress() {
            let progress_bar = ProgressBar::new(n_items as u64);
            if let Ok(style) =
                ProgressStyle::with_template("Progress: {bar:40}  {percent}% | ETA: {eta}")
            {
                progress_bar.set_style(style);
            }
            progress_bar
        } else {
            ProgressBar::hidden()
        }
    }
}

/// Opens the file at the given path for buffered reading, reporting any
/// failure as a file access error.
pub fn open_file_and_map_err<P: AsRef<Path>>(file_path: P) -> Result<BufReader<fs::File>, FieldError> {
    let file_path = file_path.as_ref();
    fs::File::open(file_path)
        .map(BufReader::new)
        .map_err(|err| FieldError::from_io_at_path(file_path, err))
}

/// Creates the file at the given path for writing, reporting any failure
/// as a file access error.
pub fn create_file_and_map_err<P: AsRef<Path>>(file_path: P) -> Result<fs::File, FieldError> {
    let file_path = file_path.as_ref();
    fs::File::create(file_path).map_err(|err| FieldError::from_io_at_path(file_path, err))
}

/// Reads the content of the specified text file.
pub fn read_text_file<P: AsRef<Path>>(file_path: P) -> Result<String, FieldError> {
    let file_path = file_path.as_ref();
    fs::read_to_string(file_path).map_err(|err| FieldError::from_io_at_path(file_path, err))
}
