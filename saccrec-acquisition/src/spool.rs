//! Per-test text spools converted to compressed `.npz` arrays on finish.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use ndarray::Array1;
use ndarray_npy::{NpzWriter, WritableElement};
use saccrec_core::Sample;

use crate::error::AcquisitionError;

/// One value per line, appended while a test is recorded.
pub struct Spool {
    name: &'static str,
    dir: PathBuf,
    writer: BufWriter<File>,
}

impl Spool {
    pub fn create(dir: &Path, name: &'static str) -> Result<Self, AcquisitionError> {
        let path = dir.join(format!("{name}.tmp"));
        let file = File::create(&path).map_err(AcquisitionError::io(&path))?;
        Ok(Self {
            name,
            dir: dir.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tmp", self.name))
    }

    /// Drops the spool and deletes its text file.
    pub fn discard(self) {
        let tmp = self.tmp_path();
        drop(self.writer);
        if let Err(err) = fs::remove_file(&tmp) {
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %err, "cannot remove spool");
            }
        }
    }

    pub fn push(&mut self, value: impl Display) -> Result<(), AcquisitionError> {
        writeln!(self.writer, "{value}").map_err(AcquisitionError::io(self.tmp_path()))
    }

    /// Parses the spool back, writes `<name>.npz` holding array `<name>`
    /// and removes the text file.
    pub fn finish<A: WritableElement>(
        mut self,
        convert: impl Fn(f64) -> A,
    ) -> Result<PathBuf, AcquisitionError> {
        let tmp = self.tmp_path();
        self.writer.flush().map_err(AcquisitionError::io(&tmp))?;
        drop(self.writer);

        let values = read_values(&tmp)?;
        let array: Array1<A> = values.into_iter().map(convert).collect();

        let npz = self.dir.join(format!("{}.npz", self.name));
        let file = File::create(&npz).map_err(AcquisitionError::io(&npz))?;
        let npz_error = |source| AcquisitionError::Npz {
            path: npz.clone(),
            source,
        };
        let mut writer = NpzWriter::new_compressed(file);
        writer.add_array(self.name, &array).map_err(npz_error)?;
        writer.finish().map_err(npz_error)?;

        fs::remove_file(&tmp).map_err(AcquisitionError::io(&tmp))?;
        tracing::debug!(path = %npz.display(), len = array.len(), "spool converted");
        Ok(npz)
    }
}

fn read_values(path: &Path) -> Result<Vec<f64>, AcquisitionError> {
    let file = File::open(path).map_err(AcquisitionError::io(path))?;
    let mut values = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(AcquisitionError::io(path))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed.parse::<f64>().map_err(|_| AcquisitionError::Parse {
            path: path.to_path_buf(),
            line: line_no + 1,
            value: trimmed.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// The five spools of one test: board packet counter, logical sample
/// counter, both eye channels and stimulus markers.
pub struct SpoolSet {
    dir: PathBuf,
    timestamps: Spool,
    time: Spool,
    horizontal: Spool,
    vertical: Spool,
    markers: Spool,
    len: u64,
}

impl SpoolSet {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, AcquisitionError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(AcquisitionError::io(dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            timestamps: Spool::create(dir, "timestamps")?,
            time: Spool::create(dir, "time")?,
            horizontal: Spool::create(dir, "horizontal")?,
            vertical: Spool::create(dir, "vertical")?,
            markers: Spool::create(dir, "markers")?,
            len: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn append(&mut self, sample: &Sample) -> Result<(), AcquisitionError> {
        self.timestamps.push(sample.index)?;
        self.time.push(sample.timestamp)?;
        self.horizontal.push(sample.horizontal)?;
        self.vertical.push(sample.vertical)?;
        self.markers.push(sample.marker_value())?;
        self.len += 1;
        Ok(())
    }

    /// Converts every spool and returns the test directory.
    pub fn finish(self) -> Result<PathBuf, AcquisitionError> {
        self.timestamps.finish(|v| v as u8)?;
        self.time.finish(|v| v as i32)?;
        self.horizontal.finish(|v| v as i32)?;
        self.vertical.finish(|v| v as i32)?;
        self.markers.finish(|v| v as i32)?;
        tracing::info!(dir = %self.dir.display(), samples = self.len, "test data saved");
        Ok(self.dir)
    }

    /// Abandons the test: every spool file is removed, nothing is converted.
    pub fn discard(self) {
        for spool in [self.timestamps, self.time, self.horizontal, self.vertical, self.markers] {
            spool.discard();
        }
        tracing::warn!(dir = %self.dir.display(), samples = self.len, "test data discarded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Ix1;
    use ndarray_npy::NpzReader;

    fn read_npz<A: ndarray_npy::ReadableElement + Clone>(path: &Path) -> (String, Vec<A>) {
        let mut reader = NpzReader::new(File::open(path).unwrap()).unwrap();
        let names = reader.names().unwrap();
        assert_eq!(names.len(), 1);
        let array: Array1<A> = reader.by_name::<ndarray::OwnedRepr<A>, Ix1>(&names[0]).unwrap();
        (names[0].trim_end_matches(".npy").to_string(), array.to_vec())
    }

    fn scratch(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("saccrec-spool-{tag}-{}", std::process::id()))
    }

    #[test]
    fn writes_one_array_per_channel() {
        let dir = scratch("channels");
        let mut spools = SpoolSet::create(&dir).unwrap();
        let samples = [
            Sample {
                index: 255,
                timestamp: 0,
                horizontal: 12.7,
                vertical: -3.9,
                marker: Some(1),
            },
            Sample {
                index: 0,
                timestamp: 1,
                horizontal: -299.0,
                vertical: 299.5,
                marker: None,
            },
        ];
        for sample in &samples {
            spools.append(sample).unwrap();
        }
        assert_eq!(spools.len(), 2);
        let out = spools.finish().unwrap();
        assert_eq!(out, dir);

        let (name, timestamps) = read_npz::<u8>(&dir.join("timestamps.npz"));
        assert_eq!(name, "timestamps");
        assert_eq!(timestamps, vec![255, 0]);
        assert_eq!(read_npz::<i32>(&dir.join("time.npz")).1, vec![0, 1]);
        assert_eq!(read_npz::<i32>(&dir.join("horizontal.npz")).1, vec![12, -299]);
        assert_eq!(read_npz::<i32>(&dir.join("vertical.npz")).1, vec![-3, 299]);
        let (name, markers) = read_npz::<i32>(&dir.join("markers.npz"));
        assert_eq!(name, "markers");
        assert_eq!(markers, vec![1, 0]);

        for name in ["timestamps", "time", "horizontal", "vertical", "markers"] {
            assert!(!dir.join(format!("{name}.tmp")).exists());
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_test_yields_empty_arrays() {
        let dir = scratch("empty");
        let spools = SpoolSet::create(&dir).unwrap();
        assert!(spools.is_empty());
        spools.finish().unwrap();
        assert!(read_npz::<i32>(&dir.join("markers.npz")).1.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn discard_removes_spool_files() {
        let dir = scratch("discard");
        let mut spools = SpoolSet::create(&dir).unwrap();
        spools
            .append(&Sample {
                index: 1,
                timestamp: 0,
                horizontal: 1.0,
                vertical: 2.0,
                marker: None,
            })
            .unwrap();
        spools.discard();

        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_lines_are_reported() {
        let dir = scratch("malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.tmp");
        fs::write(&path, "1\n\nabc\n").unwrap();
        let err = read_values(&path).unwrap_err();
        assert!(matches!(err, AcquisitionError::Parse { line: 3, .. }));
        fs::remove_dir_all(&dir).unwrap();
    }
}
