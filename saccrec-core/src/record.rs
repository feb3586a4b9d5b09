use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::hardware::HardwareSnapshot;
use crate::subject::Subject;
use crate::trial::TestResult;

pub const RECORD_EXTENSION: &str = "rec";

/// Study record persisted once per completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub subject: Subject,
    pub hardware: HardwareSnapshot,
    pub tests: Vec<TestResult>,
}

/// Fails unless `path` ends in `.rec` (case-insensitive).
pub fn ensure_record_extension(path: &Path) -> Result<(), RecordError> {
    let ok = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION));
    if ok {
        Ok(())
    } else {
        Err(RecordError::Extension(path.to_path_buf()))
    }
}

/// Directory next to the record where per-test arrays are written:
/// `study.rec` maps to `study.data/`.
pub fn data_directory(record_path: &Path) -> PathBuf {
    record_path.with_extension("data")
}

impl Record {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let path = path.as_ref();
        ensure_record_extension(path)?;
        let io_error = |source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(io_error)?;

        tracing::info!(path = %path.display(), tests = self.tests.len(), "record saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_checked() {
        assert!(ensure_record_extension(Path::new("/tmp/study.rec")).is_ok());
        assert!(ensure_record_extension(Path::new("/tmp/STUDY.REC")).is_ok());
        assert!(matches!(
            ensure_record_extension(Path::new("/tmp/study.json")),
            Err(RecordError::Extension(_))
        ));
        assert!(ensure_record_extension(Path::new("/tmp/study")).is_err());
    }

    #[test]
    fn data_directory_sits_next_to_record() {
        assert_eq!(
            data_directory(Path::new("/data/ana.rec")),
            PathBuf::from("/data/ana.data")
        );
    }

    #[test]
    fn saves_and_loads() {
        use crate::hardware::{ChannelConfig, SampleRate};
        use crate::stimulus::StimulusSpec;
        use crate::subject::{Genre, SubjectStatus};

        let record = Record {
            subject: Subject {
                full_name: "Test Subject".into(),
                genre: Genre::Unknown,
                birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 31).unwrap(),
                status: SubjectStatus::Control,
            },
            hardware: HardwareSnapshot {
                sample_rate: SampleRate::Hz250,
                channels: ChannelConfig::default(),
            },
            tests: vec![TestResult::new(
                "study.data/test-01",
                &StimulusSpec::calibration("Initial calibration"),
            )],
        };

        let path = std::env::temp_dir().join(format!("saccrec-record-{}.rec", std::process::id()));
        record.save(&path).unwrap();
        let loaded = Record::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, record);

        assert!(record.save(path.with_extension("txt")).is_err());
    }
}
