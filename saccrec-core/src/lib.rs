pub mod error;
pub mod geometry;
pub mod hardware;
pub mod phase;
pub mod record;
pub mod sample;
pub mod settings;
pub mod stimulus;
pub mod subject;
pub mod trial;

pub use error::{ConfigError, GeometryError, RecordError, StimulusError, SubjectError};
pub use geometry::{PixelPoint, ScreenGeometry};
pub use hardware::{ChannelConfig, ChannelSetting, Gain, HardwareSnapshot, SampleRate};
pub use phase::PlayerState;
pub use record::Record;
pub use sample::Sample;
pub use settings::Settings;
pub use stimulus::{Position, StimulusSpec};
pub use subject::{Genre, Subject, SubjectStatus};
pub use trial::TestResult;
