use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ndarray::{Array1, Ix1, OwnedRepr};
use ndarray_npy::NpzReader;
use rand::SeedableRng;
use rand::rngs::StdRng;
use saccrec_acquisition::WorkerOptions;
use saccrec_core::{
    ChannelConfig, Genre, HardwareSnapshot, Record, SampleRate, ScreenGeometry, StimulusSpec,
    Subject, SubjectStatus,
};
use saccrec_recording::{
    AutoContinue, OperatorSignal, RecordAssembler, RecordingController, RecordingError,
    RunOutcome,
};
use saccrec_stimulus::SaccadicSchedule;
use saccrec_timing::{HighPrecisionTimer, ManualTimer};

fn scratch(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("saccrec-session-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn options(pid_dir: &Path) -> WorkerOptions {
    WorkerOptions {
        simulated: true,
        sample_rate: SampleRate::Hz250,
        pid_dir: pid_dir.to_path_buf(),
        ..WorkerOptions::default()
    }
}

fn assembler() -> RecordAssembler {
    RecordAssembler::new(
        Subject {
            full_name: "Test Subject".into(),
            genre: Genre::Male,
            birth_date: chrono::NaiveDate::from_ymd_opt(1970, 12, 1).unwrap(),
            status: SubjectStatus::Presymptomatic,
        },
        HardwareSnapshot {
            sample_rate: SampleRate::Hz250,
            channels: ChannelConfig::default(),
        },
    )
}

/// Short tests so a session runs in a few hundred virtual milliseconds.
fn schedules(names: &[&str]) -> Vec<SaccadicSchedule> {
    let screen = ScreenGeometry::new(30.0, 17.0, 800, 600, 24.0).unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    names
        .iter()
        .map(|name| {
            let spec = StimulusSpec::new(*name, 30, 0.05, 20.0, 5).unwrap();
            SaccadicSchedule::generate(&spec, &screen, SampleRate::Hz250, &mut rng).unwrap()
        })
        .collect()
}

fn read_array(path: &Path) -> Vec<i32> {
    let mut reader = NpzReader::new(File::open(path).unwrap()).unwrap();
    let names = reader.names().unwrap();
    let array: Array1<i32> = reader.by_name::<OwnedRepr<i32>, Ix1>(&names[0]).unwrap();
    array.to_vec()
}

#[test]
fn completed_session_writes_one_result_per_test() {
    let dir = scratch("complete");
    let output = dir.join("study.rec");
    let last_timestamp = Rc::new(RefCell::new(None::<u64>));
    let seen = Rc::clone(&last_timestamp);

    let mut controller = RecordingController::new(ManualTimer::new(), AutoContinue, options(&dir))
        .with_sink(move |samples| {
            let mut last = seen.borrow_mut();
            for sample in samples {
                if let Some(previous) = *last {
                    assert_eq!(sample.timestamp, previous + 1);
                }
                *last = Some(sample.timestamp);
            }
        });
    let outcome = controller
        .run(schedules(&["Initial calibration", "Test 1", "Final calibration"]), &output, assembler())
        .unwrap();

    let RunOutcome::Completed(record) = outcome else {
        panic!("session should complete");
    };
    let names: Vec<&str> = record.tests.iter().map(|t| t.test_name.as_str()).collect();
    assert_eq!(names, vec!["Initial calibration", "Test 1", "Final calibration"]);
    assert_eq!(record.tests[1].filename, "study.data/test-02");

    assert_eq!(Record::load(&output).unwrap(), record);
    for n in 1..=3 {
        let test_dir = dir.join(format!("study.data/test-{n:02}"));
        for name in ["timestamps", "time", "horizontal", "vertical", "markers"] {
            assert!(test_dir.join(format!("{name}.npz")).exists());
        }
    }

    assert!(controller.is_worker_running());
    controller.shutdown().unwrap();
    assert!(!controller.is_worker_running());
    assert!(!dir.join("saccrec.pid").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn abort_leaves_no_record() {
    let dir = scratch("abort");
    let output = dir.join("study.rec");

    // Start the first test, let it finish, then abort the second one mid-run.
    let mut polls = 0u32;
    let mut tests_started = 0u32;
    let input = move || {
        polls += 1;
        if polls % 200 == 1 && tests_started < 2 {
            tests_started += 1;
            return Some(OperatorSignal::Continue);
        }
        (tests_started == 2 && polls > 220).then_some(OperatorSignal::Abort)
    };

    let mut controller = RecordingController::new(ManualTimer::new(), input, options(&dir));
    let outcome = controller
        .run(schedules(&["First", "Second", "Third"]), &output, assembler())
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled { completed_tests: 1 }));
    assert!(!output.exists());
    assert!(!controller.is_worker_running());

    // The interrupted test keeps its partial arrays and no spool files.
    let aborted = dir.join("study.data/test-02");
    for name in ["timestamps", "time", "horizontal", "vertical", "markers"] {
        assert!(aborted.join(format!("{name}.npz")).exists(), "{name}.npz missing");
        assert!(!aborted.join(format!("{name}.tmp")).exists());
    }
    assert!(!dir.join("study.data/test-03").exists());
    assert!(!dir.join("saccrec.pid").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn abort_while_showing_message() {
    let dir = scratch("abort-message");
    let output = dir.join("study.rec");
    let input = || Some(OperatorSignal::Abort);

    let mut controller = RecordingController::new(ManualTimer::new(), input, options(&dir));
    let outcome = controller
        .run(schedules(&["Only"]), &output, assembler())
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled { completed_tests: 0 }));
    assert!(!output.exists());
    assert!(!dir.join("study.data").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn rejects_wrong_extension_before_starting() {
    let dir = scratch("extension");
    let mut controller = RecordingController::new(ManualTimer::new(), AutoContinue, options(&dir));
    let result = controller.run(schedules(&["Only"]), dir.join("study.json"), assembler());
    assert!(matches!(result, Err(RecordingError::Record(_))));
    assert!(!controller.is_worker_running());

    let result = controller.run(Vec::new(), dir.join("study.rec"), assembler());
    assert!(matches!(result, Err(RecordingError::NoTests)));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn markers_follow_the_stimulus_in_real_time() {
    let dir = scratch("real-time");
    let output = dir.join("study.rec");
    let screen = ScreenGeometry::new(30.0, 17.0, 800, 600, 24.0).unwrap();
    let spec = StimulusSpec::new("Test 1", 30, 0.2, 0.0, 5).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let schedule = SaccadicSchedule::generate(&spec, &screen, SampleRate::Hz250, &mut rng).unwrap();
    let total = schedule.total_samples();
    assert_eq!(total, 250);

    let last_seen = Rc::new(Cell::new(0u64));
    let seen = Rc::clone(&last_seen);
    let mut controller =
        RecordingController::new(HighPrecisionTimer::new(), AutoContinue, options(&dir))
            .with_sink(move |samples| {
                if let Some(sample) = samples.last() {
                    seen.set(sample.timestamp);
                }
            });
    let outcome = controller.run(vec![schedule], &output, assembler()).unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    controller.shutdown().unwrap();

    let test_dir = dir.join("study.data/test-01");
    let markers = read_array(&test_dir.join("markers.npz"));
    let recorded = markers.len() as u64;
    assert!(
        recorded.abs_diff(total) <= 25,
        "recorded {recorded} samples for a {total}-sample stimulus"
    );

    let moves: Vec<(usize, i32)> = markers
        .iter()
        .enumerate()
        .filter(|&(_, &marker)| marker != 0)
        .map(|(i, &marker)| (i, marker))
        .collect();
    let values: Vec<i32> = moves.iter().map(|&(_, marker)| marker).collect();
    assert_eq!(values, vec![1, 2, 1, 2, 1]);
    assert!(moves[0].0 <= 3, "first marker at sample {}", moves[0].0);
    for pair in moves.windows(2) {
        let gap = pair[1].0 - pair[0].0;
        assert!(gap.abs_diff(50) <= 6, "markers {pair:?} are {gap} samples apart");
    }

    // Every recorded sample reached the sink before the test returned.
    let time = read_array(&test_dir.join("time.npz"));
    let last_recorded = *time.last().unwrap() as u64;
    assert!(last_seen.get() >= last_recorded);
    fs::remove_dir_all(&dir).unwrap();
}
