use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pprof::criterion::{Output, PProfProfiler};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

use saccrec_core::geometry::distance_to_subject;
use saccrec_core::{SampleRate, ScreenGeometry, StimulusSpec};
use saccrec_stimulus::{SaccadicSchedule, StimulusPlayer, TICK_INTERVAL};
use saccrec_timing::{ManualTimer, Timer};

fn schedule(saccades: u32, rate: SampleRate) -> SaccadicSchedule {
    let spec = StimulusSpec::new("Bench", 30, 3.0, 50.0, saccades).unwrap();
    let distance = distance_to_subject(28.0, 30.0).unwrap();
    let screen = ScreenGeometry::new(30.0, 17.0, 1920, 1080, distance).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    SaccadicSchedule::generate(&spec, &screen, rate, &mut rng).unwrap()
}

/// Position lookups across schedule sizes at the highest board rate.
pub fn bench_position_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("position_at");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    for saccades in [5u32, 10, 100] {
        let schedule = schedule(saccades, SampleRate::Hz16000);
        let total = schedule.total_samples();
        group.bench_with_input(BenchmarkId::from_parameter(saccades), &schedule, |b, s| {
            let mut sample = 0u64;
            b.iter(|| {
                sample = (sample + 7919) % total;
                black_box(s.screen_position_at(black_box(sample)));
            });
        });
    }

    group.finish();
}

/// One full 10-saccade test driven by a virtual clock.
pub fn bench_player_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("player_run");
    group.sample_size(20);

    group.bench_function("calibration_250hz", |b| {
        let schedule = schedule(10, SampleRate::Hz250);
        b.iter(|| {
            let mut player = StimulusPlayer::new(ManualTimer::new());
            let mut moves = player.run_stimulus(schedule.clone(), None).len();
            while !player.state().is_finished() {
                player.timer().sleep(TICK_INTERVAL);
                moves += player.tick().len();
            }
            black_box(moves);
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
        .confidence_level(0.95)
        .noise_threshold(0.02)
        .significance_level(0.05);
    targets = bench_position_at, bench_player_run
}

criterion_main!(benches);
