use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use platforms::{Error, capture::FrameSource, input::Emitter};

use crate::{
    Settings,
    bar::Bars,
    bridge::{DefaultInput, Input},
    database::{Seeds, query_and_upsert_seeds, query_settings},
    detect::{DefaultDetector, Detector},
    ecs::{Resources, World},
    farming::{self, FarmingEntity},
    mat::OwnedMat,
    operation::Operation,
    rng::Rng,
    services::Services,
    shout::{self, ShoutEntity},
    snapshot::Snapshot,
};

/// The FPS the bot runs at.
///
/// This must **not** be changed as it affects other ticking systems.
pub const FPS: u32 = 30;

/// Milliseconds per tick as an [`f32`].
pub const MS_PER_TICK_F32: f32 = 1000.0 / FPS as f32;

/// Starts the main loop on its own thread reading frames from `frames` and sending inputs
/// through `emitter`.
///
/// The loop starts halted and stops for good once `frames` reports [`Error::ClientGone`]. Only
/// the first call has an effect.
pub fn init(frames: impl FrameSource + 'static, emitter: impl Emitter + 'static) {
    static LOOPING: AtomicBool = AtomicBool::new(false);

    if LOOPING
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Acquire)
        .is_ok()
    {
        thread::spawn(move || {
            let tokio_rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("tokio runtime");
            let _tokio_guard = tokio_rt.enter();
            tokio_rt.block_on(async {
                systems_loop(frames, emitter);
            });
        });
    }
}

fn systems_loop(mut frames: impl FrameSource, emitter: impl Emitter + 'static) {
    let settings = query_settings().unwrap_or_else(|err| {
        warn!(target: "loop", "using default settings, query failed {err}");
        Settings::default()
    });
    let seeds = query_and_upsert_seeds().unwrap_or_else(|err| {
        warn!(target: "loop", "using random seeds, query failed {err}");
        Seeds::default()
    });
    let rng = Rng::new(seeds.rng_seed);

    let mut services = Services::new(settings);
    let mut resources = Resources {
        input: Box::new(DefaultInput::new(emitter, rng.clone())),
        rng,
        detector: None,
        operation: Operation::Halting,
        tick: 0,
        settings: services.settings(),
    };
    let mut world = World {
        farming: FarmingEntity::default(),
        shout: ShoutEntity::default(),
    };
    let mut bars = Bars::new(resources.settings.keys.panel.into());
    let mut snapshot = None::<Snapshot>;
    info!(target: "loop", "started at {FPS} FPS");

    loop_with_fps(FPS, || {
        services.poll(&mut resources, &mut world);
        resources.tick += 1;
        resources.settings = services.settings();
        bars.set_panel_key(resources.settings.keys.panel.into());

        let ControlFlow::Continue(detector) =
            next_detector(&mut frames, resources.input.as_ref())
        else {
            return ControlFlow::Break(());
        };
        if let Some(detector) = detector {
            resources.detector = Some(Arc::new(detector) as Arc<dyn Detector>);
            if !resources.operation.halting() {
                let current = Snapshot::capture(
                    resources.detector(),
                    &mut bars,
                    &resources.settings.detection,
                    resources.input.as_ref(),
                );
                farming::run_system(&resources, &mut world.farming, &current);
                shout::run_system(&resources, &mut world.shout, &mut world.farming);
                snapshot = Some(current);
            }
        }

        services.broadcast_status(&resources, &world, snapshot.as_ref());
        resources.input.update(resources.tick);
        ControlFlow::Continue(())
    });
    info!(target: "loop", "stopped");
}

/// Takes the latest frame from `frames` as a detector.
///
/// Breaks after releasing every held key once the client is gone. Other capture failures only
/// skip detection for this tick.
fn next_detector(
    frames: &mut impl FrameSource,
    input: &dyn Input,
) -> ControlFlow<(), Option<DefaultDetector>> {
    match frames.latest_frame() {
        Ok(frame) => ControlFlow::Continue(
            OwnedMat::new(frame)
                .map(DefaultDetector::new)
                .inspect_err(|err| debug!(target: "loop", "frame conversion failed {err}"))
                .ok(),
        ),
        Err(Error::FrameUnavailable) => ControlFlow::Continue(None),
        Err(Error::ClientGone) => {
            error!(target: "loop", "game client is gone, stopping");
            input.release_all();
            ControlFlow::Break(())
        }
        Err(err) => {
            warn!(target: "loop", "frame capture failed {err}");
            ControlFlow::Continue(None)
        }
    }
}

#[inline]
fn loop_with_fps(fps: u32, mut on_tick: impl FnMut() -> ControlFlow<()>) {
    #[cfg(debug_assertions)]
    const LOG_INTERVAL_SECS: u64 = 5;

    let nanos_per_frame = (1_000_000_000 / fps) as u128;
    #[cfg(debug_assertions)]
    let mut last_logged_instant = Instant::now();

    loop {
        let start = Instant::now();

        if on_tick().is_break() {
            break;
        }

        let now = Instant::now();
        let elapsed_duration = now.duration_since(start);
        let elapsed_nanos = elapsed_duration.as_nanos();
        if elapsed_nanos <= nanos_per_frame {
            thread::sleep(Duration::new(0, (nanos_per_frame - elapsed_nanos) as u32));
        } else {
            #[cfg(debug_assertions)]
            if now.duration_since(last_logged_instant).as_secs() >= LOG_INTERVAL_SECS {
                last_logged_instant = now;
                debug!(
                    target: "loop",
                    "ticking running late at {}ms",
                    elapsed_duration.as_millis()
                );
            }
        }
    }
}
