use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pose_intent::kernel::telemetry::{JsonlTraceSink, TraceSink};
use pose_intent::perception::{PoseDetectorSim, PoseObservation};
use pose_intent::robot::SimulatedActuator;
use pose_intent::{Reactor, SystemConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;

    let config = SystemConfig::load().context("loading configuration")?;
    tracing::info!(system = %config.system_name, poses = ?config.pose_vocabulary, "starting");
    tracing::info!(actions = ?config.actions.keys().collect::<Vec<_>>(), "action set");

    let sink: Option<Box<dyn TraceSink>> = match &config.trace.jsonl_path {
        Some(path) => {
            let sink = JsonlTraceSink::open(path, config.trace.include_payload)
                .with_context(|| format!("opening trace file {}", path.display()))?;
            tracing::info!(path = %path.display(), "writing scheduler trace");
            Some(Box::new(sink))
        }
        None => None,
    };

    let actuator = Arc::new(SimulatedActuator::new(
        config.simulation.robot_id.clone(),
        Duration::from_millis(config.simulation.behavior_step_ms),
        Duration::from_millis(config.simulation.step_tick_ms),
    ));
    let mut reactor =
        Reactor::new(&config, actuator, sink).context("building recognition pipeline")?;

    let (tx, mut rx) = mpsc::channel::<PoseObservation>(100);
    let shutdown = CancellationToken::new();

    let detector = PoseDetectorSim::new(&config);
    let tick = Duration::from_millis(config.simulation.pose_tick_ms);
    let detector_task = tokio::spawn(detector.run(tx, tick, shutdown.clone()));

    // Final-task dispatch blocks for the whole task, so the reactor gets its own thread.
    let pipeline = tokio::task::spawn_blocking(move || -> pose_intent::Result<()> {
        let summary = reactor.drive(&mut rx)?;
        tracing::info!(
            cycles = summary.cycles,
            tasks = summary.dispatched.len(),
            dropped_stale = summary.dropped_stale,
            "pose stream closed"
        );
        Ok(())
    });

    tracing::info!("entering main loop (Ctrl+C to stop)");
    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down (Ctrl+C)");
            Ok(())
        }
        joined = pipeline => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!("recognition cycle failed: {}", e);
                Err(anyhow::Error::new(e))
            }
            Err(e) => Err(anyhow::Error::new(e).context("pipeline thread failed")),
        },
    };

    shutdown.cancel();
    let _ = detector_task.await;
    outcome
}
