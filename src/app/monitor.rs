use crate::events::StreamEvent;
use crate::processor::{ProcessorState, StreamProcessor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consume every processor's liveness flag and report the stalled ones
pub(super) async fn check_liveness(processors: &Mutex<Vec<StreamProcessor>>) -> Vec<String> {
    let processors = processors.lock().await;
    let mut stalled = Vec::new();

    for processor in processors.iter() {
        let status = processor.status();
        if processor.video_frame_updated() {
            debug!(
                "{}: {:?}, {:.1} fps, recording={}, motion={}, segments={}",
                status.camera,
                status.state,
                status.fps,
                status.recording,
                status.motion,
                status.segments_written
            );
            continue;
        }

        match status.last_grab_age {
            Some(age) => warn!(
                "{}: no new frame for {:.1}s ({:?})",
                status.camera,
                age.as_secs_f64(),
                status.state
            ),
            None => warn!("{}: no frame received yet ({:?})", status.camera, status.state),
        }
        stalled.push(status.camera);
    }

    stalled
}

pub(super) fn spawn_status_monitor(
    processors: Arc<Mutex<Vec<StreamProcessor>>>,
    period: Duration,
    cancellation_token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick completes immediately; give streams one full period
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    debug!("Status monitor stopped");
                    break;
                }
                _ = interval.tick() => {
                    let stalled = check_liveness(&processors).await;
                    if !stalled.is_empty() {
                        info!("{} camera(s) stalled: {}", stalled.len(), stalled.join(", "));
                    }
                }
            }
        }
    });
}

pub(super) fn spawn_event_logger(
    mut receiver: broadcast::Receiver<StreamEvent>,
    cancellation_token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                event = receiver.recv() => match event {
                    Ok(event) => log_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Event logger lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}

fn log_event(event: &StreamEvent) {
    match event {
        StreamEvent::RecordingFailed { .. } => warn!("{}", event.description()),
        StreamEvent::StateChanged {
            to: ProcessorState::Degraded,
            ..
        } => warn!("{}", event.description()),
        StreamEvent::MotionStarted { .. } | StreamEvent::MotionStopped { .. } => {
            debug!("{}", event.description())
        }
        _ => info!("{}", event.description()),
    }
}
