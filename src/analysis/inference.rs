//! Bounded model inference
//!
//! [`TimeoutModel`] moves a [`GestureModel`] onto its own worker thread and
//! waits at most `timeout` for each answer. A late answer is discarded when
//! it eventually arrives; while the worker is still busy with an earlier
//! window, new requests are refused with [`ClassifierError::Busy`] instead
//! of queueing up behind it.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::classifier::GestureModel;
use super::features::FeatureVector;
use crate::error::ClassifierError;

struct InferenceRequest {
    id: u64,
    window: Vec<FeatureVector>,
}

struct InferenceResponse {
    id: u64,
    result: Result<Vec<f32>, ClassifierError>,
}

/// Runs a model on a worker thread with a per-call deadline
pub struct TimeoutModel {
    request_tx: Option<SyncSender<InferenceRequest>>,
    response_rx: Receiver<InferenceResponse>,
    timeout: Duration,
    next_id: u64,
    worker: Option<JoinHandle<()>>,
}

impl TimeoutModel {
    /// Spawn the worker thread owning `model`
    pub fn spawn<M: GestureModel + 'static>(mut model: M, timeout: Duration) -> Self {
        // One slot: at most one window waits while another is being scored
        let (request_tx, request_rx) = mpsc::sync_channel::<InferenceRequest>(1);
        let (response_tx, response_rx) = mpsc::channel::<InferenceResponse>();

        let worker = thread::Builder::new()
            .name("gesture-inference".to_string())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    let result = model.predict(&request.window);
                    if response_tx
                        .send(InferenceResponse {
                            id: request.id,
                            result,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                log::debug!("[Inference] Worker exiting");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("[Inference] Failed to spawn worker: {}", err);
                None
            }
        };

        Self {
            request_tx: worker.as_ref().map(|_| request_tx),
            response_rx,
            timeout,
            next_id: 0,
            worker,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_error(&self) -> ClassifierError {
        ClassifierError::Timeout {
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

impl GestureModel for TimeoutModel {
    fn predict(&mut self, window: &[FeatureVector]) -> Result<Vec<f32>, ClassifierError> {
        let request_tx = self
            .request_tx
            .as_ref()
            .ok_or_else(|| ClassifierError::Unavailable {
                reason: "inference worker not running".to_string(),
            })?;

        self.next_id = self.next_id.wrapping_add(1);
        let id = self.next_id;

        match request_tx.try_send(InferenceRequest {
            id,
            window: window.to_vec(),
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(ClassifierError::Busy),
            Err(TrySendError::Disconnected(_)) => {
                return Err(ClassifierError::Unavailable {
                    reason: "inference worker exited".to_string(),
                })
            }
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) if response.id == id => return response.result,
                Ok(stale) => {
                    log::debug!("[Inference] Discarding late answer for request {}", stale.id);
                }
                Err(RecvTimeoutError::Timeout) => return Err(self.timeout_error()),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ClassifierError::Unavailable {
                        reason: "inference worker exited".to_string(),
                    })
                }
            }
        }
    }
}

impl Drop for TimeoutModel {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop. A worker stuck
        // inside a hung model is detached rather than joined.
        self.request_tx.take();
        if let Some(handle) = self.worker.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::ScriptedModel;

    struct SlowModel {
        delay: Duration,
    }

    impl GestureModel for SlowModel {
        fn predict(&mut self, _window: &[FeatureVector]) -> Result<Vec<f32>, ClassifierError> {
            thread::sleep(self.delay);
            Ok(vec![0.7, 0.3])
        }
    }

    #[test]
    fn test_fast_model_answers_through_worker() {
        let mut model =
            TimeoutModel::spawn(ScriptedModel::constant(vec![0.6, 0.4]), Duration::from_secs(1));
        assert_eq!(model.predict(&[]).unwrap(), vec![0.6, 0.4]);
        assert_eq!(model.predict(&[]).unwrap(), vec![0.6, 0.4]);
    }

    #[test]
    fn test_slow_model_times_out() {
        let mut model = TimeoutModel::spawn(
            SlowModel {
                delay: Duration::from_millis(300),
            },
            Duration::from_millis(20),
        );
        assert_eq!(
            model.predict(&[]),
            Err(ClassifierError::Timeout { timeout_ms: 20 })
        );
    }

    #[test]
    fn test_late_answer_is_not_returned_for_newer_request() {
        let mut model = TimeoutModel::spawn(
            SlowModel {
                delay: Duration::from_millis(60),
            },
            Duration::from_millis(10),
        );
        assert!(model.predict(&[]).is_err());

        // Let the first (late) answer land, then ask again with a generous deadline
        thread::sleep(Duration::from_millis(100));
        model.timeout = Duration::from_secs(2);
        assert_eq!(model.predict(&[]).unwrap(), vec![0.7, 0.3]);
    }

    #[test]
    fn test_busy_worker_refuses_new_windows() {
        let mut model = TimeoutModel::spawn(
            SlowModel {
                delay: Duration::from_millis(400),
            },
            Duration::from_millis(5),
        );
        // First request occupies the worker, second fills the slot
        assert!(model.predict(&[]).is_err());
        thread::sleep(Duration::from_millis(20));
        assert!(model.predict(&[]).is_err());
        assert_eq!(model.predict(&[]), Err(ClassifierError::Busy));
    }
}
