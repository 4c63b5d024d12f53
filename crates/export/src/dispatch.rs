//! One-shot encode worker

use crate::{encode, EncodeRequest, ExportError, ExportFormat, ExportResult};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, error};

/// Reply of an encode worker: the encoded file or an error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    Encoded(Vec<u8>),
    Failed(String),
}

impl EncodeOutcome {
    pub fn into_result(self) -> Result<Vec<u8>, String> {
        match self {
            EncodeOutcome::Encoded(bytes) => Ok(bytes),
            EncodeOutcome::Failed(message) => Err(message),
        }
    }
}

/// Handle to a running conversion
///
/// Each job delivers exactly one outcome. There is no progress stream and
/// no way to cancel a job once dispatched.
pub struct EncodeJob {
    format: ExportFormat,
    outcome_rx: Receiver<EncodeOutcome>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Move a request onto its own worker thread and start encoding
pub fn dispatch(request: EncodeRequest) -> ExportResult<EncodeJob> {
    let format = request.format;
    spawn_worker(format, move || encode(request))
}

fn spawn_worker<F>(format: ExportFormat, work: F) -> ExportResult<EncodeJob>
where
    F: FnOnce() -> ExportResult<Vec<u8>> + Send + 'static,
{
    let (outcome_tx, outcome_rx) = bounded(1);

    let handle = thread::Builder::new()
        .name(format!("encode-{format}"))
        .spawn(move || {
            let outcome = match work() {
                Ok(bytes) => EncodeOutcome::Encoded(bytes),
                Err(e) => {
                    error!("Conversion error: {}", e);
                    EncodeOutcome::Failed(e.to_string())
                }
            };
            // The job may have been dropped; nobody is waiting then
            let _ = outcome_tx.send(outcome);
        })?;

    debug!(%format, "Encode worker started");
    Ok(EncodeJob {
        format,
        outcome_rx,
        handle: Some(handle),
    })
}

impl EncodeJob {
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Block until the worker replies
    pub fn wait(mut self) -> EncodeOutcome {
        let outcome = self
            .outcome_rx
            .recv()
            .unwrap_or_else(|_| EncodeOutcome::Failed(ExportError::WorkerPanicked.to_string()));
        self.join();
        outcome
    }

    /// Take the outcome if it is ready, otherwise hand the job back
    pub fn try_outcome(mut self) -> Result<EncodeOutcome, EncodeJob> {
        match self.outcome_rx.try_recv() {
            Ok(outcome) => {
                self.join();
                Ok(outcome)
            }
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => {
                self.join();
                Ok(EncodeOutcome::Failed(ExportError::WorkerPanicked.to_string()))
            }
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Encode worker for {} panicked", self.format);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::solid_request;
    use std::time::Duration;

    #[test]
    fn worker_returns_encoded_bytes() {
        let job = spawn_worker(ExportFormat::Gif, || Ok(vec![1, 2, 3])).unwrap();
        assert_eq!(job.format(), ExportFormat::Gif);
        assert_eq!(job.wait(), EncodeOutcome::Encoded(vec![1, 2, 3]));
    }

    #[test]
    fn worker_errors_become_messages() {
        let job = spawn_worker(ExportFormat::WebP, || Err(ExportError::NoFrames)).unwrap();
        assert_eq!(
            job.wait().into_result(),
            Err("No frames to export".to_string())
        );
    }

    #[test]
    fn panicking_worker_is_reported() {
        let job = spawn_worker(ExportFormat::Apng, || panic!("boom")).unwrap();
        assert_eq!(job.wait(), EncodeOutcome::Failed(ExportError::WorkerPanicked.to_string()));
    }

    #[test]
    fn try_outcome_hands_job_back_until_ready() {
        let (release_tx, release_rx) = bounded::<()>(0);
        let mut job = spawn_worker(ExportFormat::Gif, move || {
            release_rx.recv().ok();
            Ok(vec![9])
        })
        .unwrap();

        job = match job.try_outcome() {
            Err(job) => job,
            Ok(outcome) => panic!("worker finished early: {outcome:?}"),
        };

        release_tx.send(()).unwrap();
        loop {
            match job.try_outcome() {
                Ok(outcome) => {
                    assert_eq!(outcome, EncodeOutcome::Encoded(vec![9]));
                    break;
                }
                Err(pending) => {
                    job = pending;
                    thread::sleep(Duration::from_millis(5));
                }
            }
        }
    }

    #[test]
    fn invalid_request_fails_in_worker() {
        let request = solid_request(ExportFormat::Gif, 0);
        match dispatch(request).unwrap().wait() {
            EncodeOutcome::Failed(message) => assert!(message.contains("No frames")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
