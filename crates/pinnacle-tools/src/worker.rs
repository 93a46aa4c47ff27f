//! Background jobs with cooperative cancellation.
//!
//! A job runs on its own named thread and receives a [`CancellationToken`]
//! it is expected to poll at file or stage boundaries. Progress closures
//! passed into the job run on the worker thread; forwarding them anywhere
//! else is the caller's business.

use crate::error::WorkerError;
use pinnacle_scene::CancellationToken;
use std::thread::{self, JoinHandle};

/// Spawns background jobs.
pub struct Worker;

impl Worker {
    /// Runs `job` on a new thread named `name`.
    pub fn spawn<T, F>(name: &str, job: F) -> Result<JobHandle<T>, WorkerError>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        let token = CancellationToken::new();
        let job_token = token.clone();
        let thread_name = format!("pinnacle-{name}");
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || job(&job_token))
            .map_err(|source| WorkerError::Spawn {
                name: name.to_string(),
                source,
            })?;
        log::debug!("Started worker '{}'", name);
        Ok(JobHandle {
            name: name.to_string(),
            token,
            handle,
        })
    }
}

/// Handle to a running job.
pub struct JobHandle<T> {
    name: String,
    token: CancellationToken,
    handle: JoinHandle<T>,
}

impl<T> JobHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the job to stop at its next boundary.
    pub fn cancel(&self) {
        log::info!("Cancelling worker '{}'", self.name);
        self.token.cancel();
    }

    /// Token shared with the job.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the job and returns its result.
    pub fn join(self) -> Result<T, WorkerError> {
        self.handle.join().map_err(|_| {
            log::warn!("Worker '{}' panicked", self.name);
            WorkerError::Panicked { name: self.name }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_join_returns_result() {
        let handle = Worker::spawn("sum", |_| (1..=10).sum::<u32>()).unwrap();
        assert_eq!(handle.name(), "sum");
        assert_eq!(handle.join().unwrap(), 55);
    }

    #[test]
    fn test_cancel_is_observed() {
        let (started_tx, started_rx) = mpsc::channel();
        let handle = Worker::spawn("spin", move |token| {
            started_tx.send(()).unwrap();
            let mut polls = 0u64;
            while !token.is_cancelled() {
                polls += 1;
                thread::sleep(Duration::from_millis(1));
            }
            polls
        })
        .unwrap();

        started_rx.recv().unwrap();
        handle.cancel();
        assert!(handle.token().is_cancelled());
        handle.join().unwrap();
    }

    #[test]
    fn test_panic_becomes_error() {
        let handle = Worker::spawn("bad", |_| -> u32 { panic!("job failed") }).unwrap();
        let err = handle.join().unwrap_err();
        assert!(matches!(err, WorkerError::Panicked { ref name } if name == "bad"));
    }

    #[test]
    fn test_is_finished() {
        let handle = Worker::spawn("quick", |_| ()).unwrap();
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        handle.join().unwrap();
    }
}
