//! Bounded-width batch execution of independent tasks.
//!
//! [`BatchScheduler`] runs tasks `0..count` in consecutive batches of at most `width` tasks.
//! A batch is started only once the previous one has fully finished, so at most `width`
//! tasks are ever in flight. Each task writes into the result slot of its own index, which
//! keeps the output complete and free of duplicates regardless of completion order.

use std::any::Any;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

/// Progress notifications emitted around every batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started(Range<usize>),
    Finished(Range<usize>),
}

/// Why a scheduled run stopped early.
#[derive(Debug)]
pub enum BatchFailure<E> {
    /// Task `index` returned an error; its batch was discarded and no further batch started.
    Task { index: usize, error: E },
    /// Task `index` panicked; handled like a returned error.
    Panicked { index: usize, message: String },
    /// Cancellation was requested; `completed` tasks had finished.
    Cancelled { completed: usize },
}

pub struct BatchScheduler {
    width: usize,
    pool: rayon::ThreadPool,
    cancel: Arc<AtomicBool>,
}

impl BatchScheduler {
    pub fn new(width: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let width = width.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|i| format!("gcl-worker-{i}"))
            .build()?;
        Ok(BatchScheduler {
            width,
            pool,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Flag that stops the scheduler before its next batch once set to `true`.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run `task` for every index in `0..count`, returning results in index order.
    pub fn run<T, E, F>(&self, count: usize, task: F) -> Result<Vec<T>, BatchFailure<E>>
    where
        T: Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Sync,
    {
        self.run_observed(count, task, |_| {})
    }

    /// Like [`BatchScheduler::run`], reporting each batch boundary to `observer`.
    pub fn run_observed<T, E, F, O>(
        &self,
        count: usize,
        task: F,
        mut observer: O,
    ) -> Result<Vec<T>, BatchFailure<E>>
    where
        T: Send,
        E: Send,
        F: Fn(usize) -> Result<T, E> + Sync,
        O: FnMut(BatchEvent),
    {
        let mut results: Vec<T> = Vec::with_capacity(count);
        let mut start = 0;

        while start < count {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(BatchFailure::Cancelled { completed: start });
            }

            let end = (start + self.width).min(count);
            observer(BatchEvent::Started(start..end));
            log::debug!("Dispatching batch {}..{} of {}", start, end, count);

            let batch: Vec<std::thread::Result<Result<T, E>>> = self.pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .map(|i| catch_unwind(AssertUnwindSafe(|| task(i))))
                    .collect()
            });

            for (offset, outcome) in batch.into_iter().enumerate() {
                let index = start + offset;
                match outcome {
                    Ok(Ok(value)) => results.push(value),
                    Ok(Err(error)) => return Err(BatchFailure::Task { index, error }),
                    Err(payload) => {
                        return Err(BatchFailure::Panicked {
                            index,
                            message: panic_message(payload.as_ref()),
                        });
                    }
                }
            }

            observer(BatchEvent::Finished(start..end));
            start = end;
        }

        Ok(results)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_results_in_index_order() {
        let scheduler = BatchScheduler::new(4).unwrap();
        let out: Vec<usize> = scheduler
            .run(11, |i| Ok::<_, ()>(i * i))
            .unwrap();
        assert_eq!(out, (0..11).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn test_batches_respect_width() {
        let scheduler = BatchScheduler::new(3).unwrap();
        let mut events = Vec::new();
        scheduler
            .run_observed(7, |i| Ok::<_, ()>(i), |event| events.push(event))
            .unwrap();

        assert_eq!(
            events,
            vec![
                BatchEvent::Started(0..3),
                BatchEvent::Finished(0..3),
                BatchEvent::Started(3..6),
                BatchEvent::Finished(3..6),
                BatchEvent::Started(6..7),
                BatchEvent::Finished(6..7),
            ]
        );
    }

    #[test]
    fn test_in_flight_never_exceeds_width() {
        let scheduler = BatchScheduler::new(2).unwrap();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        scheduler
            .run(10, |_| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(2));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            })
            .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_failure_reports_lowest_index_and_stops() {
        let scheduler = BatchScheduler::new(4).unwrap();
        let calls = AtomicUsize::new(0);

        let err = scheduler
            .run(20, |i| {
                calls.fetch_add(1, Ordering::SeqCst);
                if i == 5 || i == 6 { Err(format!("bad {i}")) } else { Ok(i) }
            })
            .unwrap_err();

        match err {
            BatchFailure::Task { index, error } => {
                assert_eq!(index, 5);
                assert_eq!(error, "bad 5");
            }
            other => panic!("unexpected failure: {:?}", other),
        }
        // second batch (4..8) ran to completion, third never started
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_panicking_task_reports_its_index() {
        let scheduler = BatchScheduler::new(4).unwrap();
        let empty: Vec<usize> = Vec::new();

        let err = scheduler
            .run(8, |i| if i == 5 { Ok::<_, ()>(empty[i]) } else { Ok(i) })
            .unwrap_err();

        match err {
            BatchFailure::Panicked { index, message } => {
                assert_eq!(index, 5);
                assert!(message.contains("index out of bounds"), "message was {}", message);
            }
            other => panic!("expected a panicked task, got {:?}", other),
        }

        // pool still usable afterwards
        assert_eq!(scheduler.run(3, |i| Ok::<_, ()>(i)).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_cancel_before_next_batch() {
        let scheduler = BatchScheduler::new(2).unwrap();
        let cancel = scheduler.cancel_handle();

        let err = scheduler
            .run(10, |i| {
                if i == 1 {
                    cancel.store(true, Ordering::Relaxed);
                }
                Ok::<_, ()>(i)
            })
            .unwrap_err();

        assert!(matches!(err, BatchFailure::Cancelled { completed: 2 }));
    }
}
