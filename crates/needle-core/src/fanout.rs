use std::sync::OnceLock;

use crossbeam::channel;
use rayon::prelude::*;

use crate::error::{NeedleError, Result};

/// Run `task` over every item on the rayon pool and hand each result to
/// `receive` on the calling thread.
///
/// `receive` is the only code touching the caller's accumulator, so it needs
/// no locking; results arrive in completion order. The first task to fail
/// stops scheduling of new items and its error is returned once in-flight
/// tasks finish. Results already received are not rolled back: callers must
/// drop their accumulator on error.
///
/// Must not be called from inside another `fan_out` task.
pub fn fan_out<T, R, F, C>(items: Vec<T>, task: F, mut receive: C) -> Result<()>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync,
    C: FnMut(R),
{
    let (tx, rx) = channel::bounded(items.len().max(1));
    let first_error: OnceLock<NeedleError> = OnceLock::new();
    let failed = &first_error;
    let task = &task;

    std::thread::scope(|scope| {
        let producer = scope.spawn(move || {
            items
                .into_par_iter()
                .try_for_each_with(tx, |tx, item| match task(item) {
                    Ok(result) => {
                        // The receiver outlives every sender.
                        let _ = tx.send(result);
                        Ok(())
                    }
                    Err(err) => {
                        let _ = failed.set(err);
                        Err(())
                    }
                })
        });

        for result in rx.iter() {
            receive(result);
        }

        if let Err(panic) = producer.join() {
            std::panic::resume_unwind(panic);
        }
    });

    match first_error.into_inner() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_collects_every_result() {
        let items: Vec<u64> = (1..=200).collect();
        let mut sum = 0;
        let mut count = 0;
        fan_out(items, |n| Ok(n * 2), |r| {
            sum += r;
            count += 1;
        })
        .unwrap();
        assert_eq!(count, 200);
        assert_eq!(sum, 200 * 201);
    }

    #[test]
    fn test_empty_input() {
        let mut called = false;
        fan_out(Vec::<u8>::new(), |n| Ok(n), |_| called = true).unwrap();
        assert!(!called);
    }

    #[test]
    fn test_error_is_surfaced() {
        let items: Vec<u32> = (0..50).collect();
        let result = fan_out(
            items,
            |n| {
                if n == 17 {
                    Err(NeedleError::io(
                        PathBuf::from(format!("{n}.go")),
                        std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                    ))
                } else {
                    Ok(n)
                }
            },
            |_| {},
        );
        match result {
            Err(NeedleError::Io { path, .. }) => assert_eq!(path, PathBuf::from("17.go")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_earliest_failure_wins() {
        let items: Vec<u32> = (0..8).collect();
        let result = fan_out(
            items,
            |n| {
                if n > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(200));
                }
                Err::<u32, _>(NeedleError::io(
                    PathBuf::from(format!("{n}.go")),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                ))
            },
            |_| {},
        );
        match result {
            Err(NeedleError::Io { path, .. }) => assert_eq!(path, PathBuf::from("0.go")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_sorted_results_are_deterministic() {
        let run = || {
            let mut out = Vec::new();
            fan_out((0..64).collect(), |n: i32| Ok(n * n), |r| out.push(r)).unwrap();
            out.sort();
            out
        };
        assert_eq!(run(), run());
    }
}
