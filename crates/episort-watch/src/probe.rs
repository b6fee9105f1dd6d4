//! File readiness probing.
//!
//! Downloads and transfers often hold a lock or grow the file
//! incrementally, so a single size read is not a completion signal.
//! A file counts as fully written only after two consecutive samples
//! with equal, strictly positive sizes.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::trace;

/// Polls a candidate file's accessibility and size until it looks
/// fully written, with bounded retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityProbe {
    /// Sleep between samples.
    pub poll_interval: Duration,
    /// Samples taken before giving up.
    pub max_attempts: u32,
}

/// One observation of the candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sample {
    /// File opened for reading; its size at that moment.
    Size(u64),
    /// Open or stat failed with a lock/permission style error.
    Inaccessible,
    /// File no longer exists; probing aborts.
    Gone,
}

impl StabilityProbe {
    /// Create a probe with the given cadence and attempt budget.
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    /// Block until the file is ready or the attempt budget runs out.
    pub fn await_ready(&self, path: &Path) -> bool {
        let ready = self.run(|| sample(path), thread::sleep);
        trace!(path = %path.display(), ready, "stability probe finished");
        ready
    }

    /// Probe loop over injected sample and sleep functions, so tests
    /// can feed synthetic size sequences without wall-clock delays.
    fn run(
        &self,
        mut sample: impl FnMut() -> Sample,
        mut sleep: impl FnMut(Duration),
    ) -> bool {
        let mut previous: Option<u64> = None;
        for attempt in 0..self.max_attempts {
            match sample() {
                Sample::Gone => return false,
                Sample::Inaccessible => {
                    // A failed open breaks the consecutive-sample pair.
                    previous = None;
                }
                Sample::Size(size) => {
                    if previous == Some(size) && size > 0 {
                        return true;
                    }
                    previous = Some(size);
                }
            }
            if attempt + 1 < self.max_attempts {
                sleep(self.poll_interval);
            }
        }
        false
    }
}

/// Observe a file: open it for reading and read its size.
fn sample(path: &Path) -> Sample {
    match File::open(path) {
        Ok(file) => match file.metadata() {
            Ok(metadata) => Sample::Size(metadata.len()),
            Err(_) => Sample::Inaccessible,
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Sample::Gone,
        Err(_) => Sample::Inaccessible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(max_attempts: u32) -> StabilityProbe {
        StabilityProbe::new(Duration::ZERO, max_attempts)
    }

    /// Run the probe over a fixed sequence of samples.
    fn run_sequence(probe: StabilityProbe, samples: &[Sample]) -> bool {
        let mut iter = samples.iter().copied();
        probe.run(
            || iter.next().unwrap_or(Sample::Size(0)),
            |_| {},
        )
    }

    #[test]
    fn test_ready_after_two_equal_nonzero_samples() {
        let sizes = [
            Sample::Size(0),
            Sample::Size(0),
            Sample::Size(100),
            Sample::Size(100),
        ];
        assert!(run_sequence(probe(10), &sizes));
    }

    #[test]
    fn test_only_consecutive_equal_matters() {
        let sizes = [Sample::Size(100), Sample::Size(200), Sample::Size(200)];
        assert!(run_sequence(probe(10), &sizes));
    }

    #[test]
    fn test_zero_size_never_ready() {
        let sizes = [Sample::Size(0); 8];
        assert!(!run_sequence(probe(8), &sizes));
    }

    #[test]
    fn test_growing_file_exhausts_attempts() {
        let mut size = 0u64;
        let p = probe(5);
        let ready = p.run(
            || {
                size += 10;
                Sample::Size(size)
            },
            |_| {},
        );
        assert!(!ready);
    }

    #[test]
    fn test_vanished_file_aborts() {
        let sizes = [Sample::Size(100), Sample::Gone, Sample::Size(100)];
        assert!(!run_sequence(probe(10), &sizes));
    }

    #[test]
    fn test_inaccessible_breaks_the_pair() {
        let sizes = [
            Sample::Size(100),
            Sample::Inaccessible,
            Sample::Size(100),
            Sample::Size(100),
        ];
        // Ready only on the fourth sample; the locked read in between
        // must not pair up with the first.
        let mut iter = sizes.iter().copied();
        let mut observed = 0;
        let ready = probe(10).run(
            || {
                observed += 1;
                iter.next().unwrap_or(Sample::Size(0))
            },
            |_| {},
        );
        assert!(ready);
        assert_eq!(observed, 4);
    }

    #[test]
    fn test_real_file_is_ready() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("done.mkv");
        std::fs::write(&path, b"finished contents").unwrap();

        assert!(probe(3).await_ready(&path));
    }

    #[test]
    fn test_missing_file_is_not_ready() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(!probe(3).await_ready(&temp.path().join("nope.mkv")));
    }
}
