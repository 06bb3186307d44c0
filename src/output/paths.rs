// Output file naming
// (c) 2024 Ross Younger

use std::{
    fs::{File, OpenOptions},
    io::{Error, ErrorKind},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

const RESULTS_PREFIX: &str = "speedTestResults_";
const RESULTS_EXTENSION: &str = "csv";
const EVENTS_PREFIX: &str = "log_";
const EVENTS_EXTENSION: &str = "txt";
const STAMP_FORMAT: &str = "%m-%d-%Y_%H-%M-%S";

/// If somebody has this many processes starting in the same second, something is wrong
const MAX_SUFFIX: u32 = 1000;

/// The pair of files one process writes to for its whole lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// CSV result log
    pub results: PathBuf,
    /// Free text event log
    pub events: PathBuf,
}

impl OutputPaths {
    fn candidate(dir: &Path, stamp: &str, n: u32) -> Self {
        let stem = match n {
            0 => stamp.to_string(),
            n => format!("{stamp}_{n}"),
        };
        Self {
            results: dir.join(format!("{RESULTS_PREFIX}{stem}.{RESULTS_EXTENSION}")),
            events: dir.join(format!("{EVENTS_PREFIX}{stem}.{EVENTS_EXTENSION}")),
        }
    }

    /// Creates the output files for a process started at `started`, creating `dir` if needed.
    ///
    /// Names are derived from the start time. If files of that name are already present
    /// (another instance started in the same second) a numeric suffix is added.
    /// Both files are created here, exclusively, so no two processes can be given the same pair.
    pub fn allocate(dir: &Path, started: DateTime<Local>) -> std::io::Result<OutputFiles> {
        std::fs::create_dir_all(dir)?;
        let stamp = started.format(STAMP_FORMAT).to_string();
        for n in 0..MAX_SUFFIX {
            let candidate = Self::candidate(dir, &stamp, n);
            if let Some(files) = candidate.reserve()? {
                return Ok(files);
            }
        }
        Err(Error::new(
            ErrorKind::AlreadyExists,
            format!("too many output files for {stamp} in {}", dir.display()),
        ))
    }

    /// Creates both files. Returns None if either was already present.
    fn reserve(self) -> std::io::Result<Option<OutputFiles>> {
        let Some(results) = create_exclusive(&self.results)? else {
            return Ok(None);
        };
        let Some(events) = create_exclusive(&self.events)? else {
            // The pair belongs to someone else; give back our half
            drop(results);
            std::fs::remove_file(&self.results)?;
            return Ok(None);
        };
        Ok(Some(OutputFiles {
            paths: self,
            results,
            events,
        }))
    }
}

fn create_exclusive(path: &Path) -> std::io::Result<Option<File>> {
    match OpenOptions::new().append(true).create_new(true).open(path) {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e),
    }
}

/// The output files, freshly created and open for appending
#[derive(Debug)]
pub struct OutputFiles {
    /// Where they are
    pub paths: OutputPaths,
    /// CSV result log
    pub results: File,
    /// Free text event log
    pub events: File,
}

#[cfg(test)]
mod test {
    use chrono::{Local, TimeZone as _};

    use super::OutputPaths;

    fn when() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 4, 17, 6, 7).unwrap()
    }

    #[test]
    fn names() {
        let tempdir = tempfile::tempdir().unwrap();
        let p = OutputPaths::allocate(tempdir.path(), when()).unwrap().paths;
        assert_eq!(
            p.results,
            tempdir.path().join("speedTestResults_03-04-2026_17-06-07.csv")
        );
        assert_eq!(p.events, tempdir.path().join("log_03-04-2026_17-06-07.txt"));
        assert!(p.results.is_file());
        assert!(p.events.is_file());
    }

    #[test]
    fn creates_directory() {
        let tempdir = tempfile::tempdir().unwrap();
        let dir = tempdir.path().join("a").join("b");
        let p = OutputPaths::allocate(&dir, when()).unwrap().paths;
        assert!(dir.is_dir());
        assert!(p.results.starts_with(&dir));
    }

    #[test]
    fn same_second_gets_distinct_files() {
        let tempdir = tempfile::tempdir().unwrap();
        // nothing is written between the two calls; the files are still held open
        let first = OutputPaths::allocate(tempdir.path(), when()).unwrap();
        let second = OutputPaths::allocate(tempdir.path(), when()).unwrap();
        assert_ne!(first.paths, second.paths);
        assert_eq!(
            second.paths.results,
            tempdir
                .path()
                .join("speedTestResults_03-04-2026_17-06-07_1.csv")
        );
        assert_eq!(
            second.paths.events,
            tempdir.path().join("log_03-04-2026_17-06-07_1.txt")
        );
    }

    #[test]
    fn half_taken_pair_is_skipped_and_released() {
        let tempdir = tempfile::tempdir().unwrap();
        let stray = tempdir.path().join("log_03-04-2026_17-06-07.txt");
        std::fs::write(&stray, "someone else's log").unwrap();

        let files = OutputPaths::allocate(tempdir.path(), when()).unwrap();
        assert_eq!(
            files.paths.events,
            tempdir.path().join("log_03-04-2026_17-06-07_1.txt")
        );
        // the unsuffixed results file was created and then given back
        assert!(!tempdir
            .path()
            .join("speedTestResults_03-04-2026_17-06-07.csv")
            .exists());
        assert_eq!(
            std::fs::read_to_string(&stray).unwrap(),
            "someone else's log"
        );
    }

    #[test]
    fn existing_files_are_never_opened() {
        use std::io::Write as _;
        let tempdir = tempfile::tempdir().unwrap();
        let mut first = OutputPaths::allocate(tempdir.path(), when()).unwrap();
        first.events.write_all(b"first\n").unwrap();
        let mut second = OutputPaths::allocate(tempdir.path(), when()).unwrap();
        second.events.write_all(b"second\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&first.paths.events).unwrap(),
            "first\n"
        );
    }
}
