// Optional run profiler: times a conversion and writes a JSON report when it ends.
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::core::convert::ConvertOutcome;
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileReport {
    pub started_at: String,
    pub elapsed_ms: u64,
    pub status: ProfileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Records written. On a failed run this is the count before the failing
    /// record, and is absent when the failure has no record number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,
    /// Bytes written; only known for successful runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Ok,
    Failed,
    Aborted,
}

/// Scoped observer attached around a conversion.
///
/// `finish` writes the report. If the profiler is dropped without `finish`
/// (a panic unwinding through `main`), an `aborted` report is still written.
#[derive(Debug)]
pub struct Profiler {
    path: PathBuf,
    started_at: OffsetDateTime,
    start: Instant,
    finished: bool,
}

impl Profiler {
    pub fn start(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "profiling started");
        Self {
            path,
            started_at: OffsetDateTime::now_utc(),
            start: Instant::now(),
            finished: false,
        }
    }

    pub fn finish(
        mut self,
        result: &Result<ConvertOutcome, Error>,
    ) -> Result<ProfileReport, Error> {
        self.finished = true;
        let (status, error_kind, records, bytes_written) = match result {
            Ok(outcome) => (
                ProfileStatus::Ok,
                None,
                Some(outcome.records),
                Some(outcome.bytes_written),
            ),
            Err(err) => (
                ProfileStatus::Failed,
                Some(format!("{:?}", err.kind())),
                err.record().map(|record| record.saturating_sub(1)),
                None,
            ),
        };
        let report = self.report(status, error_kind, records, bytes_written)?;
        self.write_report(&report)?;
        info!(
            path = %self.path.display(),
            elapsed_ms = report.elapsed_ms,
            records = ?report.records,
            "profiling completed"
        );
        Ok(report)
    }

    fn report(
        &self,
        status: ProfileStatus,
        error_kind: Option<String>,
        records: Option<u64>,
        bytes_written: Option<u64>,
    ) -> Result<ProfileReport, Error> {
        let started_at = self.started_at.format(&Rfc3339).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to format profile timestamp")
                .with_source(err)
        })?;
        Ok(ProfileReport {
            started_at,
            elapsed_ms: u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX),
            status,
            error_kind,
            records,
            bytes_written,
        })
    }

    fn write_report(&self, report: &ProfileReport) -> Result<(), Error> {
        let mut file = File::create(&self.path).map_err(|err| {
            Error::from_io(err, "failed to create profile report").with_path(&self.path)
        })?;
        serde_json::to_writer_pretty(&mut file, report).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write profile report")
                .with_path(&self.path)
                .with_source(err)
        })?;
        file.write_all(b"\n").map_err(|err| {
            Error::from_io(err, "failed to write profile report").with_path(&self.path)
        })
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let written = self
            .report(ProfileStatus::Aborted, None, None, None)
            .and_then(|report| self.write_report(&report));
        if let Err(err) = written {
            warn!(error = %err, "profile report not written");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProfileStatus, Profiler};
    use crate::core::convert::ConvertOutcome;
    use crate::core::error::{Error, ErrorKind};
    use serde_json::Value;
    use std::fs;

    fn read_report(path: &std::path::Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).expect("report")).expect("json")
    }

    #[test]
    fn successful_run_writes_ok_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.json");
        let outcome = ConvertOutcome {
            columns: 3,
            records: 2,
            bytes_written: 96,
        };

        let report = Profiler::start(&path).finish(&Ok(outcome)).expect("finish");
        assert_eq!(report.status, ProfileStatus::Ok);
        assert_eq!(report.records, Some(2));

        let value = read_report(&path);
        assert_eq!(value["status"], "ok");
        assert_eq!(value["records"], 2);
        assert_eq!(value["bytes_written"], 96);
        assert!(value["started_at"].as_str().is_some());
        assert!(value.get("error_kind").is_none());
    }

    #[test]
    fn failed_run_records_error_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.json");
        let result = Err(Error::new(ErrorKind::Parse));

        Profiler::start(&path).finish(&result).expect("finish");
        let value = read_report(&path);
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_kind"], "Parse");
        assert!(value.get("records").is_none());
        assert!(value.get("bytes_written").is_none());
    }

    #[test]
    fn failed_run_counts_records_before_the_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.json");
        let result = Err(Error::new(ErrorKind::Shape).with_record(3));

        let report = Profiler::start(&path).finish(&result).expect("finish");
        assert_eq!(report.records, Some(2));
        assert_eq!(report.bytes_written, None);
        let value = read_report(&path);
        assert_eq!(value["status"], "failed");
        assert_eq!(value["records"], 2);
    }

    #[test]
    fn dropped_profiler_writes_aborted_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.json");

        drop(Profiler::start(&path));
        assert_eq!(read_report(&path)["status"], "aborted");
    }

    #[test]
    fn unwritable_report_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("profile.json");
        let outcome = ConvertOutcome::default();

        let err = Profiler::start(&path).finish(&Ok(outcome)).expect_err("unwritable");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
