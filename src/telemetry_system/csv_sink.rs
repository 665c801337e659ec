use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::errors::GuidanceError;
use crate::telemetry_system::telemetry::{TelemetrySample, TelemetrySink};

/// Writes samples as CSV rows, one per tick, with a header row.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, GuidanceError> {
        let path = path.as_ref();
        let writer = csv::Writer::from_path(path).map_err(|e| {
            GuidanceError::TelemetryUnavailable(format!(
                "cannot open telemetry file {}: {e}",
                path.display()
            ))
        })?;
        Ok(CsvSink { writer })
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W) -> Self {
        CsvSink {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, GuidanceError> {
        self.writer
            .into_inner()
            .map_err(|e| GuidanceError::TelemetryUnavailable(format!("csv flush failed: {e}")))
    }
}

impl<W: Write> TelemetrySink for CsvSink<W> {
    fn export(&mut self, samples: &[TelemetrySample]) -> Result<(), GuidanceError> {
        for sample in samples {
            self.writer
                .serialize(sample)
                .map_err(|e| GuidanceError::TelemetryUnavailable(format!("csv write failed: {e}")))?;
        }
        self.writer
            .flush()
            .map_err(|e| GuidanceError::TelemetryUnavailable(format!("csv flush failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64) -> TelemetrySample {
        TelemetrySample {
            tick,
            timestamp: tick as f64,
            altitude: 1_000.0 * tick as f64,
            speed: 50.0,
            pitch: 88.0,
            thrust: 1_505_000.0,
            mass: 95_000.0,
            apoapsis: 2_000.0,
            periapsis: -590_000.0,
            commanded_pitch: 88.5,
            throttle: 1.0,
            phase: "Ascent(0)".to_string(),
        }
    }

    #[test]
    fn test_header_and_rows() {
        let mut sink = CsvSink::from_writer(Vec::new());
        sink.export(&[sample(0), sample(1)]).unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("tick,timestamp,altitude,speed,pitch,thrust"));
        assert!(lines[2].starts_with("1,1.0,1000.0,"));
        assert!(lines[2].ends_with("Ascent(0)"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.export(&[sample(0)]).unwrap();
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
