use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::errors::GuidanceError;

/// One guidance tick as seen by the vehicle and commanded by the loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    pub tick: u64,
    /// Seconds since the first tick, on the vehicle clock.
    pub timestamp: f64,
    pub altitude: f64,
    pub speed: f64,
    pub pitch: f64,
    pub thrust: f64,
    pub mass: f64,
    pub apoapsis: f64,
    pub periapsis: f64,
    pub commanded_pitch: f64,
    pub throttle: f64,
    pub phase: String,
}

/// Consumer of a finished (or in-progress) flight record.
pub trait TelemetrySink {
    fn export(&mut self, samples: &[TelemetrySample]) -> Result<(), GuidanceError>;
}

/// Append-only sample buffer.
///
/// Clones share the same buffer, so a dashboard thread can hold one and call
/// [`TelemetryRecorder::snapshot`] while the guidance loop records.
#[derive(Debug, Clone, Default)]
pub struct TelemetryRecorder {
    samples: Arc<RwLock<Vec<TelemetrySample>>>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        TelemetryRecorder::default()
    }

    pub fn record(&self, sample: TelemetrySample) {
        self.write().push(sample);
    }

    pub fn snapshot(&self) -> Vec<TelemetrySample> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn last(&self) -> Option<TelemetrySample> {
        self.read().last().cloned()
    }

    pub fn export_to(&self, sink: &mut dyn TelemetrySink) -> Result<(), GuidanceError> {
        sink.export(&self.read())
    }

    pub fn summary(&self) -> FlightSummary {
        FlightSummary::from_samples(&self.read())
    }

    // A writer can only panic between complete pushes, so the buffer stays
    // consistent even when the lock is poisoned.
    fn read(&self) -> RwLockReadGuard<'_, Vec<TelemetrySample>> {
        self.samples.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TelemetrySample>> {
        self.samples
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlightSummary {
    pub ticks: usize,
    pub duration: f64,
    pub max_altitude: f64,
    pub max_speed: f64,
    pub max_thrust: f64,
    pub min_mass: f64,
    pub final_apoapsis: f64,
    pub final_periapsis: f64,
    /// Phase changes and the time they were first recorded.
    pub phase_times: Vec<(String, f64)>,
}

impl FlightSummary {
    pub fn from_samples(samples: &[TelemetrySample]) -> Self {
        let mut summary = FlightSummary {
            ticks: samples.len(),
            min_mass: if samples.is_empty() { 0.0 } else { f64::MAX },
            ..FlightSummary::default()
        };

        for sample in samples {
            summary.max_altitude = summary.max_altitude.max(sample.altitude);
            summary.max_speed = summary.max_speed.max(sample.speed);
            summary.max_thrust = summary.max_thrust.max(sample.thrust);
            summary.min_mass = summary.min_mass.min(sample.mass);

            let phase_changed = summary
                .phase_times
                .last()
                .map_or(true, |(phase, _)| *phase != sample.phase);
            if phase_changed {
                summary
                    .phase_times
                    .push((sample.phase.clone(), sample.timestamp));
            }
        }

        if let Some(last) = samples.last() {
            summary.duration = last.timestamp;
            summary.final_apoapsis = last.apoapsis;
            summary.final_periapsis = last.periapsis;
        }

        summary
    }
}

pub fn format_time(elapsed_time: f64) -> String {
    if elapsed_time >= 3600.0 {
        let hours = (elapsed_time / 3600.0).floor();
        let minutes = ((elapsed_time % 3600.0) / 60.0).floor();
        let seconds = elapsed_time % 60.0;
        format!("{:.0}h {:.0}m {:.2}s", hours, minutes, seconds)
    } else if elapsed_time >= 60.0 {
        let minutes = (elapsed_time / 60.0).floor();
        let seconds = elapsed_time % 60.0;
        format!("{:.0}m {:.2}s", minutes, seconds)
    } else {
        format!("{:.2}s", elapsed_time)
    }
}

pub fn format_altitude(altitude: f64) -> String {
    if altitude.abs() >= 1000.0 {
        format!("{:.2} km", altitude / 1000.0)
    } else {
        format!("{:.2} m", altitude)
    }
}

impl fmt::Display for FlightSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Flight Summary ---")?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Duration: {}", format_time(self.duration))?;
        writeln!(f, "Max Altitude: {}", format_altitude(self.max_altitude))?;
        writeln!(f, "Max Speed: {:.2} m/s", self.max_speed)?;
        writeln!(f, "Max Thrust: {:.0} N", self.max_thrust)?;
        writeln!(f, "Min Mass: {:.2} kg", self.min_mass)?;
        writeln!(f, "Apoapsis: {}", format_altitude(self.final_apoapsis))?;
        writeln!(f, "Periapsis: {}", format_altitude(self.final_periapsis))?;
        for (phase, time) in &self.phase_times {
            writeln!(f, "Phase {} reached at: {}", phase, format_time(*time))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sample(tick: u64, altitude: f64, phase: &str) -> TelemetrySample {
        TelemetrySample {
            tick,
            timestamp: tick as f64 * 0.5,
            altitude,
            speed: altitude / 10.0,
            pitch: 90.0,
            thrust: 1_000_000.0,
            mass: 100_000.0 - tick as f64,
            apoapsis: altitude * 2.0,
            periapsis: -600_000.0,
            commanded_pitch: 90.0,
            throttle: 1.0,
            phase: phase.to_string(),
        }
    }

    struct CountingSink {
        exported: usize,
    }

    impl TelemetrySink for CountingSink {
        fn export(&mut self, samples: &[TelemetrySample]) -> Result<(), GuidanceError> {
            self.exported = samples.len();
            Ok(())
        }
    }

    #[test]
    fn test_record_preserves_order() {
        let recorder = TelemetryRecorder::new();
        assert!(recorder.is_empty());

        for tick in 0..5 {
            recorder.record(sample(tick, tick as f64 * 100.0, "Ascent(0)"));
        }

        let ticks: Vec<u64> = recorder.snapshot().iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
        assert_eq!(recorder.last().map(|s| s.tick), Some(4));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let recorder = TelemetryRecorder::new();
        recorder.record(sample(0, 0.0, "Ascent(0)"));
        let snapshot = recorder.snapshot();
        recorder.record(sample(1, 10.0, "Ascent(0)"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn test_concurrent_reader_sees_whole_samples() {
        let recorder = TelemetryRecorder::new();
        let reader = recorder.clone();

        let handle = thread::spawn(move || {
            let mut observed = 0;
            for _ in 0..200 {
                let snapshot = reader.snapshot();
                for (index, s) in snapshot.iter().enumerate() {
                    assert_eq!(s.tick, index as u64);
                    assert_eq!(s.apoapsis, s.altitude * 2.0);
                }
                observed = observed.max(snapshot.len());
            }
            observed
        });

        for tick in 0..1_000 {
            recorder.record(sample(tick, tick as f64, "Ascent(0)"));
        }

        let observed = handle.join().unwrap();
        assert!(observed <= 1_000);
        assert_eq!(recorder.len(), 1_000);
    }

    #[test]
    fn test_export_to_sink() {
        let recorder = TelemetryRecorder::new();
        for tick in 0..3 {
            recorder.record(sample(tick, 0.0, "Ascent(0)"));
        }
        let mut sink = CountingSink { exported: 0 };
        recorder.export_to(&mut sink).unwrap();
        assert_eq!(sink.exported, 3);
    }

    #[test]
    fn test_summary() {
        let recorder = TelemetryRecorder::new();
        recorder.record(sample(0, 0.0, "Ascent(0)"));
        recorder.record(sample(1, 5_000.0, "Ascent(0)"));
        recorder.record(sample(2, 9_000.0, "ApoapsisRaise"));
        recorder.record(sample(3, 8_000.0, "ApoapsisRaise"));

        let summary = recorder.summary();
        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.max_altitude, 9_000.0);
        assert_eq!(summary.max_speed, 900.0);
        assert_eq!(summary.min_mass, 99_997.0);
        assert_eq!(summary.final_apoapsis, 16_000.0);
        assert_eq!(summary.duration, 1.5);
        assert_eq!(
            summary.phase_times,
            vec![
                ("Ascent(0)".to_string(), 0.0),
                ("ApoapsisRaise".to_string(), 1.0)
            ]
        );
        assert!(summary.to_string().contains("Max Altitude: 9.00 km"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(42.5), "42.50s");
        assert_eq!(format_time(80.0), "1m 20.00s");
        assert_eq!(format_time(3_725.0), "1h 2m 5.00s");
    }

    #[test]
    fn test_empty_summary() {
        let summary = TelemetryRecorder::new().summary();
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.min_mass, 0.0);
    }
}
