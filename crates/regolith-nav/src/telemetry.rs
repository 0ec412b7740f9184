//! Per-frame navigation telemetry.
//!
//! Every tick produces one [`TelemetrySample`]. Hosts forward it to any
//! number of [`TelemetrySink`]s: the tracing sink logs it, the CSV sink writes
//! one row per sample for offline analysis.

use std::io::Write;

use glam::Vec3;

/// Snapshot of the viewpoint after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySample {
    /// Seconds since the controller was activated.
    pub elapsed: f32,
    pub dt: f32,
    /// Final position, shake included.
    pub position: Vec3,
    /// Height above the configured reference level.
    pub elevation: f32,
    /// Smoothed displacement length per reference frame.
    pub speed: f32,
    /// Yaw in radians.
    pub heading: f32,
    /// Whether the ground follower snapped this tick.
    pub grounded: bool,
    /// Length of the shake offset applied this tick.
    pub shake: f32,
}

impl TelemetrySample {
    /// Speed as shown on the HUD.
    pub fn speed_kmh(&self) -> f32 {
        self.speed * 10.0
    }

    /// Heading in degrees, `0..360`, clockwise from -Z as seen from above.
    pub fn heading_degrees(&self) -> f32 {
        (-self.heading.to_degrees()).rem_euclid(360.0)
    }
}

/// A destination for telemetry samples.
pub trait TelemetrySink {
    fn record(&mut self, sample: &TelemetrySample);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn record(&mut self, sample: &TelemetrySample) {
        (**self).record(sample);
    }
}

/// Logs each sample at debug level.
#[derive(Debug, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn record(&mut self, sample: &TelemetrySample) {
        tracing::debug!(
            x = sample.position.x,
            y = sample.position.y,
            z = sample.position.z,
            elevation = sample.elevation,
            speed = sample.speed,
            heading = sample.heading,
            grounded = sample.grounded,
            "Navigation tick"
        );
    }
}

/// Generates the CSV header and row formatter from one column list, keeping
/// names and formats in sync.
macro_rules! define_csv_columns {
    (
        columns: { $( $name:ident : $fmt:literal ),* $(,)? },
        row_values: |$sample:ident| { $( $val:expr ),* $(,)? }
    ) => {
        const CSV_HEADER: &str = concat!( $( stringify!($name), "," ),* );

        /// CSV header line, without a trailing newline.
        pub fn csv_header() -> &'static str {
            CSV_HEADER.trim_end_matches(',')
        }

        fn format_row($sample: &TelemetrySample) -> String {
            let line = format!( concat!( $( $fmt, "," ),* ), $( $val ),* );
            line.trim_end_matches(',').to_owned()
        }
    };
}

define_csv_columns! {
    columns: {
        t: "{:.4}",
        dt: "{:.5}",
        x: "{:.3}",
        y: "{:.3}",
        z: "{:.3}",
        elevation: "{:.3}",
        speed: "{:.3}",
        heading_deg: "{:.2}",
        grounded: "{}",
        shake: "{:.4}",
    },
    row_values: |s| {
        s.elapsed,
        s.dt,
        s.position.x,
        s.position.y,
        s.position.z,
        s.elevation,
        s.speed,
        s.heading_degrees(),
        u8::from(s.grounded),
        s.shake,
    }
}

/// Writes samples as CSV rows to any writer. The header precedes the first row.
#[derive(Debug)]
pub struct CsvTelemetrySink<W: Write> {
    writer: W,
    wrote_header: bool,
    failed: bool,
}

impl<W: Write> CsvTelemetrySink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            wrote_header: false,
            failed: false,
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_sample(&mut self, sample: &TelemetrySample) -> std::io::Result<()> {
        if !self.wrote_header {
            writeln!(self.writer, "{}", csv_header())?;
            self.wrote_header = true;
        }
        writeln!(self.writer, "{}", format_row(sample))
    }
}

impl<W: Write> TelemetrySink for CsvTelemetrySink<W> {
    fn record(&mut self, sample: &TelemetrySample) {
        if self.failed {
            return;
        }
        if let Err(err) = self.write_sample(sample) {
            tracing::warn!("Telemetry output failed, disabling CSV sink: {err}");
            self.failed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(elapsed: f32) -> TelemetrySample {
        TelemetrySample {
            elapsed,
            dt: 0.016,
            position: Vec3::new(1.0, 5355.0, -2.5),
            elevation: 5.0,
            speed: 4.0,
            heading: -std::f32::consts::FRAC_PI_2,
            grounded: true,
            shake: 0.0,
        }
    }

    #[test]
    fn test_header_matches_columns() {
        assert_eq!(
            csv_header(),
            "t,dt,x,y,z,elevation,speed,heading_deg,grounded,shake"
        );
    }

    #[test]
    fn test_csv_rows() {
        let mut sink = CsvTelemetrySink::new(Vec::new());
        sink.record(&sample(0.0));
        sink.record(&sample(0.5));
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], csv_header());
        assert_eq!(
            lines[2],
            "0.5000,0.01600,1.000,5355.000,-2.500,5.000,4.000,90.00,1,0.0000"
        );
    }

    #[test]
    fn test_hud_conversions() {
        let s = sample(0.0);
        assert!((s.speed_kmh() - 40.0).abs() < 1e-5);
        assert!((s.heading_degrees() - 90.0).abs() < 1e-4);
    }
}
