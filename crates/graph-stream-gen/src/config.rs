//! Run parameters: stream count, timeline, and output settings.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::{GenError, GenResult, Tick};

/// Timestamp layout used for `startTime` and `datetime` output.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How tick values are rendered in output artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    Units,
    Seconds,
    Datetime,
}

impl FromStr for TimeFormat {
    type Err = GenError;

    fn from_str(s: &str) -> GenResult<Self> {
        match s {
            "units" => Ok(TimeFormat::Units),
            "seconds" => Ok(TimeFormat::Seconds),
            "datetime" => Ok(TimeFormat::Datetime),
            other => Err(GenError::InvalidParameter(format!(
                "outputTimeFormat must be units, seconds or datetime, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeFormat::Units => "units",
            TimeFormat::Seconds => "seconds",
            TimeFormat::Datetime => "datetime",
        })
    }
}

/// Layout of the per-stream artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per edge; vertices are tracked but not written.
    #[default]
    Edges,
    /// JSON array of `{"vertex": ..}` and `{"edge": ..}` records.
    Json,
}

impl FromStr for OutputFormat {
    type Err = GenError;

    fn from_str(s: &str) -> GenResult<Self> {
        match s {
            "edges" => Ok(OutputFormat::Edges),
            "json" => Ok(OutputFormat::Json),
            other => Err(GenError::InvalidParameter(format!(
                "outputFormat must be edges or json, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Edges => "edges",
            OutputFormat::Json => "json",
        })
    }
}

/// How existing vertices are sampled from a stream's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPolicy {
    /// Uniform random start index, then linear probing past excluded ids.
    #[default]
    Uniform,
    /// Inverse-CDF draw weighted by `degree + 1` over eligible vertices.
    Degree,
}

impl FromStr for SamplingPolicy {
    type Err = GenError;

    fn from_str(s: &str) -> GenResult<Self> {
        match s {
            "uniform" => Ok(SamplingPolicy::Uniform),
            "degree" => Ok(SamplingPolicy::Degree),
            other => Err(GenError::InvalidParameter(format!(
                "samplingPolicy must be uniform or degree, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SamplingPolicy::Uniform => "uniform",
            SamplingPolicy::Degree => "degree",
        })
    }
}

/// Validated parameters for one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub num_streams: usize,
    pub seconds_per_unit_time: u64,
    pub start_time: NaiveDateTime,
    pub duration: Tick,
    pub time_format: TimeFormat,
    pub output_file_prefix: String,
    pub output_format: OutputFormat,
    pub sampling_policy: SamplingPolicy,
    pub random_seed: Option<u64>,
}

impl GenerationParams {
    /// Parameters with the given stream count and duration and defaults elsewhere.
    pub fn new(num_streams: usize, duration: Tick) -> Self {
        Self {
            num_streams,
            seconds_per_unit_time: 1,
            start_time: NaiveDateTime::default(),
            duration,
            time_format: TimeFormat::Units,
            output_file_prefix: "out".to_string(),
            output_format: OutputFormat::Edges,
            sampling_policy: SamplingPolicy::Uniform,
            random_seed: None,
        }
    }

    /// Check ranges that the decoder cannot express in types.
    pub fn validate(&self) -> GenResult<()> {
        if self.num_streams < 1 {
            return Err(GenError::InvalidParameter(
                "numStreams must be at least 1".to_string(),
            ));
        }
        if self.seconds_per_unit_time < 1 {
            return Err(GenError::InvalidParameter(
                "secondsPerUnitTime must be at least 1".to_string(),
            ));
        }
        if self.output_file_prefix.is_empty() {
            return Err(GenError::InvalidParameter(
                "outputFilePrefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a `startTime` value.
    pub fn parse_start_time(s: &str) -> GenResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).map_err(|e| {
            GenError::InvalidParameter(format!(
                "startTime '{s}' does not match YYYY-MM-DD HH:MM:SS: {e}"
            ))
        })
    }

    /// Render a tick according to the configured time format.
    pub fn format_time(&self, tick: Tick) -> String {
        match self.time_format {
            TimeFormat::Units => tick.to_string(),
            TimeFormat::Seconds => (tick * self.seconds_per_unit_time).to_string(),
            TimeFormat::Datetime => {
                let secs = (tick * self.seconds_per_unit_time) as i64;
                (self.start_time + Duration::seconds(secs))
                    .format(DATETIME_FORMAT)
                    .to_string()
            }
        }
    }

    /// File name of the artifact for a 1-based stream index.
    pub fn stream_file_name(&self, stream: usize) -> String {
        format!("{}-s{stream}", self.output_file_prefix)
    }

    /// File name of the occurrence log.
    pub fn occurrence_file_name(&self) -> String {
        format!("{}-insts", self.output_file_prefix)
    }
}

impl fmt::Display for GenerationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Parameters:")?;
        writeln!(f, "  Number of streams = {}", self.num_streams)?;
        writeln!(f, "  Seconds per unit time = {}", self.seconds_per_unit_time)?;
        writeln!(f, "  Start time = {}", self.start_time.format(DATETIME_FORMAT))?;
        writeln!(f, "  Duration = {}", self.duration)?;
        writeln!(f, "  Output time format = {}", self.time_format)?;
        writeln!(f, "  Output format = {}", self.output_format)?;
        writeln!(f, "  Sampling policy = {}", self.sampling_policy)?;
        match self.random_seed {
            Some(seed) => writeln!(f, "  Random seed = {seed}")?,
            None => writeln!(f, "  Random seed = (entropy)")?,
        }
        write!(f, "  Output file prefix = {}", self.output_file_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(format: TimeFormat) -> GenerationParams {
        let mut p = GenerationParams::new(1, 10);
        p.seconds_per_unit_time = 60;
        p.start_time = GenerationParams::parse_start_time("2017-01-31 23:59:00").unwrap();
        p.time_format = format;
        p
    }

    #[test]
    fn test_format_units() {
        assert_eq!(params(TimeFormat::Units).format_time(3), "3");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(params(TimeFormat::Seconds).format_time(3), "180");
    }

    #[test]
    fn test_format_datetime_rolls_over_month() {
        assert_eq!(
            params(TimeFormat::Datetime).format_time(2),
            "2017-02-01 00:01:00"
        );
    }

    #[test]
    fn test_bad_start_time() {
        assert!(GenerationParams::parse_start_time("2017/01/01").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_streams() {
        let p = GenerationParams::new(0, 10);
        assert!(matches!(p.validate(), Err(GenError::InvalidParameter(_))));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("degree".parse::<SamplingPolicy>().unwrap(), SamplingPolicy::Degree);
        assert!("hours".parse::<TimeFormat>().is_err());
    }

    #[test]
    fn test_file_names() {
        let p = params(TimeFormat::Units);
        assert_eq!(p.stream_file_name(2), "out-s2");
        assert_eq!(p.occurrence_file_name(), "out-insts");
    }
}
