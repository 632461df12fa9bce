//! Input resolution and command-line overrides.

use std::path::PathBuf;

use graph_stream_gen::{GenerationParams, OutputFormat, SamplingPolicy};

/// Environment variable naming the input document when none is given.
pub const INPUT_ENV: &str = "GSG_INPUT";

/// Document picked up from the working directory as a last resort.
pub const DEFAULT_INPUT: &str = "gsg.json";

/// Resolve the input document path: explicit flag, then `GSG_INPUT`, then `./gsg.json`.
pub fn resolve_input_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var(INPUT_ENV) {
        if !env_path.is_empty() {
            return PathBuf::from(env_path);
        }
    }

    PathBuf::from(DEFAULT_INPUT)
}

/// Settings given on the command line that take precedence over the document.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub seed: Option<u64>,
    pub format: Option<OutputFormat>,
    pub sampling: Option<SamplingPolicy>,
}

impl Overrides {
    pub fn apply(&self, params: &mut GenerationParams) {
        if let Some(seed) = self.seed {
            params.random_seed = Some(seed);
        }
        if let Some(format) = self.format {
            params.output_format = format;
        }
        if let Some(sampling) = self.sampling {
            params.sampling_policy = sampling;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(resolve_input_path(Some("a.json")), PathBuf::from("a.json"));
    }

    #[test]
    fn test_overrides_apply() {
        let mut params = GenerationParams::new(1, 5);
        params.random_seed = Some(1);
        Overrides {
            seed: Some(9),
            format: Some(OutputFormat::Json),
            sampling: None,
        }
        .apply(&mut params);
        assert_eq!(params.random_seed, Some(9));
        assert_eq!(params.output_format, OutputFormat::Json);
        assert_eq!(params.sampling_policy, SamplingPolicy::Uniform);
    }
}
