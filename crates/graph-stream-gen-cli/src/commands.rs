//! Command implementations shared by the binary and its tests.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;

use graph_stream_gen::graphml::default_output_path;
use graph_stream_gen::{export_file, ExportSummary, GenerationSummary, InputDocument, Scheduler};

use crate::config::Overrides;

/// Load, validate, and run one generation, writing artifacts under `out_dir`.
pub fn generate(input: &Path, out_dir: &Path, overrides: &Overrides) -> anyhow::Result<GenerationSummary> {
    let doc = InputDocument::load(input)
        .with_context(|| format!("Invalid input document {}", input.display()))?;
    let mut params = doc.params;
    overrides.apply(&mut params);

    tracing::debug!("{params}");
    for pattern in doc.library.patterns.iter().chain(&doc.library.seeds) {
        tracing::debug!("{pattern}");
    }
    tracing::info!(
        "Generating {} streams over {} ticks from {} patterns",
        params.num_streams,
        params.duration,
        doc.library.len()
    );

    let mut scheduler = Scheduler::new(params, doc.library)?;
    let summary = scheduler
        .run(out_dir)
        .with_context(|| format!("Generation into {} failed", out_dir.display()))?;
    Ok(summary)
}

/// Validate a document and render its parameters and patterns.
pub fn validate(input: &Path) -> anyhow::Result<String> {
    let doc = InputDocument::load(input)
        .with_context(|| format!("Invalid input document {}", input.display()))?;

    let mut out = String::new();
    writeln!(out, "Valid input document: {}", input.display())?;
    writeln!(out, "{}", doc.params)?;
    for pattern in &doc.library.patterns {
        writeln!(out, "{pattern}")?;
    }
    if !doc.library.seeds.is_empty() {
        writeln!(out, "Seed patterns:")?;
        for pattern in &doc.library.seeds {
            writeln!(out, "{pattern}")?;
        }
    }
    for model in &doc.library.background {
        writeln!(
            out,
            "Background model {} (stream {}, {} patterns)",
            model.name,
            model.stream,
            model.patterns.len()
        )?;
    }
    Ok(out)
}

/// Convert a JSON stream artifact to GraphML. Returns the path written.
pub fn export_graphml(input: &Path, output: Option<&Path>) -> anyhow::Result<(PathBuf, ExportSummary)> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));
    let summary = export_file(input, &output)
        .with_context(|| format!("Failed to export {} to GraphML", input.display()))?;
    Ok((output, summary))
}

/// Short text report of a finished run.
pub fn render_summary(summary: &GenerationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Generation complete (seed {})", summary.seed);
    let _ = writeln!(out, "  Ticks elapsed: {}", summary.ticks_elapsed);
    let _ = writeln!(
        out,
        "  Occurrences: {} created, {} abandoned",
        summary.occurrences, summary.abandoned
    );
    for stream in &summary.streams {
        let _ = writeln!(
            out,
            "  Stream {}: {} vertices, {} edges",
            stream.stream, stream.vertices, stream.edges
        );
    }
    let r = &summary.resolver;
    let _ = write!(
        out,
        "  Existing-vertex picks: {} uniform ({} by probing), {} degree-weighted, {} misses",
        r.uniform_picks, r.probed_picks, r.weighted_picks, r.misses
    );
    out
}
