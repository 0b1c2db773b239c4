mod messages;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use schemaflat_analyze::{find_duplicate_names, AnalysisReport, CycleReport, Finding};
use schemaflat_core::{FlattenConfig, FlattenOutcome, RuleId};
use schemaflat_model::{Diagnostic, Diagnostics, SchemaGraph, Severity};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Flatten conceptual application schemas into simpler structures.
#[derive(Parser)]
#[command(
    name = "schemaflat",
    version,
    about = "Flatten conceptual application schemas into simpler structures"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log rule execution at debug level (RUST_LOG overrides)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the configured flattening rules to a model document
    Flatten {
        /// Path to the model JSON document
        model: PathBuf,
        /// Path to the TOML rule configuration
        #[arg(long)]
        config: PathBuf,
        /// Write the flattened model here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Report type dependency cycles among the types eligible for flattening
    Cycles {
        /// Path to the model JSON document
        model: PathBuf,
        /// Path to the TOML rule configuration (type selection parameters)
        #[arg(long)]
        config: PathBuf,
    },

    /// Load a model document and report structural problems and duplicate names
    Check {
        /// Path to the model JSON document
        model: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Flatten { model, config, out } => {
            cmd_flatten(&model, &config, out.as_deref(), cli.output, cli.quiet);
        }
        Commands::Cycles { model, config } => {
            cmd_cycles(&model, &config, cli.output, cli.quiet);
        }
        Commands::Check { model } => {
            cmd_check(&model, cli.output, cli.quiet);
        }
    }
}

const VERBOSE_FILTER: &str = "warn,schemaflat_core=debug,schemaflat_model=debug,\
                              schemaflat_analyze=debug,schemaflat_interchange=debug";

fn init_logging(verbose: bool) {
    let default = if verbose { VERBOSE_FILTER } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

// ──────────────────────────────────────────────
// Shared steps
// ──────────────────────────────────────────────

/// A diagnostic as shown in JSON output: the raw fields plus the
/// catalog text.
#[derive(Serialize)]
struct RenderedDiagnostic<'a> {
    severity: Severity,
    code: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<&'a str>,
    params: &'a [String],
    message: String,
}

impl<'a> From<&'a Diagnostic> for RenderedDiagnostic<'a> {
    fn from(d: &'a Diagnostic) -> Self {
        RenderedDiagnostic {
            severity: d.severity,
            code: d.code,
            rule: d.rule.as_deref(),
            params: &d.params,
            message: messages::message(d),
        }
    }
}

fn rendered(sink: &Diagnostics) -> Vec<RenderedDiagnostic<'_>> {
    sink.entries().iter().map(RenderedDiagnostic::from).collect()
}

fn print_diagnostics(sink: &Diagnostics, quiet: bool) {
    if quiet {
        return;
    }
    for d in sink.entries() {
        eprintln!("{}", messages::render(d));
    }
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}

fn read_file(path: &Path, what: &str, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            let msg = format!("error reading {} '{}': {}", what, path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn load_model(path: &Path, sink: &mut Diagnostics, output: OutputFormat, quiet: bool) -> SchemaGraph {
    let text = read_file(path, "model", output, quiet);
    match schemaflat_interchange::load_str(&text, sink) {
        Ok(graph) => {
            tracing::debug!(
                classes = graph.class_count(),
                properties = graph.property_count(),
                "model loaded"
            );
            graph
        }
        Err(e) => {
            let msg = format!("invalid model '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn load_config(path: &Path, output: OutputFormat, quiet: bool) -> FlattenConfig {
    let text = read_file(path, "configuration", output, quiet);
    match FlattenConfig::from_toml_str(&text) {
        Ok(config) => config,
        Err(e) => {
            let msg = format!("{} ('{}')", e, path.display());
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn run_engine(
    graph: &mut SchemaGraph,
    config: &FlattenConfig,
    sink: &mut Diagnostics,
    output: OutputFormat,
    quiet: bool,
) -> FlattenOutcome {
    match schemaflat_core::flatten(graph, config, sink) {
        Ok(outcome) => outcome,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

fn rule_names(rules: &[RuleId]) -> Vec<&'static str> {
    rules.iter().map(|r| r.as_str()).collect()
}

fn print_findings(findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    println!();
    println!("Findings:");
    for f in findings {
        let severity = format!("{:?}", f.severity).to_uppercase();
        match &f.entity_id {
            Some(id) => println!("  [{}/{}] [{}]: {}", f.analysis, severity, id, f.message),
            None => println!("  [{}/{}]: {}", f.analysis, severity, f.message),
        }
    }
}

// ──────────────────────────────────────────────
// flatten
// ──────────────────────────────────────────────

fn cmd_flatten(
    model_path: &Path,
    config_path: &Path,
    out: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let mut sink = Diagnostics::new();
    let mut graph = load_model(model_path, &mut sink, output, quiet);
    let config = load_config(config_path, output, quiet);
    let outcome = run_engine(&mut graph, &config, &mut sink, output, quiet);

    let document = match schemaflat_interchange::to_json_value(&graph) {
        Ok(v) => v,
        Err(e) => {
            report_error(&format!("serialization error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if let Some(path) = out {
        let text = serde_json::to_string_pretty(&document)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
        if let Err(e) = std::fs::write(path, text + "\n") {
            let msg = format!("error writing '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }

    match output {
        OutputFormat::Json => {
            let mut summary = serde_json::json!({
                "rulesRun": rule_names(&outcome.rules_run),
                "rulesSkipped": rule_names(&outcome.rules_skipped),
                "diagnostics": rendered(&sink),
                "findings": outcome.analysis.findings,
            });
            match out {
                Some(path) => summary["out"] = serde_json::json!(path.display().to_string()),
                None => summary["model"] = document,
            }
            print_json(&summary);
        }
        OutputFormat::Text => {
            print_diagnostics(&sink, quiet);
            match out {
                None => print_json(&document),
                Some(path) => {
                    if !quiet {
                        println!(
                            "Flattened {} -> {}: {} rule(s) run, {} skipped, {} warning(s)",
                            model_path.display(),
                            path.display(),
                            outcome.rules_run.len(),
                            outcome.rules_skipped.len(),
                            sink.count(Severity::Warning)
                        );
                    }
                }
            }
        }
    }
}

// ──────────────────────────────────────────────
// cycles
// ──────────────────────────────────────────────

fn cmd_cycles(model_path: &Path, config_path: &Path, output: OutputFormat, quiet: bool) {
    let mut sink = Diagnostics::new();
    let mut graph = load_model(model_path, &mut sink, output, quiet);
    let mut config = load_config(config_path, output, quiet);
    // Only the type selection parameters matter here.
    config.rules = vec![RuleId::DetectTypeCycles.as_str().to_owned()];
    let outcome = run_engine(&mut graph, &config, &mut sink, output, quiet);

    let Some(report) = outcome.analysis.cycles.as_ref() else {
        // The rule stood down; its diagnostics say why.
        print_diagnostics(&sink, quiet);
        report_error("cycle analysis did not run", output, quiet);
        process::exit(1);
    };

    match output {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "cycles": report,
                "diagnostics": rendered(&sink),
            }));
        }
        OutputFormat::Text => {
            if !quiet {
                print_cycle_report(report);
            }
        }
    }
}

fn print_cycle_report(report: &CycleReport) {
    println!("Type Dependency Analysis");
    println!("========================");
    println!();
    println!(
        "  Types: {} eligible, {} dependencies",
        report.vertex_count, report.edge_count
    );
    if report.cycles.is_empty() {
        println!("  Cycles: none");
    } else {
        println!("  Cycles: {}", report.cycles.len());
        for cycle in &report.cycles {
            println!("    {}", cycle.render());
        }
    }
    if report.truncated {
        println!("  Enumeration stopped at {} cycles", report.cycles.len());
    }
    if !report.reflexive.is_empty() {
        println!("  Self references:");
        for r in &report.reflexive {
            println!("    {} via {}", r.class_name, r.properties.join(", "));
        }
    }
}

// ──────────────────────────────────────────────
// check
// ──────────────────────────────────────────────

fn cmd_check(model_path: &Path, output: OutputFormat, quiet: bool) {
    let mut sink = Diagnostics::new();
    let graph = load_model(model_path, &mut sink, output, quiet);

    let violations = graph.check();
    let mut report = AnalysisReport::new();
    report.duplicates = Some(find_duplicate_names(&graph));
    report.analyses_run.push("duplicates".to_owned());
    report.emit("check", &mut sink);
    report.extract_findings();

    match output {
        OutputFormat::Json => {
            let violations: Vec<String> = violations.iter().map(ToString::to_string).collect();
            print_json(&serde_json::json!({
                "valid": violations.is_empty(),
                "packages": graph.packages().count(),
                "classes": graph.class_count(),
                "properties": graph.property_count(),
                "associations": graph.associations().count(),
                "violations": violations,
                "diagnostics": rendered(&sink),
                "findings": report.findings,
            }));
        }
        OutputFormat::Text => {
            if !quiet {
                println!("Model Check Report");
                println!("==================");
                println!();
                println!(
                    "  Model: {} package(s), {} class(es), {} propert(y/ies), {} association(s)",
                    graph.packages().count(),
                    graph.class_count(),
                    graph.property_count(),
                    graph.associations().count()
                );
                if violations.is_empty() {
                    println!("  Structure: consistent");
                } else {
                    println!("  Structure: {} violation(s)", violations.len());
                    for v in &violations {
                        println!("    {}", v);
                    }
                }
                print_findings(&report.findings);
            }
            print_diagnostics(&sink, quiet);
        }
    }

    if !violations.is_empty() {
        process::exit(1);
    }
}

// ──────────────────────────────────────────────
// Error reporting
// ──────────────────────────────────────────────

/// Report an error message in the appropriate format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
