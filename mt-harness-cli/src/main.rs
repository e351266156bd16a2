//! Metamorphic Testing Harness CLI
//!
//! Command-line front end for the mt-harness library. It adds:
//! - TOML configuration of ports and test cases
//! - A quick mode for one test case given entirely on the command line
//! - A terminal visualizer
//! - Report generation (TXT/JSON)

use anyhow::{bail, Result};
use clap::Parser;
use mt_harness::{Harness, HarnessConfig, RelationSet, TestCase};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

mod config;
mod console;
mod report;

use config::{AppConfig, ReportConfig, ReportFormat, VisualizationConfig};
use console::ConsoleVisualizer;
use report::CaseOutcome;

/// Metamorphic Testing Harness - Replay port logs and check relations
#[derive(Parser, Debug)]
#[command(name = "mt-harness")]
#[command(about = "Replay device port logs and check metamorphic relations", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (harness.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input port log (can be repeated)
    #[arg(short, long, value_name = "NAME=FILE", value_parser = parse_binding)]
    input: Vec<(String, PathBuf)>,

    /// Output port log (can be repeated)
    #[arg(short, long, value_name = "NAME=FILE", value_parser = parse_binding)]
    output: Vec<(String, PathBuf)>,

    /// Directory of the input logs in quick mode
    #[arg(long, value_name = "DIR", default_value = ".")]
    input_dir: PathBuf,

    /// Directory of the output logs in quick mode
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Relation file checked at every instant in quick mode
    #[arg(short, long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Log lines carry several whitespace-separated values
    #[arg(long)]
    multi_value: bool,

    /// Test case id (quick mode) or filter (config mode, can be repeated)
    #[arg(long, value_name = "ID")]
    case: Vec<String>,

    /// Print every instant to the terminal
    #[arg(long)]
    visualize: bool,

    /// Pause between visualized instants
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

/// Parse a `NAME=FILE` port binding
fn parse_binding(s: &str) -> std::result::Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, file)) if !name.is_empty() && !file.is_empty() => {
            Ok((name.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected NAME=FILE, got '{}'", s)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("MT Harness CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using harness library v{}", mt_harness::VERSION);

    let app = if let Some(config_path) = &args.config {
        config_mode(config_path, &args)?
    } else if !args.input.is_empty() {
        quick_mode(&args)
    } else {
        println!("MT Harness - No input specified");
        println!("\nQuick Start:");
        println!("  mt-harness --input in_ir1=A1_IR_1.txt --output out_alarm=D13_ALARM.txt --rules building.rules");
        println!("\nFor several test cases:");
        println!("  mt-harness --config harness.toml");
        println!("\nUse --help for more options");
        return Ok(());
    };

    run(app, args.quiet)
}

/// Config mode - ports and test cases from a TOML file, flags override
fn config_mode(config_path: &Path, args: &Args) -> Result<AppConfig> {
    log::info!("Loading configuration from: {:?}", config_path);
    let mut app = config::load_config(config_path)?;
    log::debug!("Configuration loaded successfully");

    if !args.case.is_empty() {
        for id in &args.case {
            if !app.test_cases.iter().any(|c| &c.id == id) {
                bail!("Unknown test case: {}", id);
            }
        }
        app.test_cases.retain(|c| args.case.contains(&c.id));
    }

    apply_overrides(&mut app, args);
    Ok(app)
}

/// Quick mode - one test case described entirely by flags
fn quick_mode(args: &Args) -> AppConfig {
    let mut ports = HarnessConfig::new().with_multi_value(args.multi_value);
    for (name, file) in &args.input {
        ports = ports.add_input(name.as_str(), file.clone());
    }
    for (name, file) in &args.output {
        ports = ports.add_output(name.as_str(), file.clone());
    }

    let id = args.case.first().map(String::as_str).unwrap_or("sim1");
    let mut case = TestCase::new(id, &args.input_dir, &args.output_dir);
    if let Some(rules) = &args.rules {
        case = case.with_rules(rules);
    }

    let mut app = AppConfig {
        ports,
        test_cases: vec![case],
        visualization: VisualizationConfig::default(),
        report: ReportConfig::default(),
    };
    apply_overrides(&mut app, args);
    app
}

fn apply_overrides(app: &mut AppConfig, args: &Args) {
    if args.visualize {
        app.visualization.enabled = true;
    }
    if let Some(delay) = args.delay_ms {
        app.visualization.delay_ms = delay;
    }
    if let Some(path) = &args.report {
        app.report.output = Some(path.clone());
    }
    if let Some(format) = args.format {
        app.report.format = format;
    }
}

/// Run every test case, write the report, fail if any case failed
fn run(app: AppConfig, quiet: bool) -> Result<()> {
    if app.test_cases.is_empty() {
        bail!("No test cases to run");
    }

    let mut harness = Harness::new(app.ports);
    if app.visualization.enabled {
        harness = harness.with_visualizer(Box::new(ConsoleVisualizer::new(
            app.visualization.delay_ms,
        )));
    }

    // Relation files are the only relations the CLI knows about
    let relations = RelationSet::new();
    let mut outcomes = Vec::with_capacity(app.test_cases.len());

    for case in &app.test_cases {
        if !quiet {
            print!("Running {} ... ", case.id);
            io::stdout().flush()?;
        }
        match harness.run_test_case(case, &relations) {
            Ok(summary) => {
                if !quiet {
                    println!("✓ ({} instants)", summary.steps);
                }
                outcomes.push(CaseOutcome::passed(&case.id));
            }
            Err(e) => {
                if !quiet {
                    println!("✗");
                }
                eprintln!("Test case {} failed: {}", case.id, e);
                outcomes.push(CaseOutcome::failed(&case.id, e));
            }
        }
    }

    report::write_report(&outcomes, harness.history(), &app.report)?;

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        bail!("{} of {} test cases failed", failed, outcomes.len());
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        assert_eq!(
            parse_binding("in_ir1=A1_IR_1.txt").unwrap(),
            ("in_ir1".to_string(), PathBuf::from("A1_IR_1.txt"))
        );
        assert!(parse_binding("in_ir1").is_err());
        assert!(parse_binding("=A1_IR_1.txt").is_err());
    }

    #[test]
    fn test_quick_mode_builds_one_case() {
        let args = Args::parse_from([
            "mt-harness",
            "--input",
            "gen=in_gen.log",
            "--output",
            "destination=out_dest.log",
            "--multi-value",
            "--rules",
            "airlift.rules",
            "--format",
            "json",
        ]);
        let app = quick_mode(&args);

        assert!(app.ports.multi_value);
        assert_eq!(app.ports.inputs["gen"], PathBuf::from("in_gen.log"));
        assert_eq!(app.test_cases.len(), 1);
        assert_eq!(app.test_cases[0].id, "sim1");
        assert_eq!(app.test_cases[0].rules, Some(PathBuf::from("airlift.rules")));
        assert_eq!(app.report.format, ReportFormat::Json);
    }

    #[test]
    fn test_config_mode_filters_cases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        std::fs::write(
            &path,
            r#"
                [ports.inputs]
                x = "x.txt"

                [[test_cases]]
                id = "sim1"
                input_dir = "a"
                output_dir = "a"

                [[test_cases]]
                id = "sim2"
                input_dir = "b"
                output_dir = "b"
            "#,
        )
        .unwrap();

        let args = Args::parse_from(["mt-harness", "--config", "x", "--case", "sim2", "--visualize"]);
        let app = config_mode(&path, &args).unwrap();
        assert_eq!(app.test_cases.len(), 1);
        assert_eq!(app.test_cases[0].id, "sim2");
        assert!(app.visualization.enabled);

        let args = Args::parse_from(["mt-harness", "--config", "x", "--case", "sim9"]);
        assert!(config_mode(&path, &args).is_err());
    }

    #[test]
    fn test_run_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "00:00:00 0\n00:00:01 1\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "00:00:00 0\n").unwrap();
        let rules = dir.path().join("mirror.rules");
        std::fs::write(&rules, "out:b == in:a\n").unwrap();
        let report = dir.path().join("report.json");

        let app = AppConfig {
            ports: HarnessConfig::new().add_input("a", "a.txt").add_output("b", "b.txt"),
            test_cases: vec![TestCase::new("sim1", dir.path(), dir.path()).with_rules(&rules)],
            visualization: VisualizationConfig::default(),
            report: ReportConfig {
                format: ReportFormat::Json,
                output: Some(report.clone()),
                include_samples: false,
            },
        };

        let err = run(app, true).unwrap_err();
        assert!(err.to_string().contains("1 of 1 test cases failed"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(json["cases"][0]["status"], "failed");
        assert_eq!(json["cases"][0]["instants"], 2);
    }
}
