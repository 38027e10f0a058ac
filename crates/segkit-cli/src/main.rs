// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use segkit_analysis::{
    AnalysisConfig, AnalysisReport, LengthMismatchPolicy, MaxSubarrayAnalyzer, ReportSummary,
    analyze_all,
};
use segkit_cli::{RawSignal, build_segments, parse_csv_signals, parse_json_signals};
use segkit_core::{
    AnalysisContext, ReproMode, SegError, Segment, StageDiagnostics, SubarrayResult,
    TracingEventSink, WindowConfig,
};
use serde::Serialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt as log_fmt};

struct Cli {
    verbose: u8,
    command: Command,
}

enum Command {
    Analyze(AnalyzeArgs),
    Subarray(SubarrayArgs),
}

#[derive(Debug, Default)]
struct InputArgs {
    input: PathBuf,
    window: Option<usize>,
    step: Option<usize>,
    min_std: Option<f64>,
    max_windows: Option<usize>,
    max_segments: Option<usize>,
    sampling_rate: Option<f64>,
}

#[derive(Debug, Default)]
struct AnalyzeArgs {
    source: InputArgs,
    config: Option<PathBuf>,
    min_cluster_size: Option<usize>,
    max_depth: Option<usize>,
    length_mismatch: Option<LengthMismatchPolicy>,
    downsample_threshold: Option<usize>,
    downsample_stride: Option<usize>,
    repro_mode: ReproMode,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct SubarrayArgs {
    source: InputArgs,
    repro_mode: ReproMode,
    output: Option<PathBuf>,
}

/// Failures the binary reports, each with a stable machine code.
#[derive(Debug)]
enum CliError {
    Seg(SegError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Seg(err) => err.code(),
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seg(err) => f.write_str(err.message()),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Seg(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<SegError> for CliError {
    fn from(value: SegError) -> Self {
        Self::Seg(value)
    }
}

fn usage_error(msg: impl Into<String>) -> CliError {
    CliError::Seg(SegError::invalid_input(msg))
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        context: format!("failed to read '{}'", path.display()),
        source,
    })
}

struct LoadedBatch {
    path: PathBuf,
    format: &'static str,
    records: usize,
    windowed: bool,
    segments: Vec<Segment>,
}

impl LoadedBatch {
    fn origins(&self) -> Vec<OriginOutput> {
        self.segments
            .iter()
            .filter_map(|segment| {
                segment.origin().map(|origin| OriginOutput {
                    segment_id: segment.id(),
                    source_index: origin.source_index,
                    start_index: origin.start_index,
                    len: segment.len(),
                })
            })
            .collect()
    }

    fn summary(&self) -> InputSummary {
        InputSummary {
            path: self.path.display().to_string(),
            format: self.format.to_string(),
            records: self.records,
            segments: self.segments.len(),
            windowed: self.windowed,
        }
    }
}

#[derive(Serialize)]
struct InputSummary {
    path: String,
    format: String,
    records: usize,
    segments: usize,
    windowed: bool,
}

#[derive(Serialize)]
struct ClusterOutput {
    index: usize,
    size: usize,
    segment_ids: Vec<u64>,
}

#[derive(Serialize)]
struct PairOutput {
    cluster_index: usize,
    first_id: u64,
    second_id: u64,
    distance: f64,
}

#[derive(Serialize)]
struct OriginOutput {
    segment_id: u64,
    source_index: usize,
    start_index: usize,
    len: usize,
}

#[derive(Serialize)]
struct AnalyzeOutput {
    command: &'static str,
    input: InputSummary,
    config: AnalysisConfig,
    repro_mode: ReproMode,
    segments: Vec<OriginOutput>,
    clusters: Vec<ClusterOutput>,
    closest_pairs: Vec<PairOutput>,
    subarrays: Vec<SubarrayResult>,
    summary: ReportSummary,
    diagnostics: Vec<StageDiagnostics>,
}

#[derive(Serialize)]
struct SubarrayOutput {
    command: &'static str,
    input: InputSummary,
    segments: Vec<OriginOutput>,
    subarrays: Vec<SubarrayResult>,
    diagnostics: StageDiagnostics,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Subarray(args) => handle_subarray(args),
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let _ = log_fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    parse_cli(args.as_slice())
}

fn parse_cli(args: &[String]) -> Result<Option<Cli>, CliError> {
    let Some((command_name, rest)) = args.split_first() else {
        print_root_help();
        return Ok(None);
    };
    match command_name.as_str() {
        "-h" | "--help" => {
            print_root_help();
            return Ok(None);
        }
        "-V" | "--version" => {
            print_version();
            return Ok(None);
        }
        _ => {}
    }

    let mut verbose = 0u8;
    let mut tokens = Vec::with_capacity(rest.len());
    for arg in rest {
        match arg.as_str() {
            "-h" | "--help" => {
                print_command_help(command_name)?;
                return Ok(None);
            }
            "-V" | "--version" => {
                print_version();
                return Ok(None);
            }
            "--verbose" => verbose = verbose.saturating_add(1),
            short if is_verbosity_cluster(short) => {
                let count = u8::try_from(short.len() - 1).unwrap_or(u8::MAX);
                verbose = verbose.saturating_add(count);
            }
            _ => tokens.push(arg.as_str()),
        }
    }

    let command = match command_name.as_str() {
        "analyze" => Command::Analyze(parse_analyze_args(&tokens)?),
        "subarray" => Command::Subarray(parse_subarray_args(&tokens)?),
        other => return Err(unknown_command(other)),
    };
    Ok(Some(Cli { verbose, command }))
}

fn unknown_command(name: &str) -> CliError {
    usage_error(format!(
        "unknown command '{name}'; expected one of: analyze, subarray"
    ))
}

fn is_verbosity_cluster(token: &str) -> bool {
    token
        .strip_prefix('-')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b == b'v'))
}

/// Walks `--flag value` and `--flag=value` pairs.
struct Flags<'a> {
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> Flags<'a> {
    fn new(tokens: &'a [&'a str]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Next `(flag, value)` pair; every flag segkit accepts takes a value.
    fn next_pair(&mut self) -> Result<Option<(&'a str, &'a str)>, CliError> {
        let Some(&token) = self.tokens.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        if !token.starts_with("--") {
            return Err(usage_error(format!(
                "unexpected argument '{token}'; options take the form --flag value"
            )));
        }
        if let Some((flag, value)) = token.split_once('=') {
            return Ok(Some((flag, value)));
        }
        match self.tokens.get(self.pos) {
            Some(&value) if !value.starts_with("--") => {
                self.pos += 1;
                Ok(Some((token, value)))
            }
            _ => Err(usage_error(format!("{token} requires a value"))),
        }
    }
}

fn parse_value<T: FromStr>(flag: &str, raw: &str, expected: &str) -> Result<T, CliError> {
    raw.parse::<T>()
        .map_err(|_| usage_error(format!("{flag} expects {expected}, got '{raw}'")))
}

fn count(flag: &str, raw: &str) -> Result<usize, CliError> {
    parse_value(flag, raw, "a non-negative integer")
}

fn number(flag: &str, raw: &str) -> Result<f64, CliError> {
    parse_value(flag, raw, "a number")
}

/// Applies an input or windowing flag. Returns false for flags it does not own.
fn apply_input_flag(source: &mut InputArgs, flag: &str, value: &str) -> Result<bool, CliError> {
    match flag {
        "--input" => source.input = PathBuf::from(value),
        "--window" => source.window = Some(count(flag, value)?),
        "--step" => source.step = Some(count(flag, value)?),
        "--min-std" => source.min_std = Some(number(flag, value)?),
        "--max-windows" => source.max_windows = Some(count(flag, value)?),
        "--max-segments" => source.max_segments = Some(count(flag, value)?),
        "--sampling-rate" => source.sampling_rate = Some(number(flag, value)?),
        _ => return Ok(false),
    }
    Ok(true)
}

fn check_input_args(command: &str, source: &InputArgs) -> Result<(), CliError> {
    if source.input.as_os_str().is_empty() {
        return Err(usage_error(format!("{command} requires --input <path>")));
    }
    if source.window.is_none() {
        let window_only = [
            ("--step", source.step.is_some()),
            ("--min-std", source.min_std.is_some()),
            ("--max-windows", source.max_windows.is_some()),
            ("--max-segments", source.max_segments.is_some()),
        ];
        if let Some((flag, _)) = window_only.iter().find(|(_, set)| *set) {
            return Err(usage_error(format!("{flag} requires --window <usize>")));
        }
    }
    Ok(())
}

fn parse_analyze_args(tokens: &[&str]) -> Result<AnalyzeArgs, CliError> {
    let mut args = AnalyzeArgs::default();
    let mut flags = Flags::new(tokens);
    while let Some((flag, value)) = flags.next_pair()? {
        if apply_input_flag(&mut args.source, flag, value)? {
            continue;
        }
        match flag {
            "--config" => args.config = Some(PathBuf::from(value)),
            "--min-cluster-size" => args.min_cluster_size = Some(count(flag, value)?),
            "--max-depth" => args.max_depth = Some(count(flag, value)?),
            "--length-mismatch" => {
                args.length_mismatch = Some(LengthMismatchPolicy::parse(value)?);
            }
            "--downsample-threshold" => args.downsample_threshold = Some(count(flag, value)?),
            "--downsample-stride" => args.downsample_stride = Some(count(flag, value)?),
            "--repro-mode" => args.repro_mode = parse_repro_mode(value)?,
            "--output" => args.output = Some(PathBuf::from(value)),
            other => return Err(usage_error(format!("unknown analyze option '{other}'"))),
        }
    }
    check_input_args("analyze", &args.source)?;
    Ok(args)
}

fn parse_subarray_args(tokens: &[&str]) -> Result<SubarrayArgs, CliError> {
    let mut args = SubarrayArgs::default();
    let mut flags = Flags::new(tokens);
    while let Some((flag, value)) = flags.next_pair()? {
        if apply_input_flag(&mut args.source, flag, value)? {
            continue;
        }
        match flag {
            "--repro-mode" => args.repro_mode = parse_repro_mode(value)?,
            "--output" => args.output = Some(PathBuf::from(value)),
            other => return Err(usage_error(format!("unknown subarray option '{other}'"))),
        }
    }
    check_input_args("subarray", &args.source)?;
    Ok(args)
}

fn parse_repro_mode(raw: &str) -> Result<ReproMode, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Ok(ReproMode::Strict),
        "balanced" => Ok(ReproMode::Balanced),
        "fast" => Ok(ReproMode::Fast),
        _ => Err(usage_error(format!(
            "invalid --repro-mode '{raw}'; expected one of: strict, balanced, fast"
        ))),
    }
}

fn print_version() {
    println!("segkit {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "segkit {}\n\nUSAGE:\n  segkit <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  analyze    Partition segments, find closest pairs and maximum subarrays\n  subarray   Run only the maximum-subarray scan\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n  -v, --verbose   Increase log verbosity (repeatable; RUST_LOG applies otherwise)\n\nRun 'segkit <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

const INPUT_HELP: &str = "  --input <path>                         Required (.json or .csv)\n  --window <usize>                       Slice each record into windows of this length\n  --step <usize>                         Window advance; default window/2\n  --min-std <float>                      Drop flatter windows; default 0.1\n  --max-windows <usize>                  Cap windows per record; default 100\n  --max-segments <usize>                 Cap windowed segments per batch; default 1000\n  --sampling-rate <hz>                   Record segment duration in features";

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "analyze" => {
            println!(
                "USAGE:\n  segkit analyze --input <path> [OPTIONS]\n\nOPTIONS:\n{INPUT_HELP}\n  --config <path>                        Analysis config JSON\n  --min-cluster-size <usize>             Default: 5\n  --max-depth <usize>                    Default: 5\n  --length-mismatch <skip|truncate|error> Default: skip\n  --downsample-threshold <usize>         Default: 100\n  --downsample-stride <usize>            Default: 10\n  --repro-mode <strict|balanced|fast>    Default: balanced\n  --output <path>                        Write JSON output to file"
            );
            Ok(())
        }
        "subarray" => {
            println!(
                "USAGE:\n  segkit subarray --input <path> [OPTIONS]\n\nOPTIONS:\n{INPUT_HELP}\n  --repro-mode <strict|balanced|fast>    Default: balanced\n  --output <path>                        Write JSON output to file"
            );
            Ok(())
        }
        other => Err(unknown_command(other)),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let batch = load_batch(&args.source)?;
    let config = resolve_analysis_config(&args)?;
    let sink = TracingEventSink;
    let ctx = AnalysisContext::new()
        .with_repro_mode(args.repro_mode)
        .with_event_sink(&sink);

    if batch.segments.is_empty() {
        tracing::warn!(path = %batch.path.display(), "no segments to analyze");
    }
    let report = analyze_all(&batch.segments, &config, &ctx)?;
    tracing::info!(
        segments = report.summary.total_segments,
        clusters = report.summary.cluster_count,
        pairs = report.closest_pairs.len(),
        "analysis completed"
    );

    write_json_output(
        &build_analyze_output(&batch, config, args.repro_mode, report),
        args.output.as_deref(),
    )
}

fn handle_subarray(args: SubarrayArgs) -> Result<(), CliError> {
    let batch = load_batch(&args.source)?;
    let sink = TracingEventSink;
    let ctx = AnalysisContext::new()
        .with_repro_mode(args.repro_mode)
        .with_event_sink(&sink);
    let output = MaxSubarrayAnalyzer::new().analyze_with_diagnostics(&batch.segments, &ctx);

    write_json_output(
        &SubarrayOutput {
            command: "subarray",
            input: batch.summary(),
            segments: batch.origins(),
            subarrays: output.results,
            diagnostics: output.diagnostics,
        },
        args.output.as_deref(),
    )
}

fn build_analyze_output(
    batch: &LoadedBatch,
    config: AnalysisConfig,
    repro_mode: ReproMode,
    report: AnalysisReport<'_>,
) -> AnalyzeOutput {
    let clusters = report
        .clusters
        .iter()
        .enumerate()
        .map(|(index, cluster)| ClusterOutput {
            index,
            size: cluster.len(),
            segment_ids: cluster.ids(),
        })
        .collect();
    let closest_pairs = report
        .closest_pairs
        .iter()
        .map(|pair| PairOutput {
            cluster_index: pair.cluster_index,
            first_id: pair.first.id(),
            second_id: pair.second.id(),
            distance: pair.distance,
        })
        .collect();

    AnalyzeOutput {
        command: "analyze",
        input: batch.summary(),
        config,
        repro_mode,
        segments: batch.origins(),
        clusters,
        closest_pairs,
        subarrays: report.subarrays,
        summary: report.summary,
        diagnostics: report.diagnostics,
    }
}

fn resolve_analysis_config(args: &AnalyzeArgs) -> Result<AnalysisConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => load_analysis_config(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(min_cluster_size) = args.min_cluster_size {
        config.partition.min_cluster_size = min_cluster_size;
    }
    if let Some(max_depth) = args.max_depth {
        config.partition.max_depth = max_depth;
    }
    if let Some(policy) = args.length_mismatch {
        config.pairs.length_mismatch = policy;
    }
    if let Some(threshold) = args.downsample_threshold {
        config.pairs.downsample_threshold = threshold;
    }
    if let Some(stride) = args.downsample_stride {
        config.pairs.downsample_stride = stride;
    }

    config.validate()?;
    Ok(config)
}

fn load_analysis_config(path: &Path) -> Result<AnalysisConfig, CliError> {
    parse_analysis_config(read_file(path)?.as_str())
}

fn parse_analysis_config(raw: &str) -> Result<AnalysisConfig, CliError> {
    serde_json::from_str(raw).map_err(|source| CliError::Json {
        context: "invalid analysis config JSON".to_string(),
        source,
    })
}

fn window_config(source: &InputArgs) -> Option<WindowConfig> {
    let segment_length = source.window?;
    let defaults = WindowConfig::default();
    Some(WindowConfig {
        segment_length,
        step: source.step,
        max_windows: source.max_windows.or(defaults.max_windows),
        max_segments: source.max_segments.or(defaults.max_segments),
        min_std: source.min_std.or(defaults.min_std),
        sampling_rate_hz: source.sampling_rate,
    })
}

fn load_batch(source: &InputArgs) -> Result<LoadedBatch, CliError> {
    let path = source.input.as_path();
    let (format, signals) = read_signals(path)?;
    let records = signals.len();
    let window = window_config(source);
    let segments = build_segments(signals, window.as_ref(), source.sampling_rate)?;
    tracing::info!(
        path = %path.display(),
        format,
        records,
        segments = segments.len(),
        "loaded segments"
    );

    Ok(LoadedBatch {
        path: path.to_path_buf(),
        format,
        records,
        windowed: window.is_some(),
        segments,
    })
}

fn read_signals(path: &Path) -> Result<(&'static str, Vec<RawSignal>), CliError> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(("json", parse_json_signals(&read_file(path)?)?)),
        "csv" => Ok(("csv", parse_csv_signals(&read_file(path)?)?)),
        _ => Err(SegError::not_supported(format!(
            "cannot read '{}'; expected a .json or .csv input",
            path.display()
        ))
        .into()),
    }
}

fn write_json_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|source| CliError::Json {
        context: "failed to serialize output".to_string(),
        source,
    })?;
    match output {
        Some(path) => fs::write(path, format!("{rendered}\n")).map_err(|source| CliError::Io {
            context: format!("failed to write '{}'", path.display()),
            source,
        }),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };
    match serde_json::to_string(&envelope) {
        Ok(rendered) => eprintln!("{rendered}"),
        Err(_) => eprintln!("error: {err}"),
    }
}
