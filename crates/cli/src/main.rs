use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use optigraph::batch::{score_batch, sift_exhaustive};
use optigraph::cfg::TEMPLATES_PER_THREAD;
use optigraph::enumerate::{depth_for, enumerate_templates, template_count, Template};
use optigraph::error::SiftArgsError;
use optigraph::io::{format_edges, read_batch, read_matrix, SiftArgs};
use optigraph::observe::CounterSnapshot;
use optigraph::prelude::*;
use optigraph::scored::ScoredReport;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

mod provenance;
mod settings;

use provenance::{write_sidecar, Provenance};
use settings::Tuning;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Linear-optical circuit topology search")]
struct Cmd {
    /// Raise log verbosity (-v debug, -vv trace); logs go to stderr
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    action: Action,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Kind {
    #[default]
    Truth,
    Amplitude,
}

impl From<Kind> for TargetKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Truth => TargetKind::Truth,
            Kind::Amplitude => TargetKind::Amplitude,
        }
    }
}

#[derive(Subcommand)]
enum Action {
    /// Enumerate every topology and print the edges of those passing the sift.
    /// Arguments: P BS DC W followed by a P x P 0/1 matrix (row-major).
    Sift {
        /// Worker threads (default: all cores)
        #[arg(long)]
        threads: Option<usize>,
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Tune and score every topology of a batch file, report the best
    Score {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Kind::Truth)]
        target: Kind,
        #[arg(long)]
        threads: Option<usize>,
        #[command(flatten)]
        tuning: Tuning,
        /// Write the JSON report here (plus a provenance sidecar) instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Search all topologies with the given element counts against a target
    Search {
        ports: usize,
        beamsplitters: usize,
        couplers: usize,
        waveplates: usize,
        /// File with the P x P target matrix
        #[arg(long)]
        target_file: PathBuf,
        #[arg(long, value_enum, default_value_t = Kind::Truth)]
        target: Kind,
        #[arg(long, default_value_t = 1)]
        workers: usize,
        /// Input ports fixed per template (overrides the config)
        #[arg(long)]
        depth: Option<usize>,
        #[command(flatten)]
        tuning: Tuning,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print version, code revision and default configuration as JSON
    Report,
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = match cmd.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
    match cmd.action {
        Action::Sift { threads, args } => {
            let parsed = match SiftArgs::parse(&args) {
                Ok(p) => p,
                Err(e) => exit_with(e),
            };
            sift(parsed, threads)
        }
        Action::Score {
            file,
            target,
            threads,
            tuning,
            out,
        } => score(&file, target.into(), threads, &tuning, out.as_deref()),
        Action::Search {
            ports,
            beamsplitters,
            couplers,
            waveplates,
            target_file,
            target,
            workers,
            depth,
            tuning,
            out,
        } => search(
            ports,
            ElementCounts::new(beamsplitters, couplers, waveplates),
            &target_file,
            target.into(),
            workers,
            depth,
            &tuning,
            out.as_deref(),
        ),
        Action::Report => report(),
    }
}

fn exit_with(e: SiftArgsError) -> ! {
    tracing::error!(code = e.exit_code(), "{e}");
    std::process::exit(e.exit_code())
}

fn init_pool(threads: Option<usize>) -> Result<usize> {
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring the thread pool")?;
    }
    Ok(rayon::current_num_threads())
}

fn sift(args: SiftArgs, threads: Option<usize>) -> Result<()> {
    let threads = init_pool(threads)?;
    let nodes = args.node_count();
    let base = Template::empty(args.ports, args.counts)?;
    let depth = depth_for(args.ports, nodes, TEMPLATES_PER_THREAD * threads as u128);
    tracing::info!(
        ports = args.ports,
        counts = ?args.counts,
        threads,
        depth,
        templates = template_count(nodes, depth) as f64,
        "sift"
    );
    let templates = enumerate_templates(depth, &base);
    let counters = Counters::new(templates.len() as u64);
    let sink = EdgeSink::new(BufWriter::new(io::stdout()));
    let emit = |edges: &[usize]| sink.emit(edges);
    let passed = sift_exhaustive(&templates, &args.mask(), &emit, &counters);
    sink.finish().context("writing edges to stdout")?;
    tracing::info!(passed, counters = ?counters.snapshot(), "done");
    Ok(())
}

/// One writer shared by the pool threads. The first write error is kept and
/// surfaces from [`EdgeSink::finish`].
struct EdgeSink<W> {
    out: Mutex<W>,
    failed: Mutex<Option<io::Error>>,
}

impl<W: Write> EdgeSink<W> {
    fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            failed: Mutex::new(None),
        }
    }

    fn emit(&self, edges: &[usize]) {
        if let Err(e) = writeln!(self.out.lock(), "{}", format_edges(edges)) {
            self.failed.lock().get_or_insert(e);
        }
    }

    fn finish(self) -> io::Result<W> {
        if let Some(e) = self.failed.into_inner() {
            return Err(e);
        }
        let mut out = self.out.into_inner();
        out.flush()?;
        Ok(out)
    }
}

#[derive(Serialize)]
struct ScoreReport {
    best: Option<ScoredReport>,
    best_line: Option<usize>,
    lines: u64,
    sifted: u64,
    counters: CounterSnapshot,
}

fn score(
    file: &Path,
    kind: TargetKind,
    threads: Option<usize>,
    tuning: &Tuning,
    out: Option<&Path>,
) -> Result<()> {
    let threads = init_pool(threads)?;
    let cfg = tuning.resolve()?;
    let reading = || format!("reading {}", file.display());
    let total = read_batch(open(file)?)
        .and_then(|(_, _, lines)| lines.count_remaining())
        .with_context(reading)?;
    let (header, matrix, lines) = read_batch(open(file)?).with_context(reading)?;
    let target = Arc::new(Target::from_matrix(kind, matrix)?);
    let optimizer = GlobalLocal::new(cfg.optimizer.clone());
    let counters = Counters::new(total);
    let ctx = SearchContext {
        target: &target,
        cfg: &cfg,
        optimizer: &optimizer,
        observer: &counters,
    };
    tracing::info!(file = %file.display(), ports = header.ports, lines = total, threads, "score");
    let outcome = score_batch(lines, header, &ctx)
        .with_context(|| format!("scoring {}", file.display()))?;
    let report = ScoreReport {
        best: outcome.best.as_ref().map(|b| b.report()),
        best_line: outcome.best_line,
        lines: outcome.lines,
        sifted: outcome.sifted,
        counters: counters.snapshot(),
    };
    let prov = Provenance::new(
        "score",
        kind,
        &cfg,
        json!({ "input": file.to_string_lossy(), "threads": threads }),
    )
    .outcome(outcome.lines, outcome.best.as_ref().map(|b| b.deviation));
    emit_report(&report, out, &prov)
}

#[derive(Serialize)]
struct SearchReport {
    best: Option<ScoredReport>,
    best_reported: Option<f64>,
    templates: usize,
    workers: usize,
    counters: CounterSnapshot,
}

#[allow(clippy::too_many_arguments)]
fn search(
    ports: usize,
    counts: ElementCounts,
    target_file: &Path,
    kind: TargetKind,
    workers: usize,
    depth: Option<usize>,
    tuning: &Tuning,
    out: Option<&Path>,
) -> Result<()> {
    if workers == 0 {
        bail!("--workers must be at least 1");
    }
    let mut cfg = tuning.resolve()?;
    if let Some(d) = depth {
        cfg.template_depth = d;
    }
    let matrix = read_matrix(open(target_file)?, ports)
        .with_context(|| format!("reading target {}", target_file.display()))?;
    let target = Arc::new(Target::from_matrix(kind, matrix)?);
    let base = Template::empty(ports, counts)?;
    let templates = enumerate_templates(cfg.template_depth, &base);
    let optimizer = GlobalLocal::new(cfg.optimizer.clone());
    let counters = Counters::new(templates.len() as u64);
    let ctx = SearchContext {
        target: &target,
        cfg: &cfg,
        optimizer: &optimizer,
        observer: &counters,
    };
    let summary = run_local(&templates, workers, &ctx)?;
    let report = SearchReport {
        best: summary.best.as_ref().map(|b| b.report()),
        best_reported: summary.best_reported,
        templates: summary.templates,
        workers: summary.workers,
        counters: counters.snapshot(),
    };
    let prov = Provenance::new(
        "search",
        kind,
        &cfg,
        json!({
            "ports": ports,
            "counts": counts,
            "target_file": target_file.to_string_lossy(),
            "workers": workers,
        }),
    )
    .outcome(
        summary.templates as u64,
        summary.best.as_ref().map(|b| b.deviation),
    );
    emit_report(&report, out, &prov)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Print the report to stdout, or write it to `out` with a provenance sidecar.
fn emit_report<T: Serialize>(report: &T, out: Option<&Path>, prov: &Provenance<'_>) -> Result<()> {
    let body = serde_json::to_vec_pretty(report)?;
    match out {
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&body)?;
            writeln!(stdout)?;
        }
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
            }
            std::fs::write(path, &body).with_context(|| format!("writing {}", path.display()))?;
            let sidecar = write_sidecar(path, prov)?;
            tracing::info!(report = %path.display(), provenance = %sidecar.display(), "written");
        }
    }
    Ok(())
}

fn report() -> Result<()> {
    let obj = json!({
        "code_rev": provenance::code_rev(),
        "version": optigraph::VERSION,
        "defaults": SearchCfg::default(),
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn edge_sink_keeps_whole_lines_across_threads() {
        let sink = EdgeSink::new(Vec::new());
        thread::scope(|s| {
            for k in 0..4 {
                let sink = &sink;
                s.spawn(move || {
                    for _ in 0..25 {
                        sink.emit(&[k, 10, 0]);
                    }
                });
            }
        });
        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(text.lines().count(), 100);
        assert!(text.lines().all(|l| l.ends_with(" 10 0")));
    }

    #[test]
    fn edge_sink_reports_write_failure() {
        let sink = EdgeSink::new(Broken);
        sink.emit(&[1, 0]);
        sink.emit(&[0, 1]);
        let err = sink.finish().err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
