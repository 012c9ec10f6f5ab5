/*!
 * nodectl CLI - Command Line Interface
 */

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use nodectl::{
    cli_style::{print_error, print_warning},
    config::{FleetConfig, LogLevel},
    error::{NodectlError, Result, EXIT_PARTIAL, EXIT_SUCCESS},
    logging,
    node::{Node, Topology},
    ordering::sort_by_node,
    output::{render_nodes, render_rows, result_rows, sanitize_error, OutputMode, ResultRow},
    session::{CommandSession, Poll},
    signal::SignalSpec,
    transport::{CallArgs, HttpTransport, Transport},
    CallResult, NodeListProxy, NodeProxy, WorkerPool,
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Delay between polls that returned no output
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "nodectl")]
#[command(version, about = "Call remote operations across a fleet of nodes", long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short = 'C', long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Target node (repeatable)
    #[arg(short = 'n', long = "node", value_name = "NAME", global = true)]
    nodes: Vec<String>,

    /// Target cluster (repeatable)
    #[arg(short = 'c', long = "cluster", value_name = "NAME", global = true)]
    clusters: Vec<String>,

    /// Slice of the selected nodes: start[:stop[:step]], 1-based
    #[arg(short = 's', long = "slice", value_name = "SLICE", global = true)]
    slice: Option<String>,

    /// Exit 0 even when some nodes did not succeed
    #[arg(short = 'i', long = "ignore-partial", global = true)]
    ignore_partial: bool,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "table", global = true)]
    format: OutputMode,

    /// Print values as returned instead of humanized
    #[arg(long, global = true)]
    raw: bool,

    /// Log level (overrides config)
    #[arg(long = "log-level", value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stderr
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose diagnostics (debug level)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Number of concurrent workers (overrides config)
    #[arg(long, value_name = "N", global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selected nodes
    Nodes,

    /// Call a remote operation on every selected node
    Call {
        /// Operation name
        operation: String,

        /// Named argument; VALUE is parsed as JSON, falling back to a string
        #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE", value_parser = parse_named)]
        named: Vec<(String, Value)>,

        /// Positional argument; parsed like named values
        #[arg(short = 'p', long = "positional", value_name = "VALUE", value_parser = parse_value)]
        positional: Vec<Value>,
    },

    /// Run a command on every selected node and collect its output
    Command {
        /// Command and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,

        /// Text written to the command's stdin after it starts
        #[arg(long, value_name = "TEXT")]
        input: Option<String>,

        /// Signal to send, by number or name
        #[arg(long, value_name = "SIG")]
        signal: Option<String>,

        /// Seconds to wait before sending --signal
        #[arg(long, value_name = "SECS", default_value = "0", requires = "signal")]
        after: u64,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn parse_value(raw: &str) -> std::result::Result<Value, String> {
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

fn parse_named(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), parse_value(value)?))
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            print_error(&sanitize_error(&e.to_string()), suggestion(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn suggestion(error: &NodectlError) -> Option<&'static str> {
    match error {
        NodectlError::ConfigNotFound(_) => Some("Pass --config or set NODECTL_CONFIG"),
        NodectlError::UnknownNode(_) | NodectlError::UnknownCluster(_) => {
            Some("Run `nodectl nodes` to list known targets")
        }
        NodectlError::InvalidSlice(_) => Some("Slices are 1-based: 2, 2:5 or 1:10:2"),
        _ if error.is_usage_error() => Some("See `nodectl --help` for usage"),
        _ => None,
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "nodectl", &mut io::stdout());
        return Ok(EXIT_SUCCESS);
    }

    let mut config = FleetConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    if let Err(e) = logging::init_logging(&config, cli.verbose) {
        print_warning(&format!("Failed to initialize logging: {}", e));
    }

    let topology = Topology::from_config(&config)?;
    let targets = match topology.select(&cli.nodes, &cli.clusters, cli.slice.as_deref()) {
        Err(NodectlError::UnknownCluster(name)) => {
            print_warning(&format!("Known clusters: {}", topology.cluster_names().join(", ")));
            return Err(NodectlError::UnknownCluster(name));
        }
        selected => selected?,
    };

    match &cli.command {
        Commands::Nodes => {
            println!("{}", render_nodes(&targets, cli.format)?);
            Ok(EXIT_SUCCESS)
        }
        Commands::Call {
            operation,
            named,
            positional,
        } => {
            let args = positional
                .iter()
                .cloned()
                .fold(CallArgs::new(), |args, value| args.arg(value));
            let args = named
                .iter()
                .cloned()
                .fold(args, |args, (key, value)| args.named(key, value));

            let fanout = NodeListProxy::new(targets, transport(&config)?, pool(&config)?);
            let results = fanout.call_all(operation, &args)?;

            println!("{}", render_rows(&result_rows(&results, cli.raw), cli.format)?);
            Ok(partial_exit(&cli, results.is_partial()))
        }
        Commands::Command {
            argv,
            input,
            signal,
            after,
        } => {
            let signal = signal
                .as_deref()
                .map(|spec| SignalSpec::from(spec).resolve())
                .transpose()?
                .map(|number| (number, Duration::from_secs(*after)));
            let plan = CommandPlan {
                argv: argv.clone(),
                input: input.clone(),
                signal,
            };

            let transport = transport(&config)?;
            if targets.len() == 1 && cli.format == OutputMode::Table {
                run_streaming(&targets[0], transport, &plan)?;
                Ok(EXIT_SUCCESS)
            } else {
                let fanout = NodeListProxy::new(targets, transport, pool(&config)?);
                let rows = run_collected(&fanout, &plan, cli.raw);
                let partial = rows.iter().any(|row| row.status != 200);
                println!("{}", render_rows(&rows, cli.format)?);
                Ok(partial_exit(&cli, partial))
            }
        }
        Commands::Completions { .. } => Ok(EXIT_SUCCESS),
    }
}

fn transport(config: &FleetConfig) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(HttpTransport::from_config(config)?))
}

fn pool(config: &FleetConfig) -> Result<Arc<WorkerPool>> {
    Ok(Arc::new(WorkerPool::new(config.workers)?))
}

fn partial_exit(cli: &Cli, partial: bool) -> i32 {
    if partial && !cli.ignore_partial {
        print_warning("Partial results: some nodes did not succeed");
        EXIT_PARTIAL
    } else {
        EXIT_SUCCESS
    }
}

/// What to run on each node
struct CommandPlan {
    argv: Vec<String>,
    input: Option<String>,
    signal: Option<(i32, Duration)>,
}

/// Start, feed and drain one session, writing output to `sink` as it arrives
fn drive(session: &mut CommandSession, plan: &CommandPlan, sink: &mut dyn Write) -> Result<()> {
    if let Some(ref input) = plan.input {
        session.push(input.as_bytes())?;
    }

    let started = Instant::now();
    let mut pending = plan.signal;

    loop {
        if let Some((number, delay)) = pending {
            if started.elapsed() >= delay {
                session.signal(number)?;
                pending = None;
            }
        }

        match session.poll() {
            Poll::Chunk(bytes) if bytes.is_empty() => thread::sleep(POLL_INTERVAL),
            Poll::Chunk(bytes) => {
                sink.write_all(&bytes)?;
                sink.flush()?;
            }
            Poll::Terminated(_) => return Ok(()),
        }
    }
}

/// Drive a session; on failure the remote command is stopped before the error propagates
fn drive_or_stop(
    session: &mut CommandSession,
    plan: &CommandPlan,
    sink: &mut dyn Write,
) -> Result<()> {
    let outcome = drive(session, plan, sink);
    if outcome.is_err() {
        let stopped = session.stop();
        if !stopped.is_success() {
            print_warning(&format!(
                "{}: could not stop command {} (status {})",
                session.node().name,
                session.command_id(),
                stopped.status
            ));
        }
    }
    outcome
}

fn run_streaming(node: &Arc<Node>, transport: Arc<dyn Transport>, plan: &CommandPlan) -> Result<()> {
    let proxy = NodeProxy::new(node.clone(), transport);
    let mut session = CommandSession::start(proxy, &plan.argv)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    drive_or_stop(&mut session, plan, &mut out)
}

fn run_collected(fanout: &NodeListProxy, plan: &CommandPlan, raw: bool) -> Vec<ResultRow> {
    let batch = fanout.nodes().iter().map(|node| {
        let proxy = fanout.proxy(node);
        (node.clone(), move || -> Result<Vec<u8>> {
            let mut session = CommandSession::start(proxy, &plan.argv)?;
            let mut output = Vec::new();
            drive_or_stop(&mut session, plan, &mut output)?;
            Ok(output)
        })
    });
    let results: HashMap<Arc<Node>, Result<Vec<u8>>> = fanout.pool().dispatch_with(batch);

    sort_by_node(results)
        .into_iter()
        .map(|(node, outcome)| {
            let (status, payload) = match outcome {
                Ok(output) => {
                    let text = String::from_utf8_lossy(&output).into_owned();
                    (200, Some(Value::String(text)))
                }
                Err(NodectlError::CommandStart { status, .. }) => (status, None),
                Err(e) => {
                    print_warning(&format!("{}: {}", node.name, sanitize_error(&e.to_string())));
                    (0, None)
                }
            };
            ResultRow::new(&node, &CallResult::new(status, payload), raw)
        })
        .collect()
}
