use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use ordforge::cache::CacheDir;
use ordforge::color::{color_enabled_stderr, log_error_stderr, log_info_stderr};
use ordforge::environment;
use ordforge::errors::{exit_code_for_io_error, exit_code_for_stage_error};
use ordforge::inscribe::{self, InscribeOptions};
use ordforge::probe::env_override;
use ordforge::server;
use ordforge::stage;
use ordforge::util::{ExecRequest, ExecService};
use ordforge::{set_color_mode, ColorMode};

#[derive(Parser, Debug)]
#[command(
    name = "ordforge",
    version,
    about = "Stage files into a dockerized Bitcoin/ord node and assemble ord wallet inscribe commands."
)]
struct Cli {
    /// Colorize stderr output: auto|always|never
    #[arg(long, value_enum, global = true)]
    color: Option<ColorMode>,

    /// Print detailed execution info
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the HTTP API server for the browser front end
    Serve {
        /// Listen port (default 4420, ORDFORGE_PORT override)
        #[arg(long)]
        port: Option<u16>,
        /// Cache directory (default $TMPDIR/ordforge-cache)
        #[arg(long = "cache-dir")]
        cache_dir: Option<PathBuf>,
        /// Cache byte quota (default 512 MiB)
        #[arg(long = "cache-limit")]
        cache_limit: Option<u64>,
    },
    /// Run diagnostics against docker, the containers and the cache
    Doctor,
    /// One-shot flow: optimize, stage into the container and inscribe
    Inscribe {
        /// File to inscribe
        #[arg(long)]
        file: PathBuf,
        /// Fee rate in sat/vB
        #[arg(long = "fee-rate")]
        fee_rate: f64,
        /// Destination address for the inscription
        #[arg(long)]
        destination: Option<String>,
        /// Parent inscription id
        #[arg(long)]
        parent: Option<String>,
        /// Sat selector to inscribe on
        #[arg(long)]
        sat: Option<String>,
        /// Override the content type sent to ord
        #[arg(long = "content-type")]
        content_type: Option<String>,
        /// JSON metadata file inscribed alongside via --metadata
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Print the command without executing it
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Skip the large-raster WebP re-encode
        #[arg(long = "no-optimize")]
        no_optimize: bool,
    },
    /// Show cache directory usage
    CacheInfo,
    /// Delete every tracked file from the cache directory
    CacheClear,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        set_color_mode(mode);
    }

    match cli.command {
        Cmd::Serve {
            port,
            cache_dir,
            cache_limit,
        } => run_serve(port, cache_dir, cache_limit),
        Cmd::Doctor => {
            ordforge::doctor::run_doctor(cli.verbose);
            ExitCode::from(0)
        }
        Cmd::Inscribe {
            file,
            fee_rate,
            destination,
            parent,
            sat,
            content_type,
            metadata,
            dry_run,
            no_optimize,
        } => {
            let opts = InscribeOptions {
                fee_rate,
                destination,
                parent,
                sat,
                content_type,
                dry_run: false,
            };
            run_inscribe(&file, opts, metadata, dry_run, no_optimize, cli.verbose)
        }
        Cmd::CacheInfo => {
            let usage = CacheDir::from_env().usage();
            match serde_json::to_string_pretty(&usage) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    eprintln!("ordforge: {e}");
                    return ExitCode::from(1);
                }
            }
            ExitCode::from(0)
        }
        Cmd::CacheClear => {
            let cache = CacheDir::from_env();
            let removed = cache.clear();
            println!("ordforge: removed {removed} cached files from {}", cache.dir().display());
            ExitCode::from(0)
        }
    }
}

fn run_serve(port: Option<u16>, cache_dir: Option<PathBuf>, cache_limit: Option<u64>) -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let port = port
        .or_else(|| env_override("ORDFORGE_PORT").and_then(|v| v.parse().ok()))
        .unwrap_or(server::DEFAULT_PORT);

    let base = CacheDir::from_env();
    let cache = CacheDir::new(
        cache_dir.unwrap_or_else(|| base.dir().to_path_buf()),
        cache_limit.unwrap_or_else(|| base.limit_bytes()),
    );

    match server::serve(port, cache) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("ordforge: {e}");
            ExitCode::from(exit_code_for_io_error(&e))
        }
    }
}

fn run_inscribe(
    file: &PathBuf,
    opts: InscribeOptions,
    metadata: Option<PathBuf>,
    dry_run: bool,
    no_optimize: bool,
    verbose: bool,
) -> ExitCode {
    let use_err = color_enabled_stderr();

    if let Err(msg) = opts.validate() {
        log_error_stderr(use_err, &format!("ordforge: {msg}"));
        return ExitCode::from(1);
    }

    let bytes = match fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            log_error_stderr(use_err, &format!("ordforge: cannot read {}: {e}", file.display()));
            return ExitCode::from(exit_code_for_io_error(&e));
        }
    };
    let original_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    // Work on a cache copy so the user's file is never replaced.
    let cache = CacheDir::from_env();
    let stored = match cache.store_unique(&original_name, &bytes) {
        Ok(p) => p,
        Err(e) => {
            log_error_stderr(use_err, &format!("ordforge: {e}"));
            return ExitCode::from(exit_code_for_io_error(&e));
        }
    };

    let outcome = if no_optimize {
        stage::OptimizeOutcome {
            path: stored.clone(),
            optimized: false,
            original_size: bytes.len() as u64,
            final_size: bytes.len() as u64,
        }
    } else {
        stage::optimize_image(&stored, stage::optimize_threshold())
    };
    if verbose && outcome.optimized {
        log_info_stderr(
            use_err,
            &format!(
                "ordforge: re-encoded {} from {} to {} bytes",
                original_name, outcome.original_size, outcome.final_size
            ),
        );
    }

    let env = environment::detect();
    let data_dir = stage::container_data_dir();
    let staged_name = outcome
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(original_name);
    let container_file = format!("{}/{staged_name}", data_dir.trim_end_matches('/'));

    // Metadata sidecar, staged next to the payload.
    let metadata_container_path = match metadata {
        Some(meta_path) => {
            let meta_bytes = match fs::read(&meta_path) {
                Ok(b) => b,
                Err(e) => {
                    log_error_stderr(
                        use_err,
                        &format!("ordforge: cannot read metadata {}: {e}", meta_path.display()),
                    );
                    return ExitCode::from(exit_code_for_io_error(&e));
                }
            };
            if serde_json::from_slice::<serde_json::Value>(&meta_bytes).is_err() {
                log_error_stderr(use_err, "ordforge: metadata file is not valid JSON");
                return ExitCode::from(1);
            }
            let stem = staged_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(&staged_name);
            let stored_meta = match cache.store_unique(&format!("{stem}.metadata.json"), &meta_bytes)
            {
                Ok(p) => p,
                Err(e) => {
                    log_error_stderr(use_err, &format!("ordforge: {e}"));
                    return ExitCode::from(exit_code_for_io_error(&e));
                }
            };
            Some((
                stored_meta.clone(),
                format!(
                    "{}/{}",
                    data_dir.trim_end_matches('/'),
                    stored_meta
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                ),
            ))
        }
        None => None,
    };

    let argv = inscribe::inscribe_argv(
        &env.ord_container.value,
        &container_file,
        &opts,
        metadata_container_path.as_ref().map(|(_, c)| c.as_str()),
    );
    let command = inscribe::render_command(&argv);

    if dry_run {
        if verbose {
            log_info_stderr(use_err, "ordforge: dry-run requested; not staging or executing.");
        }
        println!("{command}");
        return ExitCode::from(0);
    }

    let alternatives = stage::alternative_containers(&env.ord_container.value);
    let staged = match stage::stage_file(
        &env.ord_container.value,
        &alternatives,
        &outcome.path,
        &data_dir,
        true,
    ) {
        Ok(s) => s,
        Err(e) => {
            log_error_stderr(use_err, &format!("ordforge: {e}"));
            return ExitCode::from(exit_code_for_stage_error(&e));
        }
    };
    if let Some((meta_local, _)) = &metadata_container_path {
        if let Err(e) =
            stage::stage_file(&staged.container, &alternatives, meta_local, &data_dir, false)
        {
            log_error_stderr(use_err, &format!("ordforge: {e}"));
            return ExitCode::from(exit_code_for_stage_error(&e));
        }
    }

    if verbose {
        log_info_stderr(use_err, &format!("ordforge: docker: {command}"));
    }

    let (program, rest) = match argv.split_first() {
        Some(v) => v,
        None => return ExitCode::from(1),
    };
    let out = match ExecService::new(Duration::from_secs(180)).run(
        ExecRequest::new(program).args(rest.iter().map(String::as_str)),
    ) {
        Ok(o) => o,
        Err(e) => {
            log_error_stderr(use_err, &format!("ordforge: {e}"));
            return ExitCode::from(1);
        }
    };
    if !out.success() {
        log_error_stderr(use_err, &format!("ordforge: inscribe failed:\n{}", out.combined()));
        return ExitCode::from(1);
    }

    let parsed = inscribe::parse_inscribe_output(&out.stdout);
    println!("txid: {}", parsed.txid);
    println!("inscription: {}", parsed.inscription_id);
    if let Some(fees) = parsed.fee_paid {
        println!("fees paid: {fees} sats");
    }
    if verbose {
        println!("{}", out.stdout.trim_end());
    }
    ExitCode::from(0)
}
