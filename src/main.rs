use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zipcharset::config::Config;
use zipcharset::job::{self, Decoding, JobOptions, JobOutcome};
use zipcharset::{classify, lint, ArchiveReader, Charset, CompressionProfile, Method};

#[derive(Parser)]
#[command(name = "zipcharset", version, about = "Rewrite zip archives with legacy-encoded names as UTF-8")]
struct Cli {
    /// Verbose logging (overrides RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,
    /// Config file (default: ~/.config/zipcharset/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether every name decodes under one charset; prints true/false
    Lint {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Charset to check against
        #[arg(short, long, default_value = "utf-8")]
        encoding: Charset,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Find the first candidate charset under which each archive is clean
    Detect {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Comma-separated trial order (default from config: utf-8,shift-jis,gbk)
        #[arg(long, value_delimiter = ',')]
        candidates: Vec<Charset>,
        /// One JSON object per line instead of a table
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// List members as decoded under a charset
    List {
        file: PathBuf,
        #[arg(short, long, default_value = "utf-8")]
        encoding: Charset,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Rewrite archives with UTF-8 names
    Convert(ConvertArgs),
}

#[derive(Args)]
struct ConvertArgs {
    #[arg(required = true, num_args = 1..)]
    files: Vec<PathBuf>,
    /// Source charset, or "auto" to detect (default from config: shift-jis)
    #[arg(short, long)]
    decoding: Option<Decoding>,
    /// Output path (single input only)
    #[arg(short, long, conflicts_with = "overwrite")]
    output: Option<PathBuf>,
    /// Rewrite in place, keeping a backup copy
    #[arg(short = 'O', long)]
    overwrite: bool,
    /// No backup; replace an existing output
    #[arg(long)]
    force: bool,
    /// Recompress with deflate level 5 instead of the source's method
    #[arg(long, conflicts_with = "method")]
    force_deflated: bool,
    /// Recompress with this method: stored, deflated, bzip2, zstd
    #[arg(long)]
    method: Option<Method>,
    /// Level for --method
    #[arg(long, requires = "method")]
    level: Option<i64>,
    /// Parent directory for staging areas
    #[arg(long)]
    tmpdir: Option<PathBuf>,
    #[arg(short, long)]
    password: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    let config = Config::load_or_default(cli.config.as_deref())?;

    let ok = match cli.command {

        // ── Lint ─────────────────────────────────────────────────────────────
        Commands::Lint { files, encoding, password } => {
            let mut ok = true;
            for path in &files {
                match lint(path, encoding, password_bytes(&password)) {
                    Ok(valid) => println!("{}", labelled(&files, path, valid)),
                    Err(e) => {
                        eprintln!("{}: {e}", path.display());
                        ok = false;
                    }
                }
            }
            ok
        }

        // ── Detect ───────────────────────────────────────────────────────────
        Commands::Detect { files, candidates, json, password } => {
            let candidates = if candidates.is_empty() { config.candidates.clone() } else { candidates };
            let mut ok = true;
            for path in &files {
                let status = classify(path, &candidates, password_bytes(&password));
                ok &= !matches!(status, zipcharset::ArchiveStatus::Broken { .. });
                if json {
                    let line = serde_json::json!({ "path": path, "result": status });
                    println!("{line}");
                } else {
                    let detail = match &status {
                        zipcharset::ArchiveStatus::Legacy { charset } => charset.to_string(),
                        zipcharset::ArchiveStatus::Broken { reason }  => reason.clone(),
                        _                                              => String::new(),
                    };
                    println!("{:<11} {:<10} {}", status.label(), detail, path.display());
                }
            }
            ok
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { file, encoding, password } => {
            let reader = ArchiveReader::open(&file, encoding, password_bytes(&password))?;
            println!("Archive: {} ({})", file.display(), reader.charset());
            println!("{:<4} {:>12} {:>12}  {:<12} Name", "Kind", "Size", "Compressed", "Profile");
            for entry in reader.list_entries() {
                let kind = if entry.is_dir() { "dir" } else { "file" };
                let lock = if entry.encrypted { " [encrypted]" } else { "" };
                println!("{:<4} {:>12} {:>12}  {:<12} {}{}",
                    kind, entry.uncompressed_size, entry.compressed_size,
                    entry.profile.to_string(), entry.path, lock);
            }
            println!("Dominant profile: {}", reader.dominant_compression_profile());
            true
        }

        // ── Convert ──────────────────────────────────────────────────────────
        Commands::Convert(args) => {
            if args.output.is_some() && args.files.len() > 1 {
                return Err("--output accepts a single input file".into());
            }
            let opts = JobOptions {
                decoding:      args.decoding.unwrap_or(config.decoding),
                candidates:    config.candidates.clone(),
                password:      args.password.map(String::into_bytes),
                force_profile: force_profile(args.force_deflated, args.method, args.level)
                    .or(config.force_profile),
                output:        args.output,
                in_place:      args.overwrite,
                force:         args.force,
                backup_dir:    config.backup_dir.clone(),
                tmpdir:        args.tmpdir,
            };
            let mut ok = true;
            for (source, result) in args.files.iter().zip(job::convert_all(&args.files, &opts)) {
                match result {
                    Ok(JobOutcome::Converted { output, decoding, report, backup }) => {
                        println!("  converted  {} ({decoding}) → {}  [{} dirs, {} files, {}]",
                            source.display(), output.display(),
                            report.directories, report.files, report.profile);
                        if let Some(backup) = backup {
                            println!("  backup     {}", backup.display());
                        }
                    }
                    Ok(JobOutcome::AlreadyUtf8) => {
                        println!("  skipped    {} (already UTF-8)", source.display());
                    }
                    Err(e) => {
                        eprintln!("  failed     {}: {e}", source.display());
                        ok = false;
                    }
                }
            }
            ok
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn password_bytes(password: &Option<String>) -> Option<&[u8]> {
    password.as_deref().map(str::as_bytes)
}

/// Bare `true`/`false` for one file, prefixed with the path for several.
fn labelled(files: &[PathBuf], path: &Path, valid: bool) -> String {
    if files.len() == 1 {
        valid.to_string()
    } else {
        format!("{}\t{valid}", path.display())
    }
}

fn force_profile(force_deflated: bool, method: Option<Method>, level: Option<i64>) -> Option<CompressionProfile> {
    if force_deflated {
        return Some(CompressionProfile::FORCED_DEFLATE);
    }
    method.map(|m| CompressionProfile::new(m, level))
}
