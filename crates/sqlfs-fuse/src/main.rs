//! Mount a database-backed filesystem.
//!
//! Usage:
//!   sqlfs --db=<path> [options] <mountpoint>

use std::path::PathBuf;
use std::process::ExitCode;

use fuser::MountOption;
use sqlfs_core::SqlFs;
use sqlfs_fuse::SqlFuse;
use tracing_subscriber::EnvFilter;

/// Parsed command line arguments.
struct Args {
    db_path: PathBuf,
    mountpoint: PathBuf,
    allow_other: bool,
    auto_unmount: bool,
}

fn print_usage(progname: &str) {
    println!("usage: {progname} --db=<path> [options] <mountpoint>\n");
    println!("options:");
    println!("    --db=<path>          path to the backing database file");
    println!("    --allow-other        allow other users to access the mount");
    println!("    --no-auto-unmount    keep the mount on process exit");
    println!("    -h, --help           print this help text");
}

/// Parse the argument vector (without the program name).
fn parse_args(argv: &[String]) -> Result<Args, String> {
    let mut db_path: Option<PathBuf> = None;
    let mut mountpoint: Option<PathBuf> = None;
    let mut allow_other: bool = false;
    let mut auto_unmount: bool = true;

    let mut i: usize = 0;
    while i < argv.len() {
        let arg: &str = &argv[i];
        if let Some(value) = arg.strip_prefix("--db=") {
            db_path = Some(PathBuf::from(value));
        } else if arg == "--db" {
            i += 1;
            let value: &String = argv.get(i).ok_or("--db requires a value")?;
            db_path = Some(PathBuf::from(value));
        } else if arg == "--allow-other" {
            allow_other = true;
        } else if arg == "--no-auto-unmount" {
            auto_unmount = false;
        } else if arg == "-h" || arg == "--help" {
            return Err(String::new());
        } else if arg.starts_with('-') {
            return Err(format!("unknown option: {arg}"));
        } else if mountpoint.is_none() {
            mountpoint = Some(PathBuf::from(arg));
        } else {
            return Err(format!("unexpected argument: {arg}"));
        }
        i += 1;
    }

    Ok(Args {
        db_path: db_path.ok_or("--db is required")?,
        mountpoint: mountpoint.ok_or("a mountpoint is required")?,
        allow_other,
        auto_unmount,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let argv: Vec<String> = std::env::args().collect();
    let progname: &str = argv.first().map(String::as_str).unwrap_or("sqlfs");

    let args: Args = match parse_args(&argv[1..]) {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{progname}: {message}\n");
            }
            print_usage(progname);
            return if message.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    let fs: SqlFs = match SqlFs::open(&args.db_path) {
        Ok(fs) => fs,
        Err(err) => {
            tracing::error!(db = %args.db_path.display(), error = %err, "cannot open database");
            return ExitCode::FAILURE;
        }
    };

    let mut options: Vec<MountOption> = Vec::new();
    if args.allow_other {
        options.push(MountOption::AllowOther);
    }
    if args.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }

    tracing::info!(
        db = %args.db_path.display(),
        mountpoint = %args.mountpoint.display(),
        "mounting"
    );
    match sqlfs_fuse::mount(SqlFuse::new(fs), &args.mountpoint, &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "mount failed");
            ExitCode::FAILURE
        }
    }
}
