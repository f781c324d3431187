//!
//! repogallery operator CLI
//! ------------------------
//! Saves connection settings, uploads media, lists galleries and publishes the
//! about text. Any action can be interrupted with Ctrl-C.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use repogallery::cli::{parse_args, table, CliContext, Command};
use repogallery::config::GalleryConfig;
use repogallery::settings::{default_settings_path, FileKv, SettingsStore};
use repogallery::store::GithubApi;
use repogallery::upload::LargeFileNotice;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--settings <path>] <command>\n\nCommands:\n  settings show                              show stored connection settings\n  settings save [--owner <o>] [--repo <r>] [--branch <b>] [--token <t>]\n                                             store the given fields, keep the rest\n  settings clear                             remove stored connection settings\n  upload <all|toonboom> <file> [--desc <text>] [--yes]\n                                             upload a file with an optional description\n  list [all|toonboom]                        list gallery items\n  about show                                 print the about text\n  about publish <text> | --file <path>       publish the about text\n\nFlags:\n  --settings <path>        Settings file (default: $REPOGALLERY_SETTINGS or ~/.repogallery/settings.json)\n  -h, --help               Show this help\n\nEnvironment:\n  REPOGALLERY_PUBLIC_OWNER / _REPO / _BRANCH   defaults for unset settings\n  REPOGALLERY_TIMEOUT_MS                       per-request deadline (default 30000)\n  RUST_LOG                                     log filter (logs go to stderr)"
    );
}

fn prompt_large_file(notice: &LargeFileNotice) -> bool {
    let mb = notice.size as f64 / (1024.0 * 1024.0);
    eprint!("'{}' is {:.1} MiB. Upload anyway? [y/N] ", notice.name, mb);
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let invocation = match parse_args(&args) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{}", e.message());
            print_usage(&program);
            std::process::exit(e.exit_code());
        }
    };
    if invocation.command == Command::Help {
        print_usage(&program);
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let settings_path = invocation
        .settings_path
        .or_else(|| env::var("REPOGALLERY_SETTINGS").ok().map(PathBuf::from))
        .unwrap_or_else(default_settings_path);
    let config = GalleryConfig::from_env();
    let api = GithubApi::new(&config.api_base)
        .and_then(|api| api.with_raw_host(&config.raw_host))
        .with_context(|| format!("invalid content API base '{}' or raw host '{}'", config.api_base, config.raw_host))?;
    let ctx = CliContext {
        api,
        settings: Arc::new(SettingsStore::new(FileKv::open(settings_path))),
        config,
        width: table::terminal_width(),
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let result = rt.block_on(async {
        let mut stdout = io::stdout();
        let mut confirm = prompt_large_file;
        tokio::select! {
            res = ctx.execute(invocation.command, &mut stdout, &mut confirm) => Some(res),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    match result {
        Some(Ok(())) => Ok(()),
        Some(Err(err)) => {
            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
        None => {
            eprintln!("Cancelled");
            std::process::exit(130);
        }
    }
}
