//! Keeps a model repository in sync with a folder and reports each change.
//!
//! Every successful reload prints one JSON line on stdout with the snapshot
//! generation, the known model ids, and the selector's allowed values. Stdin
//! drives the engine: `reload` forces a reload, `root <dir>` switches the
//! models root, `quit` (or EOF) stops the engine and waits for it to exit.

use anyhow::{Context, Result, anyhow, bail};
use dtdl_modelrepo::{FsDocumentSource, RepositorySync, Settings, init_logging, model_selector};
use serde_json::json;
use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_env()?;
    if let Some(root) = args.root {
        settings.models_root = Some(root);
    }
    let config = settings.sync_config()?;

    let mut sync = RepositorySync::new(Arc::new(FsDocumentSource), config);
    let changes = sync.subscribe();
    let handle = sync.spawn().context("starting repository sync thread")?;

    let repository = handle.repository().clone();
    let printer = thread::spawn(move || {
        // Each line describes the pinned snapshot, which may already be newer
        // than the notification that woke us.
        for _change in changes {
            let snapshot = repository.current();
            let line = json!({
                "generation": snapshot.generation(),
                "models": snapshot.identifiers(),
                "allowed_values": model_selector(&snapshot).allowed_values,
            });
            println!("{line}");
        }
    });

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        match line.split_once(' ') {
            _ if line.is_empty() => {}
            None if line == "quit" => break,
            None if line == "reload" => {
                handle.reload_now();
            }
            Some(("root", dir)) if !dir.trim().is_empty() => {
                handle.retarget(PathBuf::from(dir.trim()));
            }
            _ => eprintln!("unknown command: {line} (expected reload | root <dir> | quit)"),
        }
    }

    handle
        .stop()
        .map_err(|_| anyhow!("repository sync thread panicked"))?;
    printer
        .join()
        .map_err(|_| anyhow!("notification printer panicked"))?;
    Ok(())
}

struct CliArgs {
    root: Option<PathBuf>,
    settings: Option<PathBuf>,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args_os().skip(1);
        let mut root = None;
        let mut settings = None;

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--root" => root = Some(PathBuf::from(next_value(&mut args, "--root")?)),
                "--settings" => settings = Some(PathBuf::from(next_value(&mut args, "--settings")?)),
                "--help" | "-h" => {
                    print!("{}", usage());
                    std::process::exit(0);
                }
                other => bail!("unknown flag: {other}"),
            }
        }

        Ok(CliArgs { root, settings })
    }
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String> {
    args.next()
        .map(|os| {
            os.into_string()
                .map_err(|_| anyhow!("value for {flag} is not valid UTF-8"))
        })
        .transpose()?
        .ok_or_else(|| anyhow!("missing value for {flag}"))
}

fn usage() -> &'static str {
    "Usage: dtdl-watch [--root DIR] [--settings FILE]\n\
Polls the models folder and prints one JSON line per published repository snapshot.\n\
Stdin commands: reload | root <dir> | quit\n"
}
