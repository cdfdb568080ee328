//! One-shot resolver for a folder of DTDL interface documents.
//!
//! Loads every tracked document under the models root, resolves all
//! interfaces, and prints either one resolved model (`--model`) or the whole
//! repository as pretty JSON on stdout. Per-document and per-model failures
//! are logged to stderr; the exit status is non-zero only when the folder
//! cannot be read or the requested model did not resolve.

use anyhow::{Context, Result, anyhow, bail};
use dtdl_modelrepo::{
    FsDocumentSource, ModelId, ModelRepository, Settings, attribute_descriptors, init_logging,
    model_selector,
};
use serde_json::{Value, json};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    let settings = args.settings()?;
    let config = settings.sync_config()?;

    let repository =
        ModelRepository::load_dir(&FsDocumentSource, &config.root, config.extension.as_deref())
            .with_context(|| format!("loading models from {}", config.root.display()))?;

    let output = match &args.model {
        Some(id) => {
            let model = repository.get(id).ok_or_else(|| match repository.failures().get(id) {
                Some(err) => anyhow!("model {id} failed to resolve: {err}"),
                None => anyhow!("model {id} not found under {}", config.root.display()),
            })?;
            if args.attributes {
                serde_json::to_value(attribute_descriptors(model))?
            } else {
                serde_json::to_value(model)?
            }
        }
        None => {
            let models: serde_json::Map<String, Value> = repository
                .iter()
                .map(|(id, model)| -> Result<(String, Value)> {
                    Ok((id.0.clone(), serde_json::to_value(model)?))
                })
                .collect::<Result<_>>()?;
            let failures: serde_json::Map<String, Value> = repository
                .failures()
                .iter()
                .map(|(id, err)| (id.0.clone(), Value::String(err.to_string())))
                .collect();
            json!({
                "models": models,
                "failures": failures,
                "selector": model_selector(&repository),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

struct CliArgs {
    root: Option<PathBuf>,
    settings: Option<PathBuf>,
    model: Option<ModelId>,
    attributes: bool,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args_os().skip(1);
        let mut root = None;
        let mut settings = None;
        let mut model = None;
        let mut attributes = false;

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--settings" => settings = Some(PathBuf::from(next_value(&mut args, "--settings")?)),
                "--model" => model = Some(ModelId(next_value(&mut args, "--model")?)),
                "--attributes" => attributes = true,
                "--help" | "-h" => {
                    print!("{}", usage());
                    std::process::exit(0);
                }
                other if other.starts_with('-') => bail!("unknown flag: {other}"),
                other => {
                    if root.is_some() {
                        bail!("only one models directory may be given");
                    }
                    root = Some(PathBuf::from(other));
                }
            }
        }

        if attributes && model.is_none() {
            bail!("--attributes requires --model");
        }

        Ok(CliArgs {
            root,
            settings,
            model,
            attributes,
        })
    }

    /// Settings file (if any), then environment, then the positional root.
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        settings.apply_env()?;
        if let Some(root) = &self.root {
            settings.models_root = Some(root.clone());
        }
        Ok(settings)
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
    "Usage: dtdl-resolve [MODELS_DIR] [--settings FILE] [--model ID [--attributes]]\n\
Resolves every interface under MODELS_DIR (or DTDL_MODELS_ROOT) and prints the flattened models as JSON.\n\
With --model, prints one resolved model; --attributes prints its host attribute descriptors instead.\n"
}
