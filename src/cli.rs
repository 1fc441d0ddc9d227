//! Minimal CLI parsing.

use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

use crate::transform::BindingStrategy;

pub const USAGE: &str = "usage:
  count-transformer transform <schema.graphql> [--out DIR] [--strategy relationship|index]
  count-transformer scan-request < event.json
  count-transformer count < event.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Transform an annotated schema and write the schema and infrastructure plan.
    Transform {
        schema: PathBuf,
        out_dir: PathBuf,
        strategy: Option<BindingStrategy>,
    },
    /// Read a count event from stdin and print the first-page scan request.
    ScanRequest,
    /// Read a count event from stdin and answer it against DynamoDB.
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub command: Command,
}

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            Some("transform") => parse_transform(args)?,
            Some("scan-request") => no_arguments(args, Command::ScanRequest)?,
            Some("count") => no_arguments(args, Command::Count)?,
            Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
            None => bail!("{USAGE}"),
        };
        Ok(Self { command })
    }
}

fn parse_transform(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let mut schema = None;
    let mut out_dir = PathBuf::from(".");
    let mut strategy = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => {
                let value = args.next().ok_or_else(|| anyhow!("--out needs a directory"))?;
                out_dir = PathBuf::from(value);
            }
            "--strategy" => {
                let value = args.next().ok_or_else(|| anyhow!("--strategy needs a value"))?;
                strategy = Some(parse_strategy(&value)?);
            }
            _ if arg.starts_with("--out=") => {
                if let Some((_, value)) = arg.split_once('=') {
                    out_dir = PathBuf::from(value);
                }
            }
            _ if arg.starts_with("--strategy=") => {
                if let Some((_, value)) = arg.split_once('=') {
                    strategy = Some(parse_strategy(value)?);
                }
            }
            _ if arg.starts_with("--") => bail!("unknown option '{arg}'\n{USAGE}"),
            _ if schema.is_none() => schema = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument '{arg}'\n{USAGE}"),
        }
    }

    let schema = schema.ok_or_else(|| anyhow!("missing schema path\n{USAGE}"))?;
    Ok(Command::Transform {
        schema,
        out_dir,
        strategy,
    })
}

fn no_arguments(mut args: impl Iterator<Item = String>, command: Command) -> Result<Command> {
    if let Some(extra) = args.next() {
        bail!("unexpected argument '{extra}'\n{USAGE}");
    }
    Ok(command)
}

fn parse_strategy(value: &str) -> Result<BindingStrategy> {
    value.parse::<BindingStrategy>().map_err(anyhow::Error::msg)
}
