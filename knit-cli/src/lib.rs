//! The `knit` command line interface.

use std::borrow::Cow;
use std::io::Write;
use std::path::PathBuf;

use ansi_term::{Colour, Style};
use clap::{Parser, Subcommand};
use knit_cfg::ConfigSet;
use knit_core::{ResolvedConfig, Workspace};

#[derive(Debug, Parser)]
#[command(name = "knit", about = "Resolve the settings of every unit in a build workspace.")]
pub struct Cli {
    /// Root directory of the workspace.
    #[arg(long, short = 'w', default_value = ".")]
    pub workspace: PathBuf,
    /// Override a config of `knit` itself, e.g. `-c log_overrides=true`.
    #[arg(long = "config", short = 'c', value_name = "NAME=VALUE")]
    pub configs: Vec<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the resolved settings of a unit, or of every unit.
    Resolve {
        unit: Option<String>,
        /// Also print which bundle every value came from.
        #[arg(long)]
        origins: bool,
    },
    /// Explain where the value of a single setting came from.
    Inspect { unit: String, key: String },
    /// List every unit, dependencies first, along with its capabilities.
    Units,
    /// Print the capability requirement tree.
    Capabilities,
    /// Print the configs of `knit` itself.
    Configs,
}

/// Whether our output gets ANSI color codes.
///
/// See: <https://no-color.org/>.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    ansi: bool,
}

impl Palette {
    pub fn from_env() -> Self {
        let ansi = !knit_ore::env::is_truthy("NO_COLOR");
        Palette { ansi }
    }

    pub fn plain() -> Self {
        Palette { ansi: false }
    }

    pub fn ansi(&self) -> bool {
        self.ansi
    }

    fn paint<'a>(&self, style: Style, text: &'a str) -> Cow<'a, str> {
        if self.ansi {
            Cow::Owned(style.paint(text).to_string())
        } else {
            Cow::Borrowed(text)
        }
    }

    fn dimmed<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.paint(Style::new().dimmed(), text)
    }

    fn heading<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.paint(Colour::Green.bold(), text)
    }
}

/// Build the [`ConfigSet`] for `knit`, applying `name=value` overrides.
pub fn configs_from(overrides: &[String]) -> Result<ConfigSet, anyhow::Error> {
    let mut builder = ConfigSet::builder();
    knit_core::cfgs::all_cfgs(&mut builder);
    for pair in overrides {
        builder.try_set_pair(pair)?;
    }
    Ok(builder.build())
}

/// Run `cli`, writing all output to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W, palette: &Palette) -> Result<(), anyhow::Error> {
    let configs = configs_from(&cli.configs)?;
    tracing::debug!(command = ?cli.command, workspace = ?cli.workspace, "running");
    if let Command::Configs = cli.command {
        write!(out, "{configs}")?;
        return Ok(());
    }

    let workspace = knit_core::load::load_workspace(&cli.workspace, &configs)?;
    match &cli.command {
        Command::Resolve { unit, origins } => {
            let resolved = match unit {
                Some(unit) => vec![workspace.resolve(unit)?],
                None => workspace.resolve_all(),
            };
            for config in &resolved {
                render_resolved(out, config, *origins, palette)?;
            }
        }
        Command::Inspect { unit, key } => {
            let config = workspace.resolve(unit)?;
            render_inspect(out, &config, key, palette)?;
        }
        Command::Units => render_units(out, &workspace, palette)?,
        Command::Capabilities => write!(out, "{}", workspace.capabilities().pretty())?,
        Command::Configs => unreachable!("handled above"),
    }

    Ok(())
}

pub fn render_resolved<W: Write>(
    out: &mut W,
    config: &ResolvedConfig,
    origins: bool,
    palette: &Palette,
) -> Result<(), anyhow::Error> {
    writeln!(out, "{}", palette.heading(config.unit()))?;
    for (key, entry) in config.entries() {
        write!(out, "  {key} = {}", entry.value())?;
        if origins {
            let origin = entry.origin().to_string();
            write!(out, "  {}", palette.dimmed(&origin))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn render_inspect<W: Write>(
    out: &mut W,
    config: &ResolvedConfig,
    key: &str,
    palette: &Palette,
) -> Result<(), anyhow::Error> {
    let Some(entry) = config.entry(key) else {
        anyhow::bail!("unit '{}' has no setting '{key}'", config.unit());
    };

    writeln!(out, "{} {key} = {}", palette.heading(config.unit()), entry.value())?;
    writeln!(out, "  set by {}", entry.origin())?;
    if !entry.overridden().is_empty() {
        writeln!(out, "  overrides:")?;
        for (origin, value) in entry.overridden().iter().rev() {
            let origin = origin.to_string();
            writeln!(out, "    {value}  {}", palette.dimmed(&origin))?;
        }
    }

    let capabilities: Vec<_> = config.enabled_capabilities().collect();
    if !capabilities.is_empty() {
        writeln!(out, "  capabilities: {}", capabilities.join(", "))?;
    }
    let applied: Vec<_> = config.applied().iter().map(|origin| origin.name()).collect();
    writeln!(out, "  bundles: {}", applied.join(", "))?;

    Ok(())
}

pub fn render_units<W: Write>(
    out: &mut W,
    workspace: &Workspace,
    palette: &Palette,
) -> Result<(), anyhow::Error> {
    let graph = workspace.capabilities();
    for name in workspace.unit_order() {
        write!(out, "{}", palette.heading(name))?;

        let enabled = workspace.enabled_capabilities(name)?;
        if !enabled.is_empty() {
            let names: Vec<_> = graph.names(enabled).collect();
            write!(out, " [{}]", names.join(", "))?;
        }

        if let Some(unit) = workspace.unit(name) {
            if !unit.depends_on().is_empty() {
                let deps: Vec<_> = unit.depends_on().iter().map(|dep| dep.as_str()).collect();
                let deps = format!("depends on {}", deps.join(", "));
                write!(out, " {}", palette.dimmed(&deps))?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
