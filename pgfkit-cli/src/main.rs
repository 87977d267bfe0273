//! `pgfkit` CLI: render JSON scenes to PGF or PDF, and measure text with TeX.

mod scene_file;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use pgfkit_graphics::units::fmt_scalar;
use pgfkit_graphics::{Points, TexPoints};
use pgfkit_oracle::{MetricsOracle, SystemTex};
use pgfkit_pgf::Renderer;
use pgfkit_tex::{
    FontDescriptor, FontFamily, FontStyle, FontTranslator, FontWeight, SystemFonts, TexConfig,
    TexSystem, texify,
};

use crate::scene_file::FileScene;

#[derive(Parser)]
#[command(version, about = "Render vector scenes as PGF pictures for LaTeX")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a JSON scene file to a .pgf fragment or a .pdf
    Render {
        /// Scene file to render
        scene: PathBuf,

        /// Output file; the extension selects the format
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        tex: TexArgs,
    },
    /// Print the width, height and descent of TEXT in TeX points
    Measure {
        text: String,

        /// Font family: serif, sans-serif, monospace or an installed family name
        #[arg(long, default_value = "sans-serif")]
        family: String,

        /// Font size in points
        #[arg(long, default_value_t = 10.0)]
        size: f64,

        #[arg(long, default_value = "normal", value_parser = parse_style)]
        style: FontStyle,

        /// Font weight: a name such as `bold` or a number from 1 to 1000
        #[arg(long, default_value = "normal", value_parser = parse_weight)]
        weight: FontWeight,

        #[command(flatten)]
        tex: TexArgs,
    },
}

/// TeX options shared by every command. Flags override the config file.
#[derive(Args)]
struct TexArgs {
    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// TeX engine: xelatex, lualatex or pdflatex
    #[arg(long, value_parser = parse_texsystem)]
    texsystem: Option<TexSystem>,

    /// Extra preamble line (repeatable)
    #[arg(long = "preamble", value_name = "LINE")]
    preamble: Vec<String>,

    /// Do not derive document fonts from the configured families
    #[arg(long)]
    no_rcfonts: bool,

    /// Typeset inline math in text style
    #[arg(long)]
    no_display_math: bool,

    /// Log debug output and TeX traffic
    #[arg(long)]
    debug: bool,
}

fn parse_texsystem(s: &str) -> Result<TexSystem, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_style(s: &str) -> Result<FontStyle, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_weight(s: &str) -> Result<FontWeight, String> {
    s.parse().map_err(|e| format!("{e}"))
}

impl TexArgs {
    /// The config file, if any, with the flags applied on top.
    fn load(&self) -> anyhow::Result<TexConfig> {
        let mut config = match &self.config {
            Some(path) => TexConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => TexConfig::default(),
        };
        if let Some(texsystem) = self.texsystem {
            config.texsystem = texsystem;
        }
        config.preamble.extend(self.preamble.iter().cloned());
        if self.no_rcfonts {
            config.rcfonts = false;
        }
        if self.no_display_math {
            config.display_math = false;
        }
        config.debug |= self.debug;
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Render { scene, output, tex } => {
            let config = tex.load()?;
            init_logging(config.debug);
            render(&scene, &output, config)
        }
        Command::Measure {
            text,
            family,
            size,
            style,
            weight,
            tex,
        } => {
            let config = tex.load()?;
            init_logging(config.debug);
            let font = FontDescriptor::new(FontFamily::from(family.as_str()), Points(size))
                .with_style(style)
                .with_weight(weight);
            measure(&text, &font, &config)
        }
    }
}

fn render(scene: &Path, output: &Path, config: TexConfig) -> anyhow::Result<()> {
    let scene = FileScene::load(scene)?;
    log::debug!("loaded {} draw calls", scene.draw_count());
    Renderer::new(config)
        .save(&scene, output)
        .with_context(|| format!("rendering {}", output.display()))?;
    eprintln!("Wrote {}", output.display());
    Ok(())
}

fn measure(text: &str, font: &FontDescriptor, config: &TexConfig) -> anyhow::Result<()> {
    let translator = FontTranslator::new(Arc::new(SystemFonts::load()), config.texsystem);
    let engine = SystemTex::new(config.texsystem);
    let mut oracle = MetricsOracle::start(config, translator, &engine)?;
    let metrics = oracle.measure(&texify(text, config.display_math), font);
    oracle.terminate();
    let metrics = metrics.with_context(|| format!("measuring {text:?}"))?;

    let pt = |v: TexPoints| format!("{}pt", fmt_scalar(v.value(), 6));
    println!(
        "{},{},{}",
        pt(metrics.width),
        pt(metrics.height),
        pt(metrics.descent)
    );
    Ok(())
}
