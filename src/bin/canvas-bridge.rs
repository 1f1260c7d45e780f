use std::{
    fs::File,
    io::{BufWriter, Read as _, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "canvas-bridge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scripted bridge session on an emulated GPU and print the per-step report.
    Run(RunArgs),
    /// Check a scenario script without running it.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Scenario JSON.
    #[arg(long)]
    script: PathBuf,

    /// Write every named snapshot as `<dir>/<name>.png`.
    #[arg(long)]
    png_dir: Option<PathBuf>,

    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Scenario JSON.
    #[arg(long)]
    script: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Validate(args) => cmd_validate(args),
    }
}

fn read_scenario(path: &Path) -> anyhow::Result<canvas_bridge::Scenario> {
    let mut text = String::new();
    File::open(path)
        .with_context(|| format!("open scenario '{}'", path.display()))?
        .read_to_string(&mut text)
        .with_context(|| format!("read scenario '{}'", path.display()))?;
    let scenario = canvas_bridge::Scenario::from_json_str(&text)
        .with_context(|| format!("parse scenario '{}'", path.display()))?;
    Ok(scenario)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let scenario = read_scenario(&args.script)?;
    eprintln!(
        "ok: {} steps, {}x{} canvas",
        scenario.steps.len(),
        scenario.config.width,
        scenario.config.height
    );
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let scenario = read_scenario(&args.script)?;
    let outcome = canvas_bridge::run_scenario(&scenario)?;

    if let Some(dir) = &args.png_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create png dir '{}'", dir.display()))?;
        for snap in &outcome.snapshots {
            let path = dir.join(format!("{}.png", snap.name));
            image::save_buffer_with_format(
                &path,
                &snap.image.to_straight_rgba8(),
                snap.image.width(),
                snap.image.height(),
                image::ColorType::Rgba8,
                image::ImageFormat::Png,
            )
            .with_context(|| format!("write png '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
    }

    match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            let f = File::create(path)
                .with_context(|| format!("create report '{}'", path.display()))?;
            let mut w = BufWriter::new(f);
            serde_json::to_writer_pretty(&mut w, &outcome.report)
                .with_context(|| "serialize report")?;
            w.write_all(b"\n")?;
            w.flush()?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut w = stdout.lock();
            serde_json::to_writer_pretty(&mut w, &outcome.report)
                .with_context(|| "serialize report")?;
            writeln!(w)?;
        }
    }
    Ok(())
}
