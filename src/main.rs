use std::{env, path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mcpack_installer::{
    download::Manager, file::default_game_root, install::Installer, modpack::Modpack,
    profiles::Registration,
};
use reqwest::Client;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modpack manifest to install instead of the bundled one
    #[clap(long, short)]
    manifest: Option<PathBuf>,
    /// Game directory, defaults to the launcher's directory for this platform
    #[clap(long)]
    game_dir: Option<PathBuf>,
    /// Optional component to install, may be repeated
    #[clap(long = "with", value_name = "ID")]
    with: Vec<String>,
    /// Install every component of the modpack
    #[clap(long, conflicts_with = "with")]
    all: bool,
    /// Print the modpack's components and exit
    #[clap(long)]
    list: bool,
    #[clap(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Installation failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mcpack_installer=debug"
    } else {
        "mcpack_installer=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let modpack = match &args.manifest {
        Some(path) => Modpack::load(path)
            .await
            .with_context(|| format!("cannot load manifest {}", path.display()))?,
        None => Modpack::bundled().context("bundled manifest is broken")?,
    };

    if args.list {
        for component in &modpack.components {
            let marker = if component.required { "required" } else { "optional" };
            println!("{:<20} {:<24} {marker}", component.id, component.name);
        }
        return Ok(());
    }

    let ids: Vec<&str> = if args.all {
        modpack.components.iter().map(|c| c.id.as_str()).collect()
    } else {
        args.with.iter().map(String::as_str).collect()
    };
    let selection = modpack.select(&ids)?;

    let root_dir = match args.game_dir {
        Some(dir) if dir.is_relative() => env::current_dir()?.join(dir),
        Some(dir) => dir,
        None => default_game_root(),
    };

    let manager = Manager::new(Client::new());
    let installer = Installer::new(&manager, &modpack, root_dir);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    let report = installer
        .run(&selection, |step| pb.set_message(step.to_string()))
        .await;
    pb.finish_and_clear();
    let report = report?;

    println!(
        "Installed {} into {}",
        report.components.join(", "),
        installer.hierarchy().game_dir.display()
    );
    println!("Fetched {}KB", manager.downloaded_bytes() / 1024);
    let name = &modpack.profile.name;
    match report.registration {
        Registration::Inserted => println!("Profile \"{name}\" added to the launcher"),
        Registration::AlreadyPresent => println!("Profile \"{name}\" was already registered"),
    }
    Ok(())
}
