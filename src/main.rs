use anyhow::Context;
use clap::Parser;
use std::path::Path;
use tailwind_web_components::watch::{dev_server, spawn_update_printer, watch_loop, ProjectWatcher};
use tailwind_web_components::{
    absolute_path, run_lifecycle, tailwind_web_components, BuildArgs, Cli, Commands, LiveUpdateChannel,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Build(args) => build(args).await,
        Commands::Watch(args) => watch(args).await,
    }
}

async fn build(args: BuildArgs) -> anyhow::Result<()> {
    let config = args.plugin_config().context("Failed to load configuration")?;
    let mut plugins = tailwind_web_components(config);

    let output = run_lifecycle(&mut plugins.stylesheet, &args.root, args.mode_or("production"), None)
        .await
        .context("Failed to build the stylesheet module")?;

    match &args.out {
        Some(out) => write_output(out, &output.module)?,
        None => print!("{}", output.module),
    }

    if let Some(report) = &args.report {
        output.report.write_to_file(report)
            .with_context(|| format!("Failed to write report to {}", report.display()))?;
    }

    tracing::info!(
        mode = %output.report.mode,
        css_bytes = output.report.css_size_bytes,
        module_bytes = output.report.module_size_bytes,
        "Build complete"
    );
    Ok(())
}

async fn watch(args: BuildArgs) -> anyhow::Result<()> {
    let config = args.plugin_config().context("Failed to load configuration")?;
    let mut plugins = tailwind_web_components(config);

    let channel = LiveUpdateChannel::new();
    let printer = spawn_update_printer(&channel);

    let output = run_lifecycle(
        &mut plugins.stylesheet,
        &args.root,
        args.mode_or("development"),
        Some(&dev_server(&channel)),
    )
    .await
    .context("Failed to build the stylesheet module")?;

    let mut outputs = Vec::new();
    if let Some(out) = &args.out {
        write_output(out, &output.module)?;
        outputs.push(absolute_path(out));
    }
    if let Some(report) = &args.report {
        output.report.write_to_file(report)
            .with_context(|| format!("Failed to write report to {}", report.display()))?;
        outputs.push(absolute_path(report));
    }

    let root = plugins.stylesheet.root()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| args.root.clone());
    let watcher = ProjectWatcher::new(&root, outputs)
        .with_context(|| format!("Failed to watch {}", root.display()))?;
    tracing::info!(root = %root.display(), "Watching for changes");

    watch_loop(&mut plugins.stylesheet, &watcher, args.out.as_deref()).await?;

    printer.abort();
    Ok(())
}

fn write_output(path: &Path, module: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, module)
        .with_context(|| format!("Failed to write module to {}", path.display()))
}
