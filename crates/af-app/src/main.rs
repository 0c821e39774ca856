use af_core::cancel::CancelToken;
use af_core::config::ConvertConfig;
use anyhow::{Context, Result};
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider la source
    cli.validate_source()?;

    // 4. Config : fichier puis overrides CLI
    let config = resolve_config(&cli)?;

    // 5. Ctrl-C → annulation entre deux frames
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            log::warn!("Interruption demandée, arrêt après la frame en cours...");
            cancel.cancel();
        })
        .context("installation du handler Ctrl-C")?;
    }

    // 6. Conversion
    if let Some(ref input) = cli.image {
        af_app::convert::convert_image(input, &cli.output, &config)
            .with_context(|| format!("conversion de {}", input.display()))?;
    } else if let Some(ref input) = cli.video {
        run_video(input, &cli.output, &config, &cancel)?;
    } else if let Some(ref folder) = cli.frames {
        let n = af_app::convert::assemble_folder(folder, &cli.output, &config, &cancel)
            .with_context(|| format!("assemblage des frames de {}", folder.display()))?;
        log::info!("{n} frames assemblées");
    }

    println!("Sortie écrite : {}", cli.output.display());
    Ok(())
}

#[cfg(feature = "video")]
fn run_video(
    input: &std::path::Path,
    output: &std::path::Path,
    config: &ConvertConfig,
    cancel: &CancelToken,
) -> Result<()> {
    let n = af_app::convert::convert_video(input, output, config, cancel)
        .with_context(|| format!("conversion de {}", input.display()))?;
    log::info!("{n} frames encodées");
    Ok(())
}

#[cfg(not(feature = "video"))]
fn run_video(
    _input: &std::path::Path,
    _output: &std::path::Path,
    _config: &ConvertConfig,
    _cancel: &CancelToken,
) -> Result<()> {
    anyhow::bail!("La conversion vidéo requiert la feature 'video' (ffmpeg support).")
}

/// Config file (if any) merged over defaults, then CLI overrides, then validation.
fn resolve_config(cli: &cli::Cli) -> Result<ConvertConfig> {
    let mut config = match cli.config {
        Some(ref path) => af_core::config::load_config(path)
            .with_context(|| format!("chargement de {}", path.display()))?,
        None => ConvertConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate().context("configuration invalide")?;
    Ok(config)
}
