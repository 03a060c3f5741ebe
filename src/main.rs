mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use transmux::Converter;
use tx_core::config::Config;
use tx_pipeline::ProgressSender;
use tx_rules::{DeviceCatalog, DeviceKind};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "transmux=trace,tx_av=debug,tx_pipeline=debug,tx_probe=debug".to_string()
        } else {
            "transmux=info,tx_pipeline=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Analyse { file, device, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(analyse_file(&file, &device, json, cli.config.as_deref()))
        }
        Commands::Convert {
            file,
            device,
            output,
            subtitles,
            force_recode,
            hevc,
            ringtone,
            audio_track,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(
                &file,
                &device,
                output,
                ConvertFlags {
                    subtitles,
                    force_recode,
                    hevc,
                    ringtone,
                },
                audio_track,
                cli.config.as_deref(),
            ))
        }
        Commands::ConvertDisc {
            path,
            device,
            output,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_disc(&path, &device, output, cli.config.as_deref()))
        }
        Commands::Devices => list_devices(),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Version => {
            println!("transmux {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, output_override: Option<PathBuf>) -> Config {
    let mut config = Config::load_or_default(path);
    for warning in config.validate() {
        tracing::warn!("{warning}");
    }
    if let Some(dir) = output_override {
        config.conversion.output_dir = dir;
    }
    config
}

fn parse_device(name: &str) -> Result<DeviceKind> {
    name.parse::<DeviceKind>()
        .with_context(|| format!("unknown device '{name}'; run `transmux devices` for the list"))
}

async fn analyse_file(file: &Path, device: &str, json: bool, config: Option<&Path>) -> Result<()> {
    let mut converter = Converter::new(load_config(config, None));
    converter.set_device(parse_device(device)?);

    let model = converter.analyse_file(file).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(model)?);
        return Ok(());
    }

    if let Some(title) = &model.title {
        println!("Title: {title}");
    }
    for (i, vt) in model.video.iter().enumerate() {
        println!(
            "Video #{i}: {} {}x{} @ {:.3} fps, {} kbps, ref={}{}",
            vt.base.codec_id,
            vt.width,
            vt.height,
            vt.frame_rate,
            vt.base.bitrate_kbps,
            vt.ref_frames,
            if vt.base.requires_recode { " [recode]" } else { "" },
        );
    }
    for (i, at) in model.audio.iter().enumerate() {
        println!(
            "Audio #{i}: {} {}ch {} kHz lang={}{}{}",
            at.base.codec_id,
            at.channels,
            at.sample_rate_khz,
            at.base.language,
            if at.base.preferred { " [preferred]" } else { "" },
            if at.base.requires_recode { " [recode]" } else { "" },
        );
    }
    for (i, st) in model.subtitles.iter().enumerate() {
        println!(
            "Subtitle #{i}: {} lang={}{}",
            st.base.codec_id,
            st.base.language,
            if st.base.preferred { " [preferred]" } else { "" },
        );
    }
    Ok(())
}

/// Job flags from the `convert` subcommand.
struct ConvertFlags {
    subtitles: bool,
    force_recode: bool,
    hevc: bool,
    ringtone: bool,
}

async fn convert_file(
    file: &Path,
    device: &str,
    output: Option<PathBuf>,
    flags: ConvertFlags,
    audio_track: Option<usize>,
    config: Option<&Path>,
) -> Result<()> {
    let mut converter = Converter::new(load_config(config, output));
    converter.set_device(parse_device(device)?);
    converter.set_encode_subtitles(flags.subtitles);
    converter.set_force_video_recode(flags.force_recode);
    converter.set_hevc_recode(flags.hevc);
    converter.set_ringtone(flags.ringtone);

    converter.analyse_file(file).await?;
    if let Some(index) = audio_track {
        converter.select_audio_track(index)?;
    }

    let cancel = cancel_on_ctrl_c();
    let artifact = converter
        .convert_file(file, cancel, console_progress())
        .await?;
    println!("{}", artifact.display());
    Ok(())
}

async fn convert_disc(
    path: &Path,
    device: &str,
    output: Option<PathBuf>,
    config: Option<&Path>,
) -> Result<()> {
    let mut converter = Converter::new(load_config(config, output));
    converter.set_device(parse_device(device)?);

    let cancel = cancel_on_ctrl_c();
    let artifact = converter
        .convert_disc(path, cancel, console_progress())
        .await?;
    println!("{}", artifact.display());
    Ok(())
}

fn list_devices() -> Result<()> {
    for profile in DeviceCatalog::all() {
        let caps = if profile.audio_only {
            "audio only".to_string()
        } else {
            format!("{}x{}", profile.max_width, profile.max_height)
        };
        println!("{:<14} {} ({caps})", profile.kind.to_string(), profile.name);
    }
    Ok(())
}

fn check_tools(config: Option<&Path>) -> Result<()> {
    let converter = Converter::new(load_config(config, None));
    let mut missing = 0;
    for info in converter.check_tools() {
        match info.path {
            Some(path) => {
                let version = info.version.unwrap_or_else(|| "unknown version".into());
                println!("ok      {:<12} {} ({version})", info.name, path.display());
            }
            None => {
                println!("missing {:<12}", info.name);
                missing += 1;
            }
        }
    }
    if missing > 0 {
        anyhow::bail!("{missing} tool(s) missing");
    }
    Ok(())
}

/// Cancellation token wired to Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            child.cancel();
        }
    });
    token
}

/// Progress sender printing percent updates to stderr.
fn console_progress() -> ProgressSender {
    ProgressSender::new(|percent, message| {
        eprint!("\r{message}: {percent:>5.1}%");
        if percent >= 100.0 {
            eprintln!();
        }
    })
}
