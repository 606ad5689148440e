mod cli;
mod config;
mod edit;
mod encode;
mod eval;
mod params;
mod render;
mod session;
mod watch;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

use cli::Cli;
use encode::ffmpeg::{EncoderSettings, FfmpegEncoder};
use eval::{FrameClock, FrameEvaluator, ATTRIBUTE_SLOTS};
use params::ParameterTable;
use render::frame::{FrameRenderer, TEXTURE_FORMAT};
use render::gpu::GpuContext;
use render::pipeline::WgpuCompiler;
use session::{ReloadReport, ShaderSession};
use watch::ShaderWatcher;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let config_path = cli.config.clone().or_else(config::find_config);
    let mut config_params = Vec::new();
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.width == 1024 { cli.width = cfg.output.width; }
            if cli.height == 768 { cli.height = cfg.output.height; }
            if cli.fps == 60 { cli.fps = cfg.output.fps; }
            if cli.crf == 18 { cli.crf = cfg.output.crf; }
            if cli.codec == "libx264" { cli.codec = cfg.output.codec; }
            if cli.pix_fmt == "yuv420p" { cli.pix_fmt = cfg.output.pix_fmt; }
            if cli.debounce_ms == 50 { cli.debounce_ms = cfg.watch.debounce_ms; }
            config_params = cfg.params.into_iter().collect();
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // Config entries first so `--set` wins.
    let mut pending_edits: Vec<(String, String)> = config_params;
    for text in &cli.overrides {
        let (name, value) = edit::split_override(text)?;
        pending_edits.push((name.to_string(), value.to_string()));
    }

    let attributes = match cli.attributes.as_deref() {
        None => [0.0; ATTRIBUTE_SLOTS],
        Some(&[a, b, c, d]) => [a, b, c, d],
        Some(values) => anyhow::bail!(
            "--attributes takes {} values, got {}",
            ATTRIBUTE_SLOTS,
            values.len()
        ),
    };

    let source = session::read_shader(&cli.shader).context("Could not load shader")?;

    if cli.list_params {
        return list_params(&source, cli.json);
    }

    log::info!("shaderdeck - live shader parameters");
    log::info!("Shader: {}", cli.shader.display());
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);

    let gpu = GpuContext::new()?;
    let frame_renderer = FrameRenderer::new(&gpu, cli.width, cli.height);
    let mut session = ShaderSession::new(WgpuCompiler::new(&gpu, TEXTURE_FORMAT));

    match session.reload(&source) {
        Ok(report) => log_reload(&report),
        Err(err) => log::error!("Initial load failed: {:#}", anyhow::Error::from(err)),
    }
    for param in session.current_parameters() {
        log::debug!("  {} {:?} ({:?} -> {:?})", param.name, param.ty, param.source, param.target);
    }
    if session.shader().is_some() {
        apply_edits(session.current_parameters_mut(), &mut pending_edits);
    }

    let mut encoder = match cli.output {
        Some(ref output) => {
            if session.shader().is_none() {
                anyhow::bail!("Cannot record {}: the shader did not compile", output.display());
            }
            Some(FfmpegEncoder::new(
                output,
                &EncoderSettings {
                    width: cli.width,
                    height: cli.height,
                    fps: cli.fps,
                    codec: &cli.codec,
                    pix_fmt: &cli.pix_fmt,
                    crf: cli.crf,
                },
            )?)
        }
        None => None,
    };

    let progress = match (encoder.is_some(), cli.frames) {
        (true, Some(total)) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
                    .context("Invalid progress bar template")?
                    .progress_chars("=>-"),
            );
            Some(pb)
        }
        _ => None,
    };

    let mut watcher = ShaderWatcher::new(&cli.shader, Duration::from_millis(cli.debounce_ms))?;
    let mut evaluator = FrameEvaluator::new(attributes);
    let mut clock = FrameClock::new(cli.fps);

    loop {
        if cli.frames.is_some_and(|limit| clock.frame() >= limit) {
            break;
        }
        let frame_start = Instant::now();

        if watcher.poll_changed() {
            log::info!("Reloading shader");
            match session.reload_file(&cli.shader) {
                Ok(report) => {
                    log_reload(&report);
                    apply_edits(session.current_parameters_mut(), &mut pending_edits);
                }
                Err(err) => log::error!("Reload aborted, keeping previous shader: {:#}", anyhow::Error::from(err)),
            }
        }

        let env = clock.tick(cli.width, cli.height);
        if let Some((program, params)) = session.active_mut() {
            evaluator.evaluate(params, &env, &mut program.uniforms);
            program.upload(&gpu.queue);
            match encoder.as_mut() {
                Some(encoder) => {
                    let pixels = frame_renderer.render_and_readback(&gpu, program)?;
                    encoder.write_frame(&pixels)?;
                }
                None => frame_renderer.render(&gpu, program),
            }
        }

        if let Some(ref pb) = progress {
            pb.set_position(clock.frame());
        }

        // Live mode keeps real-time pace; recording runs as fast as it can.
        if encoder.is_none() {
            let elapsed = frame_start.elapsed();
            if let Some(remaining) = clock.interval().checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("Rendering complete");
    }
    if let Some(encoder) = encoder {
        log::info!("Finishing encoding...");
        encoder.finish()?;
    }

    log::info!("Done after {} frame(s), {} reload(s)", clock.frame(), session.reload_count());
    Ok(())
}

fn log_reload(report: &ReloadReport) {
    for warning in &report.warnings {
        log::warn!("{}", warning);
    }
    log::info!(
        "Shader reloaded: {} parameter(s), {} carried over",
        report.parameters,
        report.migrated
    );
    if !report.evicted.is_empty() {
        let names: Vec<&str> = report.evicted.iter().map(|n| &**n).collect();
        log::info!("Removed parameters: {}", names.join(", "));
    }
}

/// Applies queued edits once a table is live; unknown names are dropped with a warning.
fn apply_edits(params: &mut ParameterTable, pending: &mut Vec<(String, String)>) {
    for (name, value) in pending.drain(..) {
        match edit::apply_edit(params, &name, &value) {
            Ok(()) => log::info!("Set {} = {}", name, value),
            Err(err) => log::warn!("Ignoring edit: {}", err),
        }
    }
}

fn list_params(source: &str, json: bool) -> Result<()> {
    let outcome = params::parse_parameters(source);
    for warning in &outcome.warnings {
        log::warn!("{}", warning);
    }

    let listing = edit::listing(&outcome.table);
    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("{} parameter(s):", listing.len());
    for entry in &listing {
        let value: Vec<String> = entry.value.iter().map(|v| v.to_string()).collect();
        println!(
            "  {:<20} {:<8} {:<16} {:<16} [{}]",
            entry.name,
            format!("{:?}", entry.ty),
            format!("{:?}", entry.source),
            format!("{:?}", entry.target),
            value.join(", ")
        );
    }
    Ok(())
}
