use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use storyframe_core::{
    Caption, CapturedFrame, Config, FfmpegBackend, FrameCapturer, GeneratedArt, LinkResolver,
    ResolvedSource, Session, extract_url, generate_captions, generate_cover, generate_storyboard,
    package_frames, write_archive,
};
use tokio::fs;

pub struct StoryboardOptions {
    pub captions: bool,
    /// 1-based index of the caption the cover is titled after.
    pub cover: Option<usize>,
    pub lang: String,
    pub platform: String,
    pub instruction: Option<String>,
    pub output_dir: PathBuf,
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} Capturing frames [{bar:30.cyan/dim}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn done(message: String, started: Instant) -> String {
    format!(
        "{} {} {}",
        style("✓").green().bold(),
        message,
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    )
}

/// Caption `n` counted from 1, as listed on screen.
fn pick_caption(captions: &[Caption], n: usize) -> Result<&Caption> {
    match n.checked_sub(1).and_then(|i| captions.get(i)) {
        Some(caption) => Ok(caption),
        None => bail!(
            "--cover {} is out of range: only {} caption(s) were generated",
            n,
            captions.len()
        ),
    }
}

/// Writes image art as `<prefix>-<stamp>.<ext>`; text replies are shown instead.
async fn save_art(
    art: &GeneratedArt,
    dir: &Path,
    prefix: &str,
    stamp: u128,
    what: &str,
    started: Instant,
) -> Result<()> {
    match art {
        GeneratedArt::Image { data, .. } => {
            let path = dir.join(format!("{}-{}.{}", prefix, stamp, art.extension()));
            fs::write(&path, data).await?;
            println!("{}", done(format!("{} generated", what), started));
            println!("{} {}", style("Saved:").dim(), style(path.display()).cyan());
        }
        GeneratedArt::Text(text) => {
            println!(
                "{} The model answered with text instead of a {}:\n\n{}\n",
                style("!").yellow().bold(),
                what.to_lowercase(),
                text
            );
        }
    }
    Ok(())
}

pub async fn resolve(config: &Config, text: &str) -> Result<ResolvedSource> {
    let step_start = Instant::now();
    let spinner = create_spinner("Resolving link...");
    let resolver = LinkResolver::new(config.resolver.clone());

    match resolver.resolve(text).await {
        Ok(source) => {
            spinner.finish_with_message(done("Resolved".to_string(), step_start));
            Ok(source)
        }
        Err(e) => {
            spinner.finish_and_clear();
            Err(e.into())
        }
    }
}

/// Local files and `--direct` URLs are played as-is; anything else goes through the resolver.
async fn media_source(config: &Config, source: &str, direct: bool) -> Result<ResolvedSource> {
    if Path::new(source).is_file() {
        println!(
            "{} Local file {}",
            style("✓").green().bold(),
            style(source).dim()
        );
        return Ok(ResolvedSource {
            url: source.to_string(),
            duration: None,
        });
    }

    if direct {
        return Ok(ResolvedSource {
            url: extract_url(source)?,
            duration: None,
        });
    }

    resolve(config, source).await
}

async fn capture(config: &Config, session: &Session, media_url: &str) -> Result<Vec<CapturedFrame>> {
    let step_start = Instant::now();
    let tags = session.tags();
    let capturer = FrameCapturer::new(
        FfmpegBackend::default(),
        config.capture.clone(),
        &config.resolver,
    );

    let pb = create_progress_bar(tags.len() as u64);
    let progress = pb.clone();
    let result = capturer
        .capture_frames(media_url, tags, move |done, total| {
            progress.set_length(total as u64);
            progress.set_position(done.saturating_sub(1) as u64);
        })
        .await;

    let frames = match result {
        Ok(frames) => frames,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };

    pb.finish_and_clear();
    println!(
        "{}",
        done(
            format!("Captured {}/{} frames", frames.len(), tags.len()),
            step_start
        )
    );

    if frames.len() < tags.len() {
        println!(
            "{} {} frame(s) could not be captured and were skipped",
            style("!").yellow().bold(),
            tags.len() - frames.len()
        );
    }

    Ok(frames)
}

pub async fn export_frames(
    config: &Config,
    session: &Session,
    source: &str,
    direct: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let total_start = Instant::now();
    let media = media_source(config, source, direct).await?;
    let frames = capture(config, session, &media.url).await?;

    let Some(archive) = package_frames(&frames)? else {
        println!("{} No frames captured, nothing to save", style("!").yellow().bold());
        return Ok(());
    };

    let output = output.unwrap_or_else(|| {
        dirs::download_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!("frames-{}.zip", epoch_millis()))
    });
    write_archive(&output, &archive).await?;

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!("{} {}", style("Saved:").dim(), style(output.display()).cyan());

    Ok(())
}

pub async fn storyboard(
    config: &Config,
    session: &Session,
    source: &str,
    direct: bool,
    options: StoryboardOptions,
) -> Result<()> {
    let total_start = Instant::now();
    let media = media_source(config, source, direct).await?;
    let frames = capture(config, session, &media.url).await?;
    let settings = &session.provider;

    fs::create_dir_all(&options.output_dir).await?;
    let stamp = epoch_millis();

    let step_start = Instant::now();
    let spinner = create_spinner(&format!(
        "Drawing storyboard with {} (this can take a while)...",
        settings.provider.name()
    ));
    let art = generate_storyboard(settings, &frames, options.instruction.as_deref()).await;
    spinner.finish_and_clear();

    save_art(
        &art?,
        &options.output_dir,
        "storyboard",
        stamp,
        "Storyboard",
        step_start,
    )
    .await?;

    if options.captions {
        let step_start = Instant::now();
        let spinner = create_spinner(&format!(
            "Writing {} captions with {}...",
            options.lang,
            settings.provider.name()
        ));
        let captions =
            generate_captions(settings, &frames, &options.lang, &options.platform).await;
        spinner.finish_and_clear();
        let captions = captions?;

        let path = options.output_dir.join(format!("captions-{}.json", stamp));
        fs::write(&path, serde_json::to_string_pretty(&captions)?).await?;
        println!("{}", done(format!("{} captions generated", captions.len()), step_start));

        println!("{}", style("─".repeat(60)).dim());
        for (i, caption) in captions.iter().enumerate() {
            println!("{} {}\n", style(format!("{}.", i + 1)).dim(), style(&caption.title).bold());
            println!("{}\n", caption.content);
        }
        println!("{}", style("─".repeat(60)).dim());
        println!("{} {}", style("Saved:").dim(), style(path.display()).cyan());

        if let Some(n) = options.cover {
            let caption = pick_caption(&captions, n)?;
            let step_start = Instant::now();
            let spinner = create_spinner(&format!(
                "Designing cover \"{}\" with {}...",
                caption.title,
                settings.provider.name()
            ));
            let art = generate_cover(settings, &frames, caption).await;
            spinner.finish_and_clear();

            save_art(&art?, &options.output_dir, "cover", stamp, "Cover", step_start).await?;
        }
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captions() -> Vec<Caption> {
        ["Warm", "Tutorial", "Punchy"]
            .iter()
            .map(|t| Caption {
                title: t.to_string(),
                content: format!("{} caption", t),
            })
            .collect()
    }

    #[test]
    fn cover_caption_is_counted_from_one() {
        let captions = captions();
        assert_eq!(pick_caption(&captions, 1).unwrap().title, "Warm");
        assert_eq!(pick_caption(&captions, 3).unwrap().title, "Punchy");
    }

    #[test]
    fn cover_caption_out_of_range_is_an_error() {
        let captions = captions();
        let err = pick_caption(&captions, 4).unwrap_err();
        assert!(err.to_string().contains("only 3 caption(s)"));
        assert!(pick_caption(&captions, 0).is_err());
        assert!(pick_caption(&[], 1).is_err());
    }

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
