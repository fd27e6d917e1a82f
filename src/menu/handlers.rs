use crate::component::{PhotoSelector, SlideshowPreview, SlideshowSession, VideoExporter};
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_photo_selector(
    term: &Term,
    config: &mut Config,
    session: &mut SlideshowSession,
) -> Result<()> {
    let mut selector = PhotoSelector::new(config);

    if let Err(e) = selector.run(session) {
        eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_slideshow_preview(
    term: &Term,
    config: &Config,
    session: &mut SlideshowSession,
) -> Result<()> {
    let preview = SlideshowPreview::new(config.clone());

    if let Err(e) = preview.run(term, session) {
        eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_video_exporter(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
    session: &SlideshowSession,
) -> Result<()> {
    let exporter = VideoExporter::new(config.clone(), Arc::clone(shutdown_signal));

    if let Err(e) = exporter.run(session) {
        eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}
