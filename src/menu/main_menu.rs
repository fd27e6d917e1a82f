use crate::component::SlideshowSession;
use crate::config::save::save_settings;
use crate::config::{Config, Language};
use crate::menu::handlers::{run_photo_selector, run_slideshow_preview, run_video_exporter};
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use rust_i18n::t;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
    session: &mut SlideshowSession,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    print_session_status(session);
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_select"),
        t!("main_menu.opt_preview"),
        t!("main_menu.opt_export"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_photo_selector(term, config, session)?;
            Ok(true)
        }
        Some(1) => {
            run_slideshow_preview(term, config, session)?;
            Ok(true)
        }
        Some(2) => {
            run_video_exporter(term, shutdown_signal, config, session)?;
            Ok(true)
        }
        Some(3) => {
            show_settings_menu(term, config, session)?;
            Ok(true)
        }
        Some(4) | None => Ok(false),
        _ => unreachable!(),
    }
}

fn print_session_status(session: &SlideshowSession) {
    let photos = t!("main_menu.status_photos", count = session.photos.len());
    let preview = match session.last_preview {
        Some(report) => t!(
            "main_menu.status_preview",
            seconds = format!("{:.1}", report.elapsed_ms as f64 / 1000.0),
            slides = report.slides_shown
        ),
        None => t!("main_menu.status_no_preview"),
    };
    println!("{}", style(format!("{photos} / {preview}")).dim());
}

/// 設定選單
fn show_settings_menu(
    term: &Term,
    config: &mut Config,
    session: &mut SlideshowSession,
) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!(
                "settings.opt_seconds",
                value = config.settings.slideshow.seconds_per_photo
            ),
            t!(
                "settings.opt_audio",
                value = config.settings.export.background_audio.as_str()
            ),
            t!(
                "settings.opt_library",
                value = config.settings.export.library_root.display().to_string()
            ),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => edit_seconds_per_photo(config, session)?,
            Some(1) => edit_background_audio(config)?,
            Some(2) => edit_library_root(config)?,
            Some(3) => show_language_menu(term, config)?,
            Some(4) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 修改每張秒數後，舊的預覽時間不再對應新的節奏
fn edit_seconds_per_photo(config: &mut Config, session: &mut SlideshowSession) -> Result<()> {
    let current = config.settings.slideshow.seconds_per_photo;
    let value: f64 = Input::new()
        .with_prompt(t!("settings.seconds.prompt"))
        .default(current)
        .validate_with(|value: &f64| -> Result<(), String> {
            if value.is_finite() && *value > 0.0 {
                Ok(())
            } else {
                Err(t!("settings.seconds.invalid").to_string())
            }
        })
        .interact_text()?;

    if (value - current).abs() > f64::EPSILON {
        config.settings.slideshow.seconds_per_photo = value;
        session.last_preview = None;
        save_and_report(config, &value.to_string())?;
    }
    Ok(())
}

fn edit_background_audio(config: &mut Config) -> Result<()> {
    let current = config.settings.export.background_audio.clone();
    let value: String = Input::new()
        .with_prompt(t!("settings.audio.prompt"))
        .default(current.clone())
        .interact_text()?;
    let value = value.trim().to_string();

    if !value.is_empty() && value != current {
        config.settings.export.background_audio.clone_from(&value);
        save_and_report(config, &value)?;
    }
    Ok(())
}

fn edit_library_root(config: &mut Config) -> Result<()> {
    let current = config.settings.export.library_root.display().to_string();
    let value: String = Input::new()
        .with_prompt(t!("settings.library.prompt"))
        .default(current.clone())
        .interact_text()?;
    let value = value.trim().to_string();

    if !value.is_empty() && value != current {
        config.settings.export.library_root = PathBuf::from(&value);
        save_and_report(config, &value)?;
    }
    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::EnUs, Language::ZhTw];
    let items: Vec<String> = languages.iter().map(ToString::to_string).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];
    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_and_report(config, &selected_lang.to_string())?;
    }

    Ok(())
}

fn save_and_report(config: &Config, value: &str) -> Result<()> {
    save_settings(&config.settings)?;
    println!("\n{} {value}", style(t!("settings.saved")).green());
    std::thread::sleep(std::time::Duration::from_secs(1));
    Ok(())
}
