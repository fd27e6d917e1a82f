use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use rust_i18n::t;
use slideshow_composer::component::SlideshowSession;
use slideshow_composer::config::Config;
use slideshow_composer::init;
use slideshow_composer::menu::show_main_menu;
use slideshow_composer::signal::setup_shutdown_signal;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal();

    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());

    let mut session = SlideshowSession::default();

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut config, &mut session) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style(t!("main_menu.goodbye")).green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
