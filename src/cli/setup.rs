//! Interactive first-run setup

use anyhow::Result;
use console::Style;
use dialoguer::{Confirm, Input, Password};
use portalkeep_core::config::SettingsStore;

pub fn handle_setup(store: &SettingsStore) -> Result<()> {
    let mut config = store.load()?;

    println!("Let's set up portalkeep.\n");

    config.target_ssid = Input::new()
        .with_prompt("WiFi network (SSID)")
        .with_initial_text(config.target_ssid.clone())
        .interact_text()?;

    config.username = Input::new()
        .with_prompt("ISP username")
        .with_initial_text(config.username.clone())
        .interact_text()?;

    config.password = Password::new().with_prompt("ISP password").interact()?;

    let ttl: u32 = Input::new()
        .with_prompt("Stay signed in for how many hours? (0 = forever)")
        .default(config.keep_alive_ttl_hours.unwrap_or(0))
        .interact_text()?;
    config.keep_alive_ttl_hours = if ttl == 0 { None } else { Some(ttl) };

    config.auto_login = Confirm::new()
        .with_prompt("Log in automatically when the network appears?")
        .default(config.auto_login)
        .interact()?;

    config.notify = Confirm::new()
        .with_prompt("Decorate status output with the usage figure?")
        .default(config.notify)
        .interact()?;

    store.save(&config)?;

    let green = Style::new().green();
    println!(
        "\n{} Config written to {}",
        green.apply_to("Saved."),
        store.path().display()
    );
    println!("Run `portalkeep login` or `portalkeep daemon start` when on the network.");
    Ok(())
}
