//! `hive profile {list|add|rm|set-default}` (spec §6): user-config profile
//! management, thin wrappers over [`crate::config`]'s profile functions.

use anyhow::Result;
use colored::Colorize;

use crate::config;
use crate::types::Profile;

pub fn list() -> Result<()> {
    let profiles = config::list_profiles()?;
    let default = config::load_user_config()?.default_profile;
    for profile in profiles {
        let marker = if profile.name == default { "*" } else { " " };
        println!(
            "{} {:<16} {}",
            marker.green(),
            profile.name.bright_cyan(),
            profile.description.unwrap_or_default()
        );
    }
    Ok(())
}

pub fn add(name: String, command: String, description: Option<String>, args: Vec<String>) -> Result<()> {
    config::add_profile(Profile {
        name: name.clone(),
        description,
        command,
        args,
    })?;
    println!("{} Added profile '{}'", "✓".green().bold(), name.bright_cyan());
    Ok(())
}

pub fn remove(name: String) -> Result<()> {
    config::remove_profile(&name)?;
    println!("{} Removed profile '{}'", "✓".green().bold(), name.bright_cyan());
    Ok(())
}

pub fn set_default(name: String) -> Result<()> {
    config::set_default_profile(&name)?;
    println!("{} Default profile is now '{}'", "✓".green().bold(), name.bright_cyan());
    Ok(())
}
