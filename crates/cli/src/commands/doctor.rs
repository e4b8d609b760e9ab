//! `ridedesk doctor`: Diagnose setup problems.

use ridedesk_config::AppConfig;
use ridedesk_core::provider::Provider;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 RideDesk Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if !file.exists() {
        println!("  ⚠️  No config file at {} (defaults in use) — run `ridedesk onboard`", file.display());
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            return Ok(());
        }
    };

    match ridedesk_providers::from_config(&config) {
        Ok(provider) => {
            println!("  ✅ OpenAI API key configured");
            match provider.health_check().await {
                Ok(true) => println!("  ✅ Completion endpoint reachable ({})", config.openai_api_url),
                Ok(false) => {
                    println!("  ❌ Completion endpoint rejected the key ({})", config.openai_api_url);
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Completion endpoint unreachable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    match config.require_elevenlabs_key() {
        Ok(_) => println!("  ✅ ElevenLabs API key configured"),
        Err(e) => {
            println!("  ⚠️  {e} (only `ridedesk chat` without --speak will work)");
            issues += 1;
        }
    }

    if let Some(dir) = &config.voice.output_dir {
        println!("  ✅ Replies will be written to {}", dir.display());
    } else if let Some(player) = config.voice.player.first() {
        let found = tokio::process::Command::new(player)
            .arg("-version")
            .output()
            .await
            .is_ok();
        if found {
            println!("  ✅ Audio player '{player}' found");
        } else {
            println!("  ⚠️  Audio player '{player}' not found — install it, set voice.output_dir, or use --mute");
            issues += 1;
        }
    }

    let instructions = config.instructions_path();
    if instructions.exists() {
        println!("  ✅ Instructions loaded from {}", instructions.display());
    } else {
        println!("  ✅ Using built-in Rides-R-Us instructions");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
