//! `ridedesk onboard`: First-time setup.

use ridedesk_config::AppConfig;
use ridedesk_core::identity::Identity;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("RideDesk — First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let instructions_path = AppConfig::default().instructions_path();
    if !instructions_path.exists() {
        std::fs::write(&instructions_path, Identity::rides_r_us().system_prompt)?;
        println!("✅ Created {} (edit to change the agent's instructions)", instructions_path.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. export OPENAI_API_KEY=sk-...");
        println!("   2. export ELEVENLABS_API_KEY=...");
        println!("   3. Run: ridedesk chat   (or ridedesk call clip1.wav clip2.wav)\n");
    }

    println!("🎉 Setup complete!\n");
    Ok(())
}
