//! `wingman onboard`: First-time setup.

use wingman_config::AppConfig;

use super::runtime::CliResult;

pub async fn run() -> CliResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("💬 Wingman — First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let history_dir = AppConfig::default().history_dir();
    if !history_dir.exists() {
        std::fs::create_dir_all(&history_dir)?;
        println!("✅ Created history directory: {}", history_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add your API key to {}", config_path.display());
        println!("      (or set WINGMAN_API_KEY / DEEPSEEK_API_KEY)");
        println!("   2. Fill in the [user] section so advice fits you");
        println!("   3. Run: wingman chat\n");
    }

    println!("🎉 Setup complete!\n");
    Ok(())
}
