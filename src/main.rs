use ailang::{AiLang, BaseStrings, Config, FileStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

const USAGE: &str = "usage: ailang <language> [key ...]";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ailang=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let language = args.next().context(USAGE)?;
    let keys: Vec<String> = args.collect();

    let config = Config::from_env()?;
    let strings_path = config
        .base_strings_path
        .clone()
        .context("AILANG_BASE_STRINGS not set")?;
    let base_strings = BaseStrings::load(&strings_path)?;
    let store = FileStore::open(&config.storage_dir).with_context(|| {
        format!(
            "Failed to open storage directory {}",
            config.storage_dir.display()
        )
    })?;

    let ailang = AiLang::init(config, base_strings.clone(), Arc::new(store)).await?;

    info!("Preloading {}", language);
    let translated = ailang.preload_language(&language).await?;
    info!("Translated {} new strings", translated);

    if !ailang.set_language(&language) && ailang.current_language() != language {
        warn!("Could not switch to {}", language);
    }

    let keys: Vec<String> = if keys.is_empty() {
        base_strings.iter().map(|(key, _)| key.clone()).collect()
    } else {
        keys
    };
    for key in &keys {
        println!("{} = {}", key, ailang.t(key));
    }

    ailang.flush().await;

    let stats = ailang.cache_stats();
    info!(
        "Cache: {} entries ({} active, {} expired, ~{} KB)",
        stats.total_entries, stats.active_entries, stats.expired_entries, stats.estimated_size_kb
    );
    Ok(())
}
