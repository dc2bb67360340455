use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quark_direct_link::{config::Config, ResolutionEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quark_direct_link=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 用法：quark-direct-link <share_url> [fid...]
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        return Err(anyhow!(
            "用法: {} <share_url> [fid...]",
            args.first()
                .map(|s| s.as_str())
                .unwrap_or("quark-direct-link")
        ));
    }

    let share_url = &args[1];
    let fids = &args[2..];
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    if std::path::Path::new(&config_path).exists() {
        tracing::info!("✅ 配置加载完成: {}", config_path);
    } else {
        tracing::info!("✅ 配置从环境变量加载");
    }

    let credential = config.credential()?;
    let engine = ResolutionEngine::from_config(&config)?;

    let listing = match engine.resolve(share_url, &credential).await {
        Ok(listing) => listing,
        Err(e) => {
            if !e.attempts.is_empty() {
                tracing::warn!("📋 尝试记录:\n{}", e.attempt_report());
            }
            return Err(e.into());
        }
    };
    println!("{}", serde_json::to_string_pretty(&listing)?);

    // 直链按需逐个获取
    for fid in fids {
        match engine.download_link_in(&listing, fid, &credential).await? {
            Some(link) => println!("{}", serde_json::to_string(&link)?),
            None => tracing::warn!("⚠️ fid={} 未获取到直链", fid),
        }
    }

    Ok(())
}
