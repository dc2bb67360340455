//! 候选接口调试工具：逐个打印每次尝试的结果
//!
//! 使用方法：
//! cargo run --bin probe-debug -- <share_url> [fid]

use anyhow::Result;
use quark_direct_link::quark::{parse_share_link, Attempt, CandidateEntry, ResolutionError};
use quark_direct_link::{config::Config, ResolutionEngine};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_entry(kind: &str, entry: &CandidateEntry) {
    println!("   - [{}] {} {:?} {}", kind, entry.label, entry.method, entry.endpoint);
    if !entry.query.is_empty() {
        println!("     query: {:?}", entry.query);
    }
    println!(
        "     payload: {}",
        serde_json::to_string(&entry.payload).unwrap_or_default()
    );
}

fn print_attempt(attempt: &Attempt) {
    println!(
        "   - [{}] {:?} {}",
        attempt.candidate, attempt.http_status, attempt.message
    );
    if let Some(body) = &attempt.response_preview {
        println!("     响应: {}", body);
    }
}

fn print_failure(stage: &str, e: &ResolutionError) {
    println!("\n❌ {}失败: {}", stage, e);
    e.attempts.iter().for_each(print_attempt);
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quark_direct_link=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n🧪 夸克分享接口调试工具\n");

    let args: Vec<String> = std::env::args().collect();
    let Some(share_url) = args.get(1) else {
        println!("❌ 用法:");
        println!("   {} <share_url> [fid]", args[0]);
        return Ok(());
    };

    let config = Config::load("config.toml")?;
    let credential = config.credential()?;
    println!("✅ Cookie 长度: {}", credential.as_str().len());

    let engine = ResolutionEngine::from_config(&config)?;
    println!("📋 候选表版本: {}", engine.table().version);
    println!(
        "   Origin: {}  Referer: {}",
        engine.table().site.origin,
        engine.table().site.referer
    );
    for entry in &engine.table().list_directory {
        print_entry("列表", entry);
    }
    for entry in &engine.table().get_download_url {
        print_entry("直链", entry);
    }

    // Ctrl+C 中断当前探测
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let resolved = match engine.resolve_detailed(share_url, &credential, &cancel).await {
        Ok(resolved) => resolved,
        Err(e) => {
            print_failure("获取文件列表", &e);
            return Ok(());
        }
    };

    println!("\n✅ 生效候选: {}", resolved.candidate);
    if !resolved.attempts.is_empty() {
        println!("   之前失败的尝试:");
        resolved.attempts.iter().for_each(print_attempt);
    }

    println!("\n{}", "=".repeat(80));
    for (i, entry) in resolved.value.entries.iter().enumerate() {
        let marker = if entry.is_directory { "📁" } else { "📄" };
        println!(
            "{}. {} {} (fid={}, {} 字节)",
            i + 1,
            marker,
            entry.name,
            entry.fid,
            entry.size_bytes
        );
    }
    println!("{}", "=".repeat(80));

    let Some(fid) = args.get(2) else {
        return Ok(());
    };

    let reference = parse_share_link(share_url)?;
    println!("\n🔗 获取直链: fid={}\n", fid);
    match engine
        .get_download_link_detailed(&reference, fid, &credential, &cancel)
        .await
    {
        Ok(probed) => {
            probed.attempts.iter().for_each(print_attempt);
            match (probed.value, probed.candidate) {
                (Some(link), Some(candidate)) => {
                    println!("\n✅ 直链接口: {}", candidate);
                    println!("   🔗 {}", link.url);
                    println!("\n💡 下载时需要携带 Cookie，Referer 必须为 https://pan.quark.cn\n");
                }
                _ => println!("\n⚠️ 直链未获取，查看上方尝试记录排查原因\n"),
            }
        }
        Err(e) => print_failure("获取直链", &e),
    }

    Ok(())
}
