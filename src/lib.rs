//! 夸克网盘分享链接解析（文件列表 + 下载直链）

pub mod config;
pub mod quark;

pub use config::Config;
pub use quark::ResolutionEngine;

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
