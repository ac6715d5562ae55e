//! # import 子命令 CLI 定义
//!
//! 导入已有 Gctf 运行产生的日志结果
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/import.rs`

use clap::Args;
use std::path::PathBuf;

/// import 子命令参数
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Directory containing Gctf log files from a previous run
    pub log_dir: PathBuf,

    /// Filename pattern(s) for the log files (comma-separated)
    #[arg(long, default_value = "*_gctf.log,*_ctf.log")]
    pub pattern: String,

    /// Search the log directory recursively
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Filename for the CSV results summary
    #[arg(long, default_value = "imported_ctf.csv")]
    pub summary: PathBuf,
}
