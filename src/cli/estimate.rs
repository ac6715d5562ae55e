//! # estimate 子命令 CLI 定义
//!
//! 对一组 micrograph 运行 Gctf CTF 估计
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/estimate.rs`

use super::common::{AcquisitionOpts, ProcessOpts, RunOpts};
use clap::Args;

/// estimate 子命令参数
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Input micrograph: a .mrc file, a directory, or a glob pattern
    pub input: String,

    /// Filename pattern(s) when input is a directory (comma-separated)
    #[arg(long, default_value = "*.mrc")]
    pub pattern: String,

    /// Search the input directory recursively
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Skip the equiphase average (EPA) used for the output CTF file
    #[arg(long, default_value_t = false)]
    pub no_epa: bool,

    #[command(flatten)]
    pub acquisition: AcquisitionOpts,

    #[command(flatten)]
    pub process: ProcessOpts,

    #[command(flatten)]
    pub run: RunOpts,
}
