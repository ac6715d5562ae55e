//! # plot 子命令 CLI 定义
//!
//! 绘制 Gctf _EPA.log 拟合曲线
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/plot.rs`

use clap::Args;
use std::path::PathBuf;

/// plot 子命令参数
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Path to the Gctf _EPA.log file
    pub epa_log: PathBuf,

    /// Matching Gctf log file, used for the CTF values in the subtitle
    /// (defaults to the .log next to the EPA log, if present)
    #[arg(long)]
    pub ctf_log: Option<PathBuf>,

    /// Output image path; .svg extension selects the SVG backend
    #[arg(long, default_value = "ctf_fit.png")]
    pub output: PathBuf,

    /// EPA log written by Gctf v1.18 (extra background column)
    #[arg(long, default_value_t = false)]
    pub new_format: bool,

    /// Chart width in pixels
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Chart height in pixels
    #[arg(long, default_value_t = 700)]
    pub height: u32,
}
