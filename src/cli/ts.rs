//! # ts 子命令 CLI 定义
//!
//! 倾转系列 (tilt series) 逐帧 CTF 估计
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/ts.rs`

use super::common::{AcquisitionOpts, ProcessOpts, RunOpts};
use clap::Args;
use std::path::PathBuf;

/// ts 子命令参数
#[derive(Args, Debug)]
pub struct TsArgs {
    /// Directory containing the tilt images of one series (.mrc files,
    /// sorted name order is taken as the acquisition order)
    pub series_dir: PathBuf,

    /// Identifier of the tilt series, defaults to the directory name
    #[arg(long)]
    pub ts_id: Option<String>,

    /// Filename pattern(s) for the tilt images (comma-separated)
    #[arg(long, default_value = "*.mrc")]
    pub pattern: String,

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
