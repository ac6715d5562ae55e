//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `estimate`: micrograph CTF 估计
//! - `refine`: 局部 CTF 精修
//! - `ts`: 倾转系列 CTF 估计
//! - `import`: 导入已有 Gctf 结果
//! - `plot`: EPA 拟合曲线绘图
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, estimate, refine, ts, import, plot

pub mod common;
pub mod estimate;
pub mod import;
pub mod plot;
pub mod refine;
pub mod ts;

use clap::{Parser, Subcommand};

/// ctfkit - Gctf CTF 估计统一工具箱
#[derive(Parser)]
#[command(name = "ctfkit")]
#[command(version)]
#[command(about = "A unified Gctf CTF estimation toolkit for cryo-EM", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Estimate CTF on a set of micrographs using Gctf
    Estimate(estimate::EstimateArgs),

    /// Refine local (per-particle) CTF using particle coordinates
    Refine(refine::RefineArgs),

    /// Estimate CTF on a tilt series, one result per tilt image
    Ts(ts::TsArgs),

    /// Import CTF results from logs of a previous Gctf run
    Import(import::ImportArgs),

    /// Plot the EPA fit curves from a Gctf _EPA.log file
    Plot(plot::PlotArgs),
}
