//! # refine 子命令 CLI 定义
//!
//! 基于粒子坐标的局部 CTF 精修
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/refine.rs`

use super::common::{AcquisitionOpts, ProcessOpts, RunOpts};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 局部平均权重类型 (Gctf --local_avetype)
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LocalAverageType {
    /// Equal weights for all local areas
    Equal,
    /// Single weight per local area, distance only
    Distance,
    /// Gaussian weighting for both distance and frequency
    DistanceFreq,
}

impl LocalAverageType {
    /// Gctf 命令行取值
    pub fn as_flag_value(&self) -> u32 {
        match self {
            LocalAverageType::Equal => 0,
            LocalAverageType::Distance => 1,
            LocalAverageType::DistanceFreq => 2,
        }
    }
}

/// refine 子命令参数
#[derive(Args, Debug)]
pub struct RefineArgs {
    /// Input micrograph: a .mrc file, a directory, or a glob pattern
    pub input: String,

    /// Directory with per-micrograph particle coordinate files
    /// (<base>_coords.star, <base>.star or <base>.txt)
    #[arg(long)]
    pub coords_dir: PathBuf,

    /// Scale factor applied to coordinates (particle/micrograph
    /// sampling rate ratio)
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,

    /// Filename pattern(s) when input is a directory (comma-separated)
    #[arg(long, default_value = "*.mrc")]
    pub pattern: String,

    /// Search the input directory recursively
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Do the equiphase average for the output CTF file
    #[arg(long, default_value_t = false)]
    pub epa: bool,

    // ─────────────────────────────────────────────────────────────
    // Local refinement options
    // ─────────────────────────────────────────────────────────────
    /// Lowest resolution for local CTF in Angstroms
    #[arg(long, default_value_t = 15)]
    pub loc_res_l: u32,

    /// Highest resolution for local CTF in Angstroms
    #[arg(long, default_value_t = 5)]
    pub loc_res_h: u32,

    /// Radius for local refinement in pixels, no weighting beyond it
    #[arg(long, default_value_t = 1024)]
    pub loc_radius: u32,

    /// Local average weighting type
    #[arg(long, value_enum, default_value = "distance-freq")]
    pub loc_avetype: LocalAverageType,

    /// Box size for local refinement in pixels
    #[arg(long, default_value_t = 512)]
    pub loc_boxsize: u32,

    /// Overlapping factor for grid boxes sampling
    #[arg(long, default_value_t = 0.5)]
    pub loc_overlap: f64,

    /// Refine local astigmatism, not only Z-height changes
    #[arg(long, default_value_t = false)]
    pub loc_astigmatism: bool,

    // ─────────────────────────────────────────────────────────────
    // Input CTF refinement (instead of ab initio determination)
    // ─────────────────────────────────────────────────────────────
    /// CSV with previously estimated CTFs to refine
    /// (columns: micrograph,defocus_u,defocus_v,defocus_angle)
    #[arg(long)]
    pub input_ctf: Option<PathBuf>,

    /// Estimated error of the initial defocus U in Angstroms
    #[arg(long, default_value_t = 500.0)]
    pub def_u_err: f64,

    /// Estimated error of the initial defocus V in Angstroms
    #[arg(long, default_value_t = 500.0)]
    pub def_v_err: f64,

    /// Estimated error of the initial defocus angle in degrees
    #[arg(long, default_value_t = 15.0)]
    pub def_a_err: f64,

    /// Estimated error of the initial B-factor
    #[arg(long, default_value_t = 50.0)]
    pub b_err: f64,

    #[command(flatten)]
    pub acquisition: AcquisitionOpts,

    #[command(flatten)]
    pub process: ProcessOpts,

    #[command(flatten)]
    pub run: RunOpts,
}
