//! # 共享 CLI 选项组
//!
//! `estimate` / `refine` / `ts` 三个子命令共用的参数组，
//! 通过 `#[command(flatten)]` 嵌入各自的 Args。
//!
//! ## 依赖关系
//! - 被 `cli/estimate.rs`, `cli/refine.rs`, `cli/ts.rs` 使用
//! - 参数最终传递给 `gctf/args.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 相位移搜索目标
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PhaseShiftTarget {
    /// Cross-correlation coefficient (stable in general cases)
    Ccc,
    /// Resolution limit (may overfit high-resolution noise)
    Res,
}

/// 显微镜采集参数
#[derive(Args, Debug, Clone)]
pub struct AcquisitionOpts {
    /// Pixel size of the micrographs in Angstroms (Gctf --apix)
    #[arg(long, value_name = "A")]
    pub apix: f64,

    /// Acceleration voltage in kV
    #[arg(long, default_value_t = 300.0)]
    pub voltage: f64,

    /// Spherical aberration in mm
    #[arg(long, default_value_t = 2.7)]
    pub cs: f64,

    /// Amplitude contrast fraction
    #[arg(long, default_value_t = 0.1)]
    pub ac: f64,

    /// Nominal magnification, used to derive the detector pixel size
    #[arg(long, default_value_t = 50000.0)]
    pub magnification: f64,
}

/// CTF 估计过程参数 (与原 Gctf 默认值一致)
#[derive(Args, Debug, Clone)]
pub struct ProcessOpts {
    /// Box size in pixels for the FFT, 512 or 1024 recommended
    #[arg(long, default_value_t = 1024)]
    pub boxsize: u32,

    // ─────────────────────────────────────────────────────────────
    // Search limits
    // ─────────────────────────────────────────────────────────────
    /// Lowest resolution of the fit range in Angstroms (clamped to 50)
    #[arg(long, default_value_t = 50.0)]
    pub low_res: f64,

    /// Highest resolution of the fit range in Angstroms
    #[arg(long, default_value_t = 4.0)]
    pub high_res: f64,

    /// Minimum defocus to search in Angstroms (underfocus is positive)
    #[arg(long, default_value_t = 5000.0)]
    pub min_defocus: f64,

    /// Maximum defocus to search in Angstroms
    #[arg(long, default_value_t = 90000.0)]
    pub max_defocus: f64,

    /// Step size for the defocus search in Angstroms
    #[arg(long, default_value_t = 500.0)]
    pub step_defocus: f64,

    /// Expected (tolerated) astigmatism in Angstroms
    #[arg(long, default_value_t = 1000.0)]
    pub astigmatism: f64,

    /// Do not plot an estimated resolution ring on the PSD file
    #[arg(long, default_value_t = false)]
    pub no_res_ring: bool,

    /// B-factor used to decrease high resolution amplitude, in A^2
    #[arg(long, default_value_t = 150)]
    pub bfactor: i32,

    // ─────────────────────────────────────────────────────────────
    // EPA options (output quality only, not used for determination)
    // ─────────────────────────────────────────────────────────────
    /// Over-sampling factor for EPA
    #[arg(long, default_value_t = 4)]
    pub epa_oversmp: u32,

    /// Overlapping factor for grid boxes sampling
    #[arg(long, default_value_t = 0.5)]
    pub overlap: f64,

    /// Box size used for smoothing, 1/5 ~ 1/20 of the window size
    #[arg(long, default_value_t = 85)]
    pub convsize: u32,

    /// Resolution for low frequency background smoothing
    #[arg(long, default_value_t = 1000)]
    pub smooth_res_l: u32,

    // ─────────────────────────────────────────────────────────────
    // High-resolution refinement
    // ─────────────────────────────────────────────────────────────
    /// Do high-resolution refinement (useful to select good micrographs)
    #[arg(long, default_value_t = false)]
    pub do_hres_ref: bool,

    /// Lowest resolution for high-resolution refinement in Angstroms
    #[arg(long, default_value_t = 15.0)]
    pub hres_res_l: f64,

    /// Highest resolution for high-resolution refinement in Angstroms
    #[arg(long, default_value_t = 4.0)]
    pub hres_res_h: f64,

    /// B-factor for high-resolution refinement
    #[arg(long, default_value_t = 50)]
    pub hres_bfac: i32,

    /// Validate the CTF determination
    #[arg(long, default_value_t = false)]
    pub do_validation: bool,

    // ─────────────────────────────────────────────────────────────
    // Phase shift search (phase-plate data)
    // ─────────────────────────────────────────────────────────────
    /// Estimate phase shift (for micrographs collected with phase-plate)
    #[arg(long, default_value_t = false)]
    pub phase_shift: bool,

    /// Lowest phase shift to search in degrees
    #[arg(long, default_value_t = 0.0)]
    pub ps_low: f64,

    /// Highest phase shift to search in degrees
    #[arg(long, default_value_t = 180.0)]
    pub ps_high: f64,

    /// Phase shift search step in degrees (refined afterwards anyway)
    #[arg(long, default_value_t = 10.0)]
    pub ps_step: f64,

    /// Phase shift search target
    #[arg(long, value_enum, default_value = "ccc")]
    pub ps_target: PhaseShiftTarget,

    /// Do refinement during phase shift search instead of after it
    #[arg(long, default_value_t = false)]
    pub cosearch_refine: bool,

    /// Phase shift refinement type (1, 2 or 3)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=3))]
    pub refine_2d_t: u32,
}

/// 运行控制参数
#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    /// Path to the Gctf executable (overrides GCTF_HOME/GCTF lookup)
    #[arg(long, env = "GCTF_BIN")]
    pub gctf_bin: Option<PathBuf>,

    /// GPU device ids to use, comma-separated (e.g. '0,1,2')
    #[arg(long, default_value = "0")]
    pub gpus: String,

    /// Number of parallel Gctf processes (0 = all cores)
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Directory where PSD files, logs and results are placed
    #[arg(long, default_value = "ctf_output")]
    pub output_dir: PathBuf,

    /// Filename for the CSV results summary
    #[arg(long, default_value = "ctf_results.csv")]
    pub summary: PathBuf,
}

impl RunOpts {
    /// GPU id 列表 (至少一个)
    pub fn gpu_list(&self) -> Vec<String> {
        let gpus: Vec<String> = self
            .gpus
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if gpus.is_empty() {
            vec!["0".to_string()]
        } else {
            gpus
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_opts(gpus: &str) -> RunOpts {
        RunOpts {
            gctf_bin: None,
            gpus: gpus.to_string(),
            jobs: 1,
            output_dir: "ctf_output".into(),
            summary: "ctf_results.csv".into(),
        }
    }

    #[test]
    fn test_gpu_list_parsing() {
        assert_eq!(run_opts("0,1").gpu_list(), vec!["0", "1"]);
        assert_eq!(run_opts(" 0 , 2 ").gpu_list(), vec!["0", "2"]);
        assert_eq!(run_opts("3").gpu_list(), vec!["3"]);
    }

    #[test]
    fn test_gpu_list_empty_falls_back_to_zero() {
        assert_eq!(run_opts("").gpu_list(), vec!["0"]);
        assert_eq!(run_opts(" , ").gpu_list(), vec!["0"]);
    }
}
