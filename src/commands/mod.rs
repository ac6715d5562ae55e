//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `gctf/`, `parsers/`, `models/`, `batch/`, `utils/`
//! - 子模块: estimate, refine, ts, import, plot

pub mod estimate;
pub mod import;
pub mod plot;
pub mod refine;
pub mod ts;

use crate::cli::common::{AcquisitionOpts, PhaseShiftTarget, ProcessOpts};
use crate::cli::Commands;
use crate::error::{CtfKitError, Result};
use crate::gctf::{GctfParams, HighResParams, PhaseShiftParams};
use crate::models::Acquisition;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Estimate(args) => estimate::execute(args),
        Commands::Refine(args) => refine::execute(args),
        Commands::Ts(args) => ts::execute(args),
        Commands::Import(args) => import::execute(args),
        Commands::Plot(args) => plot::execute(args),
    }
}

/// 由共享 CLI 选项组拼装 Gctf 参数 (GPU id 由批量执行时轮换填入)
pub(crate) fn build_gctf_params(
    acq: &AcquisitionOpts,
    process: &ProcessOpts,
    do_epa: bool,
) -> GctfParams {
    GctfParams {
        acquisition: Acquisition {
            voltage: acq.voltage,
            spherical_aberration: acq.cs,
            amplitude_contrast: acq.ac,
            magnification: acq.magnification,
            sampling_rate: acq.apix,
        },
        min_defocus: process.min_defocus,
        max_defocus: process.max_defocus,
        step_defocus: process.step_defocus,
        astigmatism: process.astigmatism,
        low_res: process.low_res,
        high_res: process.high_res,
        do_epa,
        box_size: process.boxsize,
        plot_res_ring: !process.no_res_ring,
        gpu_id: "0".to_string(),
        bfactor: process.bfactor,
        overlap: process.overlap,
        convsize: process.convsize,
        smooth_res_l: Some(process.smooth_res_l),
        epa_oversmp: process.epa_oversmp,
        phase_shift: process.phase_shift.then(|| PhaseShiftParams {
            low: process.ps_low,
            high: process.ps_high,
            step: process.ps_step,
            target: match process.ps_target {
                PhaseShiftTarget::Ccc => 1,
                PhaseShiftTarget::Res => 2,
            },
            cosearch_refine: process.cosearch_refine,
            refine_2d_t: process.refine_2d_t,
        }),
        high_res_ref: process.do_hres_ref.then(|| HighResParams {
            res_low: process.hres_res_l,
            res_high: process.hres_res_h,
            bfactor: process.hres_bfac,
        }),
        local_refine: None,
        input_ctf: None,
        do_validation: process.do_validation,
    }
}

/// 单个 Gctf 进程只能用一块 GPU：并行数必须覆盖 GPU 数
pub(crate) fn check_gpu_jobs(jobs: usize, gpus: &[String]) -> Result<()> {
    if jobs < gpus.len() {
        return Err(CtfKitError::InvalidArgument(format!(
            "a single Gctf process cannot use several GPUs; \
             raise --jobs to at least {} (one per GPU)",
            gpus.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchRunner, ProcessResult};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[test]
    fn test_jobs_must_cover_gpus() {
        let gpus = vec!["0".to_string(), "1".to_string()];

        assert!(matches!(
            check_gpu_jobs(1, &gpus),
            Err(CtfKitError::InvalidArgument(_))
        ));
        assert!(check_gpu_jobs(2, &gpus).is_ok());
        assert!(check_gpu_jobs(3, &gpus).is_ok());
    }

    #[test]
    fn test_round_robin_gpu_assignment() {
        let gpus = vec!["0".to_string(), "1".to_string(), "2".to_string()];
        let files: Vec<PathBuf> = (0..6).map(|i| format!("mic_{:03}.mrc", i).into()).collect();
        let seen = Mutex::new(vec![String::new(); files.len()]);

        let runner = BatchRunner::new(3);
        let result = runner.run(files, "assigning", |index, _file| {
            seen.lock().unwrap()[index] = gpus[index % gpus.len()].clone();
            ProcessResult::Success(index.to_string())
        });

        assert_eq!(result.success, 6);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["0", "1", "2", "0", "1", "2"]
        );
    }
}
