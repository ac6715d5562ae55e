//! # CTF 估算命令
//!
//! 批量调用 Gctf 对显微照片做 CTF 估算,收集日志结果并生成汇总表。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs` 调用
//! - `ts`/`refine` 复用本模块的单张执行与汇总逻辑

use std::fs;
use std::path::{Path, PathBuf};

use tabled::{Table, Tabled};

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::estimate::EstimateArgs;
use crate::error::{CtfKitError, Result};
use crate::gctf::runner::{link_or_copy, move_file, run_gctf};
use crate::gctf::{GctfParams, GctfProgram};
use crate::models::micrograph::base_name;
use crate::models::CtfModel;
use crate::parsers::gctf_log::read_ctf_model;
use crate::utils::output;

/// CTF 汇总表格行
#[derive(Tabled)]
pub(crate) struct CtfRow {
    #[tabled(rename = "Micrograph")]
    pub micrograph: String,
    #[tabled(rename = "DefU (A)")]
    pub defocus_u: String,
    #[tabled(rename = "DefV (A)")]
    pub defocus_v: String,
    #[tabled(rename = "Astig (A)")]
    pub astigmatism: String,
    #[tabled(rename = "Angle (deg)")]
    pub angle: String,
    #[tabled(rename = "Phase (deg)")]
    pub phase_shift: String,
    #[tabled(rename = "Res (A)")]
    pub resolution: String,
    #[tabled(rename = "Score")]
    pub score: String,
}

impl CtfRow {
    pub(crate) fn from_model(name: &str, ctf: &CtfModel) -> Self {
        if ctf.is_wrong() {
            return CtfRow {
                micrograph: name.to_string(),
                defocus_u: "-".to_string(),
                defocus_v: "-".to_string(),
                astigmatism: "-".to_string(),
                angle: "-".to_string(),
                phase_shift: "-".to_string(),
                resolution: "-".to_string(),
                score: "failed".to_string(),
            };
        }
        CtfRow {
            micrograph: name.to_string(),
            defocus_u: format!("{:.2}", ctf.defocus_u),
            defocus_v: format!("{:.2}", ctf.defocus_v),
            astigmatism: format!("{:.2}", ctf.astigmatism()),
            angle: format!("{:.2}", ctf.defocus_angle),
            phase_shift: ctf
                .phase_shift
                .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p)),
            resolution: format!("{:.2}", ctf.resolution),
            score: format!("{:.4}", ctf.cross_correlation),
        }
    }
}

pub fn execute(args: EstimateArgs) -> Result<()> {
    output::print_header("Gctf CTF Estimation");

    let program = GctfProgram::locate(args.run.gctf_bin.as_deref())?;
    output::print_info(&format!("Gctf binary: {}", program.path().display()));
    if let Some(version) = program.version() {
        output::print_info(&format!("Gctf version: {}", version));
    }

    let gpus = args.run.gpu_list();
    let runner = BatchRunner::new(args.run.jobs);
    super::check_gpu_jobs(runner.jobs(), &gpus)?;

    let files = FileCollector::new(&args.input)
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect();
    if files.is_empty() {
        return Err(CtfKitError::NoFilesFound {
            pattern: args.input.clone(),
        });
    }
    output::print_info(&format!(
        "Found {} micrographs, {} parallel jobs on GPU(s) [{}]",
        files.len(),
        runner.jobs(),
        gpus.join(", ")
    ));

    fs::create_dir_all(&args.run.output_dir).map_err(|e| CtfKitError::FileWriteError {
        path: args.run.output_dir.display().to_string(),
        source: e,
    })?;

    let do_epa = !args.no_epa;
    let params = super::build_gctf_params(&args.acquisition, &args.process, do_epa);

    let output_dir = args.run.output_dir.clone();
    let result = runner.run(files.clone(), "Estimating CTF", |index, mic| {
        let gpu = &gpus[index % gpus.len()];
        match estimate_micrograph(&program, &params.with_gpu(gpu), mic, &output_dir, do_epa) {
            Ok(()) => ProcessResult::Success(mic.display().to_string()),
            Err(e) => ProcessResult::Failed(mic.display().to_string(), e.to_string()),
        }
    });

    let models = collect_ctf_models(&files, &args.run.output_dir);
    print_ctf_table(&models);
    write_summary_csv(&models, &args.run.summary)?;

    output::print_separator();
    if result.failed > 0 {
        output::print_warning(&format!("{} micrographs failed", result.failed));
    }
    output::print_done(&format!(
        "{} micrographs estimated, summary written to '{}'",
        result.success,
        args.run.summary.display()
    ));
    Ok(())
}

/// 对单张显微照片运行 Gctf 并把输出搬到结果目录。
///
/// Gctf 把输出写在输入文件旁边,因此先在临时工作目录里建立
/// 输入链接,运行后把 PSD 与日志改名移入输出目录。
pub(crate) fn estimate_micrograph(
    program: &GctfProgram,
    params: &GctfParams,
    mic: &Path,
    output_dir: &Path,
    do_epa: bool,
) -> Result<()> {
    let base = base_name(mic);
    let workdir = output_dir.join("tmp").join(&base);
    fs::create_dir_all(&workdir).map_err(|e| CtfKitError::FileWriteError {
        path: workdir.display().to_string(),
        source: e,
    })?;

    let mic_local = workdir.join(format!("{}.mrc", base));
    link_or_copy(mic, &mic_local)?;

    let mut argv = params.build_args();
    argv.push(format!("{}.mrc", base));
    run_gctf(program, &argv, &workdir)?;

    // PSD 输出后缀取决于是否启用 EPA
    let psd_ext = if do_epa { "epa" } else { "pow" };
    move_file(
        &workdir.join(format!("{}.{}", base, psd_ext)),
        &output_dir.join(format!("{}_ctf.mrc", base)),
    )?;
    move_file(
        &workdir.join(format!("{}_gctf.log", base)),
        &output_dir.join(format!("{}_ctf.log", base)),
    )?;
    let epa_log = workdir.join(format!("{}_EPA.log", base));
    if epa_log.exists() {
        move_file(&epa_log, &output_dir.join(format!("{}_ctf_EPA.log", base)))?;
    }

    let _ = fs::remove_dir_all(&workdir);
    Ok(())
}

/// 从输出目录读取每张照片的 CTF 结果,缺失或失败的条目用哨兵值占位
pub(crate) fn collect_ctf_models(files: &[PathBuf], output_dir: &Path) -> Vec<(String, CtfModel)> {
    files
        .iter()
        .map(|mic| {
            let base = base_name(mic);
            let log = output_dir.join(format!("{}_ctf.log", base));
            let psd = output_dir.join(format!("{}_ctf.mrc", base));
            let psd_ref = psd.exists().then_some(psd.as_path());
            let ctf = read_ctf_model(&log, psd_ref).unwrap_or_else(|_| CtfModel::wrong_defocus());
            (base, ctf)
        })
        .collect()
}

pub(crate) fn print_ctf_table(models: &[(String, CtfModel)]) {
    let rows: Vec<CtfRow> = models
        .iter()
        .map(|(name, ctf)| CtfRow::from_model(name, ctf))
        .collect();
    let table = Table::new(&rows);
    println!("{}", table);
}

pub(crate) fn write_summary_csv(models: &[(String, CtfModel)], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(CtfKitError::CsvError)?;
    writer.write_record([
        "micrograph",
        "defocus_u",
        "defocus_v",
        "defocus_angle",
        "phase_shift",
        "resolution",
        "cross_correlation",
        "psd_file",
    ])?;
    for (name, ctf) in models {
        writer.write_record([
            name.clone(),
            format!("{:.6}", ctf.defocus_u),
            format!("{:.6}", ctf.defocus_v),
            format!("{:.6}", ctf.defocus_angle),
            ctf.phase_shift
                .map_or_else(String::new, |p| format!("{:.6}", p)),
            format!("{:.6}", ctf.resolution),
            format!("{:.6}", ctf.cross_correlation),
            ctf.psd_file.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush().map_err(|e| CtfKitError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctf_row_failed_entry() {
        let row = CtfRow::from_model("mic_001", &CtfModel::wrong_defocus());
        assert_eq!(row.score, "failed");
        assert_eq!(row.defocus_u, "-");
    }

    #[test]
    fn test_summary_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let mut ctf = CtfModel::standard(23100.0, 22800.0, 54.1);
        ctf.resolution = 3.8;
        write_summary_csv(&[("mic_001".to_string(), ctf)], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("micrograph,"));
        assert!(content.contains("mic_001,23100.000000,22800.000000"));
    }
}
