//! # 倾斜序列 CTF 估算命令
//!
//! 对一个倾斜序列 (tilt-series) 目录里的逐张图像做 CTF 估算,
//! 结果按采集顺序编号并汇总。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs` 调用
//! - 复用 `commands/estimate.rs` 的单张执行逻辑

use std::fs;
use std::path::Path;

use tabled::{Table, Tabled};

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::ts::TsArgs;
use crate::error::{CtfKitError, Result};
use crate::gctf::GctfProgram;
use crate::models::micrograph::base_name;
use crate::models::TiltImageCtf;
use crate::utils::output;

use super::estimate::{collect_ctf_models, estimate_micrograph, CtfRow};

/// 倾斜序列汇总表格行
#[derive(Tabled)]
struct TiltRow {
    #[tabled(rename = "#")]
    acq_index: usize,
    #[tabled(inline)]
    ctf: CtfRow,
}

pub fn execute(args: TsArgs) -> Result<()> {
    output::print_header("Gctf Tilt-Series CTF Estimation");

    if !args.series_dir.is_dir() {
        return Err(CtfKitError::DirectoryNotFound {
            path: args.series_dir.display().to_string(),
        });
    }
    let ts_id = args
        .ts_id
        .clone()
        .unwrap_or_else(|| base_name(&args.series_dir));

    let program = GctfProgram::locate(args.run.gctf_bin.as_deref())?;
    output::print_info(&format!("Gctf binary: {}", program.path().display()));

    let gpus = args.run.gpu_list();
    let runner = BatchRunner::new(args.run.jobs);
    super::check_gpu_jobs(runner.jobs(), &gpus)?;

    // 按文件名排序即采集顺序
    let files = FileCollector::new(args.series_dir.display().to_string())
        .with_pattern(&args.pattern)
        .collect();
    if files.is_empty() {
        return Err(CtfKitError::NoFilesFound {
            pattern: format!("{}/{}", args.series_dir.display(), args.pattern),
        });
    }
    output::print_info(&format!(
        "Tilt-series '{}': {} tilt images",
        ts_id,
        files.len()
    ));

    fs::create_dir_all(&args.run.output_dir).map_err(|e| CtfKitError::FileWriteError {
        path: args.run.output_dir.display().to_string(),
        source: e,
    })?;

    let do_epa = !args.no_epa;
    let params = super::build_gctf_params(&args.acquisition, &args.process, do_epa);
    let output_dir = args.run.output_dir.clone();

    let result = runner.run(files.clone(), "Estimating tilt CTF", |index, image| {
        let gpu = &gpus[index % gpus.len()];
        match estimate_micrograph(&program, &params.with_gpu(gpu), image, &output_dir, do_epa) {
            Ok(()) => ProcessResult::Success(image.display().to_string()),
            Err(e) => ProcessResult::Failed(image.display().to_string(), e.to_string()),
        }
    });

    let models = collect_ctf_models(&files, &args.run.output_dir);
    let records: Vec<TiltImageCtf> = models
        .iter()
        .enumerate()
        .map(|(i, (name, ctf))| TiltImageCtf {
            acq_index: i + 1,
            image: name.clone(),
            ctf: ctf.clone(),
        })
        .collect();

    print_tilt_table(&records);
    write_tilt_csv(&records, &ts_id, &args.run.summary)?;

    output::print_separator();
    if result.failed > 0 {
        output::print_warning(&format!("{} tilt images failed", result.failed));
    }
    output::print_done(&format!(
        "Tilt-series '{}' done, summary written to '{}'",
        ts_id,
        args.run.summary.display()
    ));
    Ok(())
}

fn print_tilt_table(records: &[TiltImageCtf]) {
    let rows: Vec<TiltRow> = records
        .iter()
        .map(|rec| TiltRow {
            acq_index: rec.acq_index,
            ctf: CtfRow::from_model(&rec.image, &rec.ctf),
        })
        .collect();
    let table = Table::new(&rows);
    println!("{}", table);
}

fn write_tilt_csv(records: &[TiltImageCtf], ts_id: &str, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(CtfKitError::CsvError)?;
    writer.write_record([
        "ts_id",
        "acq_index",
        "image",
        "defocus_u",
        "defocus_v",
        "defocus_angle",
        "phase_shift",
        "resolution",
        "cross_correlation",
    ])?;
    for rec in records {
        writer.write_record([
            ts_id.to_string(),
            rec.acq_index.to_string(),
            rec.image.clone(),
            format!("{:.6}", rec.ctf.defocus_u),
            format!("{:.6}", rec.ctf.defocus_v),
            format!("{:.6}", rec.ctf.defocus_angle),
            rec.ctf
                .phase_shift
                .map_or_else(String::new, |p| format!("{:.6}", p)),
            format!("{:.6}", rec.ctf.resolution),
            format!("{:.6}", rec.ctf.cross_correlation),
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
    use crate::models::CtfModel;

    #[test]
    fn test_tilt_csv_keeps_acquisition_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.csv");
        let records: Vec<TiltImageCtf> = (1..=3)
            .map(|i| TiltImageCtf {
                acq_index: i,
                image: format!("ts01_{:03}", i),
                ctf: CtfModel::standard(20000.0 + i as f64, 19000.0, 10.0),
            })
            .collect();
        write_tilt_csv(&records, "ts01", &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("ts01,1,ts01_001"));
        assert!(lines[3].starts_with("ts01,3,ts01_003"));
    }
}
