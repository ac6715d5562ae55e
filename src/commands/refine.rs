//! # 局部 CTF 精修命令
//!
//! 在已有颗粒坐标的基础上调用 Gctf 做逐颗粒散焦精修,
//! 解析生成的 `_local.star` 并汇总为 CSV。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs` 调用
//! - 复用 `estimate` 的工作目录与输出搬移流程

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tabled::{Table, Tabled};

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::refine::RefineArgs;
use crate::error::{CtfKitError, Result};
use crate::gctf::runner::{link_or_copy, move_file, run_gctf};
use crate::gctf::{GctfParams, GctfProgram, InputCtfParams, LocalRefineParams};
use crate::models::micrograph::base_name;
use crate::parsers::star::{parse_local_star, read_coordinates, CoordinatesWriter};
use crate::utils::output;

/// 精修汇总表格行
#[derive(Tabled)]
struct RefineRow {
    #[tabled(rename = "Micrograph")]
    micrograph: String,
    #[tabled(rename = "Particles")]
    particles: String,
    #[tabled(rename = "Mean DefU (A)")]
    mean_defocus_u: String,
    #[tabled(rename = "Mean DefV (A)")]
    mean_defocus_v: String,
}

/// 输入 CTF CSV 的行格式 (与 estimate 汇总 CSV 兼容)
#[derive(Deserialize)]
struct InputCtfRecord {
    micrograph: String,
    defocus_u: f64,
    defocus_v: f64,
    defocus_angle: f64,
}

pub fn execute(args: RefineArgs) -> Result<()> {
    output::print_header("Gctf Local CTF Refinement");

    let program = GctfProgram::locate(args.run.gctf_bin.as_deref())?;
    output::print_info(&format!("Gctf binary: {}", program.path().display()));
    if !program.supports_local_refine() {
        return Err(CtfKitError::UnsupportedVersion {
            version: program.version().unwrap_or("unknown").to_string(),
            reason: "local refinement requires Gctf 1.06 or earlier".to_string(),
        });
    }

    if !args.coords_dir.is_dir() {
        return Err(CtfKitError::DirectoryNotFound {
            path: args.coords_dir.display().to_string(),
        });
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
    output::print_info(&format!("Found {} micrographs", files.len()));

    let input_ctf = match &args.input_ctf {
        Some(path) => Some(read_input_ctf_csv(path)?),
        None => None,
    };

    fs::create_dir_all(&args.run.output_dir).map_err(|e| CtfKitError::FileWriteError {
        path: args.run.output_dir.display().to_string(),
        source: e,
    })?;

    let mut params = super::build_gctf_params(&args.acquisition, &args.process, args.epa);
    // 局部精修调用不传 --smooth_resL
    params.smooth_res_l = None;
    params.local_refine = Some(LocalRefineParams {
        radius: args.loc_radius,
        ave_type: args.loc_avetype.as_flag_value(),
        box_size: args.loc_boxsize,
        overlap: args.loc_overlap,
        res_low: args.loc_res_l,
        res_high: args.loc_res_h,
        refine_astigmatism: args.loc_astigmatism,
    });

    let output_dir = args.run.output_dir.clone();
    let result = runner.run(files.clone(), "Refining CTF", |index, mic| {
        let base = base_name(mic);
        let Some(coords) = find_coords_file(&args.coords_dir, &base) else {
            return ProcessResult::Skipped(format!("{}: no coordinates found", base));
        };

        let mut mic_params = params.with_gpu(&gpus[index % gpus.len()]);
        if let Some(map) = &input_ctf {
            mic_params.input_ctf = map.get(&base).map(|rec| InputCtfParams {
                defocus_u: rec.defocus_u,
                defocus_v: rec.defocus_v,
                defocus_angle: rec.defocus_angle,
                bfactor: args.process.bfactor as f64,
                defocus_u_err: args.def_u_err,
                defocus_v_err: args.def_v_err,
                defocus_angle_err: args.def_a_err,
                bfactor_err: args.b_err,
            });
        }

        match refine_micrograph(&program, &mic_params, mic, &coords, args.scale, &output_dir) {
            Ok(()) => ProcessResult::Success(mic.display().to_string()),
            Err(e) => ProcessResult::Failed(mic.display().to_string(), e.to_string()),
        }
    });

    write_local_summary(&files, &args.run.output_dir, &args.run.summary)?;

    output::print_separator();
    if result.skipped > 0 {
        output::print_warning(&format!("{} micrographs skipped (no coordinates)", result.skipped));
    }
    if result.failed > 0 {
        output::print_warning(&format!("{} micrographs failed", result.failed));
    }
    output::print_done(&format!(
        "{} micrographs refined, per-particle summary written to '{}'",
        result.success,
        args.run.summary.display()
    ));
    Ok(())
}

/// 按 `<base>_coords.star` > `<base>.star` > `<base>.txt` 的顺序查找坐标文件
fn find_coords_file(coords_dir: &Path, base: &str) -> Option<PathBuf> {
    let candidates = [
        format!("{}_coords.star", base),
        format!("{}.star", base),
        format!("{}.txt", base),
    ];
    candidates
        .iter()
        .map(|name| coords_dir.join(name))
        .find(|path| path.exists())
}

fn read_input_ctf_csv(path: &Path) -> Result<HashMap<String, InputCtfRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(CtfKitError::CsvError)?;
    let mut map = HashMap::new();
    for record in reader.deserialize() {
        let record: InputCtfRecord = record?;
        map.insert(record.micrograph.clone(), record);
    }
    if map.is_empty() {
        return Err(CtfKitError::ParseError {
            format: "input CTF CSV".to_string(),
            path: path.display().to_string(),
            reason: "no records found".to_string(),
        });
    }
    Ok(map)
}

/// 对单张照片执行局部精修。颗粒坐标按指定比例缩放后写入
/// 工作目录里的 `<base>_coords.star`,这是 Gctf 要求的盒子后缀。
fn refine_micrograph(
    program: &GctfProgram,
    params: &GctfParams,
    mic: &Path,
    coords: &Path,
    scale: f64,
    output_dir: &Path,
) -> Result<()> {
    let base = base_name(mic);
    let workdir = output_dir.join("tmp").join(&base);
    fs::create_dir_all(&workdir).map_err(|e| CtfKitError::FileWriteError {
        path: workdir.display().to_string(),
        source: e,
    })?;

    let mic_local = workdir.join(format!("{}.mrc", base));
    link_or_copy(mic, &mic_local)?;

    let points = read_coordinates(coords)?;
    let star_path = workdir.join(format!("{}_coords.star", base));
    let mut writer = CoordinatesWriter::create(&star_path)?;
    for (x, y) in &points {
        writer.write_coord(x * scale, y * scale)?;
    }
    writer.close()?;

    let mut argv = params.build_args();
    argv.push(format!("{}.mrc", base));
    run_gctf(program, &argv, &workdir)?;

    move_file(
        &workdir.join(format!("{}.ctf", base)),
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
    move_file(
        &workdir.join(format!("{}_local.star", base)),
        &output_dir.join(format!("{}_local.star", base)),
    )?;

    let _ = fs::remove_dir_all(&workdir);
    Ok(())
}

/// 汇总所有 `_local.star` 为一张逐颗粒 CSV,并打印每张照片的统计表
fn write_local_summary(files: &[PathBuf], output_dir: &Path, summary: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(summary).map_err(CtfKitError::CsvError)?;
    writer.write_record([
        "micrograph",
        "x",
        "y",
        "defocus_u",
        "defocus_v",
        "defocus_angle",
        "figure_of_merit",
    ])?;

    let mut table_rows = Vec::new();
    for mic in files {
        let base = base_name(mic);
        let star = output_dir.join(format!("{}_local.star", base));
        if !star.exists() {
            continue;
        }
        let rows = parse_local_star(&star)?;
        let (mut sum_u, mut sum_v) = (0.0, 0.0);
        for row in &rows {
            sum_u += row.defocus_u;
            sum_v += row.defocus_v;
            writer.write_record([
                base.clone(),
                format!("{:.2}", row.x),
                format!("{:.2}", row.y),
                format!("{:.6}", row.defocus_u),
                format!("{:.6}", row.defocus_v),
                format!("{:.6}", row.defocus_angle),
                row.figure_of_merit
                    .map_or_else(String::new, |f| format!("{:.6}", f)),
            ])?;
        }
        let n = rows.len() as f64;
        table_rows.push(RefineRow {
            micrograph: base,
            particles: rows.len().to_string(),
            mean_defocus_u: if rows.is_empty() {
                "-".to_string()
            } else {
                format!("{:.2}", sum_u / n)
            },
            mean_defocus_v: if rows.is_empty() {
                "-".to_string()
            } else {
                format!("{:.2}", sum_v / n)
            },
        });
    }
    writer.flush().map_err(|e| CtfKitError::FileWriteError {
        path: summary.display().to_string(),
        source: e,
    })?;

    if !table_rows.is_empty() {
        let table = Table::new(&table_rows);
        println!("{}", table);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_find_coords_file_priority() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("mic_001.star")).unwrap();
        File::create(dir.path().join("mic_001_coords.star")).unwrap();

        let found = find_coords_file(dir.path(), "mic_001").unwrap();
        assert_eq!(found, dir.path().join("mic_001_coords.star"));

        assert!(find_coords_file(dir.path(), "mic_002").is_none());
    }

    #[test]
    fn test_read_input_ctf_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctf.csv");
        fs::write(
            &path,
            "micrograph,defocus_u,defocus_v,defocus_angle,phase_shift,resolution,cross_correlation,psd_file\n\
             mic_001,23100.0,22800.0,54.1,,3.8,0.12,\n",
        )
        .unwrap();

        let map = read_input_ctf_csv(&path).unwrap();
        assert_eq!(map.len(), 1);
        assert!((map["mic_001"].defocus_u - 23100.0).abs() < 1e-9);
    }
}
