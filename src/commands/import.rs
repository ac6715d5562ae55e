//! # 结果导入命令
//!
//! 从已有的 Gctf 日志目录读取 CTF 结果 (不重新运行 Gctf),
//! 自动匹配相邻的 PSD 文件并生成汇总。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs` 调用
//! - 复用 `commands/estimate.rs` 的表格与 CSV 汇总

use std::path::{Path, PathBuf};

use crate::batch::FileCollector;
use crate::cli::import::ImportArgs;
use crate::error::{CtfKitError, Result};
use crate::models::CtfModel;
use crate::parsers::gctf_log::read_ctf_model;
use crate::utils::output;

use super::estimate::{print_ctf_table, write_summary_csv};

pub fn execute(args: ImportArgs) -> Result<()> {
    output::print_header("Importing Gctf Results");

    if !args.log_dir.is_dir() {
        return Err(CtfKitError::DirectoryNotFound {
            path: args.log_dir.display().to_string(),
        });
    }

    let logs = FileCollector::new(args.log_dir.display().to_string())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect();
    if logs.is_empty() {
        return Err(CtfKitError::NoFilesFound {
            pattern: format!("{}/{}", args.log_dir.display(), args.pattern),
        });
    }
    output::print_info(&format!("Found {} log files", logs.len()));

    let mut models: Vec<(String, CtfModel)> = Vec::with_capacity(logs.len());
    for log in &logs {
        let psd = find_psd_file(log);
        let ctf = read_ctf_model(log, psd.as_deref())?;
        if ctf.is_wrong() {
            output::print_warning(&format!("No CTF values in '{}'", log.display()));
        }
        models.push((micrograph_name(log), ctf));
    }

    print_ctf_table(&models);
    write_summary_csv(&models, &args.summary)?;

    output::print_separator();
    output::print_done(&format!(
        "{} results imported, summary written to '{}'",
        models.len(),
        args.summary.display()
    ));
    Ok(())
}

/// 日志文件名还原 micrograph 名 (去掉估算时附加的后缀)
fn micrograph_name(log: &Path) -> String {
    let stem = log
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.strip_suffix("_gctf")
        .or_else(|| stem.strip_suffix("_ctf"))
        .unwrap_or(&stem)
        .to_string()
}

/// 在日志旁查找对应的 PSD 文件。
///
/// 依次尝试常见后缀,前缀包括日志主名本身以及去掉
/// `_ctffind3` / `_gctf` 标记的变体。
pub(crate) fn find_psd_file(log: &Path) -> Option<PathBuf> {
    let dir = log.parent()?;
    let stem = log.file_stem()?.to_str()?;
    let prefixes = [
        stem.to_string(),
        stem.replace("_ctffind3", ""),
        stem.replace("_gctf", ""),
    ];
    for suffix in ["_psd.mrc", ".mrc", "_ctf.mrcs", ".mrcs", ".ctf"] {
        for prefix in &prefixes {
            let candidate = dir.join(format!("{}{}", prefix, suffix));
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::PathBuf;

    #[test]
    fn test_micrograph_name_strips_log_suffixes() {
        assert_eq!(micrograph_name(&PathBuf::from("a/mic_001_gctf.log")), "mic_001");
        assert_eq!(micrograph_name(&PathBuf::from("mic_001_ctf.log")), "mic_001");
        assert_eq!(micrograph_name(&PathBuf::from("mic_001.log")), "mic_001");
    }

    #[test]
    fn test_find_psd_file_strips_gctf_marker() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("mic_001_gctf.log");
        File::create(&log).unwrap();
        File::create(dir.path().join("mic_001.mrc")).unwrap();

        let psd = find_psd_file(&log).unwrap();
        assert_eq!(psd, dir.path().join("mic_001.mrc"));
    }

    #[test]
    fn test_find_psd_file_prefers_psd_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("mic_001_gctf.log");
        File::create(&log).unwrap();
        File::create(dir.path().join("mic_001.mrc")).unwrap();
        File::create(dir.path().join("mic_001_psd.mrc")).unwrap();

        let psd = find_psd_file(&log).unwrap();
        assert_eq!(psd, dir.path().join("mic_001_psd.mrc"));
    }

    #[test]
    fn test_find_psd_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("mic_001_gctf.log");
        File::create(&log).unwrap();
        assert!(find_psd_file(&log).is_none());
    }
}
