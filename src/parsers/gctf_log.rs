//! # Gctf 日志解析器
//!
//! 从 Gctf 运行日志 (`*_gctf.log`) 中提取最终的 CTF 估计值。
//! 两个关键行:
//! - `Final Values`: 散焦 U、V、角度，之后要么直接是交叉相关系数，
//!   要么先是相位移再是交叉相关系数 (由第五列是否为 `Final` 区分)
//! - `Resolution limit estimated by EPA`: 行尾是分辨率极限，
//!   可能带 ANSI 转义序列
//!
//! ## 依赖关系
//! - 被 `commands/estimate.rs`, `commands/ts.rs`, `commands/import.rs` 使用
//! - 使用 `models/ctf.rs`

use crate::error::{CtfKitError, Result};
use crate::models::CtfModel;

use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 从日志中提取的原始数值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GctfLogValues {
    pub defocus_u: f64,
    pub defocus_v: f64,
    pub defocus_angle: f64,
    pub cross_correlation: f64,
    pub phase_shift: f64,
    pub resolution: f64,
}

/// 解析 Gctf 日志文件。
///
/// 文件不存在返回 `Ok(None)` (调用方告警后按无结果处理)；
/// 存在但缺少期望行时对应字段保持 0。
pub fn parse_gctf_log(path: &Path) -> Result<Option<GctfLogValues>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| CtfKitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let ansi_escape = Regex::new(r"\x1b[^m]*m").unwrap();
    let mut values = GctfLogValues::default();

    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        // "23435.74  23051.91  54.09  0.1234  Final Values"
        // "23435.74  23051.91  54.09  45.00  0.1234  Final Values"  (相位移)
        if line.contains("Final Values") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                continue;
            }

            let (Ok(u), Ok(v), Ok(angle)) = (
                parts[0].parse::<f64>(),
                parts[1].parse::<f64>(),
                parts[2].parse::<f64>(),
            ) else {
                continue;
            };

            values.defocus_u = u;
            values.defocus_v = v;
            values.defocus_angle = angle;

            if parts[4] == "Final" {
                // 无相位移
                values.cross_correlation = parts[3].parse().unwrap_or(0.0);
            } else {
                values.phase_shift = parts[3].parse().unwrap_or(0.0);
                values.cross_correlation = parts[4].parse().unwrap_or(0.0);
            }
        }

        if line.contains("Resolution limit estimated by EPA") {
            let clean = ansi_escape.replace_all(&line, "");
            if let Some(last) = clean.trim().split_whitespace().last() {
                values.resolution = last.parse().unwrap_or(0.0);
            }
            break;
        }
    }

    Ok(Some(values))
}

/// 把日志结果转成 `CtfModel`；无结果时返回哨兵模型
pub fn read_ctf_model(path: &Path, psd_file: Option<&Path>) -> Result<CtfModel> {
    let mut ctf = match parse_gctf_log(path)? {
        Some(values) => {
            let mut ctf =
                CtfModel::standard(values.defocus_u, values.defocus_v, values.defocus_angle);
            ctf.cross_correlation = values.cross_correlation;
            ctf.resolution = values.resolution;
            // 相位移为 0 视为未估计
            if values.phase_shift != 0.0 {
                ctf.phase_shift = Some(values.phase_shift);
            }
            ctf
        }
        None => CtfModel::wrong_defocus(),
    };

    if let Some(psd) = psd_file {
        ctf.psd_file = Some(psd.display().to_string());
    }

    Ok(ctf)
}
