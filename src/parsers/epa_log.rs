//! # EPA 日志解析器
//!
//! 解析 Gctf 的 `*_EPA.log` 拟合曲线表。列依版本而变：
//! v1.18 在等相平均和交叉相关之间多一列背景值。
//!
//! 旧格式列: Resolution | Sim.CTF | EPA(Ln|F|) | EPA(Ln|F|-Bg) | CCC
//! 新格式列: Resolution | Sim.CTF | EPA(Ln|F|) | Bg | EPA(Ln|F|-Bg) | CCC
//!
//! ## 依赖关系
//! - 被 `commands/plot.rs` 使用

use crate::error::{CtfKitError, Result};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 绘图关心的三条曲线，横轴为分辨率 (Å)
#[derive(Debug, Clone, Default)]
pub struct EpaCurves {
    pub resolution: Vec<f64>,
    pub sim_ctf: Vec<f64>,
    pub epa_minus_bg: Vec<f64>,
    pub cross_correlation: Vec<f64>,
}

impl EpaCurves {
    pub fn len(&self) -> usize {
        self.resolution.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolution.is_empty()
    }
}

/// 解析 EPA 日志；`new_format` 对应 Gctf v1.18 的额外背景列
pub fn parse_epa_log(path: &Path, new_format: bool) -> Result<EpaCurves> {
    let file = File::open(path).map_err(|e| CtfKitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let (epa_col, ccc_col) = if new_format { (4, 5) } else { (3, 4) };
    let mut curves = EpaCurves::default();

    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() <= ccc_col {
            continue;
        }

        // 表头行以 "Resolution" 开头，数值解析失败即跳过
        let (Ok(res), Ok(sim), Ok(epa), Ok(ccc)) = (
            parts[0].parse::<f64>(),
            parts[1].parse::<f64>(),
            parts[epa_col].parse::<f64>(),
            parts[ccc_col].parse::<f64>(),
        ) else {
            continue;
        };

        curves.resolution.push(res);
        curves.sim_ctf.push(sim);
        curves.epa_minus_bg.push(epa);
        curves.cross_correlation.push(ccc);
    }

    if curves.is_empty() {
        return Err(CtfKitError::ParseError {
            format: "EPA log".to_string(),
            path: path.display().to_string(),
            reason: "no data rows found".to_string(),
        });
    }

    Ok(curves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_old_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mic_EPA.log");
        File::create(&path)
            .unwrap()
            .write_all(
                b"  Resolution    Sim.CTF    EPA(Ln|F|)    EPA(Ln|F|-Bg)    CCC\n\
                  50.0000  0.9000  10.1000  0.8000  0.9900\n\
                  25.0000  0.5000   9.5000  0.4000  0.9500\n",
            )
            .unwrap();

        let curves = parse_epa_log(&path, false).unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves.resolution[0], 50.0);
        assert_eq!(curves.epa_minus_bg[1], 0.4);
        assert_eq!(curves.cross_correlation[0], 0.99);
    }

    #[test]
    fn test_parse_new_format_skips_bg_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mic_EPA.log");
        File::create(&path)
            .unwrap()
            .write_all(
                b"  Resolution   Sim.CTF   EPA(Ln|F|)   Bg   EPA(Ln|F|-Bg)   CCC\n\
                  50.0000  0.9000  10.1000  9.3000  0.8000  0.9900\n",
            )
            .unwrap();

        let curves = parse_epa_log(&path, true).unwrap();
        assert_eq!(curves.len(), 1);
        assert_eq!(curves.epa_minus_bg[0], 0.8);
        assert_eq!(curves.cross_correlation[0], 0.99);
    }

    #[test]
    fn test_empty_log_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mic_EPA.log");
        File::create(&path).unwrap().write_all(b"header only\n").unwrap();
        assert!(parse_epa_log(&path, false).is_err());
    }
}
