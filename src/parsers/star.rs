//! # STAR 坐标文件读写
//!
//! Gctf 局部精修通过 `<base>_coords.star` 读入粒子坐标，
//! 并把逐粒子结果写进 `<base>_local.star`。这里实现最小化的
//! 写入器与按 `_rln` 标签索引的读取器。
//!
//! ## 依赖关系
//! - 被 `commands/refine.rs` 使用

use crate::error::{CtfKitError, Result};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// 粒子坐标写入器，产生 Gctf 接受的最小 STAR 文件
pub struct CoordinatesWriter {
    writer: BufWriter<File>,
    path: String,
}

impl CoordinatesWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CtfKitError::FileWriteError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let file = File::create(path).map_err(|e| CtfKitError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        writer
            .write_all(b"\ndata_\n\nloop_\n_rlnCoordinateX #1\n_rlnCoordinateY #2\n")
            .map_err(|e| CtfKitError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;

        Ok(CoordinatesWriter {
            writer,
            path: path.display().to_string(),
        })
    }

    pub fn write_coord(&mut self, x: f64, y: f64) -> Result<()> {
        writeln!(self.writer, "{:.2} {:.2}", x, y).map_err(|e| CtfKitError::FileWriteError {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| CtfKitError::FileWriteError {
                path: self.path.clone(),
                source: e,
            })
    }
}

/// `_local.star` 中的逐粒子精修结果行
#[derive(Debug, Clone)]
pub struct LocalCtfRow {
    pub x: f64,
    pub y: f64,
    pub defocus_u: f64,
    pub defocus_v: f64,
    pub defocus_angle: f64,
    pub figure_of_merit: Option<f64>,
}

/// 解析 Gctf 产生的 `_local.star` 逐粒子结果
pub fn parse_local_star(path: &Path) -> Result<Vec<LocalCtfRow>> {
    let (labels, rows) = read_star_table(path)?;

    let col = |name: &str| -> Result<usize> {
        labels
            .get(name)
            .copied()
            .ok_or_else(|| CtfKitError::ParseError {
                format: "STAR".to_string(),
                path: path.display().to_string(),
                reason: format!("missing label {}", name),
            })
    };

    let x_col = col("_rlnCoordinateX")?;
    let y_col = col("_rlnCoordinateY")?;
    let du_col = col("_rlnDefocusU")?;
    let dv_col = col("_rlnDefocusV")?;
    let da_col = col("_rlnDefocusAngle")?;
    let fom_col = labels.get("_rlnCtfFigureOfMerit").copied();

    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        let get = |i: usize| row.get(i).and_then(|t| t.parse::<f64>().ok());

        let (Some(x), Some(y), Some(du), Some(dv), Some(da)) =
            (get(x_col), get(y_col), get(du_col), get(dv_col), get(da_col))
        else {
            // 畸形行：跳过
            continue;
        };

        result.push(LocalCtfRow {
            x,
            y,
            defocus_u: du,
            defocus_v: dv,
            defocus_angle: da,
            figure_of_merit: fom_col.and_then(get),
        });
    }

    Ok(result)
}

/// 读取粒子坐标：STAR 文件取 `_rlnCoordinateX/Y` 列，
/// 纯文本取每行前两列数字 (跳过 # 注释)
pub fn read_coordinates(path: &Path) -> Result<Vec<(f64, f64)>> {
    let is_star = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("star"))
        .unwrap_or(false);

    if is_star {
        let (labels, rows) = read_star_table(path)?;
        let x_col = labels.get("_rlnCoordinateX").copied().unwrap_or(0);
        let y_col = labels.get("_rlnCoordinateY").copied().unwrap_or(1);

        Ok(rows
            .iter()
            .filter_map(|row| {
                let x = row.get(x_col)?.parse().ok()?;
                let y = row.get(y_col)?.parse().ok()?;
                Some((x, y))
            })
            .collect())
    } else {
        let file = File::open(path).map_err(|e| CtfKitError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut coords = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => continue,
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            if let (Some(Ok(x)), Some(Ok(y))) = (
                parts.next().map(str::parse::<f64>),
                parts.next().map(str::parse::<f64>),
            ) {
                coords.push((x, y));
            }
        }
        Ok(coords)
    }
}

/// 读取单个 loop_ 表：标签 -> 列号，及全部数据行
fn read_star_table(path: &Path) -> Result<(HashMap<String, usize>, Vec<Vec<String>>)> {
    let file = File::open(path).map_err(|e| CtfKitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut rows = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        let trimmed = line.trim();

        if trimmed.is_empty()
            || trimmed.starts_with("data_")
            || trimmed.starts_with("loop_")
            || trimmed.starts_with('#')
        {
            continue;
        }

        if trimmed.starts_with('_') {
            let label = trimmed
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            let index = labels.len();
            labels.insert(label, index);
            continue;
        }

        let tokens: Vec<String> = trimmed.split_whitespace().map(|s| s.to_string()).collect();
        if !labels.is_empty() && tokens.len() >= labels.len() {
            rows.push(tokens);
        }
    }

    if labels.is_empty() {
        return Err(CtfKitError::ParseError {
            format: "STAR".to_string(),
            path: path.display().to_string(),
            reason: "no loop_ labels found".to_string(),
        });
    }

    Ok((labels, rows))
}
