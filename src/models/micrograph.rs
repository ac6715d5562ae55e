//! # Micrograph 与采集参数数据模型
//!
//! ## 依赖关系
//! - 被 `commands/` 各模块使用
//! - 被 `gctf/args.rs` 换算为命令行参数

use crate::models::CtfModel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 显微镜采集参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    /// 加速电压 (kV)
    pub voltage: f64,

    /// 球差 (mm)
    pub spherical_aberration: f64,

    /// 振幅衬度
    pub amplitude_contrast: f64,

    /// 标称放大倍数
    pub magnification: f64,

    /// 像素尺寸 (Å/px)
    pub sampling_rate: f64,
}

impl Acquisition {
    /// 探测器物理像素尺寸 (µm)，由采样率和放大倍数导出
    pub fn scanned_pixel_size(&self) -> f64 {
        self.sampling_rate * self.magnification / 10000.0
    }
}

/// 去掉路径和扩展名的文件名
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// 倾转系列中单帧的 CTF 记录
#[derive(Debug, Clone, Serialize)]
pub struct TiltImageCtf {
    /// 采集序号 (1-based，按文件名排序)
    pub acq_index: usize,

    /// 帧文件名
    pub image: String,

    /// 估计得到的 CTF
    pub ctf: CtfModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanned_pixel_size() {
        let acq = Acquisition {
            voltage: 300.0,
            spherical_aberration: 2.7,
            amplitude_contrast: 0.1,
            magnification: 50000.0,
            sampling_rate: 1.0,
        };
        assert!((acq.scanned_pixel_size() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/data/movies/stack_0001.mrc")), "stack_0001");
        assert_eq!(base_name(Path::new("stack_0001")), "stack_0001");
    }
}
