//! # CTF 数据模型
//!
//! 存储从 Gctf 输出解析得到的 CTF 估计结果。
//!
//! ## 依赖关系
//! - 被 `parsers/gctf_log.rs` 填充
//! - 被 `commands/` 各模块使用

use serde::{Deserialize, Serialize};

/// 无效结果哨兵值，解析失败时使用
pub const WRONG_DEFOCUS_U: f64 = -999.0;
pub const WRONG_DEFOCUS_V: f64 = -1.0;
pub const WRONG_ANGLE: f64 = -999.0;

/// CTF 估计结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtfModel {
    /// Defocus U (Å)，约定 defocus_u >= defocus_v
    pub defocus_u: f64,

    /// Defocus V (Å)
    pub defocus_v: f64,

    /// 像散角 (度，[0, 180))
    pub defocus_angle: f64,

    /// 交叉相关系数 (拟合质量)
    pub cross_correlation: f64,

    /// 相位移 (度)，仅相位板数据存在
    pub phase_shift: Option<f64>,

    /// EPA 估计的分辨率极限 (Å)
    pub resolution: f64,

    /// 关联的 PSD 文件路径
    pub psd_file: Option<String>,
}

impl CtfModel {
    /// 以标准化形式构造：保证 U >= V，角度落在 [0, 180)
    pub fn standard(defocus_u: f64, defocus_v: f64, defocus_angle: f64) -> Self {
        let mut ctf = CtfModel {
            defocus_u,
            defocus_v,
            defocus_angle,
            cross_correlation: 0.0,
            phase_shift: None,
            resolution: 0.0,
            psd_file: None,
        };
        ctf.set_standard_defocus(defocus_u, defocus_v, defocus_angle);
        ctf
    }

    /// 设置标准化散焦值：若 V > U 则交换并把角度旋转 90 度
    pub fn set_standard_defocus(&mut self, defocus_u: f64, defocus_v: f64, defocus_angle: f64) {
        let (u, v, mut angle) = if defocus_v > defocus_u {
            (defocus_v, defocus_u, defocus_angle + 90.0)
        } else {
            (defocus_u, defocus_v, defocus_angle)
        };
        angle = angle.rem_euclid(180.0);
        self.defocus_u = u;
        self.defocus_v = v;
        self.defocus_angle = angle;
    }

    /// 解析失败时的哨兵结果
    pub fn wrong_defocus() -> Self {
        CtfModel {
            defocus_u: WRONG_DEFOCUS_U,
            defocus_v: WRONG_DEFOCUS_V,
            defocus_angle: WRONG_ANGLE,
            cross_correlation: -999.0,
            phase_shift: None,
            resolution: -999.0,
            psd_file: None,
        }
    }

    /// 是否为哨兵结果
    pub fn is_wrong(&self) -> bool {
        self.defocus_u == WRONG_DEFOCUS_U
    }

    /// 像散 (Å)
    pub fn astigmatism(&self) -> f64 {
        (self.defocus_u - self.defocus_v).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_defocus_keeps_order() {
        let ctf = CtfModel::standard(25000.0, 24000.0, 30.0);
        assert_eq!(ctf.defocus_u, 25000.0);
        assert_eq!(ctf.defocus_v, 24000.0);
        assert_eq!(ctf.defocus_angle, 30.0);
    }

    #[test]
    fn test_standard_defocus_swaps_and_rotates() {
        let ctf = CtfModel::standard(24000.0, 25000.0, 30.0);
        assert_eq!(ctf.defocus_u, 25000.0);
        assert_eq!(ctf.defocus_v, 24000.0);
        assert_eq!(ctf.defocus_angle, 120.0);
    }

    #[test]
    fn test_angle_wraps_into_half_turn() {
        let ctf = CtfModel::standard(24000.0, 25000.0, 150.0);
        // 150 + 90 = 240 -> 60
        assert_eq!(ctf.defocus_angle, 60.0);

        let ctf = CtfModel::standard(25000.0, 24000.0, -30.0);
        assert_eq!(ctf.defocus_angle, 150.0);
    }

    #[test]
    fn test_wrong_defocus_sentinel() {
        let ctf = CtfModel::wrong_defocus();
        assert!(ctf.is_wrong());
        assert_eq!(ctf.defocus_v, -1.0);
        assert!(ctf.phase_shift.is_none());
    }

    #[test]
    fn test_astigmatism() {
        let ctf = CtfModel::standard(25000.0, 24000.0, 0.0);
        assert_eq!(ctf.astigmatism(), 1000.0);
    }
}
