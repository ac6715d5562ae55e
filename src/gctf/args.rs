//! # Gctf 命令行参数拼装
//!
//! 把参数结构映射为 Gctf 可执行文件接受的扁平命令行标志列表。
//! 标志名与取值约定完全由外部程序定义，这里只做忠实翻译：
//! 可选功能块 (相位移搜索、高分辨率精修、局部精修、输入 CTF 精修)
//! 仅在启用时加入。
//!
//! ## 依赖关系
//! - 被 `commands/` 各模块使用
//! - 被 `gctf/runner.rs` 拼接输入文件后执行

use crate::models::Acquisition;

/// 相位移搜索参数块 (相位板数据)
#[derive(Debug, Clone)]
pub struct PhaseShiftParams {
    /// 搜索下限 (度)
    pub low: f64,
    /// 搜索上限 (度)
    pub high: f64,
    /// 搜索步长 (度)
    pub step: f64,
    /// 搜索目标: 1 = CCC, 2 = 分辨率极限
    pub target: u32,
    /// 搜索过程中同时精修
    pub cosearch_refine: bool,
    /// 精修类型 (1..=3)
    pub refine_2d_t: u32,
}

/// 高分辨率精修参数块
#[derive(Debug, Clone)]
pub struct HighResParams {
    pub res_low: f64,
    pub res_high: f64,
    pub bfactor: i32,
}

/// 局部 (逐粒子) 精修参数块
#[derive(Debug, Clone)]
pub struct LocalRefineParams {
    /// 加权半径 (px)
    pub radius: u32,
    /// 权重类型: 0 等权, 1 距离, 2 距离+频率
    pub ave_type: u32,
    /// 局部 box 尺寸 (px)
    pub box_size: u32,
    /// 网格采样重叠因子
    pub overlap: f64,
    /// 局部拟合分辨率下限 (Å)
    pub res_low: u32,
    /// 局部拟合分辨率上限 (Å)
    pub res_high: u32,
    /// 是否精修局部像散 (默认只精修 Z 高度)
    pub refine_astigmatism: bool,
}

/// 以已有 CTF 为初值精修 (代替 ab initio 确定)
#[derive(Debug, Clone)]
pub struct InputCtfParams {
    pub defocus_u: f64,
    pub defocus_v: f64,
    pub defocus_angle: f64,
    pub bfactor: f64,
    pub defocus_u_err: f64,
    pub defocus_v_err: f64,
    pub defocus_angle_err: f64,
    pub bfactor_err: f64,
}

/// 一次 Gctf 调用的全部参数
#[derive(Debug, Clone)]
pub struct GctfParams {
    pub acquisition: Acquisition,

    pub min_defocus: f64,
    pub max_defocus: f64,
    pub step_defocus: f64,
    pub astigmatism: f64,

    /// 拟合分辨率范围 (Å)
    pub low_res: f64,
    pub high_res: f64,

    pub do_epa: bool,
    pub box_size: u32,
    pub plot_res_ring: bool,
    pub gpu_id: String,
    pub bfactor: i32,
    pub overlap: f64,
    pub convsize: u32,
    /// 低频背景平滑限 (Å)；局部精修调用不传该标志
    pub smooth_res_l: Option<u32>,
    pub epa_oversmp: u32,

    pub phase_shift: Option<PhaseShiftParams>,
    pub high_res_ref: Option<HighResParams>,
    pub local_refine: Option<LocalRefineParams>,
    pub input_ctf: Option<InputCtfParams>,

    pub do_validation: bool,
}

impl GctfParams {
    /// 拼装完整的命令行标志列表 (不含输入文件)
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let acq = &self.acquisition;

        // Gctf misbehaves with resL above 50
        let low_res = self.low_res.min(50.0);

        push_flag(&mut args, "--apix", format!("{:.6}", acq.sampling_rate));
        push_flag(&mut args, "--kV", format!("{:.6}", acq.voltage));
        push_flag(&mut args, "--cs", format!("{:.6}", acq.spherical_aberration));
        push_flag(&mut args, "--ac", format!("{:.6}", acq.amplitude_contrast));
        push_flag(
            &mut args,
            "--dstep",
            format!("{:.6}", acq.scanned_pixel_size()),
        );
        push_flag(&mut args, "--defL", format!("{:.6}", self.min_defocus));
        push_flag(&mut args, "--defH", format!("{:.6}", self.max_defocus));
        push_flag(&mut args, "--defS", format!("{:.6}", self.step_defocus));
        push_flag(&mut args, "--astm", format!("{:.6}", self.astigmatism));
        push_flag(&mut args, "--resL", format!("{:.6}", low_res));
        push_flag(&mut args, "--resH", format!("{:.6}", self.high_res));
        push_flag(&mut args, "--do_EPA", bool_flag(self.do_epa));
        push_flag(&mut args, "--boxsize", self.box_size.to_string());
        push_flag(&mut args, "--plot_res_ring", bool_flag(self.plot_res_ring));
        push_flag(&mut args, "--gid", self.gpu_id.clone());
        push_flag(&mut args, "--bfac", self.bfactor.to_string());
        push_flag(
            &mut args,
            "--B_resH",
            format!("{:.6}", 2.0 * acq.sampling_rate),
        );
        push_flag(&mut args, "--overlap", format!("{:.6}", self.overlap));
        push_flag(&mut args, "--convsize", self.convsize.to_string());
        push_flag(
            &mut args,
            "--do_Hres_ref",
            bool_flag(self.high_res_ref.is_some()),
        );
        if let Some(smooth) = self.smooth_res_l {
            push_flag(&mut args, "--smooth_resL", smooth.to_string());
        }
        push_flag(&mut args, "--EPA_oversmp", self.epa_oversmp.to_string());

        if let Some(ref ps) = self.phase_shift {
            push_flag(&mut args, "--phase_shift_L", format!("{:.6}", ps.low));
            push_flag(&mut args, "--phase_shift_H", format!("{:.6}", ps.high));
            push_flag(&mut args, "--phase_shift_S", format!("{:.6}", ps.step));
            push_flag(&mut args, "--phase_shift_T", ps.target.to_string());
            push_flag(
                &mut args,
                "--cosearch_refine_ps",
                bool_flag(ps.cosearch_refine),
            );
            push_flag(&mut args, "--refine_2d_T", ps.refine_2d_t.to_string());
        }

        if let Some(ref hr) = self.high_res_ref {
            push_flag(&mut args, "--Href_resL", format!("{:.3}", hr.res_low));
            push_flag(&mut args, "--Href_resH", format!("{:.3}", hr.res_high));
            push_flag(&mut args, "--Href_bfac", hr.bfactor.to_string());
        }

        if let Some(ref lr) = self.local_refine {
            push_flag(&mut args, "--do_local_refine", "1".to_string());
            push_flag(&mut args, "--boxsuffix", "_coords.star".to_string());
            push_flag(&mut args, "--local_radius", lr.radius.to_string());
            push_flag(&mut args, "--local_avetype", lr.ave_type.to_string());
            push_flag(&mut args, "--local_boxsize", lr.box_size.to_string());
            push_flag(&mut args, "--local_overlap", format!("{:.2}", lr.overlap));
            push_flag(&mut args, "--local_resL", lr.res_low.to_string());
            push_flag(&mut args, "--local_resH", lr.res_high.to_string());
            push_flag(
                &mut args,
                "--refine_local_astm",
                bool_flag(lr.refine_astigmatism),
            );
        }

        if let Some(ref ic) = self.input_ctf {
            push_flag(&mut args, "--refine_input_ctf", "1".to_string());
            push_flag(&mut args, "--defU_init", format!("{:.6}", ic.defocus_u));
            push_flag(&mut args, "--defV_init", format!("{:.6}", ic.defocus_v));
            push_flag(&mut args, "--defA_init", format!("{:.6}", ic.defocus_angle));
            push_flag(&mut args, "--B_init", format!("{:.6}", ic.bfactor));
            push_flag(&mut args, "--defU_err", format!("{:.6}", ic.defocus_u_err));
            push_flag(&mut args, "--defV_err", format!("{:.6}", ic.defocus_v_err));
            push_flag(
                &mut args,
                "--defA_err",
                format!("{:.6}", ic.defocus_angle_err),
            );
            push_flag(&mut args, "--B_err", format!("{:.6}", ic.bfactor_err));
        }

        push_flag(&mut args, "--ctfstar", "NONE".to_string());
        push_flag(&mut args, "--do_validation", bool_flag(self.do_validation));

        args
    }

    /// 替换 GPU id (批量运行时逐次轮换)
    pub fn with_gpu(&self, gpu_id: &str) -> Self {
        let mut params = self.clone();
        params.gpu_id = gpu_id.to_string();
        params
    }
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: String) {
    args.push(flag.to_string());
    args.push(value);
}

fn bool_flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> GctfParams {
        GctfParams {
            acquisition: Acquisition {
                voltage: 300.0,
                spherical_aberration: 2.7,
                amplitude_contrast: 0.1,
                magnification: 50000.0,
                sampling_rate: 1.0,
            },
            min_defocus: 5000.0,
            max_defocus: 90000.0,
            step_defocus: 500.0,
            astigmatism: 1000.0,
            low_res: 50.0,
            high_res: 4.0,
            do_epa: true,
            box_size: 1024,
            plot_res_ring: true,
            gpu_id: "0".to_string(),
            bfactor: 150,
            overlap: 0.5,
            convsize: 85,
            smooth_res_l: Some(1000),
            epa_oversmp: 4,
            phase_shift: None,
            high_res_ref: None,
            local_refine: None,
            input_ctf: None,
            do_validation: false,
        }
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn test_base_args() {
        let args = test_params().build_args();

        assert_eq!(flag_value(&args, "--apix"), Some("1.000000"));
        assert_eq!(flag_value(&args, "--kV"), Some("300.000000"));
        assert_eq!(flag_value(&args, "--dstep"), Some("5.000000"));
        assert_eq!(flag_value(&args, "--defL"), Some("5000.000000"));
        assert_eq!(flag_value(&args, "--defH"), Some("90000.000000"));
        assert_eq!(flag_value(&args, "--do_EPA"), Some("1"));
        assert_eq!(flag_value(&args, "--boxsize"), Some("1024"));
        assert_eq!(flag_value(&args, "--gid"), Some("0"));
        assert_eq!(flag_value(&args, "--B_resH"), Some("2.000000"));
        assert_eq!(flag_value(&args, "--ctfstar"), Some("NONE"));
        assert_eq!(flag_value(&args, "--do_validation"), Some("0"));

        // Optional blocks are absent
        assert!(flag_value(&args, "--phase_shift_L").is_none());
        assert!(flag_value(&args, "--Href_resL").is_none());
        assert!(flag_value(&args, "--do_local_refine").is_none());
    }

    #[test]
    fn test_low_res_is_clamped() {
        let mut params = test_params();
        params.low_res = 100.0;
        let args = params.build_args();
        assert_eq!(flag_value(&args, "--resL"), Some("50.000000"));
    }

    #[test]
    fn test_phase_shift_block() {
        let mut params = test_params();
        params.phase_shift = Some(PhaseShiftParams {
            low: 0.0,
            high: 180.0,
            step: 10.0,
            target: 1,
            cosearch_refine: false,
            refine_2d_t: 1,
        });
        let args = params.build_args();

        assert_eq!(flag_value(&args, "--phase_shift_H"), Some("180.000000"));
        assert_eq!(flag_value(&args, "--phase_shift_T"), Some("1"));
        assert_eq!(flag_value(&args, "--cosearch_refine_ps"), Some("0"));
        assert_eq!(flag_value(&args, "--refine_2d_T"), Some("1"));
    }

    #[test]
    fn test_local_refine_block() {
        let mut params = test_params();
        params.local_refine = Some(LocalRefineParams {
            radius: 1024,
            ave_type: 2,
            box_size: 512,
            overlap: 0.5,
            res_low: 15,
            res_high: 5,
            refine_astigmatism: false,
        });
        let args = params.build_args();

        assert_eq!(flag_value(&args, "--do_local_refine"), Some("1"));
        assert_eq!(flag_value(&args, "--boxsuffix"), Some("_coords.star"));
        assert_eq!(flag_value(&args, "--local_overlap"), Some("0.50"));
        assert_eq!(flag_value(&args, "--refine_local_astm"), Some("0"));
    }

    #[test]
    fn test_input_ctf_block() {
        let mut params = test_params();
        params.input_ctf = Some(InputCtfParams {
            defocus_u: 24000.0,
            defocus_v: 23000.0,
            defocus_angle: 45.0,
            bfactor: 150.0,
            defocus_u_err: 500.0,
            defocus_v_err: 500.0,
            defocus_angle_err: 15.0,
            bfactor_err: 50.0,
        });
        let args = params.build_args();

        assert_eq!(flag_value(&args, "--refine_input_ctf"), Some("1"));
        assert_eq!(flag_value(&args, "--defU_init"), Some("24000.000000"));
        assert_eq!(flag_value(&args, "--defA_err"), Some("15.000000"));
    }

    #[test]
    fn test_hres_ref_toggles_flag() {
        let mut params = test_params();
        assert_eq!(flag_value(&params.build_args(), "--do_Hres_ref"), Some("0"));

        params.high_res_ref = Some(HighResParams {
            res_low: 15.0,
            res_high: 4.0,
            bfactor: 50,
        });
        let args = params.build_args();
        assert_eq!(flag_value(&args, "--do_Hres_ref"), Some("1"));
        assert_eq!(flag_value(&args, "--Href_resL"), Some("15.000"));
    }

    #[test]
    fn test_smooth_res_l_is_optional() {
        let mut params = test_params();
        assert_eq!(flag_value(&params.build_args(), "--smooth_resL"), Some("1000"));

        params.smooth_res_l = None;
        assert!(flag_value(&params.build_args(), "--smooth_resL").is_none());
    }

    #[test]
    fn test_with_gpu() {
        let params = test_params().with_gpu("2");
        assert_eq!(flag_value(&params.build_args(), "--gid"), Some("2"));
    }
}
