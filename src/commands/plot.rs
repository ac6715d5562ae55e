//! # EPA 拟合曲线图命令
//!
//! 使用 `plotters` 把 Gctf 的 EPA 日志画成 CTF 拟合质量图:
//! 模拟 CTF、去背景等相位平均与互相关三条曲线。
//! 横轴取空间频率,刻度标注换算回分辨率 (Å)。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs` 调用
//! - 使用 `parsers/epa_log.rs` 和 `parsers/gctf_log.rs`
//! - 使用 `plotters` 渲染图表

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::cli::plot::PlotArgs;
use crate::error::{CtfKitError, Result};
use crate::models::CtfModel;
use crate::parsers::epa_log::{parse_epa_log, EpaCurves};
use crate::parsers::gctf_log::read_ctf_model;
use crate::utils::{output, progress};

pub fn execute(args: PlotArgs) -> Result<()> {
    output::print_header("EPA Fit Curves");

    if !args.epa_log.exists() {
        return Err(CtfKitError::FileNotFound {
            path: args.epa_log.display().to_string(),
        });
    }
    let curves = parse_epa_log(&args.epa_log, args.new_format)?;
    output::print_info(&format!("{} EPA samples", curves.len()));

    let ctf_log = args.ctf_log.clone().or_else(|| default_ctf_log(&args.epa_log));
    let title = ctf_log
        .filter(|p| p.exists())
        .and_then(|p| read_ctf_model(&p, None).ok())
        .filter(|ctf| !ctf.is_wrong())
        .map(|ctf| plot_subtitle(&ctf))
        .unwrap_or_else(|| "CTF Fitting".to_string());

    let spinner = progress::create_spinner("Rendering chart");
    let use_svg = args
        .output
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    if use_svg {
        let root = SVGBackend::new(&args.output, (args.width, args.height)).into_drawing_area();
        draw_fit_chart(&root, &curves, &title)?;
        root.present()
            .map_err(|e| CtfKitError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(&args.output, (args.width, args.height)).into_drawing_area();
        draw_fit_chart(&root, &curves, &title)?;
        root.present()
            .map_err(|e| CtfKitError::Other(e.to_string()))?;
    }
    spinner.finish_and_clear();

    output::print_success(&format!("Chart saved to '{}'", args.output.display()));
    Ok(())
}

/// 从 EPA 日志名推断同目录的 Gctf 日志
/// (`<base>_EPA.log` -> `<base>_gctf.log`, `<base>_ctf_EPA.log` -> `<base>_ctf.log`)。
/// 先试 `_gctf.log`，免得同名的无关 `.log` 抢先匹配。
fn default_ctf_log(epa_log: &Path) -> Option<PathBuf> {
    let parent = epa_log.parent()?;
    let name = epa_log.file_name()?.to_str()?;
    let stripped = name.strip_suffix("_EPA.log")?;
    let candidates = [
        format!("{}_gctf.log", stripped),
        format!("{}.log", stripped),
    ];
    candidates
        .iter()
        .map(|c| parent.join(c))
        .find(|p| p.exists())
}

/// 图表标题: CTF 主要数值一行(有相位移时附带)
fn plot_subtitle(ctf: &CtfModel) -> String {
    let phase = ctf
        .phase_shift
        .map_or_else(String::new, |p| format!("Phase shift: {:.2}\u{00b0} | ", p));
    format!(
        "Def1: {:.0} \u{212b} | Def2: {:.0} \u{212b} | Angle: {:.1}\u{00b0} | {}Fit: {:.1} \u{212b} | Score: {:.3}",
        ctf.defocus_u, ctf.defocus_v, ctf.defocus_angle, phase, ctf.resolution, ctf.cross_correlation
    )
}

/// 可绘制的 (样本索引, 空间频率) 对；非正分辨率无法换算成频率,跳过
fn spatial_frequencies(resolution: &[f64]) -> Vec<(usize, f64)> {
    resolution
        .iter()
        .enumerate()
        .filter(|(_, r)| **r > 0.0)
        .map(|(i, r)| (i, 1.0 / r))
        .collect()
}

/// 绘制三条拟合曲线
fn draw_fit_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    curves: &EpaCurves,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| CtfKitError::Other(format!("{:?}", e)))?;

    // 空间频率 = 1/分辨率,使高分辨率落在右侧
    let freqs = spatial_frequencies(&curves.resolution);
    if freqs.is_empty() {
        return Err(CtfKitError::Other(
            "no EPA samples with a positive resolution".to_string(),
        ));
    }
    let x_max = freqs.iter().map(|(_, f)| *f).fold(f64::NEG_INFINITY, f64::max) * 1.02;

    let all_y = freqs.iter().flat_map(|(i, _)| {
        [
            curves.sim_ctf[*i],
            curves.epa_minus_bg[*i],
            curves.cross_correlation[*i],
        ]
    });
    let (y_min, y_max) = all_y.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });
    let y_pad = 0.05 * (y_max - y_min).max(1e-6);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 22).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, (y_min - y_pad)..(y_max + y_pad))
        .map_err(|e| CtfKitError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Resolution (\u{212b})")
        .y_desc("CTF fit quality")
        .x_label_formatter(&|f: &f64| {
            if *f > 1e-6 {
                format!("{:.1}", 1.0 / f)
            } else {
                String::new()
            }
        })
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| CtfKitError::Other(format!("{:?}", e)))?;

    let series: [(&[f64], RGBColor, &str); 3] = [
        (&curves.sim_ctf, RGBColor(204, 0, 0), "simulated CTF"),
        (
            &curves.epa_minus_bg,
            RGBColor(0, 102, 204),
            "equiphase avg. - bg",
        ),
        (
            &curves.cross_correlation,
            RGBColor(0, 153, 0),
            "cross correlation",
        ),
    ];
    for (values, color, label) in series {
        chart
            .draw_series(LineSeries::new(
                freqs.iter().map(|(i, f)| (*f, values[*i])),
                color.stroke_width(2),
            ))
            .map_err(|e| CtfKitError::Other(format!("{:?}", e)))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(|e| CtfKitError::Other(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_plot_subtitle() {
        let mut ctf = CtfModel::standard(23435.0, 23051.0, 54.1);
        ctf.resolution = 4.3;
        ctf.cross_correlation = 0.123;
        let subtitle = plot_subtitle(&ctf);
        assert!(subtitle.starts_with("Def1: 23435"));
        assert!(subtitle.contains("Fit: 4.3"));
        assert!(!subtitle.contains("Phase shift"));

        ctf.phase_shift = Some(62.5);
        assert!(plot_subtitle(&ctf).contains("Phase shift: 62.50"));
    }

    #[test]
    fn test_default_ctf_log() {
        let dir = tempfile::tempdir().unwrap();
        let epa = dir.path().join("mic_001_ctf_EPA.log");
        File::create(&epa).unwrap();
        assert!(default_ctf_log(&epa).is_none());

        let log = dir.path().join("mic_001_ctf.log");
        File::create(&log).unwrap();
        assert_eq!(default_ctf_log(&epa), Some(log));
    }

    #[test]
    fn test_default_ctf_log_prefers_gctf_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let epa = dir.path().join("mic_001_EPA.log");
        File::create(&epa).unwrap();
        File::create(dir.path().join("mic_001.log")).unwrap();
        let gctf_log = dir.path().join("mic_001_gctf.log");
        File::create(&gctf_log).unwrap();

        assert_eq!(default_ctf_log(&epa), Some(gctf_log));
    }

    #[test]
    fn test_spatial_frequencies_skip_non_positive() {
        let freqs = spatial_frequencies(&[50.0, 0.0, -1.0, 4.0]);
        assert_eq!(freqs.len(), 2);
        assert_eq!(freqs[0].0, 0);
        assert!((freqs[0].1 - 0.02).abs() < 1e-12);
        assert_eq!(freqs[1].0, 3);
        assert!((freqs[1].1 - 0.25).abs() < 1e-12);

        assert!(spatial_frequencies(&[0.0]).is_empty());
    }
}
