//! # 批量执行器
//!
//! 并行调度逐 micrograph 的 Gctf 调用。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，线程数即并发的外部进程数
//! - 处理函数拿到文件序号，用于 GPU 轮换分配
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/estimate.rs`, `commands/refine.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如缺少坐标文件）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (文件路径, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，0 表示使用全部核心
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表；处理函数的第一个参数是文件序号
    pub fn run<F>(&self, files: Vec<PathBuf>, message: &str, processor: F) -> BatchResult
    where
        F: Fn(usize, &PathBuf) -> ProcessResult + Sync + Send,
    {
        let total = files.len();
        let pb = progress::create_progress_bar(total as u64, message);

        // 配置 rayon 线程池（每线程一个 Gctf 进程）
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .expect("failed to build thread pool");

        let results: Vec<ProcessResult> = pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .map(|(index, file)| {
                    let result = processor(index, file);

                    if let ProcessResult::Failed(path, err) = &result {
                        pb.suspend(|| {
                            crate::utils::output::print_warning(&format!(
                                "Gctf failed for {}: {}",
                                path, err
                            ));
                        });
                    }

                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        // 汇总结果
        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }

        batch_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_result_merge() {
        let mut result = BatchResult::default();
        result.merge(ProcessResult::Success("a.mrc".to_string()));
        result.merge(ProcessResult::Skipped("b.mrc".to_string()));
        result.merge(ProcessResult::Failed(
            "c.mrc".to_string(),
            "exit code 1".to_string(),
        ));

        assert_eq!(result.success, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total(), 3);
        assert_eq!(result.failures[0].0, "c.mrc");
    }

    #[test]
    fn test_zero_jobs_uses_all_cores() {
        let runner = BatchRunner::new(0);
        assert!(runner.jobs() >= 1);
    }
}
