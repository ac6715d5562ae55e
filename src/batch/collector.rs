//! # 文件收集器
//!
//! 根据输入参数收集待处理的 micrograph 文件列表。
//! 输入可以是单个文件、目录 (配合文件名模式) 或一个 glob 模式。
//!
//! ## 功能
//! - 目录内按模式匹配，可递归
//! - glob 模式直接展开
//! - 输出按文件名排序 (倾转系列以此为采集顺序)
//!
//! ## 依赖关系
//! - 被 `commands/` 各模块调用
//! - 使用 `walkdir` 遍历目录，`glob` 做模式匹配

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    /// 输入 (文件路径、目录路径或 glob 模式)
    input: String,
    /// 匹配模式列表
    patterns: Vec<Pattern>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器，默认匹配 *.mrc
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            patterns: vec![Pattern::new("*.mrc").unwrap()],
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式，非法模式忽略）
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        let patterns: Vec<Pattern> = pattern
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| Pattern::new(s).ok())
            .collect();
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件，按路径排序
    pub fn collect(&self) -> Vec<PathBuf> {
        let input = Path::new(&self.input);

        let mut files: Vec<PathBuf> = if input.is_file() {
            vec![input.to_path_buf()]
        } else if input.is_dir() {
            let max_depth = if self.recursive { usize::MAX } else { 1 };

            WalkDir::new(input)
                .max_depth(max_depth)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| self.matches_patterns(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect()
        } else {
            // 既非文件也非目录：当作 glob 模式展开
            glob::glob(&self.input)
                .map(|paths| {
                    paths
                        .filter_map(|p| p.ok())
                        .filter(|p| p.is_file())
                        .collect()
                })
                .unwrap_or_default()
        };

        files.sort();
        files
    }

    /// 检查文件名是否匹配任一模式
    fn matches_patterns(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns.iter().any(|p| p.matches(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_collect_directory_with_pattern() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.mrc", "b.mrc", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = FileCollector::new(dir.path().display().to_string()).collect();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.mrc"));
        assert!(files[1].ends_with("b.mrc"));
    }

    #[test]
    fn test_collect_multiple_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a_gctf.log", "a_ctf.log", "a.mrc"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = FileCollector::new(dir.path().display().to_string())
            .with_pattern("*_gctf.log,*_ctf.log")
            .collect();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.mrc");
        File::create(&path).unwrap();

        let files = FileCollector::new(path.display().to_string()).collect();
        assert_eq!(files, vec![path]);
    }

    #[test]
    fn test_collect_glob_input() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["stack_001.mrc", "stack_002.mrc", "other.mrc"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let pattern = dir.path().join("stack_*.mrc").display().to_string();
        let files = FileCollector::new(pattern).collect();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_recursive_collection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("top.mrc")).unwrap();
        File::create(dir.path().join("sub").join("nested.mrc")).unwrap();

        let flat = FileCollector::new(dir.path().display().to_string()).collect();
        assert_eq!(flat.len(), 1);

        let deep = FileCollector::new(dir.path().display().to_string())
            .recursive(true)
            .collect();
        assert_eq!(deep.len(), 2);
    }
}
