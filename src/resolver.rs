// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径解析模块
//!
//! 该模块把斜杠分隔的页面路径逐段匹配到服务端根目录树上。
//!
//! ## 匹配规则
//! 1. 每个非空路径段先在当前目录的直接子目录中做精确名匹配。
//! 2. 精确匹配失败时回退为大小写不敏感匹配，取迭代顺序中第一个命中的目录。
//! 3. 命中后把**磁盘上的实际存储名**（而非请求中的写法）追加到解析路径并下降。
//! 4. 第一个两种方式都无法匹配的段终止解析：结果为未找到，
//!    携带已匹配前缀加该字面段。
//!
//! 空路径立即解析为根页面。迭代顺序统一为文件名字典序（见 `util`），
//! 因此同名大小写变体并存时，命中结果跨平台可复现。

use crate::util;

use std::{
    io,
    path::{Path, PathBuf},
};

/// 一次路径解析的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 全部路径段均已匹配：携带目标目录和大小写纠正后的解析路径。
    Found {
        directory: PathBuf,
        resolved_path: String,
    },
    /// 某一段无法匹配：携带成功匹配的最长前缀（含第一个未匹配的字面段）。
    NotFound { matched_path: String },
}

/// 把页面路径解析到根目录树上。
///
/// 路径为斜杠分隔、无前导斜杠的字符串；空段被忽略；空路径解析为根页面。
pub fn resolve(root: &Path, path: &str) -> io::Result<Resolution> {
    let mut directory = root.to_path_buf();
    let mut resolved: Vec<String> = Vec::new();

    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        match match_segment(&directory, segment)? {
            Some(actual_name) => {
                directory.push(&actual_name);
                resolved.push(actual_name);
            }
            None => {
                // 诊断信息包含第一个未匹配的字面段
                resolved.push(segment.to_string());
                return Ok(Resolution::NotFound {
                    matched_path: resolved.join("/"),
                });
            }
        }
    }

    Ok(Resolution::Found {
        directory,
        resolved_path: resolved.join("/"),
    })
}

/// 在目录的直接子目录中匹配一个路径段，返回磁盘上的实际存储名。
///
/// 先精确匹配，再大小写不敏感回退；两趟都按字典序线性扫描，先到先得。
fn match_segment(directory: &Path, segment: &str) -> io::Result<Option<String>> {
    let entries = util::sorted_dir_entries(directory)?;

    for path in &entries {
        if let Some(name) = directory_name(path) {
            if name == segment {
                return Ok(Some(name.to_string()));
            }
        }
    }

    let folded = segment.to_lowercase();
    for path in &entries {
        if let Some(name) = directory_name(path) {
            if name.to_lowercase() == folded {
                return Ok(Some(name.to_string()));
            }
        }
    }

    Ok(None)
}

/// 仅对目录类型的条目返回其 UTF-8 文件名
fn directory_name(path: &Path) -> Option<&str> {
    if path.is_dir() {
        path.file_name().and_then(|name| name.to_str())
    } else {
        None
    }
}
