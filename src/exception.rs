// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了页面查询与导航生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖传输层故障、协议格式错误、页面未找到以及存档解包错误。
//! - **语义映射**：每个变体对应一类用户可见的失败提示；传输与协议错误统一按
//!   "无应答、连接已关闭" 处理，导航状态保持不变。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志或展示在状态栏。

use std::fmt;

/// 查询或导航过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示失败的具体原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 无法建立到目标主机的连接（拒绝连接或连接超时）。
    ConnectionFailed,
    /// 帧读取提前终止：长度前缀不足 4 字节，或负载在中途被截断。
    /// 调用方必须将其等同于 "无应答、连接已关闭" 处理。
    TruncatedFrame,
    /// 对端报文负载未以约定的识别码开头。
    InvalidIdentifier,
    /// 响应负载的结构不符合协议定义（字段长度与实际字节数不一致等）。
    MalformedResponse,
    /// 服务端收到的查询报文不完整或格式非法。记录日志后直接断开，不作应答。
    MalformedQuery,
    /// 请求的页面路径无法完全解析。携带服务端已成功匹配的路径前缀
    /// （含第一个未匹配的字面段），用于向用户展示诊断信息。
    PageNotFound(String),
    /// 页面存档无法解压或条目结构损坏。
    ArchiveCorrupt,
    /// 页面存档中缺少内容文档。仅中止本次导航，保留当前已显示的页面。
    ContentMissing,
}

use Exception::*;

/// 为 `Exception` 实现 `Display` 特性，使其支持字符串格式化输出。
impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionFailed => write!(f, "Remote server not responding"),
            TruncatedFrame => write!(f, "Connection closed before a full frame arrived"),
            InvalidIdentifier => write!(f, "Invalid server"),
            MalformedResponse => write!(f, "Malformed response payload"),
            MalformedQuery => write!(f, "Malformed query payload"),
            PageNotFound(path) => write!(f, "Page not found: {}", path),
            ArchiveCorrupt => write!(f, "Page archive is corrupt"),
            ContentMissing => write!(f, "Page archive has no content document"),
        }
    }
}

impl Exception {
    /// 判断该异常是否属于传输层故障。
    ///
    /// 传输层故障（连接失败、截断帧、识别码错误）在界面上统一显示为连接性提示。
    pub fn is_transport(&self) -> bool {
        matches!(self, ConnectionFailed | TruncatedFrame | InvalidIdentifier)
    }
}
