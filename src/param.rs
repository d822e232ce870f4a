// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 `mdpage` 客户端与服务端共同遵循的线路协议常量和固定文件名，包括：
//! - 报文识别码、消息类型与响应状态标记。
//! - 默认网络端口与客户端超时参数。
//! - 页面内容文档及保留文件名列表。

use lazy_static::lazy_static;

/// 每条报文负载起始处的 2 字节识别码
pub const IDENTIFIER: [u8; 2] = [0x06, 0x0E];

/// 服务端默认监听端口
pub const DEFAULT_PORT: u16 = 1550;

/// 消息类型：页面查询
pub const MSG_QUERY: u8 = 0x00;

/// 消息类型：停机指令
pub const MSG_SHUTDOWN: u8 = 0xFF;

/// 响应状态：页面已找到
pub const STATUS_FOUND: u8 = b'0';

/// 响应状态：页面未找到
pub const STATUS_NOT_FOUND: u8 = b'4';

/// 每个子页面条目尾部的保留时间戳槽位宽度（始终写入零字节）
pub const TIMESTAMP_PLACEHOLDER_LEN: usize = 4;

/// 页面的内容文档文件名，由外部渲染器解析
pub const CONTENT_FILE: &str = "Text.md";

/// 服务端名称标识，用于日志输出
pub const SERVER_NAME: &str = "mdpage-server";

/// 客户端建立连接的超时时间（毫秒）
pub const CONNECT_TIMEOUT_MS: u64 = 5000;

/// 客户端单次读写的超时时间（毫秒），超时按传输失败处理
pub const IO_TIMEOUT_MS: u64 = 5000;

/// 本地页面存档文件的扩展名
pub const ARCHIVE_EXTENSION: &str = "mdp";

lazy_static! {
    /// 由页面制作工具生成的保留文件名列表。
    ///
    /// 这些文件随页面存档一同分发，但不属于用户附件，
    /// 因此不出现在附件列表中。
    pub static ref RESERVED_FILES: Vec<&'static str> = {
        vec![CONTENT_FILE, "Data.yml", "Code.py", "Code.pyd"]
    };
}
