// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 线路协议模块
//!
//! 该模块是客户端与服务端共享的核心组件，负责把查询与响应报文在
//! 强类型结构体与字节序列之间相互转换。它涵盖了：
//! 1. 帧格式：4 字节大端长度前缀 + 等长负载。
//! 2. 查询负载：识别码、消息类型、路径。
//! 3. 响应负载：识别码、状态标记、页面存档、解析路径与子页面列表。
//! 4. 客户端侧的同步帧读写。
//!
//! 协议严格一次连接一次请求：任何一方完成一次收发后即关闭连接。
//! 帧读取提前终止（长度前缀不足 4 字节，或负载中途截断）是传输失败，
//! 而不是一个值——调用方必须将其等同于 "无应答、连接已关闭" 处理。

use crate::{exception::Exception, param::*};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use std::io::{ErrorKind, Read, Write};

/// 一个子页面条目。
///
/// `timestamp` 是线路格式中的保留槽位：编码时始终写入四个零字节，
/// 解码时原样读出但不参与任何计算。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpage {
    /// 子页面名（即子目录的实际存储名）
    pub name: String,
    /// 保留的时间戳槽位
    pub timestamp: [u8; TIMESTAMP_PLACEHOLDER_LEN],
}

impl Subpage {
    /// 以零时间戳构造条目
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            timestamp: [0; TIMESTAMP_PLACEHOLDER_LEN],
        }
    }
}

/// 客户端发往服务端的查询报文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// 请求一个页面。路径为斜杠分隔、无前导斜杠的 UTF-8 字符串，空串表示根页面。
    Page { path: String },
    /// 要求服务端停止接受新连接。不携带任何后续字节，也不会收到应答。
    ShutDown,
}

impl Query {
    /// 把查询编码为帧负载字节
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        buffer.put_slice(&IDENTIFIER);
        match self {
            Query::Page { path } => {
                buffer.put_u8(MSG_QUERY);
                let path_bytes = path.as_bytes();
                buffer.put_u16(path_bytes.len() as u16);
                buffer.put_slice(path_bytes);
            }
            Query::ShutDown => {
                buffer.put_u8(MSG_SHUTDOWN);
            }
        }
        buffer.freeze()
    }

    /// 从帧负载字节尝试解析查询（服务端侧）。
    ///
    /// 负载不足 3 字节、识别码不符、消息类型未知或路径字段与声明长度
    /// 不一致时返回 [`Exception::MalformedQuery`]；服务端对此记录日志并
    /// 直接关闭连接，不作应答。
    pub fn try_from(payload: &[u8]) -> Result<Self, Exception> {
        if payload.len() < 3 || payload[..2] != IDENTIFIER {
            return Err(Exception::MalformedQuery);
        }
        match payload[2] {
            MSG_SHUTDOWN => Ok(Query::ShutDown),
            MSG_QUERY => {
                let mut cursor = &payload[3..];
                if cursor.remaining() < 2 {
                    return Err(Exception::MalformedQuery);
                }
                let path_length = cursor.get_u16() as usize;
                if cursor.remaining() < path_length {
                    return Err(Exception::MalformedQuery);
                }
                let path = String::from_utf8(cursor[..path_length].to_vec())
                    .map_err(|_| Exception::MalformedQuery)?;
                Ok(Query::Page { path })
            }
            _ => Err(Exception::MalformedQuery),
        }
    }
}

/// 服务端对一次页面查询的响应报文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// 页面已找到：携带页面存档、服务端纠正过大小写的解析路径以及子页面列表。
    Found {
        archive: Bytes,
        resolved_path: String,
        subpages: Vec<Subpage>,
    },
    /// 页面未找到：携带成功匹配到的最长路径前缀（含第一个未匹配段）。
    NotFound { matched_path: String },
}

impl Response {
    /// 把响应编码为帧负载字节
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        buffer.put_slice(&IDENTIFIER);
        match self {
            Response::Found {
                archive,
                resolved_path,
                subpages,
            } => {
                buffer.put_u8(STATUS_FOUND);
                buffer.put_u32(archive.len() as u32);
                buffer.put_slice(archive);
                let path_bytes = resolved_path.as_bytes();
                buffer.put_u16(path_bytes.len() as u16);
                buffer.put_slice(path_bytes);
                buffer.put_u16(subpages.len() as u16);
                for subpage in subpages {
                    let name_bytes = subpage.name.as_bytes();
                    buffer.put_u16(name_bytes.len() as u16);
                    buffer.put_slice(name_bytes);
                    buffer.put_slice(&subpage.timestamp);
                }
            }
            Response::NotFound { matched_path } => {
                buffer.put_u8(STATUS_NOT_FOUND);
                let path_bytes = matched_path.as_bytes();
                buffer.put_u16(path_bytes.len() as u16);
                buffer.put_slice(path_bytes);
            }
        }
        buffer.freeze()
    }

    /// 从帧负载字节尝试解析响应（客户端侧）。
    ///
    /// 识别码不符返回 [`Exception::InvalidIdentifier`]；
    /// 字段与声明长度不一致或状态标记未知返回 [`Exception::MalformedResponse`]。
    pub fn try_from(payload: &[u8]) -> Result<Self, Exception> {
        if payload.len() < 2 || payload[..2] != IDENTIFIER {
            return Err(Exception::InvalidIdentifier);
        }
        if payload.len() < 3 {
            return Err(Exception::MalformedResponse);
        }
        let status = payload[2];
        let mut cursor = &payload[3..];
        match status {
            STATUS_FOUND => {
                if cursor.remaining() < 4 {
                    return Err(Exception::MalformedResponse);
                }
                let archive_length = cursor.get_u32() as usize;
                if cursor.remaining() < archive_length {
                    return Err(Exception::MalformedResponse);
                }
                let archive = Bytes::copy_from_slice(&cursor[..archive_length]);
                cursor.advance(archive_length);

                let resolved_path = read_string16(&mut cursor)?;

                if cursor.remaining() < 2 {
                    return Err(Exception::MalformedResponse);
                }
                let subpage_count = cursor.get_u16() as usize;
                let mut subpages = Vec::with_capacity(subpage_count);
                for _ in 0..subpage_count {
                    let name = read_string16(&mut cursor)?;
                    if cursor.remaining() < TIMESTAMP_PLACEHOLDER_LEN {
                        return Err(Exception::MalformedResponse);
                    }
                    let mut timestamp = [0u8; TIMESTAMP_PLACEHOLDER_LEN];
                    timestamp.copy_from_slice(&cursor[..TIMESTAMP_PLACEHOLDER_LEN]);
                    cursor.advance(TIMESTAMP_PLACEHOLDER_LEN);
                    subpages.push(Subpage { name, timestamp });
                }
                Ok(Response::Found {
                    archive,
                    resolved_path,
                    subpages,
                })
            }
            STATUS_NOT_FOUND => {
                let matched_path = read_string16(&mut cursor)?;
                Ok(Response::NotFound { matched_path })
            }
            _ => Err(Exception::MalformedResponse),
        }
    }
}

/// 读取一个 2 字节大端长度前缀的 UTF-8 字符串
fn read_string16(cursor: &mut &[u8]) -> Result<String, Exception> {
    if cursor.remaining() < 2 {
        return Err(Exception::MalformedResponse);
    }
    let length = cursor.get_u16() as usize;
    if cursor.remaining() < length {
        return Err(Exception::MalformedResponse);
    }
    let value = String::from_utf8(cursor[..length].to_vec())
        .map_err(|_| Exception::MalformedResponse)?;
    cursor.advance(length);
    Ok(value)
}

/// 同步发送一个帧：4 字节大端长度前缀，随后是完整负载。
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> std::io::Result<()> {
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// 同步读取一个帧，返回其负载。
///
/// 长度前缀不足 4 字节或负载中途截断返回 [`Exception::TruncatedFrame`]；
/// 其他读错误（含读超时到期）返回 [`Exception::ConnectionFailed`]。
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, Exception> {
    let mut length_bytes = [0u8; 4];
    read_exact_classified(reader, &mut length_bytes)?;
    let length = u32::from_be_bytes(length_bytes) as usize;
    let mut payload = vec![0u8; length];
    read_exact_classified(reader, &mut payload)?;
    Ok(payload)
}

/// `read_exact` 的错误分类包装：提前到达流末尾按截断帧处理
fn read_exact_classified<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<(), Exception> {
    reader.read_exact(buffer).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Exception::TruncatedFrame,
        _ => Exception::ConnectionFailed,
    })
}
