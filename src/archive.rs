// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面存档模块
//!
//! 该模块实现页面存档的打包与解包。存档是一个 gzip 压缩的字节流，
//! 内部是顺次排列的条目，每个条目为：
//!
//! ```text
//! bytes
//!  2  文件名长度（大端）
//!  n  文件名（UTF-8）
//!  4  数据长度（大端）
//!  n  数据
//! ```
//!
//! 存档只收录一个目录节点的直接常规文件；子目录的文件永远不会被收录，
//! 它们只能作为独立寻址的子页面到达。服务端按请求新鲜打包，从不缓存；
//! 本地 `.mdp` 存档文件与查询响应中的存档负载字节完全一致，
//! 打开本地文件时可直接送入同一解包流程。

use crate::{exception::Exception, protocol::Subpage, util};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

/// 存档中的一个文件条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// 文件名（不含任何路径分隔符）
    pub name: String,
    /// 文件内容
    pub data: Vec<u8>,
}

/// 把一组条目打包为 gzip 压缩的存档字节
pub fn pack(entries: &[Entry]) -> io::Result<Bytes> {
    let mut raw = BytesMut::new();
    for entry in entries {
        let name_bytes = entry.name.as_bytes();
        raw.put_u16(name_bytes.len() as u16);
        raw.put_slice(name_bytes);
        raw.put_u32(entry.data.len() as u32);
        raw.put_slice(&entry.data);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// 把存档字节解包为内存中的条目列表。
///
/// 解压失败、条目结构与声明长度不一致、或条目名携带路径分隔符时，
/// 返回 [`Exception::ArchiveCorrupt`]。先在内存中完整解包，
/// 调用方确认无误后再落盘，保证失败的导航不会触碰暂存目录。
pub fn unpack(archive: &[u8]) -> Result<Vec<Entry>, Exception> {
    let mut decoder = GzDecoder::new(archive);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|_| Exception::ArchiveCorrupt)?;

    let mut cursor = raw.as_slice();
    let mut entries = Vec::new();
    while cursor.has_remaining() {
        if cursor.remaining() < 2 {
            return Err(Exception::ArchiveCorrupt);
        }
        let name_length = cursor.get_u16() as usize;
        if cursor.remaining() < name_length {
            return Err(Exception::ArchiveCorrupt);
        }
        let name = String::from_utf8(cursor[..name_length].to_vec())
            .map_err(|_| Exception::ArchiveCorrupt)?;
        cursor.advance(name_length);

        // 条目名必须是裸文件名，防止解包时写出目录之外
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(Exception::ArchiveCorrupt);
        }

        if cursor.remaining() < 4 {
            return Err(Exception::ArchiveCorrupt);
        }
        let data_length = cursor.get_u32() as usize;
        if cursor.remaining() < data_length {
            return Err(Exception::ArchiveCorrupt);
        }
        let data = cursor[..data_length].to_vec();
        cursor.advance(data_length);

        entries.push(Entry { name, data });
    }
    Ok(entries)
}

/// 服务端打包入口：把已解析目录的直接常规文件打包为存档，
/// 并把每个直接子目录列为一个子页面条目（时间戳槽位置零）。
///
/// 文件与子页面都遵循统一的字典序迭代顺序。
pub fn assemble_page(directory: &Path) -> io::Result<(Bytes, Vec<Subpage>)> {
    let mut entries = Vec::new();
    let mut subpages = Vec::new();

    for path in util::sorted_dir_entries(directory)? {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        if path.is_file() {
            let data = fs::read(&path)?;
            entries.push(Entry { name, data });
        } else if path.is_dir() {
            subpages.push(Subpage::new(&name));
        }
    }

    Ok((pack(&entries)?, subpages))
}

/// 把解包后的条目写入目标目录（客户端暂存目录）
pub fn write_entries(entries: &[Entry], directory: &Path) -> io::Result<()> {
    for entry in entries {
        fs::write(directory.join(&entry.name), &entry.data)?;
    }
    Ok(())
}
