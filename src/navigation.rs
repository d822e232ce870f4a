// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 客户端导航模块
//!
//! 该模块是浏览器端的核心状态机，负责：
//! 1. 发起页面查询：一次同步往返（连接、发送、接收、关闭），随后同步解包。
//! 2. 维护浏览历史栈与前进/后退/向上的可用性标志。
//! 3. 管理暂存目录：单槽位页面缓存，成功导航前整体清空并替换，
//!    失败的导航不触碰其内容。
//! 4. 打开本地页面存档文件（与查询响应中的存档负载字节完全一致）。
//!
//! 控制器自身不做并发控制：同一时刻只应有一个导航在途，
//! 由调用方（界面层）负责串行化交互触发的导航。核心不做任何自动重试，
//! 重试永远是用户再次发起的独立动作。

use crate::{
    address::Address,
    archive::{self, Entry},
    exception::Exception,
    param::*,
    protocol::{self, Query, Response},
    util,
};

use bytes::Bytes;
use log::{debug, info, warn};

use std::{
    fs,
    net::{TcpStream, ToSocketAddrs},
    path::{Path, PathBuf},
    time::Duration,
};

/// 浏览历史：地址栈加当前位置下标。
///
/// 不变式：`-1 <= index < stack.len()`；
/// 后退可用当且仅当 `index > 0`；
/// 前进可用当且仅当 `index < stack.len() - 1`；
/// 压入新地址前先截断当前位置之后的全部条目。
#[derive(Debug, Clone)]
pub struct NavigationState {
    stack: Vec<Address>,
    index: isize,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationState {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            index: -1,
        }
    }

    /// 压入一个新地址：截断前进分支，追加，并指向新末尾
    pub fn push(&mut self, address: Address) {
        self.stack.truncate((self.index + 1) as usize);
        self.stack.push(address);
        self.index = self.stack.len() as isize - 1;
    }

    pub fn can_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_forward(&self) -> bool {
        self.index + 1 < self.stack.len() as isize
    }

    /// 后退目标（不移动下标；下标只在导航成功后移动）
    pub fn back_target(&self) -> Option<&Address> {
        if self.can_back() {
            self.stack.get((self.index - 1) as usize)
        } else {
            None
        }
    }

    /// 前进目标（不移动下标）
    pub fn forward_target(&self) -> Option<&Address> {
        if self.can_forward() {
            self.stack.get((self.index + 1) as usize)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// 浏览器端导航控制器。
///
/// 自有当前地址、子页面与附件列表、单槽位暂存缓存和浏览历史；
/// 所有查询失败都保持这些状态原样不动。
pub struct NavigationController {
    scratch_dir: PathBuf,
    state: NavigationState,
    current: Option<Address>,
    content: Option<String>,
    subpages: Vec<String>,
    attachments: Vec<String>,
    raw_archive: Option<Bytes>,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl NavigationController {
    /// 以指定的暂存目录构造控制器。
    ///
    /// 暂存目录是可复用的单槽位缓存：始终只保存当前显示页面的解包文件。
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            state: NavigationState::new(),
            current: None,
            content: None,
            subpages: Vec::new(),
            attachments: Vec::new(),
            raw_archive: None,
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            io_timeout: Duration::from_millis(IO_TIMEOUT_MS),
        }
    }

    /// 请求并显示一个页面，不改动历史栈。
    ///
    /// - 找到：清空暂存目录、解包存档、替换子页面/附件列表，
    ///   当前地址更新为主机加服务端回显的解析路径（以服务端大小写为准）。
    /// - 未找到：状态不变，返回携带已匹配前缀的 [`Exception::PageNotFound`]。
    /// - 传输/协议/存档失败：状态不变，返回相应异常。
    pub fn go_to(&mut self, address: &Address) -> Result<(), Exception> {
        debug!("请求页面：{}", address);
        let response = self.query(address.host(), &address.path_string())?;

        match response {
            Response::NotFound { matched_path } => {
                warn!("页面未找到，已匹配前缀：'{}'", matched_path);
                Err(Exception::PageNotFound(matched_path))
            }
            Response::Found {
                archive: archive_bytes,
                resolved_path,
                subpages,
            } => {
                // 先在内存中完整解包并确认内容文档存在，再触碰暂存目录，
                // 保证失败的导航不破坏当前显示的页面
                let entries = archive::unpack(&archive_bytes)?;
                let content = content_of(&entries).ok_or(Exception::ContentMissing)?;

                let current = Address::from_resolved(address.host(), &resolved_path);

                self.replace_scratch(&entries)?;
                self.content = Some(content);
                self.subpages = subpages.into_iter().map(|subpage| subpage.name).collect();
                self.attachments = attachments_of(&entries);
                self.raw_archive = Some(archive_bytes);

                info!(
                    "页面已加载：{}，{}个子页面，{}个附件",
                    current,
                    self.subpages.len(),
                    self.attachments.len()
                );
                self.current = Some(current);
                Ok(())
            }
        }
    }

    /// 导航到一个地址：成功后把该地址压入历史栈。
    pub fn navigate(&mut self, address: &Address) -> Result<(), Exception> {
        self.go_to(address)?;
        self.state.push(address.clone());
        Ok(())
    }

    /// 后退一步。下标只在页面成功加载后才回退；不可后退时为空操作。
    pub fn back(&mut self) -> Result<(), Exception> {
        let target = match self.state.back_target() {
            Some(target) => target.clone(),
            None => return Ok(()),
        };
        self.go_to(&target)?;
        self.state.index -= 1;
        Ok(())
    }

    /// 前进一步。下标只在页面成功加载后才推进；不可前进时为空操作。
    pub fn forward(&mut self) -> Result<(), Exception> {
        let target = match self.state.forward_target() {
            Some(target) => target.clone(),
            None => return Ok(()),
        };
        self.go_to(&target)?;
        self.state.index += 1;
        Ok(())
    }

    /// 导航到当前页面的上级页面（去掉最后一个路径段，主机不变）。
    /// 当前路径已为空（或没有当前地址）时为空操作。
    pub fn up(&mut self) -> Result<(), Exception> {
        let parent = match self.current.as_ref().and_then(|address| address.parent()) {
            Some(parent) => parent,
            None => return Ok(()),
        };
        self.navigate(&parent)
    }

    /// 打开本地页面存档文件。
    ///
    /// 本地 `.mdp` 文件与查询响应中的存档负载字节完全一致。
    /// 本地页面没有地址和子页面信息：当前地址清空、向上导航不可用、
    /// 子页面列表清空；历史栈保持不动。
    pub fn open_archive(&mut self, file: &Path) -> Result<(), Exception> {
        let bytes = fs::read(file).map_err(|_| Exception::ArchiveCorrupt)?;
        let entries = archive::unpack(&bytes)?;
        let content = content_of(&entries).ok_or(Exception::ContentMissing)?;

        self.replace_scratch(&entries)?;
        self.content = Some(content);
        self.subpages.clear();
        self.attachments = attachments_of(&entries);
        self.current = None;
        self.raw_archive = Some(Bytes::from(bytes));

        info!("本地存档已打开：{}", file.display());
        Ok(())
    }

    /// 单次同步查询往返：连接、发送、接收、关闭。
    ///
    /// 连接随返回值析构关闭——协议严格一次连接一次请求。
    fn query(&self, host: &str, path: &str) -> Result<Response, Exception> {
        let mut stream = connect(host, self.connect_timeout)?;
        stream
            .set_read_timeout(Some(self.io_timeout))
            .map_err(|_| Exception::ConnectionFailed)?;
        stream
            .set_write_timeout(Some(self.io_timeout))
            .map_err(|_| Exception::ConnectionFailed)?;

        let query = Query::Page {
            path: path.to_string(),
        };
        protocol::write_frame(&mut stream, &query.to_bytes())
            .map_err(|_| Exception::ConnectionFailed)?;

        let payload = protocol::read_frame(&mut stream)?;
        Response::try_from(&payload)
    }

    /// 清空暂存目录并写入新页面的条目（单槽位缓存的替换动作）
    fn replace_scratch(&self, entries: &[Entry]) -> Result<(), Exception> {
        fs::create_dir_all(&self.scratch_dir).map_err(|_| Exception::ArchiveCorrupt)?;
        util::clear_directory(&self.scratch_dir).map_err(|_| Exception::ArchiveCorrupt)?;
        archive::write_entries(entries, &self.scratch_dir)
            .map_err(|_| Exception::ArchiveCorrupt)
    }
}

// --- 可用性标志与访问器 ---

impl NavigationController {
    /// 后退是否可用（历史下标的纯函数）
    pub fn can_back(&self) -> bool {
        self.state.can_back()
    }

    /// 前进是否可用（历史下标与栈长的纯函数）
    pub fn can_forward(&self) -> bool {
        self.state.can_forward()
    }

    /// 向上是否可用（当前地址形状的纯函数）
    pub fn can_up(&self) -> bool {
        self.current
            .as_ref()
            .map_or(false, |address| !address.is_root())
    }

    /// 当前显示页面的地址；本地存档页面没有地址
    pub fn current(&self) -> Option<&Address> {
        self.current.as_ref()
    }

    /// 当前页面的内容文档文本，交由外部渲染器展示
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// 当前页面的子页面名列表
    pub fn subpages(&self) -> &[String] {
        &self.subpages
    }

    /// 当前页面的附件名列表（内容文档与保留文件除外）
    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    /// 当前页面的原始存档字节，供另存为本地 `.mdp` 文件
    pub fn archive_bytes(&self) -> Option<&Bytes> {
        self.raw_archive.as_ref()
    }

    /// 暂存目录路径，附件文件可从这里复制
    pub fn scratch_path(&self) -> &Path {
        &self.scratch_dir
    }

    /// 浏览历史（只读）
    pub fn history(&self) -> &NavigationState {
        &self.state
    }
}

/// 从条目中取出内容文档的文本
fn content_of(entries: &[Entry]) -> Option<String> {
    entries
        .iter()
        .find(|entry| entry.name == CONTENT_FILE)
        .map(|entry| String::from_utf8_lossy(&entry.data).to_string())
}

/// 条目中除内容文档与保留文件之外的即为附件
fn attachments_of(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| !RESERVED_FILES.contains(&entry.name.as_str()))
        .map(|entry| entry.name.clone())
        .collect()
}

/// 带超时地连接目标主机。
///
/// 主机串可携带显式端口（`host:port`），否则使用默认端口。
/// 解析失败、全部候选地址连接失败或连接超时都归为连接失败。
fn connect(host: &str, timeout: Duration) -> Result<TcpStream, Exception> {
    let addresses = match host.contains(':') {
        true => host.to_socket_addrs(),
        false => (host, DEFAULT_PORT).to_socket_addrs(),
    }
    .map_err(|_| Exception::ConnectionFailed)?;

    for address in addresses {
        if let Ok(stream) = TcpStream::connect_timeout(&address, timeout) {
            return Ok(stream);
        }
    }
    Err(Exception::ConnectionFailed)
}
