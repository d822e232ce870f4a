// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面服务端模块
//!
//! 该模块实现了基于 Tokio 运行时的页面查询服务端。
//! 核心功能包括：
//! - 显式的 `Server` 对象：自有监听器、站点根目录、运行标志与会话计数器，
//!   不依赖任何全局可变状态。
//! - 主接收循环：每个新连接交给独立调度的会话任务处理，互不阻塞。
//! - 会话：严格一次连接一次请求——读取一个查询帧、解析路径、打包页面、
//!   写回一个响应帧、关闭连接。
//!
//! ## 已知局限（保留而非修正）
//! - 停机只阻止后续 accept，不等待在途会话完成（非优雅停机）。
//! - 接收循环在每次 accept 之后固定暂停一段时间，这是粗糙的准入节流，
//!   不是真正的背压，间隔可通过配置调整。
//! - 会话任务即发即忘；会话计数器只用于观测，不用于生命周期管理。

use crate::{
    archive,
    exception::Exception,
    param::*,
    protocol::{Query, Response},
    resolver::{self, Resolution},
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use std::{
    io,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

/// 页面服务端。
///
/// 会话之间不共享任何可写数据；运行标志（由停机会话写入、接收循环读取）
/// 与只读的站点根目录是仅有的跨会话数据。
pub struct Server {
    listener: TcpListener,
    root: PathBuf,
    running: Arc<Mutex<bool>>,
    active_sessions: Arc<Mutex<u32>>,
    accept_pause: Duration,
}

impl Server {
    /// 绑定监听地址并构造服务端。
    pub async fn bind(
        root: impl Into<PathBuf>,
        address: SocketAddr,
        accept_pause: Duration,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            root: root.into(),
            running: Arc::new(Mutex::new(true)),
            active_sessions: Arc::new(Mutex::new(0)),
            accept_pause,
        })
    }

    /// 实际监听到的本地地址（端口配置为 0 时由系统分配）
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 运行标志的句柄，供管理控制台等外部停机路径使用
    pub fn running_flag(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.running)
    }

    /// 当前在途会话数的句柄，仅用于观测
    pub fn active_sessions(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.active_sessions)
    }

    /// 主接收循环。
    ///
    /// 持续接受新连接并分发至会话任务，直到运行标志被清除。
    /// 标志在每轮循环开头检查，因此停机会话翻转标志后，
    /// 循环要到下一次迭代才会退出。
    pub async fn run(&self) {
        info!(
            "{}正在监听{}，站点根目录：{}",
            SERVER_NAME,
            match self.local_addr() {
                Ok(address) => address.to_string(),
                Err(_) => "<unknown>".to_string(),
            },
            self.root.display()
        );

        let mut id: u64 = 0;

        loop {
            // 检查停机标志位
            if !*self.running.lock().unwrap() {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }

            // 等待新的 TCP 连接
            let (stream, address) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("接受连接失败：{}", e);
                    break;
                }
            };
            debug!("[ID{}]TCP连接已建立：{}", id, address);

            // 为每个连接克隆资源句柄（Arc 引用计数增加）
            let root = self.root.clone();
            let running = Arc::clone(&self.running);
            let active_sessions = Arc::clone(&self.active_sessions);

            // 使用轻量级绿色线程处理具体会话，确保非阻塞 IO
            tokio::spawn(async move {
                {
                    // 会话计数加 1
                    let mut lock = active_sessions.lock().unwrap();
                    *lock += 1;
                }

                handle_session(stream, address, id, &root, &running).await;

                {
                    // 处理完成后会话计数减 1
                    let mut lock = active_sessions.lock().unwrap();
                    *lock -= 1;
                }
            });
            id += 1;

            // 接纳节流：每次 accept 之后固定暂停
            tokio::time::sleep(self.accept_pause).await;
        }
    }
}

/// # 会话处理器
///
/// 负责单个 TCP 流的完整生命周期：读取一个查询帧、校验、解析与打包、
/// 写回一个响应帧。任何校验失败都只记录日志并关闭连接，不作应答——
/// 客户端必须把没有收到帧的关闭连接等同于 "无应答" 处理。
async fn handle_session(
    mut stream: TcpStream,
    address: SocketAddr,
    id: u64,
    root: &Path,
    running: &Mutex<bool>,
) {
    let payload = match read_frame_async(&mut stream).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!("[ID{}]读取查询帧失败（{}），来自：{}", id, e, address);
            return;
        }
    };

    // 最小长度与识别码校验
    if payload.len() < 3 || payload[..2] != IDENTIFIER {
        warn!("[ID{}]非法的连接请求，来自地址：{}", id, address);
        return;
    }

    let query = match Query::try_from(&payload) {
        Ok(query) => query,
        Err(e) => {
            warn!("[ID{}]查询报文格式非法（{}），来自：{}", id, e, address);
            return;
        }
    };

    match query {
        Query::ShutDown => {
            // 翻转运行标志即可；在途会话不被等待（已知局限）
            *running.lock().unwrap() = false;
            info!("[ID{}]收到停机指令，服务端停止接受新连接", id);
        }
        Query::Page { path } => {
            debug!("[ID{}]查询页面路径：'{}'", id, path);

            let response = match build_response(root, &path) {
                Ok(response) => response,
                Err(e) => {
                    error!("[ID{}]读取站点目录失败：{}，关闭连接", id, e);
                    return;
                }
            };

            match &response {
                Response::Found {
                    archive, subpages, ..
                } => {
                    info!(
                        "[ID{}] '{}' 已找到，存档{}字节，{}个子页面",
                        id,
                        path,
                        archive.len(),
                        subpages.len()
                    );
                }
                Response::NotFound { matched_path } => {
                    warn!("[ID{}] '{}' 未找到，已匹配前缀：'{}'", id, path, matched_path);
                }
            }

            if let Err(e) = write_frame_async(&mut stream, &response.to_bytes()).await {
                error!("[ID{}]发送响应失败：{}", id, e);
            }
        }
    }
}

/// 对一个查询路径执行解析加打包，产出响应。
///
/// 页面存档按请求新鲜构建，从不缓存或去重；并发的相同请求彼此独立解析。
fn build_response(root: &Path, path: &str) -> io::Result<Response> {
    match resolver::resolve(root, path)? {
        Resolution::Found {
            directory,
            resolved_path,
        } => {
            let (archive, subpages) = archive::assemble_page(&directory)?;
            Ok(Response::Found {
                archive,
                resolved_path,
                subpages,
            })
        }
        Resolution::NotFound { matched_path } => Ok(Response::NotFound { matched_path }),
    }
}

/// 异步读取一个帧，返回其负载；提前终止按截断帧处理
async fn read_frame_async<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, Exception> {
    let mut length_bytes = [0u8; 4];
    reader
        .read_exact(&mut length_bytes)
        .await
        .map_err(|_| Exception::TruncatedFrame)?;
    let length = u32::from_be_bytes(length_bytes) as usize;
    let mut payload = vec![0u8; length];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| Exception::TruncatedFrame)?;
    Ok(payload)
}

/// 异步发送一个帧：长度前缀加完整负载
async fn write_frame_async<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> io::Result<()> {
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}
