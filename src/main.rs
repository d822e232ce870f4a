// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面服务端入口
//!
//! 该程序实现了基于 Tokio 运行时的 Markdown 页面服务端。
//! 核心功能包括：
//! - 把站点根目录树以页面形式对外提供：目录即页面，直接文件打包为存档，
//!   直接子目录列为子页面
//! - 支持多线程异步 I/O 处理，每个连接一个独立会话
//! - 后台管理控制台（CLI 指令交互）
//!
//! 协议细节见 `protocol` 模块；会话与接收循环见 `server` 模块。

use mdpage::{config::Config, param::SERVER_NAME, server::Server};

use log::{error, info};
use log4rs;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
};

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};

/// # 程序入口点
///
/// 初始化系统环境、加载配置并启动主接收循环。
fn main() {
    // 1. 初始化日志系统：采用 log4rs 异步日志架构，通过外部 YAML 灵活配置级别与输出目的地
    log4rs::init_file("config/log4rs.yaml", Default::default()).unwrap();

    // 2. 环境配置加载：从 TOML 文件读取运行参数
    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    info!("site root: {}", config.site_root());

    // 3. 异步运行时定制：根据配置文件动态分配工作线程数
    let runtime = Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        // 4. 网络层初始化：
        // 支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        info!(
            "{}将在{}地址、{}端口上监听Socket连接",
            SERVER_NAME,
            address,
            config.port()
        );
        let socket = SocketAddrV4::new(address, config.port());

        let server = match Server::bind(
            config.site_root(),
            socket.into(),
            Duration::from_millis(config.accept_pause_ms()),
        )
        .await
        {
            Ok(server) => server,
            Err(e) => {
                error!("无法绑定端口：{}，错误：{}", config.port(), e);
                panic!("无法绑定端口：{}，错误：{}", config.port(), e);
            }
        };
        info!("端口{}绑定完成", config.port());

        // 5. 启动交互式管理控制台任务
        // 该任务运行在后台，不阻塞接收循环，提供运维指令支持。
        // 注意：stop 只清除运行标志，接收循环要等到下一次迭代才会退出。
        let running = server.running_flag();
        let active_sessions = server.active_sessions();
        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut input = String::new();
            loop {
                input.clear();
                match reader.read_line(&mut input).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let cmd = input.trim();
                match cmd {
                    "stop" => {
                        let mut flag = running.lock().unwrap();
                        *flag = false;
                        println!("停机指令已激活，服务端将在下一次循环迭代时退出...");
                        break;
                    }
                    "help" => {
                        println!("== {} Help ==", SERVER_NAME);
                        println!("stop   - 发出停机信号");
                        println!("status - 查看当前服务端运行状态");
                        println!("help   - 显示此帮助信息");
                        println!("====================");
                    }
                    "status" => {
                        let active_count = *active_sessions.lock().unwrap();
                        println!("== {} 状态 ===", SERVER_NAME);
                        println!("当前在途会话数: {}", active_count);
                        println!("====================");
                    }
                    _ => {
                        println!("无效的命令：{}", cmd);
                    }
                }
            }
        });

        // 6. 主接收循环
        server.run().await;
    });

    info!("服务端已停止。");
}
