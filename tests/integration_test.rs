// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 端到端集成测试
//!
//! 每个用例在后台线程上启动一个真实的服务端（临时站点目录、系统分配端口），
//! 然后用真实的客户端控制器同步驱动完整的查询-解包-导航流程。

use mdpage::{protocol, Address, Exception, NavigationController, Query, Response, Server};

use std::{
    fs,
    net::{Ipv4Addr, SocketAddrV4, TcpStream},
    path::Path,
    thread,
    time::Duration,
};

use tempfile::{tempdir, TempDir};

/// 构造一棵固定的测试站点树：
///
/// ```text
/// <root>/Text.md, root.png
/// <root>/Intro/Text.md, Data.yml, notes.txt
/// <root>/Intro/Deep/Text.md
/// <root>/intro2/Text.md
/// ```
fn build_site() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("Text.md"), "# Root").unwrap();
    fs::write(root.join("root.png"), [1u8, 2, 3]).unwrap();

    let intro = root.join("Intro");
    fs::create_dir(&intro).unwrap();
    fs::write(intro.join("Text.md"), "# Intro").unwrap();
    fs::write(intro.join("Data.yml"), "meta").unwrap();
    fs::write(intro.join("notes.txt"), "notes").unwrap();

    let deep = intro.join("Deep");
    fs::create_dir(&deep).unwrap();
    fs::write(deep.join("Text.md"), "# Deep").unwrap();

    let intro2 = root.join("intro2");
    fs::create_dir(&intro2).unwrap();
    fs::write(intro2.join("Text.md"), "# intro2").unwrap();

    dir
}

/// 在后台线程启动服务端，返回监听端口与线程句柄。
///
/// 测试用单线程运行时：接收循环在接纳暂停期间让出执行权，
/// 会话任务因此在同一线程上被调度完成。
fn start_server(site: &Path, accept_pause: Duration) -> (u16, thread::JoinHandle<()>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let socket = SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 0);
    let server = runtime
        .block_on(Server::bind(site, socket.into(), accept_pause))
        .unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        runtime.block_on(server.run());
    });
    (port, handle)
}

fn host(port: u16) -> String {
    format!("127.0.0.1:{}", port)
}

#[test]
fn test_navigate_root_lists_page() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());

    controller.navigate(&Address::parse(&host(port))).unwrap();

    assert_eq!(controller.content(), Some("# Root"));
    assert_eq!(
        controller.subpages(),
        &["Intro".to_string(), "intro2".to_string()]
    );
    assert_eq!(controller.attachments(), &["root.png".to_string()]);
    assert_eq!(controller.current().unwrap().to_string(), host(port));
    assert!(!controller.can_up());
    assert!(!controller.can_back());
    assert!(!controller.can_forward());
    // 暂存目录中有解包后的页面文件
    assert!(scratch.path().join("Text.md").exists());
    assert!(scratch.path().join("root.png").exists());
}

/// 请求大小写不一致的路径：解析成功，当前地址反映磁盘上的实际写法
#[test]
fn test_case_insensitive_resolution_echoes_stored_casing() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());

    controller
        .navigate(&Address::parse(&format!("{}/INTRO", host(port))))
        .unwrap();

    assert_eq!(
        controller.current().unwrap().to_string(),
        format!("{}/Intro", host(port))
    );
    assert_eq!(controller.content(), Some("# Intro"));
    assert_eq!(controller.subpages(), &["Deep".to_string()]);
    // Data.yml 是保留文件，不出现在附件列表
    assert_eq!(controller.attachments(), &["notes.txt".to_string()]);
    assert!(controller.can_up());
}

/// 未找到的页面不改变任何导航状态
#[test]
fn test_not_found_leaves_state_unchanged() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());

    controller.navigate(&Address::parse(&host(port))).unwrap();

    let result = controller.navigate(&Address::parse(&format!("{}/Intro/Missing", host(port))));
    assert_eq!(
        result,
        Err(Exception::PageNotFound("Intro/Missing".to_string()))
    );

    // 当前页面保持显示，历史未被压入
    assert_eq!(controller.current().unwrap().to_string(), host(port));
    assert_eq!(controller.content(), Some("# Root"));
    assert_eq!(controller.history().len(), 1);
    assert!(!controller.can_back());
    assert!(!controller.can_forward());
}

/// N 次导航后，后退 N-1 次再前进 N-1 次应复原地址与可用性标志
#[test]
fn test_history_round_trip() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());

    controller.navigate(&Address::parse(&host(port))).unwrap();
    controller
        .navigate(&Address::parse(&format!("{}/Intro", host(port))))
        .unwrap();
    controller
        .navigate(&Address::parse(&format!("{}/Intro/Deep", host(port))))
        .unwrap();

    let address_after = controller.current().unwrap().to_string();
    let flags_after = (controller.can_back(), controller.can_forward());
    assert_eq!(flags_after, (true, false));

    controller.back().unwrap();
    controller.back().unwrap();
    assert_eq!(controller.current().unwrap().to_string(), host(port));
    assert_eq!(controller.content(), Some("# Root"));
    assert!(!controller.can_back());
    assert!(controller.can_forward());

    controller.forward().unwrap();
    controller.forward().unwrap();
    assert_eq!(controller.current().unwrap().to_string(), address_after);
    assert_eq!(controller.content(), Some("# Deep"));
    assert_eq!(
        (controller.can_back(), controller.can_forward()),
        flags_after
    );
}

/// 向上导航逐级去掉最后一个路径段，根页面上为空操作
#[test]
fn test_up_navigation() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());

    controller
        .navigate(&Address::parse(&format!("{}/Intro/Deep", host(port))))
        .unwrap();
    assert!(controller.can_up());

    controller.up().unwrap();
    assert_eq!(
        controller.current().unwrap().to_string(),
        format!("{}/Intro", host(port))
    );
    // 向上是一次 navigate：压入历史
    assert_eq!(controller.history().len(), 2);
    assert!(controller.can_back());

    controller.up().unwrap();
    assert_eq!(controller.current().unwrap().to_string(), host(port));
    assert!(!controller.can_up());

    // 根页面上的向上是空操作
    controller.up().unwrap();
    assert_eq!(controller.history().len(), 3);
}

/// 中途压入新地址会丢弃前进分支
#[test]
fn test_navigate_truncates_forward_branch() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());

    controller.navigate(&Address::parse(&host(port))).unwrap();
    controller
        .navigate(&Address::parse(&format!("{}/Intro", host(port))))
        .unwrap();
    controller.back().unwrap();
    assert!(controller.can_forward());

    controller
        .navigate(&Address::parse(&format!("{}/intro2", host(port))))
        .unwrap();
    assert!(!controller.can_forward());
    assert_eq!(controller.history().len(), 2);
    assert_eq!(controller.content(), Some("# intro2"));
}

/// 直接用协议原语驱动一次查询往返
#[test]
fn test_raw_protocol_round_trip() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let query = Query::Page {
        path: "intro/deep".to_string(),
    };
    protocol::write_frame(&mut stream, &query.to_bytes()).unwrap();

    let payload = protocol::read_frame(&mut stream).unwrap();
    let response = Response::try_from(&payload).unwrap();
    match response {
        Response::Found {
            resolved_path,
            subpages,
            ..
        } => {
            assert_eq!(resolved_path, "Intro/Deep");
            assert!(subpages.is_empty());
        }
        other => panic!("expected Found, got {:?}", other),
    }
}

/// 另存的存档字节重新打开后与在线浏览结果一致
#[test]
fn test_saved_archive_matches_navigation() {
    let site = build_site();
    let (port, _handle) = start_server(site.path(), Duration::from_millis(0));
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());

    controller
        .navigate(&Address::parse(&format!("{}/Intro", host(port))))
        .unwrap();

    let saved = tempdir().unwrap();
    let file = saved.path().join("Intro.mdp");
    fs::write(&file, controller.archive_bytes().unwrap()).unwrap();

    let scratch2 = tempdir().unwrap();
    let mut offline = NavigationController::new(scratch2.path());
    offline.open_archive(&file).unwrap();

    assert_eq!(offline.content(), controller.content());
    assert_eq!(offline.attachments(), controller.attachments());
    assert!(offline.subpages().is_empty());
    assert!(offline.current().is_none());
}

/// 服务端只收帧不回帧地断开时，客户端按 "无应答" 处理且状态不变
#[test]
fn test_closed_connection_without_reply_is_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = thread::spawn(move || {
        // 接受后立即断开，不发送任何帧
        let _ = listener.accept();
    });

    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());
    let result = controller.navigate(&Address::parse(&host(port)));

    // 依时序可能表现为截断帧或连接复位，两者都归为传输失败
    assert!(result.unwrap_err().is_transport());
    assert!(controller.current().is_none());
    assert!(controller.history().is_empty());
    accepted.join().unwrap();
}

/// 停机报文停止后续 accept：接收循环退出，端口随之关闭
#[test]
fn test_shutdown_stops_future_accepts() {
    let site = build_site();
    let (port, handle) = start_server(site.path(), Duration::from_millis(200));

    // 停机前的查询得到完整有效的响应
    let scratch = tempdir().unwrap();
    let mut controller = NavigationController::new(scratch.path());
    controller.navigate(&Address::parse(&host(port))).unwrap();

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    protocol::write_frame(&mut stream, &Query::ShutDown.to_bytes()).unwrap();
    // 停机不作应答，连接由服务端直接关闭
    drop(stream);

    // 接纳暂停让出执行权，停机会话在暂停期间翻转运行标志，循环随后退出
    handle.join().unwrap();

    assert!(TcpStream::connect(("127.0.0.1", port)).is_err());
}
