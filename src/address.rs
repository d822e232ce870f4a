// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面地址模块
//!
//! 该模块负责把用户输入的地址字符串解析为强类型的 `Address` 结构体，
//! 并实现页面内链接的解析规则。它涵盖了：
//! 1. `host[/seg1/seg2/...]` 形式地址的解析（主机与路径段）。
//! 2. 相对链接（`/`、`./`、`../`）到下一个地址的换算。
//! 3. 外部链接（`http://`、`https://`）的识别与分流。
//!
//! 链接解析完全基于字符串，不做百分号解码或斜杠归一化，按字面保留。

/// 标识一个页面的地址：主机加斜杠分隔的路径。
///
/// 路径为空表示根页面。构造完成后不可变；每次导航触发都会产生一个新实例。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// 目标主机名
    host: String,
    /// 路径段序列，每段非空
    path: Vec<String>,
}

impl Address {
    /// 从地址字符串解析 `Address`。
    ///
    /// 第一个 `/` 之前为主机，之后为路径；没有 `/` 时整个输入都是主机，
    /// 路径为空（根页面）。空路径段被忽略。
    pub fn parse(input: &str) -> Self {
        match input.find('/') {
            Some(separator) => {
                let host = input[..separator].to_string();
                let path = input[separator + 1..]
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| segment.to_string())
                    .collect();
                Self { host, path }
            }
            None => Self {
                host: input.to_string(),
                path: Vec::new(),
            },
        }
    }

    /// 由主机与服务端回显的解析路径构造地址。
    ///
    /// 导航成功后，当前地址以服务端纠正过大小写的路径为准。
    pub fn from_resolved(host: &str, resolved_path: &str) -> Self {
        Self::parse(&match resolved_path.is_empty() {
            true => host.to_string(),
            false => format!("{}/{}", host, resolved_path),
        })
    }

    /// 获取主机名
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 获取路径段序列
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// 路径是否为空（即根页面）
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// 把路径段重新拼接为斜杠分隔、无前导斜杠的查询路径
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }

    /// 去掉最后一个路径段得到上级页面地址；已是根页面时返回 `None`。
    pub fn parent(&self) -> Option<Self> {
        if self.path.is_empty() {
            return None;
        }
        let mut path = self.path.clone();
        path.pop();
        Some(Self {
            host: self.host.clone(),
            path,
        })
    }

    /// 追加一个子页面名得到下级页面地址
    pub fn child(&self, name: &str) -> Self {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Self {
            host: self.host.clone(),
            path,
        }
    }
}

impl std::fmt::Display for Address {
    /// 以 `host` 或 `host/seg1/seg2` 形式输出完整地址
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.path.is_empty() {
            true => write!(f, "{}", self.host),
            false => write!(f, "{}/{}", self.host, self.path.join("/")),
        }
    }
}

/// 链接点击的解析结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// 外部链接，交由操作系统浏览器打开，不参与页面导航
    External(String),
    /// 下一个要导航到的页面地址字符串
    Page(String),
}

/// 根据当前地址和被点击的链接计算下一个导航目标。
///
/// ## 解析规则
/// 1. `http://` / `https://` 前缀：外部链接，不导航。
/// 2. 前导 `/`：保留主机，替换其后的全部路径。
/// 3. 前导 `./`：在当前路径后追加（去掉前导点，保留斜杠）。
/// 4. 前导 `../`：当前地址截断到最后一个斜杠之前，再追加（去掉前导 `..`）。
/// 5. 其他：链接本身即为完整的替换地址。
///
/// 规则 2 和 4 在当前地址不含斜杠时无法换算，返回 `None`（不触发导航）。
pub fn resolve_link(current: &str, link: &str) -> Option<LinkTarget> {
    if link.starts_with("http://") || link.starts_with("https://") {
        return Some(LinkTarget::External(link.to_string()));
    }

    if link.starts_with('/') {
        let separator = current.find('/')?;
        return Some(LinkTarget::Page(format!(
            "{}{}",
            &current[..separator],
            link
        )));
    }

    if link.starts_with("./") {
        // 去掉前导点，保留斜杠
        return Some(LinkTarget::Page(format!("{}{}", current, &link[1..])));
    }

    if link.starts_with("../") {
        let separator = current.rfind('/')?;
        return Some(LinkTarget::Page(format!(
            "{}{}",
            &current[..separator],
            &link[2..]
        )));
    }

    Some(LinkTarget::Page(link.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证仅含主机的地址解析为根页面
    #[test]
    fn test_parse_host_only() {
        let address = Address::parse("localhost");
        assert_eq!(address.host(), "localhost");
        assert!(address.is_root());
        assert_eq!(address.path_string(), "");
    }

    /// 验证带路径地址的解析与段切分
    #[test]
    fn test_parse_with_path() {
        let address = Address::parse("localhost/Projects/Rust");
        assert_eq!(address.host(), "localhost");
        assert_eq!(address.path(), &["Projects".to_string(), "Rust".to_string()]);
        assert_eq!(address.path_string(), "Projects/Rust");
    }

    /// 空路径段应被忽略
    #[test]
    fn test_parse_skips_empty_segments() {
        let address = Address::parse("localhost//A//B/");
        assert_eq!(address.path(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(Address::parse("host/A/B").to_string(), "host/A/B");
        assert_eq!(Address::parse("host").to_string(), "host");
    }

    #[test]
    fn test_parent_and_child() {
        let address = Address::parse("host/A/B");
        let parent = address.parent().unwrap();
        assert_eq!(parent.to_string(), "host/A");
        assert_eq!(parent.child("C").to_string(), "host/A/C");
        assert!(Address::parse("host").parent().is_none());
    }

    #[test]
    fn test_from_resolved() {
        assert_eq!(
            Address::from_resolved("host", "Intro").to_string(),
            "host/Intro"
        );
        assert_eq!(Address::from_resolved("host", "").to_string(), "host");
    }

    /// 外部链接不参与导航
    #[test]
    fn test_link_external() {
        assert_eq!(
            resolve_link("host/A", "https://example.org/x"),
            Some(LinkTarget::External("https://example.org/x".to_string()))
        );
        assert_eq!(
            resolve_link("host/A", "http://example.org"),
            Some(LinkTarget::External("http://example.org".to_string()))
        );
    }

    /// 前导斜杠：替换主机之后的全部内容
    #[test]
    fn test_link_absolute() {
        assert_eq!(
            resolve_link("host/A/B", "/C/D"),
            Some(LinkTarget::Page("host/C/D".to_string()))
        );
        // 当前地址没有斜杠时无法换算
        assert_eq!(resolve_link("host", "/C"), None);
    }

    /// 前导 `./`：在当前路径后追加
    #[test]
    fn test_link_relative_down() {
        assert_eq!(
            resolve_link("host/A", "./Child"),
            Some(LinkTarget::Page("host/A/Child".to_string()))
        );
    }

    /// 前导 `../`：移到同级页面
    #[test]
    fn test_link_relative_up() {
        assert_eq!(
            resolve_link("host/A/B", "../Sibling"),
            Some(LinkTarget::Page("host/A/Sibling".to_string()))
        );
        assert_eq!(resolve_link("host", "../X"), None);
    }

    /// 其他情况：链接即完整地址
    #[test]
    fn test_link_replacement() {
        assert_eq!(
            resolve_link("host/A", "other/Path"),
            Some(LinkTarget::Page("other/Path".to_string()))
        );
    }

    /// 链接按字面保留，不做归一化
    #[test]
    fn test_link_preserved_literally() {
        assert_eq!(
            resolve_link("host/A", "./Sub%20Page"),
            Some(LinkTarget::Page("host/A/Sub%20Page".to_string()))
        );
    }
}
