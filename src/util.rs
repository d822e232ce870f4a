use std::{
    fs, io,
    path::{Path, PathBuf},
};

// 目录迭代顺序由文件系统决定、随平台而异，
// 匹配回退与子页面列表统一使用文件名字节序排序后的结果
pub fn sorted_dir_entries(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        entries.push(entry?.path());
    }
    sort_dir_entries(&mut entries);
    Ok(entries)
}

fn sort_dir_entries(vec: &mut [PathBuf]) {
    vec.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
}

// 清空目录的全部内容，目录本身保留
pub fn clear_directory(path: &Path) -> io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            fs::remove_dir_all(&entry_path)?;
        } else {
            fs::remove_file(&entry_path)?;
        }
    }
    Ok(())
}
