//! 持久化：把文档写回线上格式（2 空格缩进，键顺序为类型标签、attributes、children）
//!
//! 节点结构用显式栈输出；键名与标量值交给 serde_json 转义。
//! 非 ASCII 字符按 UTF-8 原样写出。

use std::io::{self, Write};
use std::path::Path;

use crate::model::tagged::{Attributes, Document, TaggedObject};
use crate::utils::fs::{FileAccess, LocalFs};

const INDENT: &[u8] = b"  ";

enum Step<'a> {
    Open { node: &'a TaggedObject, level: usize, last: bool },
    Close { level: usize, has_children: bool, last: bool },
}

/// 写出完整文档
pub fn write_document<W: Write>(out: &mut W, document: &Document) -> io::Result<()> {
    out.write_all(b"{\n")?;
    indent(out, 1)?;
    out.write_all(b"\"totalCount\": ")?;
    write_json(out, &document.total_count)?;
    out.write_all(b",\n")?;
    indent(out, 1)?;
    if document.root_items.is_empty() {
        out.write_all(b"\"imdata\": []\n")?;
    } else {
        out.write_all(b"\"imdata\": [\n")?;
        let last = document.root_items.len() - 1;
        for (i, item) in document.root_items.iter().enumerate() {
            write_node(out, item, 2, i == last)?;
        }
        indent(out, 1)?;
        out.write_all(b"]\n")?;
    }
    out.write_all(b"}\n")
}

/// 写出单个对象（顶层，无缩进）
pub fn write_object<W: Write>(out: &mut W, node: &TaggedObject) -> io::Result<()> {
    write_node(out, node, 0, true)
}

fn write_node<W: Write>(out: &mut W, root: &TaggedObject, level: usize, last: bool) -> io::Result<()> {
    let mut steps = vec![Step::Open { node: root, level, last }];
    while let Some(step) = steps.pop() {
        match step {
            Step::Open { node, level, last } => {
                indent(out, level)?;
                out.write_all(b"{\n")?;
                indent(out, level + 1)?;
                write_json(out, &node.type_tag)?;
                out.write_all(b": {\n")?;
                indent(out, level + 2)?;
                out.write_all(b"\"attributes\": ")?;
                write_attributes(out, &node.attributes, level + 2)?;

                let has_children = !node.children.is_empty();
                steps.push(Step::Close { level, has_children, last });
                if has_children {
                    out.write_all(b",\n")?;
                    indent(out, level + 2)?;
                    out.write_all(b"\"children\": [\n")?;
                    let last_child = node.children.len() - 1;
                    for (i, child) in node.children.iter().enumerate().rev() {
                        steps.push(Step::Open { node: child, level: level + 3, last: i == last_child });
                    }
                } else {
                    out.write_all(b"\n")?;
                }
            }
            Step::Close { level, has_children, last } => {
                if has_children {
                    indent(out, level + 2)?;
                    out.write_all(b"]\n")?;
                }
                indent(out, level + 1)?;
                out.write_all(b"}\n")?;
                indent(out, level)?;
                out.write_all(if last { &b"}\n"[..] } else { &b"},\n"[..] })?;
            }
        }
    }
    Ok(())
}

fn write_attributes<W: Write>(out: &mut W, attributes: &Attributes, level: usize) -> io::Result<()> {
    if attributes.is_empty() {
        return out.write_all(b"{}");
    }
    out.write_all(b"{\n")?;
    let last = attributes.len() - 1;
    for (i, (key, value)) in attributes.iter().enumerate() {
        indent(out, level + 1)?;
        write_json(out, key)?;
        out.write_all(b": ")?;
        write_json(out, value)?;
        out.write_all(if i == last { &b"\n"[..] } else { &b",\n"[..] })?;
    }
    indent(out, level)?;
    out.write_all(b"}")
}

fn write_json<W: Write, T: serde::Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value).map_err(io::Error::from)
}

fn indent<W: Write>(out: &mut W, level: usize) -> io::Result<()> {
    for _ in 0..level {
        out.write_all(INDENT)?;
    }
    Ok(())
}

/// 序列化为字符串
pub fn to_pretty_string(document: &Document) -> String {
    let mut buf = Vec::new();
    // 写入内存缓冲不会失败
    if let Err(e) = write_document(&mut buf, document) {
        tracing::error!("文档序列化失败: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// 写入本地文件，必要时创建中间目录；失败时记录原因并返回 false
pub fn save(document: &Document, destination: impl AsRef<Path>) -> bool {
    save_with(&LocalFs, document, destination.as_ref())
}

pub fn save_with<F: FileAccess + ?Sized>(fs: &F, document: &Document, destination: &Path) -> bool {
    let mut buf = Vec::new();
    if let Err(e) = write_document(&mut buf, document) {
        tracing::error!("文档序列化失败: {}", e);
        return false;
    }
    let ok = fs.write_bytes(destination, &buf);
    if ok {
        tracing::info!("已保存到 {} ({} 字节)", destination.display(), buf.len());
    }
    ok
}
