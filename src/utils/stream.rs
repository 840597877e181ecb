//! 增量解析：逐字节扫描输入，产出事件流，再用显式栈把事件组装成文档
//!
//! 不先把整个输入物化成 JSON 值树：每个打开的节点只保存它已完成的子节点，
//! 节点闭合时立即挂到父节点上。嵌套深度只受内存限制。
//! 字符串转义与数字格式交给 serde_json 校验。

use std::io::BufRead;

use serde_json::{Number, Value};

use crate::model::error::TreeError;
use crate::model::tagged::{Attributes, Document, TaggedObject};

/// 解析事件；Scalar 为字符串、数字、布尔或 null
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Key(String),
    Scalar(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    ObjectKeyOrEnd,
    ObjectKey,
    ObjectValue,
    ObjectCommaOrEnd,
    ArrayValueOrEnd,
    ArrayValue,
    ArrayCommaOrEnd,
}

/// 事件读取器：校验 JSON 语法，容器嵌套用 `stack` 记录而非递归
pub struct EventReader<R> {
    reader: R,
    offset: u64,
    stack: Vec<Expect>,
    started: bool,
    scratch: Vec<u8>,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            stack: Vec::new(),
            started: false,
            scratch: Vec::new(),
        }
    }

    /// 已消费的字节数
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 当前打开的容器层数
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// 下一个事件；整个文档读完且无多余内容时返回 None
    pub fn next_event(&mut self) -> Result<Option<Event>, TreeError> {
        loop {
            self.skip_whitespace()?;
            let Some(expect) = self.stack.last().copied() else {
                if self.started {
                    return match self.peek()? {
                        None => Ok(None),
                        Some(b) => Err(self.malformed(format!("文档结束后存在多余内容 '{}'", b as char))),
                    };
                }
                self.started = true;
                return self.read_value().map(Some);
            };

            match expect {
                Expect::ObjectKeyOrEnd | Expect::ObjectKey => {
                    if expect == Expect::ObjectKeyOrEnd && self.peek()? == Some(b'}') {
                        self.consume(1);
                        self.stack.pop();
                        return Ok(Some(Event::EndObject));
                    }
                    let key = self.read_key()?;
                    self.set_top(Expect::ObjectValue);
                    return Ok(Some(Event::Key(key)));
                }
                Expect::ObjectValue => {
                    self.set_top(Expect::ObjectCommaOrEnd);
                    return self.read_value().map(Some);
                }
                Expect::ObjectCommaOrEnd => match self.bump()? {
                    Some(b',') => self.set_top(Expect::ObjectKey),
                    Some(b'}') => {
                        self.stack.pop();
                        return Ok(Some(Event::EndObject));
                    }
                    other => return Err(self.unexpected(other, "',' 或 '}'")),
                },
                Expect::ArrayValueOrEnd | Expect::ArrayValue => {
                    if expect == Expect::ArrayValueOrEnd && self.peek()? == Some(b']') {
                        self.consume(1);
                        self.stack.pop();
                        return Ok(Some(Event::EndArray));
                    }
                    self.set_top(Expect::ArrayCommaOrEnd);
                    return self.read_value().map(Some);
                }
                Expect::ArrayCommaOrEnd => match self.bump()? {
                    Some(b',') => self.set_top(Expect::ArrayValue),
                    Some(b']') => {
                        self.stack.pop();
                        return Ok(Some(Event::EndArray));
                    }
                    other => return Err(self.unexpected(other, "',' 或 ']'")),
                },
            }
        }
    }

    /// 与 `next_event` 相同，但把提前结束视为格式错误
    pub fn expect_event(&mut self) -> Result<Event, TreeError> {
        match self.next_event()? {
            Some(event) => Ok(event),
            None => Err(self.malformed("意外的文件结尾".to_string())),
        }
    }

    fn set_top(&mut self, expect: Expect) {
        if let Some(top) = self.stack.last_mut() {
            *top = expect;
        }
    }

    fn read_value(&mut self) -> Result<Event, TreeError> {
        match self.peek()? {
            Some(b'{') => {
                self.consume(1);
                self.stack.push(Expect::ObjectKeyOrEnd);
                Ok(Event::StartObject)
            }
            Some(b'[') => {
                self.consume(1);
                self.stack.push(Expect::ArrayValueOrEnd);
                Ok(Event::StartArray)
            }
            Some(b'"') => Ok(Event::Scalar(Value::String(self.read_string()?))),
            Some(b't') => self.read_literal(b"true", Value::Bool(true)),
            Some(b'f') => self.read_literal(b"false", Value::Bool(false)),
            Some(b'n') => self.read_literal(b"null", Value::Null),
            Some(b) if b == b'-' || b.is_ascii_digit() => self.read_number(),
            other => Err(self.unexpected(other, "JSON 值")),
        }
    }

    fn read_key(&mut self) -> Result<String, TreeError> {
        match self.peek()? {
            Some(b'"') => {}
            other => return Err(self.unexpected(other, "对象键")),
        }
        let key = self.read_string()?;
        self.skip_whitespace()?;
        match self.bump()? {
            Some(b':') => Ok(key),
            other => Err(self.unexpected(other, "':'")),
        }
    }

    /// 读取一个带引号的字符串（当前位置为开引号）
    fn read_string(&mut self) -> Result<String, TreeError> {
        self.consume(1);
        self.scratch.clear();
        self.scratch.push(b'"');
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Err(self.malformed("字符串未闭合".to_string()));
            }
            match buf.iter().position(|b| *b == b'"' || *b == b'\\') {
                Some(pos) => {
                    let special = buf[pos];
                    self.scratch.extend_from_slice(&buf[..pos]);
                    self.consume(pos + 1);
                    if special == b'"' {
                        break;
                    }
                    self.scratch.push(b'\\');
                    match self.bump()? {
                        Some(escaped) => self.scratch.push(escaped),
                        None => return Err(self.malformed("字符串未闭合".to_string())),
                    }
                }
                None => {
                    let n = buf.len();
                    self.scratch.extend_from_slice(buf);
                    self.consume(n);
                }
            }
        }
        self.scratch.push(b'"');
        serde_json::from_slice::<String>(&self.scratch)
            .map_err(|e| self.malformed(format!("字符串无效: {}", e)))
    }

    fn read_number(&mut self) -> Result<Event, TreeError> {
        self.scratch.clear();
        while let Some(b) = self.peek()? {
            if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E') {
                self.scratch.push(b);
                self.consume(1);
            } else {
                break;
            }
        }
        serde_json::from_slice::<Number>(&self.scratch)
            .map(|n| Event::Scalar(Value::Number(n)))
            .map_err(|_| {
                let text = String::from_utf8_lossy(&self.scratch).into_owned();
                self.malformed(format!("数字无效: {}", text))
            })
    }

    fn read_literal(&mut self, literal: &[u8], value: Value) -> Result<Event, TreeError> {
        for expected in literal {
            match self.bump()? {
                Some(b) if b == *expected => {}
                other => return Err(self.unexpected(other, &String::from_utf8_lossy(literal))),
            }
        }
        Ok(Event::Scalar(value))
    }

    fn skip_whitespace(&mut self) -> Result<(), TreeError> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let n = buf
                .iter()
                .take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
                .count();
            let exhausted = n == buf.len();
            self.consume(n);
            if !exhausted {
                return Ok(());
            }
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, TreeError> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    fn bump(&mut self) -> Result<Option<u8>, TreeError> {
        let b = self.peek()?;
        if b.is_some() {
            self.consume(1);
        }
        Ok(b)
    }

    fn consume(&mut self, n: usize) {
        self.reader.consume(n);
        self.offset += n as u64;
    }

    fn malformed(&self, msg: String) -> TreeError {
        TreeError::Malformed(format!("{} (字节偏移 {})", msg, self.offset))
    }

    fn unexpected(&self, found: Option<u8>, expected: &str) -> TreeError {
        match found {
            None => self.malformed(format!("意外的文件结尾，期望 {}", expected)),
            Some(b) => self.malformed(format!("意外字符 '{}'，期望 {}", b as char, expected)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// 在记录对象内，等待 attributes / children / 结束
    Record,
    /// 在 children 数组内
    Children,
    /// 记录已闭合，等待单键包装对象闭合
    WrapperEnd,
}

struct OpenNode {
    node: TaggedObject,
    phase: Phase,
}

/// 以事件流构建文档
pub fn read_document<R: BufRead>(reader: R) -> Result<Document, TreeError> {
    let mut events = EventReader::new(reader);
    match events.next_event()? {
        Some(Event::StartObject) => {}
        Some(_) => return Err(TreeError::Malformed("文档根必须是 JSON 对象".into())),
        None => return Err(TreeError::Malformed("文档为空".into())),
    }

    let mut total_count: Option<String> = None;
    let mut root_items: Option<Vec<TaggedObject>> = None;
    let mut in_items = false;
    let mut open: Vec<OpenNode> = Vec::new();
    let mut max_depth = 0usize;

    loop {
        if let Some(top) = open.last_mut() {
            let phase = top.phase;
            match phase {
                // 重复的键以最后一次出现为准，与整体解析时 serde_json::Map 的行为一致
                Phase::Record => match events.expect_event()? {
                    Event::Key(k) if k == "attributes" => {
                        top.node.attributes.clear();
                        read_attributes(&mut events, &mut top.node.attributes)?;
                    }
                    Event::Key(k) if k == "children" => {
                        top.node.children.clear();
                        if begin_array(&mut events, "children")? {
                            top.phase = Phase::Children;
                        }
                    }
                    Event::Key(k) => {
                        tracing::debug!("忽略对象 {} 中的未知键: {}", top.node.type_tag, k);
                        skip_value(&mut events)?;
                    }
                    Event::EndObject => top.phase = Phase::WrapperEnd,
                    other => return Err(unexpected_event(&other, "对象记录")),
                },
                Phase::Children => match events.expect_event()? {
                    Event::StartObject => {
                        let child = open_node(&mut events)?;
                        open.push(child);
                        max_depth = max_depth.max(open.len());
                    }
                    Event::EndArray => top.phase = Phase::Record,
                    other => return Err(unexpected_event(&other, "children 元素")),
                },
                Phase::WrapperEnd => match events.expect_event()? {
                    Event::EndObject => {
                        if let Some(done) = open.pop() {
                            match open.last_mut() {
                                Some(parent) => parent.node.children.push(done.node),
                                None => root_items.get_or_insert_with(Vec::new).push(done.node),
                            }
                        }
                    }
                    Event::Key(k) if k == top.node.type_tag => match events.expect_event()? {
                        Event::StartObject => {
                            top.node = TaggedObject::new(k);
                            top.phase = Phase::Record;
                        }
                        _ => return Err(TreeError::Malformed(format!("类型标签 {} 的值必须是对象", k))),
                    },
                    Event::Key(k) => {
                        return Err(TreeError::Malformed(format!(
                            "对象 {} 含有多个类型标签（多余的 '{}'）",
                            top.node.type_tag, k
                        )))
                    }
                    other => return Err(unexpected_event(&other, "对象结束")),
                },
            }
        } else if in_items {
            match events.expect_event()? {
                Event::StartObject => {
                    open.push(open_node(&mut events)?);
                    max_depth = max_depth.max(1);
                }
                Event::EndArray => in_items = false,
                other => return Err(unexpected_event(&other, "imdata 元素")),
            }
        } else {
            match events.expect_event()? {
                Event::Key(k) if k == "totalCount" => total_count = Some(read_count(&mut events)?),
                Event::Key(k) if k == "imdata" => {
                    root_items = Some(Vec::new());
                    in_items = begin_array(&mut events, "imdata")?;
                }
                Event::Key(k) => {
                    tracing::debug!("忽略文档中的未知键: {}", k);
                    skip_value(&mut events)?;
                }
                Event::EndObject => break,
                other => return Err(unexpected_event(&other, "文档键")),
            }
        }
    }

    if let Some(event) = events.next_event()? {
        return Err(unexpected_event(&event, "文档结尾"));
    }
    let root_items = root_items.ok_or(TreeError::MissingKey("imdata"))?;
    tracing::debug!("增量解析完成: {} 字节，最大嵌套 {} 层", events.offset(), max_depth);

    Ok(Document {
        total_count: total_count.unwrap_or_else(|| root_items.len().to_string()),
        root_items,
    })
}

/// 已读入 `{`：读取类型标签并进入记录对象
fn open_node<R: BufRead>(events: &mut EventReader<R>) -> Result<OpenNode, TreeError> {
    let type_tag = match events.expect_event()? {
        Event::Key(tag) => tag,
        Event::EndObject => return Err(TreeError::Malformed("对象缺少类型标签".into())),
        other => return Err(unexpected_event(&other, "类型标签")),
    };
    match events.expect_event()? {
        Event::StartObject => Ok(OpenNode {
            node: TaggedObject::new(type_tag),
            phase: Phase::Record,
        }),
        _ => Err(TreeError::Malformed(format!("类型标签 {} 的值必须是对象", type_tag))),
    }
}

fn read_attributes<R: BufRead>(events: &mut EventReader<R>, attributes: &mut Attributes) -> Result<(), TreeError> {
    match events.expect_event()? {
        Event::StartObject => {}
        Event::Scalar(Value::Null) => return Ok(()),
        _ => return Err(TreeError::Malformed("attributes 必须是对象".into())),
    }
    loop {
        match events.expect_event()? {
            Event::Key(key) => match events.expect_event()? {
                Event::Scalar(value) => {
                    attributes.insert(key, value);
                }
                _ => return Err(TreeError::Malformed(format!("属性 {} 的值必须是标量", key))),
            },
            Event::EndObject => return Ok(()),
            other => return Err(unexpected_event(&other, "属性键")),
        }
    }
}

/// 数组开始返回 true；null 视为缺省返回 false
fn begin_array<R: BufRead>(events: &mut EventReader<R>, what: &str) -> Result<bool, TreeError> {
    match events.expect_event()? {
        Event::StartArray => Ok(true),
        Event::Scalar(Value::Null) => Ok(false),
        _ => Err(TreeError::Malformed(format!("{} 必须是数组", what))),
    }
}

fn read_count<R: BufRead>(events: &mut EventReader<R>) -> Result<String, TreeError> {
    match events.expect_event()? {
        Event::Scalar(Value::String(s)) => Ok(s),
        Event::Scalar(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(TreeError::Malformed("totalCount 必须是字符串或数字".into())),
    }
}

/// 跳过一个完整的值（任意嵌套）
fn skip_value<R: BufRead>(events: &mut EventReader<R>) -> Result<(), TreeError> {
    let mut depth = 0usize;
    loop {
        match events.expect_event()? {
            Event::StartObject | Event::StartArray => depth += 1,
            Event::EndObject | Event::EndArray => depth = depth.saturating_sub(1),
            Event::Key(_) | Event::Scalar(_) => {}
        }
        if depth == 0 {
            return Ok(());
        }
    }
}

fn unexpected_event(event: &Event, context: &str) -> TreeError {
    TreeError::Malformed(format!("{}处出现意外的 {:?}", context, event))
}
