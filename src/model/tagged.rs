//! 通用树模型：TaggedObject（类型标签 + 属性 + 子节点）与 Document（根信封）
//!
//! 线上格式中每个对象都是单键映射 `{类型标签: {attributes, children}}`。
//! 整树操作（克隆、比较、释放）全部使用显式栈，任意深度都不会耗尽调用栈。
//! Debug 只展开一层，子节点以数量表示。

use std::fmt;

use serde_json::Value;

/// 属性表：键有序（依赖 serde_json 的 preserve_order），值为标量
pub type Attributes = serde_json::Map<String, Value>;

/// 一个带类型标签的对象，父节点独占其子节点
#[derive(Default)]
pub struct TaggedObject {
    pub type_tag: String,
    pub attributes: Attributes,
    pub children: Vec<TaggedObject>,
}

impl TaggedObject {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// 构建辅助：追加一个属性
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 构建辅助：追加一个子节点
    pub fn with_child(mut self, child: TaggedObject) -> Self {
        self.children.push(child);
        self
    }

    /// 字符串类型的属性值；缺失或非字符串时返回 None
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.attr_str("name")
    }

    pub fn status(&self) -> Option<&str> {
        self.attr_str(crate::model::status::STATUS_KEY)
    }

    /// 只复制类型标签与属性，不含子节点
    pub fn shallow_clone(&self) -> Self {
        Self {
            type_tag: self.type_tag.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    /// 子树中的节点总数（含自身）
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// 子树最大深度（叶子为 1）
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(node.children.iter().map(|c| (c, depth + 1)));
        }
        max
    }
}

impl Clone for TaggedObject {
    fn clone(&self) -> Self {
        let mut stack = Vec::new();
        let mut current = (self.children.iter(), self.shallow_clone());
        loop {
            if let Some(child) = current.0.next() {
                let next = (child.children.iter(), child.shallow_clone());
                stack.push(std::mem::replace(&mut current, next));
                continue;
            }
            match stack.pop() {
                Some(mut parent) => {
                    parent.1.children.push(current.1);
                    current = parent;
                }
                None => return current.1,
            }
        }
    }
}

/// 结构相等：类型标签、属性集合、子节点顺序均一致
impl PartialEq for TaggedObject {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.type_tag != b.type_tag
                || a.attributes != b.attributes
                || a.children.len() != b.children.len()
            {
                return false;
            }
            stack.extend(a.children.iter().zip(b.children.iter()));
        }
        true
    }
}

impl Eq for TaggedObject {}

impl fmt::Debug for TaggedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedObject")
            .field("type_tag", &self.type_tag)
            .field("attributes", &self.attributes)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Drop for TaggedObject {
    fn drop(&mut self) {
        // 逐层摘下子节点，避免深树递归释放
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// 根信封：`{"totalCount": "...", "imdata": [...]}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// 基数提示，随根条目数变化，不作权威
    pub total_count: String,
    pub root_items: Vec<TaggedObject>,
}

impl Document {
    /// 以根条目构建文档，totalCount 取根条目数
    pub fn new(root_items: Vec<TaggedObject>) -> Self {
        Self {
            total_count: root_items.len().to_string(),
            root_items,
        }
    }

    /// "未找到" 结果：无根条目，totalCount 为 "0"
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.root_items.is_empty()
    }

    /// 约定的顶层对象（通常是租户）
    pub fn root(&self) -> Option<&TaggedObject> {
        self.root_items.first()
    }

    /// 全文档节点总数
    pub fn node_count(&self) -> usize {
        self.root_items.iter().map(TaggedObject::subtree_len).sum()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}
