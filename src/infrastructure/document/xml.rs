//! 可编辑的 XML 树
//!
//! 基于 quick-xml 事件流构建的最小 DOM：保留元素顺序、带前缀的限定名、
//! 属性顺序和文本节点，修改后原样序列化回去。不做命名空间解析，
//! WordprocessingML 中的前缀（`w:`、`r:`、`wp:`）都是约定俗成的。

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::DocumentError;

/// XML 节点
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// XML 元素
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    // ========== 属性 ==========

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    // ========== 子元素 ==========

    /// 所有元素子节点
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.name == name)
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// 删除所有同名子元素，返回删除的数量
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|n| !matches!(n, XmlNode::Element(e) if e.name == name));
        before - self.children.len()
    }

    /// 按 schema 顺序插入子元素
    ///
    /// `order` 列出父元素允许的子元素顺序；新元素插在第一个排位更靠后的
    /// 已知子元素之前，不在列表中的元素原位保留。
    pub fn insert_ordered(&mut self, child: XmlElement, order: &[&str]) -> usize {
        let pos = match rank(order, &child.name) {
            Some(r) => self
                .children
                .iter()
                .position(|n| match n {
                    XmlNode::Element(e) => rank(order, &e.name).is_some_and(|er| er > r),
                    XmlNode::Text(_) => false,
                })
                .unwrap_or(self.children.len()),
            None => self.children.len(),
        };
        self.children.insert(pos, XmlNode::Element(child));
        pos
    }

    /// 用新元素替换所有同名子元素，并放到 schema 规定的位置
    pub fn set_child_ordered(&mut self, child: XmlElement, order: &[&str]) {
        self.remove_children(&child.name);
        self.insert_ordered(child, order);
    }

    /// 取得同名子元素，不存在时按 schema 顺序创建
    pub fn get_or_insert_ordered(&mut self, name: &str, order: &[&str]) -> &mut XmlElement {
        let existing = self
            .children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(e) if e.name == name));
        let pos = match existing {
            Some(pos) => pos,
            None => self.insert_ordered(XmlElement::new(name), order),
        };
        match &mut self.children[pos] {
            XmlNode::Element(e) => e,
            XmlNode::Text(_) => unreachable!("position always points at an element"),
        }
    }

    /// 取得同名子元素，不存在时插到最前面（`w:pPr`、`w:rPr` 必须是第一个子元素）
    pub fn get_or_insert_first(&mut self, name: &str) -> &mut XmlElement {
        let pos = match self
            .children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(e) if e.name == name))
        {
            Some(pos) => pos,
            None => {
                self.children.insert(0, XmlNode::Element(XmlElement::new(name)));
                0
            }
        };
        match &mut self.children[pos] {
            XmlNode::Element(e) => e,
            XmlNode::Text(_) => unreachable!("position always points at an element"),
        }
    }

    // ========== 遍历 ==========

    /// 深度优先访问所有指定名称的后代元素
    ///
    /// 命中的元素内部不再继续查找同名元素（例如文本框里嵌套的段落）。
    pub fn for_each_descendant<'a>(&'a self, name: &str, f: &mut impl FnMut(&'a XmlElement)) {
        for child in self.elements() {
            if child.name == name {
                f(child);
            } else {
                child.for_each_descendant(name, f);
            }
        }
    }

    pub fn for_each_descendant_mut(&mut self, name: &str, f: &mut impl FnMut(&mut XmlElement)) {
        for child in self.elements_mut() {
            if child.name == name {
                f(child);
            } else {
                child.for_each_descendant_mut(name, f);
            }
        }
    }

    /// 统计指定名称的后代元素（包括嵌套的）
    pub fn count_descendants(&self, name: &str) -> usize {
        self.elements()
            .map(|e| usize::from(e.name == name) + e.count_descendants(name))
            .sum()
    }

    /// 所有后代文本节点拼接
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    // ========== 解析与序列化 ==========

    /// 解析 XML 文档，返回根元素
    pub fn parse(bytes: &[u8]) -> Result<XmlElement, DocumentError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                DocumentError::xml(format!("位置 {}: {}", reader.buffer_position(), e))
            })?;
            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::xml("多余的结束标签"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = text.unescape().map_err(DocumentError::xml)?;
                        if !text.is_empty() {
                            parent.children.push(XmlNode::Text(text.into_owned()));
                        }
                    }
                }
                Event::CData(cdata) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(DocumentError::xml("存在未闭合的元素"));
        }
        root.ok_or_else(|| DocumentError::xml("文档没有根元素"))
    }

    /// 序列化为带 XML 声明的字节
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(DocumentError::xml)?;
        self.write_into(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DocumentError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(DocumentError::xml)?;
            return Ok(());
        }

        writer
            .write_event(Event::Start(start))
            .map_err(DocumentError::xml)?;
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_into(writer)?,
                XmlNode::Text(t) => writer
                    .write_event(Event::Text(BytesText::new(t)))
                    .map_err(DocumentError::xml)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(DocumentError::xml)?;
        Ok(())
    }
}

fn rank(order: &[&str], name: &str) -> Option<usize> {
    order.iter().position(|n| *n == name)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, DocumentError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(DocumentError::xml)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(DocumentError::xml)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::xml("存在多个根元素")),
    }
    Ok(())
}
