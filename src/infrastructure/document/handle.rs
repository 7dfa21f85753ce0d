//! 文档句柄 - 基础设施层
//!
//! `DocumentHandle` 独占一个文档的可编辑树（正文、样式、页脚、关系、内容类型）。
//! 句柄只能被一个调用者可变借用；保存时按值消费，丢弃即放弃所有修改。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DocumentError;
use crate::infrastructure::document::package::{
    empty_relationships, part_dir, rels_part_for, resolve_target, Package,
    CONTENT_TYPES_PART, CT_FOOTER, CT_STYLES, OFFICE_REL_NS, REL_TYPE_FOOTER, REL_TYPE_IMAGE,
    REL_TYPE_STYLES, WORDML_NS,
};
use crate::infrastructure::document::schema::SECTPR_ORDER;
use crate::infrastructure::document::units::twips_to_cm;
use crate::infrastructure::document::xml::{XmlElement, XmlNode};

/// A4 纸宽（缇），文档未声明页面尺寸时使用
const DEFAULT_PAGE_WIDTH_TWIPS: i64 = 11906;
/// Word 默认左右边距（缇）
const DEFAULT_SIDE_MARGIN_TWIPS: i64 = 1800;

/// 第一节的页面宽度和左右边距
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_twips: i64,
    pub left_margin_twips: i64,
    pub right_margin_twips: i64,
}

impl PageGeometry {
    /// 可用版心宽度（厘米）
    pub fn usable_width_cm(&self) -> f64 {
        twips_to_cm(self.page_width_twips - self.left_margin_twips - self.right_margin_twips)
    }
}

/// 文档句柄
#[derive(Debug)]
pub struct DocumentHandle {
    path: PathBuf,
    package: Package,
    main_part: String,
    document: XmlElement,
    relationships: XmlElement,
    content_types: XmlElement,
    styles: Option<(String, XmlElement)>,
    footers: BTreeMap<String, XmlElement>,
}

impl DocumentHandle {
    /// 从已读取的文档包构建句柄
    pub fn from_package(path: impl Into<PathBuf>, package: Package) -> Result<Self, DocumentError> {
        let main_part = package.main_document_part()?;
        let document = XmlElement::parse(package.require(&main_part)?)?;
        if document.child("w:body").is_none() {
            return Err(DocumentError::MissingPart(format!("{} 中的 w:body", main_part)));
        }

        let relationships = match package.part(&rels_part_for(&main_part)) {
            Some(bytes) => XmlElement::parse(bytes)?,
            None => empty_relationships(),
        };
        let content_types = XmlElement::parse(package.require(CONTENT_TYPES_PART)?)?;

        let base_dir = part_dir(&main_part).to_string();
        let mut styles = None;
        let mut footers = BTreeMap::new();
        for rel in relationships.elements_named("Relationship") {
            if rel.attr("TargetMode") == Some("External") {
                continue;
            }
            let (Some(rel_type), Some(target)) = (rel.attr("Type"), rel.attr("Target")) else {
                continue;
            };
            let part = resolve_target(&base_dir, target);
            let Some(bytes) = package.part(&part) else {
                continue;
            };
            if rel_type == REL_TYPE_STYLES {
                styles = Some((part, XmlElement::parse(bytes)?));
            } else if rel_type == REL_TYPE_FOOTER {
                footers.insert(part, XmlElement::parse(bytes)?);
            }
        }

        Ok(Self {
            path: path.into(),
            package,
            main_part,
            document,
            relationships,
            content_types,
            styles,
            footers,
        })
    }

    /// 打开时的文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========== 正文 ==========

    pub fn body(&self) -> Result<&XmlElement, DocumentError> {
        self.document
            .child("w:body")
            .ok_or_else(|| DocumentError::MissingPart("w:body".to_string()))
    }

    pub fn body_mut(&mut self) -> Result<&mut XmlElement, DocumentError> {
        self.document
            .child_mut("w:body")
            .ok_or_else(|| DocumentError::MissingPart("w:body".to_string()))
    }

    /// 正文中的顶层段落（不含表格内的段落）
    pub fn paragraphs(&self) -> Vec<&XmlElement> {
        self.body()
            .map(|body| body.elements_named("w:p").collect())
            .unwrap_or_default()
    }

    /// 访问正文中的所有段落，包括表格单元格里的段落
    pub fn for_each_paragraph_mut(
        &mut self,
        f: &mut impl FnMut(&mut XmlElement),
    ) -> Result<(), DocumentError> {
        self.body_mut()?.for_each_descendant_mut("w:p", f);
        Ok(())
    }

    /// 访问所有节属性（`w:sectPr`），按文档顺序
    pub fn for_each_section_mut(
        &mut self,
        f: &mut impl FnMut(&mut XmlElement),
    ) -> Result<(), DocumentError> {
        self.body_mut()?.for_each_descendant_mut("w:sectPr", f);
        Ok(())
    }

    pub fn section_count(&self) -> usize {
        self.body()
            .map(|body| body.count_descendants("w:sectPr"))
            .unwrap_or(0)
    }

    /// 追加到正文末尾，保证正文级 `w:sectPr` 仍是最后一个元素
    pub fn append_to_body(&mut self, element: XmlElement) -> Result<(), DocumentError> {
        self.append_all_to_body(vec![element])
    }

    /// 按顺序一次性追加多个元素；正文缺失时一个也不追加
    pub fn append_all_to_body(&mut self, elements: Vec<XmlElement>) -> Result<(), DocumentError> {
        let body = self.body_mut()?;
        let last_element = body
            .children
            .iter()
            .rposition(|n| matches!(n, XmlNode::Element(_)));
        let pos = match last_element {
            Some(i) if matches!(&body.children[i], XmlNode::Element(e) if e.name == "w:sectPr") => i,
            _ => body.children.len(),
        };
        let tail = body.children.split_off(pos);
        body.children.extend(elements.into_iter().map(XmlNode::Element));
        body.children.extend(tail);
        Ok(())
    }

    /// 第一节的页面几何信息
    pub fn page_geometry(&self) -> PageGeometry {
        let mut first: Option<&XmlElement> = None;
        if let Ok(body) = self.body() {
            body.for_each_descendant("w:sectPr", &mut |s| {
                if first.is_none() {
                    first = Some(s);
                }
            });
        }

        let twips = |element: Option<&XmlElement>, key: &str, default: i64| {
            element
                .and_then(|e| e.attr(key))
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(default)
        };
        let pg_sz = first.and_then(|s| s.child("w:pgSz"));
        let pg_mar = first.and_then(|s| s.child("w:pgMar"));

        PageGeometry {
            page_width_twips: twips(pg_sz, "w:w", DEFAULT_PAGE_WIDTH_TWIPS),
            left_margin_twips: twips(pg_mar, "w:left", DEFAULT_SIDE_MARGIN_TWIPS),
            right_margin_twips: twips(pg_mar, "w:right", DEFAULT_SIDE_MARGIN_TWIPS),
        }
    }

    /// 在根元素上声明命名空间前缀（已声明则不变）
    pub fn ensure_namespace(&mut self, prefix: &str, uri: &str) {
        let key = format!("xmlns:{}", prefix);
        if self.document.attr(&key).is_none() {
            self.document.set_attr(key, uri);
        }
    }

    /// 下一个可用的 `wp:docPr/@id`
    pub fn next_drawing_id(&self) -> u32 {
        let mut max = 0;
        self.document.for_each_descendant("wp:docPr", &mut |e| {
            if let Some(id) = e.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                max = max.max(id);
            }
        });
        max + 1
    }

    // ========== 样式 ==========

    /// 样式部件，缺失时创建一个只含 Normal 样式的部件
    pub fn styles_mut(&mut self) -> &mut XmlElement {
        if self.styles.is_none() {
            let part = format!("{}/styles.xml", part_dir(&self.main_part));
            let target = self.relative_target(&part);
            self.add_relationship(REL_TYPE_STYLES, &target);
            self.ensure_override(&part, CT_STYLES);
            self.styles = Some((part, default_styles()));
        }
        match &mut self.styles {
            Some((_, tree)) => tree,
            None => unreachable!("styles part is created above"),
        }
    }

    // ========== 页脚 ==========

    /// 为每一节确定默认页脚部件，返回按节顺序排列的部件名
    ///
    /// 已有默认页脚的节直接使用；没有的节沿用上一节的页脚（与 Word 的
    /// “链接到前一节”一致）；第一节也没有时新建页脚部件并添加引用。
    pub fn ensure_default_footers(&mut self) -> Result<Vec<String>, DocumentError> {
        if self.section_count() == 0 {
            self.body_mut()?.push(XmlElement::new("w:sectPr"));
        }

        let mut references: Vec<Option<String>> = Vec::new();
        self.body()?.for_each_descendant("w:sectPr", &mut |s| {
            references.push(default_footer_rid(s).map(str::to_owned));
        });

        let mut parts = Vec::with_capacity(references.len());
        let mut created: BTreeMap<usize, String> = BTreeMap::new();
        let mut previous: Option<String> = None;

        for (index, rid) in references.iter().enumerate() {
            let resolved = rid.as_deref().and_then(|rid| self.relationship_part(rid));
            let part = match (resolved, previous.clone()) {
                (Some(part), _) => {
                    self.footers
                        .entry(part.clone())
                        .or_insert_with(empty_footer);
                    part
                }
                (None, Some(linked)) if rid.is_none() => linked,
                _ => {
                    let (part, rid) = self.create_footer_part();
                    created.insert(index, rid);
                    part
                }
            };
            previous = Some(part.clone());
            parts.push(part);
        }

        if !created.is_empty() {
            self.ensure_namespace("r", OFFICE_REL_NS);
            let mut index = 0;
            self.for_each_section_mut(&mut |section| {
                if let Some(rid) = created.get(&index) {
                    section.children.retain(|n| {
                        !matches!(n, XmlNode::Element(e)
                            if e.name == "w:footerReference"
                                && e.attr("w:type").unwrap_or("default") == "default")
                    });
                    let reference = XmlElement::new("w:footerReference")
                        .with_attr("w:type", "default")
                        .with_attr("r:id", rid.as_str());
                    section.insert_ordered(reference, SECTPR_ORDER);
                }
                index += 1;
            })?;
        }

        Ok(parts)
    }

    pub fn footer(&self, part: &str) -> Option<&XmlElement> {
        self.footers.get(part)
    }

    pub fn footer_mut(&mut self, part: &str) -> Option<&mut XmlElement> {
        self.footers.get_mut(part)
    }

    fn create_footer_part(&mut self) -> (String, String) {
        let dir = part_dir(&self.main_part).to_string();
        let part = (1..)
            .map(|n| format!("{}/footer{}.xml", dir, n))
            .find(|name| !self.package.contains(name) && !self.footers.contains_key(name))
            .unwrap_or_else(|| format!("{}/footer.xml", dir));

        let target = self.relative_target(&part);
        let rid = self.add_relationship(REL_TYPE_FOOTER, &target);
        self.ensure_override(&part, CT_FOOTER);
        self.footers.insert(part.clone(), empty_footer());
        (part, rid)
    }

    // ========== 图片 ==========

    /// 把图片加入包中并建立关系，返回关系 ID
    pub fn add_image_part(&mut self, bytes: Vec<u8>, extension: &str, content_type: &str) -> String {
        let dir = part_dir(&self.main_part).to_string();
        let part = (1..)
            .map(|n| format!("{}/media/image{}.{}", dir, n, extension))
            .find(|name| !self.package.contains(name))
            .unwrap_or_else(|| format!("{}/media/image.{}", dir, extension));

        self.package.set_part(&part, bytes);
        self.ensure_default(extension, content_type);
        let target = self.relative_target(&part);
        self.add_relationship(REL_TYPE_IMAGE, &target)
    }

    // ========== 关系与内容类型 ==========

    fn relationship_part(&self, rid: &str) -> Option<String> {
        let base_dir = part_dir(&self.main_part);
        self.relationships
            .elements_named("Relationship")
            .find(|r| r.attr("Id") == Some(rid))
            .and_then(|r| r.attr("Target"))
            .map(|target| resolve_target(base_dir, target))
    }

    fn relative_target(&self, part: &str) -> String {
        let base_dir = part_dir(&self.main_part);
        if base_dir.is_empty() {
            return part.to_string();
        }
        part.strip_prefix(&format!("{}/", base_dir))
            .map(str::to_owned)
            .unwrap_or_else(|| format!("/{}", part))
    }

    /// 下一次 `add_image_part` / 新建部件时将分配的关系 ID
    pub fn next_relationship_id(&self) -> String {
        let next = self
            .relationships
            .elements_named("Relationship")
            .filter_map(|r| r.attr("Id"))
            .filter_map(|id| id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        format!("rId{}", next)
    }

    fn add_relationship(&mut self, rel_type: &str, target: &str) -> String {
        let id = self.next_relationship_id();
        self.relationships.push(
            XmlElement::new("Relationship")
                .with_attr("Id", id.as_str())
                .with_attr("Type", rel_type)
                .with_attr("Target", target),
        );
        id
    }

    fn ensure_override(&mut self, part: &str, content_type: &str) {
        let part_name = format!("/{}", part);
        let exists = self
            .content_types
            .elements_named("Override")
            .any(|o| o.attr("PartName") == Some(part_name.as_str()));
        if !exists {
            self.content_types.push(
                XmlElement::new("Override")
                    .with_attr("PartName", part_name)
                    .with_attr("ContentType", content_type),
            );
        }
    }

    fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let exists = self
            .content_types
            .elements_named("Default")
            .any(|d| d.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(extension)));
        if !exists {
            self.content_types.push(
                XmlElement::new("Default")
                    .with_attr("Extension", extension)
                    .with_attr("ContentType", content_type),
            );
        }
    }

    // ========== 保存 ==========

    /// 把所有可编辑树写回文档包
    pub fn into_package(self) -> Result<Package, DocumentError> {
        let DocumentHandle {
            mut package,
            main_part,
            document,
            relationships,
            content_types,
            styles,
            footers,
            ..
        } = self;

        package.set_part(&main_part, document.to_bytes()?);
        package.set_part(&rels_part_for(&main_part), relationships.to_bytes()?);
        package.set_part(CONTENT_TYPES_PART, content_types.to_bytes()?);
        if let Some((part, tree)) = styles {
            package.set_part(&part, tree.to_bytes()?);
        }
        for (part, tree) in footers {
            package.set_part(&part, tree.to_bytes()?);
        }
        Ok(package)
    }
}

/// 段落的纯文本：`w:t` 原文，`w:tab` 为制表符，`w:br`/`w:cr` 为换行
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut out = String::new();
    paragraph.for_each_descendant("w:r", &mut |run| {
        for child in run.elements() {
            match child.name.as_str() {
                "w:t" => out.push_str(&child.text()),
                "w:tab" => out.push('\t'),
                "w:br" | "w:cr" => out.push('\n'),
                _ => {}
            }
        }
    });
    out
}

fn default_footer_rid(section: &XmlElement) -> Option<&str> {
    section
        .elements_named("w:footerReference")
        .find(|r| r.attr("w:type").unwrap_or("default") == "default")
        .and_then(|r| r.attr("r:id"))
}

fn empty_footer() -> XmlElement {
    XmlElement::new("w:ftr")
        .with_attr("xmlns:w", WORDML_NS)
        .with_attr("xmlns:r", OFFICE_REL_NS)
        .with_child(XmlElement::new("w:p"))
}

fn default_styles() -> XmlElement {
    XmlElement::new("w:styles")
        .with_attr("xmlns:w", WORDML_NS)
        .with_child(
            XmlElement::new("w:style")
                .with_attr("w:type", "paragraph")
                .with_attr("w:default", "1")
                .with_attr("w:styleId", "Normal")
                .with_child(XmlElement::new("w:name").with_attr("w:val", "Normal")),
        )
}
