//! SVG markup into a [`Document`] via roxmltree.

use crate::document::{Document, ElementKind, Node, NodeId};
use crate::error::SvgError;
use crate::path_data::parse_path_data;
use crate::style::{PRESENTATION_ATTRIBUTES, StyleSnapshot};
use crate::types::parse_transform;

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

impl Document {
    /// Parses an SVG document. The root element must be `<svg>`.
    pub fn parse(svg_xml: &str) -> Result<Document, SvgError> {
        let xml = roxmltree::Document::parse(svg_xml)?;
        let root = xml.root_element();
        if root.tag_name().name() != "svg" {
            return Err(SvgError::InvalidDocument(format!(
                "root element is <{}>, expected <svg>",
                root.tag_name().name()
            )));
        }

        let mut pending_uses = Vec::new();
        let mut doc = Document::new(build_node(root, &StyleSnapshot::default()));
        let root_id = doc.root();
        append_children(&mut doc, root_id, root, &mut pending_uses);

        for (use_id, href) in pending_uses {
            match doc.resolve_local_ref(&href) {
                Some(target) => doc.set_instance_root(use_id, target),
                None => log::debug!("use element references unknown target {href:?}"),
            }
        }

        log::debug!("parsed svg document with {} elements", doc.len());
        Ok(doc)
    }
}

fn append_children(
    doc: &mut Document,
    parent: NodeId,
    xml_parent: roxmltree::Node<'_, '_>,
    pending_uses: &mut Vec<(NodeId, String)>,
) {
    for child in xml_parent.children().filter(|n| n.is_element()) {
        let node = build_node(child, &doc.node(parent).style);
        let id = doc.append(parent, node);
        if matches!(doc.node(id).kind, ElementKind::Use { .. }) {
            if let Some(href) = href_attr(child) {
                pending_uses.push((id, href.trim().to_string()));
            }
        }
        append_children(doc, id, child, pending_uses);
    }
}

fn build_node(xml: roxmltree::Node<'_, '_>, parent_style: &StyleSnapshot) -> Node {
    let mut kind = ElementKind::from_tag(xml.tag_name().name());
    if let ElementKind::Path { segments } = &mut kind {
        *segments = parse_path_data(xml.attribute("d").unwrap_or(""));
    }

    let mut node = Node::new(kind);
    node.id = xml.attribute("id").map(str::to_string);
    for attr in xml.attributes() {
        node.attributes
            .push((attr.name().to_string(), attr.value().to_string()));
    }

    let transform_attr = if node.kind.is_gradient() {
        "gradientTransform"
    } else {
        "transform"
    };
    if let Some(raw) = xml.attribute(transform_attr) {
        node.transform = parse_transform(raw);
    }

    node.style = resolve_style(xml, parent_style);
    node
}

/// Presentation attributes first, then `style=""`, on top of the
/// inherited part of the parent's style.
fn resolve_style(xml: roxmltree::Node<'_, '_>, parent_style: &StyleSnapshot) -> StyleSnapshot {
    let mut style = StyleSnapshot::inherited_from(parent_style);
    for name in PRESENTATION_ATTRIBUTES {
        if let Some(value) = xml.attribute(*name) {
            if !style.apply_declaration(name, value) {
                log::debug!("dropping presentation attribute {name}={value:?}");
            }
        }
    }
    if let Some(inline) = xml.attribute("style") {
        style.apply_style_attribute(inline);
    }
    style
}

fn href_attr<'a>(xml: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    xml.attribute("href")
        .or_else(|| xml.attribute((XLINK_NS, "href")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Paint;

    #[test]
    fn rejects_non_svg_root() {
        assert!(matches!(
            Document::parse("<html/>"),
            Err(SvgError::InvalidDocument(_))
        ));
        assert!(matches!(Document::parse("<svg"), Err(SvgError::Xml(_))));
    }

    #[test]
    fn builds_tree_with_styles_and_transforms() {
        let doc = Document::parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg" fill="red">
                <g id="g" transform="translate(5 6)" style="stroke: blue">
                    <path id="p" d="M0 0 L10 0" fill="none"/>
                    <rect id="r" width="4" height="4"/>
                </g>
            </svg>"##,
        )
        .unwrap();

        let g = doc.get_element_by_id("g").unwrap();
        assert_eq!(doc.node(g).transform.apply(0.0, 0.0), (5.0, 6.0));

        let p = doc.get_element_by_id("p").unwrap();
        let ElementKind::Path { segments } = &doc.node(p).kind else {
            panic!("expected path");
        };
        assert_eq!(segments.len(), 2);
        assert_eq!(doc.node(p).style.fill, Some(Paint::None));
        assert!(matches!(doc.node(p).style.stroke, Some(Paint::Color { .. })));

        let r = doc.get_element_by_id("r").unwrap();
        assert!(matches!(doc.node(r).style.fill, Some(Paint::Color { .. })));
        assert_eq!(doc.node(r).attribute("width"), Some("4"));
    }

    #[test]
    fn resolves_forward_use_references_with_either_href() {
        let doc = Document::parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
                <use id="u1" href="#target"/>
                <use id="u2" xlink:href="#target"/>
                <use id="u3" href="#missing"/>
                <rect id="target" width="1" height="1"/>
            </svg>"##,
        )
        .unwrap();
        let target = doc.get_element_by_id("target");
        for (id, expected) in [("u1", target), ("u2", target), ("u3", None)] {
            let node = doc.node(doc.get_element_by_id(id).unwrap());
            assert_eq!(
                node.kind,
                ElementKind::Use {
                    instance_root: expected
                },
                "{id}"
            );
        }
    }

    #[test]
    fn gradient_transform_attribute() {
        let doc = Document::parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                <linearGradient id="lg" gradientTransform="scale(2)" transform="translate(9)"/>
            </svg>"##,
        )
        .unwrap();
        let lg = doc.get_element_by_id("lg").unwrap();
        assert_eq!(doc.node(lg).transform.apply(1.0, 1.0), (2.0, 2.0));
    }
}
