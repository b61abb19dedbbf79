//! HTML -> [`Document`] conversion on top of `scraper`

use scraper::{ElementRef, Html, Node as HtmlNode};

use super::{Document, NodeId};

/// Parse a complete HTML document. `html5ever` always synthesizes
/// `<head>` and `<body>`, so the result has both.
pub fn parse_document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let root_el = parsed.root_element();
    let mut doc = Document::with_root(root_el.value().name());
    let root = doc.root();
    copy_attrs(&mut doc, root, root_el);
    import_children(&mut doc, root, root_el);
    doc
}

/// Parse `html` as a fragment and append its nodes under `parent`.
///
/// Table sections need a table context, otherwise the parser drops their
/// row and cell tags.
pub fn parse_fragment_into(doc: &mut Document, parent: NodeId, html: &str) {
    let parent_tag = doc.element(parent).map(|e| e.tag.clone()).unwrap_or_default();
    let (wrapped, context) = match parent_tag.as_str() {
        "tbody" | "thead" | "tfoot" => (format!("<table><tbody>{}</tbody></table>", html), Some("tbody")),
        "table" => (format!("<table>{}</table>", html), Some("table")),
        "tr" => (format!("<table><tbody><tr>{}</tr></tbody></table>", html), Some("tr")),
        _ => (html.to_string(), None),
    };

    let fragment = Html::parse_fragment(&wrapped);
    let container = fragment.root_element();
    match context {
        Some(tag) => {
            if let Some(ctx) = find_descendant(container, tag) {
                import_children(doc, parent, ctx);
            }
        }
        None => import_children(doc, parent, container),
    }
}

fn find_descendant<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() == tag {
                return Some(child_el);
            }
            if let Some(found) = find_descendant(child_el, tag) {
                return Some(found);
            }
        }
    }
    None
}

fn copy_attrs(doc: &mut Document, id: NodeId, el: ElementRef<'_>) {
    if let Some(target) = doc.element_mut(id) {
        for (name, value) in el.value().attrs() {
            target.set_attr(name, value);
        }
    }
}

fn import_children(doc: &mut Document, parent: NodeId, el: ElementRef<'_>) {
    for child in el.children() {
        match child.value() {
            HtmlNode::Text(text) => {
                let text: &str = text;
                if text.trim().is_empty() {
                    continue;
                }
                let id = doc.create_text(text);
                doc.append_child(parent, id);
            }
            HtmlNode::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    let id = doc.create_element(child_el.value().name());
                    copy_attrs(doc, id, child_el);
                    doc.append_child(parent, id);
                    import_children(doc, id, child_el);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structure_attributes_and_styles() {
        let doc = parse_document(
            r#"<html><head><title>T</title></head><body>
                 <div id="report-page" class="page active" style="display: none">
                   <p>Hello <strong>world</strong></p>
                 </div>
               </body></html>"#,
        );
        let page = doc.get_element_by_id("report-page").unwrap();
        let el = doc.element(page).unwrap();
        assert!(el.has_class("active"));
        assert_eq!(el.style.get("display"), Some("none"));
        assert_eq!(doc.text_content(page), "Hello world");
        assert!(doc.head().is_some());
    }

    #[test]
    fn table_rows_survive_fragment_parsing() {
        let mut doc = parse_document("<table><tbody id='rows'></tbody></table>");
        let tbody = doc.get_element_by_id("rows").unwrap();
        doc.set_inner_html(tbody, "<tr><td>a</td><td>b</td></tr><tr><td>c</td></tr>")
            .unwrap();
        assert_eq!(doc.query_all("tr").unwrap().len(), 2);
        assert_eq!(doc.query_all("td").unwrap().len(), 3);
        assert!(doc.inner_html(tbody).starts_with("<tr><td>a</td>"));
    }

    #[test]
    fn set_inner_html_replaces_instead_of_appending() {
        let mut doc = parse_document("<div id='box'></div>");
        let host = doc.get_element_by_id("box").unwrap();
        doc.set_inner_html(host, "<p>one</p>").unwrap();
        doc.set_inner_html(host, "<p>one</p>").unwrap();
        assert_eq!(doc.inner_html(host), "<p>one</p>");
    }

    #[test]
    fn svg_elements_keep_their_names() {
        let doc = parse_document(
            r#"<div id="d"><svg width="100" height="40"><rect x="0" y="0" width="10" height="10" fill="red"></rect><text x="5" y="20">Hi</text></svg></div>"#,
        );
        assert_eq!(doc.elements_by_tag("svg").len(), 1);
        assert_eq!(doc.elements_by_tag("rect").len(), 1);
        let text = doc.elements_by_tag("text")[0];
        assert_eq!(doc.text_content(text), "Hi");
    }
}
