use crate::core::mapper::OutputValue;
use crate::error::ExportError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

/// Writer turns a mapped output tree into a serialized document.
pub trait Writer {
    /// Serialize `tree` under a single `root_tag` element.
    fn write_document(&self, root_tag: &str, tree: &OutputValue) -> Result<String, ExportError>;
}

/// XmlTreeWriter renders an [`OutputValue`] as indented XML with a UTF-8 declaration.
///
/// Mapping keys become element names. A list does not get a wrapper element:
/// each item is written as a sibling carrying the list's key.
#[derive(Debug, Clone, Copy)]
pub struct XmlTreeWriter {
    indent: usize,
}

impl Default for XmlTreeWriter {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

type XmlSink = quick_xml::Writer<Cursor<Vec<u8>>>;

impl Writer for XmlTreeWriter {
    fn write_document(&self, root_tag: &str, tree: &OutputValue) -> Result<String, ExportError> {
        let mut writer = quick_xml::Writer::new_with_indent(Cursor::new(Vec::new()), b' ', self.indent);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        match tree {
            OutputValue::List(items) => {
                // Root items take the root's name
                self.open(&mut writer, root_tag)?;
                for item in items {
                    self.write_element(&mut writer, root_tag, item)?;
                }
                self.close(&mut writer, root_tag)?;
            }
            _ => self.write_element(&mut writer, root_tag, tree)?,
        }

        let mut bytes = writer.into_inner().into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8(bytes)?)
    }
}

impl XmlTreeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }

    fn write_element(&self, writer: &mut XmlSink, tag: &str, value: &OutputValue) -> Result<(), ExportError> {
        match value {
            OutputValue::Map(entries) => {
                if entries.is_empty() {
                    return self.empty(writer, tag);
                }
                self.open(writer, tag)?;
                for (key, child) in entries {
                    self.write_element(writer, key, child)?;
                }
                self.close(writer, tag)
            }
            OutputValue::List(items) => {
                for item in items {
                    self.write_element(writer, tag, item)?;
                }
                Ok(())
            }
            OutputValue::Scalar(scalar) => {
                let text = xml_text(&render_scalar(scalar));
                if text.is_empty() {
                    return self.empty(writer, tag);
                }
                self.open(writer, tag)?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                self.close(writer, tag)
            }
            OutputValue::Missing => self.empty(writer, tag),
        }
    }

    fn open(&self, writer: &mut XmlSink, tag: &str) -> Result<(), ExportError> {
        check_tag_name(tag)?;
        writer.write_event(Event::Start(BytesStart::new(tag)))?;
        Ok(())
    }

    fn close(&self, writer: &mut XmlSink, tag: &str) -> Result<(), ExportError> {
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn empty(&self, writer: &mut XmlSink, tag: &str) -> Result<(), ExportError> {
        check_tag_name(tag)?;
        writer.write_event(Event::Empty(BytesStart::new(tag)))?;
        Ok(())
    }
}

/// Text content for a scalar leaf
fn render_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Drop characters outside the XML 1.0 `Char` production; quick-xml escapes
/// markup but passes control characters through.
fn xml_text(text: &str) -> String {
    text.chars().filter(|&c| is_xml_char(c)).collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn check_tag_name(tag: &str) -> Result<(), ExportError> {
    if is_valid_tag_name(tag) {
        Ok(())
    } else {
        Err(ExportError::InvalidTagName(tag.to_string()))
    }
}

/// Whether `tag` can be used as an element name. Prefixes are refused since
/// the document declares no namespaces.
pub fn is_valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn scalar(value: serde_json::Value) -> OutputValue {
        OutputValue::Scalar(value)
    }

    fn render(root: &str, tree: &OutputValue) -> String {
        XmlTreeWriter::new().write_document(root, tree).expect("serializable tree")
    }

    #[test]
    fn writes_declaration_and_two_space_indent() {
        let tree = OutputValue::Map(vec![("Currency".to_string(), scalar(json!("USD")))]);

        assert_eq!(
            render("Doc", &tree),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Doc>\n  <Currency>USD</Currency>\n</Doc>\n"
        );
    }

    #[test]
    fn lists_become_same_named_siblings() {
        let tree = OutputValue::Map(vec![(
            "Details".to_string(),
            OutputValue::Map(vec![(
                "Detail".to_string(),
                OutputValue::List(vec![
                    OutputValue::Map(vec![("Amount".to_string(), scalar(json!("1")))]),
                    OutputValue::Map(vec![("Amount".to_string(), scalar(json!("2")))]),
                ]),
            )]),
        )]);

        let expected = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<Root>\n\
\x20 <Details>\n\
\x20   <Detail>\n\
\x20     <Amount>1</Amount>\n\
\x20   </Detail>\n\
\x20   <Detail>\n\
\x20     <Amount>2</Amount>\n\
\x20   </Detail>\n\
\x20 </Details>\n\
</Root>\n";
        assert_eq!(render("Root", &tree), expected);
    }

    #[test]
    fn empty_values_are_self_closing() {
        let tree = OutputValue::Map(vec![
            ("Missing".to_string(), OutputValue::Missing),
            ("Blank".to_string(), scalar(json!(""))),
            ("Null".to_string(), scalar(json!(null))),
            ("Nothing".to_string(), OutputValue::List(vec![OutputValue::Missing])),
        ]);

        assert_eq!(
            render("R", &tree),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<R>\n  <Missing/>\n  <Blank/>\n  <Null/>\n  <Nothing/>\n</R>\n"
        );
    }

    #[rstest]
    #[case(json!(12), "12")]
    #[case(json!(1.5), "1.5")]
    #[case(json!(true), "true")]
    #[case(json!("a < b & c"), "a &lt; b &amp; c")]
    #[case(json!(["x", 1]), "[&quot;x&quot;,1]")]
    fn renders_scalar_text(#[case] value: serde_json::Value, #[case] text: &str) {
        let tree = OutputValue::Map(vec![("V".to_string(), scalar(value))]);

        let xml = render("R", &tree);

        assert!(xml.contains(&format!("<V>{}</V>", text)), "unexpected xml: {}", xml);
    }

    #[test]
    fn root_list_items_use_root_name() {
        let tree = OutputValue::List(vec![scalar(json!("a")), scalar(json!("b"))]);

        assert_eq!(
            render("Item", &tree),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Item>\n  <Item>a</Item>\n  <Item>b</Item>\n</Item>\n"
        );
    }

    #[test]
    fn output_is_deterministic() {
        let tree = OutputValue::Map(vec![
            ("B".to_string(), scalar(json!("2"))),
            ("A".to_string(), OutputValue::List(vec![scalar(json!("1")), OutputValue::Missing])),
        ]);

        assert_eq!(render("R", &tree), render("R", &tree));
    }

    #[test]
    fn output_parses_back() {
        let tree = OutputValue::Map(vec![
            ("Note".to_string(), scalar(json!("\"quoted\" & <tagged>"))),
            ("Empty".to_string(), OutputValue::Missing),
        ]);

        let xml = render("Doc", &tree);
        let doc = roxmltree::Document::parse(&xml).expect("well-formed xml");
        let note = doc
            .descendants()
            .find(|n| n.has_tag_name("Note"))
            .and_then(|n| n.text());

        assert_eq!(note, Some("\"quoted\" & <tagged>"));
    }

    #[test]
    fn strips_characters_xml_forbids() {
        let tree = OutputValue::Map(vec![("Notes".to_string(), scalar(json!("a\u{1}b\u{FFFE}\tc")))]);

        let xml = render("Doc", &tree);
        let doc = roxmltree::Document::parse(&xml).expect("well-formed xml");
        let notes = doc
            .descendants()
            .find(|n| n.has_tag_name("Notes"))
            .and_then(|n| n.text());

        assert_eq!(notes, Some("ab\tc"));
    }

    #[test]
    fn text_of_only_forbidden_characters_is_self_closing() {
        let tree = OutputValue::Map(vec![("Notes".to_string(), scalar(json!("\u{0}\u{1b}")))]);

        assert_eq!(
            render("Doc", &tree),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Doc>\n  <Notes/>\n</Doc>\n"
        );
    }

    #[test]
    fn honours_custom_indent() {
        let tree = OutputValue::Map(vec![(
            "Outer".to_string(),
            OutputValue::Map(vec![("Inner".to_string(), scalar(json!("x")))]),
        )]);

        let xml = XmlTreeWriter::with_indent(4).write_document("Doc", &tree).unwrap();

        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Doc>\n    <Outer>\n        <Inner>x</Inner>\n    </Outer>\n</Doc>\n"
        );
    }

    #[test]
    fn rejects_invalid_tag_names() {
        let tree = OutputValue::Map(vec![("1st Line".to_string(), scalar(json!("x")))]);

        let err = XmlTreeWriter::new().write_document("Doc", &tree).unwrap_err();

        assert!(matches!(err, ExportError::InvalidTagName(ref tag) if tag == "1st Line"));
    }

    #[rstest]
    #[case("Invoice", true)]
    #[case("_private", true)]
    #[case("ns:Tag", false)]
    #[case(":", false)]
    #[case("Line-Item.2", true)]
    #[case("", false)]
    #[case("9lives", false)]
    #[case("has space", false)]
    #[case("-dash", false)]
    fn validates_tag_names(#[case] tag: &str, #[case] valid: bool) {
        assert_eq!(is_valid_tag_name(tag), valid);
    }
}
