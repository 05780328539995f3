//! Owned, namespace-resolved XML tree.
//!
//! Responses are small, so they are read fully into memory once and then queried by the parser
//! instead of being streamed.

use std::str;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    name::{Namespace, ResolveResult},
    NsReader, Writer,
};

use crate::parser::ParseError;

/// A parsed XML document with exactly one root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = NsReader::from_reader(bytes);
        let mut open: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_resolved_event()? {
                (namespace, Event::Start(start)) => {
                    open.push(Element::new(namespace, &start)?);
                }
                (namespace, Event::Empty(start)) => {
                    let element = Element::new(namespace, &start)?;
                    close(&mut open, &mut root, element)?;
                }
                (_, Event::End(_)) => {
                    // the reader checks that end tags match, so there is always an open element
                    if let Some(element) = open.pop() {
                        close(&mut open, &mut root, element)?;
                    }
                }
                (_, Event::Text(text)) => {
                    if let Some(element) = open.last_mut() {
                        element.text.push_str(&text.unescape()?);
                    }
                }
                (_, Event::CData(data)) => {
                    if let Some(element) = open.last_mut() {
                        element.text.push_str(str::from_utf8(&data.into_inner())?);
                    }
                }
                (_, Event::Eof) => break,
                _ => {}
            }
        }

        if !open.is_empty() {
            return Err(ParseError::UnclosedElement);
        }
        root.map(|root| Self { root }).ok_or(ParseError::EmptyDocument)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

/// Attach a finished element to its parent, or make it the root.
fn close(
    open: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ParseError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ParseError::MultipleRoots),
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(namespace: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let namespace = match namespace {
            ResolveResult::Bound(Namespace(namespace)) => {
                Some(str::from_utf8(namespace)?.to_owned())
            }
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(ParseError::UnknownPrefix(
                    String::from_utf8_lossy(&prefix).into_owned(),
                ))
            }
        };

        Ok(Self {
            namespace,
            name: str::from_utf8(start.local_name().as_ref())?.to_owned(),
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Local name, without any prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Text directly inside this element, untrimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Whether this element has the local name `name` and is either in `namespace` or
    /// unqualified.
    pub fn is(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && (self.namespace.is_none() || self.namespace() == namespace)
    }

    /// First child matching [`is`](Element::is).
    pub fn child(&self, namespace: Option<&str>, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.is(namespace, name))
    }

    pub fn children_named<'a, 'n>(
        &'a self,
        namespace: Option<&'n str>,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + 'n
    where
        'a: 'n,
    {
        self.children
            .iter()
            .filter(move |child| child.is(namespace, name))
    }
}

/// Serialize a flat document `<root xmlns=namespace><name>value</name>...</root>`.
pub(crate) fn write_fields(
    root: &str,
    namespace: Option<&str>,
    fields: &[(&str, &str)],
) -> Result<Vec<u8>, ParseError> {
    let mut writer = Writer::new(Vec::new());

    let mut start = BytesStart::new(root);
    if let Some(namespace) = namespace {
        start.push_attribute(("xmlns", namespace));
    }
    writer.write_event(Event::Start(start))?;
    for (name, value) in fields {
        writer.write_event(Event::Start(BytesStart::new(*name)))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(*name)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(root)))?;

    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    #[test]
    fn resolves_default_and_prefixed_namespaces() {
        let document = XmlDocument::parse(
            br#"<a:Root xmlns:a="urn:test"><a:Child>x</a:Child><Plain>y</Plain></a:Root>"#,
        )
        .unwrap();
        let root = document.root();
        assert_eq!(root.name(), "Root");
        assert_eq!(root.namespace(), Some(NS));
        assert_eq!(root.child(Some(NS), "Child").unwrap().text(), "x");
        assert_eq!(root.child(Some(NS), "Plain").unwrap().text(), "y");
        assert!(root.child(Some("urn:other"), "Child").is_none());
    }

    #[test]
    fn matching_children_outlive_the_name_borrow() {
        let document = XmlDocument::parse(b"<Root><A>1</A><B/><A>2</A></Root>").unwrap();
        let matches: Vec<&Element> = {
            let name = String::from("A");
            document.root().children_named(None, &name).collect()
        };
        let texts: Vec<&str> = matches.iter().map(|element| element.text()).collect();
        assert_eq!(texts, ["1", "2"]);
    }

    #[test]
    fn unescapes_text_and_keeps_cdata() {
        let document =
            XmlDocument::parse(b"<Root><A>Tom &amp; Jerry</A><B><![CDATA[<raw>]]></B></Root>")
                .unwrap();
        let root = document.root();
        assert_eq!(root.child(None, "A").unwrap().text(), "Tom & Jerry");
        assert_eq!(root.child(None, "B").unwrap().text(), "<raw>");
    }

    #[test]
    fn rejects_documents_without_a_single_root() {
        assert!(matches!(XmlDocument::parse(b"  "), Err(ParseError::EmptyDocument)));
        assert!(matches!(
            XmlDocument::parse(b"<A/><B/>"),
            Err(ParseError::MultipleRoots)
        ));
        assert!(XmlDocument::parse(b"<A><B></A>").is_err());
    }

    #[test]
    fn written_fields_parse_back_escaped() {
        let bytes = write_fields("Login", Some(NS), &[("Password", "a<b&c")]).unwrap();
        let document = XmlDocument::parse(&bytes).unwrap();
        assert_eq!(document.root().namespace(), Some(NS));
        assert_eq!(
            document.root().child(Some(NS), "Password").unwrap().text(),
            "a<b&c"
        );
    }
}
