//! Compact XML output over a [`quick_xml::Writer`].
//!
//! Text and attribute values are escaped by quick-xml. Element and attribute
//! names are checked against [`is_valid_name`] before anything is written,
//! so a bad name fails the document instead of corrupting it.

use livekml_types::is_valid_name;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

/// Error type for XML output.
#[derive(Debug, Error)]
pub enum XmlError {
    /// A name that XML cannot carry.
    #[error("invalid XML name: {0:?}")]
    InvalidName(String),

    /// The underlying writer failed.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Output was not UTF-8.
    #[error("output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias for XML output.
pub type Result<T> = std::result::Result<T, XmlError>;

fn check(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(XmlError::InvalidName(name.to_string()))
    }
}

fn start<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> Result<BytesStart<'a>> {
    check(name)?;
    for (key, _) in attrs {
        check(key)?;
    }
    Ok(BytesStart::new(name).with_attributes(attrs.iter().copied()))
}

/// Append-only writer for compact XML.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    /// An empty writer.
    pub fn new() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    /// Write `<?xml version="1.0" encoding="UTF-8"?>`.
    pub fn declaration(&mut self) -> Result<&mut Self> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(self)
    }

    /// Start an element.
    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self> {
        self.inner.write_event(Event::Start(start(name, attrs)?))?;
        Ok(self)
    }

    /// End an element.
    pub fn close(&mut self, name: &str) -> Result<&mut Self> {
        check(name)?;
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Write a self-closing element.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self> {
        self.inner.write_event(Event::Empty(start(name, attrs)?))?;
        Ok(self)
    }

    /// Write escaped character data.
    pub fn text(&mut self, text: &str) -> Result<&mut Self> {
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        Ok(self)
    }

    /// Write `<name>text</name>`.
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self> {
        self.open(name, &[])?.text(text)?.close(name)
    }

    /// Append markup produced by another `XmlWriter`, unchanged.
    pub fn raw(&mut self, markup: &str) -> Result<&mut Self> {
        self.inner
            .write_event(Event::Text(BytesText::from_escaped(markup)))?;
        Ok(self)
    }

    /// Consume the writer.
    pub fn finish(self) -> Result<String> {
        Ok(String::from_utf8(self.inner.into_inner())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_nested_elements_with_escaping() {
        let mut w = XmlWriter::new();
        w.open("Folder", &[("id", "f1")])
            .unwrap()
            .text_element("name", "A & B <c>")
            .unwrap()
            .empty("Placemark", &[("targetId", "p\"1")])
            .unwrap()
            .close("Folder")
            .unwrap();
        assert_eq!(
            w.finish().unwrap(),
            r#"<Folder id="f1"><name>A &amp; B &lt;c&gt;</name><Placemark targetId="p&quot;1"/></Folder>"#
        );
    }

    #[test]
    fn declaration_and_raw_markup() {
        let mut w = XmlWriter::new();
        w.declaration().unwrap().raw("<a/>").unwrap();
        assert_eq!(
            w.finish().unwrap(),
            r#"<?xml version="1.0" encoding="UTF-8"?><a/>"#
        );
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut w = XmlWriter::new();
        assert!(matches!(
            w.text_element("a><b", "x"),
            Err(XmlError::InvalidName(name)) if name == "a><b"
        ));
        assert!(w.open("ok", &[("bad attr", "v")]).is_err());
        assert!(w.empty("", &[]).is_err());
        assert!(w.close("1x").is_err());
        // nothing was written for the rejected calls
        assert_eq!(w.finish().unwrap(), "");
    }
}
