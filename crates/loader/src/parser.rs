//! A "dumb" XML driver that reads a document and notifies a handler of events.
//!
//! The driver resolves namespace prefixes and coalesces adjacent text, CDATA
//! and entity references into a single `characters` call.

use crate::error::{LineTracker, LoadError, Location};
use crate::{BXML_NAMESPACE, BXML_PREFIX};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event as XmlEvent};

const XMLNS: &str = "xmlns";
const XML_PREFIX: &str = "xml";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawAttribute {
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StartElement {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub attributes: Vec<RawAttribute>,
}

/// The callbacks the driver uses to build a document.
pub(crate) trait DocumentHandler {
    fn processing_instruction(
        &mut self,
        target: &str,
        data: &str,
        location: Location,
    ) -> Result<(), LoadError>;

    fn start_element(&mut self, element: StartElement, location: Location)
    -> Result<(), LoadError>;

    fn end_element(&mut self, location: Location) -> Result<(), LoadError>;

    /// Receives the text between two markup events, never empty.
    fn characters(&mut self, text: String, location: Location) -> Result<(), LoadError>;
}

struct NamespaceScopes {
    scopes: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScopes {
    /// The control prefix is bound even when a document does not declare it.
    fn new() -> Self {
        Self {
            scopes: vec![vec![(Some(BXML_PREFIX.to_string()), BXML_NAMESPACE.to_string())]],
        }
    }

    fn push(&mut self, declarations: Vec<(Option<String>, String)>) {
        self.scopes.push(declarations);
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some(XML_PREFIX) {
            return Some(XML_NAMESPACE.to_string());
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }
}

fn split_qname(qname: &str) -> (Option<String>, String) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, qname.to_string()),
    }
}

struct Driver<'a> {
    source: &'a str,
    lines: LineTracker,
    scopes: NamespaceScopes,
    pending_text: String,
    text_location: Location,
}

impl<'a> Driver<'a> {
    fn location(&mut self, pos: usize) -> Location {
        self.lines.advance(self.source, pos)
    }

    fn push_text(&mut self, text: &str, location: Location) {
        if self.pending_text.is_empty() {
            self.text_location = location;
        }
        self.pending_text.push_str(text);
    }

    fn flush_text(&mut self, handler: &mut impl DocumentHandler) -> Result<(), LoadError> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending_text);
        handler.characters(text, self.text_location)
    }

    fn start_element(&mut self, e: &BytesStart, location: Location) -> Result<StartElement, LoadError> {
        let mut declarations = Vec::new();
        let mut attributes = Vec::new();

        for attr in e.attributes() {
            let attr = attr.map_err(|err| LoadError::xml(err, location))?;
            let key = std::str::from_utf8(attr.key.as_ref()).map_err(|err| LoadError::xml(err, location))?;
            let raw = std::str::from_utf8(&attr.value).map_err(|err| LoadError::xml(err, location))?;
            let value = unescape(raw)
                .map_err(|err| LoadError::xml(err, location))?
                .into_owned();

            let (prefix, local_name) = split_qname(key);
            match (prefix.as_deref(), local_name.as_str()) {
                (None, XMLNS) => declarations.push((None, value)),
                (Some(XMLNS), _) => declarations.push((Some(local_name), value)),
                _ => attributes.push(RawAttribute {
                    prefix,
                    local_name,
                    value,
                }),
            }
        }
        self.scopes.push(declarations);

        let qname = std::str::from_utf8(e.name().as_ref())
            .map_err(|err| LoadError::xml(err, location))?
            .to_string();
        let (prefix, local_name) = split_qname(&qname);
        let namespace = self.scopes.resolve(prefix.as_deref());
        if prefix.is_some() && namespace.is_none() {
            return Err(LoadError::xml(
                format!("Undeclared namespace prefix in <{qname}>"),
                location,
            ));
        }

        Ok(StartElement {
            namespace,
            prefix,
            local_name,
            attributes,
        })
    }
}

/// Drives the parsing process, calling handler methods for each significant
/// XML event. Failures are reported on the error channel for `document`
/// before they propagate.
pub(crate) fn parse_document(
    source: &str,
    document: &str,
    handler: &mut impl DocumentHandler,
) -> Result<(), LoadError> {
    let mut driver = Driver {
        source,
        lines: LineTracker::new(),
        scopes: NamespaceScopes::new(),
        pending_text: String::new(),
        text_location: Location::default(),
    };
    let mut pos = 0;

    let result = run(&mut driver, &mut pos, handler);
    if let Err(err) = &result {
        let location = driver.location(pos);
        log::error!(
            "An error occurred at line number {} in {}:",
            location.line,
            document
        );
        log::error!("{err}");
    }
    result
}

fn run(
    driver: &mut Driver<'_>,
    pos: &mut usize,
    handler: &mut impl DocumentHandler,
) -> Result<(), LoadError> {
    let mut reader = Reader::from_str(driver.source);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;
    let mut buf = Vec::new();

    loop {
        *pos = reader.buffer_position() as usize;
        let location = driver.location(*pos);
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| LoadError::xml(err, location))?;

        match event {
            XmlEvent::Start(e) => {
                driver.flush_text(handler)?;
                let element = driver.start_element(&e, location)?;
                handler.start_element(element, location)?;
            }
            XmlEvent::End(_) => {
                driver.flush_text(handler)?;
                driver.scopes.pop();
                handler.end_element(location)?;
            }
            XmlEvent::Text(e) => {
                let raw_text = std::str::from_utf8(e.as_ref()).map_err(|err| LoadError::xml(err, location))?;
                let text = unescape(raw_text).map_err(|err| LoadError::xml(err, location))?;
                driver.push_text(&text, location);
            }
            XmlEvent::CData(e) => {
                let text = std::str::from_utf8(e.as_ref()).map_err(|err| LoadError::xml(err, location))?;
                driver.push_text(text, location);
            }
            XmlEvent::GeneralRef(e) => {
                let name = std::str::from_utf8(e.as_ref()).map_err(|err| LoadError::xml(err, location))?;
                let reference = format!("&{name};");
                let text = unescape(&reference).map_err(|err| LoadError::xml(err, location))?;
                driver.push_text(&text, location);
            }
            XmlEvent::PI(e) => {
                driver.flush_text(handler)?;
                let content = std::str::from_utf8(e.as_ref()).map_err(|err| LoadError::xml(err, location))?;
                let (target, data) = content
                    .trim()
                    .split_once(char::is_whitespace)
                    .unwrap_or((content.trim(), ""));
                handler.processing_instruction(target, data.trim(), location)?;
            }
            XmlEvent::Eof => break,
            _ => (),
        }
        buf.clear();
    }

    Ok(())
}
