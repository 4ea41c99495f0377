//! A small streaming XML tokenizer, just enough to pull element text out
//! of UPnP device descriptions. No entity decoding, no validation; a
//! malformed document simply ends the token stream.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlToken<'a> {
    Declaration(&'a str),
    Comment(&'a str),
    TagStart(&'a str),
    TagEnd,
    TagSelfClose,
    TagClose(&'a str),
    Attr { name: &'a str, value: &'a str },
    Text(&'a str),
}

pub struct XmlTokenizer<'a> {
    src: &'a str,
    pos: usize,
    in_tag: bool,
}

impl<'a> XmlTokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            in_tag: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn take_until(&mut self, pattern: &str) -> Option<&'a str> {
        let rest = self.rest();
        let end = rest.find(pattern)?;
        let taken = &rest[..end];
        self.pos += end + pattern.len();
        Some(taken)
    }

    fn take_name(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/' || c == '=')
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }
}

impl<'a> Iterator for XmlTokenizer<'a> {
    type Item = XmlToken<'a>;

    fn next(&mut self) -> Option<XmlToken<'a>> {
        if self.in_tag {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return None;
            }
            if let Some(stripped) = rest.strip_prefix("/>") {
                self.pos = self.src.len() - stripped.len();
                self.in_tag = false;
                return Some(XmlToken::TagSelfClose);
            }
            if let Some(stripped) = rest.strip_prefix('>') {
                self.pos = self.src.len() - stripped.len();
                self.in_tag = false;
                return Some(XmlToken::TagEnd);
            }

            let name = self.take_name();
            if name.is_empty() {
                return None;
            }
            self.skip_whitespace();
            let mut value = "";
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                let rest = self.rest();
                let quote = rest.chars().next()?;
                if quote == '"' || quote == '\'' {
                    self.pos += 1;
                    value = self.take_until(&quote.to_string())?;
                } else {
                    let end = rest
                        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                        .unwrap_or(rest.len());
                    value = &rest[..end];
                    self.pos += end;
                }
            }
            return Some(XmlToken::Attr { name, value });
        }

        self.skip_whitespace();
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }

        if let Some(after) = rest.strip_prefix('<') {
            self.pos += 1;
            if after.starts_with('?') {
                self.pos += 1;
                return Some(XmlToken::Declaration(self.take_until("?>")?));
            }
            if after.starts_with("!--") {
                self.pos += 3;
                return Some(XmlToken::Comment(self.take_until("-->")?));
            }
            if after.starts_with('/') {
                self.pos += 1;
                let name = self.take_until(">")?;
                return Some(XmlToken::TagClose(name));
            }
            let name = self.take_name();
            self.in_tag = true;
            return Some(XmlToken::TagStart(name));
        }

        let end = rest.find('<').unwrap_or(rest.len());
        self.pos += end;
        Some(XmlToken::Text(&rest[..end]))
    }
}

/// Pull the text content of the first occurrence of each named element.
/// Returns values in the same order as `names`; missing elements yield
/// `None`.
pub fn element_texts<'a>(xml: &'a str, names: &[&str]) -> Vec<Option<&'a str>> {
    let mut out = vec![None; names.len()];
    let mut current: Option<usize> = None;
    for token in XmlTokenizer::new(xml) {
        match token {
            XmlToken::TagStart(name) => {
                current = names.iter().position(|&n| n == name);
            }
            XmlToken::Text(text) => {
                if let Some(i) = current {
                    if out[i].is_none() {
                        out[i] = Some(text.trim());
                    }
                }
            }
            XmlToken::TagClose(_) => {
                current = None;
            }
            _ => {}
        }
        if out.iter().all(|v| v.is_some()) {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:Basic:1</deviceType>
    <friendlyName>ILCE-7M4</friendlyName>
    <manufacturer>Sony Corporation</manufacturer>
    <!-- comment -->
    <serviceList/>
  </device>
</root>"#;

    #[test]
    fn tokenizes_device_description() {
        let tokens: Vec<_> = XmlTokenizer::new(DEVICE_DESCRIPTION).collect();
        assert!(tokens.contains(&XmlToken::TagStart("friendlyName")));
        assert!(tokens.contains(&XmlToken::Text("ILCE-7M4")));
        assert!(tokens.contains(&XmlToken::TagClose("manufacturer")));
        assert!(tokens.contains(&XmlToken::TagSelfClose));
        assert!(tokens.contains(&XmlToken::Comment(" comment ")));
        assert!(tokens
            .iter()
            .any(|t| matches!(t, XmlToken::Attr { name: "xmlns", .. })));
    }

    #[test]
    fn extracts_element_texts() {
        let texts = element_texts(DEVICE_DESCRIPTION, &["friendlyName", "manufacturer"]);
        assert_eq!(texts, vec![Some("ILCE-7M4"), Some("Sony Corporation")]);
    }

    #[test]
    fn missing_elements_are_none() {
        let texts = element_texts("<a>x</a>", &["friendlyName"]);
        assert_eq!(texts, vec![None]);
    }

    #[test]
    fn truncated_document_ends_stream() {
        let tokens: Vec<_> = XmlTokenizer::new("<device><friendly").collect();
        assert_eq!(tokens.last(), Some(&XmlToken::TagStart("friendly")));
    }
}
