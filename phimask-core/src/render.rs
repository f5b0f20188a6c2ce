// phimask-core/src/render.rs
//! Output transforms over a resolved document.
//!
//! Two renderers are provided: [`MaskRenderer`] produces a length-preserving
//! copy of the text where everything not confirmed safe is replaced by the
//! mask glyph (punctuation and whitespace survive), and [`MarkupRenderer`]
//! produces an i2b2-style XML document listing every PHI record.
//!
//! License: MIT OR APACHE 2.0

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::EngineOptions;
use crate::document::DocumentContext;
use crate::tokenizer::is_punctuation;

/// A renderer consumes a resolved document and produces its output form.
pub trait Renderer: Send + Sync {
    fn render(&self, doc: &DocumentContext) -> String;
}

/// Selects which renderer [`renderer_for`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Mask,
    Markup,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mask" | "asterisk" => Ok(OutputFormat::Mask),
            "markup" | "xml" | "i2b2" => Ok(OutputFormat::Markup),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Mask => write!(f, "mask"),
            OutputFormat::Markup => write!(f, "markup"),
        }
    }
}

/// Builds the renderer for `format` from engine options.
pub fn renderer_for(format: OutputFormat, options: &EngineOptions) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Mask => Box::new(MaskRenderer::new(options.mask_char)),
        OutputFormat::Markup => Box::new(MarkupRenderer::new(options.markup_root.clone())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskRenderer {
    pub mask_char: char,
}

impl MaskRenderer {
    pub fn new(mask_char: char) -> Self {
        Self { mask_char }
    }
}

impl Default for MaskRenderer {
    fn default() -> Self {
        Self::new('*')
    }
}

impl Renderer for MaskRenderer {
    fn render(&self, doc: &DocumentContext) -> String {
        let chars = doc.chars();
        let include = doc.include();
        let mut out = String::with_capacity(doc.text().len());
        let mut i = 0;

        while i < chars.len() {
            if let Ok(stop) = include.get(i) {
                let stop = stop.min(chars.len());
                out.extend(&chars[i..stop]);
                i = stop;
                continue;
            }
            let c = chars[i];
            if is_punctuation(c, self.mask_char) {
                out.push(c);
            } else {
                out.push(self.mask_char);
            }
            i += 1;
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupRenderer {
    pub root: String,
}

impl MarkupRenderer {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for MarkupRenderer {
    fn default() -> Self {
        Self::new("PhiMask")
    }
}

impl Renderer for MarkupRenderer {
    fn render(&self, doc: &DocumentContext) -> String {
        let root = element_name(&self.root);
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "<?xml version=\"1.0\" ?>");
        let _ = writeln!(out, "<{}>", root);
        let _ = writeln!(out, "<TEXT><![CDATA[{}]]></TEXT>", escape_cdata(doc.text()));
        let _ = writeln!(out, "<TAGS>");
        for (i, entry) in doc.phi().iter().enumerate() {
            let _ = writeln!(
                out,
                "<{name} id=\"P{id}\" start=\"{start}\" end=\"{end}\" text=\"{text}\" TYPE=\"{kind}\" comment=\"\" />",
                name = element_name(&entry.category),
                id = i,
                start = entry.span.start,
                end = entry.span.stop,
                text = escape_attr(&entry.text),
                kind = escape_attr(&entry.category),
            );
        }
        let _ = writeln!(out, "</TAGS>");
        let _ = writeln!(out, "</{}>", root);
        out
    }
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// A CDATA section cannot contain `]]>`; split it across two sections.
fn escape_cdata(s: &str) -> String {
    s.replace("]]>", "]]]]><![CDATA[>")
}

/// Category names become element names, so keep them XML-name safe.
fn element_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if !out.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PhiEntry;
    use crate::span_store::Span;

    fn doc_with(text: &str, include: &[(usize, usize)], phi: &[(usize, usize, &str)]) -> DocumentContext {
        let mut doc = DocumentContext::new(text);
        for &(s, e) in include {
            doc.include.insert_merging(s, e).unwrap();
        }
        for &(s, e, cat) in phi {
            let span = Span { start: s, stop: e };
            doc.exclude.insert_merging(s, e).unwrap();
            doc.phi.push(PhiEntry { span, text: doc.slice(span), category: cat.to_string() });
        }
        doc
    }

    #[test]
    fn test_mask_preserves_included_and_punctuation() {
        let doc = doc_with("Ann, age 42.", &[(5, 8)], &[]);
        assert_eq!(MaskRenderer::default().render(&doc), "***, age **.");
    }

    #[test]
    fn test_mask_is_length_preserving() {
        let text = "Zoë Ng, MRN 0042 (née Lee)";
        let doc = doc_with(text, &[(8, 11), (18, 21)], &[]);
        let out = MaskRenderer::new('#').render(&doc);
        assert_eq!(out.chars().count(), text.chars().count());
        assert!(out.starts_with("### ##, MRN #### (née"));
    }

    #[test]
    fn test_mask_char_itself_is_masked() {
        let doc = doc_with("a*b", &[], &[]);
        assert_eq!(MaskRenderer::default().render(&doc), "***");
    }

    #[test]
    fn test_mask_fully_included_document_is_unchanged() {
        let text = "nothing to hide";
        let doc = doc_with(text, &[(0, 15)], &[]);
        assert_eq!(MaskRenderer::default().render(&doc), text);
    }

    #[test]
    fn test_markup_envelope_and_tags() {
        let doc = doc_with("Call Bob at 555", &[], &[(5, 8, "NAME"), (12, 15, "PHONE")]);
        let out = MarkupRenderer::default().render(&doc);
        let expected = "<?xml version=\"1.0\" ?>\n\
<PhiMask>\n\
<TEXT><![CDATA[Call Bob at 555]]></TEXT>\n\
<TAGS>\n\
<NAME id=\"P0\" start=\"5\" end=\"8\" text=\"Bob\" TYPE=\"NAME\" comment=\"\" />\n\
<PHONE id=\"P1\" start=\"12\" end=\"15\" text=\"555\" TYPE=\"PHONE\" comment=\"\" />\n\
</TAGS>\n\
</PhiMask>\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_markup_escapes_text() {
        let doc = doc_with("x]]>y <A&B>", &[], &[(6, 11, "ORG NAME")]);
        let out = MarkupRenderer::new("Doc").render(&doc);
        assert!(out.contains("<![CDATA[x]]]]><![CDATA[>y <A&B>]]>"));
        assert!(out.contains("<ORG_NAME id=\"P0\""));
        assert!(out.contains("text=\"&lt;A&amp;B&gt;\""));
        assert!(out.contains("TYPE=\"ORG NAME\""));
        assert!(out.starts_with("<?xml version=\"1.0\" ?>\n<Doc>\n"));
    }

    #[test]
    fn test_element_name_sanitizing() {
        assert_eq!(element_name("DATE"), "DATE");
        assert_eq!(element_name("9LIVES"), "_9LIVES");
        assert_eq!(element_name("a/b"), "a_b");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("XML".parse::<OutputFormat>().unwrap(), OutputFormat::Markup);
        assert_eq!("mask".parse::<OutputFormat>().unwrap(), OutputFormat::Mask);
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Markup.to_string(), "markup");
    }
}
