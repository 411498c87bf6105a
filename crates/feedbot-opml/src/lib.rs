// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OPML codec for feedbot.
//!
//! Import flattens every `<outline>` carrying an `xmlUrl`, however deeply it
//! is nested in folders. Export writes a flat OPML 2.0 document.

use feedbot_core::{FeedEntry, FeedbotError, OpmlCodec, Source};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

/// quick-xml backed [`OpmlCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlOpmlCodec;

impl OpmlCodec for XmlOpmlCodec {
    fn parse(&self, document: &[u8]) -> Result<Vec<FeedEntry>, FeedbotError> {
        parse_outlines(document)
    }

    fn render(&self, title: &str, sources: &[Source]) -> Result<String, FeedbotError> {
        render_document(title, sources)
    }
}

fn invalid(message: impl Into<String>) -> FeedbotError {
    FeedbotError::InvalidInput(message.into())
}

/// Extract every feed outline from an OPML document, in document order.
pub fn parse_outlines(document: &[u8]) -> Result<Vec<FeedEntry>, FeedbotError> {
    let mut reader = Reader::from_reader(document);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                match element.local_name().as_ref() {
                    b"opml" => saw_root = true,
                    b"outline" => {
                        if let Some(entry) = outline_entry(&element)? {
                            entries.push(entry);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(invalid(format!(
                    "The file is not a valid OPML document (error at byte {}: {e}).",
                    reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }

    if !saw_root {
        return Err(invalid("The file is not a valid OPML document."));
    }
    debug!(count = entries.len(), "parsed OPML outlines");
    Ok(entries)
}

/// A feed reference, or `None` for folder outlines without `xmlUrl`.
fn outline_entry(element: &BytesStart<'_>) -> Result<Option<FeedEntry>, FeedbotError> {
    let mut url = None;
    let mut title = None;
    let mut text = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| invalid(format!("Malformed outline attribute: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| invalid(format!("Malformed outline attribute: {e}")))?
            .trim()
            .to_string();
        let key = attr.key.local_name();
        let key = key.as_ref();
        if key.eq_ignore_ascii_case(b"xmlUrl") {
            url = Some(value);
        } else if key == b"title" {
            title = Some(value);
        } else if key == b"text" {
            text = Some(value);
        }
    }

    let Some(url) = url.filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let title = title.filter(|t| !t.is_empty()).or(text.filter(|t| !t.is_empty()));
    Ok(Some(FeedEntry { url, title }))
}

/// Render `sources` as an OPML 2.0 document titled `title`.
pub fn render_document(title: &str, sources: &[Source]) -> Result<String, FeedbotError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write(
        &mut writer,
        Event::Start(BytesStart::new("opml").with_attributes([("version", "2.0")])),
    )?;
    write(&mut writer, Event::Start(BytesStart::new("head")))?;
    write(&mut writer, Event::Start(BytesStart::new("title")))?;
    write(&mut writer, Event::Text(BytesText::new(title)))?;
    write(&mut writer, Event::End(BytesEnd::new("title")))?;
    write(&mut writer, Event::End(BytesEnd::new("head")))?;
    write(&mut writer, Event::Start(BytesStart::new("body")))?;
    for source in sources {
        let label = source.display_title();
        let outline = BytesStart::new("outline").with_attributes([
            ("type", "rss"),
            ("text", label),
            ("title", label),
            ("xmlUrl", source.link.as_str()),
        ]);
        write(&mut writer, Event::Empty(outline))?;
    }
    write(&mut writer, Event::End(BytesEnd::new("body")))?;
    write(&mut writer, Event::End(BytesEnd::new("opml")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| FeedbotError::Internal(format!("OPML output is not UTF-8: {e}")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), FeedbotError> {
    writer
        .write_event(event)
        .map_err(|e| FeedbotError::Internal(format!("failed to write OPML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="1.0">
  <head><title>Exported</title></head>
  <body>
    <outline text="Tech" title="Tech">
      <outline type="rss" text="Rust Blog" title="Rust Blog" xmlUrl="https://blog.rust-lang.org/feed.xml"/>
      <outline text="Deeper">
        <outline type="rss" text="Only text" xmlUrl="https://deep.example/rss"/>
      </outline>
    </outline>
    <outline type="rss" xmlurl="https://lower.example/atom"/>
    <outline type="rss" title="Q&amp;A" xmlUrl="https://qa.example/rss?a=1&amp;b=2"/>
    <outline text="Empty folder"/>
  </body>
</opml>"#;

    fn source(id: i64, link: &str, title: &str) -> Source {
        Source {
            id,
            link: link.to_string(),
            title: title.to_string(),
            error_count: 0,
            error_baseline: 0,
        }
    }

    #[test]
    fn nested_outlines_are_flattened_in_order() {
        let entries = parse_outlines(NESTED.as_bytes()).unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://blog.rust-lang.org/feed.xml",
                "https://deep.example/rss",
                "https://lower.example/atom",
                "https://qa.example/rss?a=1&b=2",
            ]
        );
    }

    #[test]
    fn title_falls_back_to_text() {
        let entries = parse_outlines(NESTED.as_bytes()).unwrap();
        assert_eq!(entries[0].title.as_deref(), Some("Rust Blog"));
        assert_eq!(entries[1].title.as_deref(), Some("Only text"));
        assert_eq!(entries[2].title, None);
        assert_eq!(entries[3].title.as_deref(), Some("Q&A"));
    }

    #[test]
    fn mismatched_tags_are_invalid_input() {
        let doc = r#"<opml><body><outline xmlUrl="https://a.example/rss"></body></opml>"#;
        let err = parse_outlines(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, FeedbotError::InvalidInput(_)));
    }

    #[test]
    fn non_opml_document_is_invalid_input() {
        let err = parse_outlines(b"just some text").unwrap_err();
        assert!(matches!(err, FeedbotError::InvalidInput(_)));

        let err = parse_outlines(b"<rss><channel/></rss>").unwrap_err();
        assert!(matches!(err, FeedbotError::InvalidInput(_)));
    }

    #[test]
    fn empty_body_yields_no_entries() {
        let entries = parse_outlines(b"<opml version=\"2.0\"><body/></opml>").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn rendered_document_lists_every_source() {
        let sources = vec![
            source(1, "https://a.example/rss", "A <feed>"),
            source(2, "https://b.example/rss?x=1&y=2", ""),
        ];
        let doc = render_document("feedbot subscriptions", &sources).unwrap();
        assert!(doc.starts_with("<?xml"));
        assert!(doc.contains("A &lt;feed&gt;"));
        assert!(doc.contains("x=1&amp;y=2"));

        let parsed = XmlOpmlCodec.parse(doc.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].title.as_deref(), Some("A <feed>"));
        // Untitled sources export their link as the label.
        assert_eq!(parsed[1].title.as_deref(), Some("https://b.example/rss?x=1&y=2"));
    }

    #[test]
    fn render_empty_list() {
        let doc = XmlOpmlCodec.render("empty", &[]).unwrap();
        assert!(doc.contains("<body>"));
        assert!(parse_outlines(doc.as_bytes()).unwrap().is_empty());
    }
}
