//! Placeholder substitution inside one WordprocessingML part.
//!
//! Word splits paragraph text into runs freely, so a `{{ key }}` typed in one
//! go may end up spread over several `<w:t>` elements. Substitution therefore
//! works on the joined text of each paragraph: the value lands in the text
//! element where the placeholder starts, and the rest of the placeholder is cut
//! out of the elements that follow. Elements of paragraphs without placeholders
//! are written back byte for byte.
use crate::contract::context::RowContext;
use crate::document::RenderError;
use crate::error::ContractError;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Writer;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

// Local names of the elements that carry text (w:p/w:t, and a:p/a:t inside drawings)
const TAG_PARAGRAPH: &[u8] = b"p";
const TAG_TEXT: &[u8] = b"t";

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Longest excerpt of paragraph text quoted in error messages
const EXCERPT_LIMIT: usize = 40;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("Hardcode regex pattern"));

/// A text element of the part
struct TextSlot {
    /// Innermost enclosing paragraph, None for text outside paragraphs
    paragraph: Option<usize>,
    /// Index of the element's start event
    start: usize,
    /// Indexes of the text, CDATA and reference events inside the element
    content: Vec<usize>,
    /// Decoded text of the element
    text: String,
}

/// A placeholder occurrence in a paragraph's joined text
struct Occurrence {
    range: Range<usize>,
    key: String,
}

/// One XML part held as an event list, ready for substitution and writing.
pub(super) struct Part {
    name: String,
    events: Vec<Event<'static>>,
    slots: Vec<TextSlot>,
}

impl Part {
    /// Parses the part and indexes its text elements by paragraph.
    pub(super) fn parse(name: &str, xml: &[u8]) -> Result<Part, ContractError> {
        let mut reader = XmlReader::for_rewrite(xml);
        let mut events = Vec::<Event<'static>>::new();
        let mut slots = Vec::<TextSlot>::new();
        let mut paragraphs = Vec::<usize>::new();
        let mut paragraph_count = 0usize;
        let mut current = None::<TextSlot>;

        while let Some(event) = reader.next()? {
            let index = events.len();
            match &event {
                Event::Start(event) if event.local_name().as_ref() == TAG_PARAGRAPH => {
                    paragraphs.push(paragraph_count);
                    paragraph_count += 1;
                }
                Event::End(event) if event.local_name().as_ref() == TAG_PARAGRAPH => {
                    paragraphs.pop();
                }
                Event::Start(event) if event.local_name().as_ref() == TAG_TEXT => {
                    current = Some(TextSlot {
                        paragraph: paragraphs.last().copied(),
                        start: index,
                        content: Vec::new(),
                        text: String::new(),
                    });
                }
                Event::End(event) if event.local_name().as_ref() == TAG_TEXT => {
                    if let Some(slot) = current.take() {
                        slots.push(slot);
                    }
                }
                Event::Text(event) => {
                    if let Some(slot) = &mut current {
                        slot.text.push_bytes_text(event)?;
                        slot.content.push(index);
                    }
                }
                Event::CData(event) => {
                    if let Some(slot) = &mut current {
                        slot.text.push_bytes_cdata(event)?;
                        slot.content.push(index);
                    }
                }
                Event::GeneralRef(event) => {
                    if let Some(slot) = &mut current {
                        slot.text.push_bytes_ref(event)?;
                        slot.content.push(index);
                    }
                }
                _ => (),
            }
            events.push(event.into_owned());
        }

        Ok(Part {
            name: name.to_owned(),
            events,
            slots,
        })
    }

    /// Lists the placeholder keys of the part in document order.
    pub(super) fn placeholders(&self) -> Result<Vec<String>, ContractError> {
        let mut keys = Vec::<String>::new();
        for group in self.paragraphs() {
            let joined = self.joined(&group);
            if joined.contains(OPEN) {
                keys.extend(self.scan(&joined)?.into_iter().map(|occurrence| occurrence.key));
            }
        }
        Ok(keys)
    }

    /// Replaces every placeholder with its context value.
    ///
    /// Keys missing from the context render blank, or fail when `strict` is set.
    ///
    /// # Returns
    /// Number of placeholders replaced
    pub(super) fn substitute(&mut self, context: &RowContext, strict: bool) -> Result<usize, ContractError> {
        let mut replaced = 0usize;
        for group in self.paragraphs() {
            let joined = self.joined(&group);
            if !joined.contains(OPEN) {
                continue;
            }
            let occurrences = self.scan(&joined)?;
            if occurrences.is_empty() {
                continue;
            }

            let mut bounds = Vec::<Range<usize>>::with_capacity(group.len());
            let mut offset = 0usize;
            for index in &group {
                let length = self.slots[*index].text.len();
                bounds.push(offset..offset + length);
                offset += length;
            }

            let mut texts = vec![String::new(); group.len()];
            let mut cursor = 0usize;
            for occurrence in &occurrences {
                let value = match context.get(&occurrence.key) {
                    Some(value) => value,
                    None if strict => Err(RenderError::UnknownPlaceholder {
                        part: self.name.to_owned(),
                        key: occurrence.key.to_owned(),
                    })?,
                    None => {
                        tracing::debug!("Placeholder '{}' in '{}' has no value", occurrence.key, self.name);
                        ""
                    }
                };
                copy_range(&joined, &bounds, cursor..occurrence.range.start, &mut texts);
                let owner = bounds
                    .iter()
                    .position(|bound| bound.contains(&occurrence.range.start))
                    .unwrap_or_default();
                texts[owner].push_str(value);
                cursor = occurrence.range.end;
                replaced += 1;
            }
            copy_range(&joined, &bounds, cursor..joined.len(), &mut texts);

            for (index, text) in group.into_iter().zip(texts) {
                self.replace_text(index, text)?;
            }
        }
        Ok(replaced)
    }

    /// Serializes the events back into XML.
    pub(super) fn write(&self) -> Result<Vec<u8>, ContractError> {
        let mut writer = Writer::new(Vec::<u8>::new());
        for event in &self.events {
            writer.write_event(event.borrow())?;
        }
        Ok(writer.into_inner())
    }

    /// Groups slot indexes by paragraph, in document order.
    fn paragraphs(&self) -> Vec<Vec<usize>> {
        let mut groups = Vec::<Vec<usize>>::new();
        let mut positions = HashMap::<usize, usize>::new();
        for (index, slot) in self.slots.iter().enumerate() {
            match slot.paragraph {
                Some(paragraph) => {
                    let position = *positions.entry(paragraph).or_insert_with(|| {
                        groups.push(Vec::new());
                        groups.len() - 1
                    });
                    groups[position].push(index);
                }
                None => groups.push(vec![index]),
            }
        }
        groups
    }

    fn joined(&self, group: &[usize]) -> String {
        group.iter().map(|index| self.slots[*index].text.as_str()).collect()
    }

    /// Finds the placeholders of a paragraph's joined text.
    fn scan(&self, joined: &str) -> Result<Vec<Occurrence>, RenderError> {
        let mut occurrences = Vec::<Occurrence>::new();
        let mut tail = 0usize;
        for captures in PLACEHOLDER.captures_iter(joined) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let key = inner.as_str().trim();
            if key.is_empty() || key.contains(OPEN) || key.contains(CLOSE) {
                return Err(RenderError::MalformedPlaceholder {
                    part: self.name.to_owned(),
                    text: excerpt(whole.as_str()),
                });
            }
            occurrences.push(Occurrence {
                range: whole.range(),
                key: key.to_owned(),
            });
            tail = whole.end();
        }
        if let Some(position) = joined[tail..].find(OPEN) {
            return Err(RenderError::UnclosedPlaceholder {
                part: self.name.to_owned(),
                text: excerpt(&joined[tail + position..]),
            });
        }
        Ok(occurrences)
    }

    /// Writes `text` into a slot, collapsing its content into a single text event.
    fn replace_text(&mut self, index: usize, text: String) -> Result<(), ContractError> {
        let slot = &mut self.slots[index];
        if slot.text == text {
            return Ok(());
        }
        if let Some((first, rest)) = slot.content.split_first() {
            self.events[*first] = Event::Text(BytesText::new(&text).into_owned());
            for position in rest {
                self.events[*position] = Event::Text(BytesText::new("").into_owned());
            }
        }
        let padded = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
        if let Event::Start(start) = &mut self.events[slot.start] {
            if padded && start.try_get_attribute("xml:space")?.is_none() {
                start.push_attribute(("xml:space", "preserve"));
            }
        }
        slot.text = text;
        Ok(())
    }
}

/// Copies the part of `range` that falls into each slot bound onto that slot's text.
fn copy_range(joined: &str, bounds: &[Range<usize>], range: Range<usize>, texts: &mut [String]) {
    for (bound, text) in bounds.iter().zip(texts.iter_mut()) {
        let start = bound.start.max(range.start);
        let end = bound.end.min(range.end);
        if start < end {
            text.push_str(&joined[start..end]);
        }
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;
    const TAIL: &str = "</w:body></w:document>";

    fn context() -> RowContext {
        RowContext {
            contract_id: "CT-001".to_owned(),
            prefix: "Mr.".to_owned(),
            name: "Somchai".to_owned(),
            surname: "Suksan".to_owned(),
            id_card: "0123456".to_owned(),
            address: "1/2 Sukhumvit <Soi 3> & Co".to_owned(),
            sign_name: "Mr. Somchai Suksan".to_owned(),
        }
    }

    fn render(body: &str, strict: bool) -> Result<String, ContractError> {
        let xml = format!("{HEAD}{body}{TAIL}");
        let mut part = Part::parse("word/document.xml", xml.as_bytes())?;
        part.substitute(&context(), strict)?;
        Ok(String::from_utf8(part.write()?).unwrap())
    }

    #[test]
    fn substitute_single_run() {
        let xml = render("<w:p><w:r><w:t>Dear {{ name }} {{surname}}</w:t></w:r></w:p>", false).unwrap();
        assert!(xml.contains("<w:t>Dear Somchai Suksan</w:t>"));
    }

    #[test]
    fn substitute_split_runs() {
        let body = "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>No. {{ con</w:t></w:r><w:r><w:t>tract_id }}.</w:t></w:r></w:p>";
        let xml = render(body, false).unwrap();
        assert!(xml.contains("<w:t>No. CT-001</w:t>"));
        assert!(xml.contains("<w:t>.</w:t>"));
        assert!(xml.contains("<w:b/>"));
    }

    #[test]
    fn substitute_escapes_values() {
        let xml = render("<w:p><w:r><w:t>{{ address }}</w:t></w:r></w:p>", false).unwrap();
        assert!(xml.contains("1/2 Sukhumvit &lt;Soi 3"));
        assert!(xml.contains("&amp; Co"));
    }

    #[test]
    fn substitute_text_with_entities() {
        let xml = render("<w:p><w:r><w:t>A &amp; {{ prefix }}</w:t></w:r></w:p>", false).unwrap();
        assert!(xml.contains("<w:t>A &amp; Mr.</w:t>"));
    }

    #[test]
    fn substitute_preserves_padding() {
        let xml = render("<w:p><w:r><w:t>{{ name }}</w:t></w:r><w:r><w:t xml:space=\"preserve\"> signs</w:t></w:r><w:r><w:t>{{ prefix }} </w:t></w:r></w:p>", false).unwrap();
        assert!(xml.contains(r#"<w:t xml:space="preserve">Mr. </w:t>"#));
    }

    #[test]
    fn substitute_leaves_other_paragraphs_untouched() {
        let body = "<w:p><w:r><w:t>Plain &amp; simple</w:t></w:r></w:p><w:p><w:r><w:t>{{ id_card }}</w:t></w:r></w:p>";
        let xml = render(body, false).unwrap();
        assert!(xml.contains("<w:t>Plain &amp; simple</w:t>"));
        assert!(xml.contains("<w:t>0123456</w:t>"));
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
    }

    #[test]
    fn substitute_unknown_key_renders_blank() {
        let xml = render("<w:p><w:r><w:t>[{{ Name }}]</w:t></w:r></w:p>", false).unwrap();
        assert!(xml.contains("<w:t>[]</w:t>"));
    }

    #[test]
    fn substitute_unknown_key_strict() {
        let result = render("<w:p><w:r><w:t>{{ phone }}</w:t></w:r></w:p>", true);
        assert!(matches!(
            result,
            Err(ContractError::RenderError(RenderError::UnknownPlaceholder { .. }))
        ));
    }

    #[test]
    fn substitute_unclosed_placeholder() {
        let result = render("<w:p><w:r><w:t>{{ name }} and {{ surname</w:t></w:r></w:p>", false);
        assert!(matches!(
            result,
            Err(ContractError::RenderError(RenderError::UnclosedPlaceholder { .. }))
        ));
    }

    #[test]
    fn substitute_does_not_join_paragraphs() {
        let result = render("<w:p><w:r><w:t>{{ na</w:t></w:r></w:p><w:p><w:r><w:t>me }}</w:t></w:r></w:p>", false);
        assert!(matches!(
            result,
            Err(ContractError::RenderError(RenderError::UnclosedPlaceholder { .. }))
        ));
    }

    #[test]
    fn placeholders_in_document_order() {
        let xml = format!("{HEAD}<w:p><w:r><w:t>{{{{ sign_name }}}} {{{{na</w:t></w:r><w:r><w:t>me}}}}</w:t></w:r></w:p>{TAIL}");
        let part = Part::parse("word/document.xml", xml.as_bytes()).unwrap();
        assert_eq!(part.placeholders().unwrap(), ["sign_name", "name"]);
    }
}
