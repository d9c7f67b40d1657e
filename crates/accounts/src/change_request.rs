//! Pending change-request payload.
//!
//! A staged diff is stored on the user as a tagged tree rooted at `changes`,
//! one child per property, each carrying `old` and `new` leaves:
//!
//! ```text
//! <changes>
//! 	<username type="array">
//! 		<old>alice</old>
//! 		<new>alice2</new>
//! 	</username>
//! </changes>
//! ```
//!
//! Leaves carry `type="integer"`, `type="boolean"` or `type="NULL"` when the
//! value is not text, so payloads written by older installations decode to
//! the same values.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::diff::{DiffValue, PropertyChange, PropertyDiff};

pub const ROOT_TAG: &str = "changes";
const OLD_TAG: &str = "old";
const NEW_TAG: &str = "new";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("failed to write change request: {0}")]
    Write(String),

    #[error("malformed change request: {0}")]
    Malformed(String),
}

fn malformed(msg: impl Into<String>) -> PayloadError {
    PayloadError::Malformed(msg.into())
}

/// Serialize `diff` into the tagged tree payload.
///
/// An empty diff yields an empty payload.
pub fn encode(diff: &PropertyDiff) -> Result<String, PayloadError> {
    if diff.is_empty() {
        return Ok(String::new());
    }

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b'\t', 1);
    emit(&mut writer, Event::Start(BytesStart::new(ROOT_TAG)))?;
    for (name, change) in diff.iter() {
        let mut element = BytesStart::new(name);
        element.push_attribute(("type", "array"));
        emit(&mut writer, Event::Start(element))?;
        write_leaf(&mut writer, OLD_TAG, &change.old)?;
        write_leaf(&mut writer, NEW_TAG, &change.new)?;
        emit(&mut writer, Event::End(BytesEnd::new(name)))?;
    }
    emit(&mut writer, Event::End(BytesEnd::new(ROOT_TAG)))?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| PayloadError::Write(e.to_string()))
}

fn emit(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), PayloadError> {
    writer
        .write_event(event)
        .map_err(|e| PayloadError::Write(e.to_string()))
}

fn write_leaf(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    tag: &str,
    value: &DiffValue,
) -> Result<(), PayloadError> {
    let mut element = BytesStart::new(tag);
    match value {
        DiffValue::Null => {
            element.push_attribute(("type", "NULL"));
            return emit(writer, Event::Empty(element));
        }
        DiffValue::Bool(_) => element.push_attribute(("type", "boolean")),
        DiffValue::Int(_) => element.push_attribute(("type", "integer")),
        DiffValue::Text(_) => {}
    }

    let text = value.to_string();
    emit(writer, Event::Start(element))?;
    emit(writer, Event::Text(BytesText::new(&text)))?;
    emit(writer, Event::End(BytesEnd::new(tag)))
}

/// Parse a payload produced by [`encode`] (or by an older installation) back
/// into a diff. An empty payload decodes to an empty diff.
pub fn decode(payload: &str) -> Result<PropertyDiff, PayloadError> {
    let mut diff = PropertyDiff::new();
    if payload.trim().is_empty() {
        return Ok(diff);
    }

    // Leaf text is kept verbatim; only indentation between elements is dropped.
    let mut reader = Reader::from_str(payload);

    let mut seen_root = false;
    let mut property: Option<String> = None;
    let mut old: Option<DiffValue> = None;
    let mut new: Option<DiffValue> = None;
    // (leaf tag, type attribute, accumulated text)
    let mut leaf: Option<(String, Option<String>, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(e.to_string()))?;
        match event {
            Event::Start(e) => {
                let tag = tag_name(&e);
                if !seen_root {
                    if tag != ROOT_TAG {
                        return Err(malformed(format!("unexpected root <{tag}>")));
                    }
                    seen_root = true;
                } else if property.is_none() {
                    property = Some(tag);
                } else if leaf.is_none() && (tag == OLD_TAG || tag == NEW_TAG) {
                    leaf = Some((tag, type_attribute(&e)?, String::new()));
                } else {
                    return Err(malformed(format!("unexpected element <{tag}>")));
                }
            }
            Event::Empty(e) => {
                let tag = tag_name(&e);
                if !seen_root && tag == ROOT_TAG {
                    seen_root = true;
                    continue;
                }
                if property.is_none() || leaf.is_some() {
                    return Err(malformed(format!("unexpected empty element <{tag}>")));
                }
                let value = leaf_value(type_attribute(&e)?.as_deref(), "")?;
                match tag.as_str() {
                    OLD_TAG => old = Some(value),
                    NEW_TAG => new = Some(value),
                    _ => return Err(malformed(format!("unexpected element <{tag}>"))),
                }
            }
            Event::Text(t) => {
                let content = t.unescape().map_err(|e| malformed(e.to_string()))?;
                match leaf.as_mut() {
                    Some((_, _, text)) => text.push_str(&content),
                    None if content.trim().is_empty() => {}
                    None => return Err(malformed("text outside of old/new")),
                }
            }
            Event::CData(t) => {
                let Some((_, _, text)) = leaf.as_mut() else {
                    return Err(malformed("text outside of old/new"));
                };
                text.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Event::End(_) => {
                if let Some((tag, kind, text)) = leaf.take() {
                    let value = leaf_value(kind.as_deref(), &text)?;
                    if tag == OLD_TAG {
                        old = Some(value);
                    } else {
                        new = Some(value);
                    }
                } else if let Some(name) = property.take() {
                    let change = PropertyChange {
                        old: old.take().unwrap_or(DiffValue::Null),
                        new: new.take().unwrap_or(DiffValue::Null),
                    };
                    diff.insert(name, change);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(malformed(format!("missing <{ROOT_TAG}> root")));
    }
    Ok(diff)
}

fn tag_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn type_attribute(element: &BytesStart<'_>) -> Result<Option<String>, PayloadError> {
    let attribute = element
        .try_get_attribute("type")
        .map_err(|e| malformed(e.to_string()))?;
    attribute
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .map_err(|e| malformed(e.to_string()))
        })
        .transpose()
}

fn leaf_value(kind: Option<&str>, text: &str) -> Result<DiffValue, PayloadError> {
    match kind {
        Some("NULL") => Ok(DiffValue::Null),
        Some("integer") => text
            .trim()
            .parse::<i64>()
            .map(DiffValue::Int)
            .map_err(|e| malformed(format!("invalid integer '{text}': {e}"))),
        Some("boolean") => Ok(DiffValue::Bool(matches!(text.trim(), "1" | "true"))),
        _ => Ok(DiffValue::Text(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(old: DiffValue, new: DiffValue) -> PropertyChange {
        PropertyChange { old, new }
    }

    fn sample() -> PropertyDiff {
        let mut diff = PropertyDiff::new();
        diff.insert(
            "username",
            change(DiffValue::Text("alice".into()), DiffValue::Text("alice2".into())),
        );
        diff.insert(
            "usergroup",
            change(
                DiffValue::Text("Members, Editors".into()),
                DiffValue::Text("Members, Authors".into()),
            ),
        );
        diff
    }

    #[test]
    fn encodes_tagged_tree_in_detection_order() {
        let payload = encode(&sample()).unwrap();
        assert_eq!(
            payload,
            "<changes>\n\
             \t<username type=\"array\">\n\
             \t\t<old>alice</old>\n\
             \t\t<new>alice2</new>\n\
             \t</username>\n\
             \t<usergroup type=\"array\">\n\
             \t\t<old>Members, Editors</old>\n\
             \t\t<new>Members, Authors</new>\n\
             \t</usergroup>\n\
             </changes>"
        );
    }

    #[test]
    fn empty_diff_encodes_to_empty_payload() {
        assert_eq!(encode(&PropertyDiff::new()).unwrap(), "");
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn decodes_what_it_encodes() {
        let mut diff = sample();
        diff.insert("gender", change(DiffValue::Int(0), DiffValue::Int(2)));
        diff.insert("terms", change(DiffValue::Bool(false), DiffValue::Bool(true)));
        diff.insert("dateOfBirth", change(DiffValue::Null, DiffValue::Int(100)));
        diff.insert(
            "company",
            change(DiffValue::Text("A & B <Ltd>".into()), DiffValue::Text(String::new())),
        );

        let payload = encode(&diff).unwrap();
        assert!(payload.contains("A &amp; B &lt;Ltd&gt;"));
        assert_eq!(decode(&payload).unwrap(), diff);
    }

    #[test]
    fn leaf_whitespace_survives_decoding() {
        let mut diff = PropertyDiff::new();
        diff.insert(
            "company",
            change(DiffValue::Text("  ACME ".into()), DiffValue::Text(" ".into())),
        );
        diff.insert(
            "city",
            change(DiffValue::Text("ACME".into()), DiffValue::Text("ACME\t\n".into())),
        );

        let payload = encode(&diff).unwrap();
        assert!(payload.contains("<old>  ACME </old>"));
        assert_eq!(decode(&payload).unwrap(), diff);
    }

    #[test]
    fn stray_text_between_elements_is_rejected() {
        let payload = r#"<changes><email type="array">oops<old>a</old><new>b</new></email></changes>"#;
        assert!(decode(payload).is_err());
    }

    #[test]
    fn decodes_legacy_single_line_payload() {
        let payload = r#"<changes><email type="array"><old>a@x.com</old><new>b@x.com</new></email><gender type="array"><old type="integer">1</old><new type="integer">2</new></gender></changes>"#;
        let diff = decode(payload).unwrap();

        assert_eq!(diff.names().collect::<Vec<_>>(), vec!["email", "gender"]);
        assert_eq!(
            diff.get("gender"),
            Some(&change(DiffValue::Int(1), DiffValue::Int(2)))
        );
    }

    #[test]
    fn rejects_foreign_root() {
        let err = decode("<other><a/></other>").unwrap_err();
        assert!(matches!(err, PayloadError::Malformed(msg) if msg.contains("other")));
    }

    #[test]
    fn rejects_bad_integer_leaf() {
        let payload = r#"<changes><gender><old type="integer">x</old><new>1</new></gender></changes>"#;
        assert!(decode(payload).is_err());
    }
}
