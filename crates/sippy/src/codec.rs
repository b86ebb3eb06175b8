//! XML-RPC request encoding and response decoding

use std::fmt::Write as _;

use indexmap::IndexMap;
use quick_xml::{Reader, escape::escape, events::Event};

use crate::{error::RpcError, value::Value};

/// Encode a `methodCall` document
pub fn encode_method_call(method: &str, params: &[Value]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0"?><methodCall><methodName>"#);
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");

    for param in params {
        xml.push_str("<param>");
        write_value(&mut xml, param);
        xml.push_str("</param>");
    }

    xml.push_str("</params></methodCall>");
    xml
}

fn write_value(xml: &mut String, value: &Value) {
    xml.push_str("<value>");

    match value {
        Value::String(s) => {
            let _ = write!(xml, "<string>{}</string>", escape(s.as_str()));
        }
        Value::Int(i) => {
            let _ = write!(xml, "<int>{i}</int>");
        }
        Value::Boolean(b) => {
            let _ = write!(xml, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::Double(d) => {
            let _ = write!(xml, "<double>{d}</double>");
        }
        Value::DateTime(s) => {
            let _ = write!(xml, "<dateTime.iso8601>{}</dateTime.iso8601>", escape(s.as_str()));
        }
        Value::Base64(s) => {
            let _ = write!(xml, "<base64>{}</base64>", escape(s.as_str()));
        }
        Value::Nil => xml.push_str("<nil/>"),
        Value::Array(items) => {
            xml.push_str("<array><data>");
            for item in items {
                write_value(xml, item);
            }
            xml.push_str("</data></array>");
        }
        Value::Struct(members) => {
            xml.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(xml, "<member><name>{}</name>", escape(name.as_str()));
                write_value(xml, member);
                xml.push_str("</member>");
            }
            xml.push_str("</struct>");
        }
    }

    xml.push_str("</value>");
}

/// Decode a `methodResponse` body
///
/// Bodies that are not XML-RPC responses at all are returned verbatim as a
/// string value. A well-formed response carrying a malformed value fails
/// with [`RpcError::Xml`], and a fault fails with [`RpcError::Fault`].
pub fn parse_method_response(body: &str) -> Result<Value, RpcError> {
    let root = match parse_tree(body) {
        Ok(root) if root.name == "methodResponse" => root,
        Ok(root) => {
            tracing::debug!(root = %root.name, "response is not a methodResponse, passing through raw body");
            return Ok(Value::String(body.to_owned()));
        }
        Err(error) => {
            tracing::debug!(%error, "response is not XML, passing through raw body");
            return Ok(Value::String(body.to_owned()));
        }
    };

    if let Some(fault) = root.child("fault") {
        let value = fault
            .child("value")
            .map(decode_value)
            .transpose()?
            .unwrap_or(Value::Nil);

        return Err(fault_from_value(&value));
    }

    let Some(value) = root
        .child("params")
        .and_then(|params| params.child("param"))
        .and_then(|param| param.child("value"))
    else {
        return Ok(Value::Nil);
    };

    decode_value(value)
}

#[allow(clippy::cast_possible_truncation)]
fn fault_from_value(value: &Value) -> RpcError {
    let members = value.as_struct();

    let code = members
        .and_then(|m| m.get("faultCode"))
        .and_then(Value::as_f64)
        .map_or(0, |code| code as i64);

    let message = members
        .and_then(|m| m.get("faultString"))
        .and_then(Value::as_str)
        .or_else(|| value.first_string())
        .unwrap_or("XML-RPC fault")
        .to_owned();

    RpcError::Fault { code, message }
}

fn decode_value(element: &Element) -> Result<Value, RpcError> {
    let Some(typed) = element.children.first() else {
        return Ok(Value::String(element.text.clone()));
    };

    let text = typed.text.trim();

    let value = match typed.name.as_str() {
        "string" => Value::String(typed.text.clone()),
        "int" | "i4" | "i8" => Value::Int(
            text.parse()
                .map_err(|_| RpcError::Xml(format!("invalid integer '{text}'")))?,
        ),
        "boolean" => match text {
            "1" | "true" => Value::Boolean(true),
            "0" | "false" => Value::Boolean(false),
            _ => return Err(RpcError::Xml(format!("invalid boolean '{text}'"))),
        },
        "double" => Value::Double(
            text.parse()
                .map_err(|_| RpcError::Xml(format!("invalid double '{text}'")))?,
        ),
        "dateTime.iso8601" => Value::DateTime(text.to_owned()),
        "base64" => Value::Base64(text.split_whitespace().collect()),
        "nil" => Value::Nil,
        "array" => {
            let items = typed
                .child("data")
                .map(|data| {
                    data.children
                        .iter()
                        .filter(|c| c.name == "value")
                        .map(decode_value)
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?
                .unwrap_or_default();

            Value::Array(items)
        }
        "struct" => {
            let mut members = IndexMap::new();

            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member
                    .child("name")
                    .map(|n| n.text.clone())
                    .ok_or_else(|| RpcError::Xml("struct member without a name".to_owned()))?;

                let value = member.child("value").map(decode_value).transpose()?.unwrap_or(Value::Nil);

                members.insert(name, value);
            }

            Value::Struct(members)
        }
        other => return Err(RpcError::Xml(format!("unsupported value type '{other}'"))),
    };

    Ok(value)
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn parse_tree(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(Element {
                name: element_name(start.local_name().as_ref())?,
                ..Element::default()
            }),
            Event::Empty(start) => {
                let element = Element {
                    name: element_name(start.local_name().as_ref())?,
                    ..Element::default()
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or("unbalanced closing tag")?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_owned());
    }

    root.ok_or_else(|| "empty document".to_owned())
}

fn element_name(bytes: &[u8]) -> Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| e.to_string())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err("multiple root elements".to_owned()),
    }

    Ok(())
}
