// orgscan-core/src/infrastructure/adapters/metadata_soap.rs

// The metadata list/read calls only exist on the SOAP endpoint. Records of the
// types read through it are flat, so a small regex decoder is enough.

use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;

use crate::ports::platform::MetadataListItem;

static RESULT_BLOCK: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)<result>(.*?)</result>"));
static RECORD_BLOCK: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"(?s)<records(?:\s[^>]*)?>(.*?)</records>"#));
static LEAF: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"<(\w+)>([^<]*)</(\w+)>"));
static FAULT: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"(?s)<faultcode>(?:[\w]+:)?([^<]*)</faultcode>\s*<faultstring>([^<]*)</faultstring>")
});

fn pattern(lazy: &'static LazyLock<Result<Regex, regex::Error>>) -> Result<&'static Regex, String> {
    lazy.as_ref().map_err(|e| e.to_string())
}

pub fn list_envelope(session_id: &str, metadata_type: &str, api_version: f64) -> String {
    envelope(
        session_id,
        &format!(
            "<listMetadata><queries><type>{}</type></queries><asOfVersion>{:.1}</asOfVersion></listMetadata>",
            xml_escape(metadata_type),
            api_version
        ),
    )
}

pub fn read_envelope(session_id: &str, metadata_type: &str, full_names: &[String]) -> String {
    let members: String = full_names
        .iter()
        .map(|name| format!("<fullNames>{}</fullNames>", xml_escape(name)))
        .collect();
    envelope(
        session_id,
        &format!(
            "<readMetadata><type>{}</type>{}</readMetadata>",
            xml_escape(metadata_type),
            members
        ),
    )
}

fn envelope(session_id: &str, body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns="http://soap.sforce.com/2006/04/metadata">"#,
            "<soapenv:Header><SessionHeader><sessionId>{}</sessionId></SessionHeader></soapenv:Header>",
            "<soapenv:Body>{}</soapenv:Body></soapenv:Envelope>"
        ),
        xml_escape(session_id),
        body
    )
}

/// `(faultcode, faultstring)` when the response is a SOAP fault.
pub fn parse_fault(xml: &str) -> Result<Option<(String, String)>, String> {
    Ok(pattern(&FAULT)?
        .captures(xml)
        .map(|c| (c[1].trim().to_string(), xml_unescape(c[2].trim()))))
}

pub fn parse_list_result(xml: &str) -> Result<Vec<MetadataListItem>, String> {
    let mut items = Vec::new();
    for block in pattern(&RESULT_BLOCK)?.captures_iter(xml) {
        let fields = leaves(&block[1])?;
        let Some(Value::String(full_name)) = fields.get("fullName") else {
            continue;
        };
        items.push(MetadataListItem {
            full_name: full_name.clone(),
            id: string_field(&fields, "id"),
            namespace_prefix: string_field(&fields, "namespacePrefix"),
        });
    }
    Ok(items)
}

/// Decodes each `<records>` block into a flat JSON object.
pub fn parse_read_result(xml: &str) -> Result<Vec<Value>, String> {
    pattern(&RECORD_BLOCK)?
        .captures_iter(xml)
        .map(|block| leaves(&block[1]).map(Value::Object))
        .collect()
}

fn leaves(fragment: &str) -> Result<Map<String, Value>, String> {
    let mut fields = Map::new();
    for leaf in pattern(&LEAF)?.captures_iter(fragment) {
        if leaf[1] != leaf[3] {
            continue;
        }
        fields.insert(leaf[1].to_string(), typed(&xml_unescape(&leaf[2])));
    }
    Ok(fields)
}

fn typed(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match raw.parse::<i64>() {
            Ok(n) => Value::Number(Number::from(n)),
            Err(_) => Value::String(raw.to_string()),
        },
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
