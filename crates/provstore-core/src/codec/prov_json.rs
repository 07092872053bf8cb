//! W3C PROV-JSON codec.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::codec::{CodecError, GraphCodec};
use crate::graph::{
    AttrValue, Attributes, Bundle, Document, Element, ElementKind, QualifiedName, Relation,
};

const FORMAT_JSON: &str = "json";

/// PROV-JSON implementation of [`GraphCodec`].
///
/// Handles the `prefix`, `bundle`, element and relation sections of the
/// PROV-JSON mapping. Identifiers without a declared prefix are preserved
/// with an empty namespace so the namespace-validity stage can reject them
/// with its own message instead of a parse error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvJsonCodec;

impl ProvJsonCodec {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl GraphCodec for ProvJsonCodec {
    fn decode(&self, content: &[u8], format: &str) -> Result<Document, CodecError> {
        if !format.eq_ignore_ascii_case(FORMAT_JSON) {
            return Err(CodecError::UnsupportedFormat {
                format: format.to_owned(),
            });
        }
        let root: Value =
            serde_json::from_slice(content).map_err(|err| CodecError::Malformed {
                detail: err.to_string(),
            })?;
        let root = root.as_object().ok_or_else(|| CodecError::Malformed {
            detail: "top-level value is not an object".to_owned(),
        })?;

        let mut document = Document::new();
        let doc_prefixes = read_prefixes(root);
        for (prefix, uri) in &doc_prefixes {
            document.add_namespace(prefix.clone(), uri.clone());
        }

        if let Some(bundles) = root.get("bundle") {
            let bundles = bundles.as_object().ok_or_else(|| CodecError::Malformed {
                detail: "'bundle' section is not an object".to_owned(),
            })?;
            for (bundle_id, body) in bundles {
                let body = body.as_object().ok_or_else(|| CodecError::Malformed {
                    detail: format!("bundle [{bundle_id}] is not an object"),
                })?;
                let mut prefixes = doc_prefixes.clone();
                prefixes.extend(read_prefixes(body));
                let identifier = parse_name(bundle_id, &prefixes)?;
                let mut bundle = Bundle::new(identifier);
                for (prefix, uri) in &prefixes {
                    bundle.add_namespace(prefix.clone(), uri.clone());
                }
                decode_bundle_body(&mut bundle, body, &prefixes)?;
                document.add_bundle(bundle);
            }
        }

        Ok(document)
    }

    fn encode(&self, document: &Document, format: &str) -> Result<Vec<u8>, CodecError> {
        if !format.eq_ignore_ascii_case(FORMAT_JSON) {
            return Err(CodecError::UnsupportedFormat {
                format: format.to_owned(),
            });
        }
        let mut root = Map::new();
        if !document.namespaces().is_empty() {
            root.insert("prefix".to_owned(), prefixes_to_json(document.namespaces()));
        }
        let mut bundles = Map::new();
        for bundle in document.bundles() {
            bundles.insert(bundle.identifier().to_string(), encode_bundle(bundle));
        }
        if !bundles.is_empty() {
            root.insert("bundle".to_owned(), Value::Object(bundles));
        }
        serde_json::to_vec_pretty(&Value::Object(root)).map_err(|err| CodecError::Malformed {
            detail: err.to_string(),
        })
    }
}

type Prefixes = BTreeMap<String, String>;

fn read_prefixes(section: &Map<String, Value>) -> Prefixes {
    let mut prefixes = Prefixes::new();
    if let Some(Value::Object(map)) = section.get("prefix") {
        for (prefix, uri) in map {
            if let Value::String(uri) = uri {
                prefixes.insert(prefix.clone(), uri.clone());
            }
        }
    }
    prefixes
}

fn parse_name(raw: &str, prefixes: &Prefixes) -> Result<QualifiedName, CodecError> {
    match raw.split_once(':') {
        Some((prefix, local)) => match prefixes.get(prefix) {
            Some(uri) => Ok(QualifiedName::new(prefix, uri.clone(), local)),
            // Blank-node style ids ("_:gen1") have no namespace on purpose.
            None if prefix == "_" => Ok(QualifiedName::new("_", "", local)),
            None => Err(CodecError::UndeclaredPrefix {
                prefix: prefix.to_owned(),
            }),
        },
        // Bare identifier: kept with an empty namespace for the namespace
        // validity stage to reject.
        None => Ok(QualifiedName::new("", "", raw)),
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, CodecError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| CodecError::Malformed {
            detail: format!("invalid timestamp [{raw}]: {err}"),
        })
}

fn parse_attr_value(value: &Value, prefixes: &Prefixes) -> Result<AttrValue, CodecError> {
    match value {
        Value::String(raw) => {
            if let Some((prefix, _)) = raw.split_once(':') {
                if prefixes.contains_key(prefix) {
                    return Ok(AttrValue::Qualified(parse_name(raw, prefixes)?));
                }
            }
            Ok(AttrValue::Str(raw.clone()))
        }
        Value::Number(number) => number
            .as_i64()
            .map(AttrValue::Int)
            .ok_or_else(|| CodecError::Malformed {
                detail: format!("unsupported numeric attribute value: {number}"),
            }),
        Value::Object(map) => {
            let literal = map
                .get("$")
                .ok_or_else(|| CodecError::Malformed {
                    detail: "typed value without '$'".to_owned(),
                })?;
            let datatype = map.get("type").and_then(Value::as_str).unwrap_or("");
            match datatype {
                "prov:QUALIFIED_NAME" | "xsd:QName" => {
                    let raw = literal.as_str().ok_or_else(|| CodecError::Malformed {
                        detail: "qualified-name value is not a string".to_owned(),
                    })?;
                    Ok(AttrValue::Qualified(parse_name(raw, prefixes)?))
                }
                "xsd:dateTime" => {
                    let raw = literal.as_str().ok_or_else(|| CodecError::Malformed {
                        detail: "dateTime value is not a string".to_owned(),
                    })?;
                    Ok(AttrValue::Time(parse_time(raw)?))
                }
                "xsd:int" | "xsd:integer" | "xsd:long" => match literal {
                    Value::Number(number) => number.as_i64().map(AttrValue::Int).ok_or_else(|| {
                        CodecError::Malformed {
                            detail: format!("non-integral value: {number}"),
                        }
                    }),
                    Value::String(raw) => {
                        raw.parse().map(AttrValue::Int).map_err(|_| CodecError::Malformed {
                            detail: format!("non-integral value: {raw}"),
                        })
                    }
                    _ => Err(CodecError::Malformed {
                        detail: "integer value is neither number nor string".to_owned(),
                    }),
                },
                _ => match literal {
                    Value::String(raw) => Ok(AttrValue::Str(raw.clone())),
                    Value::Number(number) => {
                        number
                            .as_i64()
                            .map(AttrValue::Int)
                            .ok_or_else(|| CodecError::Malformed {
                                detail: format!("unsupported literal: {number}"),
                            })
                    }
                    _ => Err(CodecError::Malformed {
                        detail: "unsupported typed literal".to_owned(),
                    }),
                },
            }
        }
        _ => Err(CodecError::Malformed {
            detail: "unsupported attribute value shape".to_owned(),
        }),
    }
}

/// Keys that carry structural roles rather than attributes.
const ROLE_KEYS: &[&str] = &[
    "prov:entity",
    "prov:activity",
    "prov:agent",
    "prov:generatedEntity",
    "prov:usedEntity",
    "prov:specificEntity",
    "prov:generalEntity",
    "prov:alternate1",
    "prov:alternate2",
    "prov:informed",
    "prov:informant",
    "prov:trigger",
    "prov:starter",
    "prov:ender",
    "prov:collection",
    "prov:delegate",
    "prov:responsible",
    "prov:influencee",
    "prov:influencer",
    "prov:time",
    "prov:startTime",
    "prov:endTime",
];

fn decode_attributes(
    body: &Map<String, Value>,
    prefixes: &Prefixes,
) -> Result<Attributes, CodecError> {
    let mut attributes = Attributes::new();
    for (key, value) in body {
        if ROLE_KEYS.contains(&key.as_str()) {
            continue;
        }
        let key = parse_name(key, prefixes)?;
        match value {
            Value::Array(values) => {
                for value in values {
                    attributes.insert(key.clone(), parse_attr_value(value, prefixes)?);
                }
            }
            _ => attributes.insert(key.clone(), parse_attr_value(value, prefixes)?),
        }
    }
    Ok(attributes)
}

fn role_name(
    body: &Map<String, Value>,
    role: &str,
    prefixes: &Prefixes,
) -> Result<Option<QualifiedName>, CodecError> {
    match body.get(role) {
        Some(Value::String(raw)) => Ok(Some(parse_name(raw, prefixes)?)),
        Some(_) => Err(CodecError::Malformed {
            detail: format!("role [{role}] is not an identifier"),
        }),
        None => Ok(None),
    }
}

fn required_role(
    body: &Map<String, Value>,
    role: &str,
    section: &str,
    prefixes: &Prefixes,
) -> Result<QualifiedName, CodecError> {
    role_name(body, role, prefixes)?.ok_or_else(|| CodecError::Malformed {
        detail: format!("[{section}] record missing role [{role}]"),
    })
}

fn role_time(body: &Map<String, Value>, role: &str) -> Result<Option<DateTime<Utc>>, CodecError> {
    match body.get(role) {
        Some(Value::String(raw)) => Ok(Some(parse_time(raw)?)),
        Some(_) => Err(CodecError::Malformed {
            detail: format!("role [{role}] is not a timestamp"),
        }),
        None => Ok(None),
    }
}

fn relation_id(raw: &str, prefixes: &Prefixes) -> Result<Option<QualifiedName>, CodecError> {
    let name = parse_name(raw, prefixes)?;
    // Blank-node ids are anonymous relations.
    if name.prefix() == "_" {
        Ok(None)
    } else {
        Ok(Some(name))
    }
}

fn decode_bundle_body(
    bundle: &mut Bundle,
    body: &Map<String, Value>,
    prefixes: &Prefixes,
) -> Result<(), CodecError> {
    for (section, value) in body {
        if section == "prefix" {
            continue;
        }
        let records = value.as_object().ok_or_else(|| CodecError::Malformed {
            detail: format!("section [{section}] is not an object"),
        })?;
        for (record_id, record) in records {
            let record = record.as_object().ok_or_else(|| CodecError::Malformed {
                detail: format!("record [{record_id}] is not an object"),
            })?;
            decode_record(bundle, section, record_id, record, prefixes)?;
        }
    }
    Ok(())
}

fn decode_record(
    bundle: &mut Bundle,
    section: &str,
    record_id: &str,
    body: &Map<String, Value>,
    prefixes: &Prefixes,
) -> Result<(), CodecError> {
    let attributes = decode_attributes(body, prefixes)?;
    match section {
        "entity" => {
            bundle.entity(parse_name(record_id, prefixes)?, attributes);
        }
        "activity" => {
            let start = role_time(body, "prov:startTime")?;
            let end = role_time(body, "prov:endTime")?;
            bundle.activity(parse_name(record_id, prefixes)?, start, end, attributes);
        }
        "agent" => {
            bundle.agent(parse_name(record_id, prefixes)?, attributes);
        }
        "wasGeneratedBy" => bundle.add_relation(Relation::Generation {
            entity: required_role(body, "prov:entity", section, prefixes)?,
            activity: required_role(body, "prov:activity", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            time: role_time(body, "prov:time")?,
            attributes,
        }),
        "used" => bundle.add_relation(Relation::Usage {
            activity: required_role(body, "prov:activity", section, prefixes)?,
            entity: required_role(body, "prov:entity", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            time: role_time(body, "prov:time")?,
            attributes,
        }),
        "wasDerivedFrom" => bundle.add_relation(Relation::Derivation {
            generated: required_role(body, "prov:generatedEntity", section, prefixes)?,
            used: required_role(body, "prov:usedEntity", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            attributes,
        }),
        "specializationOf" => bundle.add_relation(Relation::Specialization {
            specific: required_role(body, "prov:specificEntity", section, prefixes)?,
            general: required_role(body, "prov:generalEntity", section, prefixes)?,
            attributes,
        }),
        "wasAttributedTo" => bundle.add_relation(Relation::Attribution {
            entity: required_role(body, "prov:entity", section, prefixes)?,
            agent: required_role(body, "prov:agent", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            attributes,
        }),
        "wasAssociatedWith" => bundle.add_relation(Relation::Association {
            activity: required_role(body, "prov:activity", section, prefixes)?,
            agent: required_role(body, "prov:agent", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            attributes,
        }),
        "alternateOf" => bundle.add_relation(Relation::Alternate {
            first: required_role(body, "prov:alternate1", section, prefixes)?,
            second: required_role(body, "prov:alternate2", section, prefixes)?,
            attributes,
        }),
        "wasInformedBy" => bundle.add_relation(Relation::Communication {
            informed: required_role(body, "prov:informed", section, prefixes)?,
            informant: required_role(body, "prov:informant", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            attributes,
        }),
        "wasStartedBy" => bundle.add_relation(Relation::Start {
            activity: required_role(body, "prov:activity", section, prefixes)?,
            trigger: role_name(body, "prov:trigger", prefixes)?,
            starter: role_name(body, "prov:starter", prefixes)?,
            time: role_time(body, "prov:time")?,
            attributes,
        }),
        "wasEndedBy" => bundle.add_relation(Relation::End {
            activity: required_role(body, "prov:activity", section, prefixes)?,
            trigger: role_name(body, "prov:trigger", prefixes)?,
            ender: role_name(body, "prov:ender", prefixes)?,
            time: role_time(body, "prov:time")?,
            attributes,
        }),
        "wasInvalidatedBy" => bundle.add_relation(Relation::Invalidation {
            entity: required_role(body, "prov:entity", section, prefixes)?,
            activity: required_role(body, "prov:activity", section, prefixes)?,
            time: role_time(body, "prov:time")?,
            attributes,
        }),
        "hadMember" => bundle.add_relation(Relation::Membership {
            collection: required_role(body, "prov:collection", section, prefixes)?,
            member: required_role(body, "prov:entity", section, prefixes)?,
            attributes,
        }),
        "actedOnBehalfOf" => bundle.add_relation(Relation::Delegation {
            delegate: required_role(body, "prov:delegate", section, prefixes)?,
            responsible: required_role(body, "prov:responsible", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            attributes,
        }),
        "wasInfluencedBy" => bundle.add_relation(Relation::Influence {
            influencee: required_role(body, "prov:influencee", section, prefixes)?,
            influencer: required_role(body, "prov:influencer", section, prefixes)?,
            id: relation_id(record_id, prefixes)?,
            attributes,
        }),
        _ => {
            return Err(CodecError::Malformed {
                detail: format!("unrecognized section [{section}]"),
            });
        }
    }
    Ok(())
}

// --- encoding ---

fn prefixes_to_json(prefixes: &BTreeMap<String, String>) -> Value {
    Value::Object(
        prefixes
            .iter()
            .map(|(prefix, uri)| (prefix.clone(), Value::String(uri.clone())))
            .collect(),
    )
}

fn encode_attr_value(value: &AttrValue) -> Value {
    match value {
        AttrValue::Qualified(name) => json!({
            "$": name.to_string(),
            "type": "prov:QUALIFIED_NAME",
        }),
        AttrValue::Str(raw) => Value::String(raw.clone()),
        AttrValue::Int(number) => json!(number),
        AttrValue::Time(time) => json!({
            "$": time.to_rfc3339(),
            "type": "xsd:dateTime",
        }),
    }
}

fn encode_attributes(attributes: &Attributes, body: &mut Map<String, Value>) {
    for key in attributes.keys() {
        let values = attributes.get(key);
        let encoded = if values.len() == 1 {
            encode_attr_value(&values[0])
        } else {
            Value::Array(values.iter().map(encode_attr_value).collect())
        };
        body.insert(key.to_string(), encoded);
    }
}

fn encode_element(element: &Element) -> Value {
    let mut body = Map::new();
    if let Some(start) = element.start_time() {
        body.insert("prov:startTime".to_owned(), json!(start.to_rfc3339()));
    }
    if let Some(end) = element.end_time() {
        body.insert("prov:endTime".to_owned(), json!(end.to_rfc3339()));
    }
    encode_attributes(element.attributes(), &mut body);
    Value::Object(body)
}

fn encode_bundle(bundle: &Bundle) -> Value {
    let mut body = Map::new();
    body.insert("prefix".to_owned(), prefixes_to_json(bundle.namespaces()));

    let mut sections: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();
    for element in bundle.elements() {
        let section = match element.kind() {
            ElementKind::Entity => "entity",
            ElementKind::Activity => "activity",
            ElementKind::Agent => "agent",
        };
        sections
            .entry(section)
            .or_default()
            .insert(element.id().to_string(), encode_element(element));
    }

    let mut blank_counter = 0usize;
    for relation in bundle.relations() {
        let (section, roles) = encode_relation_roles(relation);
        let mut record = Map::new();
        for (role, name) in roles {
            record.insert(role.to_owned(), Value::String(name));
        }
        encode_attributes(relation.attributes(), &mut record);
        let key = relation.id().map_or_else(
            || {
                blank_counter += 1;
                format!("_:r{blank_counter}")
            },
            ToString::to_string,
        );
        sections
            .entry(section)
            .or_default()
            .insert(key, Value::Object(record));
    }

    for (section, records) in sections {
        body.insert(section.to_owned(), Value::Object(records));
    }
    Value::Object(body)
}

fn encode_relation_roles(relation: &Relation) -> (&'static str, Vec<(&'static str, String)>) {
    match relation {
        Relation::Generation {
            entity, activity, ..
        } => (
            "wasGeneratedBy",
            vec![
                ("prov:entity", entity.to_string()),
                ("prov:activity", activity.to_string()),
            ],
        ),
        Relation::Usage {
            activity, entity, ..
        } => (
            "used",
            vec![
                ("prov:activity", activity.to_string()),
                ("prov:entity", entity.to_string()),
            ],
        ),
        Relation::Derivation {
            generated, used, ..
        } => (
            "wasDerivedFrom",
            vec![
                ("prov:generatedEntity", generated.to_string()),
                ("prov:usedEntity", used.to_string()),
            ],
        ),
        Relation::Specialization {
            specific, general, ..
        } => (
            "specializationOf",
            vec![
                ("prov:specificEntity", specific.to_string()),
                ("prov:generalEntity", general.to_string()),
            ],
        ),
        Relation::Attribution { entity, agent, .. } => (
            "wasAttributedTo",
            vec![
                ("prov:entity", entity.to_string()),
                ("prov:agent", agent.to_string()),
            ],
        ),
        Relation::Association {
            activity, agent, ..
        } => (
            "wasAssociatedWith",
            vec![
                ("prov:activity", activity.to_string()),
                ("prov:agent", agent.to_string()),
            ],
        ),
        Relation::Alternate { first, second, .. } => (
            "alternateOf",
            vec![
                ("prov:alternate1", first.to_string()),
                ("prov:alternate2", second.to_string()),
            ],
        ),
        Relation::Communication {
            informed,
            informant,
            ..
        } => (
            "wasInformedBy",
            vec![
                ("prov:informed", informed.to_string()),
                ("prov:informant", informant.to_string()),
            ],
        ),
        Relation::Start {
            activity, trigger, ..
        } => {
            let mut roles = vec![("prov:activity", activity.to_string())];
            if let Some(trigger) = trigger {
                roles.push(("prov:trigger", trigger.to_string()));
            }
            ("wasStartedBy", roles)
        }
        Relation::End {
            activity, trigger, ..
        } => {
            let mut roles = vec![("prov:activity", activity.to_string())];
            if let Some(trigger) = trigger {
                roles.push(("prov:trigger", trigger.to_string()));
            }
            ("wasEndedBy", roles)
        }
        Relation::Invalidation {
            entity, activity, ..
        } => (
            "wasInvalidatedBy",
            vec![
                ("prov:entity", entity.to_string()),
                ("prov:activity", activity.to_string()),
            ],
        ),
        Relation::Membership {
            collection, member, ..
        } => (
            "hadMember",
            vec![
                ("prov:collection", collection.to_string()),
                ("prov:entity", member.to_string()),
            ],
        ),
        Relation::Delegation {
            delegate,
            responsible,
            ..
        } => (
            "actedOnBehalfOf",
            vec![
                ("prov:delegate", delegate.to_string()),
                ("prov:responsible", responsible.to_string()),
            ],
        ),
        Relation::Influence {
            influencee,
            influencer,
            ..
        } => (
            "wasInfluencedBy",
            vec![
                ("prov:influencee", influencee.to_string()),
                ("prov:influencer", influencer.to_string()),
            ],
        ),
    }
}
