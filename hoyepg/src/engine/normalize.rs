use serde_json::Value;

use crate::guide::programme::RawProgramme;

/// Keys the guide payload has been nested under in past page layouts.
const GUIDE_ALIASES: &[&str] = &["programGuide", "programGuideData", "guide"];

/// Flatten a guide document into `(channel name, programme item)` pairs.
///
/// The source has moved its schedule between several JSON shapes, so this
/// does not assume one. Rules are tried in order on every object; a rule that
/// matches but yields nothing lets the next one have a go:
///
/// 1. `days[].channels[].programme[]`
/// 2. `channels[].programme[]`
/// 3. one of [`GUIDE_ALIASES`] holding an object, searched recursively
/// 4. every value of the object (and every element of an array), searched
///    recursively, so unknown wrappers are tolerated
///
/// Pairs come out depth-first in document order. Items are not validated
/// here.
pub fn extract(doc: &Value) -> Vec<RawProgramme<'_>> {
    let mut found = Vec::new();
    walk(doc, &mut found);
    found
}

fn walk<'a>(node: &'a Value, found: &mut Vec<RawProgramme<'a>>) {
    match node {
        Value::Object(map) => {
            let before = found.len();

            if let Some(Value::Array(days)) = map.get("days") {
                for day in days {
                    if let Some(Value::Array(channels)) = day.get("channels") {
                        collect_channels(channels, found);
                    }
                }
            }
            if found.len() > before {
                return;
            }

            if let Some(Value::Array(channels)) = map.get("channels") {
                collect_channels(channels, found);
            }
            if found.len() > before {
                return;
            }

            for alias in GUIDE_ALIASES {
                if let Some(nested @ Value::Object(_)) = map.get(*alias) {
                    walk(nested, found);
                    if found.len() > before {
                        return;
                    }
                }
            }

            for value in map.values() {
                walk(value, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, found);
            }
        }
        _ => {}
    }
}

fn collect_channels<'a>(channels: &'a [Value], found: &mut Vec<RawProgramme<'a>>) {
    for channel in channels {
        let Some(Value::Array(programmes)) = channel.get("programme") else {
            continue;
        };
        let channel_name = channel.get("name").and_then(Value::as_str);

        found.extend(programmes.iter().map(|item| RawProgramme { channel_name, item }));
    }
}
