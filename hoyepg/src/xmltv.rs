use crate::guide::Schedule;
use crate::util::time::format_xmltv;

/// Render a schedule as an XMLTV document.
///
/// Channels come first in registry order, then programmes in the order they
/// were discovered. The document is well-formed for any schedule, including
/// one with no programmes at all.
pub fn serialize(schedule: &Schedule) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<tv>\n");

    for channel in schedule.channels() {
        let number = channel
            .number
            .as_ref()
            .map(|n| format!("<display-name>{}</display-name>", escape_text(n)))
            .unwrap_or_default();

        out.push_str(&format!(
            "  <channel id=\"{id}\"><display-name>{name}</display-name>{number}</channel>\n",
            id = escape_attr(&channel.id),
            name = escape_text(&channel.name),
            number = number,
        ));
    }

    for programme in schedule.programmes() {
        let desc = programme
            .description
            .as_ref()
            .map(|d| format!("<desc>{}</desc>", escape_text(d)))
            .unwrap_or_default();

        out.push_str(&format!(
            "  <programme start=\"{start}\" stop=\"{stop}\" channel=\"{id}\">\
             <title>{title}</title>{desc}</programme>\n",
            start = format_xmltv(&programme.start),
            stop = format_xmltv(&programme.stop),
            id = escape_attr(&programme.channel_id),
            title = escape_text(&programme.title),
            desc = desc,
        ));
    }

    out.push_str("</tv>\n");
    out
}

/// Escape free text for element content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
