use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::guide::{ChannelRegistry, ProgrammeEntry};

/// Guide markup carries no end times, so every row gets this duration.
pub const ASSUMED_DURATION_MINUTES: i64 = 30;

const ROW_SELECTOR: &str = "table tr, [role=row]";
const CELL_SELECTOR: &str = "td, th, [role=cell], [role=gridcell]";

/// A guide row recovered from markup: a time of day and a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub time: NaiveTime,
    pub title: String,
    pub description: Option<String>,
}

fn clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2})\s*[:：.]\s*(\d{2})\s*(am|pm)?$").expect("clock pattern is valid")
    })
}

/// Parse a cell such as `07:30`, `7.30` or `1:05 PM` as a time of day.
fn parse_clock(text: &str) -> Option<NaiveTime> {
    let caps = clock_regex().captures(text.trim())?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;

    if let Some(meridiem) = caps.get(3) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collect time/title rows from guide-like tables in rendered HTML.
pub fn find_rows(html: &str) -> Vec<TableRow> {
    let (Ok(row_selector), Ok(cell_selector)) =
        (Selector::parse(ROW_SELECTOR), Selector::parse(CELL_SELECTOR))
    else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(cell_text)
            .filter(|text| !text.is_empty())
            .collect();

        let Some((time_idx, time)) = cells
            .iter()
            .enumerate()
            .find_map(|(i, text)| parse_clock(text).map(|t| (i, t)))
        else {
            continue;
        };

        let mut rest = cells[time_idx + 1..]
            .iter()
            .filter(|text| parse_clock(text).is_none());

        let Some(title) = rest.next() else {
            continue;
        };

        rows.push(TableRow {
            time,
            title: title.clone(),
            description: rest.next().cloned(),
        });
    }

    rows
}

/// Turn unlabeled rows into programme entries.
///
/// Rows are dealt to registry channels round-robin, anchored on `date` in
/// `offset`, and given a fixed duration. When a channel's next time of day
/// is earlier than its previous one the schedule is assumed to have crossed
/// midnight. The result is approximate by construction.
pub fn rows_to_entries(
    rows: &[TableRow],
    registry: &ChannelRegistry,
    date: NaiveDate,
    offset: FixedOffset,
) -> Vec<ProgrammeEntry> {
    let mut cursors: HashMap<&str, (NaiveDate, NaiveTime)> = HashMap::new();
    let mut entries = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let channel = registry.round_robin(index);

        let day = match cursors.get(channel.id.as_str()) {
            Some(&(day, previous)) if row.time < previous => day + Duration::days(1),
            Some(&(day, _)) => day,
            None => date,
        };
        cursors.insert(channel.id.as_str(), (day, row.time));

        let Some(start) = offset.from_local_datetime(&day.and_time(row.time)).single() else {
            continue;
        };

        entries.push(ProgrammeEntry {
            channel_id: channel.id.clone(),
            start,
            stop: start + Duration::minutes(ASSUMED_DURATION_MINUTES),
            title: row.title.clone(),
            description: row.description.clone(),
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guide::Channel;
    use crate::util::time::format_xmltv;

    fn registry() -> ChannelRegistry {
        ChannelRegistry::new(vec![
            Channel::new("HOY TV", "hoytv"),
            Channel::new("HOY INFO", "hoyinfor"),
        ])
        .unwrap()
    }

    fn hkt() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn row(h: u32, m: u32, title: &str) -> TableRow {
        TableRow {
            time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            title: title.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("07:30"), NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(parse_clock(" 7.05 "), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_clock("1:05 PM"), NaiveTime::from_hms_opt(13, 5, 0));
        assert_eq!(parse_clock("12:10am"), NaiveTime::from_hms_opt(0, 10, 0));
        assert_eq!(parse_clock("12:10 pm"), NaiveTime::from_hms_opt(12, 10, 0));
        assert_eq!(parse_clock("23：00"), NaiveTime::from_hms_opt(23, 0, 0));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("13:00 PM"), None);
        assert_eq!(parse_clock("News at 7:00"), None);
    }

    #[test]
    fn test_find_rows() {
        let html = r#"<html><body>
            <table>
              <tr><th>Time</th><th>Programme</th></tr>
              <tr><td>07:00</td><td>Morning   News</td><td>Live from the studio</td></tr>
              <tr><td></td><td>No time here</td></tr>
              <tr><td>07:30</td><td></td></tr>
              <tr><td>08:00</td><td><span>Cooking</span> <b>Show</b></td></tr>
            </table>
            <div role="row"><span role="cell">21:45</span><span role="cell">Late Movie</span></div>
        </body></html>"#;

        let rows = find_rows(html);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].title, "Morning News");
        assert_eq!(rows[0].description.as_deref(), Some("Live from the studio"));
        assert_eq!(rows[1].title, "Cooking Show");
        assert_eq!(rows[1].description, None);
        assert_eq!(rows[2].time, NaiveTime::from_hms_opt(21, 45, 0).unwrap());
    }

    #[test]
    fn test_no_tables() {
        assert!(find_rows("<html><body><p>Coming soon</p></body></html>").is_empty());
    }

    #[test]
    fn test_round_robin_and_fixed_duration() {
        let rows = [row(7, 0, "A"), row(7, 0, "B"), row(8, 0, "C")];
        let entries = rows_to_entries(&rows, &registry(), date(), hkt());

        let channels: Vec<_> = entries.iter().map(|e| e.channel_id.as_str()).collect();
        assert_eq!(channels, ["hoytv", "hoyinfor", "hoytv"]);

        assert_eq!(format_xmltv(&entries[0].start), "20250101070000 +0800");
        assert_eq!(format_xmltv(&entries[0].stop), "20250101073000 +0800");
        assert_eq!(format_xmltv(&entries[2].start), "20250101080000 +0800");
    }

    #[test]
    fn test_midnight_rollover_per_channel() {
        let rows = [row(23, 0, "Late"), row(6, 0, "Other"), row(0, 30, "After midnight")];
        let entries = rows_to_entries(&rows, &registry(), date(), hkt());

        // "Other" is the first row on its channel, so it stays on the anchor date.
        assert_eq!(format_xmltv(&entries[1].start), "20250101060000 +0800");
        assert_eq!(format_xmltv(&entries[2].start), "20250102003000 +0800");
    }
}
