use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::utils::parse_energy_value;

/// One parsed load-curve row. `ts` is `YYYY-MM-DDTHH:MM:SS`, which sorts
/// lexicographically and feeds the readings table directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCurveRow {
    pub ts: String,
    #[serde(rename = "kWh")]
    pub value_kwh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

/// Counters for one parse pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseStats {
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_skipped: usize,
    pub delimiter: char,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnMap {
    datetime: Option<usize>,
    date: Option<usize>,
    time: Option<usize>,
    value: Option<usize>,
    quality: Option<usize>,
}

const DATE_WORDS: &[&str] = &["data", "date", "giorno"];
const TIME_WORDS: &[&str] = &["ora", "time"];
const VALUE_WORDS: &[&str] = &[
    "kwh", "energia", "energy", "valore", "value", "consumo", "prelev", "attiva",
];
const QUALITY_WORDS: &[&str] = &["quality", "qualit", "stato", "tipo"];

/// Parses a load-curve CSV download. Total: malformed input degrades to
/// dropped rows (counted), never an error.
pub fn parse_load_curve(bytes: &[u8]) -> (Vec<LoadCurveRow>, ParseStats) {
    let text = String::from_utf8_lossy(bytes);
    let delimiter = sniff_delimiter(&text);

    let mut stats = ParseStats {
        rows_read: 0,
        rows_used: 0,
        rows_skipped: 0,
        delimiter: delimiter as char,
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut map: Option<ColumnMap> = None;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                stats.rows_read += 1;
                stats.rows_skipped += 1;
                continue;
            }
        };

        let cells: Vec<&str> = record.iter().collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let m = match map {
            Some(m) => m,
            None => {
                if let Some(header_map) = map_from_header(&cells) {
                    map = Some(header_map);
                    continue;
                }
                // Headerless export: positional columns, first row is data.
                let positional = positional_map(cells.len());
                map = Some(positional);
                positional
            }
        };

        stats.rows_read += 1;
        match parse_row(&cells, &m) {
            Some(row) => {
                rows.push(row);
                stats.rows_used += 1;
            }
            None => stats.rows_skipped += 1,
        }
    }

    (rows, stats)
}

/// Counts separators over the first lines; `;` wins ties (decimal commas
/// inflate the comma count in semicolon files).
fn sniff_delimiter(text: &str) -> u8 {
    let mut semis = 0;
    let mut commas = 0;
    for line in text.lines().filter(|l| !l.trim().is_empty()).take(5) {
        semis += line.matches(';').count();
        commas += line.matches(',').count();
    }
    if semis >= commas && semis > 0 {
        b';'
    } else if commas > 0 {
        b','
    } else {
        b';'
    }
}

fn map_from_header(cells: &[&str]) -> Option<ColumnMap> {
    let mut map = ColumnMap::default();
    let mut hits = 0;

    for (idx, cell) in cells.iter().enumerate() {
        let lower = cell.to_lowercase();
        let has_date = DATE_WORDS.iter().any(|w| lower.contains(w));
        let has_time = TIME_WORDS.iter().any(|w| lower.contains(w));
        let has_value = VALUE_WORDS.iter().any(|w| lower.contains(w));
        let has_quality = QUALITY_WORDS.iter().any(|w| lower.contains(w));

        // "Valore" contains "ora"; classify value columns first.
        if has_value && map.value.is_none() {
            map.value = Some(idx);
            hits += 1;
        } else if has_quality && map.quality.is_none() {
            map.quality = Some(idx);
            hits += 1;
        } else if has_date && has_time && map.datetime.is_none() {
            map.datetime = Some(idx);
            hits += 1;
        } else if has_date && map.date.is_none() {
            map.date = Some(idx);
            hits += 1;
        } else if has_time && map.time.is_none() {
            map.time = Some(idx);
            hits += 1;
        }
    }

    if hits > 0 {
        Some(map)
    } else {
        None
    }
}

fn positional_map(arity: usize) -> ColumnMap {
    let mut map = ColumnMap::default();
    match arity {
        0 | 1 => {}
        2 => {
            map.datetime = Some(0);
            map.value = Some(1);
        }
        3 => {
            map.date = Some(0);
            map.time = Some(1);
            map.value = Some(2);
        }
        _ => {
            map.date = Some(0);
            map.time = Some(1);
            map.value = Some(2);
            map.quality = Some(3);
        }
    }
    map
}

fn cell<'a>(cells: &[&'a str], idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| cells.get(i)).map(|c| c.trim())
}

fn parse_row(cells: &[&str], map: &ColumnMap) -> Option<LoadCurveRow> {
    let ts = if let Some(text) = cell(cells, map.datetime) {
        parse_datetime(text)?
    } else {
        let date = parse_date_part(cell(cells, map.date)?)?;
        match cell(cells, map.time) {
            Some(text) if !text.is_empty() => date.and_time(parse_time_part(text)?),
            _ => date.and_time(NaiveTime::MIN),
        }
    };

    let value_kwh = parse_energy_value(cell(cells, map.value)?).ok()?;

    let quality = cell(cells, map.quality)
        .filter(|q| !q.is_empty())
        .map(|q| q.to_string());

    Some(LoadCurveRow {
        ts: ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
        value_kwh,
        quality,
    })
}

fn parse_date_part(text: &str) -> Option<NaiveDate> {
    for fmt in ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(date);
        }
    }
    None
}

fn parse_time_part(text: &str) -> Option<NaiveTime> {
    for fmt in ["%H:%M:%S", "%H:%M", "%H.%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(text, fmt) {
            return Some(time);
        }
    }
    None
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    for fmt in [
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ts);
        }
    }
    // Date-only cell in a combined column.
    parse_date_part(text).map(|d| d.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolon_with_header() {
        let csv = b"Data;Ora;kWh;Quality\n24/08/2025;00:15;0,25;A\n24/08/2025;00:30;1.234,56;E\n";
        let (rows, stats) = parse_load_curve(csv);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ts, "2025-08-24T00:15:00");
        assert_eq!(rows[0].value_kwh, 0.25);
        assert_eq!(rows[0].quality.as_deref(), Some("A"));
        assert_eq!(rows[1].value_kwh, 1234.56);
        assert_eq!(stats.rows_used, 2);
        assert_eq!(stats.rows_skipped, 0);
        assert_eq!(stats.delimiter, ';');
    }

    #[test]
    fn test_comma_delimiter_sniffed() {
        let csv = b"Date,Time,Energy\n2025-08-24,00:15,0.25\n";
        let (rows, stats) = parse_load_curve(csv);
        assert_eq!(stats.delimiter, ',');
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ts, "2025-08-24T00:15:00");
        assert!(rows[0].quality.is_none());
    }

    #[test]
    fn test_combined_datetime_column() {
        let csv = b"Data e ora;Valore (kWh)\n24/08/2025 00:15;0,50\n";
        let (rows, _) = parse_load_curve(csv);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ts, "2025-08-24T00:15:00");
        assert_eq!(rows[0].value_kwh, 0.50);
    }

    #[test]
    fn test_headerless_positional() {
        let csv = b"24/08/2025;00:15;0,25;A\n24/08/2025;00:30;0,50;A\n";
        let (rows, stats) = parse_load_curve(csv);
        assert_eq!(rows.len(), 2);
        assert_eq!(stats.rows_read, 2);
    }

    #[test]
    fn test_bad_rows_dropped_and_counted() {
        let csv = b"Data;Ora;kWh\n24/08/2025;00:15;0,25\nnot-a-date;00:30;0,50\n24/08/2025;00:45;\n";
        let (rows, stats) = parse_load_curve(csv);
        assert_eq!(rows.len(), 1);
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.rows_skipped, 2);
    }

    #[test]
    fn test_total_on_garbage() {
        let (rows, stats) = parse_load_curve(&[0xff, 0xfe, 0x00, 0x42]);
        assert!(rows.is_empty());
        assert_eq!(stats.rows_used, 0);

        let (rows, _) = parse_load_curve(b"");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let csv = b"Data;Ora;kWh;Quality\n24/08/2025;00:15;0,25;A\nrotten;row;;\n";
        let first = parse_load_curve(csv);
        let second = parse_load_curve(csv);
        assert_eq!(first.0, second.0);
        assert_eq!(first.1.rows_used, second.1.rows_used);
        assert_eq!(first.1.rows_skipped, second.1.rows_skipped);
    }

    #[test]
    fn test_date_only_rows_get_midnight() {
        let csv = b"Data;kWh\n24/08/2025;12,0\n";
        let (rows, _) = parse_load_curve(csv);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ts, "2025-08-24T00:00:00");
        assert_eq!(rows[0].value_kwh, 12.0);
    }
}
