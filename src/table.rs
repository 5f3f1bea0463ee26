//! Preview table: column choice, header names and per-cell formatting.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};

pub type Record = Map<String, Value>;

pub const MAX_COLUMNS: usize = 12;
const PLACEHOLDER: &str = "—";
const LOCATION_LIMIT: usize = 40;
const TEXT_LIMIT: usize = 30;

const PRIORITY_FIELDS: &[&str] = &[
    "mac",
    "timestamp",
    "date",
    "time",
    "location",
    "latitude",
    "longitude",
    "alt",
    "airQualityLevel",
    "iaq",
    "calculatedAqi",
    "aqi",
    "aqi_level",
    "dustAqi",
    "dustAqiLevel",
    "trafficAqi",
    "trafficAqiLevel",
    "industrialAqi",
    "industrialAqiLevel",
    "t",
    "pm25",
    "pm10",
    "co",
    "no2",
    "so2",
    "o3",
    "battery",
    "data_source",
];

const COORDINATE_FIELDS: &[&str] = &["lat", "lng", "latitude", "longitude"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStyle {
    pub background: &'static str,
    pub foreground: &'static str,
}

impl LevelStyle {
    pub fn css(&self) -> String {
        format!(
            "background-color: {}; color: {};",
            self.background, self.foreground
        )
    }
}

const GOOD: LevelStyle = LevelStyle {
    background: "#e8f5e8",
    foreground: "#2e7d32",
};
const MODERATE: LevelStyle = LevelStyle {
    background: "#fff3e0",
    foreground: "#ef6c00",
};
const UNHEALTHY: LevelStyle = LevelStyle {
    background: "#ffebee",
    foreground: "#c62828",
};
const HAZARDOUS: LevelStyle = LevelStyle {
    background: "#4a0e4e",
    foreground: "white",
};
const VERY: LevelStyle = LevelStyle {
    background: "#ffcdd2",
    foreground: "#b71c1c",
};

const LEVEL_RULES: &[(&[&str], LevelStyle)] = &[
    (&["good", "excellent"], GOOD),
    (&["moderate", "fair"], MODERATE),
    (&["unhealthy", "poor"], UNHEALTHY),
    (&["hazardous", "dangerous"], HAZARDOUS),
    (&["very"], VERY),
];

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub tooltip: String,
    pub style: Option<LevelStyle>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreviewTable {
    pub columns: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<TableCell>>,
}

impl PreviewTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn build_table(records: &[Record]) -> PreviewTable {
    let Some(sample) = records.first() else {
        return PreviewTable::default();
    };
    let columns = select_columns(sample);
    let headers = columns.iter().map(|key| display_name(key)).collect();
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|key| {
                    let value = record.get(key);
                    TableCell {
                        text: format_cell(key, value),
                        tooltip: raw_text(value),
                        style: if is_level_key(key) {
                            level_style(value)
                        } else {
                            None
                        },
                    }
                })
                .collect()
        })
        .collect();
    PreviewTable {
        columns,
        headers,
        rows,
    }
}

/// Priority fields present in `sample` first, then the rest in record order,
/// capped at [`MAX_COLUMNS`].
pub fn select_columns(sample: &Record) -> Vec<String> {
    let mut selected: Vec<String> = PRIORITY_FIELDS
        .iter()
        .filter(|field| sample.contains_key(**field))
        .take(MAX_COLUMNS)
        .map(|field| field.to_string())
        .collect();
    for key in sample.keys() {
        if selected.len() >= MAX_COLUMNS {
            break;
        }
        if !selected.iter().any(|s| s == key) {
            selected.push(key.clone());
        }
    }
    selected
}

pub fn display_name(key: &str) -> String {
    let known = match key {
        "mac" => "Device MAC",
        "timestamp" => "Timestamp",
        "date" => "Date",
        "time" => "Time",
        "location" => "Location",
        "lat" | "latitude" => "Latitude",
        "lng" | "longitude" => "Longitude",
        "alt" => "Altitude",
        "iaq" => "IAQ Index",
        "aqi" => "AQI",
        "calculatedAqi" => "Calculated AQI",
        "dustAqi" => "Dust AQI",
        "dustAqiLevel" => "Dust Level",
        "trafficAqi" => "Traffic AQI",
        "trafficAqiLevel" => "Traffic Level",
        "industrialAqi" => "Industrial AQI",
        "industrialAqiLevel" => "Industrial Level",
        "airQualityLevel" => "Air Quality",
        "aqi_level" => "AQI Level",
        "t" => "Temperature (°C)",
        "pm25" => "PM2.5 (μg/m³)",
        "pm10" => "PM10 (μg/m³)",
        "co" => "CO (ppm)",
        "no2" => "NO₂ (ppb)",
        "so2" => "SO₂ (ppb)",
        "o3" => "O₃ (ppb)",
        "battery" => "Battery (%)",
        "data_source" => "Data Source",
        _ => return title_case(&key.replace('_', " ")),
    };
    known.to_string()
}

// Upper-cases the first character of every word, leaving the rest untouched.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_word = false;
    for c in text.chars() {
        let word = c.is_ascii_alphanumeric() || c == '_';
        if word && !prev_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_word = word;
    }
    out
}

pub fn format_cell(key: &str, value: Option<&Value>) -> String {
    let value = match value {
        None | Some(Value::Null) => return PLACEHOLDER.to_string(),
        Some(v) => v,
    };

    if key == "timestamp" && is_truthy(value) {
        return format_timestamp(value);
    }
    if COORDINATE_FIELDS.contains(&key) {
        if let Some(n) = numeric(value) {
            return format!("{n:.6}");
        }
    }
    // Any key containing "Aqi" counts, e.g. dustAqi or calculatedAqi.
    if key == "t" || key == "aqi" || key == "iaq" || key.contains("Aqi") {
        if let Some(n) = numeric(value) {
            return format!("{n:.1}");
        }
    }
    if key == "battery" && numeric(value).is_some() {
        return match value {
            Value::String(s) => format!("{}%", s.trim()),
            Value::Number(n) => format!("{}%", number_text(n)),
            other => format!("{other}%"),
        };
    }

    match value {
        Value::String(s) if key == "location" => truncate(s, LOCATION_LIMIT),
        Value::String(s) => truncate(s, TEXT_LIMIT),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::Null => PLACEHOLDER.to_string(),
    }
}

/// Whole-valued floats print without a fraction, so `12.0` reads `12`.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}

pub fn is_level_key(key: &str) -> bool {
    key.to_lowercase().contains("level") || key == "airQualityLevel" || key == "aqi_level"
}

/// Colour for a level cell, first keyword match wins.
pub fn level_style(value: Option<&Value>) -> Option<LevelStyle> {
    let value = value.filter(|v| is_truthy(v))?;
    let text = match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };
    LEVEL_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, style)| *style)
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let head: String = text.chars().take(limit).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn raw_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

const DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

fn format_timestamp(value: &Value) -> String {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => parse_timestamp(s.trim()).unwrap_or_else(|| s.clone()),
        other => other.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(naive.format(DISPLAY_FORMAT).to_string());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.format(DISPLAY_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn formats_sample_record() {
        let row = record(json!({
            "t": 23.456,
            "pm25": 12,
            "lat": 40.712776,
            "battery": 87,
            "location": "A".repeat(50),
        }));
        assert_eq!(format_cell("t", row.get("t")), "23.5");
        assert_eq!(format_cell("pm25", row.get("pm25")), "12");
        assert_eq!(format_cell("lat", row.get("lat")), "40.712776");
        assert_eq!(format_cell("battery", row.get("battery")), "87%");
        assert_eq!(
            format_cell("location", row.get("location")),
            format!("{}...", "A".repeat(40))
        );
    }

    #[test]
    fn whole_floats_print_without_fraction() {
        assert_eq!(format_cell("pm25", Some(&json!(12.0))), "12");
        assert_eq!(format_cell("battery", Some(&json!(87.0))), "87%");
        assert_eq!(format_cell("pm10", Some(&json!(-3.0))), "-3");
        assert_eq!(format_cell("pm10", Some(&json!(0.0))), "0");
        assert_eq!(format_cell("pm25", Some(&json!(12.5))), "12.5");
        assert_eq!(format_cell("battery", Some(&json!(87.5))), "87.5%");
    }

    #[test]
    fn aqi_heuristic_matches_on_key_substring() {
        assert_eq!(format_cell("dustAqi", Some(&json!(41))), "41.0");
        assert_eq!(format_cell("calculatedAqi", Some(&json!("57.26"))), "57.3");
        assert_eq!(format_cell("iaq", Some(&json!(101.04))), "101.0");
        // Non-numeric values fall through to the string rules.
        assert_eq!(format_cell("dustAqiLevel", Some(&json!("Good"))), "Good");
    }

    #[test]
    fn coordinates_use_six_decimals() {
        assert_eq!(format_cell("longitude", Some(&json!(-74))), "-74.000000");
        assert_eq!(format_cell("lng", Some(&json!("-73.9857"))), "-73.985700");
    }

    #[test]
    fn missing_and_null_render_placeholder() {
        assert_eq!(format_cell("pm10", None), "—");
        assert_eq!(format_cell("t", Some(&Value::Null)), "—");
    }

    #[test]
    fn long_strings_are_truncated() {
        let long = "x".repeat(35);
        assert_eq!(
            format_cell("data_source", Some(&json!(long))),
            format!("{}...", "x".repeat(30))
        );
        // Locations between 31 and 40 characters stay whole.
        let mid = "y".repeat(35);
        assert_eq!(format_cell("location", Some(&json!(mid.clone()))), mid);
    }

    #[test]
    fn structured_values_are_serialized() {
        assert_eq!(
            format_cell("sensors", Some(&json!({"a": 1, "b": [1, 2]}))),
            r#"{"a":1,"b":[1,2]}"#
        );
    }

    #[test]
    fn timestamps_render_in_display_format() {
        assert_eq!(
            format_cell("timestamp", Some(&json!("2024-01-15T14:05:09"))),
            "1/15/2024, 2:05:09 PM"
        );
        assert_eq!(
            format_cell("timestamp", Some(&json!("2024-01-15 00:30:00"))),
            "1/15/2024, 12:30:00 AM"
        );
        assert_eq!(format_cell("timestamp", Some(&json!("soon"))), "soon");
    }

    #[test]
    fn header_names_use_lookup_then_title_case() {
        assert_eq!(display_name("pm25"), "PM2.5 (μg/m³)");
        assert_eq!(display_name("lat"), "Latitude");
        assert_eq!(display_name("sensor_temp2"), "Sensor Temp2");
        assert_eq!(display_name("signal_strength_db"), "Signal Strength Db");
        assert_eq!(display_name("dataQuality"), "DataQuality");
    }

    #[test]
    fn priority_columns_come_first() {
        let sample = record(json!({
            "zeta": 1,
            "battery": 90,
            "timestamp": "2024-01-15T10:00:00",
            "alpha": 2,
            "mac": "aa:bb:cc:dd:ee:ff",
        }));
        assert_eq!(
            select_columns(&sample),
            vec!["mac", "timestamp", "battery", "zeta", "alpha"]
        );
    }

    #[test]
    fn columns_are_capped_at_twelve() {
        let mut sample = Record::new();
        for i in 0..20 {
            sample.insert(format!("extra_{i}"), json!(i));
        }
        sample.insert("pm25".into(), json!(3));
        let columns = select_columns(&sample);
        assert_eq!(columns.len(), MAX_COLUMNS);
        assert_eq!(columns[0], "pm25");
        assert_eq!(columns[1], "extra_0");
        assert_eq!(columns[11], "extra_10");
    }

    #[test]
    fn level_colours_follow_precedence() {
        assert_eq!(level_style(Some(&json!("Good"))), Some(GOOD));
        assert_eq!(level_style(Some(&json!("Fair"))), Some(MODERATE));
        assert_eq!(level_style(Some(&json!("Very Unhealthy"))), Some(UNHEALTHY));
        assert_eq!(level_style(Some(&json!("Dangerous"))), Some(HAZARDOUS));
        assert_eq!(level_style(Some(&json!("very high"))), Some(VERY));
        assert_eq!(level_style(Some(&json!("unknown"))), None);
        assert_eq!(level_style(Some(&json!(""))), None);
        assert_eq!(level_style(None), None);
    }

    #[test]
    fn level_keys_match_case_insensitively() {
        assert!(is_level_key("dustAqiLevel"));
        assert!(is_level_key("LEVEL"));
        assert!(is_level_key("aqi_level"));
        assert!(!is_level_key("aqi"));
    }

    #[test]
    fn table_keeps_raw_values_as_tooltips() {
        let rows = vec![
            record(json!({"t": 21.04, "airQualityLevel": "Moderate"})),
            record(json!({"t": null})),
        ];
        let table = build_table(&rows);
        assert_eq!(table.columns, vec!["airQualityLevel", "t"]);
        assert_eq!(table.headers, vec!["Air Quality", "Temperature (°C)"]);

        let first = &table.rows[0];
        assert_eq!(first[0].style, Some(MODERATE));
        assert_eq!(first[1].text, "21.0");
        assert_eq!(first[1].tooltip, "21.04");
        assert_eq!(first[1].style, None);

        let second = &table.rows[1];
        assert_eq!(second[0].text, "—");
        assert_eq!(second[0].tooltip, "");
        assert_eq!(second[0].style, None);
    }

    #[test]
    fn empty_dataset_builds_empty_table() {
        assert!(build_table(&[]).is_empty());
    }
}
