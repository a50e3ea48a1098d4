use chrono::NaiveDate;
use regex::Regex;

/// Parses portal numeric text with Italian separators.
/// Examples: "1.234,56", "0,25 kWh", "4350", "1.234"
pub fn parse_energy_value(text: &str) -> Result<f64, String> {
    if text.trim().is_empty() {
        return Err("empty value".to_string());
    }

    let cleaned = text
        .replace("kWh", "")
        .replace("KWH", "")
        .replace("kwh", "")
        .replace('\u{a0}', " ")
        .trim()
        .to_string();

    // Italian format: dot for thousands, comma for decimals (1.234,56 -> 1234.56)
    let normalized = if cleaned.contains('.') && cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains('.') && !cleaned.contains(',') {
        // A lone dot followed by exactly 3 digits is a thousands separator,
        // unless the integer part is 0 ("0.250" is a decimal).
        if let Some(dot_pos) = cleaned.rfind('.') {
            let after_dot = &cleaned[dot_pos + 1..];
            let before_dot = cleaned[..dot_pos].trim_start_matches('-');
            if after_dot.len() == 3
                && after_dot.chars().all(|c| c.is_ascii_digit())
                && before_dot != "0"
            {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        } else {
            cleaned
        }
    } else if cleaned.contains(',') && !cleaned.contains('.') {
        // Format: 0,25 -> 0.25
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    let re = Regex::new(r"(-?[0-9]+(?:\.[0-9]+)?)").map_err(|e| e.to_string())?;

    if let Some(captures) = re.captures(&normalized) {
        if let Some(matched) = captures.get(1) {
            return matched
                .as_str()
                .parse::<f64>()
                .map_err(|e| format!("number parse error: {}", e));
        }
    }

    Err(format!("could not parse value: '{}'", text))
}

/// Parses a request date in ISO `YYYY-MM-DD` or portal `dd/mm/yyyy` form.
pub fn parse_input_date(text: &str) -> Result<NaiveDate, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty date".to_string());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| format!("unrecognized date: '{}'", trimmed))
}

/// Normalizes a request date to the portal's `dd/mm/yyyy` input format.
/// Dates already in portal format pass through unchanged.
pub fn normalize_portal_date(text: &str) -> Result<String, String> {
    parse_input_date(text).map(|d| d.format("%d/%m/%Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_italian_format() {
        assert_eq!(parse_energy_value("1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_energy_value("0,25").unwrap(), 0.25);
        assert_eq!(parse_energy_value("0,25 kWh").unwrap(), 0.25);
        assert_eq!(parse_energy_value("300.000,50").unwrap(), 300000.50);
        assert_eq!(parse_energy_value("1.234").unwrap(), 1234.0);
    }

    #[test]
    fn test_parse_simple_format() {
        assert_eq!(parse_energy_value("4350").unwrap(), 4350.0);
        assert_eq!(parse_energy_value("4350.50").unwrap(), 4350.50);
        assert_eq!(parse_energy_value("0.250").unwrap(), 0.25);
        assert_eq!(parse_energy_value("-0,75").unwrap(), -0.75);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_energy_value("").is_err());
        assert!(parse_energy_value("abc").is_err());
    }

    #[test]
    fn test_normalize_portal_date() {
        assert_eq!(normalize_portal_date("2025-08-24").unwrap(), "24/08/2025");
        assert_eq!(normalize_portal_date("24/08/2025").unwrap(), "24/08/2025");
        assert!(normalize_portal_date("24-08-2025").is_err());
        assert!(normalize_portal_date("").is_err());
    }

    #[test]
    fn test_parse_input_date_range_order() {
        let from = parse_input_date("2025-08-01").unwrap();
        let to = parse_input_date("2025-08-24").unwrap();
        assert!(from <= to);
    }
}
