//! Cell value parsing shared by the readers
//!
//! Every parser here is lenient: an unparseable optional value reads as
//! `None`. Readers decide which fields are required.

use chrono::NaiveDate;

/// Trimmed cell text, `None` when empty
pub fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn float(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub fn integer(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
}

/// Parse a recording or collecting date
///
/// Accepts `YYYYMMDD`, `YYYY-MM-DD` and `DD/MM/YYYY`. MCPD dates may mark
/// an unknown month or day with dashes (`1998----`, `199805--`); the first
/// month or day is substituted. Anything else is `None`.
pub fn date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw.map(str::trim).filter(|s| !s.is_empty())?;

    if s.len() == 8 && s.is_ascii() && !s.contains('/') {
        let year = &s[0..4];
        let month = match &s[4..6] {
            "--" => "01",
            m => m,
        };
        let day = match &s[6..8] {
            "--" => "01",
            d => d,
        };
        return NaiveDate::parse_from_str(&format!("{}{}{}", year, month, day), "%Y%m%d").ok();
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

/// Convert an MCPD degree-minute-second coordinate to decimal degrees
///
/// Latitudes are `DDMMSSH` (7 chars), longitudes `DDDMMSSH` (8 chars),
/// where `H` is the hemisphere. Unparseable minutes or seconds count as
/// zero; unparseable degrees make the whole value `None`. `S` and `W`
/// negate.
pub fn dms_coordinate(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if !s.is_ascii() {
        return None;
    }
    let degree_width = match s.len() {
        7 => 2,
        8 => 3,
        _ => return None,
    };

    let part = |from: usize, to: usize| s.get(from..to).and_then(|p| p.parse::<u32>().ok());

    let degrees = part(0, degree_width)?;
    let minutes = part(degree_width, degree_width + 2).unwrap_or(0);
    let seconds = part(degree_width + 2, degree_width + 4).unwrap_or(0);

    let value = f64::from(degrees) + f64::from(minutes) / 60.0 + f64::from(seconds) / 3600.0;

    if s.ends_with('S') || s.ends_with('W') {
        Some(-value)
    } else {
        Some(value)
    }
}

/// Decimal coordinate if present, else the DMS fallback
pub fn coordinate(decimal: Option<&str>, dms: Option<&str>) -> Option<f64> {
    float(decimal).or_else(|| text(dms).and_then(|d| dms_coordinate(&d)))
}

/// Split a `;`-separated list, dropping empty entries
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
