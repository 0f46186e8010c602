//! Timezone identifier resolution.
//!
//! iCalendar feeds name zones three ways: the UTC marker `Z`, an IANA name
//! (`Asia/Kolkata`), or a vendor name. Outlook and Exchange exports in
//! particular use Windows names such as `W. Europe Standard Time`. This
//! module maps all of them onto IANA names understood by `chrono-tz`.
//!
//! Resolution never fails. An identifier that cannot be mapped is handed back
//! unchanged and the timestamp normalizer decides how to recover.

use std::collections::BTreeMap;

use chrono_tz::Tz;

/// Canonical name for UTC produced by the resolver.
pub const UTC: &str = "utc";

/// Path prefixes some clients glue onto otherwise-IANA TZIDs.
const VENDOR_PREFIXES: &[&str] = &["/mozilla.org/", "/softwarestudio.org/"];

/// Windows (and Outlook-specific) zone names → IANA names.
static WINDOWS_ZONES: &[(&str, &str)] = &[
    // Outlook exports
    ("Romance Standard Time", "Europe/Paris"),
    ("Central European Standard Time", "Europe/Berlin"),
    ("Customized Time Zone", "Europe/Amsterdam"),
    // Europe
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("E. Europe Standard Time", "Europe/Bucharest"),
    ("GTB Standard Time", "Europe/Bucharest"),
    ("FLE Standard Time", "Europe/Kyiv"),
    ("Russian Standard Time", "Europe/Moscow"),
    ("GMT Standard Time", "Europe/London"),
    ("Greenwich Standard Time", "Europe/London"),
    // Americas
    ("Eastern Standard Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("US Mountain Standard Time", "America/Phoenix"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("Alaskan Standard Time", "America/Anchorage"),
    ("Hawaiian Standard Time", "Pacific/Honolulu"),
    ("Atlantic Standard Time", "America/Halifax"),
    ("Newfoundland Standard Time", "America/St_Johns"),
    ("Canada Central Standard Time", "America/Regina"),
    ("Central America Standard Time", "America/Guatemala"),
    ("Mexico Standard Time", "America/Mexico_City"),
    ("SA Pacific Standard Time", "America/Bogota"),
    ("SA Western Standard Time", "America/Caracas"),
    ("SA Eastern Standard Time", "America/Sao_Paulo"),
    ("Argentina Standard Time", "America/Argentina/Buenos_Aires"),
    ("Pacific SA Standard Time", "America/Santiago"),
    // Asia / Pacific
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("Korea Standard Time", "Asia/Seoul"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Taipei Standard Time", "Asia/Taipei"),
    ("India Standard Time", "Asia/Kolkata"),
    ("Pakistan Standard Time", "Asia/Karachi"),
    ("SE Asia Standard Time", "Asia/Bangkok"),
    ("Singapore Standard Time", "Asia/Singapore"),
    ("W. Australia Standard Time", "Australia/Perth"),
    ("Cen. Australia Standard Time", "Australia/Adelaide"),
    ("E. Australia Standard Time", "Australia/Brisbane"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("New Zealand Standard Time", "Pacific/Auckland"),
    // Middle East
    ("Arab Standard Time", "Asia/Riyadh"),
    ("Arabian Standard Time", "Asia/Dubai"),
    ("Iran Standard Time", "Asia/Tehran"),
    ("Israel Standard Time", "Asia/Jerusalem"),
    ("Turkey Standard Time", "Europe/Istanbul"),
    // Africa
    ("South Africa Standard Time", "Africa/Johannesburg"),
    ("Egypt Standard Time", "Africa/Cairo"),
    ("W. Central Africa Standard Time", "Africa/Lagos"),
    ("E. Africa Standard Time", "Africa/Nairobi"),
    ("Morocco Standard Time", "Africa/Casablanca"),
];

/// Look up a Windows zone name in the built-in table.
pub fn windows_to_iana(name: &str) -> Option<&'static str> {
    WINDOWS_ZONES
        .iter()
        .find(|(windows, _)| *windows == name)
        .map(|(_, iana)| *iana)
}

/// Parse a resolved zone name into a `chrono-tz` zone. Accepts the
/// resolver's lowercase [`UTC`] marker.
pub fn parse_zone(name: &str) -> Option<Tz> {
    if name == UTC {
        return Some(Tz::UTC);
    }
    name.parse::<Tz>().ok()
}

/// Whether `name` is a currently valid IANA zone (or the UTC marker).
pub fn is_valid_zone(name: &str) -> bool {
    parse_zone(name).is_some()
}

/// Normalize a raw zone token with the built-in table only.
///
/// # Examples
///
/// ```
/// use ics_ingest::normalize_timezone;
///
/// assert_eq!(normalize_timezone(Some("Z")), "utc");
/// assert_eq!(normalize_timezone(None), "utc");
/// assert_eq!(normalize_timezone(Some("W. Europe Standard Time")), "Europe/Berlin");
/// assert_eq!(normalize_timezone(Some("Mars/Olympus_Mons")), "Mars/Olympus_Mons");
/// ```
pub fn normalize_timezone(raw: Option<&str>) -> String {
    TimezoneResolver::default().normalize(raw)
}

/// Resolves raw zone tokens, optionally with user-supplied aliases that take
/// precedence over the built-in Windows table.
#[derive(Debug, Clone, Default)]
pub struct TimezoneResolver {
    aliases: BTreeMap<String, String>,
}

impl TimezoneResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aliases(aliases: BTreeMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Normalize a raw zone token to an IANA name.
    ///
    /// Order: blank → `utc`; `Z`/`utc` → `utc`; valid IANA → unchanged;
    /// vendor prefix stripped → IANA; alias; Windows table; otherwise the raw
    /// token unchanged.
    pub fn normalize(&self, raw: Option<&str>) -> String {
        let Some(zone) = raw else {
            return UTC.to_string();
        };
        if zone.trim().is_empty() {
            return UTC.to_string();
        }
        if zone == "Z" || zone.eq_ignore_ascii_case(UTC) {
            return UTC.to_string();
        }
        if zone.parse::<Tz>().is_ok() {
            return zone.to_string();
        }

        let stripped = strip_vendor_prefix(zone);
        if stripped != zone && stripped.parse::<Tz>().is_ok() {
            return stripped.to_string();
        }

        if let Some(alias) = self.aliases.get(zone).or_else(|| self.aliases.get(stripped)) {
            return alias.clone();
        }
        if let Some(iana) = windows_to_iana(zone).or_else(|| windows_to_iana(stripped)) {
            return iana.to_string();
        }

        zone.to_string()
    }
}

fn strip_vendor_prefix(zone: &str) -> &str {
    let Some(rest) = VENDOR_PREFIXES
        .iter()
        .find_map(|prefix| zone.strip_prefix(prefix))
    else {
        return zone;
    };
    // Older Mozilla exports insert a version segment, e.g. `20070129_1/`.
    match rest.split_once('/') {
        Some((version, tail)) if version.starts_with(|c: char| c.is_ascii_digit()) => tail,
        _ => rest,
    }
}
