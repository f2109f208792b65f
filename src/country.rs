use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Country display name -> ISO 3166-1 alpha-2, covering the usual combat
/// sports nations. Unlisted countries get no flag.
static COUNTRY_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("Netherlands", "NL"),
        ("Morocco", "MA"),
        ("Suriname", "SR"),
        ("Turkey", "TR"),
        ("Belgium", "BE"),
        ("France", "FR"),
        ("Germany", "DE"),
        ("Japan", "JP"),
        ("Brazil", "BR"),
        ("USA", "US"),
        ("UK", "GB"),
        ("Romania", "RO"),
        ("Ghana", "GH"),
        ("Cameroon", "CM"),
        ("New Zealand", "NZ"),
        ("Australia", "AU"),
        ("Russia", "RU"),
        ("China", "CN"),
        ("South Korea", "KR"),
        ("Thailand", "TH"),
        ("Italy", "IT"),
        ("Spain", "ES"),
        ("Poland", "PL"),
        ("Czech Republic", "CZ"),
        ("Croatia", "HR"),
        ("Serbia", "RS"),
        ("Georgia", "GE"),
        ("Armenia", "AM"),
        ("Iran", "IR"),
        ("Israel", "IL"),
        ("South Africa", "ZA"),
        ("Canada", "CA"),
        ("Mexico", "MX"),
        ("Colombia", "CO"),
        ("Argentina", "AR"),
        ("Cuba", "CU"),
        ("Portugal", "PT"),
        ("Sweden", "SE"),
        ("Denmark", "DK"),
        ("Norway", "NO"),
        ("Finland", "FI"),
        ("Ireland", "IE"),
        ("Switzerland", "CH"),
        ("Austria", "AT"),
        ("Ukraine", "UA"),
        ("Belarus", "BY"),
        ("Moldova", "MD"),
        ("Bulgaria", "BG"),
        ("Greece", "GR"),
        ("Albania", "AL"),
        ("Bosnia and Herzegovina", "BA"),
        ("North Macedonia", "MK"),
        ("Montenegro", "ME"),
        ("Kosovo", "XK"),
        ("Lithuania", "LT"),
        ("Latvia", "LV"),
        ("Estonia", "EE"),
        ("Hungary", "HU"),
        ("Slovakia", "SK"),
        ("Slovenia", "SI"),
    ]
    .into_iter()
    .collect()
});

static LONG_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("Kingdom of the Netherlands", "Netherlands"),
        ("United States of America", "USA"),
        ("United Kingdom of Great Britain and Northern Ireland", "UK"),
    ]
    .into_iter()
    .collect()
});

/// Shorten the formal labels knowledge bases use for a few countries.
pub fn simplify_country_name(label: &str) -> &str {
    let label = label.trim();
    LONG_NAMES.get(label).copied().unwrap_or(label)
}

pub fn country_code(name: &str) -> Option<&'static str> {
    COUNTRY_CODES.get(name.trim()).copied()
}

/// Two ASCII letters, case-insensitive.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Regional-indicator pair for a 2-letter code ("NL" -> "🇳🇱").
pub fn flag_emoji(code: &str) -> Option<String> {
    if !is_valid_code(code) {
        return None;
    }
    code.to_ascii_uppercase()
        .chars()
        .map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}
