use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::country;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FightRecord {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl FightRecord {
    pub fn new(wins: u32, losses: u32, draws: u32) -> Self {
        Self {
            wins,
            losses,
            draws,
        }
    }
}

impl fmt::Display for FightRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.wins, self.losses, self.draws)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecordError(String);

impl fmt::Display for ParseRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a wins-losses-draws record: {:?}", self.0)
    }
}

impl std::error::Error for ParseRecordError {}

/// Accepts "12-3-1", "12-3" (no draws) and spaced variants like "12 - 3 - 1";
/// anything after the numbers ("45-10-1 (20 KO)") is ignored.
impl FromStr for FightRecord {
    type Err = ParseRecordError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || ParseRecordError(raw.to_string());
        let head = raw
            .trim()
            .split(|c: char| !(c.is_ascii_digit() || c == '-' || c.is_whitespace()))
            .next()
            .unwrap_or_default();
        let nums = head
            .split('-')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>().map_err(|_| err()))
            .collect::<Result<Vec<_>, _>>()?;
        match nums.as_slice() {
            [w, l] => Ok(Self::new(*w, *l, 0)),
            [w, l, d] => Ok(Self::new(*w, *l, *d)),
            _ => Err(err()),
        }
    }
}

/// Flag knowledge for a fighter. `Unflagged` is a real answer ("this country
/// has no flag in our table") and must not be confused with `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "code")]
pub enum Flag {
    #[default]
    Unknown,
    Unflagged,
    Code(String),
}

impl Flag {
    /// Validated, uppercased code; anything else is `Unflagged`.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if country::is_valid_code(code) {
            Flag::Code(code.to_ascii_uppercase())
        } else {
            Flag::Unflagged
        }
    }

    /// Flag for a country display name via the static table.
    pub fn from_country_name(name: &str) -> Self {
        match country::country_code(name) {
            Some(code) => Flag::Code(code.to_string()),
            None => Flag::Unflagged,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Flag::Unknown)
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Flag::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn emoji(&self) -> Option<String> {
        self.code().and_then(country::flag_emoji)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactField {
    Image,
    Record,
    Nationality,
    Flag,
    FullName,
}

impl FactField {
    pub const ALL: [FactField; 5] = [
        FactField::Image,
        FactField::Record,
        FactField::Nationality,
        FactField::Flag,
        FactField::FullName,
    ];

    /// Fields that count towards "found"; flag and full name are metadata.
    pub const SEMANTIC: [FactField; 3] =
        [FactField::Image, FactField::Record, FactField::Nationality];

    fn bit(self) -> u8 {
        match self {
            FactField::Image => 1,
            FactField::Record => 1 << 1,
            FactField::Nationality => 1 << 2,
            FactField::Flag => 1 << 3,
            FactField::FullName => 1 << 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSet(u8);

impl FieldSet {
    pub const EMPTY: FieldSet = FieldSet(0);

    pub fn of(fields: &[FactField]) -> Self {
        fields.iter().fold(Self::EMPTY, |set, f| set.with(*f))
    }

    pub fn all() -> Self {
        Self::of(&FactField::ALL)
    }

    pub fn with(self, field: FactField) -> Self {
        FieldSet(self.0 | field.bit())
    }

    pub fn without(self, field: FactField) -> Self {
        FieldSet(self.0 & !field.bit())
    }

    pub fn contains(self, field: FactField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn intersects(self, other: FieldSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: FieldSet) -> Self {
        FieldSet(self.0 | other.0)
    }

    pub fn intersection(self, other: FieldSet) -> Self {
        FieldSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = FactField> {
        FactField::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

/// Partial facts about one fighter. `None` means unknown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FighterFact {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub record: Option<FightRecord>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub flag: Flag,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl FighterFact {
    pub fn has(&self, field: FactField) -> bool {
        match field {
            FactField::Image => self.image_url.is_some(),
            FactField::Record => self.record.is_some(),
            FactField::Nationality => self.nationality.is_some(),
            FactField::Flag => self.flag.is_known(),
            FactField::FullName => self.full_name.is_some(),
        }
    }

    pub fn present(&self) -> FieldSet {
        FactField::ALL
            .into_iter()
            .filter(|f| self.has(*f))
            .fold(FieldSet::EMPTY, FieldSet::with)
    }

    pub fn missing(&self) -> FieldSet {
        FactField::ALL
            .into_iter()
            .filter(|f| !self.has(*f))
            .fold(FieldSet::EMPTY, FieldSet::with)
    }

    pub fn has_any_semantic(&self) -> bool {
        FactField::SEMANTIC.iter().any(|f| self.has(*f))
    }

    /// Copy fields from `other` that are absent here and listed in `allowed`.
    /// Never overwrites a present field. Returns the fields that were filled.
    pub fn fill_missing_from(&mut self, other: &FighterFact, allowed: FieldSet) -> FieldSet {
        let mut filled = FieldSet::EMPTY;
        for field in allowed.iter() {
            if self.has(field) || !other.has(field) {
                continue;
            }
            match field {
                FactField::Image => self.image_url = other.image_url.clone(),
                FactField::Record => self.record = other.record,
                FactField::Nationality => self.nationality = other.nationality.clone(),
                FactField::Flag => self.flag = other.flag.clone(),
                FactField::FullName => self.full_name = other.full_name.clone(),
            }
            filled = filled.with(field);
        }
        filled
    }

    /// Drop blank strings so they read as unknown.
    pub fn normalized(mut self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        self.image_url = clean(self.image_url);
        self.nationality = clean(self.nationality);
        self.full_name = clean(self.full_name);
        self
    }
}
