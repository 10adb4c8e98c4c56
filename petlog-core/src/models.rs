//! Data models for pet records extracted from chat logs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Pet grade tier as shown in the search result header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    /// `[1등급]`
    #[serde(rename = "최상급")]
    Top,
    /// `[2등급]`
    #[serde(rename = "상급")]
    High,
    #[serde(rename = "일반")]
    Normal,
}

impl Grade {
    /// Label used in pets.json.
    pub fn label(&self) -> &'static str {
        match self {
            Grade::Top => "최상급",
            Grade::High => "상급",
            Grade::Normal => "일반",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Level-1 stats from the `초기 :` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub atk: u32,
    pub def: u32,
    pub agi: u32,
    pub hp: u32,
}

/// Per-level growth rates from the `성장 :` line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthStats {
    pub atk: f64,
    pub def: f64,
    pub agi: f64,
    pub hp: f64,
}

/// Elemental distribution (earth, water, fire, wind).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(rename = "지")]
    pub earth: u32,
    #[serde(rename = "수")]
    pub water: u32,
    #[serde(rename = "화")]
    pub fire: u32,
    #[serde(rename = "풍")]
    pub wind: u32,
}

impl Attributes {
    /// Set the value for an element character. Returns false for unknown elements.
    pub fn set(&mut self, element: char, value: u32) -> bool {
        match element {
            '지' => self.earth = value,
            '수' => self.water = value,
            '화' => self.fire = value,
            '풍' => self.wind = value,
            _ => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.earth == 0 && self.water == 0 && self.fire == 0 && self.wind == 0
    }
}

/// Everything collected about one pet. Unobserved fields stay `None`
/// and are left out of the JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s0: Option<BaseStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sg: Option<GrowthStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl PetRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grade: None,
            s0: None,
            sg: None,
            attr: None,
            route: None,
        }
    }
}

/// Name-keyed collection of records in first-seen order.
///
/// This is the extractor output and the patch handed to the merger.
#[derive(Debug, Clone, Default)]
pub struct PetIndex {
    records: Vec<PetRecord>,
    positions: HashMap<String, usize>,
}

impl PetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the record for `name`, creating an empty record on first sight.
    pub fn find_or_insert(&mut self, name: &str) -> usize {
        if let Some(&pos) = self.positions.get(name) {
            return pos;
        }
        let pos = self.records.len();
        self.records.push(PetRecord::new(name));
        self.positions.insert(name.to_string(), pos);
        pos
    }

    /// Record at a position previously returned by [`PetIndex::find_or_insert`].
    pub fn record_mut(&mut self, position: usize) -> &mut PetRecord {
        &mut self.records[position]
    }

    pub fn get(&self, name: &str) -> Option<&PetRecord> {
        self.positions.get(name).map(|&pos| &self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in the order their names first appeared.
    pub fn iter(&self) -> impl Iterator<Item = &PetRecord> {
        self.records.iter()
    }

    /// Records sorted ascending by name.
    pub fn into_sorted(self) -> Vec<PetRecord> {
        let mut records = self.records;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}
