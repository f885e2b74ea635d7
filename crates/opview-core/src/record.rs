#![forbid(unsafe_code)]

//! Instruction records and dataset ingestion.
//!
//! Records are normalized once, when they are decoded: every searchable brief
//! key exists (possibly as `""`), description parts are strings, and the
//! performance table is an ordered list of microarchitecture groups. Nothing
//! downstream has to treat a missing field as an error.
//!
//! # Accepted layouts
//!
//! | Layout | Example |
//! |--------|---------|
//! | Bare record array | `[{"brief": {...}, ...}, ...]` |
//! | Wrapped | `{"metadata": {...}, "records": [...]}` |
//!
//! Tolerated irregularities: `table` given as `[]`, `variant` given as a list,
//! numeric latency/throughput cells, `notes` instead of `reference`, and
//! `null` anywhere a string is expected.

use std::collections::BTreeMap;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const CLASS_KEY: &str = "Instruction Class";
pub const FEATURE_KEY: &str = "Feature";
pub const OPCODE_KEY: &str = "Opcode";
pub const INTRINSICS_KEY: &str = "Intrinsics";
pub const ASSEMBLY_KEY: &str = "Assembly";

/// Brief keys consulted by the text query, in match order.
pub const SEARCHABLE_BRIEF_KEYS: [&str; 5] =
    [CLASS_KEY, FEATURE_KEY, OPCODE_KEY, INTRINSICS_KEY, ASSEMBLY_KEY];

/// Brief fields plus description brief and detailed text.
const SEARCH_FIELD_COUNT: usize = SEARCHABLE_BRIEF_KEYS.len() + 2;

// ---------------------------------------------------------------------------
// Brief
// ---------------------------------------------------------------------------

/// Ordered facet name -> value mapping.
///
/// Keeps the order of the source file because synopsis lines follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Brief {
    fields: Vec<(String, String)>,
}

impl Brief {
    /// Value of `key`, or `""` when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Iterate `(key, value)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert or overwrite `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    fn ensure(&mut self, key: &str) {
        if !self.contains_key(key) {
            self.fields.push((key.to_string(), String::new()));
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Brief {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut brief = Self::default();
        for (k, v) in iter {
            brief.set(k, v);
        }
        brief
    }
}

impl Serialize for Brief {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Description and performance table
// ---------------------------------------------------------------------------

/// Summary, long-form text, and pseudocode. Empty means "not rendered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Description {
    pub brief: String,
    pub detailed: String,
    pub operation: String,
}

impl Description {
    #[must_use]
    pub fn new(
        brief: impl Into<String>,
        detailed: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            brief: brief.into(),
            detailed: detailed.into(),
            operation: operation.into(),
        }
    }
}

/// One variant/form line of a microarchitecture's timing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantRow {
    pub variant: String,
    pub latency: String,
    pub throughput: String,
    pub pipes: String,
    /// Free-form notes; a lone `-` in the source is stored as `""`.
    pub reference: String,
    /// Page of the optimization guide the row was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl VariantRow {
    #[must_use]
    pub fn new(
        variant: impl Into<String>,
        latency: impl Into<String>,
        throughput: impl Into<String>,
        pipes: impl Into<String>,
    ) -> Self {
        Self {
            variant: variant.into(),
            latency: latency.into(),
            throughput: throughput.into(),
            pipes: pipes.into(),
            reference: String::new(),
            page: None,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = canonical_reference(reference.into());
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// Microarchitecture code -> variant rows, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfTable {
    groups: Vec<(String, Vec<VariantRow>)>,
}

impl PerfTable {
    /// Append a microarchitecture group.
    pub fn push(&mut self, arch: impl Into<String>, rows: Vec<VariantRow>) {
        self.groups.push((arch.into(), rows));
    }

    /// True when no microarchitecture has a single row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, rows)| rows.is_empty())
    }

    #[must_use]
    pub fn arch_count(&self) -> usize {
        self.groups.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[VariantRow])> {
        self.groups
            .iter()
            .map(|(arch, rows)| (arch.as_str(), rows.as_slice()))
    }
}

impl Serialize for PerfTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (arch, rows) in &self.groups {
            map.serialize_entry(arch, rows)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A single instruction entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct Record {
    brief: Brief,
    description: Description,
    table: PerfTable,
}

impl Record {
    /// Build a record, inserting any missing searchable brief key as `""`.
    #[must_use]
    pub fn new(mut brief: Brief, description: Description, table: PerfTable) -> Self {
        for key in SEARCHABLE_BRIEF_KEYS {
            brief.ensure(key);
        }
        Self {
            brief,
            description,
            table,
        }
    }

    /// Record with only brief fields set.
    #[must_use]
    pub fn from_brief<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs.into_iter().collect(),
            Description::default(),
            PerfTable::default(),
        )
    }

    #[must_use]
    pub fn with_description(mut self, description: Description) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: PerfTable) -> Self {
        self.table = table;
        self
    }

    #[must_use]
    pub fn brief(&self) -> &Brief {
        &self.brief
    }

    #[must_use]
    pub fn description(&self) -> &Description {
        &self.description
    }

    #[must_use]
    pub fn table(&self) -> &PerfTable {
        &self.table
    }

    /// Brief field by name, `""` when absent.
    #[must_use]
    pub fn field(&self, key: &str) -> &str {
        self.brief.get(key)
    }

    #[must_use]
    pub fn class(&self) -> &str {
        self.brief.get(CLASS_KEY)
    }

    #[must_use]
    pub fn feature(&self) -> &str {
        self.brief.get(FEATURE_KEY)
    }

    #[must_use]
    pub fn opcode(&self) -> &str {
        self.brief.get(OPCODE_KEY)
    }

    #[must_use]
    pub fn intrinsics(&self) -> &str {
        self.brief.get(INTRINSICS_KEY)
    }

    /// Minor version `N` of an `armv8.N` extension feature, `N >= 1`.
    ///
    /// Base `armv8.0` and non-versioned features return `None`.
    #[must_use]
    pub fn extension_level(&self) -> Option<u8> {
        let feature = self.feature();
        let prefix = feature.get(..6)?;
        if !prefix.eq_ignore_ascii_case("armv8.") {
            return None;
        }
        let rest = &feature[6..];
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .map_or(rest, |end| &rest[..end]);
        digits.parse::<u8>().ok().filter(|level| *level >= 1)
    }

    /// Color category of the collapsed row.
    #[must_use]
    pub fn category(&self) -> Category {
        if let Some(level) = self.extension_level()
            && level <= Category::MAX_EXTENSION
        {
            return Category::Extension(level);
        }
        match self.class() {
            "general" => Category::General,
            "advsimd" => Category::AdvSimd,
            "float" => Category::Float,
            "fpsimd" => Category::FpSimd,
            _ => Category::Other,
        }
    }
}

/// Row category, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// `armv8.1` through `armv8.6`.
    Extension(u8),
    General,
    AdvSimd,
    Float,
    FpSimd,
    Other,
}

impl Category {
    pub const MAX_EXTENSION: u8 = 6;
}

/// Wire form of a record before normalization.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    brief: Option<Map<String, Value>>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    table: Option<Value>,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        let brief = raw
            .brief
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, value_text(&v)))
            .collect();

        let description = raw.description.map_or_else(Description::default, |d| {
            let part = |key: &str| d.get(key).map(value_text).unwrap_or_default();
            Description::new(part("brief"), part("detailed"), part("operation"))
        });

        Record::new(brief, description, parse_table(raw.table))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn canonical_reference(reference: String) -> String {
    if reference.trim() == "-" {
        String::new()
    } else {
        reference
    }
}

fn page_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_table(value: Option<Value>) -> PerfTable {
    // The generator writes `[]` for instructions without timing data.
    let Some(Value::Object(archs)) = value else {
        return PerfTable::default();
    };
    let mut table = PerfTable::default();
    for (arch, rows) in archs {
        let rows = match rows {
            Value::Array(items) => items.iter().map(parse_row).collect(),
            _ => Vec::new(),
        };
        table.push(arch, rows);
    }
    table
}

fn parse_row(row: &Value) -> VariantRow {
    let cell = |key: &str| row.get(key).map(value_text).unwrap_or_default();
    let reference = row
        .get("reference")
        .or_else(|| row.get("notes"))
        .map(value_text)
        .unwrap_or_default();
    VariantRow {
        variant: cell("variant"),
        latency: cell("latency"),
        throughput: cell("throughput"),
        pipes: cell("pipes"),
        reference: canonical_reference(reference),
        page: row.get("page").and_then(page_number),
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Resource paths used to build citation links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Optimization-guide base path per microarchitecture code.
    #[serde(default)]
    pub table: BTreeMap<String, String>,
    /// Intrinsics reference base path.
    #[serde(default)]
    pub intrinsics: String,
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Lowercased searchable text of one record, computed at ingestion.
#[derive(Debug, Clone)]
pub(crate) struct SearchKeys([String; SEARCH_FIELD_COUNT]);

impl SearchKeys {
    fn of(record: &Record) -> Self {
        let d = record.description();
        Self([
            record.field(CLASS_KEY).to_lowercase(),
            record.field(FEATURE_KEY).to_lowercase(),
            record.field(OPCODE_KEY).to_lowercase(),
            record.field(INTRINSICS_KEY).to_lowercase(),
            record.field(ASSEMBLY_KEY).to_lowercase(),
            d.brief.to_lowercase(),
            d.detailed.to_lowercase(),
        ])
    }

    /// `needle` must already be lowercase.
    pub(crate) fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|field| field.contains(needle))
    }
}

/// The full, immutable record sequence plus its metadata.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    search_keys: Vec<SearchKeys>,
    metadata: Metadata,
}

impl Dataset {
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Self {
        let search_keys = records.iter().map(SearchKeys::of).collect();
        tracing::debug!(records = records.len(), "dataset ingested");
        Self {
            records,
            search_keys,
            metadata: Metadata::default(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Decode either layout described in the module docs.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Array(_) => {
                let records: Vec<Record> = serde_json::from_value(value)?;
                Ok(Self::from_records(records))
            }
            Value::Object(mut map) => {
                let records = map.remove("records").ok_or_else(|| {
                    LoadError::Shape("object has no `records` field".to_string())
                })?;
                let metadata = match map.remove("metadata") {
                    None | Some(Value::Null) => Metadata::default(),
                    Some(m) => serde_json::from_value(m)?,
                };
                let records: Vec<Record> = serde_json::from_value(records)?;
                Ok(Self::from_records(records).with_metadata(metadata))
            }
            other => Err(LoadError::Shape(format!(
                "expected an array or an object, found {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub(crate) fn search_keys(&self) -> &[SearchKeys] {
        &self.search_keys
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "brief": {
                "Instruction Class": "advsimd",
                "Feature": "armv8.2-fp16",
                "Opcode": "FADD",
                "Intrinsics": "float16x8_t vaddq_f16(float16x8_t a, float16x8_t b)",
                "Assembly": null
            },
            "description": {"brief": "Floating-point add", "detailed": null, "operation": ""},
            "table": {
                "a76": [
                    {"variant": ["ASIMD", "FP16"], "latency": 2, "throughput": "2", "pipes": "V", "notes": "-"}
                ],
                "n1": []
            }
        },
        {"brief": {"Opcode": "NOP"}, "table": []}
    ]"#;

    #[test]
    fn missing_brief_keys_read_as_empty() {
        let record = Record::from_brief([(OPCODE_KEY, "ADD")]);
        assert_eq!(record.opcode(), "ADD");
        assert_eq!(record.intrinsics(), "");
        for key in SEARCHABLE_BRIEF_KEYS {
            assert!(record.brief().contains_key(key), "{key} not normalized");
        }
    }

    #[test]
    fn decode_normalizes_irregular_fields() {
        let dataset = Dataset::from_json_str(SAMPLE).unwrap();
        assert_eq!(dataset.len(), 2);

        let fadd = dataset.get(0).unwrap();
        assert_eq!(fadd.field(ASSEMBLY_KEY), "");
        assert_eq!(fadd.description().detailed, "");

        let (arch, rows) = fadd.table().iter().next().unwrap();
        assert_eq!(arch, "a76");
        assert_eq!(rows[0].variant, "ASIMD, FP16");
        assert_eq!(rows[0].latency, "2");
        assert_eq!(rows[0].reference, "");

        let nop = dataset.get(1).unwrap();
        assert!(nop.table().is_empty());
        assert_eq!(nop.class(), "");
        assert_eq!(nop.description(), &Description::default());
    }

    #[test]
    fn brief_keeps_source_order() {
        let dataset = Dataset::from_json_str(SAMPLE).unwrap();
        let keys: Vec<&str> = dataset.get(0).unwrap().brief().iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![CLASS_KEY, FEATURE_KEY, OPCODE_KEY, INTRINSICS_KEY, ASSEMBLY_KEY]
        );
    }

    #[test]
    fn table_with_only_empty_groups_is_empty() {
        let mut table = PerfTable::default();
        table.push("a55", Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.arch_count(), 1);
        table.push("a72", vec![VariantRow::new("", "3", "1", "F0")]);
        assert!(!table.is_empty());
    }

    #[test]
    fn wrapped_layout_carries_metadata() {
        let json = r#"{
            "metadata": {"table": {"a78": "guides/a78.pdf"}, "intrinsics": "guides/neon.pdf"},
            "records": [{"brief": {"Opcode": "ADD"}, "table": {"a78": [{"variant": "", "page": "41"}]}}]
        }"#;
        let dataset = Dataset::from_json_str(json).unwrap();
        assert_eq!(dataset.metadata().intrinsics, "guides/neon.pdf");
        assert_eq!(
            dataset.metadata().table.get("a78").map(String::as_str),
            Some("guides/a78.pdf")
        );
        let (_, rows) = dataset.get(0).unwrap().table().iter().next().unwrap();
        assert_eq!(rows[0].page, Some(41));
    }

    #[test]
    fn wrong_shape_is_reported() {
        let err = Dataset::from_json_str("42").unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
        let err = Dataset::from_json_str(r#"{"metadata": {}}"#).unwrap_err();
        assert!(err.to_string().contains("records"));
        let err = Dataset::from_json_str("[{").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Dataset::from_path("/nonexistent/opview/db.json").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn extension_level_parses_minor_version() {
        let level = |feature: &str| Record::from_brief([(FEATURE_KEY, feature)]).extension_level();
        assert_eq!(level("armv8.2-fp16"), Some(2));
        assert_eq!(level("ARMv8.5"), Some(5));
        assert_eq!(level("armv8.0"), None);
        assert_eq!(level("crc"), None);
        assert_eq!(level(""), None);
    }

    #[test]
    fn category_prefers_extension_over_class() {
        let category = |class: &str, feature: &str| {
            Record::from_brief([(CLASS_KEY, class), (FEATURE_KEY, feature)]).category()
        };
        assert_eq!(category("general", "armv8.1-lse"), Category::Extension(1));
        assert_eq!(category("advsimd", ""), Category::AdvSimd);
        assert_eq!(category("fpsimd", "crc"), Category::FpSimd);
        assert_eq!(category("sve", ""), Category::Other);
        // Levels past armv8.6 have no color of their own.
        assert_eq!(category("general", "armv8.7-ls64"), Category::General);
    }

    #[test]
    fn search_keys_are_lowercase() {
        let record = Record::from_brief([(OPCODE_KEY, "FMLA")])
            .with_description(Description::new("Fused Multiply-Add", "", ""));
        let keys = SearchKeys::of(&record);
        assert!(keys.contains("fmla"));
        assert!(keys.contains("multiply-add"));
        assert!(!keys.contains("FMLA"));
    }
}
