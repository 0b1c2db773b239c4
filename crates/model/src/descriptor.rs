//! Per-element metadata: descriptors and tagged values.
//!
//! Both stores map a key to one or more language-tagged strings. The
//! overwhelmingly common case is a single value per key, so [`Values`]
//! keeps one value inline and only allocates a vector once a second value
//! arrives.

use crate::diagnostics::{codes, Diagnostic, DiagnosticSink};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ──────────────────────────────────────────────
// Language-tagged strings
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LangString {
    pub value: String,
    pub lang: Option<String>,
}

impl LangString {
    pub fn new(value: impl Into<String>) -> Self {
        LangString {
            value: value.into(),
            lang: None,
        }
    }

    pub fn with_lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        LangString {
            value: value.into(),
            lang: Some(lang.into()),
        }
    }
}

impl fmt::Display for LangString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lang {
            Some(lang) => write!(f, "{}@{}", self.value, lang),
            None => f.write_str(&self.value),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LangStringRepr {
    Plain(String),
    Tagged {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },
}

impl Serialize for LangString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.lang {
            None => LangStringRepr::Plain(self.value.clone()).serialize(serializer),
            Some(_) => LangStringRepr::Tagged {
                value: self.value.clone(),
                lang: self.lang.clone(),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for LangString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match LangStringRepr::deserialize(deserializer)? {
            LangStringRepr::Plain(value) => LangString { value, lang: None },
            LangStringRepr::Tagged { value, lang } => LangString { value, lang },
        })
    }
}

// ──────────────────────────────────────────────
// Value lists
// ──────────────────────────────────────────────

/// One or more values, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Values {
    One(LangString),
    Many(Vec<LangString>),
}

impl Values {
    pub fn iter(&self) -> std::slice::Iter<'_, LangString> {
        match self {
            Values::One(v) => std::slice::from_ref(v).iter(),
            Values::Many(vs) => vs.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::One(_) => 1,
            Values::Many(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, value: LangString) {
        match self {
            Values::One(existing) => {
                let first = std::mem::replace(existing, LangString::new(""));
                *self = Values::Many(vec![first, value]);
            }
            Values::Many(vs) => vs.push(value),
        }
    }

    fn from_vec(mut values: Vec<LangString>) -> Option<Values> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Values::One),
            _ => Some(Values::Many(values)),
        }
    }

    /// Values whose language matches `lang` exactly (`None` = untagged).
    fn matching(&self, lang: Option<&str>) -> Vec<&LangString> {
        self.iter().filter(|v| v.lang.as_deref() == lang).collect()
    }

    /// Drop every value in the language of `value`, then add `value`.
    fn replace_lang(&mut self, value: LangString) {
        let lang = value.lang.clone();
        let kept: Vec<LangString> = self
            .iter()
            .filter(|v| v.lang != lang)
            .cloned()
            .chain(std::iter::once(value))
            .collect();
        // `kept` holds at least `value`
        if let Some(v) = Values::from_vec(kept) {
            *self = v;
        }
    }
}

impl Serialize for Values {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Values {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<LangString>::deserialize(deserializer)?;
        Values::from_vec(raw).ok_or_else(|| serde::de::Error::custom("empty value list"))
    }
}

// ──────────────────────────────────────────────
// Descriptors
// ──────────────────────────────────────────────

/// The closed set of descriptor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Descriptor {
    Documentation,
    Alias,
    Definition,
    Description,
    Example,
    LegalBasis,
    DataCaptureStatement,
    Language,
    GlobalIdentifier,
    PrimaryCode,
}

impl Descriptor {
    pub const ALL: [Descriptor; 10] = [
        Descriptor::Documentation,
        Descriptor::Alias,
        Descriptor::Definition,
        Descriptor::Description,
        Descriptor::Example,
        Descriptor::LegalBasis,
        Descriptor::DataCaptureStatement,
        Descriptor::Language,
        Descriptor::GlobalIdentifier,
        Descriptor::PrimaryCode,
    ];

    /// At most one value per language.
    pub fn is_single_valued(self) -> bool {
        !matches!(
            self,
            Descriptor::Example | Descriptor::LegalBasis | Descriptor::DataCaptureStatement
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Descriptor::Documentation => "documentation",
            Descriptor::Alias => "alias",
            Descriptor::Definition => "definition",
            Descriptor::Description => "description",
            Descriptor::Example => "example",
            Descriptor::LegalBasis => "legalBasis",
            Descriptor::DataCaptureStatement => "dataCaptureStatement",
            Descriptor::Language => "language",
            Descriptor::GlobalIdentifier => "globalIdentifier",
            Descriptor::PrimaryCode => "primaryCode",
        }
    }

    pub fn from_name(name: &str) -> Option<Descriptor> {
        Descriptor::ALL.into_iter().find(|d| d.name() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptors {
    map: BTreeMap<Descriptor, Values>,
}

impl Descriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Value in `lang`, falling back to the untagged value, then to the
    /// first value of any language.
    pub fn get(&self, kind: Descriptor, lang: Option<&str>) -> Option<&str> {
        let values = self.map.get(&kind)?;
        let in_lang = lang.and_then(|l| values.matching(Some(l)).first().copied());
        in_lang
            .or_else(|| values.matching(None).first().copied())
            .or_else(|| values.iter().next())
            .map(|v| v.value.as_str())
    }

    /// Untagged (or first) value.
    pub fn first(&self, kind: Descriptor) -> Option<&str> {
        self.get(kind, None)
    }

    pub fn values(&self, kind: Descriptor) -> impl Iterator<Item = &LangString> {
        self.map.get(&kind).into_iter().flat_map(Values::iter)
    }

    /// Set a value. Single-valued kinds replace the value in the same
    /// language; multi-valued kinds append.
    pub fn set(&mut self, kind: Descriptor, value: LangString) {
        match self.map.get_mut(&kind) {
            None => {
                self.map.insert(kind, Values::One(value));
            }
            Some(values) if kind.is_single_valued() => values.replace_lang(value),
            Some(values) => values.push(value),
        }
    }

    pub fn set_text(&mut self, kind: Descriptor, value: impl Into<String>) {
        self.set(kind, LangString::new(value));
    }

    pub fn remove(&mut self, kind: Descriptor) -> Option<Values> {
        self.map.remove(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Descriptor, &Values)> {
        self.map.iter().map(|(k, v)| (*k, v))
    }

    /// Merge one descriptor kind of `left` and `right`.
    ///
    /// For single-valued kinds the texts of each language present on both
    /// sides are joined as `left + separator + right`; a language present
    /// on one side only is taken unchanged. Multi-valued kinds keep every
    /// value of `left` followed by the values of `right` not already there.
    pub fn merge(
        kind: Descriptor,
        left: &Descriptors,
        right: &Descriptors,
        separator: &str,
    ) -> Option<Values> {
        let l: Vec<&LangString> = left.values(kind).collect();
        let r: Vec<&LangString> = right.values(kind).collect();
        if l.is_empty() {
            return right.map.get(&kind).cloned();
        }
        if r.is_empty() {
            return left.map.get(&kind).cloned();
        }

        let mut out: Vec<LangString> = Vec::with_capacity(l.len() + r.len());
        if kind.is_single_valued() {
            for lv in &l {
                match r.iter().find(|rv| rv.lang == lv.lang) {
                    Some(rv) => out.push(LangString {
                        value: format!("{}{}{}", lv.value, separator, rv.value),
                        lang: lv.lang.clone(),
                    }),
                    None => out.push((*lv).clone()),
                }
            }
            for rv in &r {
                if !l.iter().any(|lv| lv.lang == rv.lang) {
                    out.push((*rv).clone());
                }
            }
        } else {
            out.extend(l.iter().map(|v| (*v).clone()));
            for rv in &r {
                if !out.contains(rv) {
                    out.push((*rv).clone());
                }
            }
        }
        Values::from_vec(out)
    }

    /// Merge every kind, asking `separator` for the joiner of each kind.
    pub fn merge_all(
        left: &Descriptors,
        right: &Descriptors,
        separator: impl Fn(Descriptor) -> String,
    ) -> Descriptors {
        let mut map = BTreeMap::new();
        for kind in Descriptor::ALL {
            if let Some(v) = Descriptors::merge(kind, left, right, &separator(kind)) {
                map.insert(kind, v);
            }
        }
        Descriptors { map }
    }
}

// ──────────────────────────────────────────────
// Tagged values
// ──────────────────────────────────────────────

/// Open-ended name → values map, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaggedValues {
    map: IndexMap<String, Values>,
}

impl TaggedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.map.contains_key(tag)
    }

    /// First value of `tag`, any language.
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.map
            .get(tag)
            .and_then(|v| v.iter().next())
            .map(|v| v.value.as_str())
    }

    pub fn all(&self, tag: &str) -> impl Iterator<Item = &LangString> {
        self.map.get(tag).into_iter().flat_map(Values::iter)
    }

    /// Lookup of a nominally single-valued tag.
    ///
    /// Returns the value in `lang` if there is one, else the untagged value.
    /// When several candidates exist in the chosen language the first one
    /// wins and [`codes::MULTIPLE_TAG_VALUES`] is emitted against `element`.
    pub fn get(
        &self,
        tag: &str,
        lang: Option<&str>,
        element: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<&str> {
        let values = self.map.get(tag)?;
        let mut candidates = lang.map(|l| values.matching(Some(l))).unwrap_or_default();
        if candidates.is_empty() {
            candidates = values.matching(None);
        }
        let value = *candidates.first()?;
        if candidates.len() > 1 {
            tracing::debug!(element, tag, count = candidates.len(), "multiple values for single-valued tag");
            sink.emit(Diagnostic::warning(
                codes::MULTIPLE_TAG_VALUES,
                vec![element.to_owned(), tag.to_owned()],
            ));
        }
        Some(value.value.as_str())
    }

    /// Replace all values of `tag`.
    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.map
            .insert(tag.into(), Values::One(LangString::new(value)));
    }

    /// Append a value to `tag`.
    pub fn add(&mut self, tag: impl Into<String>, value: LangString) {
        let tag = tag.into();
        match self.map.get_mut(&tag) {
            Some(values) => values.push(value),
            None => {
                self.map.insert(tag, Values::One(value));
            }
        }
    }

    pub fn remove(&mut self, tag: &str) -> Option<Values> {
        self.map.shift_remove(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Values)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}
