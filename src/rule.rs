//! Monitor rules: one per output, plus their one-line text form
//!
//! A rule line looks like
//! `monitorrule=name:eDP-1,width:1920,height:1080,refresh:60,x:0,y:0,scale:1.00,vrr:0,rr:0`.
//! The older positional form
//! `monitorrule=eDP-1,0.55,1,tile,0,1.00,0,0,1920,1080,60` is still read,
//! but only the keyed form is ever written.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::config::{FIELD_SEPARATOR, KEY_VALUE_SEPARATOR, POSITIONAL_FIELD_COUNT, RULE_MARKER};
use crate::constants::seed;
use crate::error::RuleParseError;

/// Discrete rotation/flip applied by the compositor (`rr` key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

impl Transform {
    /// All transforms in index order
    pub const ALL: [Transform; 8] = [
        Transform::Normal,
        Transform::Rotate90,
        Transform::Rotate180,
        Transform::Rotate270,
        Transform::Flipped,
        Transform::Flipped90,
        Transform::Flipped180,
        Transform::Flipped270,
    ];

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Human label shown in the transform picker
    pub fn label(self) -> &'static str {
        match self {
            Transform::Normal => "Normal (0)",
            Transform::Rotate90 => "90° (1)",
            Transform::Rotate180 => "180° (2)",
            Transform::Rotate270 => "270° (3)",
            Transform::Flipped => "Flipped (4)",
            Transform::Flipped90 => "Flipped 90° (5)",
            Transform::Flipped180 => "Flipped 180° (6)",
            Transform::Flipped270 => "Flipped 270° (7)",
        }
    }
}

/// World-space rectangle (pixels, may be negative)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl WorldRect {
    pub fn left(&self) -> i64 {
        self.x
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn top(&self) -> i64 {
        self.y
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }
}

/// Placement and display attributes for one output
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRule {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: f64,
    pub scale: f64,
    pub transform: Transform,
    pub vrr: bool,
}

impl MonitorRule {
    /// Zero-valued rule; missing keys on parse keep these values
    fn empty(id: String) -> Self {
        Self {
            id,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            refresh_rate: 0.0,
            scale: 0.0,
            transform: Transform::Normal,
            vrr: false,
        }
    }

    /// Rule given to an output that the config file does not mention yet
    pub fn seeded(id: impl Into<String>) -> Self {
        Self {
            width: seed::WIDTH,
            height: seed::HEIGHT,
            refresh_rate: seed::REFRESH,
            scale: seed::SCALE,
            ..Self::empty(id.into())
        }
    }

    pub fn rect(&self) -> WorldRect {
        WorldRect {
            x: i64::from(self.x),
            y: i64::from(self.y),
            width: i64::from(self.width),
            height: i64::from(self.height),
        }
    }

    /// Copy geometry from `target`; there is no lasting link between the two
    pub fn mirror(&mut self, target: &MonitorRule) {
        self.x = target.x;
        self.y = target.y;
        self.width = target.width;
        self.height = target.height;
    }

    /// Parse the text after the marker (either form)
    pub fn parse_body(body: &str) -> Result<Self, RuleParseError> {
        let first = body.split(FIELD_SEPARATOR).next().unwrap_or("").trim();
        if !first.is_empty() && !first.contains(KEY_VALUE_SEPARATOR) {
            return Self::parse_positional(body);
        }
        Self::parse_keyed(body)
    }

    fn parse_keyed(body: &str) -> Result<Self, RuleParseError> {
        let mut rule = Self::empty(String::new());

        for part in body.split(FIELD_SEPARATOR) {
            let Some((key, value)) = part.trim().split_once(KEY_VALUE_SEPARATOR) else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "name" => rule.id = value.to_string(),
                "width" => rule.width = parse_value("width", value)?,
                "height" => rule.height = parse_value("height", value)?,
                "refresh" => rule.refresh_rate = parse_real("refresh", value)?,
                "x" => rule.x = parse_value("x", value)?,
                "y" => rule.y = parse_value("y", value)?,
                "scale" => rule.scale = parse_real("scale", value)?,
                "vrr" => rule.vrr = parse_vrr(value)?,
                "rr" => rule.transform = parse_transform(value)?,
                _ => {}
            }
        }

        if rule.id.is_empty() {
            return Err(RuleParseError::MissingName);
        }
        Ok(rule)
    }

    /// `name,mfact,nmaster,layout,rr,scale,x,y,width,height,refresh`
    fn parse_positional(body: &str) -> Result<Self, RuleParseError> {
        let fields: Vec<&str> = body.split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() < POSITIONAL_FIELD_COUNT {
            return Err(RuleParseError::TooFewFields {
                found: fields.len(),
                expected: POSITIONAL_FIELD_COUNT,
            });
        }

        // mfact, nmaster and layout are tiling settings the editor does not manage
        Ok(Self {
            id: fields[0].to_string(),
            transform: parse_transform(fields[4])?,
            scale: parse_real("scale", fields[5])?,
            x: parse_value("x", fields[6])?,
            y: parse_value("y", fields[7])?,
            width: parse_value("width", fields[8])?,
            height: parse_value("height", fields[9])?,
            refresh_rate: parse_real("refresh", fields[10])?,
            vrr: false,
        })
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, RuleParseError> {
    value.parse().map_err(|_| RuleParseError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_real(key: &'static str, value: &str) -> Result<f64, RuleParseError> {
    let parsed: f64 = parse_value(key, value)?;
    if !parsed.is_finite() {
        return Err(RuleParseError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

fn parse_transform(value: &str) -> Result<Transform, RuleParseError> {
    let index: i64 = parse_value("rr", value)?;
    Transform::from_index(index).ok_or(RuleParseError::TransformOutOfRange(index))
}

fn parse_vrr(value: &str) -> Result<bool, RuleParseError> {
    match parse_value::<i64>("vrr", value)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RuleParseError::VrrOutOfRange(other)),
    }
}

impl fmt::Display for MonitorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{RULE_MARKER}name:{},width:{},height:{},refresh:{:.0},x:{},y:{},scale:{:.2},vrr:{},rr:{}",
            self.id,
            self.width,
            self.height,
            self.refresh_rate,
            self.x,
            self.y,
            self.scale,
            u8::from(self.vrr),
            self.transform.index(),
        )
    }
}

impl FromStr for MonitorRule {
    type Err = RuleParseError;

    /// Parse a whole config line, marker included
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let body = rule_body(line).ok_or(RuleParseError::MissingMarker)?;
        Self::parse_body(body)
    }
}

/// Text after the marker when `line` is a rule line
pub fn rule_body(line: &str) -> Option<&str> {
    line.trim().strip_prefix(RULE_MARKER)
}

/// Id of a rule line without fully parsing it
///
/// Keyed lines answer with their `name:` field, positional lines with the
/// first field.
pub fn rule_line_id(body: &str) -> Option<&str> {
    let mut fields = body.split(FIELD_SEPARATOR).map(str::trim);
    let first = fields.next()?;
    if !first.is_empty() && !first.contains(KEY_VALUE_SEPARATOR) {
        return Some(first);
    }

    std::iter::once(first)
        .chain(fields)
        .filter_map(|field| field.split_once(KEY_VALUE_SEPARATOR))
        .find(|(key, _)| key.trim() == "name")
        .map(|(_, value)| value.trim())
        .filter(|id| !id.is_empty())
}

/// Rules keyed by id, remembering the order ids were first inserted
#[derive(Debug, Clone, Default)]
pub struct RuleMap {
    rules: HashMap<String, MonitorRule>,
    order: Vec<String>,
}

impl RuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced rule keeps its original position
    pub fn insert(&mut self, rule: MonitorRule) -> Option<MonitorRule> {
        let id = rule.id.clone();
        let previous = self.rules.insert(id.clone(), rule);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<&MonitorRule> {
        self.rules.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// Apply `edit` to the rule for `id`; the id itself cannot change
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut MonitorRule)) -> bool {
        match self.rules.get_mut(id) {
            Some(rule) => {
                edit(rule);
                rule.id = id.to_string();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MonitorRule> {
        self.order.iter().filter_map(|id| self.rules.get(id))
    }

    /// Ids in ascending order
    pub fn sorted_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Cloned rules in insertion order, ready for saving
    pub fn to_vec(&self) -> Vec<MonitorRule> {
        self.iter().cloned().collect()
    }
}

impl FromIterator<MonitorRule> for RuleMap {
    fn from_iter<I: IntoIterator<Item = MonitorRule>>(iter: I) -> Self {
        let mut map = RuleMap::new();
        for rule in iter {
            map.insert(rule);
        }
        map
    }
}
