//! Pure domain model for tag and attribute rules.
//!
//! This module contains no serde and no I/O. Every invariant is enforced when
//! a value is constructed: attribute names are non-empty, regular expressions
//! are compiled up front, and group references are checked by [`RuleSet::new`].

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Tag name of the synthetic doctype rule.
pub const DOCTYPE_TAG: &str = "!DOCTYPE";

/// Parent sentinel meaning "directly under the document root".
pub const ROOT_PARENT: &str = "$ROOT";

/// Name of the attribute group that applies to every tag.
pub const GLOBAL_ATTRS: &str = "$GLOBAL_ATTRS";

// ────────────────────────────────────────────
// Identifiers and enums
// ────────────────────────────────────────────

/// Stable identifier of a [`TagRule`], assigned in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
pub struct RuleId(usize);

impl RuleId {
    /// Returns the declaration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Output dialect a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, serde::Deserialize)]
pub enum HtmlFormat {
    /// Regular AMP pages.
    #[default]
    #[serde(rename = "AMP")]
    Amp,
    /// AMP for ads.
    #[serde(rename = "AMP4ADS")]
    Amp4Ads,
    /// AMP for email.
    #[serde(rename = "AMP4EMAIL")]
    Amp4Email,
}

impl HtmlFormat {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amp => "AMP",
            Self::Amp4Ads => "AMP4ADS",
            Self::Amp4Email => "AMP4EMAIL",
        }
    }
}

impl fmt::Display for HtmlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HtmlFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AMP" => Ok(Self::Amp),
            "AMP4ADS" => Ok(Self::Amp4Ads),
            "AMP4EMAIL" => Ok(Self::Amp4Email),
            _ => Err(ModelError::UnknownFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// Where a tag must be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentConstraint {
    /// Parent element must have this name (compared case-insensitively).
    Tag(String),
    /// Parent must be the document root.
    DocumentRoot,
    /// Immediately after the doctype, which in a tree means under the root.
    Doctype,
}

impl ParentConstraint {
    /// Parses a parent reference, recognising the `$ROOT` and `!DOCTYPE` sentinels.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            ROOT_PARENT => Self::DocumentRoot,
            DOCTYPE_TAG => Self::Doctype,
            name => Self::Tag(name.to_string()),
        }
    }
}

// ────────────────────────────────────────────
// Value constraints
// ────────────────────────────────────────────

/// A compiled regular expression kept together with its source text.
#[derive(Debug, Clone)]
pub struct ValuePattern {
    raw: String,
    compiled: Regex,
}

impl ValuePattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is not a valid regular expression.
    pub fn new(pattern: &str, case_insensitive: bool) -> Result<Self, ModelError> {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| ModelError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests a value. Matching is unanchored.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.compiled.is_match(value)
    }

    /// Returns the source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// The single value constraint an attribute rule may carry.
#[derive(Debug, Clone, Default)]
pub enum ValueConstraint {
    /// Any value.
    #[default]
    None,
    /// Value must equal this literal.
    Exact(String),
    /// Value must equal this literal ignoring case.
    CaseInsensitive(String),
    /// Value must match this pattern.
    Pattern(ValuePattern),
    /// Value must match this pattern ignoring case.
    PatternCaseInsensitive(ValuePattern),
    /// Blacklist pattern, compiled case-insensitively.
    Blacklist(ValuePattern),
}

impl ValueConstraint {
    /// Returns the literal a missing attribute can be filled with.
    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        match self {
            Self::Exact(v) | Self::CaseInsensitive(v) => Some(v),
            _ => None,
        }
    }
}

/// Literal a property may be pinned to.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Compared as a string.
    Text(String),
    /// Compared numerically.
    Number(f64),
}

impl PropertyValue {
    /// Renders the literal the way it is written into an attribute.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(n) => n.to_string(),
        }
    }

    /// Tests whether a property value found in a document equals this literal.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn accepts(&self, found: &str) -> bool {
        match self {
            Self::Text(text) => text == found,
            Self::Number(n) => found.trim().parse::<f64>().is_ok_and(|v| v == *n),
        }
    }
}

/// One `key=value` entry of a structured attribute such as `content` on
/// `<meta name=viewport>`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRule {
    name: String,
    mandatory: bool,
    value: Option<PropertyValue>,
}

impl PropertyRule {
    /// Creates a property rule.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty.
    pub fn new(
        name: &str,
        mandatory: bool,
        value: Option<PropertyValue>,
    ) -> Result<Self, ModelError> {
        if name.trim().is_empty() {
            return Err(ModelError::EmptyPropertyName);
        }
        Ok(Self {
            name: name.to_string(),
            mandatory,
            value,
        })
    }

    /// Returns the property key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the property must be present.
    #[must_use]
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    /// Returns the pinned literal, if any.
    #[must_use]
    pub fn value(&self) -> Option<&PropertyValue> {
        self.value.as_ref()
    }
}

/// URL shape constraints for URL-valued attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPolicy {
    /// Schemes accepted for absolute URLs.
    pub allowed_protocols: Vec<String>,
    /// Whether relative URLs are accepted.
    pub allow_relative: bool,
    /// Whether an empty value is accepted.
    pub allow_empty: bool,
    /// Hostnames that are always rejected.
    pub disallowed_domains: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            allowed_protocols: Vec::new(),
            allow_relative: true,
            allow_empty: false,
            disallowed_domains: Vec::new(),
        }
    }
}

// ────────────────────────────────────────────
// Domain entities
// ────────────────────────────────────────────

/// Legality rule for one attribute.
#[derive(Debug, Clone)]
pub struct AttributeRule {
    name: String,
    alternative_names: Vec<String>,
    mandatory: bool,
    value: ValueConstraint,
    url: Option<UrlPolicy>,
    properties: Option<Vec<PropertyRule>>,
    deprecation: Option<String>,
}

impl AttributeRule {
    /// Creates an optional attribute rule accepting any value.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty.
    pub fn new(name: &str) -> Result<Self, ModelError> {
        if name.is_empty() {
            return Err(ModelError::EmptyAttributeName);
        }
        Ok(Self {
            name: name.to_string(),
            alternative_names: Vec::new(),
            mandatory: false,
            value: ValueConstraint::None,
            url: None,
            properties: None,
            deprecation: None,
        })
    }

    /// Sets the accepted aliases.
    #[must_use]
    pub fn with_alternative_names(mut self, names: Vec<String>) -> Self {
        self.alternative_names = names;
        self
    }

    /// Marks the attribute as mandatory.
    #[must_use]
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    /// Sets the value constraint.
    #[must_use]
    pub fn with_value(mut self, value: ValueConstraint) -> Self {
        self.value = value;
        self
    }

    /// Sets the URL policy.
    #[must_use]
    pub fn with_url(mut self, url: UrlPolicy) -> Self {
        self.url = Some(url);
        self
    }

    /// Sets the structured property list.
    #[must_use]
    pub fn with_properties(mut self, properties: Vec<PropertyRule>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Marks the attribute as deprecated.
    #[must_use]
    pub fn with_deprecation(mut self, note: impl Into<String>) -> Self {
        self.deprecation = Some(note.into());
        self
    }

    /// Returns the primary attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the aliases.
    #[must_use]
    pub fn alternative_names(&self) -> &[String] {
        &self.alternative_names
    }

    /// Returns whether the attribute (or an alias) must be present.
    #[must_use]
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    /// Returns the value constraint.
    #[must_use]
    pub fn value(&self) -> &ValueConstraint {
        &self.value
    }

    /// Returns the URL policy.
    #[must_use]
    pub fn url(&self) -> Option<&UrlPolicy> {
        self.url.as_ref()
    }

    /// Returns the property list.
    #[must_use]
    pub fn properties(&self) -> Option<&[PropertyRule]> {
        self.properties.as_deref()
    }

    /// Returns the deprecation note.
    #[must_use]
    pub fn deprecation(&self) -> Option<&str> {
        self.deprecation.as_deref()
    }

    /// Returns true if `name` is the primary name or an alias.
    #[must_use]
    pub fn accepts_name(&self, name: &str) -> bool {
        self.name == name || self.alternative_names.iter().any(|a| a == name)
    }
}

/// A named, reusable list of attribute rules.
#[derive(Debug, Clone)]
pub struct AttributeGroup {
    name: String,
    attrs: Vec<AttributeRule>,
}

impl AttributeGroup {
    /// Creates a group.
    #[must_use]
    pub fn new(name: String, attrs: Vec<AttributeRule>) -> Self {
        Self { name, attrs }
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attribute rules.
    #[must_use]
    pub fn attrs(&self) -> &[AttributeRule] {
        &self.attrs
    }
}

/// Legality and structure rule for one kind of tag.
#[derive(Debug, Clone)]
pub struct TagRule {
    id: RuleId,
    tag_name: String,
    spec_name: Option<String>,
    formats: Vec<HtmlFormat>,
    mandatory: bool,
    unique: bool,
    unique_warning: bool,
    mandatory_alternatives: Option<String>,
    mandatory_parent: Option<ParentConstraint>,
    disallowed_ancestors: Vec<String>,
    attr_lists: Vec<String>,
    attrs: Vec<AttributeRule>,
    requires: Vec<String>,
    satisfies: Vec<String>,
    deprecation: Option<String>,
    cdata: bool,
}

impl TagRule {
    /// Creates a rule for `tag_name` with every flag off.
    ///
    /// The id is assigned later by [`RuleSet::new`].
    ///
    /// # Errors
    ///
    /// Returns error if the tag name is empty.
    pub fn new(tag_name: &str) -> Result<Self, ModelError> {
        if tag_name.is_empty() {
            return Err(ModelError::EmptyTagName);
        }
        Ok(Self {
            id: RuleId(0),
            tag_name: tag_name.to_string(),
            spec_name: None,
            formats: Vec::new(),
            mandatory: false,
            unique: false,
            unique_warning: false,
            mandatory_alternatives: None,
            mandatory_parent: None,
            disallowed_ancestors: Vec::new(),
            attr_lists: Vec::new(),
            attrs: Vec::new(),
            requires: Vec::new(),
            satisfies: Vec::new(),
            deprecation: None,
            cdata: false,
        })
    }

    /// Sets the human-readable spec name.
    #[must_use]
    pub fn with_spec_name(mut self, spec_name: Option<String>) -> Self {
        self.spec_name = spec_name;
        self
    }

    /// Restricts the rule to these formats (empty means all).
    #[must_use]
    pub fn with_formats(mut self, formats: Vec<HtmlFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Sets the `mandatory`, `unique` and `unique_warning` flags.
    #[must_use]
    pub fn with_flags(mut self, mandatory: bool, unique: bool, unique_warning: bool) -> Self {
        self.mandatory = mandatory;
        self.unique = unique;
        self.unique_warning = unique_warning;
        self
    }

    /// Sets the mandatory-alternatives group id.
    #[must_use]
    pub fn with_mandatory_alternatives(mut self, group: Option<String>) -> Self {
        self.mandatory_alternatives = group;
        self
    }

    /// Sets the parent constraint.
    #[must_use]
    pub fn with_mandatory_parent(mut self, parent: Option<ParentConstraint>) -> Self {
        self.mandatory_parent = parent;
        self
    }

    /// Sets the disallowed ancestor names.
    #[must_use]
    pub fn with_disallowed_ancestors(mut self, names: Vec<String>) -> Self {
        self.disallowed_ancestors = names;
        self
    }

    /// Sets the referenced attribute groups.
    #[must_use]
    pub fn with_attr_lists(mut self, names: Vec<String>) -> Self {
        self.attr_lists = names;
        self
    }

    /// Sets the inline attribute rules.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Vec<AttributeRule>) -> Self {
        self.attrs = attrs;
        self
    }

    /// Sets the dependency ids this rule needs and provides.
    #[must_use]
    pub fn with_dependencies(mut self, requires: Vec<String>, satisfies: Vec<String>) -> Self {
        self.requires = requires;
        self.satisfies = satisfies;
        self
    }

    /// Marks the rule as deprecated.
    #[must_use]
    pub fn with_deprecation(mut self, note: Option<String>) -> Self {
        self.deprecation = note;
        self
    }

    /// Marks the tag as carrying literal text content.
    #[must_use]
    pub fn with_cdata(mut self, cdata: bool) -> Self {
        self.cdata = cdata;
        self
    }

    /// Returns the rule id.
    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Returns the tag name as declared.
    #[must_use]
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Returns the spec name.
    #[must_use]
    pub fn spec_name(&self) -> Option<&str> {
        self.spec_name.as_deref()
    }

    /// Returns the spec name, falling back to the tag name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.spec_name.as_deref().unwrap_or(&self.tag_name)
    }

    /// Returns the format filter.
    #[must_use]
    pub fn formats(&self) -> &[HtmlFormat] {
        &self.formats
    }

    /// Returns true if the rule applies to `format`.
    #[must_use]
    pub fn applies_to(&self, format: HtmlFormat) -> bool {
        self.formats.is_empty() || self.formats.contains(&format)
    }

    /// Returns the `mandatory` flag.
    #[must_use]
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    /// Returns the `unique` flag.
    #[must_use]
    pub fn unique(&self) -> bool {
        self.unique
    }

    /// Returns the `unique_warning` flag.
    #[must_use]
    pub fn unique_warning(&self) -> bool {
        self.unique_warning
    }

    /// Returns the mandatory-alternatives group.
    #[must_use]
    pub fn mandatory_alternatives(&self) -> Option<&str> {
        self.mandatory_alternatives.as_deref()
    }

    /// Returns true if the fitter must make sure a matching tag exists.
    ///
    /// That is the case for mandatory rules and for the representative of a
    /// mandatory-alternatives group (the rule whose spec name equals the group).
    #[must_use]
    pub fn requires_presence(&self) -> bool {
        self.mandatory
            || matches!(
                (&self.mandatory_alternatives, &self.spec_name),
                (Some(group), Some(spec)) if group == spec
            )
    }

    /// Returns the parent constraint.
    #[must_use]
    pub fn mandatory_parent(&self) -> Option<&ParentConstraint> {
        self.mandatory_parent.as_ref()
    }

    /// Returns the disallowed ancestor names.
    #[must_use]
    pub fn disallowed_ancestors(&self) -> &[String] {
        &self.disallowed_ancestors
    }

    /// Returns the referenced attribute group names.
    #[must_use]
    pub fn attr_lists(&self) -> &[String] {
        &self.attr_lists
    }

    /// Returns the inline attribute rules.
    #[must_use]
    pub fn attrs(&self) -> &[AttributeRule] {
        &self.attrs
    }

    /// Returns the dependency ids this rule needs.
    #[must_use]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Returns the dependency ids this rule provides.
    #[must_use]
    pub fn satisfies(&self) -> &[String] {
        &self.satisfies
    }

    /// Returns the deprecation note.
    #[must_use]
    pub fn deprecation(&self) -> Option<&str> {
        self.deprecation.as_deref()
    }

    /// Returns the literal-text marker.
    #[must_use]
    pub fn cdata(&self) -> bool {
        self.cdata
    }

    /// Returns true for the synthetic doctype rule.
    #[must_use]
    pub fn is_doctype(&self) -> bool {
        self.tag_name == DOCTYPE_TAG
    }

    /// Returns true if the rule names `tag` (ASCII case-insensitive).
    #[must_use]
    pub fn names_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }
}

// ────────────────────────────────────────────
// Aggregate root
// ────────────────────────────────────────────

/// Validated rule set.
///
/// Tag rules keep their declaration order and receive their [`RuleId`] here.
/// All attribute-group references are verified at construction time.
#[derive(Debug, Clone)]
pub struct RuleSet {
    groups: Vec<AttributeGroup>,
    tags: Vec<TagRule>,
}

impl RuleSet {
    /// Creates a rule set with full validation.
    ///
    /// # Errors
    ///
    /// Returns every duplicate group name and every reference to an
    /// undefined group.
    pub fn new(groups: Vec<AttributeGroup>, tags: Vec<TagRule>) -> Result<Self, Vec<ModelError>> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();
        for group in &groups {
            if !names.insert(group.name.as_str()) {
                errors.push(ModelError::DuplicateGroup {
                    name: group.name.clone(),
                });
            }
        }

        for tag in &tags {
            for reference in &tag.attr_lists {
                if !names.contains(reference.as_str()) {
                    errors.push(ModelError::UnknownGroup {
                        context: format!("tag '{}'", tag.display_name()),
                        name: reference.clone(),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let tags = tags
            .into_iter()
            .enumerate()
            .map(|(index, mut tag)| {
                tag.id = RuleId(index);
                tag
            })
            .collect();
        Ok(Self { groups, tags })
    }

    /// Returns the tag rules in declaration order.
    #[must_use]
    pub fn tags(&self) -> &[TagRule] {
        &self.tags
    }

    /// Returns the attribute groups.
    #[must_use]
    pub fn groups(&self) -> &[AttributeGroup] {
        &self.groups
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Returns the rule with the given id.
    #[must_use]
    pub fn tag(&self, id: RuleId) -> Option<&TagRule> {
        self.tags.get(id.0)
    }

    /// Returns the number of tag rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if there are no tag rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Errors from domain model validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Tag name is empty.
    #[error("tag name must not be empty")]
    EmptyTagName,

    /// Attribute name is empty.
    #[error("attribute name must not be empty")]
    EmptyAttributeName,

    /// Property name is empty.
    #[error("property name must not be empty")]
    EmptyPropertyName,

    /// A value pattern does not compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The invalid pattern.
        pattern: String,
        /// Why it's invalid.
        reason: String,
    },

    /// Unknown html format name.
    #[error("unknown html format `{value}`, expected: AMP, AMP4ADS, AMP4EMAIL")]
    UnknownFormat {
        /// The invalid value.
        value: String,
    },

    /// Two attribute groups share a name.
    #[error("attribute group `{name}` is defined more than once")]
    DuplicateGroup {
        /// The duplicated name.
        name: String,
    },

    /// A tag references an undefined attribute group.
    #[error("{context}: unknown attribute group `{name}`")]
    UnknownGroup {
        /// Where the reference was found.
        context: String,
        /// The undefined group name.
        name: String,
    },
}
