//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to domain model types via the loader.

use serde::Deserialize;

/// Raw TOML representation of a rule source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSourceDto {
    /// Named attribute groups.
    #[serde(rename = "attr-lists", default)]
    pub attr_lists: Vec<AttrListDto>,

    /// Tag rules in declaration order.
    #[serde(default)]
    pub tags: Vec<TagDto>,
}

/// TOML representation of an attribute group.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttrListDto {
    /// Group name (e.g., "$GLOBAL_ATTRS").
    pub name: String,
    /// Attribute rules in the group.
    #[serde(default)]
    pub attrs: Vec<AttrDto>,
}

/// TOML representation of a tag rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TagDto {
    /// Tag name (e.g., "META", "!DOCTYPE").
    pub tag_name: String,
    /// Human-readable rule name (e.g., "meta charset=utf-8").
    #[serde(default)]
    pub spec_name: Option<String>,
    /// Formats the rule applies to; empty means all.
    #[serde(default)]
    pub html_format: Vec<String>,
    /// At least one matching tag must exist.
    #[serde(default)]
    pub mandatory: bool,
    /// At most one matching tag is allowed.
    #[serde(default)]
    pub unique: bool,
    /// More than one matching tag is only a warning.
    #[serde(default)]
    pub unique_warning: bool,
    /// Group id shared by interchangeable mandatory rules.
    #[serde(default)]
    pub mandatory_alternatives: Option<String>,
    /// Required parent tag name, `$ROOT` or `!DOCTYPE`.
    #[serde(default)]
    pub mandatory_parent: Option<String>,
    /// Ancestor tag names the tag must not appear under.
    #[serde(default)]
    pub disallowed_ancestor: Vec<String>,
    /// Referenced attribute group names.
    #[serde(default)]
    pub attr_lists: Vec<String>,
    /// Inline attribute rules.
    #[serde(default)]
    pub attrs: Vec<AttrDto>,
    /// Dependency ids another rule must satisfy.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Dependency ids this rule provides.
    #[serde(default)]
    pub satisfies: Vec<String>,
    /// Deprecation note.
    #[serde(default)]
    pub deprecation: Option<String>,
    /// Whether the tag holds literal text (style, script).
    #[serde(default)]
    pub cdata: bool,
}

/// TOML representation of an attribute rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AttrDto {
    /// Attribute name.
    pub name: String,
    /// Accepted aliases.
    #[serde(default)]
    pub alternative_names: Vec<String>,
    /// Whether the attribute must be present.
    #[serde(default)]
    pub mandatory: bool,
    /// Exact literal value.
    #[serde(default)]
    pub value: Option<String>,
    /// Case-insensitive literal value.
    #[serde(default)]
    pub value_casei: Option<String>,
    /// Pattern the value must match.
    #[serde(default)]
    pub value_regex: Option<String>,
    /// Case-insensitive pattern the value must match.
    #[serde(default)]
    pub value_regex_casei: Option<String>,
    /// Case-insensitive blacklist pattern.
    #[serde(default)]
    pub blacklisted_value_regex: Option<String>,
    /// URL policy.
    #[serde(default)]
    pub value_url: Option<UrlDto>,
    /// Structured `key=value` list constraints.
    #[serde(default)]
    pub value_properties: Option<Vec<PropertyDto>>,
    /// Deprecation note.
    #[serde(default)]
    pub deprecation: Option<String>,
}

/// TOML representation of a URL policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct UrlDto {
    /// Accepted schemes.
    #[serde(default)]
    pub allowed_protocol: Vec<String>,
    /// Whether relative URLs are accepted (default: true).
    #[serde(default = "default_true")]
    pub allow_relative: bool,
    /// Whether an empty value is accepted.
    #[serde(default)]
    pub allow_empty: bool,
    /// Rejected hostnames.
    #[serde(default)]
    pub disallowed_domain: Vec<String>,
}

/// TOML representation of a property rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PropertyDto {
    /// Property key.
    pub name: String,
    /// Whether the property must be present.
    #[serde(default)]
    pub mandatory: bool,
    /// Literal string value.
    #[serde(default)]
    pub value: Option<String>,
    /// Numeric literal value.
    #[serde(default)]
    pub value_double: Option<f64>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty() {
        let dto: RuleSourceDto = toml::from_str("").unwrap();
        assert!(dto.attr_lists.is_empty());
        assert!(dto.tags.is_empty());
    }

    #[test]
    fn deserialize_full_rule() {
        let toml_str = r#"
[[attr-lists]]
name = "$GLOBAL_ATTRS"
attrs = [{ name = "id" }, { name = "class" }]

[[tags]]
tag-name = "META"
spec-name = "meta name=viewport"
html-format = ["AMP"]
mandatory = true
unique = true
mandatory-parent = "HEAD"

[[tags.attrs]]
name = "name"
mandatory = true
value = "viewport"

[[tags.attrs]]
name = "content"
mandatory = true
value-properties = [
    { name = "width", mandatory = true, value = "device-width" },
    { name = "minimum-scale", value-double = 1.0 },
]
"#;
        let dto: RuleSourceDto = toml::from_str(toml_str).unwrap();
        assert_eq!(dto.attr_lists[0].attrs.len(), 2);
        let tag = &dto.tags[0];
        assert_eq!(tag.spec_name.as_deref(), Some("meta name=viewport"));
        assert_eq!(tag.mandatory_parent.as_deref(), Some("HEAD"));
        assert!(tag.mandatory && tag.unique && !tag.unique_warning);
        let props = tag.attrs[1].value_properties.as_ref().unwrap();
        assert_eq!(props[1].value_double, Some(1.0));
    }

    #[test]
    fn url_policy_defaults() {
        let dto: AttrDto = toml::from_str("name = \"href\"\nvalue-url = {}").unwrap();
        let url = dto.value_url.unwrap();
        assert!(url.allow_relative);
        assert!(!url.allow_empty);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result: Result<RuleSourceDto, _> = toml::from_str("[[tags]]\ntag-name = \"p\"\nmandatroy = true");
        assert!(result.is_err());
    }
}
