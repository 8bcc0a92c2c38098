//! DTO → Domain model conversion with validation.

use super::config_dto::{AttrDto, AttrListDto, PropertyDto, RuleSourceDto, TagDto, UrlDto};
use super::model::{
    AttributeGroup, AttributeRule, HtmlFormat, ModelError, ParentConstraint, PropertyRule,
    PropertyValue, RuleSet, TagRule, UrlPolicy, ValueConstraint, ValuePattern,
};

/// Errors during DTO → Domain conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A field-level validation error.
    #[error("{context}: {source}")]
    Validation {
        /// Where the error occurred (e.g., "tags[3].attrs[0].value-regex").
        context: String,
        /// The underlying model error.
        source: ModelError,
    },

    /// An attribute declares more than one value constraint.
    #[error("{context}: at most one of `value`, `value-casei`, `value-regex`, `value-regex-casei`, `blacklisted-value-regex` may be set")]
    ConflictingValueConstraints {
        /// The attribute that has the conflict.
        context: String,
    },

    /// A property declares both a string and a numeric value.
    #[error("{context}: at most one of `value` or `value-double` may be set")]
    ConflictingPropertyValue {
        /// The property that has the conflict.
        context: String,
    },

    /// Cross-reference errors from aggregate root construction.
    #[error("rule validation errors:\n{}", format_errors(.0))]
    CrossRef(Vec<ModelError>),
}

fn format_errors(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn validation(context: String) -> impl FnOnce(ModelError) -> LoadError {
    move |source| LoadError::Validation { context, source }
}

/// Converts a `RuleSourceDto` to a validated `RuleSet`.
///
/// # Errors
///
/// Returns the first field-level error, or every cross-reference error.
pub fn load(dto: RuleSourceDto) -> Result<RuleSet, LoadError> {
    let groups = dto
        .attr_lists
        .iter()
        .enumerate()
        .map(|(i, g)| convert_group(g, i))
        .collect::<Result<Vec<_>, _>>()?;

    let tags = dto
        .tags
        .iter()
        .enumerate()
        .map(|(i, t)| convert_tag(t, i))
        .collect::<Result<Vec<_>, _>>()?;

    RuleSet::new(groups, tags).map_err(LoadError::CrossRef)
}

fn convert_group(dto: &AttrListDto, index: usize) -> Result<AttributeGroup, LoadError> {
    let ctx = format!("attr-lists[{index}]");
    let attrs = dto
        .attrs
        .iter()
        .enumerate()
        .map(|(j, a)| convert_attr(a, &format!("{ctx}.attrs[{j}]")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AttributeGroup::new(dto.name.clone(), attrs))
}

fn convert_tag(dto: &TagDto, index: usize) -> Result<TagRule, LoadError> {
    let ctx = format!("tags[{index}]");
    let rule = TagRule::new(&dto.tag_name).map_err(validation(format!("{ctx}.tag-name")))?;

    let formats = dto
        .html_format
        .iter()
        .enumerate()
        .map(|(j, f)| {
            f.parse::<HtmlFormat>()
                .map_err(validation(format!("{ctx}.html-format[{j}]")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let attrs = dto
        .attrs
        .iter()
        .enumerate()
        .map(|(j, a)| convert_attr(a, &format!("{ctx}.attrs[{j}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rule
        .with_spec_name(dto.spec_name.clone())
        .with_formats(formats)
        .with_flags(dto.mandatory, dto.unique, dto.unique_warning)
        .with_mandatory_alternatives(dto.mandatory_alternatives.clone())
        .with_mandatory_parent(dto.mandatory_parent.as_deref().map(ParentConstraint::parse))
        .with_disallowed_ancestors(dto.disallowed_ancestor.clone())
        .with_attr_lists(dto.attr_lists.clone())
        .with_attrs(attrs)
        .with_dependencies(dto.requires.clone(), dto.satisfies.clone())
        .with_deprecation(dto.deprecation.clone())
        .with_cdata(dto.cdata))
}

fn convert_attr(dto: &AttrDto, ctx: &str) -> Result<AttributeRule, LoadError> {
    let mut rule = AttributeRule::new(&dto.name)
        .map_err(validation(format!("{ctx}.name")))?
        .with_alternative_names(dto.alternative_names.clone())
        .with_mandatory(dto.mandatory)
        .with_value(convert_value(dto, ctx)?);

    if let Some(url) = &dto.value_url {
        rule = rule.with_url(convert_url(url));
    }
    if let Some(props) = &dto.value_properties {
        let props = props
            .iter()
            .enumerate()
            .map(|(j, p)| convert_property(p, &format!("{ctx}.value-properties[{j}]")))
            .collect::<Result<Vec<_>, _>>()?;
        rule = rule.with_properties(props);
    }
    if let Some(note) = &dto.deprecation {
        rule = rule.with_deprecation(note.clone());
    }
    Ok(rule)
}

fn convert_value(dto: &AttrDto, ctx: &str) -> Result<ValueConstraint, LoadError> {
    let set = [
        dto.value.is_some(),
        dto.value_casei.is_some(),
        dto.value_regex.is_some(),
        dto.value_regex_casei.is_some(),
        dto.blacklisted_value_regex.is_some(),
    ]
    .into_iter()
    .filter(|s| *s)
    .count();
    if set > 1 {
        return Err(LoadError::ConflictingValueConstraints {
            context: format!("{ctx} ('{}')", dto.name),
        });
    }

    let pattern = |raw: &str, casei: bool, field: &str| {
        ValuePattern::new(raw, casei).map_err(validation(format!("{ctx}.{field}")))
    };

    Ok(if let Some(v) = &dto.value {
        ValueConstraint::Exact(v.clone())
    } else if let Some(v) = &dto.value_casei {
        ValueConstraint::CaseInsensitive(v.clone())
    } else if let Some(raw) = &dto.value_regex {
        ValueConstraint::Pattern(pattern(raw, false, "value-regex")?)
    } else if let Some(raw) = &dto.value_regex_casei {
        ValueConstraint::PatternCaseInsensitive(pattern(raw, true, "value-regex-casei")?)
    } else if let Some(raw) = &dto.blacklisted_value_regex {
        ValueConstraint::Blacklist(pattern(raw, true, "blacklisted-value-regex")?)
    } else {
        ValueConstraint::None
    })
}

fn convert_url(dto: &UrlDto) -> UrlPolicy {
    UrlPolicy {
        allowed_protocols: dto.allowed_protocol.clone(),
        allow_relative: dto.allow_relative,
        allow_empty: dto.allow_empty,
        disallowed_domains: dto.disallowed_domain.clone(),
    }
}

fn convert_property(dto: &PropertyDto, ctx: &str) -> Result<PropertyRule, LoadError> {
    let value = match (&dto.value, dto.value_double) {
        (Some(_), Some(_)) => {
            return Err(LoadError::ConflictingPropertyValue {
                context: format!("{ctx} ('{}')", dto.name),
            })
        }
        (Some(text), None) => Some(PropertyValue::Text(text.clone())),
        (None, Some(n)) => Some(PropertyValue::Number(n)),
        (None, None) => None,
    };
    PropertyRule::new(&dto.name, dto.mandatory, value).map_err(validation(format!("{ctx}.name")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<RuleSet, LoadError> {
        let dto: RuleSourceDto = toml::from_str(toml_str).unwrap();
        load(dto)
    }

    #[test]
    fn load_minimal_rule_set() {
        let set = parse(
            r#"
[[attr-lists]]
name = "$GLOBAL_ATTRS"
attrs = [{ name = "id" }]

[[tags]]
tag-name = "HTML"
mandatory = true
unique = true
mandatory-parent = "!DOCTYPE"
html-format = ["AMP", "AMP4EMAIL"]
attrs = [{ name = "⚡", alternative-names = ["amp"], mandatory = true, value = "" }]
"#,
        )
        .unwrap();
        let html = &set.tags()[0];
        assert_eq!(html.id().index(), 0);
        assert_eq!(html.mandatory_parent(), Some(&ParentConstraint::Doctype));
        assert_eq!(html.formats(), &[HtmlFormat::Amp, HtmlFormat::Amp4Email]);
        assert!(html.attrs()[0].accepts_name("amp"));
        assert_eq!(html.attrs()[0].value().literal(), Some(""));
    }

    #[test]
    fn rejects_multiple_value_constraints() {
        let err = parse(
            r#"
[[tags]]
tag-name = "P"
attrs = [{ name = "x", value = "a", value-regex = "b" }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::ConflictingValueConstraints { .. }));
        assert!(err.to_string().starts_with("tags[0].attrs[0]"));
    }

    #[test]
    fn rejects_empty_attribute_name() {
        let err = parse("[[tags]]\ntag-name = \"P\"\nattrs = [{ name = \"\" }]").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Validation {
                source: ModelError::EmptyAttributeName,
                ..
            }
        ));
    }

    #[test]
    fn rejects_invalid_regex() {
        let err = parse("[[tags]]\ntag-name = \"P\"\nattrs = [{ name = \"x\", value-regex-casei = \"(\" }]")
            .unwrap_err();
        assert!(err.to_string().contains("value-regex-casei"));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = parse("[[tags]]\ntag-name = \"P\"\nhtml-format = [\"AMP5\"]").unwrap_err();
        assert!(err.to_string().contains("html-format[0]"));
    }

    #[test]
    fn rejects_unknown_group() {
        let err = parse("[[tags]]\ntag-name = \"P\"\nattr-lists = [\"nope\"]").unwrap_err();
        assert!(matches!(err, LoadError::CrossRef(ref errors) if errors.len() == 1));
    }

    #[test]
    fn rejects_property_with_two_values() {
        let err = parse(
            r#"
[[tags]]
tag-name = "META"
attrs = [{ name = "content", value-properties = [{ name = "w", value = "1", value-double = 1.0 }] }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::ConflictingPropertyValue { .. }));
    }
}
