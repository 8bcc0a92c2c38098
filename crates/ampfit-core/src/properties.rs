//! Parsing of structured `key=value,key=value` attribute values.

/// One entry of a property list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Key, trimmed.
    pub name: String,
    /// Value, trimmed. `None` when the entry has no `=`.
    pub value: Option<String>,
}

/// An ordered property list such as `width=device-width,initial-scale=1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyList {
    entries: Vec<Property>,
}

impl PropertyList {
    /// Parses a raw attribute value.
    ///
    /// Entries are split on `,`, then on the first `=`; keys and values are
    /// trimmed and blank entries are skipped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| {
                let mut parts = entry.splitn(2, '=');
                let name = parts.next().unwrap_or_default().trim().to_string();
                let value = parts.next().map(|v| v.trim().to_string());
                Property { name, value }
            })
            .collect();
        Self { entries }
    }

    /// Returns the entries in order.
    #[must_use]
    pub fn entries(&self) -> &[Property] {
        &self.entries
    }

    /// Returns the value of a key, empty for a bare key.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_deref().unwrap_or_default())
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|p| p.name == name)
    }

    /// Sets a value in place, or appends the key when absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self.entries.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Property {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Renders the list back into attribute form, joined by `,`.
    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|p| match &p.value {
                Some(value) => format!("{}={value}", p.name),
                None => p.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_keeps_order() {
        let list = PropertyList::parse(" width = device-width, initial-scale=1 ,minimal-ui");
        assert_eq!(list.get("width"), Some("device-width"));
        assert_eq!(list.get("initial-scale"), Some("1"));
        assert_eq!(list.get("minimal-ui"), Some(""));
        assert_eq!(list.render(), "width=device-width,initial-scale=1,minimal-ui");
    }

    #[test]
    fn set_overwrites_in_place_or_appends() {
        let mut list = PropertyList::parse("width=500,initial-scale=1");
        list.set("width", "device-width");
        list.set("shrink-to-fit", "no");
        assert_eq!(
            list.render(),
            "width=device-width,initial-scale=1,shrink-to-fit=no"
        );
    }

    #[test]
    fn empty_value_yields_empty_list() {
        let list = PropertyList::parse(" , ");
        assert!(list.entries().is_empty());
        assert!(!list.contains("width"));
        assert_eq!(list.render(), "");
    }

    #[test]
    fn value_may_contain_equals() {
        let list = PropertyList::parse("a=b=c");
        assert_eq!(list.get("a"), Some("b=c"));
    }
}
