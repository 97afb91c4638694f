use anyhow::{Error, bail};

/// A compound class selector: an element matches only if it carries *every*
/// class in the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSelector {
    /// Required class tokens, lowercase, in the order given.
    classes: Vec<String>,
}

impl ClassSelector {
    /// Parse the dot form, e.g. `.spinner` or `.swal2-buttonswrapper.swal2-loading`.
    ///
    /// Whitespace inside a dot-form selector is rejected; use
    /// [`ClassSelector::from_class_string`] for space-separated class strings.
    pub fn parse(selector: &str) -> Result<Self, Error> {
        if selector.chars().any(char::is_whitespace) {
            bail!("class selector {selector:?} contains whitespace; use from_class_string");
        }
        let classes: Vec<String> = selector
            .split('.')
            .filter(|token| !token.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if classes.is_empty() {
            bail!("class selector must name at least one class, got {selector:?}");
        }
        Ok(Self { classes })
    }

    /// Build a compound selector from a whitespace-separated class string,
    /// e.g. `"swal2-buttonswrapper swal2-loading"`.
    ///
    /// Every token becomes a required class: the resulting selector matches
    /// only elements carrying *all* of them on one node. This mirrors what a
    /// `.${classString}` selector construction does with embedded whitespace
    /// in the string. Callers wanting any-of semantics must issue one watch
    /// per class.
    pub fn from_class_string(class_string: &str) -> Result<Self, Error> {
        let classes: Vec<String> = class_string
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        if classes.is_empty() {
            bail!("class string must name at least one class");
        }
        Ok(Self { classes })
    }

    /// The required class tokens, lowercase.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl core::fmt::Display for ClassSelector {
    fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for class in &self.classes {
            write!(formatter, ".{class}")?;
        }
        Ok(())
    }
}
