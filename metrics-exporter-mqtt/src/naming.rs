//! Metric naming.

/// Separator between the components of a metric name.
pub const SEPARATOR: char = '.';

/// Builds a dot-separated metric name from the given components.
///
/// Empty components are skipped, so the result never has leading, trailing, or doubled separators.
pub fn name<'a, I>(components: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for component in components.into_iter().filter(|c| !c.is_empty()) {
        if !out.is_empty() {
            out.push(SEPARATOR);
        }
        out.push_str(component);
    }
    out
}

/// Applies an optional global prefix to every metric name.
///
/// Names are built in the format of `<prefix>.<name>.<suffix>`.
#[derive(Clone, Debug, Default)]
pub struct Prefixer {
    prefix: Option<String>,
}

impl Prefixer {
    /// Creates a new `Prefixer`.
    ///
    /// An empty prefix is treated as no prefix.
    pub fn new<S: Into<String>>(prefix: Option<S>) -> Self {
        let prefix = prefix.map(Into::into).filter(|p| !p.is_empty());
        Self { prefix }
    }

    /// Gets the configured prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Builds the fully-qualified name for `components`, prefixed if a prefix is configured.
    pub fn prefixed<'a, I>(&'a self, components: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        name(self.prefix.as_deref().into_iter().chain(components))
    }
}

#[cfg(test)]
mod tests {
    use super::{name, Prefixer};

    #[test]
    fn with_prefix() {
        let prefixer = Prefixer::new(Some("p"));
        assert_eq!(prefixer.prefixed(["a", "b"]), "p.a.b");
        assert_eq!(prefixer.prefixed(["a"]), "p.a");
        assert_eq!(prefixer.prefix(), Some("p"));
    }

    #[test]
    fn without_prefix() {
        assert_eq!(Prefixer::new(None::<String>).prefixed(["a", "b"]), "a.b");
        assert_eq!(Prefixer::new(Some("")).prefixed(["a", "b"]), "a.b");
        assert_eq!(Prefixer::default().prefix(), None);
    }

    #[test]
    fn empty_components_are_skipped() {
        assert_eq!(name(["", "a", "", "b", ""]), "a.b");
        assert_eq!(name(["", ""]), "");
        assert_eq!(Prefixer::new(Some("device1")).prefixed(["temp", ""]), "device1.temp");
    }

    #[test]
    fn hierarchical_names_pass_through() {
        let prefixer = Prefixer::new(Some("site/device1"));
        assert_eq!(prefixer.prefixed(["jvm.memory", "max"]), "site/device1.jvm.memory.max");
    }
}
