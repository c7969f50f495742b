use std::collections::HashMap;
use std::fmt;

/// A route template as written in the configuration, e.g. `/items/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    collection_key: String,
}

impl PathTemplate {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            collection_key: collection_key(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The storage partition this template reads and writes.
    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    /// Whether the template addresses a single item by its `id` parameter.
    pub fn is_item_path(&self) -> bool {
        self.raw.ends_with("/:id")
    }

    /// The template with parameter names erased and an optional trailing slash dropped.
    ///
    /// Templates with the same shape match exactly the same request paths, so
    /// `/a/:id`, `/a/:name/` and `/a/:x` all have the shape `/a/:`.
    pub fn shape(&self) -> String {
        self.base()
            .split('/')
            .map(|segment| match segment.chars().next() {
                Some(':') => ":",
                Some('*') => "*",
                _ => segment,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// The router paths serving this template: with and without a trailing slash.
    pub fn route_paths(&self) -> Vec<String> {
        let base = self.base();
        let ends_in_wildcard = base
            .rsplit('/')
            .next()
            .map_or(false, |segment| segment.starts_with('*'));

        if base.is_empty() {
            vec!["/".to_string()]
        } else if ends_in_wildcard {
            vec![base.to_string()]
        } else {
            vec![base.to_string(), format!("{}/", base)]
        }
    }

    /// Parameter names in the order they appear in the template.
    pub fn param_names(&self) -> Vec<&str> {
        self.raw
            .split('/')
            .filter_map(|segment| {
                segment
                    .strip_prefix(':')
                    .or_else(|| segment.strip_prefix('*'))
            })
            .collect()
    }

    /// Names positional parameter values after this template's own parameters.
    ///
    /// A route is registered once per shape, so the values may arrive under another
    /// template's names.
    pub fn bind_params(&self, values: Vec<(String, String)>) -> HashMap<String, String> {
        self.param_names()
            .into_iter()
            .zip(values)
            .map(|(name, (_, value))| (name.to_string(), value))
            .collect()
    }

    /// The concrete request path, with every `:name` token replaced by its parameter.
    /// Rendered only when formatted.
    pub fn resolved<'a>(&'a self, params: &'a HashMap<String, String>) -> ResolvedPath<'a> {
        ResolvedPath {
            template: self,
            params,
        }
    }

    fn base(&self) -> &str {
        self.raw.strip_suffix('/').unwrap_or(&self.raw)
    }
}

/// Display adapter returned by [`PathTemplate::resolved`]. Tokens without a parameter are
/// written untouched.
pub struct ResolvedPath<'a> {
    template: &'a PathTemplate,
    params: &'a HashMap<String, String>,
}

impl fmt::Display for ResolvedPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.template.raw.as_str();

        while let Some(colon) = rest.find(':') {
            f.write_str(&rest[..colon])?;
            let after = &rest[colon + 1..];
            let name_len = after
                .find(|c: char| !is_word_char(c))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            match self.params.get(name) {
                Some(value) if !name.is_empty() => f.write_str(value)?,
                _ => write!(f, ":{}", name)?,
            }
            rest = &after[name_len..];
        }
        f.write_str(rest)
    }
}

/// Strips a trailing `/:name` segment down to `/`; any other path is its own key.
///
/// `/items/:id` and `/items/` both map to `/items/`.
pub fn collection_key(path: &str) -> String {
    if let Some(slash) = path.rfind('/') {
        let segment = &path[slash + 1..];
        if let Some(name) = segment.strip_prefix(':') {
            if !name.is_empty() && name.chars().all(is_word_char) {
                return path[..=slash].to_string();
            }
        }
    }
    path.to_string()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
