//! Accessor paths into a View Object
//!
//! A path is written `$.seg.seg[3]`. Navigation is null-safe: any missing
//! link yields `None`, never an error.

use std::fmt;

use serde_json::Value;

/// One step of an accessor path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Object key
    Key(String),
    /// Array position
    Index(usize),
}

/// A `$`-rooted accessor path
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The bare root `$`
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a key-only path from `a.b.c`
    pub fn from_dotted(dotted: &str) -> Self {
        let mut path = Self::root();
        path.push_dotted(dotted);
        path
    }

    /// Builds a path from explicit segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Appends a key
    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(PathSegment::Key(key.into()));
    }

    /// Appends every `.`-separated key of `dotted`
    pub fn push_dotted(&mut self, dotted: &str) {
        for key in dotted.split('.').filter(|k| !k.is_empty()) {
            self.push_key(key);
        }
    }

    /// Appends an array index
    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the first segment as a key, if it is one
    pub fn head_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Returns the path without its first segment
    pub fn tail(&self) -> FieldPath {
        Self {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    /// Renders the path without the `$.` root, e.g. `style.Transition.possPct`
    pub fn dotted(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::Key(k) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(k);
                }
                PathSegment::Index(i) => out.push_str(&format!("[{}]", i)),
            }
        }
        out
    }

    /// Navigates `value` along this path
    pub fn lookup<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        lookup_segments(value, &self.segments)
    }
}

/// Navigates `value` along `segments`
pub fn lookup_segments<'v>(value: &'v Value, segments: &[PathSegment]) -> Option<&'v Value> {
    let mut current = value;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(k), Value::Object(map)) => map.get(k)?,
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_and_dotted() {
        let mut path = FieldPath::from_dotted("stat.posFreqs");
        path.push_index(2);
        assert_eq!(path.to_string(), "$.stat.posFreqs[2]");
        assert_eq!(path.dotted(), "stat.posFreqs[2]");
        assert_eq!(FieldPath::root().to_string(), "$");
    }

    #[test]
    fn test_lookup_nested() {
        let doc = json!({"style": {"Transition": {"possPct": {"value": 0.18}}}});
        let path = FieldPath::from_dotted("style.Transition.possPct");
        assert_eq!(path.lookup(&doc), Some(&json!({"value": 0.18})));
    }

    #[test]
    fn test_lookup_is_null_safe() {
        let doc = json!({"roster": null, "posFreqs": [0.5, 0.5]});

        assert_eq!(FieldPath::from_dotted("roster.height").lookup(&doc), None);
        assert_eq!(FieldPath::from_dotted("missing.deeper").lookup(&doc), None);

        let mut out_of_range = FieldPath::from_dotted("posFreqs");
        out_of_range.push_index(9);
        assert_eq!(out_of_range.lookup(&doc), None);
    }

    #[test]
    fn test_head_and_tail() {
        let path = FieldPath::from_dotted("rank.style.Transition");
        assert_eq!(path.head_key(), Some("rank"));
        assert_eq!(path.tail().dotted(), "style.Transition");
    }
}
