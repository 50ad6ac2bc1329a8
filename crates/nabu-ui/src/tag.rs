use std::fmt;

use crate::error::ViewError;

/// Parsed form of a template child key: `tag#id.classA.classB$name`.
///
/// Every part is optional, but a key needs a tag or an id; an id-only key
/// (`#main`) gets the tag `div`. The name is not rendered; it labels the
/// element so code can find it again with [`Element::find`](crate::component::Element::find)
/// and it lets two siblings share a tag (`li$first`, `li$second`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDescriptor {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub name: Option<String>,
}

const DEFAULT_TAG: &str = "div";

impl TagDescriptor {
    pub fn parse(src: &str) -> Result<Self, ViewError> {
        let err = |msg: &str| ViewError::config(format!("bad tag descriptor {:?}: {}", src, msg));

        let mut tag = String::new();
        let mut id: Option<String> = None;
        let mut classes = Vec::new();
        let mut name: Option<String> = None;

        // Marker that introduced the segment being read; None = the tag.
        let mut marker: Option<char> = None;
        let mut segment = String::new();

        let mut finish = |marker: Option<char>, segment: String| -> Result<(), ViewError> {
            match marker {
                None => tag = segment,
                Some(_) if segment.is_empty() => return Err(err("empty segment")),
                Some('#') if id.is_some() => return Err(err("more than one id")),
                Some('#') => id = Some(segment),
                Some('.') => classes.push(segment),
                Some('$') if name.is_some() => return Err(err("more than one name")),
                Some(_) => name = Some(segment),
            }
            Ok(())
        };

        for ch in src.chars() {
            match ch {
                '#' | '.' | '$' => {
                    finish(marker, std::mem::take(&mut segment))?;
                    marker = Some(ch);
                }
                c if c.is_whitespace() => return Err(err("whitespace is not allowed")),
                c => segment.push(c),
            }
        }
        finish(marker, segment)?;

        if tag.is_empty() {
            if id.is_none() {
                return Err(err("a tag or an id is required"));
            }
            tag = DEFAULT_TAG.to_string();
        }

        Ok(Self { tag, id, classes, name })
    }

    /// Space-joined classes, as applied to the `class` attribute.
    pub fn class_attr(&self) -> Option<String> {
        if self.classes.is_empty() {
            None
        } else {
            Some(self.classes.join(" "))
        }
    }
}

impl fmt::Display for TagDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        if let Some(name) = &self.name {
            write!(f, "${}", name)?;
        }
        Ok(())
    }
}
