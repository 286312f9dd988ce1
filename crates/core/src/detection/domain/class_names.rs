use std::path::Path;

use crate::shared::constants::COCO_CLASS_NAMES;

/// Human-readable labels indexed by model class id.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    /// The 80 COCO labels.
    pub fn coco() -> Self {
        Self {
            names: COCO_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// One name per line; blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Label for `class_id`, or `class N` when the id is out of range.
    pub fn label(&self, class_id: usize) -> String {
        match self.names.get(class_id) {
            Some(name) => name.clone(),
            None => format!("class {class_id}"),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::coco()
    }
}
