//! Manipulation of the remote service's path strings.
//!
//! Paths are opaque strings owned by the server. They are split only on the
//! literal separator reported by the backend; `.` and `..` are not resolved.

use serde::{Deserialize, Serialize};

use super::CoreError;

/// The operating system family reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    /// Windows (`os.name == "nt"`).
    Nt,
    #[default]
    Posix,
}

impl OsKind {
    pub fn from_os_name(name: &str) -> Self {
        if name == "nt" {
            OsKind::Nt
        } else {
            OsKind::Posix
        }
    }
}

/// The path separator of the remote file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    Slash,
    Backslash,
}

impl Separator {
    pub fn for_os(os: OsKind) -> Self {
        match os {
            OsKind::Nt => Separator::Backslash,
            OsKind::Posix => Separator::Slash,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Separator::Slash => '/',
            Separator::Backslash => '\\',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Separator::Slash => "/",
            Separator::Backslash => "\\",
        }
    }
}

/// One clickable element of the path bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub label: String,
    pub path: String,
}

/// Path operations bound to a separator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathModel {
    separator: Separator,
}

impl PathModel {
    pub fn new(separator: Separator) -> Self {
        Self { separator }
    }

    pub fn for_os(os: OsKind) -> Self {
        Self::new(Separator::for_os(os))
    }

    pub fn separator(&self) -> Separator {
        self.separator
    }

    /// Drops the last non-empty segment. Returns `None` at a root
    /// (`/`, `C:\`) or for a single relative segment.
    pub fn parent(&self, path: &str) -> Option<String> {
        let sep = self.separator.as_char();
        let trimmed = path.trim_end_matches(sep);
        if trimmed.is_empty() {
            return None;
        }

        let idx = trimmed.rfind(sep)?;
        let head = trimmed[..idx].trim_end_matches(sep);
        if head.is_empty() {
            return Some(self.separator.as_str().to_string());
        }
        if self.is_drive(head) {
            return Some(format!("{head}{sep}"));
        }
        Some(head.to_string())
    }

    /// Appends `segment` to `base`, inserting a separator when needed.
    pub fn join(&self, base: &str, segment: &str) -> Result<String, CoreError> {
        let sep = self.separator.as_char();
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(CoreError::InvalidPath("name must not be empty".to_string()));
        }
        if segment.contains(sep) {
            return Err(CoreError::InvalidPath(format!(
                "name '{segment}' must not contain '{sep}'"
            )));
        }

        if base.is_empty() {
            Ok(segment.to_string())
        } else if base.ends_with(sep) {
            Ok(format!("{base}{segment}"))
        } else {
            Ok(format!("{base}{sep}{segment}"))
        }
    }

    /// The non-blank segments of `path`.
    pub fn split<'a>(&self, path: &'a str) -> Vec<&'a str> {
        path.split(self.separator.as_char())
            .filter(|part| !part.trim().is_empty())
            .collect()
    }

    /// The display name of the last segment, or the path itself at a root.
    pub fn name<'a>(&self, path: &'a str) -> &'a str {
        self.split(path).last().copied().unwrap_or(path)
    }

    /// Builds the path bar for `path`. Each crumb navigates to the prefix
    /// ending at that segment; POSIX crumbs keep the leading separator and
    /// drive crumbs point at the drive root.
    pub fn breadcrumbs(&self, path: &str) -> Vec<Breadcrumb> {
        let sep = self.separator.as_str();
        let absolute = self.separator == Separator::Slash && path.starts_with(sep);
        let segments = self.split(path);

        let mut crumbs = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let joined = segments[..=i].join(sep);
            let target = if absolute {
                format!("{sep}{joined}")
            } else if i == 0 && self.is_drive(segment) {
                format!("{joined}{sep}")
            } else {
                joined
            };
            crumbs.push(Breadcrumb {
                label: (*segment).to_string(),
                path: target,
            });
        }
        crumbs
    }

    /// The root that `path` lives under, as offered by the root selector.
    pub fn root_of(&self, path: &str) -> String {
        let sep = self.separator.as_char();
        let first = path.split(sep).next().unwrap_or("");
        format!("{first}{sep}")
    }

    fn is_drive(&self, segment: &str) -> bool {
        self.separator == Separator::Backslash
            && segment.ends_with(':')
            && !segment.contains(self.separator.as_char())
    }
}
