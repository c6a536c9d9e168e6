//! Area Descriptors and Bank Manifests
//!
//! Banks of areas are described declaratively, either as plain text lines:
//!
//! ```text
//! // comment
//! &overworld
//! village#day
//! forest#seasons#summer
//! cave#seasons#winter#cave_objects.txt
//! ```
//!
//! or as a RON manifest:
//!
//! ```text
//! (banks: [(name: "overworld", areas: [(name: "village", phase: Some("day"))])])
//! ```
//!
//! Both produce an `AreaManifest`.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Separates the fields of an area line.
pub const FIELD_SEPARATOR: char = '#';

/// Opens a bank scope in the line format.
pub const BANK_MARKER: char = '&';

/// Lines starting with this are ignored.
pub const COMMENT_PREFIX: &str = "//";

/// Name of the bank that collects area lines declared before any scope.
pub const DEFAULT_BANK: &str = "default";

/// Everything needed to build one area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDescriptor {
    pub name: String,
    #[serde(default)]
    pub phase_bank: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    /// Source the area's object constructor builds objects from.
    #[serde(default)]
    pub object_constructor_file: Option<String>,
}

impl AreaDescriptor {
    /// A bare area with no phase and no object constructor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase_bank: None,
            phase: None,
            object_constructor_file: None,
        }
    }

    pub fn with_phase(mut self, phase_bank: Option<&str>, phase: &str) -> Self {
        self.phase_bank = phase_bank.map(str::to_string);
        self.phase = Some(phase.to_string());
        self
    }

    pub fn with_object_constructor_file(mut self, file: &str) -> Self {
        self.object_constructor_file = Some(file.to_string());
        self
    }

    /// Parse one area line. `line` is only used for error reporting.
    ///
    /// Accepted shapes: `name`, `name#phase`, `name#phaseBank#phase` and
    /// `name#phaseBank#phase#objectConstructorFile`. Empty optional fields
    /// count as absent.
    pub fn parse_line(content: &str, line: usize) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = content.split(FIELD_SEPARATOR).map(str::trim).collect();

        if fields.len() > 4 {
            return Err(ConfigError::TooManyFields {
                line,
                content: content.to_string(),
            });
        }

        let name = fields[0];
        if name.is_empty() {
            return Err(ConfigError::MissingAreaName { line });
        }

        let field = |i: usize| {
            fields
                .get(i)
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
        };

        let (phase_bank, phase) = match fields.len() {
            1 => (None, None),
            2 => (None, field(1)),
            _ => (field(1), field(2)),
        };

        Ok(Self {
            name: name.to_string(),
            phase_bank,
            phase,
            object_constructor_file: field(3),
        })
    }
}

impl fmt::Display for AreaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;

        let phase = self.phase.as_deref().unwrap_or("");
        match (&self.phase_bank, &self.object_constructor_file) {
            (None, None) if self.phase.is_none() => Ok(()),
            (None, None) => write!(f, "{FIELD_SEPARATOR}{phase}"),
            (bank, file) => {
                let bank = bank.as_deref().unwrap_or("");
                write!(f, "{FIELD_SEPARATOR}{bank}{FIELD_SEPARATOR}{phase}")?;
                match file {
                    Some(file) => write!(f, "{FIELD_SEPARATOR}{file}"),
                    None => Ok(()),
                }
            }
        }
    }
}

/// One named bank of areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankManifest {
    pub name: String,
    #[serde(default)]
    pub areas: Vec<AreaDescriptor>,
}

impl BankManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            areas: Vec::new(),
        }
    }
}

/// Declarative description of every area bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaManifest {
    #[serde(default)]
    pub banks: Vec<BankManifest>,
}

impl AreaManifest {
    /// Parse the line format.
    pub fn parse_lines(text: &str) -> Result<Self, ConfigError> {
        let mut manifest = AreaManifest::default();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw.trim();
            if content.is_empty() || content.starts_with(COMMENT_PREFIX) {
                continue;
            }

            if let Some(bank) = content.strip_prefix(BANK_MARKER) {
                let bank = bank.trim();
                if bank.is_empty() {
                    return Err(ConfigError::EmptyBankName { line });
                }
                if manifest.bank(bank).is_some() {
                    return Err(ConfigError::DuplicateBank(bank.to_string()));
                }
                manifest.banks.push(BankManifest::new(bank));
                continue;
            }

            let descriptor = AreaDescriptor::parse_line(content, line)?;
            if manifest.banks.is_empty() {
                manifest.banks.push(BankManifest::new(DEFAULT_BANK));
            }
            if let Some(bank) = manifest.banks.last_mut() {
                bank.areas.push(descriptor);
            }
        }

        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a RON manifest.
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let manifest: AreaManifest = ron::from_str(s)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Render back to the line format.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for bank in &self.banks {
            out.push(BANK_MARKER);
            out.push_str(&bank.name);
            out.push('\n');
            for area in &bank.areas {
                out.push_str(&area.to_string());
                out.push('\n');
            }
        }
        out
    }

    /// Load a manifest file. `.ron` files are read as RON, anything else as lines.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let is_ron = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("ron"))
            .unwrap_or(false);

        if is_ron {
            Self::from_ron_str(&contents)
        } else {
            Self::parse_lines(&contents)
        }
    }

    /// Reject unnamed banks or areas and duplicates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, bank) in self.banks.iter().enumerate() {
            if bank.name.trim().is_empty() {
                return Err(ConfigError::EmptyBankName { line: 0 });
            }
            if self.banks[..i].iter().any(|other| other.name == bank.name) {
                return Err(ConfigError::DuplicateBank(bank.name.clone()));
            }

            for (j, area) in bank.areas.iter().enumerate() {
                if area.name.trim().is_empty() {
                    return Err(ConfigError::MissingAreaName { line: 0 });
                }
                if bank.areas[..j].iter().any(|other| other.name == area.name) {
                    return Err(ConfigError::DuplicateArea {
                        bank: bank.name.clone(),
                        area: area.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn bank(&self, name: &str) -> Option<&BankManifest> {
        self.banks.iter().find(|bank| bank.name == name)
    }
}
