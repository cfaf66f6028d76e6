#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Immutable catalog of weighted branch patterns used by track generation.
//!
//! A [`PatternTemplate`] lists branch offsets relative to the position the
//! batch is anchored at. Templates are validated once when the catalog is
//! built; malformed entries are logged and skipped so a bad data file never
//! stops the game.

use glam::Vec3;
use serde::Deserialize;
use tracing::warn;

/// Minimum weight any template contributes to selection.
pub const WEIGHT_EPSILON: f32 = 0.0001;

/// Errors raised while building pattern templates.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The template lists no offsets.
    #[error("pattern `{name}` has no offsets")]
    EmptyPattern {
        /// Name of the rejected template.
        name: String,
    },
    /// An offset contains a NaN or infinite coordinate.
    #[error("pattern `{name}` offset {index} is not finite")]
    NonFiniteOffset {
        /// Name of the rejected template.
        name: String,
        /// Position of the offending offset.
        index: usize,
    },
    /// An offset steps backward in z relative to its predecessor.
    #[error("pattern `{name}` offset {index} moves backward in z")]
    DecreasingDepth {
        /// Name of the rejected template.
        name: String,
        /// Position of the offending offset.
        index: usize,
    },
    /// The selection weight is negative or not a number.
    #[error("pattern `{name}` has invalid weight {weight}")]
    InvalidWeight {
        /// Name of the rejected template.
        name: String,
        /// Weight found in the definition.
        weight: f32,
    },
    /// The catalog document could not be parsed.
    #[error("failed to parse pattern catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Serialised description of a pattern as it appears in data files.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PatternSpec {
    /// Optional human readable name used in diagnostics.
    #[serde(default)]
    pub name: Option<String>,
    /// Offsets expressed as `[x, y, z]` triples relative to the batch anchor.
    pub offsets: Vec<[f32; 3]>,
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Difficulty tag, 1 for easy through 3 for hard.
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
}

fn default_weight() -> f32 {
    1.0
}

fn default_difficulty() -> u8 {
    1
}

/// Validated, immutable pattern template.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternTemplate {
    name: String,
    offsets: Vec<Vec3>,
    weight: f32,
    difficulty: u8,
}

impl PatternTemplate {
    /// Validates a pattern definition and builds a template from it.
    pub fn from_spec(spec: PatternSpec, fallback_name: &str) -> Result<Self, ConfigError> {
        let name = spec.name.unwrap_or_else(|| fallback_name.to_owned());

        if spec.offsets.is_empty() {
            return Err(ConfigError::EmptyPattern { name });
        }

        if spec.weight.is_nan() || spec.weight < 0.0 {
            return Err(ConfigError::InvalidWeight {
                name,
                weight: spec.weight,
            });
        }

        let mut offsets = Vec::with_capacity(spec.offsets.len());
        let mut previous_z = f32::NEG_INFINITY;
        for (index, raw) in spec.offsets.into_iter().enumerate() {
            let offset = Vec3::from_array(raw);
            if !offset.is_finite() {
                return Err(ConfigError::NonFiniteOffset { name, index });
            }
            if offset.z < previous_z {
                return Err(ConfigError::DecreasingDepth { name, index });
            }
            previous_z = offset.z;
            offsets.push(offset);
        }

        Ok(Self {
            name,
            offsets,
            weight: spec.weight,
            difficulty: spec.difficulty,
        })
    }

    /// Single branch one stride ahead, used when no valid template survives loading.
    #[must_use]
    pub fn straight() -> Self {
        Self {
            name: String::from("straight"),
            offsets: vec![Vec3::new(0.0, 0.0, 4.0)],
            weight: 1.0,
            difficulty: 1,
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offsets relative to the batch anchor, in non-decreasing z order.
    #[must_use]
    pub fn offsets(&self) -> &[Vec3] {
        &self.offsets
    }

    /// Weight as declared in the definition.
    #[must_use]
    pub const fn weight(&self) -> f32 {
        self.weight
    }

    /// Weight contributed to selection after clamping to [`WEIGHT_EPSILON`].
    #[must_use]
    pub fn effective_weight(&self) -> f32 {
        self.weight.max(WEIGHT_EPSILON)
    }

    /// Difficulty tag of the template.
    #[must_use]
    pub const fn difficulty(&self) -> u8 {
        self.difficulty
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default, rename = "pattern")]
    patterns: Vec<PatternSpec>,
}

/// Read-only collection of templates with weighted selection.
///
/// A catalog always holds at least one template.
#[derive(Clone, Debug)]
pub struct Catalog {
    templates: Vec<PatternTemplate>,
    total_weight: f64,
}

impl Catalog {
    /// Builds a catalog from raw definitions, skipping and logging malformed entries.
    #[must_use]
    pub fn from_specs<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = PatternSpec>,
    {
        let mut templates = Vec::new();
        for (index, spec) in specs.into_iter().enumerate() {
            let fallback = format!("pattern-{index}");
            match PatternTemplate::from_spec(spec, &fallback) {
                Ok(template) => templates.push(template),
                Err(error) => warn!(%error, "skipping malformed pattern"),
            }
        }
        Self::from_templates(templates)
    }

    /// Parses a TOML document made of `[[pattern]]` tables.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let document: CatalogDocument = toml::from_str(source)?;
        Ok(Self::from_specs(document.patterns))
    }

    /// Catalog shipped with the game.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_templates(builtin_templates())
    }

    fn from_templates(mut templates: Vec<PatternTemplate>) -> Self {
        if templates.is_empty() {
            warn!("pattern catalog is empty, falling back to a straight track");
            templates.push(PatternTemplate::straight());
        }

        let total_weight = templates
            .iter()
            .map(|template| f64::from(template.effective_weight()))
            .sum();

        Self {
            templates,
            total_weight,
        }
    }

    /// Templates in declaration order.
    #[must_use]
    pub fn templates(&self) -> &[PatternTemplate] {
        &self.templates
    }

    /// Sum of all effective weights.
    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Picks a template for a uniform draw in `[0, 1)`.
    ///
    /// The draw is scaled by the total weight and the first template whose
    /// cumulative weight reaches it wins. Rounding that leaves every
    /// cumulative weight short of the roll selects the first template.
    #[must_use]
    pub fn select(&self, unit_roll: f64) -> &PatternTemplate {
        let roll = unit_roll.clamp(0.0, 1.0) * self.total_weight;
        let mut cumulative = 0.0;
        for template in &self.templates {
            cumulative += f64::from(template.effective_weight());
            if roll <= cumulative {
                return template;
            }
        }
        &self.templates[0]
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_templates() -> Vec<PatternTemplate> {
    let table: [(&str, &[[f32; 3]], f32, u8); 5] = [
        ("straight", &[[0.0, 0.0, 4.0]], 3.0, 1),
        ("steps", &[[0.0, 0.5, 4.0], [0.0, 1.0, 8.0]], 1.5, 1),
        (
            "zigzag",
            &[[-1.0, 0.0, 4.0], [1.0, 0.0, 8.0], [0.0, 0.0, 12.0]],
            1.0,
            2,
        ),
        ("drop", &[[0.0, -0.5, 4.0], [0.0, -1.0, 8.0]], 1.0, 2),
        ("long gap", &[[0.0, 0.0, 6.0]], 0.5, 3),
    ];

    table
        .iter()
        .map(|(name, offsets, weight, difficulty)| PatternTemplate {
            name: (*name).to_owned(),
            offsets: offsets.iter().copied().map(Vec3::from_array).collect(),
            weight: *weight,
            difficulty: *difficulty,
        })
        .collect()
}
