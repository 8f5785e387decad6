use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::animation::Easing;
use crate::host::DataView;
use crate::{Error, Result};

/// Color representation for gauge elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb` or `#rrggbb`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let invalid = || Error::InvalidColor(hex.to_string());
        let digits = hex.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..=i].repeat(2));
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Resolves a host fill, falling back to black like an SVG fill would.
    pub fn from_fill(fill: &str) -> Self {
        Self::from_hex(fill).unwrap_or_else(|err| {
            warn!(%err, "unusable fill, drawing black");
            Self::BLACK
        })
    }
}

// ============================================================================
// WIDGET CONFIGURATION
// ============================================================================

/// Settings chosen by the application embedding the widget, as opposed to
/// the host's property pane.
#[derive(Debug, Clone, Builder)]
pub struct WidgetConfig {
    #[builder(default = 2000)]
    pub animation_duration_ms: u64,
    #[builder(default = Easing::Linear)]
    pub easing: Easing,

    // Label
    #[builder(default = "Segoe UI".to_string())]
    pub label_font_family: String,
    #[builder(default = Color::BLACK)]
    pub label_color: Color,
    #[builder(default = true)]
    pub label_bold: bool,

    #[builder(default = Color::WHITE)]
    pub background_color: Color,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl WidgetConfig {
    pub fn animation_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.animation_duration_ms)
    }
}

// ============================================================================
// PROPERTY PANE SETTINGS
// ============================================================================

/// Object name the settings live under in `metadata.objects`.
pub const SETTINGS_OBJECT: &str = "myCustomObject";

/// The `myCustomObject` property-pane object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircleSettings {
    #[serde(deserialize_with = "deserialize_fill")]
    pub fill_target: String,
    #[serde(deserialize_with = "deserialize_fill")]
    pub fill_forecasted: String,
    #[serde(deserialize_with = "deserialize_fill")]
    pub fill_actual: String,
    pub font_size: f64,
}

impl Default for CircleSettings {
    fn default() -> Self {
        Self {
            fill_target: "#01B8AA".to_string(),
            fill_forecasted: "#FD625E".to_string(),
            fill_actual: "#374649".to_string(),
            font_size: 20.0,
        }
    }
}

/// Fills arrive either as a bare string or wrapped as `{ "solid": { "color" } }`.
fn deserialize_fill<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Solid {
        color: String,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Fill {
        Plain(String),
        Solid { solid: Solid },
    }

    Ok(match Fill::deserialize(deserializer)? {
        Fill::Plain(color) => color,
        Fill::Solid { solid } => solid.color,
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualSettings {
    pub kpi_circle: CircleSettings,
}

/// Defaults reported before the first update has parsed anything.
pub static DEFAULT_SETTINGS: std::sync::LazyLock<VisualSettings> =
    std::sync::LazyLock::new(VisualSettings::default);

impl VisualSettings {
    /// Reads the settings object from a data view. Anything missing or
    /// malformed falls back to the defaults.
    pub fn parse(data_view: Option<&DataView>) -> Self {
        let Some(object) = data_view
            .and_then(|view| view.metadata.objects.as_ref())
            .and_then(|objects| objects.get(SETTINGS_OBJECT))
        else {
            return Self::default();
        };

        match CircleSettings::deserialize(object) {
            Ok(kpi_circle) => Self { kpi_circle },
            Err(err) => {
                warn!(%err, object = SETTINGS_OBJECT, "ignoring malformed settings");
                Self::default()
            }
        }
    }

    /// Flat pass-through of the requested object's properties.
    pub fn enumerate_object_instances(&self, object_name: &str) -> Vec<VisualObjectInstance> {
        if object_name != SETTINGS_OBJECT {
            return Vec::new();
        }
        let properties = match serde_json::to_value(&self.kpi_circle) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        vec![VisualObjectInstance {
            object_name: SETTINGS_OBJECT.to_string(),
            selector: None,
            properties,
        }]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumerateVisualObjectInstancesOptions {
    pub object_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualObjectInstance {
    pub object_name: String,
    pub selector: Option<serde_json::Value>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}
