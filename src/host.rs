//! Types and services supplied by the hosting application.
//!
//! The widget consumes these and never implements them itself, apart from
//! the default formatter in [`crate::format`] that the demo host uses.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

// ============================================================================
// DATA VIEW
// ============================================================================

/// Size of the area the host gives the widget, in surface units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A single cell as the data-binding layer delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl PrimitiveValue {
    /// String form used when a text column is shown in a tooltip.
    pub fn to_display_string(&self) -> String {
        match self {
            PrimitiveValue::Number(n) => crate::format::js_number(*n),
            PrimitiveValue::Bool(b) => b.to_string(),
            PrimitiveValue::Text(s) => s.clone(),
            PrimitiveValue::Null => "null".to_string(),
        }
    }
}

/// Value type flags of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueTypeDescriptor {
    pub text: bool,
    pub numeric: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataViewMetadataColumn {
    pub display_name: String,
    pub query_name: Option<String>,
    pub format: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ValueTypeDescriptor,
}

/// One measure series: the column it came from and its values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataViewValueColumn {
    pub source: DataViewMetadataColumn,
    pub values: Vec<PrimitiveValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataViewCategorical {
    pub values: Vec<DataViewValueColumn>,
}

/// Property-pane objects keyed by object name, then property name.
pub type DataViewObjects = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataViewMetadata {
    pub columns: Vec<DataViewMetadataColumn>,
    pub objects: Option<DataViewObjects>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataView {
    pub metadata: DataViewMetadata,
    pub categorical: DataViewCategorical,
}

impl DataView {
    /// Parses a data view from its JSON wire form.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the data view for one reading, one series per value, with
    /// numeric columns named after the series.
    pub fn from_values(names: [&str; 3], values: [f64; 3], format: Option<&str>) -> Self {
        let columns: Vec<DataViewMetadataColumn> = names
            .iter()
            .map(|name| DataViewMetadataColumn {
                display_name: name.to_string(),
                query_name: Some(name.to_string()),
                format: format.map(str::to_string),
                value_type: ValueTypeDescriptor {
                    text: false,
                    numeric: true,
                },
            })
            .collect();
        let series = columns
            .iter()
            .zip(values)
            .map(|(column, value)| DataViewValueColumn {
                source: column.clone(),
                values: vec![PrimitiveValue::Number(value)],
            })
            .collect();

        Self {
            metadata: DataViewMetadata {
                columns,
                objects: None,
            },
            categorical: DataViewCategorical { values: series },
        }
    }
}

// ============================================================================
// LIFECYCLE OPTIONS
// ============================================================================

/// The element the widget is mounted in, as the host lays it out.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Container {
    /// Top-left corner in client coordinates.
    pub origin: (f64, f64),
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub viewport: Viewport,
    pub data_views: Vec<DataView>,
}

impl UpdateOptions {
    pub fn new(viewport: Viewport, data_view: DataView) -> Self {
        Self {
            viewport,
            data_views: vec![data_view],
        }
    }
}

pub struct ConstructorOptions {
    pub element: Container,
    pub host: VisualHost,
}

// ============================================================================
// TOOLTIPS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipDataItem {
    pub display_name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TooltipShowOptions<'a> {
    pub data_items: &'a [TooltipDataItem],
    pub coordinates: [f64; 2],
    pub is_touch_event: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooltipHideOptions {
    pub immediately: bool,
    pub is_touch_event: bool,
}

/// The host's tooltip surface.
pub trait TooltipService {
    fn show(&self, options: TooltipShowOptions<'_>);
    fn move_to(&self, options: TooltipShowOptions<'_>);
    fn hide(&self, options: TooltipHideOptions);
}

// ============================================================================
// VALUE FORMATTING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatterOptions {
    pub format: Option<String>,
    pub precision: Option<usize>,
}

pub trait ValueFormatter {
    fn format(&self, value: &PrimitiveValue) -> String;
}

pub trait ValueFormatterFactory {
    fn create(&self, options: FormatterOptions) -> Box<dyn ValueFormatter>;
}

/// Services handed to the widget at construction.
#[derive(Clone)]
pub struct VisualHost {
    pub tooltip_service: Rc<dyn TooltipService>,
    pub value_formatter: Rc<dyn ValueFormatterFactory>,
}
