use std::rc::Rc;

use tracing::trace;

use crate::format::js_number;
use crate::host::{
    DataView, FormatterOptions, PrimitiveValue, TooltipDataItem, TooltipHideOptions,
    TooltipService, TooltipShowOptions, ValueFormatterFactory,
};
use crate::surface::{PointerEvent, PointerEventKind, ShapeId, Surface};

pub const PERCENTAGE_LABEL: &str = "actual vs target";
const COLUMN_HEADER: &str = "Tooltip";

/// One entry per metadata column, formatted with the parallel series'
/// format at precision 2, followed by the actual-vs-target percentage.
pub fn build_tooltips(
    data_view: Option<&DataView>,
    formatters: &dyn ValueFormatterFactory,
    percentage: f64,
) -> Vec<TooltipDataItem> {
    let mut items = Vec::new();

    if let Some(view) = data_view {
        for (i, column) in view.metadata.columns.iter().enumerate() {
            let series = view.categorical.values.get(i);
            let formatter = formatters.create(FormatterOptions {
                format: series.and_then(|series| series.source.format.clone()),
                precision: Some(2),
            });
            let first = series
                .and_then(|series| series.values.first())
                .cloned()
                .unwrap_or(PrimitiveValue::Null);
            let value = if column.value_type.text {
                PrimitiveValue::Text(first.to_display_string())
            } else {
                first
            };

            items.push(TooltipDataItem {
                display_name: column.display_name.clone(),
                value: formatter.format(&value),
                header: Some(COLUMN_HEADER.to_string()),
                color: Some(String::new()),
            });
        }
    }

    items.push(TooltipDataItem {
        display_name: PERCENTAGE_LABEL.to_string(),
        value: format!("{}%", js_number(percentage)),
        header: None,
        color: None,
    });
    items
}

/// Wires over/move/out on a shape to the host tooltip service. Every shape
/// shows the same list.
pub fn attach_tooltip(
    surface: &mut Surface,
    id: ShapeId,
    service: &Rc<dyn TooltipService>,
    items: &Rc<[TooltipDataItem]>,
) {
    let show = {
        let service = service.clone();
        let items = items.clone();
        Rc::new(move |event: &PointerEvent| {
            trace!(shape = ?event.shape, "tooltip show");
            service.show(TooltipShowOptions {
                data_items: &items,
                coordinates: [event.local.0, event.local.1],
                is_touch_event: false,
            });
        })
    };
    let track = {
        let service = service.clone();
        let items = items.clone();
        Rc::new(move |event: &PointerEvent| {
            service.move_to(TooltipShowOptions {
                data_items: &items,
                coordinates: [event.local.0, event.local.1],
                is_touch_event: false,
            });
        })
    };
    let hide = {
        let service = service.clone();
        Rc::new(move |_: &PointerEvent| {
            service.hide(TooltipHideOptions {
                immediately: true,
                is_touch_event: false,
            });
        })
    };

    surface.on(id, PointerEventKind::Over, show);
    surface.on(id, PointerEventKind::Move, track);
    surface.on(id, PointerEventKind::Out, hide);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DefaultFormatterFactory;
    use crate::host::{DataViewMetadataColumn, DataViewValueColumn, ValueTypeDescriptor};

    #[test]
    fn test_columns_then_percentage() {
        let view = DataView::from_values(["Target", "Forecast", "Actual"], [100.0, 80.0, 50.0], None);
        let items = build_tooltips(Some(&view), &DefaultFormatterFactory, 50.0);

        let pairs: Vec<(&str, &str)> = items
            .iter()
            .map(|item| (item.display_name.as_str(), item.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Target", "100.00"),
                ("Forecast", "80.00"),
                ("Actual", "50.00"),
                ("actual vs target", "50%"),
            ]
        );
        assert_eq!(items[0].header.as_deref(), Some("Tooltip"));
        assert_eq!(items[0].color.as_deref(), Some(""));
        assert_eq!(items[3].header, None);
    }

    #[test]
    fn test_text_column_uses_string_form() {
        let mut view = DataView::from_values(["T", "F", "A"], [1.0, 1.0, 1.0], None);
        let note = DataViewMetadataColumn {
            display_name: "Note".into(),
            value_type: ValueTypeDescriptor {
                text: true,
                numeric: false,
            },
            ..Default::default()
        };
        view.metadata.columns.push(note.clone());
        view.categorical.values.push(DataViewValueColumn {
            source: note,
            values: vec![PrimitiveValue::Number(7.5)],
        });

        let items = build_tooltips(Some(&view), &DefaultFormatterFactory, 100.0);
        assert_eq!(items[3].display_name, "Note");
        assert_eq!(items[3].value, "7.5");
    }

    #[test]
    fn test_missing_series_formats_blank() {
        let mut view = DataView::from_values(["T", "F", "A"], [1.0, 1.0, 1.0], None);
        view.categorical.values.truncate(1);
        let items = build_tooltips(Some(&view), &DefaultFormatterFactory, f64::NAN);
        assert_eq!(items[1].value, "(Blank)");
        assert_eq!(items[3].value, "NaN%");
    }

    #[test]
    fn test_no_data_view_keeps_percentage() {
        let items = build_tooltips(None, &DefaultFormatterFactory, f64::INFINITY);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, "Infinity%");
    }
}
