//! Pie chart dataset derived from the filtered items.

use crate::types::InventoryItem;
use serde::{Deserialize, Serialize};

/// Label of the single quantity dataset.
pub const DATASET_LABEL: &str = "Quantity";

/// Hue step between consecutive slices, in degrees.
const HUE_STEP: usize = 45;

/// Everything a pie renderer needs: one label per slice and one dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<PieDataset>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieDataset {
    pub label: String,
    pub data: Vec<i64>,
    pub background_color: Vec<String>,
    pub border_width: u32,
}

impl PieChartData {
    /// Build the dataset for a list of items, in list order.
    pub fn from_items(items: &[InventoryItem]) -> Self {
        let labels = items.iter().map(|item| item.id.clone()).collect();
        let data = items.iter().map(|item| item.quantity).collect();
        let background_color = (0..items.len()).map(slice_color).collect();

        Self {
            labels,
            datasets: vec![PieDataset {
                label: DATASET_LABEL.to_string(),
                data,
                background_color,
                border_width: 1,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// CSS color for the slice at `index`. Hues wrap past 360 the way CSS does.
pub fn slice_color(index: usize) -> String {
    format!("hsl({}, 70%, 50%)", index * HUE_STEP)
}
