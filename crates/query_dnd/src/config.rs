use serde::Deserialize;

const DEFAULT_ROW_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// How far, in multiples of the dragged ghost's height, the pointer may
    /// stray vertically from the drop preview before leaving an anchor clears
    /// the preview.
    pub row_tolerance: f32,
    /// Whether whole groups can be picked up, not only conditions.
    pub allow_group_drag: bool,
    /// Ask for focus back on the source's drag handle when a keyboard drag
    /// is cancelled.
    pub restore_focus_on_cancel: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            row_tolerance: DEFAULT_ROW_TOLERANCE,
            allow_group_drag: true,
            restore_focus_on_cancel: true,
        }
    }
}

impl DragConfig {
    pub fn row_tolerance(mut self, row_tolerance: f32) -> Self {
        self.row_tolerance = if row_tolerance.is_finite() && row_tolerance >= 0. {
            row_tolerance
        } else {
            DEFAULT_ROW_TOLERANCE
        };
        self
    }

    pub fn allow_group_drag(mut self, allow_group_drag: bool) -> Self {
        self.allow_group_drag = allow_group_drag;
        self
    }

    pub fn restore_focus_on_cancel(mut self, restore_focus_on_cancel: bool) -> Self {
        self.restore_focus_on_cancel = restore_focus_on_cancel;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(s)?;
        let row_tolerance = config.row_tolerance;
        Ok(config.row_tolerance(row_tolerance))
    }
}
