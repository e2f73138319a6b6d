use crate::error::DragError;
use crate::resolve::DropTarget;
use crate::tree::ItemId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

/// Walks the drop locations of a keyboard drag one key press at a time.
///
/// The cursor starts on the slot right under the dragged item. That slot and
/// the one right above it render the preview where the item already is, so a
/// press that lands there steps once more in the same direction.
#[derive(Debug, Clone)]
pub struct KeyboardStepper {
    locations: Vec<DropTarget>,
    initial_index: usize,
    current_index: usize,
    first_step: bool,
}

impl KeyboardStepper {
    /// Fails when `source` has no slot of its own in `locations`, which means
    /// the list was built from a tree that no longer holds it.
    pub fn new(locations: Vec<DropTarget>, source: ItemId) -> Result<Self, DragError> {
        let initial_index = locations
            .iter()
            .position(|location| *location == DropTarget::Under(source))
            .ok_or(DragError::StaleSource(source))?;
        Ok(Self {
            locations,
            initial_index,
            current_index: initial_index,
            first_step: true,
        })
    }

    pub fn locations(&self) -> &[DropTarget] {
        &self.locations
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[inline]
    pub fn initial_index(&self) -> usize {
        self.initial_index
    }

    /// Net displacement from the starting slot.
    pub fn step_offset(&self) -> isize {
        self.current_index as isize - self.initial_index as isize
    }

    #[inline]
    pub fn is_first_step(&self) -> bool {
        self.first_step
    }

    pub fn current(&self) -> DropTarget {
        self.locations[self.current_index]
    }

    /// Advance one press. Returns the new target, or `None` when the press
    /// would leave the list (the cursor stays put).
    pub fn step(&mut self, direction: StepDirection) -> Option<DropTarget> {
        let last = self.locations.len().saturating_sub(1);
        let mut moved = None;
        loop {
            let next = match direction {
                StepDirection::Up => self.current_index.saturating_sub(1),
                StepDirection::Down => (self.current_index + 1).min(last),
            };
            if next == self.current_index && !self.first_step {
                return moved;
            }

            self.current_index = next;
            moved = Some(self.current());

            let on_origin = next == self.initial_index
                || (self.first_step && next + 1 == self.initial_index);
            self.first_step = false;
            if !on_origin {
                return moved;
            }
        }
    }
}
