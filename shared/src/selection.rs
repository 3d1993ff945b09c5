/// Transition applied by [`Selection::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Selected,
    Unselected,
}

/// Ordered set of selected region codes. Order is selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    codes: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `code` unless it is already selected. Returns whether it was added.
    pub fn select(&mut self, code: &str) -> bool {
        if self.is_selected(code) {
            return false;
        }
        self.codes.push(code.to_string());
        true
    }

    /// Remove `code`, keeping the order of the rest. Returns whether it was present.
    pub fn unselect(&mut self, code: &str) -> bool {
        let before = self.codes.len();
        self.codes.retain(|existing| existing != code);
        self.codes.len() != before
    }

    pub fn toggle(&mut self, code: &str) -> SelectionChange {
        if self.unselect(code) {
            SelectionChange::Unselected
        } else {
            self.select(code);
            SelectionChange::Selected
        }
    }

    pub fn is_selected(&self, code: &str) -> bool {
        self.codes.iter().any(|existing| existing == code)
    }

    pub fn all_selected(&self) -> &[String] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn clear(&mut self) {
        self.codes.clear();
    }
}
