/// Outcome of a mutating operation: how many changes it applied.
///
/// A summary with a count of zero means the operation was a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    number_of_changes: usize,
}

impl ChangeSummary {
    pub fn new(number_of_changes: usize) -> Self {
        Self { number_of_changes }
    }

    pub fn unchanged() -> Self {
        Self::new(0)
    }

    pub fn changed() -> Self {
        Self::new(1)
    }

    pub fn from_changed(changed: bool) -> Self {
        Self::new(usize::from(changed))
    }

    pub fn is_changed(&self) -> bool {
        self.number_of_changes > 0
    }

    pub fn number_of_changes(&self) -> usize {
        self.number_of_changes
    }

    /// Adds the changes of `other` to this summary.
    pub fn merge(&mut self, other: ChangeSummary) {
        self.number_of_changes += other.number_of_changes;
    }
}
