use crate::types::Detection;

/// Bridges short runs of empty frames by re-emitting the last non-empty
/// output, up to `limit` consecutive empty frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmptyStreakFallback {
    last: Vec<Detection>,
    streak: u32,
}

impl EmptyStreakFallback {
    pub fn resolve(&mut self, output: Vec<Detection>, limit: u32) -> Vec<Detection> {
        if !output.is_empty() {
            self.last.clone_from(&output);
            self.streak = 0;
            return output;
        }

        if !self.last.is_empty() && self.streak < limit {
            self.streak += 1;
            return self.last.clone();
        }

        self.streak = 0;
        self.last.clear();
        Vec::new()
    }

    /// Last non-empty output still eligible for re-emission.
    pub fn last(&self) -> &[Detection] {
        &self.last
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }
}
