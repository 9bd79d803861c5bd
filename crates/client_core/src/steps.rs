use shared::{domain::StepId, protocol::ProgressStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: String,
    pub has_details: bool,
}

impl StepDefinition {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: StepId::from(id),
            title: title.to_string(),
            has_details: true,
        }
    }

    pub fn without_details(mut self) -> Self {
        self.has_details = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub title: String,
    pub state: StepState,
    /// `None` when the step has no details slot.
    pub details: Option<String>,
}

/// Stages reported by the processing backend, in pipeline order.
pub fn pipeline_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new("start", "Initialize"),
        StepDefinition::new("split", "Split PDF"),
        StepDefinition::new("analyze", "Analyze sections"),
        StepDefinition::new("extract", "Extract text"),
        StepDefinition::new("process", "Structure fields"),
        StepDefinition::new("complete", "Complete"),
    ]
}

/// Linear step indicator driven by progress reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepIndicator {
    steps: Vec<Step>,
}

impl Default for StepIndicator {
    fn default() -> Self {
        Self::new(pipeline_steps())
    }
}

impl StepIndicator {
    pub fn new(definitions: impl IntoIterator<Item = StepDefinition>) -> Self {
        let steps = definitions
            .into_iter()
            .map(|definition| Step {
                id: definition.id,
                title: definition.title,
                state: StepState::Pending,
                details: definition.has_details.then(String::new),
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn active(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|step| step.state == StepState::Active)
    }

    /// Back to all-pending with blank details.
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.state = StepState::Pending;
            if let Some(details) = step.details.as_mut() {
                details.clear();
            }
        }
    }

    /// Applies a progress report and returns the index of the active step.
    ///
    /// Styling is cleared on every step first, so a report naming an unknown
    /// step leaves the whole indicator pending. Details written by earlier
    /// reports are kept.
    pub fn apply(&mut self, status: &ProgressStatus) -> Option<usize> {
        for step in &mut self.steps {
            step.state = StepState::Pending;
        }

        let index = self.steps.iter().position(|step| step.id == status.step)?;

        let current = &mut self.steps[index];
        current.state = StepState::Active;
        if let Some(details) = current.details.as_mut() {
            details.clone_from(&status.details);
        }

        for step in &mut self.steps[..index] {
            step.state = StepState::Completed;
        }

        Some(index)
    }
}

#[cfg(test)]
#[path = "tests/steps_tests.rs"]
mod tests;
