use crate::pipeline::StepAction;

#[derive(Debug, Clone)]
pub struct StepMetrics {
    pub index: usize,
    pub name: String,
    pub action: StepAction,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub total_duration_ms: u128,
    pub steps: Vec<StepMetrics>,
}

impl PipelineMetrics {
    pub fn step_duration_ms(&self, name: &str) -> Option<u128> {
        self.steps
            .iter()
            .find(|step| step.name == name)
            .map(|step| step.duration_ms)
    }

    /// Names of the steps that ran, in execution order.
    pub fn steps_run(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    pub fn log_summary(&self) {
        for step in &self.steps {
            tracing::debug!(
                index = step.index,
                step = %step.name,
                action = ?step.action,
                duration_ms = step.duration_ms as u64,
                "Step finished"
            );
        }
        tracing::info!(
            steps = self.steps.len(),
            total_duration_ms = self.total_duration_ms as u64,
            "Pipeline finished"
        );
    }
}
