//! Per-material outcome collection for the import summary. Failures and
//! warnings are gathered while processing and printed once at the end, so a
//! bad material never interrupts the batch.

#[derive(Debug)]
pub enum MaterialOutcome {
    Processed {
        directives: usize,
        warnings: Vec<String>,
        notes: Vec<String>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Default)]
pub struct BatchReport {
    entries: Vec<(String, MaterialOutcome)>,
}

impl BatchReport {
    pub fn new() -> BatchReport {
        BatchReport::default()
    }

    pub fn record(&mut self, material: impl Into<String>, outcome: MaterialOutcome) {
        self.entries.push((material.into(), outcome));
    }

    pub fn processed(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, MaterialOutcome::Processed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.processed()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per material, with warnings and notes indented beneath it.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for (name, outcome) in &self.entries {
            match outcome {
                MaterialOutcome::Processed {
                    directives,
                    warnings,
                    notes,
                } => {
                    lines.push(format!("{name}: processed, {directives} directive(s)"));
                    for w in warnings {
                        lines.push(format!("  warning: {w}"));
                    }
                    for n in notes {
                        lines.push(format!("  note: {n}"));
                    }
                }
                MaterialOutcome::Failed { error } => {
                    lines.push(format!("{name}: failed, {error}"));
                }
            }
        }
        lines.join("\n")
    }
}
