use serde::Serialize;

/// Auxiliary steps whose failure never fails the enclosing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ApiKeys,
    InlineProperty,
    WelcomeEmail,
    AccountantCleanup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub step: Step,
    pub message: String,
}

/// The primary result of an operation plus any advisory warnings raised by
/// best-effort steps along the way.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    #[serde(flatten)]
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn has_warning(&self, step: Step) -> bool {
        self.warnings.iter().any(|w| w.step == step)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Collects warnings while an operation runs. Every warning is logged at the
/// point it is recorded.
#[derive(Debug, Default)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(step = ?step, %message, "best-effort step failed");
        self.0.push(Warning { step, message });
    }

    pub fn finish<T>(self, value: T) -> Outcome<T> {
        Outcome::with_warnings(value, self.0)
    }
}
