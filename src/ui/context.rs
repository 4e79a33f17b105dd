//! UI context for detecting interactive vs CI environments

use std::io::IsTerminal;

/// Common CI environment indicators
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
];

/// Decides whether output gets color and decoration
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    styled: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let styled = std::io::stdout().is_terminal()
            && !CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self { styled }
    }

    /// Plain output regardless of the terminal
    pub fn plain() -> Self {
        Self { styled: false }
    }

    pub fn is_styled(&self) -> bool {
        self.styled
    }
}
