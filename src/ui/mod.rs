//! Terminal output helpers
//!
//! Commands report progress through these functions so output stays
//! consistent, with color only when stdout is an interactive terminal.
//!
//! ```rust,ignore
//! use scarlet::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::step_ok_detail(&ctx, "Rendered PW01", "PW01.png");
//! ui::step_warn_hint(&ctx, "Config already exists", "Use --force to overwrite");
//! ```

mod context;
mod output;

pub use context::UiContext;
pub use output::{key_value, remark, step_ok, step_ok_detail, step_warn_hint};
