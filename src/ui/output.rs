//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.is_styled() {
        println!("  {} {}", style("✔").green(), message);
    } else {
        println!("  [OK] {}", message);
    }
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.is_styled() {
        println!("  {} {} ({})", style("✔").green(), message, style(detail).dim());
    } else {
        println!("  [OK] {} ({})", message, detail);
    }
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.is_styled() {
        println!("  {} {} - {}", style("▲").yellow(), message, style(hint).dim());
    } else {
        println!("  [WARN] {} - {}", message, hint);
    }
}

/// Display a remark/hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.is_styled() {
        println!("  {}", style(message).dim());
    } else {
        println!("  {}", message);
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_styled() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}
