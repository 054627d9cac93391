//! dialoguer menus, plain list or type-to-filter

use dialoguer::theme::ColorfulTheme;
use dialoguer::{FuzzySelect, Select};

use crate::types::MenuItem;

/// Show `items` and return the chosen value; `None` on Esc or an empty menu
pub fn pick<T: Clone>(items: &[MenuItem<T>], prompt: &str, fuzzy: bool) -> Option<T> {
    if items.is_empty() {
        return None;
    }

    let theme = ColorfulTheme::default();
    let selection = if fuzzy {
        // Colour codes would be matched as text, so filter on plain labels
        let labels: Vec<String> = items.iter().map(|i| strip_ansi(&i.label)).collect();
        FuzzySelect::with_theme(&theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
    } else {
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        Select::with_theme(&theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
    };

    let index = selection.ok().flatten()?;
    items.get(index).map(|item| item.value.clone())
}

/// Remove ANSI escape sequences from a label
fn strip_ansi(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI sequences end with a letter
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
