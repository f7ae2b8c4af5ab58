//! Command: list domains, their settings and presets.
use std::fmt::Write as _;

use crate::domains::{Domain, StoreKind, Target};
use crate::setting::Constraint;

/// Print every domain to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    print!("{}", render());
}

/// Text listing of every domain.
#[must_use]
pub fn render() -> String {
    let mut out = String::new();
    for domain in Domain::all() {
        let spec = domain.spec();
        let scope = match spec.target {
            Target::Machine { .. } => "machine",
            Target::PerResource(_) => "per adapter",
            Target::Keys(_) => "per service",
        };
        let store = match spec.store {
            StoreKind::Registry => "registry",
            StoreKind::Netsh => "netsh",
        };
        let _ = writeln!(out, "{} - {} ({scope}, {store})", spec.name, spec.title);
        for setting in spec.settings {
            let _ = writeln!(
                out,
                "    {:<28}{}{}",
                setting.name,
                setting.description,
                constraints(setting.constraints)
            );
        }
        for preset in spec.presets {
            let marker = if preset.name == spec.default_preset {
                " (default)"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "    --preset {:<19}{}{marker}",
                preset.name, preset.description
            );
        }
    }
    out
}

fn constraints(list: &[Constraint]) -> String {
    list.iter()
        .filter_map(|c| match c {
            Constraint::Range { min, max } => Some(format!(" [{min}..={max}]")),
            Constraint::OneOf(values) => Some(format!(" [{}]", values.join("|"))),
            Constraint::Ipv4List => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_domain() {
        let text = render();
        for domain in Domain::all() {
            assert!(
                text.lines().any(|l| l.starts_with(domain.name())),
                "missing {domain}"
            );
        }
    }

    #[test]
    fn shows_bounds_and_default_preset() {
        let text = render();
        assert!(text.contains("[576..=9000]"));
        assert!(text.contains("--preset optimized"));
        let default_line = text
            .lines()
            .find(|l| l.contains("--preset cloudflare"))
            .unwrap_or_default();
        assert!(default_line.ends_with("(default)"));
    }
}
