//! Loads polybar themes and bars across monitors

// monitors -> roles -> environment -> bars

#![allow(unused)]
#![deny(
    clippy::all,
    clippy::complexity,
    clippy::correctness,
    clippy::perf,
    clippy::style,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    bad_style,
    ellipsis_inclusive_range_patterns,
    exported_private_dependencies,
    ill_formed_attribute_input,
    improper_ctypes,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_abi,
    no_mangle_generic_items,
    non_shorthand_field_patterns,
    noop_method_call,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    semicolon_in_expressions_from_macros,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unreachable_pub,
    unsafe_code,
    variant_size_differences,
    while_true
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::multiple_inherent_impl,
    clippy::print_stdout,
    clippy::shadow_reuse,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::upper_case_acronyms
)]
#![cfg_attr(
    any(test),
    allow(
        clippy::expect_fun_call,
        clippy::expect_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::unwrap_used,
        clippy::wildcard_enum_match_arm,
    )
)]

mod bars;
mod cli;
mod config;
mod display;
mod environment;
mod error;
mod gaps;
mod macros;
mod theme;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;

use bars::{BarCommand, BarOutcome, Supervisor};
use cli::Opts;
use config::Config;
use display::DisplayCatalog;
use error::Error;

fn main() -> Result<()> {
    let args = Opts::parse();

    match args.color_when.as_deref() {
        Some("always") => colored::control::set_override(true),
        Some("never") => colored::control::set_override(false),
        _ => {},
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(Config::default_path);
    let mut config = args
        .config
        .as_ref()
        .map_or_else(Config::load_default, Config::load)?;

    let _logger = utils::initialize_logging(&config, &args)?;
    log::debug!("{}: {:#?}", "Configuration options".bright_blue(), config);

    run(&args, &mut config, &config_path)
}

/// Resolve the theme and monitor topology, then hand the bars to the
/// [`Supervisor`]
fn run(args: &Opts, config: &mut Config, config_path: &Path) -> Result<()> {
    let themes_root = config.themes_root()?;
    let installed = theme::installed_themes(&themes_root)?;

    if args.list {
        for name in &installed {
            println!("{}", name);
        }
        return Ok(());
    }

    let selected = if args.select {
        theme::select_theme(&installed)?
    } else if let Some(theme) = &args.theme {
        theme.clone()
    } else {
        let theme = config.polybar.theme.clone();
        log::info!("no theme specified, reloading default: {}", theme.green());
        theme
    };

    if !installed.iter().any(|t| *t == selected) {
        return Err(Error::UnknownTheme(selected).into());
    }

    // Record the selection so a later bare invocation reloads it
    if selected != config.polybar.theme {
        config.polybar.theme = selected.clone();
        config.save(config_path)?;
    }

    let theme = config
        .polybar
        .themes
        .get(&selected)
        .cloned()
        .with_context(|| format!("theme '{}' has no entry under polybar.themes", selected))?;
    let theme_config = themes_root.join(&selected).join(theme::THEME_CONFIG);

    // The theme's bars and the monitor layout are resolved before
    // anything is spawned; either failing aborts with nothing launched
    let catalog = DisplayCatalog::enumerate()?;
    let bar_names = theme::resolve_bars(&theme, &theme_config)?;
    let env = environment::build(&catalog, &theme_config);

    gaps::adjust(&theme.gaps, &config.i3wm.default_gaps);

    if which::which("polybar").is_err() {
        log::warn!("polybar binary was not found in PATH");
    }

    let supervisor = Supervisor::new(BarCommand::polybar(), config.polybar.kill_scope);
    let reports = supervisor.run(&bar_names, &env);

    let mut failed = 0_usize;
    for report in &reports {
        match &report.outcome {
            BarOutcome::Completed { status, stderr, .. } if !status.success() => {
                failed += 1;
                polyctl_error!("bar '{}' exited with {}:\n{}", report.bar, status, stderr);
            },
            BarOutcome::Failed { error } => {
                failed += 1;
                polyctl_error!("bar '{}' never ran: {}", report.bar, error);
            },
            BarOutcome::Completed { .. } => {},
        }
    }

    if failed > 0 {
        polyctl_error!("{} of {} bars failed", failed, reports.len());
    }

    Ok(())
}
