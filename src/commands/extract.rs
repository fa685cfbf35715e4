use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::catalog::{CatalogReport, CatalogStore};
use crate::config::Config;
use crate::fs::{compile_ignore_patterns, display_path};
use crate::go_source::load_packages;
use crate::go_visitor::extract_from_package;
use crate::logging;
use crate::template;
use crate::writer::CatalogWriter;

/// Counts reported after a run.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub packages: usize,
    pub go_units: usize,
    pub template_units: usize,
    /// Units collected per domain
    pub domains: BTreeMap<String, usize>,
    pub catalogs: Vec<CatalogReport>,
}

pub fn run(config: &Config) -> Result<ExtractSummary> {
    config.validate()?;
    let registry = config.registry()?;
    let ignore = compile_ignore_patterns(&config.ignore)?;

    logging::debug(&format!("package paths: {:?}", config.package_paths));
    logging::debug(&format!("template paths: {:?}", config.template_paths));
    logging::debug(&format!("languages: {:?}", config.languages));

    let mut summary = ExtractSummary::default();
    let mut store = CatalogStore::new();

    for package_path in &config.package_paths {
        let base = std::path::absolute(package_path)
            .with_context(|| format!("Cannot get absolute path of {}", package_path))?;
        let packages = load_packages(&base, config.recursive, &ignore)?;
        for package in &packages {
            let units = extract_from_package(package, &registry, &base);
            logging::debug(&format!(
                "{}: {} message(s)",
                display_path(&package.dir),
                units.len()
            ));
            summary.go_units += units.len();
            store.extend(units);
        }
        summary.packages += packages.len();
    }

    for template_path in &config.template_paths {
        let units =
            template::extract_from_dir(template_path, &config.template_extensions, &ignore)?;
        summary.template_units += units.len();
        store.extend(units);
    }

    if store.is_empty() {
        logging::warn("No translatable strings found");
    }
    for domain in store.domains() {
        summary
            .domains
            .insert(domain.to_string(), store.units(domain).len());
    }

    let writer = CatalogWriter::new(config.backend.create());
    summary.catalogs = store.materialize(Path::new(&config.output), &config.languages, &writer)?;

    report(&summary);
    Ok(summary)
}

fn report(summary: &ExtractSummary) {
    logging::info(&format!(
        "Scanned {} package(s): {} message(s); templates: {} message(s)",
        summary.packages, summary.go_units, summary.template_units
    ));
    for (domain, count) in &summary.domains {
        logging::info(&format!("  {}: {} message(s)", domain, count));
    }
    for catalog in &summary.catalogs {
        logging::info(&format!(
            "  {} {}",
            catalog.outcome.as_str(),
            display_path(&catalog.path)
        ));
    }
}
