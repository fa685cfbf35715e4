//! Translation call extraction from parsed Go packages.

use std::path::Path;
use tree_sitter::Node;

use crate::fs::relative_display_path;
use crate::go_source::{GoFile, GoPackage};
use crate::go_types::{node_text, PackageScope, TypeEnv};
use crate::logging;
use crate::registry::{ArgRole, Registry};
use crate::unit::{format_position, TranslationUnit};

/// What to do with a call expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch<'r> {
    /// Not a translation call; keep walking.
    Continue,
    /// A translation call with these argument roles.
    CollectArguments(&'r [ArgRole]),
}

/// String fields captured from a translation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFields {
    pub singular: String,
    pub plural: String,
    pub context: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentScan {
    Complete(CallFields),
    /// An argument in a non-skip role is not a string literal.
    Mismatch,
    /// Fewer arguments than roles.
    Incomplete,
}

/// Contents of a string literal node with the delimiters removed.
/// Escape sequences are kept as written.
fn string_literal<'s>(node: Node, source: &'s [u8]) -> Option<&'s str> {
    match node.kind() {
        "interpreted_string_literal" | "raw_string_literal" => {
            let text = node_text(node, source);
            (text.len() >= 2).then(|| &text[1..text.len() - 1])
        }
        _ => None,
    }
}

/// Match call arguments against `roles` position by position.
/// Arguments past the last role are ignored.
pub fn scan_arguments(roles: &[ArgRole], args: &[Node], source: &[u8]) -> ArgumentScan {
    let mut fields = CallFields::default();
    for (idx, role) in roles.iter().enumerate() {
        let Some(arg) = args.get(idx) else {
            return ArgumentScan::Incomplete;
        };
        if *role == ArgRole::Skip {
            continue;
        }
        let Some(text) = string_literal(*arg, source) else {
            return ArgumentScan::Mismatch;
        };
        let slot = match role {
            ArgRole::Singular => &mut fields.singular,
            ArgRole::Plural => &mut fields.plural,
            ArgRole::Context => &mut fields.context,
            ArgRole::Domain => &mut fields.domain,
            ArgRole::Skip => continue,
        };
        *slot = text.to_string();
    }
    ArgumentScan::Complete(fields)
}

struct CallVisitor<'a> {
    registry: &'a Registry,
    env: TypeEnv<'a>,
    source: &'a [u8],
    path: String,
    units: Vec<TranslationUnit>,
}

impl<'a> CallVisitor<'a> {
    fn dispatch(&self, call: Node) -> Dispatch<'a> {
        let Some(function) = call.child_by_field_name("function") else {
            return Dispatch::Continue;
        };
        let registry = self.registry;
        self.env
            .callee_candidates(function, self.source)
            .iter()
            .find_map(|callee| registry.lookup(&callee.full_name, &callee.name))
            .map_or(Dispatch::Continue, Dispatch::CollectArguments)
    }

    fn collect(&mut self, call: Node, roles: &[ArgRole]) {
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return;
        };
        let mut cursor = arguments.walk();
        let args: Vec<Node> = arguments
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();

        let line = arguments.start_position().row + 1;
        let position = format_position(&self.path, line);
        match scan_arguments(roles, &args, self.source) {
            ArgumentScan::Complete(fields) => {
                logging::debug(&format!("{}: {}", position, fields.singular));
                self.units.push(
                    TranslationUnit::new(position, fields.singular)
                        .with_plural(fields.plural)
                        .with_context(fields.context)
                        .with_domain(fields.domain),
                );
            }
            ArgumentScan::Mismatch => {
                logging::debug(&format!("{}: skipped call with non-literal argument", position));
            }
            ArgumentScan::Incomplete => {
                logging::debug(&format!("{}: skipped call with too few arguments", position));
            }
        }
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "function_declaration" | "method_declaration" | "func_literal" => {
                self.env.push_scope();
                for field in ["receiver", "parameters"] {
                    if let Some(list) = node.child_by_field_name(field) {
                        self.env.declare_parameters(list, self.source);
                    }
                }
                self.visit_children(node);
                self.env.pop_scope();
                return;
            }
            "block" => {
                self.env.push_scope();
                self.visit_children(node);
                self.env.pop_scope();
                return;
            }
            "short_var_declaration" | "var_declaration" => {
                self.visit_children(node);
                if self.env.in_function() {
                    self.env.declare_statement(node, self.source);
                }
                return;
            }
            "call_expression" => {
                if let Dispatch::CollectArguments(roles) = self.dispatch(node) {
                    self.collect(node, roles);
                }
            }
            _ => {}
        }
        self.visit_children(node);
    }

    fn visit_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }
}

fn extract_from_file(
    file: &GoFile,
    scope: &PackageScope,
    registry: &Registry,
    base: &Path,
) -> Vec<TranslationUnit> {
    let mut visitor = CallVisitor {
        registry,
        env: TypeEnv::new(scope, file),
        source: file.source.as_bytes(),
        path: relative_display_path(&file.path, base),
        units: Vec::new(),
    };
    visitor.visit(file.tree.root_node());
    visitor.units
}

/// Extract translation units from every file of `package`. Positions are
/// relative to `base`.
pub fn extract_from_package(
    package: &GoPackage,
    registry: &Registry,
    base: &Path,
) -> Vec<TranslationUnit> {
    let scope = PackageScope::collect(&package.import_path, &package.files);
    package
        .files
        .iter()
        .flat_map(|file| extract_from_file(file, &scope, registry, base))
        .collect()
}

/// Extract from a single source text, treated as a package of its own with
/// the given import path.
pub fn extract_from_source(
    source: &str,
    path: &str,
    import_path: &str,
    registry: &Registry,
) -> anyhow::Result<Vec<TranslationUnit>> {
    let file = GoFile::from_source(path.into(), source.to_string())?;
    let scope = PackageScope::collect(import_path, std::slice::from_ref(&file));
    Ok(extract_from_file(&file, &scope, registry, Path::new("")))
}
