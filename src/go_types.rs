//! Best-effort type resolution for Go call sites.
//!
//! There is no type checker here. Callee identities are recovered from import
//! tables, declared variable types and a few inference rules (composite
//! literals, `&T{}`, `new(T)`, `NewT()` constructors), which covers the way
//! translation helpers are normally obtained and called.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tree_sitter::Node;

use crate::go_source::GoFile;

/// A named type, possibly behind a pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoType {
    pub package: String,
    pub name: String,
    pub pointer: bool,
}

impl GoType {
    fn named(package: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            name: name.to_string(),
            pointer: false,
        }
    }

    fn pointer(mut self) -> Self {
        self.pointer = true;
        self
    }

    /// Fully-qualified method names, the pointer receiver form first.
    pub fn method_names(&self, method: &str) -> [String; 2] {
        [
            format!("(*{}.{}).{}", self.package, self.name, method),
            format!("({}.{}).{}", self.package, self.name, method),
        ]
    }
}

/// One possible identity of a callee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callee {
    pub full_name: String,
    pub name: String,
}

/// Declarations visible across all files of a package.
#[derive(Debug, Default)]
pub struct PackageScope {
    pub import_path: String,
    pub variables: HashMap<String, GoType>,
    pub functions: HashSet<String>,
}

impl PackageScope {
    pub fn collect(import_path: &str, files: &[GoFile]) -> Self {
        let mut scope = Self {
            import_path: import_path.to_string(),
            ..Self::default()
        };

        for file in files {
            let root = file.tree.root_node();
            let source = file.source.as_bytes();
            let imports = Imports::read(root, source);
            let mut cursor = root.walk();
            for node in root.named_children(&mut cursor) {
                match node.kind() {
                    "function_declaration" => {
                        if let Some(name) = node.child_by_field_name("name") {
                            scope.functions.insert(node_text(name, source).to_string());
                        }
                    }
                    "var_declaration" => {
                        let env = TypeEnv::with_imports(&scope, imports.clone());
                        let mut declared = Vec::new();
                        env.var_declaration(node, source, &mut declared);
                        for (name, ty) in declared {
                            if let Some(ty) = ty {
                                scope.variables.insert(name, ty);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        scope
    }
}

/// Import table of one file.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    aliases: HashMap<String, String>,
    dot: Vec<String>,
}

fn version_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v[0-9]+$").expect("valid version suffix regex"))
}

/// Name a package is referred to by when imported without an alias.
///
/// `example.com/mod/v2` is `mod`, `gopkg.in/yaml.v3` is `yaml`.
pub fn default_package_name(import_path: &str) -> &str {
    let mut segments = import_path.rsplit('/');
    let last = segments.next().unwrap_or(import_path);
    let last = if version_suffix().is_match(last) {
        segments.next().unwrap_or(last)
    } else {
        last
    };
    match last.rsplit_once('.') {
        Some((name, version)) if version_suffix().is_match(version) => name,
        _ => last,
    }
}

impl Imports {
    pub fn read(root: Node, source: &[u8]) -> Self {
        let mut imports = Self::default();
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            if decl.kind() == "import_declaration" {
                imports.read_declaration(decl, source);
            }
        }
        imports
    }

    fn read_declaration(&mut self, node: Node, source: &[u8]) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => self.read_spec(child, source),
                "import_spec_list" => self.read_declaration(child, source),
                _ => {}
            }
        }
    }

    fn read_spec(&mut self, spec: Node, source: &[u8]) {
        let Some(path) = spec.child_by_field_name("path") else {
            return;
        };
        let path = strip_quotes(node_text(path, source)).to_string();
        match spec.child_by_field_name("name") {
            Some(name) if name.kind() == "dot" => self.dot.push(path),
            Some(name) if name.kind() == "blank_identifier" => {}
            Some(name) => {
                self.aliases.insert(node_text(name, source).to_string(), path);
            }
            None => {
                let name = default_package_name(&path).to_string();
                self.aliases.insert(name, path);
            }
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }
}

pub(crate) fn node_text<'s>(node: Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

fn strip_quotes(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

const PREDECLARED_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32",
    "float64", "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr",
];

/// Name resolution state while walking one file.
pub struct TypeEnv<'p> {
    package: &'p PackageScope,
    imports: Imports,
    /// Innermost last. `None` marks a variable of unknown type.
    scopes: Vec<HashMap<String, Option<GoType>>>,
}

impl<'p> TypeEnv<'p> {
    pub fn new(package: &'p PackageScope, file: &GoFile) -> Self {
        let imports = Imports::read(file.tree.root_node(), file.source.as_bytes());
        Self::with_imports(package, imports)
    }

    fn with_imports(package: &'p PackageScope, imports: Imports) -> Self {
        Self {
            package,
            imports,
            scopes: Vec::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn in_function(&self) -> bool {
        !self.scopes.is_empty()
    }

    fn declare(&mut self, name: String, ty: Option<GoType>) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, ty);
        }
    }

    /// `Some(ty)` when `name` is a variable in scope, with its type if known.
    fn variable(&self, name: &str) -> Option<Option<&GoType>> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Some(ty.as_ref());
            }
        }
        self.package.variables.get(name).map(Some)
    }

    /// Declare the names of a `parameter_list` (parameters or receiver).
    pub fn declare_parameters(&mut self, list: Node, source: &[u8]) {
        let mut cursor = list.walk();
        let params: Vec<Node> = list.named_children(&mut cursor).collect();
        for param in params {
            let ty = match param.kind() {
                "parameter_declaration" => param
                    .child_by_field_name("type")
                    .and_then(|t| self.type_of(t, source)),
                "variadic_parameter_declaration" => None,
                _ => continue,
            };
            let mut names_cursor = param.walk();
            let names: Vec<String> = param
                .children_by_field_name("name", &mut names_cursor)
                .map(|n| node_text(n, source).to_string())
                .collect();
            for name in names {
                self.declare(name, ty.clone());
            }
        }
    }

    /// Record the variables introduced by a declaration statement.
    pub fn declare_statement(&mut self, node: Node, source: &[u8]) {
        let mut declared = Vec::new();
        match node.kind() {
            "short_var_declaration" => {
                let left = node.child_by_field_name("left");
                let right = node.child_by_field_name("right");
                if let (Some(left), Some(right)) = (left, right) {
                    self.assign(left, Some(right), None, source, &mut declared);
                }
            }
            "var_declaration" => self.var_declaration(node, source, &mut declared),
            _ => {}
        }
        for (name, ty) in declared {
            self.declare(name, ty);
        }
    }

    fn var_declaration(&self, node: Node, source: &[u8], out: &mut Vec<(String, Option<GoType>)>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "var_spec" => {
                    let ty = child
                        .child_by_field_name("type")
                        .and_then(|t| self.type_of(t, source));
                    let value = child.child_by_field_name("value");
                    self.assign(child, value, ty, source, out);
                }
                "var_spec_list" => self.var_declaration(child, source, out),
                _ => {}
            }
        }
    }

    /// Pair declared names with the types of their values. When the counts
    /// differ (a multi-value call) only the first name gets the call's type.
    fn assign(
        &self,
        names: Node,
        values: Option<Node>,
        declared_type: Option<GoType>,
        source: &[u8],
        out: &mut Vec<(String, Option<GoType>)>,
    ) {
        let mut cursor = names.walk();
        let names: Vec<Node> = if names.kind() == "var_spec" {
            names.children_by_field_name("name", &mut cursor).collect()
        } else {
            names
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "identifier")
                .collect()
        };

        let mut values_found = Vec::new();
        if let Some(list) = values {
            let mut cursor = list.walk();
            values_found.extend(
                list.named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment"),
            );
        }
        let values = values_found;

        for (idx, name) in names.iter().enumerate() {
            let ty = declared_type.clone().or_else(|| {
                let value = if values.len() == names.len() {
                    values.get(idx)
                } else if idx == 0 {
                    values.first()
                } else {
                    None
                };
                value.and_then(|v| self.expression_type(*v, source))
            });
            out.push((node_text(*name, source).to_string(), ty));
        }
    }

    fn own_type(&self, name: &str) -> Option<GoType> {
        (!self.package.import_path.is_empty())
            .then(|| GoType::named(&self.package.import_path, name))
    }

    fn qualified(&self, package: &str, name: &str) -> Option<GoType> {
        if self.variable(package).is_some() {
            return None;
        }
        self.imports
            .resolve(package)
            .map(|path| GoType::named(path, name))
    }

    /// Resolve a type expression.
    pub fn type_of(&self, node: Node, source: &[u8]) -> Option<GoType> {
        match node.kind() {
            "pointer_type" => {
                let mut cursor = node.walk();
                let inner = node.named_children(&mut cursor).next()?;
                self.type_of(inner, source).map(GoType::pointer)
            }
            "type_identifier" | "identifier" => {
                let name = node_text(node, source);
                if PREDECLARED_TYPES.contains(&name) {
                    return None;
                }
                self.own_type(name)
            }
            "qualified_type" => {
                let package = node.child_by_field_name("package")?;
                let name = node.child_by_field_name("name")?;
                self.qualified(node_text(package, source), node_text(name, source))
            }
            "selector_expression" => {
                let operand = node.child_by_field_name("operand")?;
                let field = node.child_by_field_name("field")?;
                if operand.kind() != "identifier" {
                    return None;
                }
                self.qualified(node_text(operand, source), node_text(field, source))
            }
            "generic_type" => self.type_of(node.child_by_field_name("type")?, source),
            "parenthesized_type" => {
                let mut cursor = node.walk();
                let inner = node.named_children(&mut cursor).next()?;
                self.type_of(inner, source)
            }
            _ => None,
        }
    }

    /// Type a constructor named `NewT` returns, if `name` follows that form.
    fn constructor_type(name: &str) -> Option<&str> {
        let rest = name.strip_prefix("New")?;
        rest.starts_with(|c: char| c.is_ascii_uppercase()).then_some(rest)
    }

    /// Infer the static type of an expression.
    pub fn expression_type(&self, node: Node, source: &[u8]) -> Option<GoType> {
        match node.kind() {
            "identifier" => self.variable(node_text(node, source))?.cloned(),
            "parenthesized_expression" => {
                let mut cursor = node.walk();
                let inner = node.named_children(&mut cursor).next()?;
                self.expression_type(inner, source)
            }
            "composite_literal" => self.type_of(node.child_by_field_name("type")?, source),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator")?;
                if node_text(operator, source) != "&" {
                    return None;
                }
                let operand = node.child_by_field_name("operand")?;
                self.expression_type(operand, source).map(GoType::pointer)
            }
            "call_expression" => self.call_result_type(node, source),
            _ => None,
        }
    }

    fn call_result_type(&self, call: Node, source: &[u8]) -> Option<GoType> {
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => {
                let name = node_text(function, source);
                if self.variable(name).is_some() {
                    return None;
                }
                if name == "new" {
                    let args = call.child_by_field_name("arguments")?;
                    let mut cursor = args.walk();
                    let first = args.named_children(&mut cursor).next()?;
                    return self.type_of(first, source).map(GoType::pointer);
                }
                let type_name = Self::constructor_type(name)?;
                if self.package.functions.contains(name) {
                    return self.own_type(type_name).map(GoType::pointer);
                }
                match self.imports.dot.as_slice() {
                    [only] => Some(GoType::named(only, type_name).pointer()),
                    _ => self.own_type(type_name).map(GoType::pointer),
                }
            }
            "selector_expression" => {
                let operand = function.child_by_field_name("operand")?;
                let field = function.child_by_field_name("field")?;
                if operand.kind() != "identifier" {
                    return None;
                }
                let type_name = Self::constructor_type(node_text(field, source))?;
                self.qualified(node_text(operand, source), type_name)
                    .map(GoType::pointer)
            }
            _ => None,
        }
    }

    /// Fully-qualified identities the callee expression may refer to.
    pub fn callee_candidates(&self, function: Node, source: &[u8]) -> Vec<Callee> {
        match function.kind() {
            "identifier" => {
                let name = node_text(function, source);
                if self.variable(name).is_some() {
                    return Vec::new();
                }
                let mut packages: Vec<&str> = Vec::new();
                if self.package.functions.contains(name) || self.imports.dot.is_empty() {
                    if !self.package.import_path.is_empty() {
                        packages.push(&self.package.import_path);
                    }
                } else {
                    packages.extend(self.imports.dot.iter().map(String::as_str));
                }
                packages
                    .into_iter()
                    .map(|package| Callee {
                        full_name: format!("{}.{}", package, name),
                        name: name.to_string(),
                    })
                    .collect()
            }
            "selector_expression" => {
                let (Some(operand), Some(field)) = (
                    function.child_by_field_name("operand"),
                    function.child_by_field_name("field"),
                ) else {
                    return Vec::new();
                };
                let method = node_text(field, source);

                if operand.kind() == "identifier" {
                    let name = node_text(operand, source);
                    match self.variable(name) {
                        Some(Some(ty)) => return method_callees(ty, method),
                        Some(None) => return Vec::new(),
                        None => {}
                    }
                    if let Some(path) = self.imports.resolve(name) {
                        return vec![Callee {
                            full_name: format!("{}.{}", path, method),
                            name: method.to_string(),
                        }];
                    }
                    return Vec::new();
                }

                self.expression_type(operand, source)
                    .map(|ty| method_callees(&ty, method))
                    .unwrap_or_default()
            }
            "parenthesized_expression" => {
                let mut cursor = function.walk();
                let inner = function.named_children(&mut cursor).next();
                inner
                    .map(|inner| self.callee_candidates(inner, source))
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }
}

fn method_callees(ty: &GoType, method: &str) -> Vec<Callee> {
    ty.method_names(method)
        .into_iter()
        .map(|full_name| Callee {
            full_name,
            name: method.to_string(),
        })
        .collect()
}
