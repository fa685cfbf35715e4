//! Translation function signatures.
//!
//! A registry maps fully-qualified callee identities (as produced by
//! [`crate::go_types::TypeEnv`]) to the positional roles of their arguments.

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::logging;

/// Role of one positional call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ArgRole {
    Singular,
    Plural,
    Context,
    Domain,
    Skip,
}

impl ArgRole {
    /// Parse a role name. Unknown names are logged and treated as `Skip`.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "singular" | "single" => Self::Singular,
            "plural" => Self::Plural,
            "context" | "ctx" => Self::Context,
            "domain" | "dom" => Self::Domain,
            "skip" => Self::Skip,
            _ => {
                logging::warn(&format!(
                    "unknown argument type {}, defaulting to 'skip'",
                    value
                ));
                Self::Skip
            }
        }
    }
}

impl From<String> for ArgRole {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// One translation function or method and the roles of its arguments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionSignature {
    /// Bare name, e.g. "Get" or "GetN"
    pub name: String,
    pub arguments: Vec<ArgRole>,
}

impl FunctionSignature {
    pub fn new(name: &str, arguments: &[ArgRole]) -> Self {
        Self {
            name: name.to_string(),
            arguments: arguments.to_vec(),
        }
    }
}

/// Functions sharing a set of package or receiver prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignaturePackage {
    /// Package paths ("example.com/pkg.") or receivers ("(*example.com/pkg.Type)")
    pub prefixes: Vec<String>,
    pub functions: Vec<FunctionSignature>,
}

impl SignaturePackage {
    fn matches(&self, full_name: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| full_name.starts_with(prefix.as_str()))
    }

    fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.iter().find(|f| f.name == name)
    }
}

const GOTEXT_PREFIXES: [&str; 4] = [
    "github.com/leonelquinteros/gotext.",
    "(*github.com/leonelquinteros/gotext.Locale)",
    "(*github.com/leonelquinteros/gotext.Mo)",
    "(*github.com/leonelquinteros/gotext.Po)",
];

/// The gotext package API.
pub fn gotext_package() -> SignaturePackage {
    use ArgRole::*;

    SignaturePackage {
        prefixes: GOTEXT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        functions: vec![
            FunctionSignature::new("Get", &[Singular]),
            FunctionSignature::new("GetN", &[Singular, Plural]),
            FunctionSignature::new("GetD", &[Domain, Singular]),
            FunctionSignature::new("GetND", &[Domain, Singular, Plural]),
            FunctionSignature::new("GetC", &[Singular, Context]),
            FunctionSignature::new("GetNC", &[Singular, Plural, Skip, Context]),
            FunctionSignature::new("GetDC", &[Domain, Singular, Context]),
            FunctionSignature::new("GetNDC", &[Domain, Singular, Plural, Skip, Context]),
        ],
    }
}

/// Immutable set of signature packages, consulted in order.
#[derive(Debug, Clone)]
pub struct Registry {
    packages: Vec<SignaturePackage>,
}

impl Registry {
    pub fn new(packages: Vec<SignaturePackage>) -> Result<Self> {
        for package in &packages {
            if package.prefixes.is_empty() {
                bail!("signature package without prefixes");
            }
            for function in &package.functions {
                if !function.arguments.contains(&ArgRole::Singular) {
                    bail!(
                        "signature '{}' must declare a singular argument",
                        function.name
                    );
                }
            }
        }
        Ok(Self { packages })
    }

    pub fn builtin() -> Self {
        Self {
            packages: vec![gotext_package()],
        }
    }

    /// Builtin packages followed by `extra`.
    pub fn with_extra(extra: Vec<SignaturePackage>) -> Result<Self> {
        let mut packages = vec![gotext_package()];
        packages.extend(extra);
        Self::new(packages)
    }

    pub fn packages(&self) -> &[SignaturePackage] {
        &self.packages
    }

    /// Argument roles for a call whose callee resolved to `full_name`.
    ///
    /// The first package with a matching prefix decides; a bare name it does
    /// not list means the call is not a translation call.
    pub fn lookup(&self, full_name: &str, name: &str) -> Option<&[ArgRole]> {
        let package = self.packages.iter().find(|p| p.matches(full_name))?;
        package.function(name).map(|f| f.arguments.as_slice())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_aliases() {
        assert_eq!(ArgRole::parse("single"), ArgRole::Singular);
        assert_eq!(ArgRole::parse("CTX"), ArgRole::Context);
        assert_eq!(ArgRole::parse("dom"), ArgRole::Domain);
        assert_eq!(ArgRole::parse("whatever"), ArgRole::Skip);
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = Registry::builtin();

        let roles = registry
            .lookup("github.com/leonelquinteros/gotext.GetNDC", "GetNDC")
            .unwrap();
        assert_eq!(roles.len(), 5);
        assert_eq!(roles[0], ArgRole::Domain);

        let roles = registry
            .lookup("(*github.com/leonelquinteros/gotext.Locale).GetC", "GetC")
            .unwrap();
        assert_eq!(roles, &[ArgRole::Singular, ArgRole::Context]);
    }

    #[test]
    fn test_lookup_misses() {
        let registry = Registry::builtin();
        assert!(registry
            .lookup("github.com/leonelquinteros/gotext.NewLocale", "NewLocale")
            .is_none());
        assert!(registry.lookup("fmt.Sprintf", "Sprintf").is_none());
    }

    #[test]
    fn test_deserialize_package() {
        let json = r#"{
            "prefixes": ["example.com/app/i18n."],
            "functions": [{ "name": "T", "arguments": ["single", "skip"] }]
        }"#;
        let package: SignaturePackage = serde_json::from_str(json).unwrap();
        assert_eq!(package.functions[0].arguments, vec![ArgRole::Singular, ArgRole::Skip]);

        let registry = Registry::with_extra(vec![package]).unwrap();
        assert!(registry.lookup("example.com/app/i18n.T", "T").is_some());
    }

    #[test]
    fn test_rejects_signature_without_singular() {
        let package = SignaturePackage {
            prefixes: vec!["example.com/x.".to_string()],
            functions: vec![FunctionSignature::new("D", &[ArgRole::Domain])],
        };
        assert!(Registry::new(vec![package]).is_err());
    }
}
