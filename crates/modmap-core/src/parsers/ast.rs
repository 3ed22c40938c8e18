//! Parsed module map declarations
//!
//! A [`ModuleMap`] is an ordered list of top-level [`Module`]s. Each module
//! owns its submodules; the tree is built once by the parser and only read
//! afterwards.
//!
//! `Display` renders declarations back in module map syntax, indenting two
//! spaces per nesting level.

use std::fmt::{self, Write as _};

/// A `requires` entry. `is_positive` is false for `!feature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub is_positive: bool,
}

impl Feature {
    pub fn new(name: impl Into<String>, is_positive: bool) -> Self {
        Self {
            name: name.into(),
            is_positive,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub is_umbrella: bool,
    pub is_exclude: bool,
    pub is_private: bool,
    pub is_textual: bool,
    pub size: Option<String>,
    pub mtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub is_framework: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMacro {
    pub attributes: Vec<String>,
    pub macros: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub module_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub module_id: String,
    pub attributes: Vec<String>,

    pub is_explicit: bool,
    pub is_framework: bool,
    pub requires: Vec<Feature>,
    pub headers: Vec<Header>,
    pub umbrella_dirs: Vec<String>,
    pub submodules: Vec<Module>,
    pub exports: Vec<String>,
    pub export_as: Vec<String>,
    pub uses: Vec<String>,
    pub links: Vec<Link>,
    pub config_macros: Vec<ConfigMacro>,
    pub conflicts: Vec<Conflict>,

    /// `extern module <id> "<file>"`
    pub is_extern: bool,
    pub extern_filename: String,

    /// `module * { ... }`
    pub is_inferred_submodule: bool,
    /// The inferred submodule body contained `export *`.
    pub has_inferred_submodule_member: bool,
}

impl Module {
    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.iter().any(|a| a == attr)
    }

    /// Visit this module and every nested submodule, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Module)) {
        visit(self);
        for submodule in &self.submodules {
            submodule.walk(visit);
        }
    }

    fn write_indented(&self, out: &mut String, level: usize) -> fmt::Result {
        let pad = "  ".repeat(level);
        let inner = "  ".repeat(level + 1);

        if self.is_extern {
            return writeln!(
                out,
                "{pad}extern module {} \"{}\"",
                self.module_id, self.extern_filename
            );
        }

        out.push_str(&pad);
        if self.is_explicit {
            out.push_str("explicit ");
        }
        if self.is_framework {
            out.push_str("framework ");
        }
        write!(out, "module {} ", self.module_id)?;
        for attr in &self.attributes {
            write!(out, "[{attr}] ")?;
        }
        out.push_str("{\n");

        if !self.requires.is_empty() {
            let features: Vec<String> = self
                .requires
                .iter()
                .map(|f| {
                    if f.is_positive {
                        f.name.clone()
                    } else {
                        format!("!{}", f.name)
                    }
                })
                .collect();
            writeln!(out, "{inner}requires {}", features.join(", "))?;
        }

        for header in &self.headers {
            out.push_str(&inner);
            if header.is_umbrella {
                out.push_str("umbrella ");
            }
            if header.is_exclude {
                out.push_str("exclude ");
            }
            if header.is_private {
                out.push_str("private ");
            }
            if header.is_textual {
                out.push_str("textual ");
            }
            write!(out, "header \"{}\"", header.name)?;
            if header.size.is_some() || header.mtime.is_some() {
                out.push_str(" {");
                if let Some(size) = &header.size {
                    write!(out, " size {size}")?;
                }
                if let Some(mtime) = &header.mtime {
                    write!(out, " mtime {mtime}")?;
                }
                out.push_str(" }");
            }
            out.push('\n');
        }

        for dir in &self.umbrella_dirs {
            writeln!(out, "{inner}umbrella \"{dir}\"")?;
        }

        if self.is_inferred_submodule {
            if self.has_inferred_submodule_member {
                writeln!(out, "{inner}export *")?;
            }
        } else {
            for submodule in &self.submodules {
                submodule.write_indented(out, level + 1)?;
            }
        }

        for export in &self.exports {
            writeln!(out, "{inner}export {export}")?;
        }
        for export_as in &self.export_as {
            writeln!(out, "{inner}export_as {export_as}")?;
        }
        for use_decl in &self.uses {
            writeln!(out, "{inner}use {use_decl}")?;
        }
        for link in &self.links {
            out.push_str(&inner);
            out.push_str("link ");
            if link.is_framework {
                out.push_str("framework ");
            }
            writeln!(out, "\"{}\"", link.name)?;
        }
        for config_macro in &self.config_macros {
            out.push_str(&inner);
            out.push_str("config_macros ");
            for attr in &config_macro.attributes {
                write!(out, "[{attr}] ")?;
            }
            writeln!(out, "{}", config_macro.macros.join(", "))?;
        }
        for conflict in &self.conflicts {
            writeln!(
                out,
                "{inner}conflict {}, \"{}\"",
                conflict.module_id, conflict.reason
            )?;
        }

        writeln!(out, "{pad}}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_indented(&mut out, 0)?;
        f.write_str(&out)
    }
}

/// Top-level declarations of one module map file, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMap {
    pub modules: Vec<Module>,
}

impl ModuleMap {
    /// Every `extern module` filename in the tree, in depth-first order.
    pub fn extern_filenames(&self) -> Vec<&str> {
        let mut filenames = Vec::new();
        for module in &self.modules {
            module.walk(&mut |m| {
                if !m.extern_filename.is_empty() {
                    filenames.push(m.extern_filename.as_str());
                }
            });
        }
        filenames
    }
}

impl fmt::Display for ModuleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for module in &self.modules {
            write!(f, "{module}")?;
        }
        Ok(())
    }
}
