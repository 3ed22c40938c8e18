//! Recursive-descent parser for module map files
//!
//! The grammar is mostly LL(1). Two places need more lookahead:
//!
//! - Inside a module body, `umbrella header "x"` is a header declaration and
//!   `umbrella "x"` is an umbrella directory. The token after `umbrella`
//!   decides.
//! - A submodule `module <id> { ... }` and an inferred submodule
//!   `module * { ... }` share their prefix (`explicit`, `framework`,
//!   `module`). The token after `module` decides.
//!
//! Grammar productions are quoted above the function that parses them. Any
//! violation aborts the whole parse; no partial [`ModuleMap`] is returned.

use super::ast::{ConfigMacro, Conflict, Feature, Header, Link, Module, ModuleMap};
use super::token::{Token, TokenKind};
use crate::diagnostics::ParseError;

pub type ParseResult<T> = Result<T, ParseError>;

const CONFIG_MACROS: &str = "config_macros";
const CONFLICT: &str = "conflict";
const EXCLUDE: &str = "exclude";
const EXPLICIT: &str = "explicit";
const EXTERN: &str = "extern";
const EXPORT: &str = "export";
const EXPORT_AS: &str = "export_as";
const FRAMEWORK: &str = "framework";
const HEADER: &str = "header";
const LINK: &str = "link";
const MODULE: &str = "module";
const PRIVATE: &str = "private";
const REQUIRES: &str = "requires";
const TEXTUAL: &str = "textual";
const UMBRELLA: &str = "umbrella";
const USE: &str = "use";

/// Module bodies nested deeper than this are rejected.
pub const MAX_NESTING_DEPTH: usize = 256;

// header attributes
const SIZE: &str = "size";
const MTIME: &str = "mtime";

/// Parse a lexed module map. Fails if any token is left over after the last
/// complete module declaration.
pub fn parse(tokens: &[Token]) -> ParseResult<ModuleMap> {
    let mut parser = Parser::new(tokens);
    let module_map = parser.parse_module_map_file()?;

    let current = parser.current();
    if current.kind() != TokenKind::End {
        return Err(ParseError::TrailingTokens {
            found: current.to_string(),
            position: parser.pos,
        });
    }
    Ok(module_map)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Module bodies currently open
    depth: usize,
    end: Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            end: Token::end(),
        }
    }

    /// Current token, or END once everything is consumed.
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.end)
    }

    fn next(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&self.end)
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self.current().to_string(),
            position: self.pos,
        }
    }

    fn take_kind(&mut self, kind: TokenKind, expected: &'static str) -> ParseResult<String> {
        if self.current().kind() != kind {
            return Err(self.unexpected(expected));
        }
        let text = self.current().text().to_string();
        self.pos += 1;
        Ok(text)
    }

    fn parse_ident(&mut self) -> ParseResult<String> {
        self.take_kind(TokenKind::Ident, "identifier")
    }

    fn parse_string(&mut self) -> ParseResult<String> {
        self.take_kind(TokenKind::String, "string literal")
    }

    fn parse_integer(&mut self) -> ParseResult<String> {
        self.take_kind(TokenKind::Integer, "integer literal")
    }

    fn consume_punc(&mut self, c: char) -> bool {
        if self.current().is_punc(c) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn consume_ident(&mut self, ident: &str) -> bool {
        if self.current().is_ident(ident) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect_punc(&mut self, c: char) -> ParseResult<()> {
        if self.consume_punc(c) {
            return Ok(());
        }
        Err(self.unexpected(punc_name(c)))
    }

    fn expect_ident(&mut self, keyword: &'static str) -> ParseResult<()> {
        if self.consume_ident(keyword) {
            return Ok(());
        }
        Err(self.unexpected(keyword))
    }

    // '{' module-member* '}'
    fn parse_module_body(&mut self, module: &mut Module) -> ParseResult<()> {
        self.expect_punc('{')?;
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep { position: self.pos });
        }
        self.depth += 1;
        self.parse_module_members_opt(module)?;
        self.depth -= 1;
        self.expect_punc('}')
    }

    // module-map-file:
    //   module-declaration*
    fn parse_module_map_file(&mut self) -> ParseResult<ModuleMap> {
        let mut module_map = ModuleMap::default();
        while self
            .current()
            .is_ident_of(&[EXPLICIT, FRAMEWORK, MODULE, EXTERN])
        {
            let mut module = Module::default();
            self.parse_module_declaration(&mut module)?;
            module_map.modules.push(module);
        }
        Ok(module_map)
    }

    // module-id:
    //   identifier ('.' identifier)*
    fn parse_module_id(&mut self) -> ParseResult<String> {
        let mut module_id = self.parse_ident()?;
        while self.consume_punc('.') {
            module_id.push('.');
            module_id.push_str(&self.parse_ident()?);
        }
        Ok(module_id)
    }

    // module-declaration:
    //   explicit? framework? module module-id attributes? '{' module-member* '}'
    //   extern module module-id string-literal
    fn parse_module_declaration(&mut self, module: &mut Module) -> ParseResult<()> {
        if self.current().is_ident_of(&[EXPLICIT, FRAMEWORK, MODULE]) {
            module.is_explicit = self.consume_ident(EXPLICIT);
            module.is_framework = self.consume_ident(FRAMEWORK);
            self.expect_ident(MODULE)?;
            module.module_id = self.parse_module_id()?;
            self.parse_attributes_opt(&mut module.attributes)?;
            return self.parse_module_body(module);
        }

        if self.current().is_ident(EXTERN) {
            self.expect_ident(EXTERN)?;
            module.is_extern = true;
            self.expect_ident(MODULE)?;
            module.module_id = self.parse_module_id()?;
            module.extern_filename = self.parse_string()?;
            return Ok(());
        }

        Err(self.unexpected("module declaration"))
    }

    // module-member:
    //   requires-declaration
    //   header-declaration
    //   umbrella-dir-declaration
    //   submodule-declaration
    //   export-declaration
    //   export-as-declaration
    //   use-declaration
    //   link-declaration
    //   config-macros-declaration
    //   conflict-declaration
    //
    // Stops without consuming at the first token that starts none of these.
    fn parse_module_members_opt(&mut self, module: &mut Module) -> ParseResult<()> {
        loop {
            let current = self.current();

            if current.is_ident(REQUIRES) {
                self.parse_requires_declaration(&mut module.requires)?;
            } else if current.is_ident_of(&[PRIVATE, TEXTUAL, HEADER, EXCLUDE])
                || (current.is_ident(UMBRELLA) && self.next().is_ident(HEADER))
            {
                let header = self.parse_header_declaration()?;
                module.headers.push(header);
            } else if current.is_ident(UMBRELLA) && self.next().kind() == TokenKind::String {
                let dir = self.parse_umbrella_dir_declaration()?;
                module.umbrella_dirs.push(dir);
            } else if current.is_ident_of(&[EXPLICIT, FRAMEWORK, MODULE, EXTERN]) {
                let mut submodule = Module::default();
                self.parse_submodule_declaration(&mut submodule)?;
                module.submodules.push(submodule);
            } else if current.is_ident(EXPORT) {
                let export = self.parse_export_declaration()?;
                module.exports.push(export);
            } else if current.is_ident(EXPORT_AS) {
                let export_as = self.parse_export_as_declaration()?;
                module.export_as.push(export_as);
            } else if current.is_ident(USE) {
                let use_decl = self.parse_use_declaration()?;
                module.uses.push(use_decl);
            } else if current.is_ident(LINK) {
                let link = self.parse_link_declaration()?;
                module.links.push(link);
            } else if current.is_ident(CONFIG_MACROS) {
                let config_macro = self.parse_config_macros_declaration()?;
                module.config_macros.push(config_macro);
            } else if current.is_ident(CONFLICT) {
                let conflict = self.parse_conflict_declaration()?;
                module.conflicts.push(conflict);
            } else {
                return Ok(());
            }
        }
    }

    // requires-declaration:
    //   requires feature-list
    //
    // feature-list:
    //   feature (',' feature)*
    fn parse_requires_declaration(&mut self, features: &mut Vec<Feature>) -> ParseResult<()> {
        self.expect_ident(REQUIRES)?;
        features.push(self.parse_feature()?);
        while self.consume_punc(',') {
            features.push(self.parse_feature()?);
        }
        Ok(())
    }

    // feature:
    //   '!'? identifier
    fn parse_feature(&mut self) -> ParseResult<Feature> {
        let is_positive = !self.consume_punc('!');
        let name = self.parse_ident()?;
        Ok(Feature { name, is_positive })
    }

    // header-declaration:
    //   private? textual? header string-literal header-attrs?
    //   umbrella header string-literal header-attrs?
    //   exclude header string-literal header-attrs?
    fn parse_header_declaration(&mut self) -> ParseResult<Header> {
        let mut header = Header::default();

        if self.consume_ident(UMBRELLA) {
            header.is_umbrella = true;
        } else if self.consume_ident(EXCLUDE) {
            header.is_exclude = true;
        } else {
            header.is_private = self.consume_ident(PRIVATE);
            header.is_textual = self.consume_ident(TEXTUAL);
        }

        self.expect_ident(HEADER)?;
        header.name = self.parse_string()?;
        self.parse_header_attrs_opt(&mut header)?;
        Ok(header)
    }

    // header-attrs:
    //   '{' header-attr* '}'
    //
    // At most one header-attr is accepted between the braces.
    fn parse_header_attrs_opt(&mut self, header: &mut Header) -> ParseResult<()> {
        if !self.consume_punc('{') {
            return Ok(());
        }
        if self.current().is_ident_of(&[SIZE, MTIME]) {
            self.parse_header_attr(header)?;
        }
        self.expect_punc('}')
    }

    // header-attr:
    //   size integer-literal
    //   mtime integer-literal
    fn parse_header_attr(&mut self, header: &mut Header) -> ParseResult<()> {
        if self.consume_ident(SIZE) {
            header.size = Some(self.parse_integer()?);
            return Ok(());
        }
        if self.consume_ident(MTIME) {
            header.mtime = Some(self.parse_integer()?);
            return Ok(());
        }
        Err(self.unexpected("header attribute"))
    }

    // umbrella-dir-declaration:
    //   umbrella string-literal
    fn parse_umbrella_dir_declaration(&mut self) -> ParseResult<String> {
        self.expect_ident(UMBRELLA)?;
        self.parse_string()
    }

    // submodule-declaration:
    //   module-declaration
    //   inferred-submodule-declaration
    //
    // inferred-submodule-declaration:
    //   explicit? framework? module '*' attributes? '{' inferred-submodule-member* '}'
    fn parse_submodule_declaration(&mut self, module: &mut Module) -> ParseResult<()> {
        if self.current().is_ident(EXTERN) {
            return self.parse_module_declaration(module);
        }

        module.is_explicit = self.consume_ident(EXPLICIT);
        module.is_framework = self.consume_ident(FRAMEWORK);
        self.expect_ident(MODULE)?;

        if self.consume_punc('*') {
            module.is_inferred_submodule = true;
            module.module_id = "*".to_string();
            self.parse_attributes_opt(&mut module.attributes)?;
            self.expect_punc('{')?;
            while self.current().is_ident(EXPORT) {
                self.parse_inferred_submodule_member(module)?;
            }
            return self.expect_punc('}');
        }

        module.module_id = self.parse_module_id()?;
        self.parse_attributes_opt(&mut module.attributes)?;
        self.parse_module_body(module)
    }

    // inferred-submodule-member:
    //   export '*'
    fn parse_inferred_submodule_member(&mut self, module: &mut Module) -> ParseResult<()> {
        self.expect_ident(EXPORT)?;
        self.expect_punc('*')?;
        module.has_inferred_submodule_member = true;
        Ok(())
    }

    // export-declaration:
    //   export wildcard-module-id
    fn parse_export_declaration(&mut self) -> ParseResult<String> {
        self.expect_ident(EXPORT)?;
        self.parse_wildcard_module_id()
    }

    // wildcard-module-id:
    //   identifier
    //   '*'
    //   identifier '.' wildcard-module-id
    fn parse_wildcard_module_id(&mut self) -> ParseResult<String> {
        let mut module_id = String::new();
        loop {
            if self.consume_punc('*') {
                module_id.push('*');
                return Ok(module_id);
            }
            module_id.push_str(&self.parse_ident()?);
            if !self.consume_punc('.') {
                return Ok(module_id);
            }
            module_id.push('.');
        }
    }

    // export-as-declaration:
    //   export_as identifier
    fn parse_export_as_declaration(&mut self) -> ParseResult<String> {
        self.expect_ident(EXPORT_AS)?;
        self.parse_ident()
    }

    // use-declaration:
    //   use identifier
    fn parse_use_declaration(&mut self) -> ParseResult<String> {
        self.expect_ident(USE)?;
        self.parse_ident()
    }

    // link-declaration:
    //   link framework? string-literal
    fn parse_link_declaration(&mut self) -> ParseResult<Link> {
        self.expect_ident(LINK)?;
        let is_framework = self.consume_ident(FRAMEWORK);
        let name = self.parse_string()?;
        Ok(Link { name, is_framework })
    }

    // config-macros-declaration:
    //   config_macros attributes? config-macro-list?
    //
    // config-macro-list:
    //   identifier (',' identifier)*
    fn parse_config_macros_declaration(&mut self) -> ParseResult<ConfigMacro> {
        self.expect_ident(CONFIG_MACROS)?;
        let mut config_macro = ConfigMacro::default();

        self.parse_attributes_opt(&mut config_macro.attributes)?;

        if self.current().kind() == TokenKind::Ident {
            config_macro.macros.push(self.parse_ident()?);
            while self.consume_punc(',') {
                config_macro.macros.push(self.parse_ident()?);
            }
        }
        Ok(config_macro)
    }

    // conflict-declaration:
    //   conflict module-id ',' string-literal
    fn parse_conflict_declaration(&mut self) -> ParseResult<Conflict> {
        self.expect_ident(CONFLICT)?;
        let module_id = self.parse_module_id()?;
        self.expect_punc(',')?;
        let reason = self.parse_string()?;
        Ok(Conflict { module_id, reason })
    }

    // attributes:
    //   ('[' identifier ']')+
    fn parse_attributes_opt(&mut self, attributes: &mut Vec<String>) -> ParseResult<()> {
        while self.consume_punc('[') {
            attributes.push(self.parse_ident()?);
            self.expect_punc(']')?;
        }
        Ok(())
    }
}

fn punc_name(c: char) -> &'static str {
    match c {
        '{' => "`{`",
        '}' => "`}`",
        '[' => "`[`",
        ']' => "`]`",
        ',' => "`,`",
        '*' => "`*`",
        '.' => "`.`",
        '!' => "`!`",
        _ => "punctuation",
    }
}
