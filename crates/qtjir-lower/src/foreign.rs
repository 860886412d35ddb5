//! Foreign-module signature parsing.
//!
//! The frontend's actual foreign-module grammar is out of scope -- the
//! lowerer only ever needs the discovered function signatures, so this is
//! modeled as a trait with one minimal built-in implementation that
//! exercises the extern-ingestion path end-to-end in tests.

use qtjir_core::LlvmTypeName;

/// One signature discovered while parsing a foreign module.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignFunctionSig {
    pub name: String,
    pub param_types: Vec<LlvmTypeName>,
    pub return_type: LlvmTypeName,
}

pub trait ForeignModuleParser {
    fn parse(&self, path: &str, source: &str) -> Vec<ForeignFunctionSig>;
}

/// Recognizes a minimal C-like extern-declaration syntax:
/// `fn name(i32, i64) -> ptr;` one declaration per line. Lines that don't
/// match are silently skipped rather than treated as a hard parse error --
/// this parser only needs to discover signatures, not validate a grammar.
pub struct CLikeSignatureParser;

impl ForeignModuleParser for CLikeSignatureParser {
    fn parse(&self, _path: &str, source: &str) -> Vec<ForeignFunctionSig> {
        let mut sigs = Vec::new();
        for line in source.lines() {
            if let Some(sig) = parse_declaration(line.trim()) {
                sigs.push(sig);
            }
        }
        sigs
    }
}

fn parse_declaration(line: &str) -> Option<ForeignFunctionSig> {
    let line = line.strip_prefix("fn ")?;
    let line = line.strip_suffix(';').unwrap_or(line);
    let open = line.find('(')?;
    let close = line.find(')')?;
    if close < open {
        return None;
    }
    let name = line[..open].trim().to_string();
    if name.is_empty() {
        return None;
    }

    let params_str = &line[open + 1..close];
    let mut param_types = Vec::new();
    if !params_str.trim().is_empty() {
        for part in params_str.split(',') {
            param_types.push(LlvmTypeName::parse(part.trim())?);
        }
    }

    let rest = line[close + 1..].trim();
    let return_type = if let Some(arrow_rest) = rest.strip_prefix("->") {
        LlvmTypeName::parse(arrow_rest.trim())?
    } else {
        LlvmTypeName::Void
    };

    Some(ForeignFunctionSig {
        name,
        param_types,
        return_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_two_arg_declaration() {
        let parser = CLikeSignatureParser;
        let sigs = parser.parse("math.ext", "fn add_i32(i32, i32) -> i32;");
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].name, "add_i32");
        assert_eq!(sigs[0].param_types, vec![LlvmTypeName::I32, LlvmTypeName::I32]);
        assert_eq!(sigs[0].return_type, LlvmTypeName::I32);
    }

    #[test]
    fn defaults_to_void_return_when_no_arrow() {
        let parser = CLikeSignatureParser;
        let sigs = parser.parse("io.ext", "fn log_message(ptr);");
        assert_eq!(sigs[0].return_type, LlvmTypeName::Void);
    }

    #[test]
    fn skips_unrecognized_lines() {
        let parser = CLikeSignatureParser;
        let sigs = parser.parse("mixed.ext", "// comment\nfn ok(i32) -> void;\nnot a decl");
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].name, "ok");
    }

    #[test]
    fn parses_multiple_declarations() {
        let parser = CLikeSignatureParser;
        let sigs = parser.parse(
            "multi.ext",
            "fn a(i32) -> i32;\nfn b(i64, ptr) -> double;",
        );
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[1].name, "b");
    }
}
