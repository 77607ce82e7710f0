//! wpp parser.
//!
//! Converts source text into arena nodes with source location tracking.
//! The parser is purely syntactic; name resolution and arity checking
//! happen at evaluation time. Nodes are appended into a caller-supplied
//! [`Ast`] so that `eval` and `source` can grow a shared tree.

use std::sync::Arc;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::{Ast, IntrinsicKind, Node, NodeId, Position, NODE_EMPTY};
use crate::diagnostics::{ErrorKind, WppError};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct WppParser;

/// Parses `source` into `tree`, returning the id of the resulting
/// `Document` node. `path` is the logical path recorded in positions.
pub fn parse(source: &str, path: &str, tree: &mut Ast) -> Result<NodeId, WppError> {
    let file: Arc<String> = Arc::new(path.to_string());

    let mut pairs = WppParser::parse(Rule::program, source)
        .map_err(|error| convert_parse_error(error, &file))?;

    let program = pairs.next().unwrap(); // pest guarantees the program rule exists
    let pos = position(&program, &file);

    let stmts = program
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(|pair| build_node(pair, &file, tree))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tree.append(Node::Document { stmts, pos }))
}

fn position(pair: &Pair<Rule>, file: &Arc<String>) -> Position {
    let (line, column) = pair.as_span().start_pos().line_col();
    Position::new(file.clone(), line as u32, column as u32)
}

fn convert_parse_error(error: pest::error::Error<Rule>, file: &Arc<String>) -> WppError {
    let (line, column) = match error.line_col {
        pest::error::LineColLocation::Pos((line, column)) => (line, column),
        pest::error::LineColLocation::Span((line, column), _) => (line, column),
    };
    let message = error.variant.message().into_owned();
    WppError::new(
        Position::new(file.clone(), line as u32, column as u32),
        ErrorKind::Parse { message },
    )
}

fn parse_error(pos: Position, message: impl Into<String>) -> WppError {
    WppError::new(
        pos,
        ErrorKind::Parse {
            message: message.into(),
        },
    )
}

/// Keyword terminals only mark word boundaries; they carry no content.
fn is_significant(pair: &Pair<Rule>) -> bool {
    !matches!(
        pair.as_rule(),
        Rule::kw_let | Rule::kw_var | Rule::kw_drop | Rule::kw_prefix | Rule::kw_match
    )
}

fn build_node(pair: Pair<Rule>, file: &Arc<String>, tree: &mut Ast) -> Result<NodeId, WppError> {
    let pos = position(&pair, file);

    match pair.as_rule() {
        Rule::expr => build_concat(pair, file, tree),

        Rule::string => {
            let value = unescape_string(pair.as_str(), &pos)?;
            Ok(tree.append(Node::String { value, pos }))
        }

        Rule::number => Ok(tree.append(Node::String {
            value: pair.as_str().to_string(),
            pos,
        })),

        Rule::codeify => {
            let inner = pair.into_inner().next().unwrap(); // grammar guarantees the operand
            let expr = build_node(inner, file, tree)?;
            Ok(tree.append(Node::Codeify { expr, pos }))
        }

        Rule::block => build_block(pair, pos, file, tree),

        Rule::match_expr => build_match(pair, pos, file, tree),

        Rule::intrinsic => build_intrinsic(pair, pos, file, tree),

        Rule::invoke => build_invoke(pair, pos, file, tree),

        Rule::let_def => build_let(pair, pos, file, tree),

        Rule::var_def => {
            let mut inner = pair.into_inner().filter(is_significant);
            let name = inner.next().unwrap().as_str().to_string();
            let body = build_node(inner.next().unwrap(), file, tree)?;
            Ok(tree.append(Node::Var { name, body, pos }))
        }

        Rule::drop_stmt => {
            let invoke = pair.into_inner().filter(is_significant).next().unwrap();
            let target = build_node(invoke, file, tree)?;
            Ok(tree.append(Node::Drop { target, pos }))
        }

        Rule::prefix_block => {
            let mut inner = pair.into_inner().filter(is_significant);
            let prefix = build_node(inner.next().unwrap(), file, tree)?;
            let stmts = inner
                .map(|stmt| build_node(stmt, file, tree))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tree.append(Node::Prefix {
                prefixes: vec![prefix],
                stmts,
                pos,
            }))
        }

        rule => Err(parse_error(pos, format!("unexpected grammar rule {rule:?}"))),
    }
}

/// `a .. b .. c` folds left into nested concatenations.
fn build_concat(pair: Pair<Rule>, file: &Arc<String>, tree: &mut Ast) -> Result<NodeId, WppError> {
    let mut inner = pair.into_inner();
    let first = inner.next().unwrap(); // an expr has at least one term
    let mut id = build_node(first, file, tree)?;

    for term in inner {
        let pos = position(&term, file);
        let rhs = build_node(term, file, tree)?;
        id = tree.append(Node::Concat { lhs: id, rhs, pos });
    }

    Ok(id)
}

fn build_block(
    pair: Pair<Rule>,
    pos: Position,
    file: &Arc<String>,
    tree: &mut Ast,
) -> Result<NodeId, WppError> {
    let ids = pair
        .into_inner()
        .map(|stmt| build_node(stmt, file, tree))
        .collect::<Result<Vec<_>, _>>()?;

    // The grammar requires at least one item; the last one is the yield.
    let (&expr, stmts) = ids.split_last().unwrap();
    if tree.get(expr).is_statement() {
        return Err(parse_error(pos, "a block must end with an expression"));
    }

    Ok(tree.append(Node::Block {
        stmts: stmts.to_vec(),
        expr,
        pos,
    }))
}

fn build_match(
    pair: Pair<Rule>,
    pos: Position,
    file: &Arc<String>,
    tree: &mut Ast,
) -> Result<NodeId, WppError> {
    let mut inner = pair.into_inner().filter(is_significant);
    let test = build_node(inner.next().unwrap(), file, tree)?;

    let mut cases = Vec::new();
    let mut default = NODE_EMPTY;

    for arm in inner {
        let mut parts = arm.into_inner();
        let key = parts.next().unwrap();
        let value = build_node(parts.next().unwrap(), file, tree)?;

        if key.as_rule() == Rule::match_default {
            default = value;
        } else {
            let key = build_node(key, file, tree)?;
            cases.push((key, value));
        }
    }

    Ok(tree.append(Node::Match {
        test,
        cases,
        default,
        pos,
    }))
}

fn build_intrinsic(
    pair: Pair<Rule>,
    pos: Position,
    file: &Arc<String>,
    tree: &mut Ast,
) -> Result<NodeId, WppError> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let kind = IntrinsicKind::from_name(&name).unwrap(); // grammar only admits known names
    let args = build_args(inner.next(), file, tree)?;

    Ok(tree.append(Node::Intrinsic {
        kind,
        name,
        args,
        pos,
    }))
}

fn build_invoke(
    pair: Pair<Rule>,
    pos: Position,
    file: &Arc<String>,
    tree: &mut Ast,
) -> Result<NodeId, WppError> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let args = build_args(inner.next(), file, tree)?;

    Ok(tree.append(Node::FnInvoke { name, args, pos }))
}

fn build_let(
    pair: Pair<Rule>,
    pos: Position,
    file: &Arc<String>,
    tree: &mut Ast,
) -> Result<NodeId, WppError> {
    let mut inner = pair.into_inner().filter(is_significant).peekable();
    let name = inner.next().unwrap().as_str().to_string();

    let params = if inner
        .peek()
        .is_some_and(|pair| pair.as_rule() == Rule::param_list)
    {
        inner
            .next()
            .unwrap()
            .into_inner()
            .map(|ident| ident.as_str().to_string())
            .collect()
    } else {
        Vec::new()
    };

    let body = build_node(inner.next().unwrap(), file, tree)?;

    Ok(tree.append(Node::Fn {
        name,
        params,
        body,
        pos,
    }))
}

fn build_args(
    arg_list: Option<Pair<Rule>>,
    file: &Arc<String>,
    tree: &mut Ast,
) -> Result<Vec<NodeId>, WppError> {
    let Some(arg_list) = arg_list else {
        return Ok(Vec::new());
    };
    arg_list
        .into_inner()
        .map(|expr| build_node(expr, file, tree))
        .collect()
}

/// Strips the surrounding quotes and resolves escape sequences.
fn unescape_string(raw: &str, pos: &Position) -> Result<String, WppError> {
    let body = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            other => {
                let shown = other.map(String::from).unwrap_or_default();
                return Err(parse_error(
                    pos.clone(),
                    format!("invalid escape sequence '\\{shown}'"),
                ));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_sexpr(source: &str) -> String {
        let mut tree = Ast::new();
        let root = parse(source, "<test>", &mut tree).expect("parse failed");
        tree.sexpr(root)
    }

    fn parse_err(source: &str) -> WppError {
        let mut tree = Ast::new();
        parse(source, "<test>", &mut tree).expect_err("parse should fail")
    }

    #[test]
    fn parses_literals_and_concat() {
        assert_eq!(parse_sexpr(r#""a" .. "b" .. "c""#), r#"(document (.. (.. "a" "b") "c"))"#);
        assert_eq!(parse_sexpr("'single'"), r#"(document "single")"#);
        assert_eq!(parse_sexpr("-42"), r#"(document "-42")"#);
    }

    #[test]
    fn parses_definitions() {
        assert_eq!(
            parse_sexpr(r#"let greet(x) "hello " .. x"#),
            r#"(document (let greet (x) (.. "hello " (call x))))"#
        );
        assert_eq!(parse_sexpr(r#"let f "x""#), r#"(document (let f () "x"))"#);
        assert_eq!(parse_sexpr(r#"var v "x""#), r#"(document (var v "x"))"#);
    }

    #[test]
    fn parses_drop_block_and_match() {
        assert_eq!(
            parse_sexpr("drop f()"),
            "(document (drop (call f)))"
        );
        assert_eq!(
            parse_sexpr(r#"{ drop f(); f }"#),
            "(document (block (drop (call f)) (call f)))"
        );
        assert_eq!(
            parse_sexpr(r#"match "b" { "a" -> "1", * -> "3" }"#),
            r#"(document (match "b" ("a" "1") (* "3")))"#
        );
    }

    #[test]
    fn parses_prefix_and_codeify() {
        assert_eq!(
            parse_sexpr(r#"prefix "ns_" { let f "A" }"#),
            r#"(document (prefix ("ns_") (let f () "A")))"#
        );
        assert_eq!(parse_sexpr(r#"!"f""#), r#"(document (! "f"))"#);
    }

    #[test]
    fn parses_intrinsics_without_checking_arity() {
        assert_eq!(
            parse_sexpr(r#"slice("abcdef", 1, -2)"#),
            r#"(document (slice "abcdef" "1" "-2"))"#
        );
        // Arity errors surface at evaluation time, not here.
        assert_eq!(parse_sexpr(r#"length("a", "b")"#), r#"(document (length "a" "b"))"#);
    }

    #[test]
    fn keywords_are_not_identifiers() {
        // A name merely starting with a keyword is still an identifier.
        assert_eq!(parse_sexpr("letter"), "(document (call letter))");
        assert!(matches!(parse_err(r#"let eval "x""#).kind, ErrorKind::Parse { .. }));
    }

    #[test]
    fn escapes_resolve_and_invalid_ones_fail() {
        assert_eq!(
            parse_sexpr(r#""a\n\t\"\\""#),
            "(document \"a\\n\\t\\\"\\\\\")"
        );
        assert!(matches!(parse_err(r#""\q""#).kind, ErrorKind::Parse { .. }));
        assert!(matches!(parse_err(r#""unclosed"#).kind, ErrorKind::Parse { .. }));
    }

    #[test]
    fn block_must_end_with_an_expression() {
        let error = parse_err(r#"{ let f "x" }"#);
        assert!(matches!(error.kind, ErrorKind::Parse { .. }));
    }

    #[test]
    fn comments_and_semicolons_are_trivia() {
        assert_eq!(
            parse_sexpr("# a comment\n\"x\"; \"y\""),
            r#"(document "x" "y")"#
        );
    }
}
