//! Read-only gate for the `run_query` tool.
//!
//! The MySQL driver happily runs anything, including several statements in one
//! call, so every statement is classified before it reaches the connection.
//! The gate is syntactic: the statement is tokenized with the
//! [sqlparser](https://docs.rs/sqlparser/) MySQL tokenizer (which understands
//! string literals, quoted identifiers and comments), then judged by its leading
//! keyword against an allow-list.
//!
//! It never allows a mutating statement and may deny exotic read-only forms
//! such as `TABLE t` or `VALUES ROW(1)`.

use crate::error::{DbError, DbResult};
use crate::models::QueryClassification;
use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

/// Denial reasons. These strings are part of the wire contract.
pub mod reasons {
    pub const EMPTY: &str = "empty query";
    pub const MULTIPLE_STATEMENTS: &str = "multiple statements rejected";
    pub const UNPARSEABLE: &str = "unparseable statement";
    pub const UNRECOGNIZED: &str = "unrecognized statement";
    pub const EXECUTABLE_COMMENT: &str = "executable comments rejected";
    pub const AMBIGUOUS_COMMENT: &str = "ambiguous comment rejected";
    pub const AMBIGUOUS_LITERAL: &str = "ambiguous string literal rejected";
    pub const MUTATING_PREFIX: &str = "mutating statement rejected: ";
}

/// Classify a raw SQL statement.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::tools::classifier::classify;
///
/// assert!(classify("SELECT * FROM users").is_allowed());
/// assert!(!classify("DROP TABLE users").is_allowed());
/// assert!(!classify("SELECT 1; DROP TABLE users").is_allowed());
/// ```
pub fn classify(sql: &str) -> QueryClassification {
    let tokens = match significant_tokens(sql) {
        Ok(tokens) => tokens,
        Err(reason) => return QueryClassification::deny(reason),
    };

    let statement = match single_statement(&tokens) {
        Ok(statement) => statement,
        Err(reason) => return QueryClassification::deny(reason),
    };

    if sql.contains('\\') && has_literal_with_semicolon(statement) {
        // With NO_BACKSLASH_ESCAPES the server would end the literal earlier than we do.
        return QueryClassification::deny(reasons::AMBIGUOUS_LITERAL);
    }

    classify_statement(statement)
}

/// Classify and turn a denial into [`DbError::Denied`].
pub fn ensure_read_only(sql: &str) -> DbResult<()> {
    let classification = classify(sql);
    if classification.is_allowed() {
        Ok(())
    } else {
        Err(DbError::denied(
            classification
                .reason
                .unwrap_or_else(|| reasons::UNRECOGNIZED.to_string()),
        ))
    }
}

/// Tokenize and drop whitespace and comments.
fn significant_tokens(sql: &str) -> Result<Vec<Token>, &'static str> {
    // `/*! ... */` and `/*M! ... */` are executed by MySQL
    if sql.contains("/*!") || sql.contains("/*M!") {
        return Err(reasons::EXECUTABLE_COMMENT);
    }

    let dialect = MySqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|_| reasons::UNPARSEABLE)?;

    let mut significant = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Whitespace(Whitespace::SingleLineComment { comment, prefix }) => {
                // MySQL only treats `--` as a comment when whitespace follows it
                if prefix == "--" && comment.chars().next().is_some_and(|c| !c.is_whitespace()) {
                    return Err(reasons::AMBIGUOUS_COMMENT);
                }
            }
            Token::Whitespace(Whitespace::MultiLineComment(body)) if body.contains("/*") => {
                // MySQL does not nest comments
                return Err(reasons::AMBIGUOUS_COMMENT);
            }
            Token::Whitespace(_) | Token::EOF => {}
            other => significant.push(other),
        }
    }
    Ok(significant)
}

/// Strip a single trailing semicolon and reject anything that follows a semicolon.
fn single_statement(tokens: &[Token]) -> Result<&[Token], &'static str> {
    match tokens.iter().position(|t| *t == Token::SemiColon) {
        None if tokens.is_empty() => Err(reasons::EMPTY),
        None => Ok(tokens),
        Some(idx) if idx + 1 < tokens.len() => Err(reasons::MULTIPLE_STATEMENTS),
        Some(0) => Err(reasons::EMPTY),
        Some(idx) => Ok(&tokens[..idx]),
    }
}

fn classify_statement(tokens: &[Token]) -> QueryClassification {
    // One layer of outer parentheses: `(SELECT 1) UNION (SELECT 2)`
    let tokens = match tokens.first() {
        Some(Token::LParen) => &tokens[1..],
        _ => tokens,
    };

    let Some(keyword) = tokens.first().and_then(keyword_of) else {
        return QueryClassification::deny(reasons::UNRECOGNIZED);
    };

    match keyword.as_str() {
        "SELECT" => deny_file_writes(tokens),
        "SHOW" => QueryClassification::allow(),
        "DESCRIBE" | "DESC" | "EXPLAIN" => classify_explain(tokens),
        "WITH" => classify_with(tokens),
        _ => mutating(&keyword),
    }
}

/// `EXPLAIN ANALYZE` runs its target statement, so the target must be allowed too.
fn classify_explain(tokens: &[Token]) -> QueryClassification {
    let mut rest = &tokens[1..];
    if !rest.first().is_some_and(|t| is_keyword(t, "ANALYZE")) {
        return QueryClassification::allow();
    }
    rest = &rest[1..];

    // EXPLAIN ANALYZE FORMAT = TREE <statement>
    if rest.first().is_some_and(|t| is_keyword(t, "FORMAT")) {
        rest = match rest {
            [_, Token::Eq, _, tail @ ..] => tail,
            _ => return QueryClassification::deny(reasons::UNRECOGNIZED),
        };
    }

    if rest.is_empty() {
        return QueryClassification::deny(reasons::UNRECOGNIZED);
    }
    classify_statement(rest)
}

/// A CTE is allowed only when the statement after the CTE list is a SELECT.
fn classify_with(tokens: &[Token]) -> QueryClassification {
    match statement_after_ctes(tokens) {
        Some(tail) => match tail.first() {
            Some(Token::LParen) if tail.get(1).is_some_and(|t| is_keyword(t, "SELECT")) => {
                deny_file_writes(tokens)
            }
            Some(t) if is_keyword(t, "SELECT") => deny_file_writes(tokens),
            Some(t) => match keyword_of(t) {
                Some(keyword) => mutating(&keyword),
                None => QueryClassification::deny(reasons::UNRECOGNIZED),
            },
            None => QueryClassification::deny(reasons::UNRECOGNIZED),
        },
        None => QueryClassification::deny(reasons::UNRECOGNIZED),
    }
}

/// Walk `WITH [RECURSIVE] name [(cols)] AS (...) [, ...]` and return what follows.
fn statement_after_ctes(tokens: &[Token]) -> Option<&[Token]> {
    let mut i = 1;
    if tokens.get(i).is_some_and(|t| is_keyword(t, "RECURSIVE")) {
        i += 1;
    }

    loop {
        // CTE name
        match tokens.get(i)? {
            Token::Word(_) => i += 1,
            _ => return None,
        }
        if tokens.get(i) == Some(&Token::LParen) {
            i = skip_group(tokens, i)?;
        }
        if !tokens.get(i).is_some_and(|t| is_keyword(t, "AS")) {
            return None;
        }
        i += 1;
        if tokens.get(i) != Some(&Token::LParen) {
            return None;
        }
        i = skip_group(tokens, i)?;

        if tokens.get(i) == Some(&Token::Comma) {
            i += 1;
            continue;
        }
        return Some(&tokens[i..]);
    }
}

/// Given the index of an opening parenthesis, return the index after its match.
fn skip_group(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// `SELECT ... INTO OUTFILE|DUMPFILE` writes to the server filesystem.
fn deny_file_writes(tokens: &[Token]) -> QueryClassification {
    for token in tokens {
        for target in ["OUTFILE", "DUMPFILE"] {
            if is_keyword(token, target) {
                return mutating(&format!("SELECT ... INTO {}", target));
            }
        }
    }
    QueryClassification::allow()
}

fn has_literal_with_semicolon(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| match t {
        Token::SingleQuotedString(s) | Token::DoubleQuotedString(s) => s.contains(';'),
        _ => false,
    })
}

fn mutating(keyword: &str) -> QueryClassification {
    QueryClassification::deny(format!("{}{}", reasons::MUTATING_PREFIX, keyword))
}

/// Upper-cased value of an unquoted word.
fn keyword_of(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_ascii_uppercase()),
        _ => None,
    }
}

fn is_keyword(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword))
}
