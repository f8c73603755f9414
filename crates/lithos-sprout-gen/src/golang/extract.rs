// SPDX-License-Identifier: Apache-2.0 OR MIT
use super::lexer::{tokenize, Span, Token, TokenKind};
use super::{Field, Fields, Function, Import, Package, UNKNOWN_TYPE};
use crate::error::ExtractError;

/// Identifiers that start a type literal rather than name a parameter.
const TYPE_KEYWORDS: [&str; 5] = ["map", "chan", "func", "interface", "struct"];

pub(crate) fn extract(source: &str) -> Result<Package, ExtractError> {
    let (comments, code): (Vec<Token>, Vec<Token>) =
        tokenize(source)?.into_iter().partition(Token::is_comment);
    Parser {
        source,
        comments,
        code,
        pos: 0,
    }
    .package()
}

struct Parser<'a> {
    source: &'a str,
    comments: Vec<Token>,
    code: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.code.get(self.pos)
    }

    fn peek_punct(&self, expected: char) -> bool {
        self.peek().is_some_and(|token| token.is_punct(expected))
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.code.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    fn last_line(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.code.get(idx))
            .map_or(1, |token| token.span.end_line)
    }

    fn unexpected(&self, expected: &'static str) -> ExtractError {
        match self.peek() {
            Some(token) => ExtractError::Unexpected {
                expected,
                found: token.describe(),
                line: token.span.line,
            },
            None => ExtractError::Unexpected {
                expected,
                found: "end of file".to_string(),
                line: self.last_line(),
            },
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, ExtractError> {
        match self.peek().and_then(Token::ident) {
            Some(name) => {
                let name = name.to_string();
                self.pos += 1;
                Ok(name)
            }
            None => Err(self.unexpected(expected)),
        }
    }

    fn package(mut self) -> Result<Package, ExtractError> {
        if !self.peek().is_some_and(|token| token.is_ident("package")) {
            let line = self.peek().map_or(1, |token| token.span.line);
            return Err(ExtractError::MissingPackage { line });
        }
        self.pos += 1;
        let name = self.ident("package name")?;

        let mut imports = Vec::new();
        let mut functions = Vec::new();
        while let Some(token) = self.peek() {
            if token.is_ident("import") {
                self.imports(&mut imports)?;
            } else if token.is_ident("func") {
                functions.push(self.function()?);
            } else if token.is_punct(';') {
                self.pos += 1;
            } else {
                self.skip_declaration()?;
            }
        }

        Ok(Package {
            name,
            imports,
            functions,
            path: None,
        })
    }

    fn imports(&mut self, imports: &mut Vec<Import>) -> Result<(), ExtractError> {
        self.pos += 1;
        if self.peek_punct('(') {
            let (specs, _) = self.group()?;
            let mut alias = None;
            for token in &specs {
                match &token.kind {
                    TokenKind::Ident(name) => alias = Some(name.clone()),
                    TokenKind::Punct('.') => alias = Some(".".to_string()),
                    TokenKind::String(path) => imports.push(Import {
                        path: unquote(path),
                        alias: alias.take(),
                    }),
                    _ => {}
                }
            }
            return Ok(());
        }

        let alias = match self.peek().map(|token| &token.kind) {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Some(name)
            }
            Some(TokenKind::Punct('.')) => {
                self.pos += 1;
                Some(".".to_string())
            }
            _ => None,
        };
        match self.peek().map(|token| &token.kind) {
            Some(TokenKind::String(path)) => {
                imports.push(Import {
                    path: unquote(path),
                    alias,
                });
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected("import path")),
        }
    }

    fn function(&mut self) -> Result<Function, ExtractError> {
        let func_index = self.pos;
        let line = self.code[func_index].span.line;
        self.pos += 1;
        let doc = self.doc_comments(func_index);

        if !self.peek_punct('(') {
            let function = self.ident("receiver or function name")?;
            return Err(ExtractError::MissingReceiver { function, line });
        }
        let (receiver_tokens, receiver_span) = self.group()?;
        let receiver = parse_fields(&receiver_tokens)
            .0
            .into_iter()
            .next()
            .ok_or(ExtractError::Unexpected {
                expected: "receiver",
                found: "`()`".to_string(),
                line: receiver_span.line,
            })?;

        let name = self.ident("method name")?;
        if self.peek_punct('[') {
            self.group()?;
        }
        if !self.peek_punct('(') {
            return Err(self.unexpected("parameter list"));
        }
        let (param_tokens, _) = self.group()?;
        let params = parse_fields(&param_tokens);
        let results = self.results()?;

        let body = if self.peek_punct('{') {
            let (_, span) = self.group()?;
            self.source[span.start..span.end].to_string()
        } else {
            String::new()
        };

        Ok(Function {
            name,
            receiver,
            params,
            results,
            doc,
            body,
            line,
        })
    }

    fn results(&mut self) -> Result<Fields, ExtractError> {
        let signature_line = self.last_line();
        match self.peek() {
            None => return Ok(Fields::default()),
            Some(token) if token.is_punct('{') || token.span.line > signature_line => {
                return Ok(Fields::default());
            }
            Some(token) if token.is_punct('(') => {
                let (tokens, _) = self.group()?;
                return Ok(parse_fields(&tokens));
            }
            Some(_) => {}
        }

        // A single unparenthesized result type runs up to the body.
        let mut tokens = Vec::new();
        while let Some(token) = self.peek() {
            if token.is_punct('{') {
                let follows_type_keyword = tokens
                    .last()
                    .is_some_and(|last: &Token| last.is_ident("interface") || last.is_ident("struct"));
                if !follows_type_keyword {
                    break;
                }
            }
            if token.span.line > signature_line {
                break;
            }
            if is_opening(token) {
                let start = self.pos;
                self.group()?;
                tokens.extend_from_slice(&self.code[start..self.pos]);
            } else if let Some(token) = self.bump() {
                tokens.push(token);
            }
        }
        Ok(Fields(vec![Field::new("", type_string(&tokens))]))
    }

    /// Consumes a bracketed group starting at the current token and returns
    /// its inner tokens plus the span covering both delimiters.
    fn group(&mut self) -> Result<(Vec<Token>, Span), ExtractError> {
        let Some(open) = self.bump() else {
            return Err(self.unexpected("opening bracket"));
        };
        let mut stack = vec![open.clone()];
        let inner_start = self.pos;
        while let Some(token) = self.bump() {
            if is_opening(&token) {
                stack.push(token);
            } else if let TokenKind::Punct(close @ (')' | ']' | '}')) = token.kind {
                let Some(opener) = stack.pop() else {
                    break;
                };
                if closing_for(&opener) != Some(close) {
                    return Err(ExtractError::Unbalanced {
                        delimiter: close,
                        line: token.span.line,
                    });
                }
                if stack.is_empty() {
                    let inner = self.code[inner_start..self.pos - 1].to_vec();
                    let span = Span {
                        start: open.span.start,
                        end: token.span.end,
                        line: open.span.line,
                        end_line: token.span.end_line,
                    };
                    return Ok((inner, span));
                }
            }
        }
        let unclosed = stack.last().unwrap_or(&open);
        Err(ExtractError::Unbalanced {
            delimiter: match unclosed.kind {
                TokenKind::Punct(c) => c,
                _ => '(',
            },
            line: unclosed.span.line,
        })
    }

    /// Skips a `type`, `var` or `const` declaration (or any other top-level
    /// statement) up to the point where Go would insert a semicolon.
    fn skip_declaration(&mut self) -> Result<(), ExtractError> {
        loop {
            let Some(token) = self.peek() else {
                return Ok(());
            };
            if is_opening(token) {
                self.group()?;
            } else if let TokenKind::Punct(close @ (')' | ']' | '}')) = token.kind {
                return Err(ExtractError::Unbalanced {
                    delimiter: close,
                    line: token.span.line,
                });
            } else {
                self.pos += 1;
            }

            let Some(last) = self.pos.checked_sub(1).and_then(|idx| self.code.get(idx)) else {
                return Ok(());
            };
            if last.is_punct(';') {
                return Ok(());
            }
            let ends_statement = matches!(
                last.kind,
                TokenKind::Ident(_)
                    | TokenKind::String(_)
                    | TokenKind::Literal(_)
                    | TokenKind::Punct(')' | ']' | '}')
            );
            let next_on_new_line = self
                .peek()
                .map_or(true, |next| next.span.line > last.span.end_line);
            if ends_statement && next_on_new_line {
                return Ok(());
            }
        }
    }

    /// The comment group ending on the line right above `code[func_index]`,
    /// started on its own line.
    fn doc_comments(&self, func_index: usize) -> Vec<String> {
        let func = &self.code[func_index];
        let (floor, floor_line) = match func_index.checked_sub(1) {
            Some(idx) => (self.code[idx].span.end, self.code[idx].span.end_line),
            None => (0, 0),
        };

        let mut expected_end = func.span.line;
        let mut lines = Vec::new();
        let candidates = self.comments.iter().rev().filter(|comment| {
            comment.span.start >= floor
                && comment.span.end <= func.span.start
                && comment.span.line > floor_line
        });
        for comment in candidates {
            if comment.span.end_line + 1 != expected_end {
                break;
            }
            match &comment.kind {
                TokenKind::LineComment(text) => lines.push(text.clone()),
                TokenKind::BlockComment(text) => lines.extend(block_lines(text).into_iter().rev()),
                _ => break,
            }
            expected_end = comment.span.line;
        }
        lines.reverse();
        lines
    }
}

fn is_opening(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Punct('(' | '[' | '{'))
}

fn closing_for(token: &Token) -> Option<char> {
    match token.kind {
        TokenKind::Punct('(') => Some(')'),
        TokenKind::Punct('[') => Some(']'),
        TokenKind::Punct('{') => Some('}'),
        _ => None,
    }
}

fn unquote(literal: &str) -> String {
    literal
        .get(1..literal.len().saturating_sub(1))
        .unwrap_or_default()
        .to_string()
}

fn block_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line).to_string()
        })
        .collect();
    while lines.first().is_some_and(String::is_empty) {
        lines.remove(0);
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Splits on commas that are not nested inside brackets.
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Punct('(' | '[' | '{') => depth += 1,
            TokenKind::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            TokenKind::Punct(',') if depth == 0 => {
                groups.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        groups.push(&tokens[start..]);
    }
    groups
}

fn is_named(group: &[Token]) -> bool {
    match group {
        [first, second, ..] => first
            .ident()
            .is_some_and(|name| !TYPE_KEYWORDS.contains(&name) && !second.is_punct('.')),
        _ => false,
    }
}

/// Expands `a, b string` style lists into one field per name.
fn parse_fields(tokens: &[Token]) -> Fields {
    let groups = split_top_level(tokens);
    if !groups.iter().any(|group| is_named(group)) {
        return Fields(
            groups
                .into_iter()
                .map(|group| Field::new("", type_string(group)))
                .collect(),
        );
    }

    let mut fields = Vec::new();
    let mut pending = Vec::new();
    for group in groups {
        match group {
            [single] if single.ident().is_some() => {
                pending.push(single.ident().unwrap_or_default().to_string());
            }
            _ if is_named(group) => {
                let type_name = type_string(&group[1..]);
                for name in pending.drain(..) {
                    fields.push(Field::new(name, type_name.clone()));
                }
                fields.push(Field::new(
                    group[0].ident().unwrap_or_default(),
                    type_name,
                ));
            }
            _ => fields.push(Field::new("", type_string(group))),
        }
    }
    fields.extend(pending.into_iter().map(|name| Field::new("", name)));
    Fields(fields)
}

/// Renders identifiers, `pkg.Type`, `*T`, `[]T` and `...T`; anything else is
/// [`UNKNOWN_TYPE`].
fn type_string(tokens: &[Token]) -> String {
    match parse_type(tokens) {
        Some((rendered, [])) => rendered,
        _ => UNKNOWN_TYPE.to_string(),
    }
}

fn parse_type(tokens: &[Token]) -> Option<(String, &[Token])> {
    let (first, rest) = tokens.split_first()?;
    match &first.kind {
        TokenKind::Punct('*') => {
            let (inner, rest) = parse_type(rest)?;
            Some((format!("*{inner}"), rest))
        }
        TokenKind::Ellipsis => {
            let (inner, rest) = parse_type(rest)?;
            Some((format!("...{inner}"), rest))
        }
        TokenKind::Punct('[') => {
            let (close, rest) = rest.split_first()?;
            if !close.is_punct(']') {
                return None;
            }
            let (inner, rest) = parse_type(rest)?;
            Some((format!("[]{inner}"), rest))
        }
        TokenKind::Ident(name) if !TYPE_KEYWORDS.contains(&name.as_str()) => match rest {
            [dot, selector, rest @ ..] if dot.is_punct('.') => {
                let selector = selector.ident()?;
                Some((format!("{name}.{selector}"), rest))
            }
            _ => Some((name.clone(), rest)),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> Function {
        let package = extract(source).unwrap();
        assert_eq!(package.functions.len(), 1, "{package:?}");
        package.functions.into_iter().next().unwrap()
    }

    #[test]
    fn extracts_pointer_receiver_method() {
        let function = single(
            "package conv\n\nfunc (r *Registry) Join(a, b string) error {\n\treturn nil\n}\n",
        );
        assert_eq!(function.name, "Join");
        assert_eq!(function.receiver, Field::new("r", "*Registry"));
        assert_eq!(function.params.to_string(), "a string, b string");
        assert_eq!(function.results.to_string(), "error");
        assert_eq!(function.body, "{\n\treturn nil\n}");
        assert_eq!(function.line, 3);
    }

    #[test]
    fn collects_doc_comments() {
        let function = single(
            "package conv\n\n// ToBool converts a value.\n//\n// Example: toBool 1\nfunc (r *R) ToBool(v any) (bool, error) { return false, nil }\n",
        );
        assert_eq!(
            function.doc,
            ["ToBool converts a value.", "", "Example: toBool 1"]
        );
        assert_eq!(function.results.to_string(), "bool, error");
    }

    #[test]
    fn blank_line_detaches_comments() {
        let function = single("package conv\n\n// Detached.\n\nfunc (r R) A() {}\n");
        assert!(function.doc.is_empty());
    }

    #[test]
    fn block_comment_is_a_doc_comment() {
        let function = single("package conv\n/*\n * Block doc.\n */\nfunc (R) A() {}\n");
        assert_eq!(function.doc, ["Block doc."]);
        assert_eq!(function.receiver, Field::new("", "R"));
    }

    #[test]
    fn adjacent_block_and_line_comments_form_one_doc() {
        let function = single(
            "package conv\n/* Block part. */\n// Line part.\nfunc (r *R) A() {}\n",
        );
        assert_eq!(function.doc, ["Block part.", "Line part."]);

        let function = single(
            "package conv\n// Line part.\n/*\n Block part.\n*/\nfunc (r *R) A() {}\n",
        );
        assert_eq!(function.doc, ["Line part.", "Block part."]);
    }

    #[test]
    fn braces_inside_literals_do_not_end_the_body() {
        let function = single(
            "package conv\nfunc (r *R) S() string {\n\treturn \"}\" + `{` + string('}') // }\n}\n",
        );
        assert!(function.body.ends_with("// }\n}"));
    }

    #[test]
    fn types_are_rendered_or_marked_unknown() {
        let function = single(
            "package conv\nfunc (r *R[T]) M(a []*time.Time, b map[string]int, c func() error, values ...any) *pkg.Out {}\n",
        );
        assert_eq!(function.receiver.type_name, UNKNOWN_TYPE);
        assert_eq!(
            function.params.to_string(),
            "a []*time.Time, b unknown, c unknown, values ...any"
        );
        assert!(function.params.last().unwrap().is_variadic());
        assert_eq!(function.results.to_string(), "*pkg.Out");
    }

    #[test]
    fn unnamed_parameters_keep_their_types() {
        let function = single("package conv\nfunc (r *R) M(string, int) (n int, err error) {}\n");
        assert_eq!(function.params.to_string(), "string, int");
        assert_eq!(function.results.to_string(), "n int, err error");
        assert!(function.returns_error());
    }

    #[test]
    fn reads_imports_and_skips_other_declarations() {
        let package = extract(
            "package conv\n\nimport (\n\t\"fmt\"\n\tc \"github.com/spf13/cast\"\n)\nimport _ \"embed\"\n\ntype R struct {\n\tname string\n}\n\nvar hook = func() {}\n\nconst (\n\tA = 1\n)\n\nfunc (r *R) A() {}\n",
        )
        .unwrap();
        assert_eq!(package.name, "conv");
        let imports: Vec<String> = package.imports.iter().map(ToString::to_string).collect();
        assert_eq!(imports, ["\"fmt\"", "c \"github.com/spf13/cast\"", "_ \"embed\""]);
        assert_eq!(package.functions.len(), 1);
    }

    #[test]
    fn receiverless_functions_are_rejected() {
        let err = extract("package conv\n\nfunc Helper() {}\n").unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingReceiver {
                function: "Helper".into(),
                line: 3
            }
        );
    }

    #[test]
    fn syntax_errors_carry_lines() {
        assert_eq!(
            extract("// just a comment\nfunc").unwrap_err(),
            ExtractError::MissingPackage { line: 2 }
        );
        let err = extract("package conv\nfunc (r *R) A() {\n\tif x {\n}\n").unwrap_err();
        assert_eq!(
            err,
            ExtractError::Unbalanced {
                delimiter: '{',
                line: 2
            }
        );
        let err = extract("package conv\n)\n").unwrap_err();
        assert_eq!(err.line(), 2);
    }
}
