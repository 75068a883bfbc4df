//! KPF 行格式方言
//! The constrained, one-record-per-line flow dialect
//!
//! 只支持 KPF 实际用到的子集: `{ k: v, ... }` 映射、`[ a, b ]` 序列、
//! 普通标量和双引号标量。每条记录是一行 `- { <schema>: <body> }`。

use crate::error::{KpfError, Result};

/// 方言语法树
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(String),
    Map(Vec<(String, Node)>),
    Seq(Vec<Node>),
}

impl Node {
    pub fn scalar(s: impl Into<String>) -> Self {
        Node::Scalar(s.into())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Map(_) => "map",
            Node::Seq(_) => "sequence",
        }
    }
}

// ========== 解析 ==========

/// 解析一行记录
///
/// 空行和 `#` 注释行返回 `Ok(None)`, 否则返回 (schema 关键字, 主体)。
pub fn parse_line(line: &str) -> Result<Option<(String, Node)>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let rest = trimmed
        .strip_prefix('-')
        .ok_or_else(|| KpfError::malformed("record must start with '- '"))?;

    let mut parser = Parser::new(rest);
    parser.skip_ws();
    let node = parser.parse_value()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(KpfError::malformed(format!(
            "unexpected trailing text at column {}",
            parser.pos
        )));
    }

    match node {
        Node::Map(mut entries) if entries.len() == 1 => {
            let (key, body) = entries.remove(0);
            Ok(Some((key, body)))
        }
        Node::Map(entries) => Err(KpfError::malformed(format!(
            "record must hold exactly one schema entry, found {}",
            entries.len()
        ))),
        other => Err(KpfError::malformed(format!(
            "record must be a map, found {}",
            other.kind()
        ))),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(KpfError::malformed(format!(
                "expected '{}' at column {}, found {}",
                c,
                self.pos,
                self.peek().map_or("end of line".to_string(), |x| format!("'{}'", x))
            )))
        }
    }

    fn parse_value(&mut self) -> Result<Node> {
        match self.peek() {
            Some('{') => self.parse_map(),
            Some('[') => self.parse_seq(),
            Some('"') => Ok(Node::Scalar(self.parse_quoted()?)),
            Some(_) => Ok(Node::Scalar(self.parse_plain(&[',', ']', '}'])?)),
            None => Err(KpfError::malformed("unexpected end of line")),
        }
    }

    fn parse_map(&mut self) -> Result<Node> {
        self.expect('{')?;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Node::Map(entries));
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some('"') => self.parse_quoted()?,
                _ => self.parse_plain(&[':', ',', '}'])?,
            };
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    return Ok(Node::Map(entries));
                }
                _ => return self.expect('}').map(|_| Node::Map(Vec::new())),
            }
        }
    }

    fn parse_seq(&mut self) -> Result<Node> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Node::Seq(items));
        }
        loop {
            self.skip_ws();
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Node::Seq(items));
                }
                _ => return self.expect(']').map(|_| Node::Seq(Vec::new())),
            }
        }
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(KpfError::malformed("unterminated quoted string")),
                Some('"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some(c @ ('"' | '\\')) => out.push(c),
                        Some(c) => {
                            return Err(KpfError::malformed(format!("unknown escape '\\{}'", c)))
                        }
                        None => return Err(KpfError::malformed("unterminated quoted string")),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// 普通标量: 读到任一终止符为止, 去掉首尾空白
    fn parse_plain(&mut self, stops: &[char]) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stops.contains(&c) || c == '{' || c == '[' {
                break;
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let text = text.trim();
        if text.is_empty() {
            return Err(KpfError::malformed(format!("empty value at column {}", start)));
        }
        Ok(text.to_string())
    }
}

// ========== 输出 ==========

/// 输出一行记录 (不含换行符)
pub fn emit_line(schema: &str, body: &Node) -> String {
    let mut out = String::from("- { ");
    push_scalar(&mut out, schema);
    out.push_str(": ");
    emit_node(&mut out, body);
    out.push_str(" }");
    out
}

fn emit_node(out: &mut String, node: &Node) {
    match node {
        Node::Scalar(s) => push_scalar(out, s),
        Node::Map(entries) => {
            if entries.is_empty() {
                out.push_str("{ }");
                return;
            }
            out.push_str("{ ");
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_scalar(out, k);
                out.push_str(": ");
                emit_node(out, v);
            }
            out.push_str(" }");
        }
        Node::Seq(items) => {
            if items.is_empty() {
                out.push_str("[ ]");
                return;
            }
            out.push_str("[ ");
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                emit_node(out, v);
            }
            out.push_str(" ]");
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.trim() != s
        || s.chars().any(|c| {
            matches!(c, '{' | '}' | '[' | ']' | ',' | ':' | '#' | '"' | '\\' | '\n' | '\t')
        })
}

fn push_scalar(out: &mut String, s: &str) {
    if !needs_quotes(s) {
        out.push_str(s);
        return;
    }
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geom_line() {
        let line =
            "- { geom: { id0: 0, id1: 66, g0: 104 349 210 385, poly0: [ [ 100, 399 ], [ 200, 398 ] ] } }";
        let (schema, body) = parse_line(line).unwrap().unwrap();
        assert_eq!(schema, "geom");
        let Node::Map(entries) = body else {
            panic!("body should be a map")
        };
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[2], ("g0".to_string(), Node::scalar("104 349 210 385")));
        let Node::Seq(points) = &entries[3].1 else {
            panic!("poly should be a sequence")
        };
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("# generated by hand").unwrap().is_none());
    }

    #[test]
    fn test_meta_with_punctuation_is_quoted() {
        let msg = "min / max geometry: 0,289 - 1278 719";
        let line = emit_line("meta", &Node::scalar(msg));
        assert_eq!(line, "- { meta: \"min / max geometry: 0,289 - 1278 719\" }");
        let (_, body) = parse_line(&line).unwrap().unwrap();
        assert_eq!(body, Node::scalar(msg));
    }

    #[test]
    fn test_plain_meta_is_not_quoted() {
        assert_eq!(
            emit_line("meta", &Node::scalar("Example geometry")),
            "- { meta: Example geometry }"
        );
    }

    #[test]
    fn test_quoted_escapes() {
        let name = "say \"hi\" \\ there";
        let body = Node::Map(vec![(name.to_string(), Node::scalar("1"))]);
        let line = emit_line("types", &body);
        let (_, parsed) = parse_line(&line).unwrap().unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_empty_collections() {
        let body = Node::Map(vec![("xs".to_string(), Node::Seq(vec![]))]);
        let line = emit_line("geom", &body);
        assert_eq!(line, "- { geom: { xs: [ ] } }");
        assert_eq!(parse_line(&line).unwrap().unwrap().1, body);
        assert_eq!(emit_line("geom", &Node::Map(vec![])), "- { geom: { } }");
    }

    #[test]
    fn test_malformed_lines() {
        for line in [
            "{ geom: { id0: 1 } }",
            "- { geom: { id0: 1 }",
            "- { geom: { id0: 1 } } trailing",
            "- { geom: { id0 } }",
            "- { meta: \"open }",
            "- [ 1, 2 ]",
            "- { a: 1, b: 2 }",
        ] {
            let err = parse_line(line).unwrap_err();
            assert!(err.is_malformed(), "{line} should be malformed");
        }
    }
}
