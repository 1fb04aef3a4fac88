use crate::ast::*;
use crate::lexer::{LexError, Lexer, Line, Token};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}, expected {1}")]
    Unexpected(Token, &'static str),
    #[error("Unexpected end of line, expected {0}")]
    UnexpectedEol(&'static str),
    #[error("Unclosed {0} block at end of input")]
    Unclosed(&'static str),
    #[error("{0}")]
    Schema(#[from] SchemaIssue),
}

/// A recoverable problem. `line` is `None` for issues found after the scan,
/// when references and group members are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub line: Option<usize>,
    pub error: ParseError,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub schema: Schema,
    pub warnings: Vec<ParseWarning>,
}

/// Parse DBML source. Never fails: statements that cannot be understood are
/// skipped and reported in [`ParseOutcome::warnings`].
pub fn parse_dbml(input: &str) -> ParseOutcome {
    Parser::new(input).parse()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Context {
    TopLevel,
    Table(usize),
    Group(usize),
    RefBlock,
}

pub struct Parser {
    lines: Vec<Line>,
    context: Context,
    /// Open braces of a block whose content is ignored (Enum, Project, indexes, ...).
    skip_depth: usize,
    ref_block_name: Option<String>,
    tables: Vec<Table>,
    relationships: Vec<Relationship>,
    groups: Vec<TableGroup>,
    warnings: Vec<ParseWarning>,
}

/// Cursor over the tokens of a single line.
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &'t Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &'t Token {
        self.tokens.get(self.pos + n).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &'t Token {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn rest(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn contains(&self, tok: &Token) -> bool {
        self.rest().contains(tok)
    }

    fn check_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        match self.advance() {
            Token::Eof => Err(ParseError::UnexpectedEol(what)),
            tok if *tok == expected => Ok(()),
            tok => Err(ParseError::Unexpected(tok.clone(), what)),
        }
    }

    /// Identifier, quoted name, or digit-led name.
    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Ident(s) | Token::Str(s) | Token::Num(s) => Ok(s.clone()),
            Token::Eof => Err(ParseError::UnexpectedEol("name")),
            tok => Err(ParseError::Unexpected(tok.clone(), "name")),
        }
    }

    /// `name` or `schema.name`; the schema qualifier is dropped.
    fn expect_table_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_name()?;
        while self.eat(&Token::Dot) {
            name = self.expect_name()?;
        }
        Ok(name)
    }
}

/// A `key: value` entry of a `[...]` settings list. Multi-word keys such as
/// `not null` are joined with a single space and lowercased.
#[derive(Debug, Clone, PartialEq)]
struct Setting {
    key: String,
    value: Vec<Token>,
}

impl Setting {
    fn text(&self) -> Option<String> {
        self.value.iter().find_map(|t| match t {
            Token::Str(s) | Token::Ident(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn color(&self) -> Option<String> {
        self.value.iter().find_map(|t| match t {
            Token::Color(s) | Token::Str(s) => Some(s.clone()),
            _ => None,
        })
    }
}

fn parse_settings(cur: &mut Cursor) -> Result<Vec<Setting>, ParseError> {
    cur.expect(Token::LBracket, "[")?;

    let mut chunks: Vec<Vec<Token>> = vec![Vec::new()];
    let mut depth = 0usize;
    loop {
        match cur.advance() {
            Token::Eof => return Err(ParseError::UnexpectedEol("]")),
            Token::RBracket if depth == 0 => break,
            Token::Comma if depth == 0 => chunks.push(Vec::new()),
            tok => {
                match tok {
                    Token::LParen | Token::LBracket => depth += 1,
                    Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                    _ => {}
                }
                if let Some(chunk) = chunks.last_mut() {
                    chunk.push(tok.clone());
                }
            }
        }
    }

    let settings = chunks
        .into_iter()
        .filter(|c| !c.is_empty())
        .filter_map(|chunk| {
            let split = chunk
                .iter()
                .position(|t| *t == Token::Colon)
                .unwrap_or(chunk.len());
            let words: Vec<String> = chunk[..split]
                .iter()
                .filter_map(|t| match t {
                    Token::Ident(s) => Some(s.to_ascii_lowercase()),
                    _ => None,
                })
                .collect();
            if words.is_empty() {
                return None;
            }
            let value = chunk.get(split + 1..).map(<[Token]>::to_vec).unwrap_or_default();
            Some(Setting {
                key: words.join(" "),
                value,
            })
        })
        .collect();

    Ok(settings)
}

fn parse_relation_op(cur: &mut Cursor) -> Option<Cardinality> {
    let cardinality = match cur.peek() {
        Token::Gt => Cardinality::ManyToOne,
        Token::Lt => Cardinality::OneToMany,
        Token::LtGt => Cardinality::ManyToMany,
        Token::Minus => Cardinality::OneToOne,
        _ => return None,
    };
    cur.advance();
    Some(cardinality)
}

/// `table.column`, `schema.table.column` or `table.(a, b)`; composite
/// endpoints resolve to their first column.
fn parse_endpoint(cur: &mut Cursor) -> Result<(String, String), ParseError> {
    let mut parts = vec![cur.expect_name()?];
    while cur.eat(&Token::Dot) {
        if cur.eat(&Token::LParen) {
            parts.push(cur.expect_name()?);
            while !cur.eat(&Token::RParen) {
                if cur.at_end() {
                    return Err(ParseError::UnexpectedEol(")"));
                }
                cur.advance();
            }
            break;
        }
        parts.push(cur.expect_name()?);
    }

    match (parts.pop(), parts.pop()) {
        (Some(column), Some(table)) => Ok((table, column)),
        _ => Err(ParseError::Unexpected(cur.peek().clone(), "table.column")),
    }
}

/// Column type: `int`, `varchar(255)`, `decimal(10,2)`, `public.mood`, `int[]`.
fn parse_type(cur: &mut Cursor) -> Result<String, ParseError> {
    let mut typ = cur.expect_name()?;
    while cur.eat(&Token::Dot) {
        typ.push('.');
        typ.push_str(&cur.expect_name()?);
    }

    if cur.eat(&Token::LParen) {
        typ.push('(');
        let mut first = true;
        loop {
            match cur.advance() {
                Token::RParen => break,
                Token::Eof => return Err(ParseError::UnexpectedEol(")")),
                Token::Comma => {
                    typ.push(',');
                    first = true;
                    continue;
                }
                Token::Ident(s) | Token::Num(s) | Token::Str(s) => {
                    if !first {
                        typ.push(' ');
                    }
                    typ.push_str(s);
                }
                tok => return Err(ParseError::Unexpected(tok.clone(), "type argument")),
            }
            first = false;
        }
        typ.push(')');
    }

    // Array suffix `[]` must not be confused with a settings list.
    if *cur.peek() == Token::LBracket && *cur.peek_at(1) == Token::RBracket {
        cur.advance();
        cur.advance();
        typ.push_str("[]");
    }

    Ok(typ)
}

fn brace_balance(depth: usize, tokens: &[Token]) -> usize {
    tokens.iter().fold(depth, |d, t| match t {
        Token::LBrace => d + 1,
        Token::RBrace => d.saturating_sub(1),
        _ => d,
    })
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            lines: Lexer::new(input).tokenize_lines(),
            context: Context::TopLevel,
            skip_depth: 0,
            ref_block_name: None,
            tables: Vec::new(),
            relationships: Vec::new(),
            groups: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, line: Option<usize>, error: ParseError) {
        match line {
            Some(line) => warn!(line, %error, "skipping unparseable statement"),
            None => warn!(%error, "dropping unresolved schema item"),
        }
        self.warnings.push(ParseWarning { line, error });
    }

    pub fn parse(mut self) -> ParseOutcome {
        let lines = std::mem::take(&mut self.lines);

        for line in &lines {
            let tokens = match &line.tokens {
                Ok(tokens) => tokens,
                Err(e) => {
                    self.warn(Some(line.number), e.clone().into());
                    continue;
                }
            };

            if self.skip_depth > 0 {
                self.skip_depth = brace_balance(self.skip_depth, tokens);
                continue;
            }

            if let Err(e) = self.parse_line(tokens) {
                self.warn(Some(line.number), e);
            }
        }

        let unclosed = match self.context {
            Context::TopLevel => None,
            Context::Table(_) => Some("Table"),
            Context::Group(_) => Some("TableGroup"),
            Context::RefBlock => Some("Ref"),
        };
        if let Some(block) = unclosed {
            let last = lines.last().map(|l| l.number);
            self.warn(last, ParseError::Unclosed(block));
        }

        let mut schema = Schema {
            tables: std::mem::take(&mut self.tables),
            relationships: std::mem::take(&mut self.relationships),
            groups: std::mem::take(&mut self.groups),
        };
        for issue in schema.normalize() {
            self.warn(None, issue.into());
        }

        debug!(
            tables = schema.tables.len(),
            relationships = schema.relationships.len(),
            groups = schema.groups.len(),
            warnings = self.warnings.len(),
            "parsed dbml"
        );

        ParseOutcome {
            schema,
            warnings: self.warnings,
        }
    }

    fn parse_line(&mut self, tokens: &[Token]) -> Result<(), ParseError> {
        let mut cur = Cursor::new(tokens);
        match self.context {
            Context::TopLevel => self.parse_top_level(&mut cur),
            Context::Table(idx) => self.parse_table_line(idx, &mut cur),
            Context::Group(idx) => self.parse_group_members(idx, &mut cur),
            Context::RefBlock => self.parse_ref_block_line(&mut cur),
        }
    }

    fn is_ref_decl(cur: &Cursor) -> bool {
        cur.check_keyword("ref")
            && match cur.peek_at(1) {
                Token::Colon | Token::LBrace => true,
                Token::Ident(_) | Token::Str(_) => {
                    matches!(cur.peek_at(2), Token::Colon | Token::LBrace)
                }
                _ => false,
            }
    }

    fn is_block_decl(cur: &Cursor, kw: &str) -> bool {
        cur.check_keyword(kw) && cur.contains(&Token::LBrace)
    }

    fn parse_top_level(&mut self, cur: &mut Cursor) -> Result<(), ParseError> {
        if cur.check_keyword("table") {
            self.open_table(cur)
        } else if cur.check_keyword("ref") {
            self.parse_ref(cur)
        } else if cur.check_keyword("tablegroup") {
            self.open_group(cur)
        } else if ["enum", "project", "note", "tablepartial", "records"]
            .iter()
            .any(|kw| cur.check_keyword(kw))
        {
            self.skip_depth = brace_balance(0, cur.rest());
            Ok(())
        } else {
            Err(ParseError::Unexpected(
                cur.peek().clone(),
                "Table, Ref, TableGroup, Enum, Project or Note",
            ))
        }
    }

    fn open_table(&mut self, cur: &mut Cursor) -> Result<(), ParseError> {
        cur.advance(); // Table
        let name = cur.expect_table_name()?;

        let alias = if cur.check_keyword("as") {
            cur.advance();
            Some(cur.expect_name()?)
        } else {
            None
        };

        let settings = if *cur.peek() == Token::LBracket {
            parse_settings(cur)?
        } else {
            Vec::new()
        };

        if !cur.at_end() && *cur.peek() != Token::LBrace {
            return Err(ParseError::Unexpected(cur.peek().clone(), "{"));
        }

        let mut table = Table::new(name);
        table.alias = alias;
        for setting in &settings {
            match setting.key.as_str() {
                "headercolor" => {
                    if let Some(color) = setting.color() {
                        table.header_color = color;
                    }
                }
                "note" => table.note = setting.text(),
                _ => {}
            }
        }

        self.tables.push(table);
        let idx = self.tables.len() - 1;
        self.context = Context::Table(idx);

        // Single-line body: `Table t { id int pk }`
        if cur.eat(&Token::LBrace) {
            let mut body = cur.rest();
            if let Some((Token::RBrace, inner)) = body.split_last() {
                body = inner;
                self.context = Context::TopLevel;
            }
            if !body.is_empty() {
                self.parse_column(idx, &mut Cursor::new(body))?;
            }
        }

        Ok(())
    }

    fn parse_table_line(&mut self, idx: usize, cur: &mut Cursor) -> Result<(), ParseError> {
        match cur.peek() {
            Token::RBrace => {
                self.context = Context::TopLevel;
                return Ok(());
            }
            // Opening brace on its own line after the header.
            Token::LBrace if cur.tokens.len() == 1 => return Ok(()),
            _ => {}
        }

        // A new declaration implicitly closes the current table.
        if Self::is_block_decl(cur, "table")
            || Self::is_ref_decl(cur)
            || Self::is_block_decl(cur, "tablegroup")
            || Self::is_block_decl(cur, "enum")
            || Self::is_block_decl(cur, "project")
        {
            debug!(table = %self.tables[idx].name, "table closed by next declaration");
            self.context = Context::TopLevel;
            return self.parse_top_level(cur);
        }

        if cur.check_keyword("note") && matches!(cur.peek_at(1), Token::Colon) {
            cur.advance();
            cur.advance();
            self.tables[idx].note = match cur.peek() {
                Token::Str(s) => Some(s.clone()),
                _ => None,
            };
            return Ok(());
        }

        if (cur.check_keyword("note") || cur.check_keyword("indexes"))
            && matches!(cur.peek_at(1), Token::LBrace | Token::Eof)
        {
            self.skip_depth = brace_balance(0, cur.rest());
            return Ok(());
        }

        self.parse_column(idx, cur)
    }

    fn parse_column(&mut self, idx: usize, cur: &mut Cursor) -> Result<(), ParseError> {
        let name = cur.expect_name()?;
        let type_name = parse_type(cur)?;
        let settings = if *cur.peek() == Token::LBracket {
            parse_settings(cur)?
        } else {
            Vec::new()
        };
        if !cur.at_end() {
            return Err(ParseError::Unexpected(
                cur.peek().clone(),
                "column settings or end of line",
            ));
        }

        let mut column = Column::new(name, type_name);
        let mut deferred = None;
        for setting in &settings {
            match setting.key.as_str() {
                "pk" | "primary key" => column.is_primary_key = true,
                "unique" => column.unique = true,
                "not null" => column.not_null = true,
                "note" => column.note = setting.text(),
                "ref" => match self.inline_ref(idx, &column.name, &setting.value) {
                    Ok(rel) => self.relationships.push(rel),
                    Err(e) => deferred = Some(e),
                },
                _ => {}
            }
        }
        self.tables[idx].columns.push(column);

        match deferred {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// `ref: > users.id` on a column. A missing operator means one-to-one.
    fn inline_ref(
        &self,
        idx: usize,
        column: &str,
        value: &[Token],
    ) -> Result<Relationship, ParseError> {
        let mut cur = Cursor::new(value);
        let cardinality = parse_relation_op(&mut cur).unwrap_or_default();
        let (to_table, to_column) = parse_endpoint(&mut cur)?;
        if !cur.at_end() {
            return Err(ParseError::Unexpected(cur.peek().clone(), "end of ref"));
        }
        Ok(Relationship {
            name: None,
            from_table: self.tables[idx].name.clone(),
            from_column: column.to_string(),
            to_table,
            to_column,
            cardinality,
        })
    }

    fn parse_ref(&mut self, cur: &mut Cursor) -> Result<(), ParseError> {
        cur.advance(); // Ref
        let name = match cur.peek() {
            Token::Ident(_) | Token::Str(_) => Some(cur.expect_name()?),
            _ => None,
        };

        if cur.eat(&Token::LBrace) {
            self.ref_block_name = name;
            self.context = Context::RefBlock;
            if !cur.at_end() {
                return self.parse_ref_block_line(cur);
            }
            return Ok(());
        }

        cur.expect(Token::Colon, ":")?;
        let rel = Self::parse_ref_body(name, cur)?;
        self.relationships.push(rel);
        Ok(())
    }

    /// `a.col <op> b.col [delete: cascade]`
    fn parse_ref_body(name: Option<String>, cur: &mut Cursor) -> Result<Relationship, ParseError> {
        let (from_table, from_column) = parse_endpoint(cur)?;
        let cardinality = parse_relation_op(cur).ok_or_else(|| {
            ParseError::Unexpected(cur.peek().clone(), "relation (<, >, <>, -)")
        })?;
        let (to_table, to_column) = parse_endpoint(cur)?;
        if *cur.peek() == Token::LBracket {
            parse_settings(cur)?;
        }
        if !cur.at_end() && *cur.peek() != Token::RBrace {
            return Err(ParseError::Unexpected(cur.peek().clone(), "end of ref"));
        }
        Ok(Relationship {
            name,
            from_table,
            from_column,
            to_table,
            to_column,
            cardinality,
        })
    }

    fn parse_ref_block_line(&mut self, cur: &mut Cursor) -> Result<(), ParseError> {
        if cur.eat(&Token::RBrace) {
            self.context = Context::TopLevel;
            self.ref_block_name = None;
            return Ok(());
        }
        let rel = Self::parse_ref_body(self.ref_block_name.clone(), cur)?;
        self.relationships.push(rel);
        if cur.eat(&Token::RBrace) {
            self.context = Context::TopLevel;
            self.ref_block_name = None;
        }
        Ok(())
    }

    fn open_group(&mut self, cur: &mut Cursor) -> Result<(), ParseError> {
        cur.advance(); // TableGroup
        let name = cur.expect_table_name()?;
        let settings = if *cur.peek() == Token::LBracket {
            parse_settings(cur)?
        } else {
            Vec::new()
        };
        cur.expect(Token::LBrace, "{")?;

        let color = settings
            .iter()
            .find(|s| s.key == "color")
            .and_then(Setting::color)
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());

        self.groups.push(TableGroup {
            name,
            tables: Vec::new(),
            color,
        });
        let idx = self.groups.len() - 1;
        self.context = Context::Group(idx);
        self.parse_group_members(idx, cur)
    }

    fn parse_group_members(&mut self, idx: usize, cur: &mut Cursor) -> Result<(), ParseError> {
        if cur.check_keyword("note") && matches!(cur.peek_at(1), Token::Colon) {
            return Ok(());
        }

        while !cur.at_end() {
            match cur.peek() {
                Token::RBrace => {
                    cur.advance();
                    self.context = Context::TopLevel;
                    return Ok(());
                }
                Token::Comma => {
                    cur.advance();
                }
                Token::Ident(_) | Token::Str(_) | Token::Num(_) => {
                    let table = cur.expect_table_name()?;
                    self.groups[idx].tables.push(table);
                }
                tok => return Err(ParseError::Unexpected(tok.clone(), "table name")),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Schema {
        parse_dbml(input).schema
    }

    #[test]
    fn test_parse_table() {
        let input = r#"
            Table users [headercolor: #3498DB, note: 'people'] {
                id integer [pk, increment]
                email varchar(255) [unique, not null, note: "login"]
                balance decimal(10,2)
            }
        "#;
        let schema = parse(input);
        assert_eq!(schema.tables.len(), 1);
        let users = &schema.tables[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.header_color, "#3498DB");
        assert_eq!(users.note.as_deref(), Some("people"));
        assert_eq!(users.columns.len(), 3);
        assert!(users.columns[0].is_primary_key);
        assert!(users.columns[1].unique);
        assert!(users.columns[1].not_null);
        assert_eq!(users.columns[1].type_name, "varchar(255)");
        assert_eq!(users.columns[1].note.as_deref(), Some("login"));
        assert_eq!(users.columns[2].type_name, "decimal(10,2)");
    }

    #[test]
    fn test_defaults_and_empty_table() {
        let schema = parse("Table audit {\n}\nTable t { id int }");
        assert_eq!(schema.tables.len(), 2);
        assert!(schema.tables[0].columns.is_empty());
        assert_eq!(schema.tables[0].header_color, DEFAULT_COLOR);
        assert_eq!(schema.tables[1].columns.len(), 1);
    }

    #[test]
    fn test_inline_and_standalone_refs_match() {
        let inline = parse(
            r#"
            Table users { id int [pk] }
            Table orders {
                id int [pk]
                user_id int [ref: > users.id]
            }
        "#,
        );
        let standalone = parse(
            r#"
            Table users { id int [pk] }
            Table orders {
                id int [pk]
                user_id int
            }
            Ref: orders.user_id > users.id
        "#,
        );
        assert_eq!(inline.relationships.len(), 1);
        assert_eq!(inline.relationships, standalone.relationships);
        let rel = &inline.relationships[0];
        assert_eq!(rel.from_table, "orders");
        assert_eq!(rel.from_column, "user_id");
        assert_eq!(rel.to_table, "users");
        assert_eq!(rel.to_column, "id");
        assert_eq!(rel.cardinality, Cardinality::ManyToOne);
    }

    #[test]
    fn test_refs_through_table_alias() {
        let outcome = parse_dbml(
            r#"
            Table users as U {
                id int [pk]
            }
            Table posts {
                id int [pk]
                user_id int [ref: > U.id]
            }
            Ref: posts.id - U.id
        "#,
        );
        assert!(outcome.warnings.is_empty());
        let rels = &outcome.schema.relationships;
        assert_eq!(rels.len(), 2);
        assert_eq!(
            (rels[0].from_table.as_str(), rels[0].to_table.as_str()),
            ("posts", "users")
        );
        assert_eq!(rels[0].cardinality, Cardinality::ManyToOne);
        assert_eq!(rels[1].to_table, "users");
        assert_eq!(rels[1].cardinality, Cardinality::OneToOne);
    }

    #[test]
    fn test_ref_operators() {
        let schema = parse(
            r#"
            Table a { id int }
            Table b { id int }
            Ref: a.id > b.id
            Ref: a.id < b.id
            Ref: a.id <> b.id
            Ref: a.id - b.id
            Ref named: a.id - b.id [delete: cascade]
        "#,
        );
        let cards: Vec<Cardinality> = schema.relationships.iter().map(|r| r.cardinality).collect();
        assert_eq!(
            cards,
            vec![
                Cardinality::ManyToOne,
                Cardinality::OneToMany,
                Cardinality::ManyToMany,
                Cardinality::OneToOne,
                Cardinality::OneToOne,
            ]
        );
        assert_eq!(schema.relationships[4].name.as_deref(), Some("named"));
    }

    #[test]
    fn test_inline_ref_without_operator_is_one_to_one() {
        let schema = parse("Table a { id int }\nTable b {\n  a_id int [ref: a.id]\n}");
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].cardinality, Cardinality::OneToOne);
    }

    #[test]
    fn test_ref_block_and_composite() {
        let schema = parse(
            r#"
            Table a { id int }
            Table b {
                id int
                x int
            }
            Ref fk_block {
                b.x > a.id
                b.(id, x) - a.(id)
            }
        "#,
        );
        assert_eq!(schema.relationships.len(), 2);
        assert_eq!(schema.relationships[0].name.as_deref(), Some("fk_block"));
        assert_eq!(schema.relationships[1].from_column, "id");
    }

    #[test]
    fn test_table_group() {
        let schema = parse(
            r#"
            Table invoices { id int }
            Table payments { id int }
            Table users { id int }
            TableGroup billing [color: #2ecc71] {
                invoices
                public.payments, ghost
            }
        "#,
        );
        assert_eq!(schema.groups.len(), 1);
        assert_eq!(schema.groups[0].name, "billing");
        assert_eq!(schema.groups[0].color, "#2ecc71");
        assert_eq!(schema.groups[0].tables, vec!["invoices", "payments"]);
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let outcome = parse_dbml(
            r#"
            Table users {
                id int [pk]
                ??? what
                name varchar
            }
            this is not dbml
            Table orders {
                id int
            }
        "#,
        );
        assert_eq!(outcome.schema.tables.len(), 2);
        assert_eq!(outcome.schema.tables[0].columns.len(), 2);
        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.warnings[0].line, Some(4));
        assert_eq!(outcome.warnings[1].line, Some(7));
    }

    #[test]
    fn test_dangling_reference_dropped() {
        let outcome = parse_dbml(
            r#"
            Table orders {
                id int
                user_id int [ref: > users.id]
            }
        "#,
        );
        assert_eq!(outcome.schema.tables.len(), 1);
        assert!(outcome.schema.relationships.is_empty());
        assert!(matches!(
            outcome.warnings[0].error,
            ParseError::Schema(SchemaIssue::DanglingReference { .. })
        ));
        assert_eq!(outcome.warnings[0].line, None);
    }

    #[test]
    fn test_skipped_blocks() {
        let schema = parse(
            r#"
            Project shop {
                database_type: 'PostgreSQL'
                Note: 'x'
            }
            Enum status {
                active
                inactive [note: 'gone']
            }
            Table t {
                id int
                status status
                Note: 'table note'
                indexes {
                    (id, status) [unique]
                    id [name: 'idx']
                }
            }
            /* Table ignored { id int } */
        "#,
        );
        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables[0].columns.len(), 2);
        assert_eq!(schema.tables[0].note.as_deref(), Some("table note"));
    }

    #[test]
    fn test_table_closed_by_next_declaration() {
        let outcome = parse_dbml(
            r#"
            Table a {
                id int
            Table b {
                id int
                a_id int
            Ref: b.a_id > a.id
        "#,
        );
        assert_eq!(outcome.schema.tables.len(), 2);
        assert_eq!(outcome.schema.tables[0].columns.len(), 1);
        assert_eq!(outcome.schema.tables[1].columns.len(), 2);
        assert_eq!(outcome.schema.relationships.len(), 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_qualified_and_quoted_names() {
        let schema = parse("Table public.\"order items\" as OI {\n  \"item id\" int\n}");
        assert_eq!(schema.tables[0].name, "order items");
        assert_eq!(schema.tables[0].alias.as_deref(), Some("OI"));
        assert_eq!(schema.tables[0].columns[0].name, "item id");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let input = r#"
            Table users { id int [pk] }
            Table orders {
                id int [pk]
                user_id int [ref: > users.id]
            }
            TableGroup shop { users orders }
        "#;
        assert_eq!(parse_dbml(input), parse_dbml(input));
    }

    #[test]
    fn test_empty_input() {
        let outcome = parse_dbml("   \n// nothing\n");
        assert!(outcome.schema.is_empty());
        assert!(outcome.warnings.is_empty());
    }
}
