//! Parser for SQL `CREATE TABLE` DDL.
//!
//! A small keyword-aware lexer feeds a statement walker. Only the table
//! definitions matter here; every other statement is skipped wholesale.

use tracing::warn;

use super::{Diagnostic, DiagnosticKind, ParseError, ParseOutput};
use crate::model::{
    Entity, EntityKind, IntermediateSchema, KeyConstraint, Property, PropertyKind, Relationship,
    Requirement, ScalarType,
};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Num(String),
    Str(String),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Create,
    Table,
    Primary,
    Foreign,
    Key,
    References,
    Constraint,
    Not,
    Null,
    Eof,
}

fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            ';' => tokens.push(Token::Semicolon),
            '.' => tokens.push(Token::Dot),
            '\'' => {
                let mut s = String::new();
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    s.push(c);
                }
                tokens.push(Token::Str(s));
            }
            // Quoted identifiers keep their text, lose their quotes.
            '`' | '"' => {
                let quote = c;
                let mut s = String::new();
                for c in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    s.push(c);
                }
                tokens.push(Token::Ident(s));
            }
            c if c.is_ascii_digit() => {
                let mut s = String::from(c);
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Num(s));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut s = String::from(c);
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(keyword_or_ident(s));
            }
            _ => {}
        }
    }

    tokens.push(Token::Eof);
    tokens
}

fn keyword_or_ident(word: String) -> Token {
    match word.to_uppercase().as_str() {
        "CREATE" => Token::Create,
        "TABLE" => Token::Table,
        "PRIMARY" => Token::Primary,
        "FOREIGN" => Token::Foreign,
        "KEY" => Token::Key,
        "REFERENCES" => Token::References,
        "CONSTRAINT" => Token::Constraint,
        "NOT" => Token::Not,
        "NULL" => Token::Null,
        _ => Token::Ident(word),
    }
}

pub fn parse_relational(text: &str) -> Result<ParseOutput, ParseError> {
    let tokens = lex(text);
    let mut parser = Parser {
        tokens,
        pos: 0,
        schema: IntermediateSchema::new("RelationalSchema"),
        diagnostics: Vec::new(),
    };
    parser.run()?;
    Ok(ParseOutput {
        schema: parser.schema,
        diagnostics: parser.diagnostics,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    schema: IntermediateSchema,
    diagnostics: Vec<Diagnostic>,
}

struct ColumnDef {
    name: String,
    sql_type: String,
    not_null: bool,
    inline_pk: bool,
}

impl Parser {
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        let mut found_table = false;

        while self.current() != &Token::Eof {
            if self.current() == &Token::Create {
                self.advance();
                if self.current() == &Token::Table {
                    self.advance();
                    found_table = true;
                    self.parse_create_table();
                } else {
                    self.skip_statement();
                }
            } else {
                self.advance();
            }
        }

        if !found_table {
            return Err(ParseError::MalformedSchema {
                dialect: "relational",
                reason: "no CREATE TABLE statement found".to_string(),
            });
        }
        Ok(())
    }

    fn parse_create_table(&mut self) {
        let Token::Ident(name) = self.current() else {
            warn!("skipping CREATE TABLE without a table name");
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedFragment,
                "CREATE TABLE statement without a table name".to_string(),
            ));
            self.skip_statement();
            return;
        };
        let mut table = name.clone();
        self.advance();

        // schema.table: keep the table part.
        if self.current() == &Token::Dot {
            self.advance();
            if let Token::Ident(name) = self.current() {
                table = name.clone();
                self.advance();
            }
        }

        let mut entity = Entity::new(table.clone(), EntityKind::Relational);

        if self.current() != &Token::LParen {
            self.schema.insert_entity(entity);
            self.skip_statement();
            return;
        }
        self.advance();

        let mut columns: Vec<ColumnDef> = Vec::new();
        // Explicit PRIMARY KEY clause: (columns, optional constraint name).
        let mut explicit_pk: Option<(Vec<String>, Option<String>)> = None;
        let mut relationships: Vec<Relationship> = Vec::new();

        loop {
            match self.current().clone() {
                Token::RParen | Token::Eof => {
                    self.advance();
                    break;
                }
                Token::Comma => self.advance(),
                Token::Constraint => {
                    self.advance();
                    let name = match self.current() {
                        Token::Ident(n) => {
                            let n = n.clone();
                            self.advance();
                            Some(n)
                        }
                        _ => None,
                    };
                    match self.current() {
                        Token::Primary => {
                            if let Some(cols) = self.parse_primary_key() {
                                explicit_pk.get_or_insert((cols, name));
                            }
                        }
                        Token::Foreign => {
                            if let Some(rel) = self.parse_foreign_key(&table, name) {
                                relationships.push(rel);
                            }
                        }
                        _ => self.skip_item(),
                    }
                }
                Token::Primary => {
                    if let Some(cols) = self.parse_primary_key() {
                        explicit_pk.get_or_insert((cols, None));
                    }
                }
                Token::Foreign => {
                    // Unnamed FOREIGN KEY clauses carry no relationship name;
                    // consume them without emitting anything.
                    let _ = self.parse_foreign_key(&table, None);
                }
                Token::Ident(word) => {
                    let upper = word.to_uppercase();
                    if matches!(upper.as_str(), "UNIQUE" | "INDEX" | "CHECK") {
                        self.skip_item();
                    } else if let Some(col) = self.parse_column(word) {
                        columns.push(col);
                    }
                }
                Token::Key => self.skip_item(),
                _ => self.advance(),
            }
        }
        self.skip_statement();

        // An explicit PRIMARY KEY clause wins; otherwise the first column
        // with an inline marker becomes a single-column key.
        let (pk_columns, pk_name) = match explicit_pk {
            Some((cols, name)) => (cols, name),
            None => (
                columns
                    .iter()
                    .find(|c| c.inline_pk)
                    .map(|c| vec![c.name.clone()])
                    .unwrap_or_default(),
                None,
            ),
        };

        for col in &columns {
            entity.properties.push(Property {
                name: col.name.clone(),
                kind: PropertyKind::Scalar(map_type(&col.sql_type)),
                requirement: Some(if col.not_null {
                    Requirement::Required
                } else {
                    Requirement::Optional
                }),
                key: pk_columns.contains(&col.name),
            });
        }

        self.schema.insert_entity(entity);
        if !pk_columns.is_empty() {
            self.schema
                .key_constraints
                .push(KeyConstraint::new(table, pk_columns, pk_name));
        }
        self.schema.relationships.extend(relationships);
    }

    fn parse_column(&mut self, name: String) -> Option<ColumnDef> {
        self.advance();

        let sql_type = match self.current() {
            Token::Ident(t) => t.clone(),
            _ => {
                self.skip_item();
                return None;
            }
        };
        self.advance();

        // Type arguments like DECIMAL(10,2) never end the definition.
        if self.current() == &Token::LParen {
            self.skip_parenthesized();
        }

        let mut not_null = false;
        let mut inline_pk = false;

        loop {
            match self.current() {
                Token::Comma | Token::RParen | Token::Eof => break,
                Token::Not => {
                    self.advance();
                    if self.current() == &Token::Null {
                        self.advance();
                        not_null = true;
                    }
                }
                Token::Primary => {
                    self.advance();
                    if self.current() == &Token::Key {
                        self.advance();
                    }
                    inline_pk = true;
                }
                Token::LParen => self.skip_parenthesized(),
                _ => self.advance(),
            }
        }

        Some(ColumnDef {
            name,
            sql_type,
            not_null,
            inline_pk,
        })
    }

    fn parse_primary_key(&mut self) -> Option<Vec<String>> {
        self.advance(); // PRIMARY
        if self.current() != &Token::Key {
            self.skip_item();
            return None;
        }
        self.advance();
        let cols = self.parse_column_list();
        if cols.is_empty() { None } else { Some(cols) }
    }

    fn parse_foreign_key(&mut self, source: &str, name: Option<String>) -> Option<Relationship> {
        self.advance(); // FOREIGN
        if self.current() != &Token::Key {
            self.skip_item();
            return None;
        }
        self.advance();
        let _columns = self.parse_column_list();

        if self.current() != &Token::References {
            self.skip_item();
            return None;
        }
        self.advance();

        let target = match self.current() {
            Token::Ident(t) => t.clone(),
            _ => {
                self.skip_item();
                return None;
            }
        };
        self.advance();
        if self.current() == &Token::LParen {
            self.skip_parenthesized();
        }

        // A foreign key is a 1:1 link forward, 0:N backward.
        Some(Relationship {
            name: name?,
            source: source.to_string(),
            target,
            cardinality_fwd: "1:1".to_string(),
            cardinality_bwd: "0:N".to_string(),
            properties: Vec::new(),
        })
    }

    fn parse_column_list(&mut self) -> Vec<String> {
        let mut cols = Vec::new();
        if self.current() != &Token::LParen {
            return cols;
        }
        self.advance();
        loop {
            match self.current() {
                Token::Ident(name) => {
                    cols.push(name.clone());
                    self.advance();
                }
                Token::Comma => self.advance(),
                Token::RParen | Token::Eof => {
                    self.advance();
                    break;
                }
                _ => self.advance(),
            }
        }
        cols
    }

    fn skip_parenthesized(&mut self) {
        if self.current() != &Token::LParen {
            return;
        }
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the end of the current definition item (top-level comma or
    /// the closing paren of the column list).
    fn skip_item(&mut self) {
        loop {
            match self.current() {
                Token::Comma | Token::RParen | Token::Eof => break,
                Token::LParen => self.skip_parenthesized(),
                _ => self.advance(),
            }
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        if self.current() == &Token::Semicolon {
            self.advance();
        }
    }
}

fn map_type(sql_type: &str) -> ScalarType {
    let upper = sql_type.to_uppercase();
    if ["INT", "REAL", "SMALLINT"].iter().any(|t| upper.contains(t)) {
        ScalarType::Number
    } else if ["CHAR", "TEXT"].iter().any(|t| upper.contains(t)) {
        ScalarType::String
    } else if ["DATE", "TIMESTAMP"].iter().any(|t| upper.contains(t)) {
        ScalarType::Date
    } else {
        ScalarType::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_primary_key() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY, name TEXT NOT NULL);";
        let out = parse_relational(sql).unwrap();
        let schema = out.schema;
        assert_eq!(schema.name, "RelationalSchema");

        let users = schema.entity("users").unwrap();
        assert_eq!(users.kind, EntityKind::Relational);
        assert_eq!(users.properties.len(), 2);

        let id = &users.properties[0];
        assert_eq!(id.kind, PropertyKind::Scalar(ScalarType::Number));
        // Inline PK without NOT NULL: OPTIONAL but KEY.
        assert_eq!(id.requirement, Some(Requirement::Optional));
        assert!(id.key);

        let name = &users.properties[1];
        assert_eq!(name.kind, PropertyKind::Scalar(ScalarType::String));
        assert_eq!(name.requirement, Some(Requirement::Required));
        assert!(!name.key);

        assert_eq!(schema.key_constraints.len(), 1);
        let key = &schema.key_constraints[0];
        assert_eq!(key.name, "usersKey");
        assert_eq!(key.entity, "users");
        assert_eq!(key.properties, vec!["id"]);
    }

    #[test]
    fn test_explicit_primary_key_takes_precedence() {
        let sql = "
            CREATE TABLE shipments (
                region CHAR(2) PRIMARY KEY,
                seq INT NOT NULL,
                PRIMARY KEY (region, seq)
            );
        ";
        let out = parse_relational(sql).unwrap();
        let key = &out.schema.key_constraints[0];
        assert_eq!(key.properties, vec!["region", "seq"]);
        assert_eq!(key.name, "shipmentsKey");

        let shipments = out.schema.entity("shipments").unwrap();
        assert!(shipments.properties.iter().all(|p| p.key));
    }

    #[test]
    fn test_named_constraints() {
        let sql = "
            CREATE TABLE orders (
                id INT,
                user_id INT NOT NULL,
                total DECIMAL(10,2),
                placed_at TIMESTAMP,
                CONSTRAINT pk_orders PRIMARY KEY (id),
                CONSTRAINT fk_orders_user FOREIGN KEY (user_id) REFERENCES users (id)
            );
        ";
        let out = parse_relational(sql).unwrap();
        let schema = out.schema;

        let orders = schema.entity("orders").unwrap();
        assert_eq!(orders.properties.len(), 4);
        // DECIMAL is not in the closed dictionary and falls back to STRING;
        // its (10,2) arguments must not split the definition.
        assert_eq!(
            orders.properties[2].kind,
            PropertyKind::Scalar(ScalarType::String)
        );
        assert_eq!(
            orders.properties[3].kind,
            PropertyKind::Scalar(ScalarType::Date)
        );

        assert_eq!(schema.key_constraints[0].name, "pk_orders");
        assert_eq!(schema.relationships.len(), 1);
        let rel = &schema.relationships[0];
        assert_eq!(rel.name, "fk_orders_user");
        assert_eq!(rel.source, "orders");
        assert_eq!(rel.target, "users");
        assert_eq!(rel.cardinality_fwd, "1:1");
        assert_eq!(rel.cardinality_bwd, "0:N");
    }

    #[test]
    fn test_multiple_statements_and_quoting() {
        let sql = "
            CREATE TABLE `users` (id INT PRIMARY KEY);
            CREATE INDEX idx_users ON users (id);
            CREATE TABLE \"orders\" (
                id INT PRIMARY KEY,
                user_id INT,
                CONSTRAINT fk_u FOREIGN KEY (user_id) REFERENCES `users` (id)
            );
        ";
        let out = parse_relational(sql).unwrap();
        assert_eq!(out.schema.entities.len(), 2);
        assert_eq!(out.schema.entities[0].name, "users");
        assert_eq!(out.schema.entities[1].name, "orders");
        assert_eq!(out.schema.relationships.len(), 1);
        assert_eq!(out.schema.relationships[0].target, "users");
    }

    #[test]
    fn test_statement_without_table_name_is_skipped() {
        let sql = "
            CREATE TABLE (id INT);
            CREATE TABLE users (id INT PRIMARY KEY);
        ";
        let out = parse_relational(sql).unwrap();
        assert_eq!(out.schema.entities.len(), 1);
        assert_eq!(out.schema.entities[0].name, "users");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::MalformedFragment);
    }

    #[test]
    fn test_no_create_table_is_fatal() {
        assert!(matches!(
            parse_relational("SELECT * FROM users;"),
            Err(ParseError::MalformedSchema { dialect: "relational", .. })
        ));
    }

    #[test]
    fn test_comments_and_case_insensitive_keywords() {
        let sql = "
            -- user accounts
            create table users (
                id int primary key, /* surrogate */
                email varchar(255) not null
            );
        ";
        let out = parse_relational(sql).unwrap();
        let users = out.schema.entity("users").unwrap();
        assert_eq!(users.properties.len(), 2);
        assert_eq!(
            users.properties[1].kind,
            PropertyKind::Scalar(ScalarType::String)
        );
        assert_eq!(
            users.properties[1].requirement,
            Some(Requirement::Required)
        );
    }
}
