#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use oxide_grammar::{
    CompiledQuery, Connection, Dialect, Grammar, GrammarConfig, Processor, Result, Row,
    SchemaGrammar, SqlValue,
};

/// Records every statement it is handed and answers selects from a queue
/// of canned result sets.
#[derive(Debug)]
pub struct MockConnection {
    grammar: Box<dyn Grammar>,
    schema_grammar: Box<dyn SchemaGrammar>,
    processor: Box<dyn Processor>,
    executed: RefCell<Vec<CompiledQuery>>,
    results: RefCell<VecDeque<Vec<Row>>>,
    insert_id: Option<i64>,
    affected: u64,
}

impl MockConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_config(&GrammarConfig::new(dialect))
    }

    pub fn with_config(config: &GrammarConfig) -> Self {
        Self {
            grammar: config
                .query_grammar()
                .unwrap_or_else(|e| panic!("Failed to build grammar: {e}")),
            schema_grammar: config
                .schema_grammar()
                .unwrap_or_else(|e| panic!("Failed to build schema grammar: {e}")),
            processor: config.processor(),
            executed: RefCell::new(Vec::new()),
            results: RefCell::new(VecDeque::new()),
            insert_id: None,
            affected: 1,
        }
    }

    /// Queues the rows returned by the next select.
    pub fn returning(self, rows: Vec<Row>) -> Self {
        self.results.borrow_mut().push_back(rows);
        self
    }

    pub fn with_insert_id(mut self, id: i64) -> Self {
        self.insert_id = Some(id);
        self
    }

    /// SQL of every statement run so far.
    pub fn sql(&self) -> Vec<String> {
        self.executed.borrow().iter().map(|q| q.sql.clone()).collect()
    }

    pub fn executed(&self) -> Vec<CompiledQuery> {
        self.executed.borrow().clone()
    }

    fn record(&self, query: &CompiledQuery) {
        self.executed.borrow_mut().push(query.clone());
    }
}

impl Connection for MockConnection {
    fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    fn schema_grammar(&self) -> &dyn SchemaGrammar {
        self.schema_grammar.as_ref()
    }

    fn processor(&self) -> &dyn Processor {
        self.processor.as_ref()
    }

    fn select(&self, query: &CompiledQuery) -> Result<Vec<Row>> {
        self.record(query);
        Ok(self.results.borrow_mut().pop_front().unwrap_or_default())
    }

    fn statement(&self, query: &CompiledQuery) -> Result<bool> {
        self.record(query);
        Ok(true)
    }

    fn affecting_statement(&self, query: &CompiledQuery) -> Result<u64> {
        self.record(query);
        Ok(self.affected)
    }

    fn last_insert_id(&self) -> Result<Option<i64>> {
        Ok(self.insert_id)
    }
}

/// Builds a row from `(column, value)` pairs.
pub fn row(entries: &[(&str, SqlValue)]) -> Row {
    entries
        .iter()
        .map(|(column, value)| ((*column).to_string(), value.clone()))
        .collect()
}

pub fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}
