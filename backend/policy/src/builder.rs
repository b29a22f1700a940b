use crate::types::{Policy, Statement};

/// Accumulates statements, then seals them into an immutable [`Policy`].
///
/// A fresh builder is empty; each `add_*` call moves it to accumulating;
/// [`PolicyBuilder::build`] consumes it, so a sealed policy can never gain
/// another statement.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    statements: Vec<Statement>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_statement(&mut self, statement: Statement) -> &mut Self {
        self.statements.push(statement);
        self
    }

    /// Add an `Allow` statement unless `actions` is empty.
    pub fn add_allow<A, R>(&mut self, sid: Option<String>, actions: A, resources: R) -> &mut Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let statement = Statement::allow(sid, actions, resources);
        if !statement.actions().is_empty() {
            self.statements.push(statement);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn build(self) -> Policy {
        Policy::sealed(self.statements)
    }
}
