//! Query Façade
//!
//! Declaration-returning shortcuts over [`Traversal`]. Every lookup here is
//! a matcher underneath; the façade only adds kind filters and turns ids into
//! [`Declaration`] references.

use crate::config::QueryConfig;
use crate::decl::Declaration;
use crate::error::{QueryError, QueryResult};
use crate::graph::DeclGraph;
use crate::matcher::{Matcher, Traversal};
use crate::types::{DeclId, DeclKind};

#[derive(Debug, Clone, Copy)]
pub struct Query<'g> {
    graph: &'g DeclGraph,
    traversal: Traversal<'g>,
}

impl DeclGraph {
    /// Query the whole graph, starting at the global namespace.
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }
}

impl<'g> Query<'g> {
    pub fn new(graph: &'g DeclGraph) -> Self {
        Self {
            graph,
            traversal: Traversal::new(graph),
        }
    }

    pub fn with_config(mut self, config: &QueryConfig) -> Self {
        self.traversal = self.traversal.use_name_index(config.name_index);
        self
    }

    /// Restrict the query to the declarations inside `root`.
    pub fn within(mut self, root: DeclId) -> QueryResult<Self> {
        if self.graph.get(root).is_none() {
            return Err(QueryError::NoSuchDeclaration { id: root });
        }
        self.traversal = self.traversal.within(root);
        Ok(self)
    }

    pub fn direct_only(mut self) -> Self {
        self.traversal = self.traversal.direct_only();
        self
    }

    pub fn traversal(&self) -> Traversal<'g> {
        self.traversal
    }

    pub fn find_all(&self, matcher: &Matcher) -> Vec<&'g Declaration> {
        self.traversal
            .find_all(matcher)
            .into_iter()
            .map(|id| self.graph.decl(id))
            .collect()
    }

    pub fn find_one(&self, matcher: &Matcher) -> QueryResult<&'g Declaration> {
        self.traversal
            .find_one(matcher)
            .map(|id| self.graph.decl(id))
    }

    /// At most one match: `None` when nothing matches, an ambiguity error
    /// when several do.
    pub fn assert_unique(&self, matcher: &Matcher) -> QueryResult<Option<&'g Declaration>> {
        match self.find_one(matcher) {
            Ok(decl) => Ok(Some(decl)),
            Err(QueryError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn exists(&self, matcher: &Matcher) -> bool {
        self.traversal.exists(matcher)
    }

    pub fn count(&self, matcher: &Matcher) -> usize {
        self.traversal.count(matcher)
    }

    pub fn namespace(&self, name: &str) -> QueryResult<&'g Declaration> {
        self.find_one(&(Matcher::kind(DeclKind::Namespace) & Matcher::name(name)))
    }

    /// The class, struct or union called `name`.
    pub fn class(&self, name: &str) -> QueryResult<&'g Declaration> {
        self.find_one(&(class_like() & Matcher::name(name)))
    }

    pub fn classes(&self, filter: Matcher) -> Vec<&'g Declaration> {
        self.find_all(&(class_like() & filter))
    }

    pub fn member_functions(&self, filter: Matcher) -> Vec<&'g Declaration> {
        self.find_all(&(Matcher::kind(DeclKind::MemberFunction) & filter))
    }

    pub fn free_functions(&self, filter: Matcher) -> Vec<&'g Declaration> {
        self.find_all(&(Matcher::kind(DeclKind::Function) & filter))
    }

    pub fn variables(&self, filter: Matcher) -> Vec<&'g Declaration> {
        self.find_all(&(Matcher::kind(DeclKind::Variable) & filter))
    }

    pub fn typedefs(&self, filter: Matcher) -> Vec<&'g Declaration> {
        self.find_all(&(Matcher::kind(DeclKind::Typedef) & filter))
    }

    pub fn enumerations(&self, filter: Matcher) -> Vec<&'g Declaration> {
        self.find_all(&(Matcher::kind(DeclKind::Enum) & filter))
    }
}

fn class_like() -> Matcher {
    Matcher::kind(DeclKind::Class) | Matcher::kind(DeclKind::Union)
}
