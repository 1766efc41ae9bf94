#![allow(dead_code)]

use declgraph::record::{ChildKind, ChildRecord, fields};
use declgraph::{DeclGraph, GraphBuilder, Record, RecordKind, RecordStream};

/// Builds the record stream of one translation unit, handing out ids the way
/// the front-end does (`_1` is always the global namespace).
pub struct UnitRecords {
    records: Vec<Record>,
    next: u32,
}

impl UnitRecords {
    pub const GLOBAL: &'static str = "_1";

    pub fn new() -> Self {
        Self {
            records: vec![Record::new(RecordKind::Namespace, Self::GLOBAL).with_literal(fields::NAME, "::")],
            next: 2,
        }
    }

    fn next_id(&mut self) -> String {
        let id = format!("_{}", self.next);
        self.next += 1;
        id
    }

    /// Append a record under a fresh id and return the id.
    pub fn add(&mut self, kind: RecordKind, build: impl FnOnce(Record) -> Record) -> String {
        let id = self.next_id();
        self.records.push(build(Record::new(kind, id.as_str())));
        id
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn fundamental(&mut self, name: &str) -> String {
        self.add(RecordKind::FundamentalType, |r| r.with_literal(fields::NAME, name))
    }

    pub fn namespace(&mut self, name: &str, context: &str) -> String {
        self.scoped(RecordKind::Namespace, name, context)
    }

    pub fn class(&mut self, name: &str, context: &str) -> String {
        self.scoped(RecordKind::Class, name, context)
    }

    pub fn struct_(&mut self, name: &str, context: &str) -> String {
        self.scoped(RecordKind::Struct, name, context)
    }

    pub fn forward_class(&mut self, name: &str, context: &str) -> String {
        self.add(RecordKind::Class, |r| {
            r.with_literal(fields::NAME, name)
                .with_ref(fields::CONTEXT, context)
                .with_flag(fields::INCOMPLETE)
        })
    }

    pub fn derived(&mut self, name: &str, context: &str, bases: &[(&str, bool)]) -> String {
        self.add(RecordKind::Struct, |mut r| {
            r = r.with_literal(fields::NAME, name).with_ref(fields::CONTEXT, context);
            for (base, is_virtual) in bases {
                let child = ChildRecord::new(ChildKind::Base).with_ref(fields::TYPE, *base);
                r = r.with_child(if *is_virtual { child.with_flag(fields::VIRTUAL) } else { child });
            }
            r
        })
    }

    pub fn method(&mut self, name: &str, class: &str, returns: &str, args: &[&str]) -> String {
        self.callable(RecordKind::Method, name, class, returns, args)
    }

    pub fn virtual_method(&mut self, name: &str, class: &str, returns: &str, args: &[&str]) -> String {
        let id = self.method(name, class, returns, args);
        if let Some(record) = self.records.pop() {
            self.records.push(record.with_flag(fields::VIRTUAL));
        }
        id
    }

    pub fn function(&mut self, name: &str, context: &str, returns: &str, args: &[&str]) -> String {
        self.callable(RecordKind::Function, name, context, returns, args)
    }

    pub fn variable(&mut self, name: &str, context: &str, ty: &str) -> String {
        self.add(RecordKind::Variable, |r| {
            r.with_literal(fields::NAME, name)
                .with_ref(fields::CONTEXT, context)
                .with_ref(fields::TYPE, ty)
        })
    }

    pub fn typedef(&mut self, name: &str, context: &str, ty: &str) -> String {
        self.add(RecordKind::Typedef, |r| {
            r.with_literal(fields::NAME, name)
                .with_ref(fields::CONTEXT, context)
                .with_ref(fields::TYPE, ty)
        })
    }

    pub fn pointer(&mut self, ty: &str) -> String {
        self.add(RecordKind::PointerType, |r| r.with_ref(fields::TYPE, ty))
    }

    pub fn reference(&mut self, ty: &str) -> String {
        self.add(RecordKind::ReferenceType, |r| r.with_ref(fields::TYPE, ty))
    }

    pub fn constant(&mut self, ty: &str) -> String {
        self.add(RecordKind::CvQualifiedType, |r| {
            r.with_ref(fields::TYPE, ty).with_flag(fields::CONST)
        })
    }

    /// `template<typename...> class name` specialized with type arguments.
    pub fn specialization(&mut self, name: &str, context: &str, template: &str, args: &[&str]) -> String {
        let instantiation = self.add(RecordKind::TemplateInstantiation, |mut r| {
            r = r.with_ref(fields::TEMPLATE, template);
            for arg in args {
                r = r.with_child(ChildRecord::new(ChildKind::TemplateArgument).with_ref(fields::TYPE, *arg));
            }
            r
        });
        self.add(RecordKind::Class, |r| {
            r.with_literal(fields::NAME, name)
                .with_ref(fields::CONTEXT, context)
                .with_ref(fields::INSTANTIATES, instantiation.as_str())
        })
    }

    fn scoped(&mut self, kind: RecordKind, name: &str, context: &str) -> String {
        self.add(kind, |r| r.with_literal(fields::NAME, name).with_ref(fields::CONTEXT, context))
    }

    fn callable(&mut self, kind: RecordKind, name: &str, context: &str, returns: &str, args: &[&str]) -> String {
        self.add(kind, |mut r| {
            r = r
                .with_literal(fields::NAME, name)
                .with_ref(fields::CONTEXT, context)
                .with_ref(fields::RETURNS, returns);
            for arg in args {
                r = r.with_child(ChildRecord::new(ChildKind::Argument).with_ref(fields::TYPE, *arg));
            }
            r
        })
    }

    pub fn into_stream(self) -> RecordStream {
        RecordStream::new(self.records)
    }
}

impl Default for UnitRecords {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge the given units in order and freeze the result.
pub fn build_graph(units: Vec<UnitRecords>) -> DeclGraph {
    let mut builder = GraphBuilder::default();
    for unit in units {
        builder.add_unit(unit.into_stream()).expect("unit should build");
    }
    builder.freeze()
}
