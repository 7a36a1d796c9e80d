//! Class Proxy Builder support: a thin adapter from [`SubclassRegistry`] and
//! [`ClassLookup`] that the [`super::proxy::ProxyFactory`] consults
//! (`spec.md` §4.4).

use covenant_core::TypeSchema;

use super::contracts::{ClassLookup, ClassUnderTest, SubclassRegistry};

pub struct ClassRegistry<'a> {
    subclasses: &'a dyn SubclassRegistry,
    /// `None` when the front end has no invariants compiled at all (e.g. in
    /// tests that only exercise shape-building); invariant enforcement is
    /// then skipped rather than treated as a pass.
    classes: Option<&'a dyn ClassLookup>,
}

impl<'a> ClassRegistry<'a> {
    pub fn new(subclasses: &'a dyn SubclassRegistry) -> Self {
        Self {
            subclasses,
            classes: None,
        }
    }

    pub fn with_class_lookup(subclasses: &'a dyn SubclassRegistry, classes: &'a dyn ClassLookup) -> Self {
        Self {
            subclasses,
            classes: Some(classes),
        }
    }

    pub fn subclasses_of(&self, bound: &str) -> Vec<String> {
        self.subclasses.subclasses_of(bound)
    }

    pub fn is_final(&self, class_name: &str) -> bool {
        self.subclasses.is_final(class_name)
    }

    pub fn field_schemas(&self, class_name: &str) -> Vec<(String, TypeSchema)> {
        self.subclasses.field_schemas(class_name)
    }

    /// The compiled class under test for `class_name`, if the front end
    /// supplied one (`spec.md` §4.4 invariant enforcement).
    pub fn lookup(&self, class_name: &str) -> Option<&dyn ClassUnderTest> {
        self.classes.and_then(|c| c.lookup(class_name))
    }
}
