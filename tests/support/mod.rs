use kindred_rs::model::{Fact, FactKind, Gender, ParentRole, Person, Relationship};
use kindred_rs::temporal::DateRange;
use kindred_rs::Snapshot;

/// Fluent builder for small hand-written trees.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    persons: Vec<Person>,
    relationships: Vec<Relationship>,
}

#[allow(dead_code)]
impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn person(mut self, id: &str, given: &str, surname: &str) -> Self {
        self.persons.push(Person::new(id).with_name(given, surname));
        self
    }

    pub fn born(mut self, id: &str, date: &str) -> Self {
        let date: DateRange = date.parse().expect("valid test date");
        self.update(id, |person| person.with_fact(Fact::new(FactKind::Birth, date)));
        self
    }

    pub fn born_at(mut self, id: &str, year: i32, place: &str) -> Self {
        self.update(id, |person| {
            person.with_fact(Fact::new(FactKind::Birth, DateRange::year(year)).with_place(place))
        });
        self
    }

    pub fn died(mut self, id: &str, date: &str) -> Self {
        let date: DateRange = date.parse().expect("valid test date");
        self.update(id, |person| person.with_fact(Fact::new(FactKind::Death, date)));
        self
    }

    pub fn gender(mut self, id: &str, gender: Gender) -> Self {
        self.update(id, |person| person.with_gender(gender));
        self
    }

    pub fn source(mut self, id: &str, reference: &str) -> Self {
        self.update(id, |person| person.with_source(reference));
        self
    }

    pub fn parent(mut self, parent: &str, child: &str) -> Self {
        self.relationships
            .push(Relationship::parent_child(parent, child));
        self
    }

    pub fn parent_with_role(mut self, parent: &str, child: &str, role: ParentRole) -> Self {
        self.relationships
            .push(Relationship::parent_child(parent, child).with_role(role));
        self
    }

    pub fn married(mut self, a: &str, b: &str, date: Option<&str>) -> Self {
        let mut edge = Relationship::spouse(a, b);
        if let Some(date) = date {
            edge = edge.with_date(date.parse().expect("valid test date"));
        }
        self.relationships.push(edge);
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot::new(self.persons, self.relationships).expect("valid test snapshot")
    }

    fn update(&mut self, id: &str, f: impl FnOnce(Person) -> Person) {
        let position = self
            .persons
            .iter()
            .position(|person| person.id.as_str() == id)
            .expect("person declared before use");
        let person = self.persons.remove(position);
        self.persons.insert(position, f(person));
    }
}
