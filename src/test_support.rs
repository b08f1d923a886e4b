use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{Fact, FactKind, Gender, Person, PersonId, Relationship};
use crate::store::Snapshot;
use crate::temporal::DateRange;

const MALE_GIVEN: [&str; 8] = [
    "José", "Juan", "Francisco", "William", "Thomas", "Charles", "James", "George",
];
const FEMALE_GIVEN: [&str; 6] = ["María", "Guadalupe", "Ana", "Rosa", "Inés", "Margaret"];
const SURNAMES: [&str; 10] = [
    "Martínez", "González", "Fernández", "Hernández", "Rodríguez", "Ibarra", "Smith", "Turner",
    "de la Cruz", "van der Berg",
];
const PLACES: [&str; 5] = [
    "Guadalajara, Jalisco",
    "Sevilla, Andalucía",
    "Boston, Massachusetts",
    "Leeds, Yorkshire",
    "Utrecht",
];

/// Abbreviated or unaccented spelling a clerk might have written instead.
fn spelling_variant(name: &str) -> String {
    match name {
        "José" => "Jose".to_string(),
        "María" => "Ma.".to_string(),
        "Francisco" => "Fco.".to_string(),
        "Guadalupe" => "Gpe.".to_string(),
        "William" => "Wm.".to_string(),
        "Thomas" => "Thos.".to_string(),
        "Charles" => "Chas.".to_string(),
        "González" => "Glez.".to_string(),
        "Martínez" => "Martinez".to_string(),
        "Inés" => "Ines".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedTree {
    pub snapshot: Snapshot,
    /// `(original, copy)` pairs planted as duplicates
    pub planted_duplicates: Vec<(PersonId, PersonId)>,
}

struct TreeBuilder {
    rng: StdRng,
    persons: Vec<Person>,
    relationships: Vec<Relationship>,
    planted: Vec<(PersonId, PersonId)>,
    next_id: u32,
}

impl TreeBuilder {
    fn next_id(&mut self) -> PersonId {
        self.next_id += 1;
        PersonId::new(format!("I{:06}", self.next_id))
    }

    fn person(&mut self, gender: Gender, surname: &str, born: i32) -> Person {
        let pool: &[&str] = match gender {
            Gender::Female => &FEMALE_GIVEN,
            _ => &MALE_GIVEN,
        };
        let given = pool[self.rng.random_range(0..pool.len())];
        let place = PLACES[self.rng.random_range(0..PLACES.len())];
        let id = self.next_id();

        let mut person = Person::new(id)
            .with_name(given, surname)
            .with_gender(gender)
            .with_fact(Fact::new(FactKind::Birth, DateRange::year(born)).with_place(place));
        if self.rng.random_bool(0.6) {
            let died = born + self.rng.random_range(30..90);
            person = person.with_death(DateRange::year(died));
        }
        if self.rng.random_bool(0.5) {
            let source = format!("Birth:S{:05}", self.rng.random_range(0..100_000));
            person = person.with_source(source);
        }
        person
    }

    fn plant_duplicate(&mut self, original: &Person) {
        let id = self.next_id();
        let mut copy = Person::new(id).with_gender(original.gender);
        if let Some(name) = original.primary_name() {
            copy = copy.with_name(&spelling_variant(&name.given), &spelling_variant(&name.surname));
        }
        if let Some(birth) = original.fact(FactKind::Birth) {
            let shift = self.rng.random_range(0..=1);
            let year = birth.date.earliest_year().unwrap_or(1900) + shift;
            let mut fact = Fact::new(FactKind::Birth, DateRange::year(year));
            fact.place = birth.place.clone();
            copy = copy.with_fact(fact);
        }
        self.planted.push((original.id.clone(), copy.id.clone()));
        self.persons.push(copy);
    }

    fn family(&mut self, duplicate_probability: f64) {
        let surname = SURNAMES[self.rng.random_range(0..SURNAMES.len())];
        let mother_surname = SURNAMES[self.rng.random_range(0..SURNAMES.len())];
        let father_born = self.rng.random_range(1780..1900);
        let mother_born = father_born + self.rng.random_range(-5..6);

        let father = self.person(Gender::Male, surname, father_born);
        let mother = self.person(Gender::Female, mother_surname, mother_born);
        let married = father_born.max(mother_born) + self.rng.random_range(18..30);
        self.relationships.push(
            Relationship::spouse(father.id.clone(), mother.id.clone())
                .with_date(DateRange::year(married)),
        );

        let children = self.rng.random_range(1..=4);
        for _ in 0..children {
            let gender = if self.rng.random_bool(0.5) {
                Gender::Male
            } else {
                Gender::Female
            };
            let born = married + self.rng.random_range(1..15);
            let child = self.person(gender, surname, born);
            self.relationships
                .push(Relationship::parent_child(father.id.clone(), child.id.clone()));
            self.relationships
                .push(Relationship::parent_child(mother.id.clone(), child.id.clone()));
            if self.rng.random_bool(duplicate_probability) {
                self.plant_duplicate(&child);
            }
            self.persons.push(child);
        }

        self.persons.push(father);
        self.persons.push(mother);
    }
}

/// Generate `families` nuclear families (two parents, one to four children)
/// and plant a misspelled copy of each child with the given probability.
pub fn generate_tree(families: u32, duplicate_probability: f64, seed: u64) -> Result<GeneratedTree> {
    let mut builder = TreeBuilder {
        rng: StdRng::seed_from_u64(seed),
        persons: Vec::new(),
        relationships: Vec::new(),
        planted: Vec::new(),
        next_id: 0,
    };
    for _ in 0..families {
        builder.family(duplicate_probability);
    }

    let snapshot = Snapshot::new(builder.persons, builder.relationships)?;
    Ok(GeneratedTree {
        snapshot,
        planted_duplicates: builder.planted,
    })
}

/// Parent chain `P1 → P2 → … → Pn`, optionally closed back to `P1`.
pub fn generate_chain(len: u32, closed: bool) -> Result<Snapshot> {
    let persons = (1..=len)
        .map(|i| Person::new(format!("P{}", i)).with_name("Ana", "Ruiz"))
        .collect();
    let mut relationships: Vec<Relationship> = (1..len)
        .map(|i| Relationship::parent_child(format!("P{}", i), format!("P{}", i + 1)))
        .collect();
    if closed && len > 1 {
        relationships.push(Relationship::parent_child(format!("P{}", len), "P1"));
    }
    Ok(Snapshot::new(persons, relationships)?)
}
