//! Conductor numbering and naming
use crate::error::{Error, Result};
use crate::heap::{Heap, HeapStr, MemoryKind};
use std::collections::BTreeSet;
use std::fmt;

/// Check that a user supplied conductor name is usable
///
/// Names must be non-empty and must not contain the list separator `,` or the group
/// separator `%`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        Err(Error::EmptyConductorName)
    } else if name.contains(',') || name.contains('%') {
        Err(Error::InvalidConductorName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Identifier of a group of surfaces sharing one conductor numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(usize);

impl GroupId {
    /// Numeric value
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GROUP{}", self.0)
    }
}

/// Monotonic source of [GroupId]s
#[derive(Debug, Default)]
pub struct GroupIdGenerator {
    last: usize,
}

impl GroupIdGenerator {
    /// Create a generator; the first id it hands out is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused id
    pub fn next_id(&mut self) -> GroupId {
        self.last += 1;
        GroupId(self.last)
    }
}

/// Full conductor identifier `name%group`
pub fn conductor_key(name: &str, group: &str) -> String {
    format!("{name}%{group}")
}

#[derive(Debug)]
struct ConductorName {
    name: HeapStr,
    aliases: Vec<HeapStr>,
}

impl ConductorName {
    fn matches(&self, heap: &Heap, name: &str) -> bool {
        heap.str(self.name) == name || self.aliases.iter().any(|a| heap.str(*a) == name)
    }

    fn display<'a>(&self, heap: &'a Heap) -> &'a str {
        heap.str(*self.aliases.last().unwrap_or(&self.name))
    }
}

/// Conductor table
///
/// Conductors are numbered from 1 in order of first appearance. Each conductor has a primary
/// name and any number of aliases; the most recent alias is the name shown to the user.
#[derive(Debug, Default)]
pub struct ConductorList {
    heap: Heap,
    conductors: Vec<ConductorName>,
}

impl ConductorList {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conductors
    pub fn len(&self) -> usize {
        self.conductors.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.conductors.is_empty()
    }

    /// Number of the conductor with the given primary name or alias
    pub fn number_of(&self, name: &str) -> Option<usize> {
        self.conductors
            .iter()
            .position(|c| c.matches(&self.heap, name))
            .map(|i| i + 1)
    }

    /// Number of a conductor, creating it if the name is new
    pub fn get_or_create(&mut self, name: &str) -> Result<usize> {
        if name.is_empty() {
            return Err(Error::EmptyConductorName);
        }
        if let Some(n) = self.number_of(name) {
            return Ok(n);
        }
        let name = self.heap.strdup(name, MemoryKind::Miscellaneous);
        self.conductors.push(ConductorName {
            name,
            aliases: vec![],
        });
        Ok(self.conductors.len())
    }

    /// Add `new_name` as an alias of the conductor known as `old_name`
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if new_name.is_empty() {
            return Err(Error::EmptyConductorName);
        }
        let n = self
            .number_of(old_name)
            .ok_or_else(|| Error::UnknownConductor(old_name.to_string()))?;
        let alias = self.heap.strdup(new_name, MemoryKind::Miscellaneous);
        self.conductors[n - 1].aliases.push(alias);
        Ok(())
    }

    /// Primary name of a conductor
    pub fn name(&self, number: usize) -> Option<&str> {
        self.get(number).map(|c| self.heap.str(c.name))
    }

    /// Current display name of a conductor
    pub fn display_name(&self, number: usize) -> Option<&str> {
        self.get(number).map(|c| c.display(&self.heap))
    }

    /// Display names of all conductors, in numbering order
    pub fn display_names(&self) -> Vec<String> {
        self.conductors
            .iter()
            .map(|c| c.display(&self.heap).to_string())
            .collect()
    }

    /// Resolve a comma separated list of display name prefixes to conductor numbers
    ///
    /// Each element must match exactly one conductor.
    pub fn resolve_name_set(&self, names: &str) -> Result<BTreeSet<usize>> {
        let mut numbers = BTreeSet::new();
        for fragment in names.split(',') {
            let mut found = self
                .conductors
                .iter()
                .enumerate()
                .filter(|(_, c)| c.display(&self.heap).starts_with(fragment))
                .map(|(i, _)| i + 1);
            match (found.next(), found.next()) {
                (None, _) => return Err(Error::ConductorNotFound(fragment.to_string())),
                (Some(n), None) => {
                    numbers.insert(n);
                }
                (Some(_), Some(_)) => {
                    return Err(Error::ConductorNotUnique(fragment.to_string()))
                }
            }
        }
        Ok(numbers)
    }

    fn get(&self, number: usize) -> Option<&ConductorName> {
        if number == 0 {
            None
        } else {
            self.conductors.get(number - 1)
        }
    }
}
