//! Identifier generation for new entities.

/// Which collection an identifier is minted for. Each kind has its own prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Team,
    Area,
    Topic,
    Log,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Team => "T",
            IdKind::Area => "AR",
            IdKind::Topic => "TP",
            IdKind::Log => "LG",
        }
    }
}

/// Source of fresh, unique identifiers.
pub trait IdGenerator {
    fn next_id(&mut self, kind: IdKind) -> String;
}

/// Random v4 UUIDs, e.g. `TP-6f1c...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self, kind: IdKind) -> String {
        format!("{}-{}", kind.prefix(), uuid::Uuid::new_v4())
    }
}

/// Deterministic counter-based ids (`T-1`, `TP-1`, `TP-2`, ...), one counter per kind.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    counters: [u64; 4],
}

impl SequentialIds {
    /// Start every counter after `offset`, e.g. to avoid clashing with seeded ids.
    pub fn starting_after(offset: u64) -> Self {
        Self {
            counters: [offset; 4],
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, kind: IdKind) -> String {
        let slot = match kind {
            IdKind::Team => 0,
            IdKind::Area => 1,
            IdKind::Topic => 2,
            IdKind::Log => 3,
        };
        self.counters[slot] += 1;
        format!("{}-{}", kind.prefix(), self.counters[slot])
    }
}
