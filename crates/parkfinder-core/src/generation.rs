/// Monotonic token identifying one issued request or scheduled timer.
///
/// Every state machine bumps a generation when it starts something
/// asynchronous and compares it when the completion comes back; a mismatch
/// means the completion belongs to a superseded request and is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Advances to the next generation and returns it.
    pub fn bump(&mut self) -> Generation {
        self.0 += 1;
        *self
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_is_monotonic() {
        let mut g = Generation::default();
        let first = g.bump();
        let second = g.bump();
        assert!(second > first);
        assert_eq!(second.to_string(), "#2");
        assert_eq!(g, second);
    }
}
