//! Scope bit-set controlling which attributes of a [`crate::Field`] or
//! [`crate::Ingester`] are included in a scoped JSON serialization.
//! Grounded on the `Scope(Flag)` enum in `src/models/base.py`
//! (`examples/original_source`), ported to `bitflags` as a typed systems
//! replacement for Python's `Flag`/`auto()`.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Scope: u16 {
        const TRANSIENT       = 0b0000_0001;
        const TARGET          = 0b0000_0010;
        const SELECTOR        = 0b0000_0100;
        const METHOD          = 0b0000_1000;
        const TRANSFORMERS    = 0b0001_0000;
        const PRE_TRANSFORMER = 0b0010_0000;
        const PARAMS          = 0b0100_0000;
        const PROTECTED       = 0b1000_0000;

        const DEFAULT = Self::TARGET.bits();
        const DETAILED = Self::TRANSIENT.bits() | Self::TARGET.bits() | Self::SELECTOR.bits();
        const ALL = Self::TRANSIENT.bits()
            | Self::TARGET.bits()
            | Self::SELECTOR.bits()
            | Self::METHOD.bits()
            | Self::TRANSFORMERS.bits()
            | Self::PRE_TRANSFORMER.bits()
            | Self::PARAMS.bits()
            | Self::PROTECTED.bits();
        const DEBUG = Self::ALL.bits();
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::DEFAULT
    }
}

/// The scope used by public-facing read paths (the query API). Per spec.md
/// invariant P3, fields marked `protected` never reach a response rendered
/// under this scope.
pub fn public_scope() -> Scope {
    Scope::DETAILED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_excluded_from_public_scope() {
        assert!(!public_scope().contains(Scope::PROTECTED));
    }

    #[test]
    fn all_is_union_of_every_single_flag() {
        let union = Scope::TRANSIENT
            | Scope::TARGET
            | Scope::SELECTOR
            | Scope::METHOD
            | Scope::TRANSFORMERS
            | Scope::PRE_TRANSFORMER
            | Scope::PARAMS
            | Scope::PROTECTED;
        assert_eq!(Scope::ALL, union);
    }
}
