//! Error types for the decision-diagram engine
//!
//! Each error source has its own enum with specific variants, and operations
//! have wrapper enums that combine only the errors they can produce. Nothing
//! here reaches for `thiserror`: `Display` and `std::error::Error` are
//! implemented by hand, matching the rest of this crate's style.

use std::fmt;
use std::io;

/// Contract violations detected by the node manager.
///
/// These are the spec's "fatal" error kind (§7): calling an operation with
/// handles from different managers, an out-of-range variable index, an
/// out-of-domain value, or mixing a fixed-domain call against a mixed-domain
/// manager. Callers cannot recover the operation, only avoid repeating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// Two diagram handles passed to the same call were rooted in different managers.
    ForeignHandle,
    /// A variable index was outside `0..var_count`.
    VariableOutOfRange {
        /// The index that was requested.
        index: usize,
        /// The manager's variable count.
        var_count: usize,
    },
    /// A value was outside `0..domain_size` for the given variable.
    ValueOutOfDomain {
        /// The variable index the value was checked against.
        index: usize,
        /// The value that was rejected.
        value: u32,
        /// The variable's domain size.
        domain_size: u32,
    },
    /// A value was outside `0..codomain_size` for the diagram's codomain.
    ValueOutOfCodomain {
        /// The value that was rejected.
        value: u32,
        /// The codomain size.
        codomain_size: u32,
    },
    /// `new_mixed` was given a domain table whose length does not match `var_count`.
    DomainCountMismatch {
        /// Number of variables the manager was asked to have.
        var_count: usize,
        /// Number of domain entries actually supplied.
        domains_given: usize,
    },
    /// A domain or codomain size smaller than 2 was requested.
    DegenerateDomain {
        /// The offending size.
        size: u32,
    },
    /// The pool could not grow (host allocator failure).
    PoolExhausted,
    /// A supplied variable order was not a permutation of `0..var_count`.
    InvalidOrder,
    /// A diagram sequence passed to a fold was empty.
    EmptyFold,
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::ForeignHandle => {
                write!(f, "diagram handles belong to different managers")
            }
            ManagerError::VariableOutOfRange { index, var_count } => write!(
                f,
                "variable index {} out of range for manager with {} variables",
                index, var_count
            ),
            ManagerError::ValueOutOfDomain {
                index,
                value,
                domain_size,
            } => write!(
                f,
                "value {} out of domain for variable {} (domain size {})",
                value, index, domain_size
            ),
            ManagerError::ValueOutOfCodomain {
                value,
                codomain_size,
            } => write!(
                f,
                "value {} out of codomain (codomain size {})",
                value, codomain_size
            ),
            ManagerError::DomainCountMismatch {
                var_count,
                domains_given,
            } => write!(
                f,
                "manager has {} variables but {} domain entries were given",
                var_count, domains_given
            ),
            ManagerError::DegenerateDomain { size } => {
                write!(f, "domain/codomain size {} is smaller than 2", size)
            }
            ManagerError::PoolExhausted => write!(f, "node pool could not grow"),
            ManagerError::InvalidOrder => {
                write!(f, "variable order is not a permutation of 0..var_count")
            }
            ManagerError::EmptyFold => write!(f, "fold over an empty diagram sequence"),
        }
    }
}

impl std::error::Error for ManagerError {}

impl From<ManagerError> for io::Error {
    fn from(err: ManagerError) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, err)
    }
}

/// Errors related to PLA format parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaError {
    /// PLA file is missing the `.i` (inputs) directive.
    MissingInputDirective,
    /// PLA file is missing the `.o` (outputs) directive.
    MissingOutputDirective,
    /// PLA file is missing the `.p` (product count) directive.
    MissingProductDirective,
    /// Invalid value in a numeric header directive.
    InvalidDirective {
        /// The directive key, e.g. `.i`.
        key: String,
        /// The invalid value string.
        value: String,
    },
    /// Invalid character in the input portion of a product line.
    InvalidInputCharacter {
        /// The invalid character.
        character: char,
        /// Position in the input string.
        position: usize,
    },
    /// Invalid character in the output portion of a product line.
    InvalidOutputCharacter {
        /// The invalid character.
        character: char,
        /// Position in the output string.
        position: usize,
    },
    /// A product line's input or output width does not match the header.
    CubeDimensionMismatch {
        /// Expected `(inputs, outputs)`.
        expected: (usize, usize),
        /// Actual `(inputs, outputs)`.
        actual: (usize, usize),
    },
    /// `.p` declared a product count that does not match the number of lines read.
    ProductCountMismatch {
        /// Declared count.
        declared: usize,
        /// Actual count.
        actual: usize,
    },
}

impl fmt::Display for PlaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaError::MissingInputDirective => write!(f, "PLA file missing .i directive"),
            PlaError::MissingOutputDirective => write!(f, "PLA file missing .o directive"),
            PlaError::MissingProductDirective => write!(f, "PLA file missing .p directive"),
            PlaError::InvalidDirective { key, value } => {
                write!(f, "invalid {} directive value: '{}'", key, value)
            }
            PlaError::InvalidInputCharacter {
                character,
                position,
            } => write!(
                f,
                "invalid input character '{}' at position {}",
                character, position
            ),
            PlaError::InvalidOutputCharacter {
                character,
                position,
            } => write!(
                f,
                "invalid output character '{}' at position {}",
                character, position
            ),
            PlaError::CubeDimensionMismatch { expected, actual } => write!(
                f,
                "product line dimensions {:?} do not match declared dimensions {:?}",
                actual, expected
            ),
            PlaError::ProductCountMismatch { declared, actual } => write!(
                f,
                ".p declared {} products but {} were read",
                declared, actual
            ),
        }
    }
}

impl std::error::Error for PlaError {}

impl From<PlaError> for io::Error {
    fn from(err: PlaError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// Errors that can occur reading a PLA file or stream.
#[derive(Debug)]
pub enum PlaReadError {
    /// Malformed PLA content.
    Pla(PlaError),
    /// Underlying I/O error.
    Io(io::Error),
    /// The manager could not be built or used for the declared dimensions.
    Manager(ManagerError),
}

impl fmt::Display for PlaReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaReadError::Pla(e) => write!(f, "PLA format error: {}", e),
            PlaReadError::Io(e) => write!(f, "IO error: {}", e),
            PlaReadError::Manager(e) => write!(f, "manager error: {}", e),
        }
    }
}

impl std::error::Error for PlaReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlaReadError::Pla(e) => Some(e),
            PlaReadError::Io(e) => Some(e),
            PlaReadError::Manager(e) => Some(e),
        }
    }
}

impl From<PlaError> for PlaReadError {
    fn from(err: PlaError) -> Self {
        PlaReadError::Pla(err)
    }
}

impl From<io::Error> for PlaReadError {
    fn from(err: io::Error) -> Self {
        PlaReadError::Io(err)
    }
}

impl From<ManagerError> for PlaReadError {
    fn from(err: ManagerError) -> Self {
        PlaReadError::Manager(err)
    }
}

/// Errors that can occur writing a PLA file or stream.
#[derive(Debug)]
pub enum PlaWriteError {
    /// Underlying I/O error.
    Io(io::Error),
    /// A diagram passed to the writer did not belong to the given manager.
    Manager(ManagerError),
}

impl fmt::Display for PlaWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaWriteError::Io(e) => write!(f, "IO error: {}", e),
            PlaWriteError::Manager(e) => write!(f, "manager error: {}", e),
        }
    }
}

impl std::error::Error for PlaWriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlaWriteError::Io(e) => Some(e),
            PlaWriteError::Manager(e) => Some(e),
        }
    }
}

impl From<io::Error> for PlaWriteError {
    fn from(err: io::Error) -> Self {
        PlaWriteError::Io(err)
    }
}

impl From<ManagerError> for PlaWriteError {
    fn from(err: ManagerError) -> Self {
        PlaWriteError::Manager(err)
    }
}

/// Errors from the reliability layer (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum ReliabilityError {
    /// A probability-table query (`get_probability` etc.) was made before
    /// `calculate_probabilities` populated the manager's probability cache.
    UndefinedQuery,
    /// The probability table's per-variable row does not sum to 1 within
    /// tolerance, or has the wrong width for the variable's domain.
    InvalidProbabilityTable {
        /// The offending variable index.
        index: usize,
        /// The row's actual sum.
        sum: f64,
    },
    /// A manager contract violation surfaced while computing a reliability
    /// quantity (e.g. a DPLD variable index out of range).
    Manager(ManagerError),
}

impl fmt::Display for ReliabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReliabilityError::UndefinedQuery => write!(
                f,
                "probability query made before calculate_probabilities populated the manager"
            ),
            ReliabilityError::InvalidProbabilityTable { index, sum } => write!(
                f,
                "probability row for variable {} sums to {} instead of 1",
                index, sum
            ),
            ReliabilityError::Manager(e) => write!(f, "manager error: {}", e),
        }
    }
}

impl std::error::Error for ReliabilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReliabilityError::Manager(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ManagerError> for ReliabilityError {
    fn from(err: ManagerError) -> Self {
        ReliabilityError::Manager(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_error_messages_name_the_offending_values() {
        let err = ManagerError::VariableOutOfRange {
            index: 5,
            var_count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn pla_read_error_wraps_pla_error() {
        let err: PlaReadError = PlaError::MissingInputDirective.into();
        assert!(err.to_string().contains(".i directive"));
    }

    #[test]
    fn reliability_error_wraps_manager_error() {
        let err: ReliabilityError = ManagerError::PoolExhausted.into();
        assert!(matches!(err, ReliabilityError::Manager(_)));
    }
}
